//! Plugin system for loading transforms from other modules.
//!
//! A plugin is a shared library (.so on Linux) that exports a single symbol:
//!
//! ```c
//! const PluginDescriptor* seriesforge_plugin_descriptor();
//! ```
//!
//! The descriptor carries the ABI version, the contract identifier
//! ([`TRANSFORM_CONTRACT_ID`](crate::transform::TRANSFORM_CONTRACT_ID)),
//! plugin metadata and a `register` function. The host calls `register`
//! with its own [`TransformFactory`](crate::factory::TransformFactory), so
//! a plugin never depends on process-wide state. Plugins with another ABI
//! version or contract are rejected before any of their code runs beyond
//! the entry point.
//!
//! Plugins linked into the host binary use the same descriptor through
//! [`PluginRegistry::load_static`].
//!
//! # Example Plugin (Rust)
//!
//! ```ignore
//! use seriesforge::prelude::*;
//! use seriesforge::{define_plugin, series_transform};
//!
//! #[series_transform(name = "gain", description = "Multiplies by two")]
//! #[derive(Default)]
//! pub struct Gain {
//!     state: TransformState,
//! }
//!
//! // impl TimeSeriesTransform for Gain { ... }
//!
//! define_plugin! {
//!     name: "signal_extras",
//!     version: "1.0.0",
//!     description: "Extra signal-processing transforms",
//!     transforms: [Gain],
//! }
//! ```

mod descriptor;
mod loader;
mod registry;

pub use descriptor::{
    CONTRACT_ID_CSTR, PLUGIN_ENTRY_SYMBOL, PluginDescriptor, PluginInfo, RegisterFn,
    SERIESFORGE_ABI_VERSION, factory_from_raw, factory_to_raw,
};
pub use loader::{Plugin, PluginError, PluginLoader};
pub use registry::PluginRegistry;
