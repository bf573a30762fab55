//! Host configuration and the initialization phase.
//!
//! A host builds a [`HostConfig`], then calls [`HostConfig::bootstrap`]
//! once at startup. Bootstrap registers the built-in transforms, loads every
//! plugin found in the search paths and, by default, seals the factory so
//! the rest of the program only reads it.

use crate::error::Result;
use crate::plugin::{PluginInfo, PluginRegistry};
use crate::transforms::register_builtin_transforms;
use std::path::PathBuf;

/// Environment variable holding extra plugin directories, `:`-separated.
pub const PLUGIN_PATH_ENV: &str = "SERIESFORGE_PLUGIN_PATH";

/// Host-side configuration for transform discovery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostConfig {
    /// Directories scanned for plugin libraries, in order.
    pub plugin_search_paths: Vec<PathBuf>,
    /// Register the built-in transforms (default: true).
    pub register_builtins: bool,
    /// Seal the factory once bootstrap finishes (default: true).
    pub seal_after_bootstrap: bool,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            plugin_search_paths: Vec::new(),
            register_builtins: true,
            seal_after_bootstrap: true,
        }
    }
}

/// Outcome of [`HostConfig::bootstrap`].
#[derive(Debug, Clone, Default)]
pub struct BootstrapReport {
    /// Number of built-in transforms registered.
    pub builtins: usize,
    /// Plugins loaded from the search paths.
    pub plugins: Vec<PluginInfo>,
    /// Whether the factory was sealed.
    pub sealed: bool,
}

impl BootstrapReport {
    /// Total number of transforms contributed by plugins.
    pub fn plugin_transforms(&self) -> usize {
        self.plugins.iter().map(|p| p.transforms.len()).sum()
    }
}

impl HostConfig {
    /// Create the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Default configuration plus the directories in `SERIESFORGE_PLUGIN_PATH`.
    pub fn from_env() -> Self {
        Self::from_env_value(std::env::var(PLUGIN_PATH_ENV).ok().as_deref())
    }

    /// Default configuration plus the directories in `value`.
    ///
    /// Empty entries are skipped.
    pub fn from_env_value(value: Option<&str>) -> Self {
        let plugin_search_paths = value
            .unwrap_or_default()
            .split(':')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(PathBuf::from)
            .collect();
        Self {
            plugin_search_paths,
            ..Self::default()
        }
    }

    /// Add a plugin directory.
    pub fn with_plugin_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.plugin_search_paths.push(path.into());
        self
    }

    /// Choose whether built-in transforms are registered.
    pub fn with_builtins(mut self, register: bool) -> Self {
        self.register_builtins = register;
        self
    }

    /// Choose whether the factory is sealed after bootstrap.
    pub fn with_seal(mut self, seal: bool) -> Self {
        self.seal_after_bootstrap = seal;
        self
    }

    /// Run the initialization phase against `registry`'s factory.
    ///
    /// Missing plugin directories are skipped. Plugins that fail to load are
    /// logged and skipped; only a failure to register the built-ins is an
    /// error.
    ///
    /// # Safety
    ///
    /// Executes code from every shared library found in the search paths.
    /// All of them must be trusted seriesforge plugins.
    pub unsafe fn bootstrap(&self, registry: &PluginRegistry) -> Result<BootstrapReport> {
        let mut report = BootstrapReport::default();

        if self.register_builtins {
            report.builtins = register_builtin_transforms(registry.factory())?;
        }

        for dir in &self.plugin_search_paths {
            if !dir.is_dir() {
                tracing::debug!(path = %dir.display(), "plugin directory not found, skipping");
                continue;
            }
            // SAFETY: Caller guarantees every plugin in the search paths is trusted.
            let loaded = unsafe { registry.load_all_from_dir(dir) };
            tracing::debug!(path = %dir.display(), loaded, "plugin directory scanned");
        }

        report.plugins = registry
            .list_plugins()
            .iter()
            .filter_map(|name| registry.plugin_info(name))
            .collect();

        if self.seal_after_bootstrap {
            registry.factory().seal();
            report.sealed = true;
        }

        tracing::info!(
            builtins = report.builtins,
            plugins = report.plugins.len(),
            transforms = registry.factory().len(),
            sealed = report.sealed,
            "transform host bootstrapped"
        );
        Ok(report)
    }
}
