//! Plugin descriptor for the C-compatible entry point.
//!
//! The descriptor is the only symbol a plugin exports. Instead of touching
//! process-wide state, a plugin receives the host's [`TransformFactory`]
//! through its `register` function and registers its transforms there.

use crate::factory::TransformFactory;
use std::ffi::{CStr, c_char, c_int, c_void};

/// Current ABI version. Plugins must match this version to be loaded.
pub const SERIESFORGE_ABI_VERSION: u32 = 1;

/// Contract identifier as a C string, for descriptors.
pub const CONTRACT_ID_CSTR: &CStr = c"seriesforge.TimeSeriesTransform/1";

/// Name of the symbol every plugin exports.
pub const PLUGIN_ENTRY_SYMBOL: &[u8] = b"seriesforge_plugin_descriptor\0";

/// Function a plugin uses to register its transforms.
///
/// Receives a pointer produced by [`factory_to_raw`] and returns the number
/// of transforms that failed to register (0 on success), or a negative
/// value if the pointer was null.
///
/// # Safety
///
/// The pointer must come from [`factory_to_raw`] and stay valid for the
/// duration of the call.
pub type RegisterFn = unsafe extern "C" fn(factory: *const c_void) -> c_int;

/// Plugin descriptor returned by `seriesforge_plugin_descriptor()`.
///
/// This struct is `#[repr(C)]` for C ABI compatibility.
#[repr(C)]
pub struct PluginDescriptor {
    /// ABI version - must match `SERIESFORGE_ABI_VERSION`.
    pub abi_version: u32,
    /// Null-terminated contract identifier - must match
    /// [`TRANSFORM_CONTRACT_ID`](crate::transform::TRANSFORM_CONTRACT_ID).
    pub contract: *const c_char,
    /// Null-terminated plugin name.
    pub name: *const c_char,
    /// Null-terminated plugin version string.
    pub version: *const c_char,
    /// Null-terminated description.
    pub description: *const c_char,
    /// Registers the plugin's transforms with the host factory.
    pub register: RegisterFn,
}

// SAFETY: PluginDescriptor contains only raw pointers to static data
// and a function pointer, which are inherently Send + Sync.
unsafe impl Send for PluginDescriptor {}
unsafe impl Sync for PluginDescriptor {}

/// Read a nullable C string, falling back to `default`.
///
/// # Safety
///
/// A non-null `ptr` must be valid and null-terminated.
unsafe fn c_str_or<'a>(ptr: *const c_char, default: &'a str) -> &'a str {
    if ptr.is_null() {
        return default;
    }
    // SAFETY: Caller guarantees non-null `ptr` is valid and null-terminated.
    unsafe { CStr::from_ptr(ptr).to_str().unwrap_or(default) }
}

impl PluginDescriptor {
    /// Get the contract identifier.
    ///
    /// # Safety
    ///
    /// The `contract` pointer must be null or valid and null-terminated.
    pub unsafe fn contract_str(&self) -> &str {
        // SAFETY: Forwarded from the caller.
        unsafe { c_str_or(self.contract, "") }
    }

    /// Get plugin name as a Rust string.
    ///
    /// # Safety
    ///
    /// The `name` pointer must be null or valid and null-terminated.
    pub unsafe fn name_str(&self) -> &str {
        // SAFETY: Forwarded from the caller.
        unsafe { c_str_or(self.name, "unknown") }
    }

    /// Get version as a Rust string.
    ///
    /// # Safety
    ///
    /// The `version` pointer must be null or valid and null-terminated.
    pub unsafe fn version_str(&self) -> &str {
        // SAFETY: Forwarded from the caller.
        unsafe { c_str_or(self.version, "0.0.0") }
    }

    /// Get description as a Rust string.
    ///
    /// # Safety
    ///
    /// The `description` pointer must be null or valid and null-terminated.
    pub unsafe fn description_str(&self) -> &str {
        // SAFETY: Forwarded from the caller.
        unsafe { c_str_or(self.description, "") }
    }

    /// Validate that this descriptor is safe to use.
    ///
    /// # Safety
    ///
    /// All pointer fields must be null or valid.
    pub unsafe fn validate(&self) -> Result<(), &'static str> {
        if self.abi_version != SERIESFORGE_ABI_VERSION {
            return Err("ABI version mismatch");
        }
        if self.contract.is_null() {
            return Err("Plugin contract is null");
        }
        if self.name.is_null() {
            return Err("Plugin name is null");
        }
        if self.version.is_null() {
            return Err("Plugin version is null");
        }
        Ok(())
    }
}

/// Safe Rust representation of plugin information.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginInfo {
    /// Plugin name.
    pub name: String,
    /// Plugin version.
    pub version: String,
    /// Plugin description.
    pub description: String,
    /// Transforms this plugin added to the host factory.
    pub transforms: Vec<String>,
}

impl PluginInfo {
    /// Create PluginInfo from a raw descriptor. `transforms` starts empty.
    ///
    /// # Safety
    ///
    /// The descriptor must be valid and all its pointers must be valid.
    pub unsafe fn from_descriptor(desc: &PluginDescriptor) -> Self {
        // SAFETY: Caller guarantees descriptor is valid.
        unsafe {
            Self {
                name: desc.name_str().to_string(),
                version: desc.version_str().to_string(),
                description: desc.description_str().to_string(),
                transforms: Vec::new(),
            }
        }
    }
}

/// Pass a factory through the C entry point.
pub fn factory_to_raw(factory: &TransformFactory) -> *const c_void {
    factory as *const TransformFactory as *const c_void
}

/// Recover a factory passed through the C entry point.
///
/// Returns `None` for a null pointer.
///
/// # Safety
///
/// A non-null `ptr` must have been created by [`factory_to_raw`] from a
/// factory that outlives `'a`.
pub unsafe fn factory_from_raw<'a>(ptr: *const c_void) -> Option<&'a TransformFactory> {
    // SAFETY: Caller guarantees ptr came from factory_to_raw.
    unsafe { (ptr as *const TransformFactory).as_ref() }
}

/// Helper macro for defining a plugin entry point in Rust.
///
/// Generates the descriptor and the exported `seriesforge_plugin_descriptor`
/// function. Every listed type must implement
/// [`TransformKind`](crate::transform::TransformKind).
///
/// # Example
///
/// ```ignore
/// use seriesforge::define_plugin;
///
/// define_plugin! {
///     name: "signal_extras",
///     version: "1.0.0",
///     description: "Extra signal-processing transforms",
///     transforms: [Gain, Clamp],
/// }
/// ```
#[macro_export]
macro_rules! define_plugin {
    (
        name: $name:literal,
        version: $version:literal,
        description: $desc:literal,
        transforms: [ $( $transform:ty ),* $(,)? ] $(,)?
    ) => {
        static PLUGIN_NAME: &[u8] = concat!($name, "\0").as_bytes();
        static PLUGIN_VERSION: &[u8] = concat!($version, "\0").as_bytes();
        static PLUGIN_DESC: &[u8] = concat!($desc, "\0").as_bytes();

        unsafe extern "C" fn __seriesforge_register(
            factory: *const std::ffi::c_void,
        ) -> std::ffi::c_int {
            // SAFETY: The host passes a pointer from factory_to_raw.
            let Some(factory) = (unsafe { $crate::plugin::factory_from_raw(factory) }) else {
                return -1;
            };
            let mut failures: std::ffi::c_int = 0;
            $(
                if factory.register::<$transform>().is_err() {
                    failures += 1;
                }
            )*
            failures
        }

        static PLUGIN_DESCRIPTOR: $crate::plugin::PluginDescriptor = $crate::plugin::PluginDescriptor {
            abi_version: $crate::plugin::SERIESFORGE_ABI_VERSION,
            contract: $crate::plugin::CONTRACT_ID_CSTR.as_ptr(),
            name: PLUGIN_NAME.as_ptr() as *const std::ffi::c_char,
            version: PLUGIN_VERSION.as_ptr() as *const std::ffi::c_char,
            description: PLUGIN_DESC.as_ptr() as *const std::ffi::c_char,
            register: __seriesforge_register,
        };

        /// Plugin entry point.
        #[unsafe(no_mangle)]
        pub extern "C" fn seriesforge_plugin_descriptor() -> *const $crate::plugin::PluginDescriptor {
            &PLUGIN_DESCRIPTOR
        }
    };
}
