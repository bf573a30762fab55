//! Dynamic plugin loading using libloading.

use super::descriptor::{
    PLUGIN_ENTRY_SYMBOL, PluginDescriptor, PluginInfo, SERIESFORGE_ABI_VERSION,
};
use crate::transform::TRANSFORM_CONTRACT_ID;
use libloading::{Library, Symbol};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
#[cfg(test)]
use std::sync::Weak;
use thiserror::Error;

/// Errors that can occur when loading plugins.
#[derive(Debug, Error)]
pub enum PluginError {
    /// Failed to load the shared library.
    #[error("failed to load library: {0}")]
    LoadFailed(String),

    /// The plugin doesn't have the required entry point.
    #[error("missing plugin entry point: seriesforge_plugin_descriptor")]
    MissingEntryPoint,

    /// The plugin returned a null descriptor.
    #[error("plugin returned null descriptor")]
    NullDescriptor,

    /// ABI version mismatch.
    #[error("ABI version mismatch: expected {expected}, got {actual}")]
    AbiMismatch {
        /// Expected ABI version.
        expected: u32,
        /// Actual ABI version found.
        actual: u32,
    },

    /// The plugin implements a different contract.
    #[error("contract mismatch: expected '{expected}', got '{actual}'")]
    ContractMismatch {
        /// Contract the host implements.
        expected: &'static str,
        /// Contract the plugin declared.
        actual: String,
    },

    /// Plugin descriptor validation failed.
    #[error("invalid plugin descriptor: {0}")]
    InvalidDescriptor(&'static str),

    /// A plugin with the same name is already loaded.
    #[error("plugin '{0}' is already loaded")]
    AlreadyLoaded(String),

    /// Some of the plugin's transforms were rejected by the factory.
    #[error("plugin '{plugin}' failed to register {failures} transform(s)")]
    RegistrationFailed {
        /// Plugin name.
        plugin: String,
        /// Number of rejected transforms, or -1 if the factory was unusable.
        failures: i32,
    },
}

/// Type of the plugin entry point function.
type PluginEntryPoint = unsafe extern "C" fn() -> *const PluginDescriptor;

/// A loaded plugin.
///
/// A dynamically loaded plugin holds a reference to its shared library to
/// keep it loaded; statically linked plugins hold none. Once a
/// [`PluginRegistry`](super::PluginRegistry) accepts the plugin, the library
/// stays mapped for the rest of the process, because the factory keeps
/// constructors that point into it.
pub struct Plugin {
    /// The loaded library (kept alive), if any.
    _library: Option<Arc<Library>>,
    /// Pointer to the plugin descriptor (valid as long as library is loaded).
    descriptor: *const PluginDescriptor,
    /// Cached plugin info.
    info: PluginInfo,
}

// SAFETY: Plugin only accesses static data from the loaded library
// through validated pointers. The library is kept alive by Arc<Library>.
unsafe impl Send for Plugin {}
unsafe impl Sync for Plugin {}

impl Plugin {
    /// Wrap a descriptor linked into the current binary.
    pub fn from_static(descriptor: &'static PluginDescriptor) -> Result<Self, PluginError> {
        // SAFETY: A static descriptor's pointers refer to static data.
        unsafe { Self::from_parts(None, descriptor) }
    }

    /// Validate `descriptor` and pair it with the library that owns it.
    ///
    /// # Safety
    ///
    /// `descriptor` must be non-null, and its pointer fields must be null or
    /// valid for as long as `library` (or the process, if `None`) is loaded.
    pub(crate) unsafe fn from_parts(
        library: Option<Arc<Library>>,
        descriptor: *const PluginDescriptor,
    ) -> Result<Self, PluginError> {
        // SAFETY: Guaranteed by the caller.
        let info = unsafe { validate(&*descriptor)? };
        Ok(Self {
            _library: library,
            descriptor,
            info,
        })
    }

    /// Keep the backing library mapped until the process exits.
    pub(crate) fn keep_loaded(&self) {
        if let Some(library) = &self._library {
            std::mem::forget(Arc::clone(library));
        }
    }

    #[cfg(test)]
    pub(crate) fn library_weak(&self) -> Option<Weak<Library>> {
        self._library.as_ref().map(Arc::downgrade)
    }

    /// Get information about the plugin.
    pub fn info(&self) -> &PluginInfo {
        &self.info
    }

    /// Get the plugin name.
    pub fn name(&self) -> &str {
        &self.info.name
    }

    /// Get the plugin version.
    pub fn version(&self) -> &str {
        &self.info.version
    }

    /// Check if the plugin is backed by a shared library.
    pub fn is_dynamic(&self) -> bool {
        self._library.is_some()
    }

    pub(crate) fn descriptor(&self) -> &PluginDescriptor {
        // SAFETY: The descriptor was validated at load time and the library is kept alive.
        unsafe { &*self.descriptor }
    }

    pub(crate) fn info_mut(&mut self) -> &mut PluginInfo {
        &mut self.info
    }
}

impl std::fmt::Debug for Plugin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Plugin")
            .field("name", &self.info.name)
            .field("version", &self.info.version)
            .field("transforms", &self.info.transforms.len())
            .field("dynamic", &self.is_dynamic())
            .finish()
    }
}

/// Check ABI version, contract and mandatory fields.
///
/// # Safety
///
/// All pointer fields of `desc` must be null or valid.
unsafe fn validate(desc: &PluginDescriptor) -> Result<PluginInfo, PluginError> {
    if desc.abi_version != SERIESFORGE_ABI_VERSION {
        return Err(PluginError::AbiMismatch {
            expected: SERIESFORGE_ABI_VERSION,
            actual: desc.abi_version,
        });
    }

    // SAFETY: Caller guarantees pointer fields are null or valid.
    unsafe {
        desc.validate().map_err(PluginError::InvalidDescriptor)?;

        let contract = desc.contract_str();
        if contract != TRANSFORM_CONTRACT_ID {
            return Err(PluginError::ContractMismatch {
                expected: TRANSFORM_CONTRACT_ID,
                actual: contract.to_string(),
            });
        }

        Ok(PluginInfo::from_descriptor(desc))
    }
}

/// Plugin loader for dynamically loading plugins from shared libraries.
#[derive(Debug, Clone)]
pub struct PluginLoader {
    /// Search paths for plugins.
    search_paths: Vec<PathBuf>,
}

impl PluginLoader {
    /// Create a new plugin loader with default search paths.
    pub fn new() -> Self {
        Self {
            search_paths: vec![
                // Current directory
                PathBuf::from("."),
                // Standard plugin directory
                PathBuf::from("/usr/lib/seriesforge/plugins"),
                PathBuf::from("/usr/local/lib/seriesforge/plugins"),
            ],
        }
    }

    /// Create a loader that only searches `paths`.
    pub fn with_search_paths(paths: impl IntoIterator<Item = impl Into<PathBuf>>) -> Self {
        Self {
            search_paths: paths.into_iter().map(Into::into).collect(),
        }
    }

    /// Add a search path for plugins.
    pub fn add_search_path(&mut self, path: impl Into<PathBuf>) {
        self.search_paths.push(path.into());
    }

    /// Configured search paths, in lookup order.
    pub fn search_paths(&self) -> &[PathBuf] {
        &self.search_paths
    }

    /// Load a plugin from a specific path.
    ///
    /// # Safety
    ///
    /// Loading plugins is inherently unsafe because we're executing
    /// arbitrary code from shared libraries. The plugin must:
    /// - Export a valid `seriesforge_plugin_descriptor` function
    /// - Return a valid, static plugin descriptor
    /// - Be built against the same seriesforge version as the host
    pub unsafe fn load_from_path(&self, path: impl AsRef<Path>) -> Result<Plugin, PluginError> {
        let path = path.as_ref();

        // SAFETY: Loading a dynamic library. Caller ensures the library is trusted.
        let library =
            unsafe { Library::new(path).map_err(|e| PluginError::LoadFailed(e.to_string()))? };

        // SAFETY: Getting a symbol from the library. Library was just loaded successfully.
        let entry_point: Symbol<PluginEntryPoint> = unsafe {
            library
                .get(PLUGIN_ENTRY_SYMBOL)
                .map_err(|_| PluginError::MissingEntryPoint)?
        };

        // SAFETY: Calling the entry point function. Caller guarantees plugin is valid.
        let descriptor = unsafe { entry_point() };
        if descriptor.is_null() {
            return Err(PluginError::NullDescriptor);
        }

        // SAFETY: Entry point returned non-null; caller guarantees it is well formed.
        unsafe { Plugin::from_parts(Some(Arc::new(library)), descriptor) }
    }

    /// Load a plugin by name, searching in all search paths.
    ///
    /// The name should be without the platform prefix and suffix.
    /// For example, "extras" will search for "libextras.so" on Linux.
    ///
    /// # Safety
    ///
    /// See `load_from_path` for safety requirements.
    pub unsafe fn load_by_name(&self, name: &str) -> Result<Plugin, PluginError> {
        let lib_name = libloading::library_filename(name);

        for search_path in &self.search_paths {
            let path = search_path.join(&lib_name);
            if path.exists() {
                // SAFETY: Caller guarantees plugin is trusted.
                return unsafe { self.load_from_path(&path) };
            }
        }

        Err(PluginError::LoadFailed(format!(
            "plugin '{}' not found in search paths",
            name
        )))
    }

    /// Scan a directory for plugins and load all of them.
    ///
    /// Returns one result per shared library found, paired with its path.
    ///
    /// # Safety
    ///
    /// See `load_from_path` for safety requirements.
    pub unsafe fn load_all_from_dir(
        &self,
        dir: impl AsRef<Path>,
    ) -> Vec<(PathBuf, Result<Plugin, PluginError>)> {
        let dir = dir.as_ref();
        let mut plugins = Vec::new();

        if let Ok(entries) = std::fs::read_dir(dir) {
            let mut paths: Vec<PathBuf> = entries
                .flatten()
                .map(|entry| entry.path())
                .filter(|path| is_shared_library(path))
                .collect();
            paths.sort();

            for path in paths {
                // SAFETY: Caller guarantees all plugins in directory are trusted.
                let result = unsafe { self.load_from_path(&path) };
                plugins.push((path, result));
            }
        }

        plugins
    }
}

impl Default for PluginLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn is_shared_library(path: &Path) -> bool {
    path.is_file() && path.extension() == Some(OsStr::new(std::env::consts::DLL_EXTENSION))
}
