//! Plugin registry: loads plugin modules and wires them to a factory.

use super::descriptor::{PluginDescriptor, PluginInfo, factory_to_raw};
use super::loader::{Plugin, PluginError, PluginLoader};
use crate::factory::TransformFactory;
use crate::observability::{
    record_plugin_loaded, span_plugin_load, trace_plugin_loaded, trace_plugin_rejected,
};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Registry of loaded plugins and the factory they register into.
///
/// The factory keeps constructors that point into plugin code and cannot
/// forget them, and it may outlive the registry through its `Arc`. Shared
/// libraries of accepted plugins are therefore never unloaded, not even
/// when the registry is dropped.
pub struct PluginRegistry {
    /// Loaded plugins indexed by name.
    plugins: RwLock<BTreeMap<String, Plugin>>,
    /// Factory handed to every plugin entry point.
    factory: Arc<TransformFactory>,
    /// Plugin loader instance.
    loader: PluginLoader,
}

impl PluginRegistry {
    /// Create a registry feeding a fresh factory.
    pub fn new() -> Self {
        Self::with_factory(Arc::new(TransformFactory::new()))
    }

    /// Create a registry feeding `factory`.
    pub fn with_factory(factory: Arc<TransformFactory>) -> Self {
        Self {
            plugins: RwLock::new(BTreeMap::new()),
            factory,
            loader: PluginLoader::new(),
        }
    }

    /// Create a registry feeding `factory` that only searches `paths`.
    pub fn with_search_paths(
        factory: Arc<TransformFactory>,
        paths: impl IntoIterator<Item = impl Into<PathBuf>>,
    ) -> Self {
        Self {
            plugins: RwLock::new(BTreeMap::new()),
            factory,
            loader: PluginLoader::with_search_paths(paths),
        }
    }

    /// Add a search path for plugins.
    pub fn add_search_path(&mut self, path: impl Into<PathBuf>) {
        self.loader.add_search_path(path);
    }

    /// The factory plugins register into.
    pub fn factory(&self) -> &Arc<TransformFactory> {
        &self.factory
    }

    /// The loader used for dynamic plugins.
    pub fn loader(&self) -> &PluginLoader {
        &self.loader
    }

    /// Register a plugin linked into the current binary.
    pub fn load_static(
        &self,
        descriptor: &'static PluginDescriptor,
    ) -> Result<PluginInfo, PluginError> {
        let plugin = Plugin::from_static(descriptor)?;
        self.register_plugin(plugin)
    }

    /// Load a plugin from a specific path.
    ///
    /// # Safety
    ///
    /// Loading plugins executes code from shared libraries.
    /// The plugin must be trusted and properly implement the plugin ABI.
    pub unsafe fn load_plugin(&self, path: impl AsRef<Path>) -> Result<PluginInfo, PluginError> {
        let path = path.as_ref();
        let span = span_plugin_load(&path.display().to_string());
        let _guard = span.enter();

        // SAFETY: Caller guarantees the plugin is trusted.
        let result = unsafe { self.loader.load_from_path(path) }
            .and_then(|plugin| self.register_plugin(plugin));
        if let Err(err) = &result {
            trace_plugin_rejected(&path.display().to_string(), err);
        }
        result
    }

    /// Load a plugin by name.
    ///
    /// # Safety
    ///
    /// Loading plugins executes code from shared libraries.
    /// The plugin must be trusted and properly implement the plugin ABI.
    pub unsafe fn load_plugin_by_name(&self, name: &str) -> Result<PluginInfo, PluginError> {
        let span = span_plugin_load(name);
        let _guard = span.enter();

        // SAFETY: Caller guarantees the plugin is trusted.
        let result = unsafe { self.loader.load_by_name(name) }
            .and_then(|plugin| self.register_plugin(plugin));
        if let Err(err) = &result {
            trace_plugin_rejected(name, err);
        }
        result
    }

    /// Scan a directory and load all plugins found.
    ///
    /// Rejected plugins are logged and skipped. Returns the number of
    /// successfully loaded plugins.
    ///
    /// # Safety
    ///
    /// Loading plugins executes code from shared libraries.
    /// All plugins in the directory must be trusted.
    pub unsafe fn load_all_from_dir(&self, dir: impl AsRef<Path>) -> usize {
        // SAFETY: Caller guarantees all plugins are trusted.
        let results = unsafe { self.loader.load_all_from_dir(dir) };
        let mut count = 0;
        for (path, result) in results {
            let span = span_plugin_load(&path.display().to_string());
            let _guard = span.enter();

            match result.and_then(|plugin| self.register_plugin(plugin)) {
                Ok(_) => count += 1,
                Err(err) => trace_plugin_rejected(&path.display().to_string(), &err),
            }
        }
        count
    }

    /// Run the plugin's registration against the factory and keep it.
    ///
    /// A plugin whose registration partially failed is still kept, since
    /// the transforms it did register point into its code. A kept plugin's
    /// library stays mapped until the process exits.
    fn register_plugin(&self, mut plugin: Plugin) -> Result<PluginInfo, PluginError> {
        let mut plugins = self.plugins.write();
        if plugins.contains_key(plugin.name()) {
            return Err(PluginError::AlreadyLoaded(plugin.name().to_string()));
        }

        let before = self.factory.registered_transforms();
        // SAFETY: The factory outlives the call and the descriptor was validated.
        let failures = unsafe { (plugin.descriptor().register)(factory_to_raw(&self.factory)) };
        let added: Vec<String> = self
            .factory
            .registered_transforms()
            .difference(&before)
            .cloned()
            .collect();

        plugin.info_mut().transforms = added;
        let info = plugin.info().clone();

        if failures != 0 && info.transforms.is_empty() {
            return Err(PluginError::RegistrationFailed {
                plugin: info.name,
                failures,
            });
        }

        plugin.keep_loaded();
        plugins.insert(info.name.clone(), plugin);
        drop(plugins);

        if failures != 0 {
            return Err(PluginError::RegistrationFailed {
                plugin: info.name,
                failures,
            });
        }

        trace_plugin_loaded(&info.name, &info.version, &info.transforms);
        record_plugin_loaded(&info.name);
        Ok(info)
    }

    /// Check if a plugin is loaded.
    pub fn has_plugin(&self, name: &str) -> bool {
        self.plugins.read().contains_key(name)
    }

    /// Get information about a loaded plugin.
    pub fn plugin_info(&self, name: &str) -> Option<PluginInfo> {
        self.plugins.read().get(name).map(|p| p.info().clone())
    }

    /// List all loaded plugins, sorted by name.
    pub fn list_plugins(&self) -> Vec<String> {
        self.plugins.read().keys().cloned().collect()
    }

    /// Get the plugin that provided a transform.
    ///
    /// Returns `None` for transforms registered outside any plugin.
    pub fn transform_plugin(&self, transform: &str) -> Option<String> {
        self.plugins
            .read()
            .values()
            .find(|p| p.info().transforms.iter().any(|t| t == transform))
            .map(|p| p.name().to_string())
    }
}

impl Default for PluginRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginRegistry")
            .field("plugins", &self.plugins.read().len())
            .field("factory", &self.factory)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::{CONTRACT_ID_CSTR, SERIESFORGE_ABI_VERSION, factory_from_raw};
    use crate::transforms::{Absolute, Scale};
    use std::ffi::{c_int, c_void};

    unsafe extern "C" fn register_scaling(factory: *const c_void) -> c_int {
        let Some(factory) = (unsafe { factory_from_raw(factory) }) else {
            return -1;
        };
        let mut failures = 0;
        if factory.register::<Scale>().is_err() {
            failures += 1;
        }
        if factory.register::<Absolute>().is_err() {
            failures += 1;
        }
        failures
    }

    unsafe extern "C" fn register_failing(_factory: *const c_void) -> c_int {
        2
    }

    static SCALING: PluginDescriptor = PluginDescriptor {
        abi_version: SERIESFORGE_ABI_VERSION,
        contract: CONTRACT_ID_CSTR.as_ptr(),
        name: c"scaling".as_ptr(),
        version: c"0.3.0".as_ptr(),
        description: c"Scaling transforms".as_ptr(),
        register: register_scaling,
    };

    static FAILING: PluginDescriptor = PluginDescriptor {
        abi_version: SERIESFORGE_ABI_VERSION,
        contract: CONTRACT_ID_CSTR.as_ptr(),
        name: c"failing".as_ptr(),
        version: c"0.1.0".as_ptr(),
        description: c"".as_ptr(),
        register: register_failing,
    };

    #[test]
    fn test_registry_creation() {
        let registry = PluginRegistry::new();
        assert!(registry.list_plugins().is_empty());
        assert!(registry.factory().is_empty());
    }

    #[test]
    fn test_registry_with_search_paths() {
        let registry =
            PluginRegistry::with_search_paths(Arc::new(TransformFactory::new()), ["/custom/path"]);
        assert!(registry.list_plugins().is_empty());
        assert_eq!(registry.loader().search_paths(), [PathBuf::from("/custom/path")]);
    }

    #[test]
    fn test_load_static_registers_transforms() {
        let registry = PluginRegistry::new();
        let info = registry.load_static(&SCALING).unwrap();

        assert_eq!(info.name, "scaling");
        assert_eq!(info.version, "0.3.0");
        assert_eq!(info.transforms, vec!["absolute".to_string(), "scale".to_string()]);
        assert!(registry.has_plugin("scaling"));
        assert!(registry.factory().create("scale").is_some());
        assert_eq!(registry.transform_plugin("absolute").as_deref(), Some("scaling"));
    }

    #[test]
    fn test_load_static_twice() {
        let registry = PluginRegistry::new();
        registry.load_static(&SCALING).unwrap();
        let result = registry.load_static(&SCALING);
        assert!(matches!(result, Err(PluginError::AlreadyLoaded(ref name)) if name == "scaling"));
        assert_eq!(registry.list_plugins(), vec!["scaling".to_string()]);
    }

    #[test]
    fn test_only_new_transforms_attributed() {
        let factory = Arc::new(TransformFactory::new());
        factory.register::<Scale>().unwrap();

        let registry = PluginRegistry::with_factory(factory);
        let info = registry.load_static(&SCALING).unwrap();
        assert_eq!(info.transforms, vec!["absolute".to_string()]);
        assert!(registry.transform_plugin("scale").is_none());
    }

    #[test]
    fn test_registration_failure_reported() {
        let registry = PluginRegistry::new();
        let result = registry.load_static(&FAILING);
        assert!(matches!(
            result,
            Err(PluginError::RegistrationFailed { failures: 2, .. })
        ));
        assert!(!registry.has_plugin("failing"));
    }

    #[test]
    fn test_sealed_factory_rejects_plugin() {
        let registry = PluginRegistry::new();
        registry.factory().seal();
        let result = registry.load_static(&SCALING);
        assert!(matches!(
            result,
            Err(PluginError::RegistrationFailed { failures: 2, .. })
        ));
        assert!(registry.factory().is_empty());
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_library_outlives_registry() {
        let library = unsafe { libloading::Library::new("libc.so.6") }.unwrap();
        let plugin = unsafe { Plugin::from_parts(Some(Arc::new(library)), &SCALING) }.unwrap();
        let library = plugin.library_weak().unwrap();

        let factory = Arc::new(TransformFactory::new());
        let registry = PluginRegistry::with_factory(factory.clone());
        registry.register_plugin(plugin).unwrap();
        drop(registry);

        assert!(library.upgrade().is_some());
        assert!(factory.create("scale").is_some());
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_rejected_library_released() {
        let library = unsafe { libloading::Library::new("libc.so.6") }.unwrap();
        let plugin = unsafe { Plugin::from_parts(Some(Arc::new(library)), &FAILING) }.unwrap();
        let library = plugin.library_weak().unwrap();

        let registry = PluginRegistry::new();
        assert!(registry.register_plugin(plugin).is_err());
        assert!(library.upgrade().is_none());
    }

    #[test]
    fn test_load_nonexistent_plugin() {
        let registry = PluginRegistry::with_search_paths(
            Arc::new(TransformFactory::new()),
            ["/nonexistent/dir"],
        );
        let result = unsafe { registry.load_plugin_by_name("nonexistent_plugin_xyz") };
        assert!(matches!(result, Err(PluginError::LoadFailed(_))));
    }

    #[test]
    fn test_load_all_from_empty_dir() {
        let dir = tempfile::tempdir().unwrap();
        let registry = PluginRegistry::new();
        assert_eq!(unsafe { registry.load_all_from_dir(dir.path()) }, 0);
    }
}
