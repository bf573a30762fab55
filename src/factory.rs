//! Transform factory: name-indexed registry of transform constructors.
//!
//! Plugin modules register transform types; the host enumerates
//! [`TransformFactory::registered_transforms`] to populate its UI and calls
//! [`TransformFactory::create`] when the user picks one.
//!
//! # Phases
//!
//! The factory is populated during an initialization phase and queried
//! afterwards. [`TransformFactory::seal`] ends the initialization phase:
//! later registrations fail with [`Error::RegistrySealed`]. All operations
//! take the internal lock, so concurrent registration and lookup are safe
//! even before sealing.
//!
//! # Process-wide instance
//!
//! [`TransformFactory::global`] returns the single process-wide factory,
//! created on first use and never torn down. Dynamically loaded plugins do
//! not reach for it: the host hands its factory to each plugin's entry point
//! (see [`crate::plugin`]).
//!
//! # Example
//!
//! ```rust
//! use seriesforge::factory::TransformFactory;
//! use seriesforge::transforms::{Derivative, PassThrough};
//!
//! let factory = TransformFactory::new();
//! factory.register::<PassThrough>().unwrap();
//! factory.register::<Derivative>().unwrap();
//! factory.seal();
//!
//! assert!(factory.registered_transforms().contains("derivative"));
//! let transform = factory.create("passthrough").unwrap();
//! assert_eq!(transform.name(), "passthrough");
//! assert!(factory.create("missing").is_none());
//! ```

use crate::error::{Error, Result};
use crate::observability::{record_transform_created, record_transform_registered};
use crate::transform::{TransformKind, TransformPtr};
use parking_lot::RwLock;
use std::any::TypeId;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, OnceLock};

/// Constructor installed for a registered transform.
type TransformConstructor = fn() -> TransformPtr;

struct Entry {
    type_id: TypeId,
    type_name: &'static str,
    description: &'static str,
    create: TransformConstructor,
}

#[derive(Default)]
struct Inner {
    entries: BTreeMap<String, Entry>,
    sealed: bool,
}

fn construct<T: TransformKind>() -> TransformPtr {
    Box::new(T::default())
}

/// Registry of transform constructors, indexed by transform name.
pub struct TransformFactory {
    inner: RwLock<Inner>,
}

impl TransformFactory {
    /// Create an empty, unsealed factory.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
        }
    }

    /// The process-wide factory.
    pub fn global() -> &'static TransformFactory {
        global_slot()
    }

    /// Shared handle to the process-wide factory.
    pub fn global_handle() -> Arc<TransformFactory> {
        global_slot().clone()
    }

    /// Register transform type `T` under [`TransformKind::NAME`].
    ///
    /// Registering the same type again is a no-op. Registering a different
    /// type under a taken name fails with [`Error::DuplicateTransform`] and
    /// keeps the existing registration. A type whose instances report a
    /// different [`name`](crate::transform::TimeSeriesTransform::name) fails
    /// with [`Error::NameMismatch`].
    pub fn register<T: TransformKind>(&self) -> Result<()> {
        let name = T::NAME;
        let reported = T::default().name();
        if reported != name {
            tracing::warn!(
                transform = name,
                reported,
                "registration rejected: instance name differs"
            );
            return Err(Error::NameMismatch {
                name: name.to_string(),
                reported: reported.to_string(),
            });
        }

        let mut inner = self.inner.write();

        if inner.sealed {
            tracing::warn!(transform = name, "registration rejected: factory sealed");
            return Err(Error::RegistrySealed {
                name: name.to_string(),
            });
        }

        if let Some(existing) = inner.entries.get(name) {
            if existing.type_id == TypeId::of::<T>() {
                tracing::debug!(transform = name, "transform already registered");
                return Ok(());
            }
            tracing::warn!(
                transform = name,
                existing = existing.type_name,
                rejected = std::any::type_name::<T>(),
                "duplicate transform name rejected"
            );
            return Err(Error::DuplicateTransform {
                name: name.to_string(),
            });
        }

        inner.entries.insert(
            name.to_string(),
            Entry {
                type_id: TypeId::of::<T>(),
                type_name: std::any::type_name::<T>(),
                description: T::DESCRIPTION,
                create: construct::<T>,
            },
        );
        drop(inner);

        tracing::info!(transform = name, "transform registered");
        record_transform_registered(name);
        Ok(())
    }

    /// Create a new instance of the transform registered as `name`.
    ///
    /// Returns `None` if no transform has that name. The factory keeps no
    /// reference to the instance.
    pub fn create(&self, name: &str) -> Option<TransformPtr> {
        let create = self.inner.read().entries.get(name).map(|e| e.create);
        match create {
            Some(create) => {
                record_transform_created(name);
                Some(create())
            }
            None => {
                tracing::debug!(transform = name, "unknown transform requested");
                None
            }
        }
    }

    /// Snapshot of every registered name.
    pub fn registered_transforms(&self) -> BTreeSet<String> {
        self.inner.read().entries.keys().cloned().collect()
    }

    /// Check if a transform is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.inner.read().entries.contains_key(name)
    }

    /// Description of a registered transform.
    pub fn description(&self, name: &str) -> Option<&'static str> {
        self.inner.read().entries.get(name).map(|e| e.description)
    }

    /// Number of registered transforms.
    pub fn len(&self) -> usize {
        self.inner.read().entries.len()
    }

    /// Check if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.inner.read().entries.is_empty()
    }

    /// End the initialization phase. Idempotent.
    pub fn seal(&self) {
        let mut inner = self.inner.write();
        if !inner.sealed {
            inner.sealed = true;
            tracing::info!(transforms = inner.entries.len(), "transform factory sealed");
        }
    }

    /// Check if the initialization phase is over.
    pub fn is_sealed(&self) -> bool {
        self.inner.read().sealed
    }
}

impl Default for TransformFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TransformFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.read();
        f.debug_struct("TransformFactory")
            .field("transforms", &inner.entries.len())
            .field("sealed", &inner.sealed)
            .finish()
    }
}

fn global_slot() -> &'static Arc<TransformFactory> {
    static GLOBAL: OnceLock<Arc<TransformFactory>> = OnceLock::new();
    GLOBAL.get_or_init(|| Arc::new(TransformFactory::new()))
}

/// Names registered with the process-wide factory.
pub fn registered_transforms() -> BTreeSet<String> {
    TransformFactory::global().registered_transforms()
}

/// Register `T` with the process-wide factory.
pub fn register_transform<T: TransformKind>() -> Result<()> {
    TransformFactory::global().register::<T>()
}

/// Create a transform from the process-wide factory.
pub fn create(name: &str) -> Option<TransformPtr> {
    TransformFactory::global().create(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::TimeSeries;
    use crate::series_transform;
    use crate::transform::{TimeSeriesTransform, TransformState};

    macro_rules! test_transform {
        ($ty:ident, $name:tt) => {
            #[series_transform(name = $name, description = "test transform")]
            #[derive(Default)]
            struct $ty {
                state: TransformState,
            }

            impl TimeSeriesTransform for $ty {
                fn name(&self) -> &'static str {
                    Self::NAME
                }

                fn calculate(&mut self, _destination: &mut TimeSeries) -> Result<()> {
                    Ok(())
                }

                fn state(&self) -> &TransformState {
                    &self.state
                }

                fn state_mut(&mut self) -> &mut TransformState {
                    &mut self.state
                }
            }
        };
    }

    test_transform!(Alpha, "alpha");
    test_transform!(Beta, "beta");
    test_transform!(AlphaImpostor, "alpha");

    /// Declares one name but answers with another.
    #[series_transform(name = "declared")]
    #[derive(Default)]
    struct Misnamed {
        state: TransformState,
    }

    impl TimeSeriesTransform for Misnamed {
        fn name(&self) -> &'static str {
            "other"
        }

        fn calculate(&mut self, _destination: &mut TimeSeries) -> Result<()> {
            Ok(())
        }

        fn state(&self) -> &TransformState {
            &self.state
        }

        fn state_mut(&mut self) -> &mut TransformState {
            &mut self.state
        }
    }

    #[test]
    fn test_factory_creation() {
        let factory = TransformFactory::new();
        assert!(factory.is_empty());
        assert!(!factory.is_sealed());
        assert!(factory.registered_transforms().is_empty());
    }

    #[test]
    fn test_create_returns_named_instance() {
        let factory = TransformFactory::new();
        factory.register::<Alpha>().unwrap();

        let transform = factory.create("alpha").unwrap();
        assert_eq!(transform.name(), "alpha");
        assert_eq!(factory.description("alpha"), Some("test transform"));
    }

    #[test]
    fn test_create_not_found() {
        let factory = TransformFactory::new();
        factory.register::<Alpha>().unwrap();
        assert!(factory.create("gamma").is_none());
        assert!(factory.description("gamma").is_none());
    }

    #[test]
    fn test_registration_order_irrelevant() {
        let forward = TransformFactory::new();
        forward.register::<Alpha>().unwrap();
        forward.register::<Beta>().unwrap();

        let backward = TransformFactory::new();
        backward.register::<Beta>().unwrap();
        backward.register::<Alpha>().unwrap();

        let expected: BTreeSet<String> = ["alpha", "beta"].into_iter().map(String::from).collect();
        assert_eq!(forward.registered_transforms(), expected);
        assert_eq!(backward.registered_transforms(), expected);
    }

    #[test]
    fn test_register_same_type_twice() {
        let factory = TransformFactory::new();
        factory.register::<Alpha>().unwrap();
        factory.register::<Alpha>().unwrap();
        assert_eq!(factory.len(), 1);
        assert_eq!(factory.create("alpha").unwrap().name(), "alpha");
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let factory = TransformFactory::new();
        factory.register::<Alpha>().unwrap();

        let err = factory.register::<AlphaImpostor>().unwrap_err();
        assert!(matches!(err, Error::DuplicateTransform { ref name } if name == "alpha"));
        assert_eq!(factory.len(), 1);
    }

    #[test]
    fn test_name_mismatch_rejected() {
        let factory = TransformFactory::new();

        let err = factory.register::<Misnamed>().unwrap_err();
        assert!(matches!(
            err,
            Error::NameMismatch { ref name, ref reported } if name == "declared" && reported == "other"
        ));
        assert!(factory.is_empty());
        assert!(factory.create("declared").is_none());
    }

    #[test]
    fn test_sealed_rejects_registration() {
        let factory = TransformFactory::new();
        factory.register::<Alpha>().unwrap();
        factory.seal();
        factory.seal();

        assert!(factory.is_sealed());
        assert!(matches!(
            factory.register::<Beta>(),
            Err(Error::RegistrySealed { .. })
        ));
        assert!(factory.create("alpha").is_some());
        assert!(!factory.contains("beta"));
    }

    #[test]
    fn test_instances_are_independent() {
        let factory = TransformFactory::new();
        factory.register::<Alpha>().unwrap();

        let mut first = factory.create("alpha").unwrap();
        let second = factory.create("alpha").unwrap();
        first.set_alias("first");
        assert_eq!(second.alias(), "");
    }

    #[test]
    fn test_global_is_shared() {
        assert!(std::ptr::eq(TransformFactory::global(), TransformFactory::global()));
        assert!(std::ptr::eq(
            Arc::as_ptr(&TransformFactory::global_handle()),
            TransformFactory::global()
        ));
    }

    #[test]
    fn test_concurrent_registration() {
        let factory = Arc::new(TransformFactory::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let factory = factory.clone();
                std::thread::spawn(move || {
                    factory.register::<Alpha>().unwrap();
                    factory.register::<Beta>().unwrap();
                    factory.create("alpha").is_some()
                })
            })
            .collect();

        for handle in handles {
            assert!(handle.join().unwrap());
        }
        assert_eq!(factory.len(), 2);
    }
}
