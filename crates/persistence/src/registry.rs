//! Shared DAO instances.
//!
//! DAOs are stateless given their executor, so the registry hands out one
//! shared instance per DAO type for the life of the process. Construction
//! goes through an explicit factory ([`Dao::create`]) rather than any
//! runtime reflection; a factory failure is logged and reported as absence,
//! and a later request retries construction.

use std::any::{Any, TypeId, type_name};
use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::PersistenceResult;
use crate::executor::QueryExecutor;

/// A data-access object constructible from the shared executor.
///
/// Implementations must be stateless beyond the executor handle (plus any
/// immutable configuration captured at construction), since one instance is
/// shared by every caller concurrently.
pub trait Dao: Send + Sync + Sized + 'static {
    /// Constructs the DAO over the shared executor.
    fn create(executor: Arc<QueryExecutor>) -> PersistenceResult<Self>;
}

/// Process-wide cache of one instance per DAO type.
///
/// Lookups are lock-cheap reads; the write lock is taken only on first
/// request, and construction happens while holding it, so a factory runs at
/// most once per type no matter how many callers race the first access.
pub struct DaoRegistry {
    executor: Arc<QueryExecutor>,
    instances: RwLock<HashMap<TypeId, Arc<dyn Any + Send + Sync>>>,
}

impl std::fmt::Debug for DaoRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DaoRegistry")
            .field("instances", &self.instances.read().len())
            .finish()
    }
}

impl DaoRegistry {
    /// Creates an empty registry over the shared executor.
    pub fn new(executor: Arc<QueryExecutor>) -> Self {
        Self {
            executor,
            instances: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the shared instance of `D`, constructing it on first request.
    ///
    /// Returns `None` when construction fails; the failure is logged with
    /// the DAO's type name, and nothing is cached, so the next request
    /// retries.
    pub fn get_or_create<D: Dao>(&self) -> Option<Arc<D>> {
        let key = TypeId::of::<D>();

        if let Some(existing) = self.instances.read().get(&key) {
            return existing.clone().downcast::<D>().ok();
        }

        let mut instances = self.instances.write();
        // Re-check under the write lock; a concurrent first access may have
        // installed the instance while we waited for it.
        if let Some(existing) = instances.get(&key) {
            return existing.clone().downcast::<D>().ok();
        }

        // Construct while holding the lock so the factory runs at most once
        // per type. Factories only capture the executor handle; they issue
        // no statements, so nothing blocks under the lock.
        match D::create(Arc::clone(&self.executor)) {
            Ok(dao) => {
                let instance = Arc::new(dao);
                instances.insert(key, instance.clone());
                Some(instance)
            }
            Err(error) => {
                tracing::error!(
                    dao = type_name::<D>(),
                    error = %error,
                    "failed to construct DAO instance"
                );
                None
            }
        }
    }

    /// Returns the number of cached DAO instances.
    pub fn len(&self) -> usize {
        self.instances.read().len()
    }

    /// Returns `true` if no DAO has been constructed yet.
    pub fn is_empty(&self) -> bool {
        self.instances.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PersistenceError;
    use crate::pool::{ConnectionProvider, PoolConfig};

    struct ItemDao {
        #[allow(dead_code)]
        executor: Arc<QueryExecutor>,
    }

    impl Dao for ItemDao {
        fn create(executor: Arc<QueryExecutor>) -> PersistenceResult<Self> {
            Ok(Self { executor })
        }
    }

    struct BrokenDao;

    impl Dao for BrokenDao {
        fn create(_executor: Arc<QueryExecutor>) -> PersistenceResult<Self> {
            Err(PersistenceError::InstanceCreation {
                type_name: "BrokenDao",
                message: "missing configuration".to_string(),
            })
        }
    }

    fn test_registry() -> DaoRegistry {
        let provider = ConnectionProvider::new(&PoolConfig::default()).unwrap();
        DaoRegistry::new(Arc::new(QueryExecutor::new(provider)))
    }

    #[test]
    fn test_same_instance_returned() {
        let registry = test_registry();
        let first = registry.get_or_create::<ItemDao>().unwrap();
        let second = registry.get_or_create::<ItemDao>().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_factory_failure_reported_as_absence() {
        let registry = test_registry();
        assert!(registry.get_or_create::<BrokenDao>().is_none());
        // Nothing cached; a later request retries construction.
        assert!(registry.is_empty());
        assert!(registry.get_or_create::<BrokenDao>().is_none());
    }

    #[test]
    fn test_concurrent_first_access_constructs_once() {
        use std::sync::Barrier;
        use std::sync::atomic::{AtomicUsize, Ordering};

        static FACTORY_RUNS: AtomicUsize = AtomicUsize::new(0);

        struct CountingDao;

        impl Dao for CountingDao {
            fn create(_executor: Arc<QueryExecutor>) -> PersistenceResult<Self> {
                FACTORY_RUNS.fetch_add(1, Ordering::SeqCst);
                Ok(Self)
            }
        }

        let registry = test_registry();
        let barrier = Barrier::new(8);

        std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    scope.spawn(|| {
                        barrier.wait();
                        registry.get_or_create::<CountingDao>().unwrap()
                    })
                })
                .collect();

            let instances: Vec<Arc<CountingDao>> =
                handles.into_iter().map(|h| h.join().unwrap()).collect();
            for instance in &instances[1..] {
                assert!(Arc::ptr_eq(&instances[0], instance));
            }
        });

        assert_eq!(FACTORY_RUNS.load(Ordering::SeqCst), 1);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_distinct_types_get_distinct_instances() {
        struct OtherDao;
        impl Dao for OtherDao {
            fn create(_executor: Arc<QueryExecutor>) -> PersistenceResult<Self> {
                Ok(Self)
            }
        }

        let registry = test_registry();
        assert!(registry.get_or_create::<ItemDao>().is_some());
        assert!(registry.get_or_create::<OtherDao>().is_some());
        assert_eq!(registry.len(), 2);
    }
}
