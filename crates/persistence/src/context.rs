//! Top-level persistence context.
//!
//! [`PersistenceContext`] wires the shared pool, executor and DAO registry
//! together and is the single handle application code holds. It is cheap to
//! clone and safe to share across tasks; every collaborator is reached from
//! it rather than from process-wide statics.

use std::sync::Arc;

use crate::error::PersistenceResult;
use crate::executor::QueryExecutor;
use crate::pool::{ConnectionProvider, PoolConfig};
use crate::registry::{Dao, DaoRegistry};

/// The assembled persistence core: pool, executor and DAO registry.
#[derive(Clone)]
pub struct PersistenceContext {
    config: Arc<PoolConfig>,
    provider: ConnectionProvider,
    executor: Arc<QueryExecutor>,
    registry: Arc<DaoRegistry>,
}

impl std::fmt::Debug for PersistenceContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistenceContext")
            .field("provider", &self.provider)
            .field("registry", &self.registry)
            .finish()
    }
}

impl PersistenceContext {
    /// Assembles the context from the given configuration.
    ///
    /// The underlying pool is lazy, so this performs no I/O; the first
    /// statement issued through the executor opens the first connection.
    pub fn open(config: PoolConfig) -> PersistenceResult<Self> {
        let provider = ConnectionProvider::new(&config)?;
        let executor = Arc::new(QueryExecutor::new(provider.clone()));
        let registry = Arc::new(DaoRegistry::new(Arc::clone(&executor)));

        Ok(Self {
            config: Arc::new(config),
            provider,
            executor,
            registry,
        })
    }

    /// Assembles the context and verifies connectivity up front.
    ///
    /// Like [`open`](Self::open), but acquires one connection and applies
    /// the configured statement timeout before returning, so a misconfigured
    /// database fails here rather than on the first request.
    pub async fn connect(config: PoolConfig) -> PersistenceResult<Self> {
        let provider = ConnectionProvider::connect(&config).await?;
        let executor = Arc::new(QueryExecutor::new(provider.clone()));
        let registry = Arc::new(DaoRegistry::new(Arc::clone(&executor)));

        Ok(Self {
            config: Arc::new(config),
            provider,
            executor,
            registry,
        })
    }

    /// Assembles the context from `ALX_PG_*` environment variables.
    pub fn open_from_env() -> PersistenceResult<Self> {
        Self::open(PoolConfig::from_env())
    }

    /// Returns the configuration this context was assembled from.
    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Returns the shared connection provider.
    pub fn provider(&self) -> &ConnectionProvider {
        &self.provider
    }

    /// Returns the shared query executor.
    pub fn executor(&self) -> &Arc<QueryExecutor> {
        &self.executor
    }

    /// Returns the DAO registry.
    pub fn registry(&self) -> &Arc<DaoRegistry> {
        &self.registry
    }

    /// Returns the shared instance of `D`, constructing it on first request.
    ///
    /// `None` means the DAO's factory failed; see [`DaoRegistry::get_or_create`].
    pub fn dao<D: Dao>(&self) -> Option<Arc<D>> {
        self.registry.get_or_create::<D>()
    }
}
