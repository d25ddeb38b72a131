//! Tenant-aware PostgreSQL persistence core.
//!
//! Every library (tenant) lives in its own PostgreSQL schema inside one
//! shared database, and every operation executes against exactly one
//! tenant's schema. The crate provides the plumbing that makes that safe
//! and uniform:
//!
//! - [`TenantContext`]: a validated tenant identity carried explicitly by
//!   every operation.
//! - [`ConnectionProvider`]: one process-wide pool serving all tenants.
//! - [`SchemaBinder`]: scopes a pooled connection to a tenant by setting its
//!   `search_path` on every acquisition.
//! - [`Params`] / [`SqlValue`]: a closed set of typed bind parameters,
//!   including typed NULLs.
//! - [`QueryExecutor`]: generic fetch/list/update/batch/paged/transactional
//!   execution that DAOs build on.
//! - [`DaoRegistry`] / [`PersistenceContext`]: explicit construction and
//!   sharing of DAO instances, no process-wide statics.
//! - [`MigrationsDao`]: the per-schema catalog of applied migration
//!   versions.
//!
//! # Example
//!
//! ```no_run
//! use alexandria_persistence::{Params, PersistenceContext, PoolConfig, TenantContext};
//!
//! # async fn run() -> alexandria_persistence::PersistenceResult<()> {
//! let ctx = PersistenceContext::open(PoolConfig::from_env())?;
//! let tenant = TenantContext::new("lib_a")?;
//!
//! let title: Option<String> = ctx
//!     .executor()
//!     .fetch_one(
//!         &tenant,
//!         |row| Ok(row.try_get("title")?),
//!         "SELECT title FROM items WHERE id = $1",
//!         &Params::new().bind(1i32),
//!     )
//!     .await?;
//! # let _ = title;
//! # Ok(())
//! # }
//! ```

pub mod context;
pub mod error;
pub mod executor;
pub mod migration;
pub mod paging;
pub mod params;
pub mod pool;
pub mod registry;
pub mod tenant;
pub mod transaction;

pub use context::PersistenceContext;
pub use error::{PersistenceError, PersistenceResult};
pub use executor::QueryExecutor;
pub use migration::MigrationsDao;
pub use paging::{PagedQuery, PagedResult, Paging};
pub use params::{Params, SqlValue};
pub use pool::{ConnectionProvider, PgSslMode, PoolConfig};
pub use registry::{Dao, DaoRegistry};
pub use tenant::{SchemaBinder, TenantContext};
