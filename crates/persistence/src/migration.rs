//! Schema-version catalog.
//!
//! Each tenant schema carries a `versions` table recording which migrations
//! have been applied to it. [`MigrationsDao`] maintains that catalog and
//! offers the idempotency helpers migrations rely on: a version is applied
//! at most once per schema, and structural changes check the database
//! catalog before acting.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::error::{PersistenceError, PersistenceResult};
use crate::executor::QueryExecutor;
use crate::paging::PagedQuery;
use crate::params::Params;
use crate::registry::Dao;
use crate::tenant::{SchemaBinder, TenantContext};

const VERSIONS_TABLE: &str = "versions";

const CREATE_VERSIONS_SQL: &str = "CREATE TABLE versions (\
     installed_version character varying(20) NOT NULL PRIMARY KEY, \
     installed_at timestamp NOT NULL DEFAULT now())";

const INSTALLED_VERSIONS_SQL: &str =
    "SELECT installed_version FROM versions ORDER BY installed_version";

const IS_INSTALLED_SQL: &str =
    "SELECT count(*) AS count FROM versions WHERE installed_version = $1";

const RECORD_VERSION_SQL: &str = "INSERT INTO versions (installed_version) VALUES ($1)";

/// Maintains the per-schema catalog of applied migration versions.
pub struct MigrationsDao {
    executor: Arc<QueryExecutor>,
}

impl Dao for MigrationsDao {
    fn create(executor: Arc<QueryExecutor>) -> PersistenceResult<Self> {
        Ok(Self { executor })
    }
}

impl MigrationsDao {
    /// Creates the `versions` table in the context's schema if absent.
    ///
    /// Returns whether the table exists afterwards, so repeated calls are
    /// harmless.
    pub async fn ensure_catalog(&self, ctx: &TenantContext) -> PersistenceResult<bool> {
        if self
            .executor
            .check_table_existence(ctx, VERSIONS_TABLE)
            .await?
        {
            return Ok(true);
        }

        self.executor
            .on_transaction_context(ctx, |txn| {
                Box::pin(async move { txn.batch_execute(CREATE_VERSIONS_SQL).await })
            })
            .await?;
        Ok(true)
    }

    /// Returns the set of versions applied to the context's schema.
    pub async fn installed_versions(
        &self,
        ctx: &TenantContext,
    ) -> PersistenceResult<BTreeSet<String>> {
        let versions: Vec<String> = self
            .executor
            .list_with(
                ctx,
                |row| Ok(row.try_get("installed_version")?),
                INSTALLED_VERSIONS_SQL,
                &Params::new(),
            )
            .await?;
        Ok(versions.into_iter().collect())
    }

    /// Returns whether `version` has been applied to the context's schema.
    pub async fn is_installed(&self, ctx: &TenantContext, version: &str) -> PersistenceResult<bool> {
        let found = self
            .executor
            .fetch_one(
                ctx,
                |row| Ok(row.try_get::<_, i64>("count")? >= 1),
                IS_INSTALLED_SQL,
                &Params::new().bind(version),
            )
            .await?;
        Ok(found.unwrap_or(false))
    }

    /// Applies a migration and records its version, atomically.
    ///
    /// The migration's statements and the catalog insert share one
    /// transaction, so a half-applied migration is never recorded. Applying
    /// an already-installed version is a no-op that reports `false`.
    pub async fn apply<F>(
        &self,
        ctx: &TenantContext,
        version: &str,
        migration: F,
    ) -> PersistenceResult<bool>
    where
        F: for<'t> FnOnce(
                &'t crate::transaction::Transaction,
            ) -> futures::future::BoxFuture<'t, PersistenceResult<()>>
            + Send
            + 'static,
    {
        if self.is_installed(ctx, version).await? {
            return Ok(false);
        }

        let version = version.to_string();
        self.executor
            .on_transaction_context(ctx, move |txn| {
                Box::pin(async move {
                    migration(txn).await?;
                    let affected = txn
                        .execute(RECORD_VERSION_SQL, &Params::new().bind(version.clone()))
                        .await?;
                    if affected != 1 {
                        return Err(PersistenceError::query(format!(
                            "failed to record migration version {}",
                            version
                        )));
                    }
                    Ok(())
                })
            })
            .await?;
        Ok(true)
    }

    /// Adds a column to a table in the context's schema if absent.
    ///
    /// `definition` is the column's SQL type and constraints, e.g.
    /// `"character varying(255) DEFAULT NULL"`. Returns whether the column
    /// was added by this call.
    pub async fn add_column_if_missing(
        &self,
        ctx: &TenantContext,
        table: &str,
        column: &str,
        definition: &str,
    ) -> PersistenceResult<bool> {
        if self
            .executor
            .check_column_existence(ctx, table, column)
            .await?
        {
            return Ok(false);
        }

        let sql = format!(
            "ALTER TABLE {} ADD COLUMN {} {}",
            SchemaBinder::escape_identifier(table),
            SchemaBinder::escape_identifier(column),
            definition
        );
        self.executor
            .on_transaction_context(ctx, move |txn| {
                Box::pin(async move { txn.batch_execute(&sql).await })
            })
            .await?;
        Ok(true)
    }

    /// Lists one page of applied versions plus the total.
    pub async fn paged_installed_versions(
        &self,
        ctx: &TenantContext,
        limit: i64,
        offset: i64,
    ) -> PersistenceResult<crate::paging::PagedResult<String>> {
        let query = PagedQuery::for_select("installed_version", VERSIONS_TABLE, "installed_version");
        self.executor
            .paged_list_with(
                ctx,
                |row| Ok(row.try_get("installed_version")?),
                &query,
                limit,
                offset,
                &Params::new(),
            )
            .await
    }
}
