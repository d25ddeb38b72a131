//! Generic query-execution primitives.
//!
//! [`QueryExecutor`] is the surface feature DAOs build on: fetch-one,
//! fetch-many, paged fetch, update, batch update and transaction-scoped
//! execution, all generic over caller-supplied SQL, bind parameters and row
//! mappers - no per-entity boilerplate. Every operation takes a
//! [`TenantContext`], acquires a pooled connection, binds it to the tenant's
//! schema, executes, and releases the connection on every exit path.

use futures::future::BoxFuture;
use tokio_postgres::Row;

use crate::error::{PersistenceError, PersistenceResult};
use crate::paging::{PagedQuery, PagedResult, Paging};
use crate::params::Params;
use crate::pool::ConnectionProvider;
use crate::tenant::{SchemaBinder, TenantContext};
use crate::transaction::Transaction;

const CHECK_TABLE_EXISTENCE_SQL: &str = "SELECT count(*) AS count \
     FROM information_schema.tables \
     WHERE table_schema = $1 AND table_name = $2";

const CHECK_COLUMN_EXISTENCE_SQL: &str = "SELECT count(*) AS count \
     FROM information_schema.columns \
     WHERE table_schema = $1 AND table_name = $2 AND column_name = $3";

/// Tenant-scoped query execution over the shared pool.
///
/// The executor holds no per-tenant state; each call re-derives its scoping
/// from the [`TenantContext`] argument. Concurrent callers run independently
/// and are serialized only at the database level.
///
/// Connection lifecycle per operation:
/// acquired, schema-bound, executing (auto-commit or transactional),
/// released. Release happens when the pooled client drops, so it cannot be
/// skipped by an early error return.
pub struct QueryExecutor {
    provider: ConnectionProvider,
}

impl std::fmt::Debug for QueryExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryExecutor")
            .field("provider", &self.provider)
            .finish()
    }
}

impl QueryExecutor {
    /// Creates an executor over the given connection provider.
    pub fn new(provider: ConnectionProvider) -> Self {
        Self { provider }
    }

    /// Acquires a connection and binds it to the tenant's schema.
    async fn bound_client(&self, ctx: &TenantContext) -> PersistenceResult<deadpool_postgres::Client> {
        let client = self.provider.acquire().await?;
        SchemaBinder::bind(&client, ctx).await?;
        Ok(client)
    }

    /// Fetches at most one row and maps it.
    ///
    /// Returns `Ok(None)` when no row matched. When the query yields more
    /// than one row, the first is mapped and the rest are discarded.
    pub async fn fetch_one<T, F>(
        &self,
        ctx: &TenantContext,
        mapper: F,
        sql: &str,
        params: &Params,
    ) -> PersistenceResult<Option<T>>
    where
        F: Fn(&Row) -> PersistenceResult<T>,
    {
        let client = self.bound_client(ctx).await?;
        let row = client
            .query(sql, &params.as_sql())
            .await?
            .into_iter()
            .next();

        row.as_ref().map(mapper).transpose()
    }

    /// Fetches every row in result order and maps each.
    ///
    /// Returns an empty vector (never an error) when no rows match.
    pub async fn list_with<T, F>(
        &self,
        ctx: &TenantContext,
        mapper: F,
        sql: &str,
        params: &Params,
    ) -> PersistenceResult<Vec<T>>
    where
        F: Fn(&Row) -> PersistenceResult<T>,
    {
        let client = self.bound_client(ctx).await?;
        let rows = client.query(sql, &params.as_sql()).await?;

        rows.iter().map(mapper).collect()
    }

    /// Executes a statement and returns the number of rows affected.
    pub async fn execute(
        &self,
        ctx: &TenantContext,
        sql: &str,
        params: &Params,
    ) -> PersistenceResult<u64> {
        let client = self.bound_client(ctx).await?;
        Ok(client.execute(sql, &params.as_sql()).await?)
    }

    /// Executes an update-style statement.
    ///
    /// Returns whether at least one row was affected.
    pub async fn execute_update(
        &self,
        ctx: &TenantContext,
        sql: &str,
        params: &Params,
    ) -> PersistenceResult<bool> {
        Ok(self.execute(ctx, sql, params).await? > 0)
    }

    /// Executes one parameterized statement for every item, atomically.
    ///
    /// The statement is prepared once on one bound connection; each item's
    /// parameters come from `bind`, and all executions run inside a single
    /// transaction. Any item's failure rolls the whole batch back - no
    /// subset of the items persists - and surfaces as one persistence error.
    pub async fn execute_batch_update<T, F>(
        &self,
        ctx: &TenantContext,
        bind: F,
        items: &[T],
        sql: &str,
    ) -> PersistenceResult<bool>
    where
        F: Fn(&T) -> Params,
    {
        if items.is_empty() {
            return Ok(true);
        }

        let client = self.bound_client(ctx).await?;
        let txn = Transaction::begin(client).await?;

        let outcome = async {
            let statement = txn.prepare(sql).await?;
            for item in items {
                let params = bind(item);
                txn.execute_prepared(&statement, &params).await?;
            }
            Ok::<(), PersistenceError>(())
        }
        .await;

        match outcome {
            Ok(()) => {
                txn.commit().await?;
                Ok(true)
            }
            Err(cause) => {
                if let Err(rollback_err) = txn.rollback().await {
                    tracing::warn!(error = %rollback_err, "batch rollback failed");
                }
                Err(cause)
            }
        }
    }

    /// Fetches one page of results plus the unpaged total count.
    ///
    /// The data query executes with `limit` and `offset` appended as the
    /// final two bind parameters, after all caller-supplied ones, in that
    /// fixed order; the count query executes with the caller-supplied
    /// parameters only. Both run on the same bound connection.
    pub async fn paged_list_with<T, F>(
        &self,
        ctx: &TenantContext,
        mapper: F,
        query: &PagedQuery,
        limit: i64,
        offset: i64,
        params: &Params,
    ) -> PersistenceResult<PagedResult<T>>
    where
        F: Fn(&Row) -> PersistenceResult<T>,
    {
        let client = self.bound_client(ctx).await?;

        let data_sql = query.windowed_data_sql(params.len());
        let mut window_params = params.clone();
        window_params.push(limit);
        window_params.push(offset);

        let rows = client.query(&data_sql, &window_params.as_sql()).await?;
        let items = rows.iter().map(&mapper).collect::<PersistenceResult<Vec<T>>>()?;

        let count_row = client
            .query_one(query.count_sql(), &params.as_sql())
            .await?;
        let total_count: i64 = count_row.try_get(0)?;

        Ok(PagedResult::new(
            items,
            Paging {
                total_count: u64::try_from(total_count).unwrap_or(0),
                limit,
                offset,
            },
        ))
    }

    /// Runs a unit of work inside one transaction on one bound connection.
    ///
    /// Commits on normal return. On failure, rolls back, then re-signals the
    /// failure as [`PersistenceError::TransactionRolledBack`] carrying the
    /// cause; the connection is released exactly once in either case.
    pub async fn on_transaction_context<F>(
        &self,
        ctx: &TenantContext,
        work: F,
    ) -> PersistenceResult<()>
    where
        F: for<'t> FnOnce(&'t Transaction) -> BoxFuture<'t, PersistenceResult<()>>,
    {
        let client = self.bound_client(ctx).await?;
        let txn = Transaction::begin(client).await?;

        match work(&txn).await {
            Ok(()) => txn.commit().await,
            Err(cause) => {
                if let Err(rollback_err) = txn.rollback().await {
                    tracing::warn!(error = %rollback_err, "rollback failed");
                }
                Err(PersistenceError::TransactionRolledBack {
                    reason: cause.to_string(),
                    source: Some(Box::new(cause)),
                })
            }
        }
    }

    /// Returns whether `table` exists in the context's schema.
    ///
    /// A point query against the catalog; absence is an ordinary `false`,
    /// never an error. Used by migration logic to make schema changes
    /// idempotent.
    pub async fn check_table_existence(
        &self,
        ctx: &TenantContext,
        table: &str,
    ) -> PersistenceResult<bool> {
        let params = Params::new().bind(ctx.schema()).bind(table);
        let found = self
            .fetch_one(
                ctx,
                |row| Ok(row.try_get::<_, i64>("count")? == 1),
                CHECK_TABLE_EXISTENCE_SQL,
                &params,
            )
            .await?;
        Ok(found.unwrap_or(false))
    }

    /// Returns whether `table.column` exists in the context's schema.
    pub async fn check_column_existence(
        &self,
        ctx: &TenantContext,
        table: &str,
        column: &str,
    ) -> PersistenceResult<bool> {
        let params = Params::new().bind(ctx.schema()).bind(table).bind(column);
        let found = self
            .fetch_one(
                ctx,
                |row| Ok(row.try_get::<_, i64>("count")? == 1),
                CHECK_COLUMN_EXISTENCE_SQL,
                &params,
            )
            .await?;
        Ok(found.unwrap_or(false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::PoolConfig;

    #[test]
    fn test_unreachable_server_reports_connection_unavailable() {
        // Port 1 refuses immediately; nothing is listening there.
        let config = PoolConfig {
            host: "127.0.0.1".to_string(),
            port: 1,
            ..Default::default()
        };
        let provider = ConnectionProvider::new(&config).unwrap();
        let executor = QueryExecutor::new(provider);
        let ctx = TenantContext::new("lib_a").unwrap();

        let result = tokio_test::block_on(executor.execute(&ctx, "SELECT 1", &Params::new()));
        assert!(matches!(
            result,
            Err(PersistenceError::ConnectionUnavailable { .. })
        ));
    }
}
