//! Transaction support.
//!
//! A [`Transaction`] holds one schema-bound connection across a unit of work
//! in manual-commit mode. Exactly one of [`commit`](Transaction::commit) or
//! [`rollback`](Transaction::rollback) resolves it; both consume the
//! transaction, so nothing can issue statements past a terminal state. The
//! connection returns to the pool when the transaction is dropped, on every
//! exit path.

use deadpool_postgres::Client;
use tokio_postgres::{Row, Statement};

use crate::error::{PersistenceError, PersistenceResult};
use crate::params::Params;
use crate::tenant::SchemaBinder;

const NEXT_SERIAL_SQL_TPL: &str = "SELECT nextval('{seq}')";

const FIX_SEQUENCE_SQL_TPL: &str =
    "SELECT setval('{seq}', coalesce((SELECT max({col}) + 1 FROM {tbl}), 1), false)";

/// A unit of work on one tenant-bound connection in manual-commit mode.
///
/// Statements issued through the transaction execute in issuance order and
/// are atomic as a group: all become visible at commit, or none do. Sequence
/// names, like table names, resolve through the bound search path, so the
/// utilities below operate on the owning tenant's objects.
pub struct Transaction {
    client: Client,
    active: bool,
}

impl std::fmt::Debug for Transaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transaction")
            .field("active", &self.active)
            .finish()
    }
}

impl Transaction {
    /// Begins a transaction on an already schema-bound connection.
    pub(crate) async fn begin(client: Client) -> PersistenceResult<Self> {
        client.batch_execute("BEGIN").await.map_err(|e| {
            PersistenceError::TransactionRolledBack {
                reason: format!("failed to begin transaction: {}", e),
                source: Some(Box::new(e)),
            }
        })?;

        Ok(Self {
            client,
            active: true,
        })
    }

    /// Executes a query and returns all rows in result order.
    pub async fn query(&self, sql: &str, params: &Params) -> PersistenceResult<Vec<Row>> {
        Ok(self.client.query(sql, &params.as_sql()).await?)
    }

    /// Executes a query expecting at most one row.
    pub async fn query_opt(&self, sql: &str, params: &Params) -> PersistenceResult<Option<Row>> {
        Ok(self.client.query(sql, &params.as_sql()).await?.into_iter().next())
    }

    /// Executes a statement and returns the number of rows affected.
    pub async fn execute(&self, sql: &str, params: &Params) -> PersistenceResult<u64> {
        Ok(self.client.execute(sql, &params.as_sql()).await?)
    }

    /// Executes raw statements (DDL, multi-statement scripts).
    pub async fn batch_execute(&self, sql: &str) -> PersistenceResult<()> {
        Ok(self.client.batch_execute(sql).await?)
    }

    /// Prepares a statement for repeated execution within this transaction.
    pub async fn prepare(&self, sql: &str) -> PersistenceResult<Statement> {
        Ok(self.client.prepare(sql).await?)
    }

    /// Executes a previously prepared statement.
    pub async fn execute_prepared(
        &self,
        statement: &Statement,
        params: &Params,
    ) -> PersistenceResult<u64> {
        Ok(self.client.execute(statement, &params.as_sql()).await?)
    }

    /// Pre-allocates the next value of a tenant sequence.
    ///
    /// Used when a new row's identifier must be known before insert, e.g. to
    /// embed it in a composite payload.
    pub async fn next_serial(&self, sequence: &str) -> PersistenceResult<i64> {
        let sql = NEXT_SERIAL_SQL_TPL.replace("{seq}", &SchemaBinder::escape_literal(sequence));
        let row = self.client.query_one(&sql, &[]).await?;
        Ok(row.try_get(0)?)
    }

    /// Resynchronizes a drifted sequence to `max(id) + 1`.
    ///
    /// The next `nextval` call returns exactly `max(id) + 1` (or 1 for an
    /// empty table).
    pub async fn fix_sequence(
        &self,
        sequence: &str,
        table: &str,
        id_column: &str,
    ) -> PersistenceResult<()> {
        let sql = FIX_SEQUENCE_SQL_TPL
            .replace("{seq}", &SchemaBinder::escape_literal(sequence))
            .replace("{col}", &SchemaBinder::escape_identifier(id_column))
            .replace("{tbl}", &SchemaBinder::escape_identifier(table));
        self.client.query(&sql, &[]).await?;
        Ok(())
    }

    /// Commits the unit of work, making all of its writes durable.
    pub async fn commit(mut self) -> PersistenceResult<()> {
        self.client.batch_execute("COMMIT").await.map_err(|e| {
            PersistenceError::TransactionRolledBack {
                reason: format!("commit failed: {}", e),
                source: Some(Box::new(e)),
            }
        })?;
        self.active = false;
        Ok(())
    }

    /// Rolls the unit of work back, discarding all of its writes.
    pub async fn rollback(mut self) -> PersistenceResult<()> {
        self.client.batch_execute("ROLLBACK").await.map_err(|e| {
            PersistenceError::TransactionRolledBack {
                reason: format!("rollback failed: {}", e),
                source: Some(Box::new(e)),
            }
        })?;
        self.active = false;
        Ok(())
    }

    /// Returns `true` while the transaction has not been resolved.
    pub fn is_active(&self) -> bool {
        self.active
    }
}

impl Drop for Transaction {
    fn drop(&mut self) {
        // No async in Drop; the pool recycles the connection and the server
        // rolls back the open transaction when it does.
        if self.active {
            tracing::warn!("transaction dropped without explicit commit or rollback");
        }
    }
}
