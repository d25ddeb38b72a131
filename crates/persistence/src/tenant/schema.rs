//! Schema binding for pooled connections.
//!
//! Tenancy is schema-based, not connection-based: there is one physical
//! database and one pool, and a connection becomes tenant-scoped only after
//! its `search_path` has been set. Connections are *not* schema-clean when
//! returned to the pool, so every acquisition requires a fresh bind before
//! any domain statement executes.

use tokio_postgres::Client;

use super::TenantContext;
use crate::error::PersistenceResult;

/// Sets a connection's active-schema search path for a tenant.
///
/// The search path is `[tenant schema, public, pg_catalog]`, in that order:
/// unqualified names resolve to tenant-schema objects first, then shared
/// objects in `public`, then system catalog objects.
#[derive(Debug, Clone, Copy, Default)]
pub struct SchemaBinder;

impl SchemaBinder {
    /// Returns the `SET search_path` statement for a tenant.
    pub fn search_path_sql(ctx: &TenantContext) -> String {
        format!(
            "SET search_path TO {}, public, pg_catalog",
            Self::escape_identifier(ctx.schema())
        )
    }

    /// Scopes `client` to the tenant's schema.
    ///
    /// Called once per acquired connection, before any domain statement.
    pub async fn bind(client: &Client, ctx: &TenantContext) -> PersistenceResult<()> {
        client.batch_execute(&Self::search_path_sql(ctx)).await?;
        Ok(())
    }

    /// Escapes a SQL identifier (schema, table or column name).
    pub fn escape_identifier(id: &str) -> String {
        format!("\"{}\"", id.replace('"', "\"\""))
    }

    /// Escapes a string for safe inclusion in a SQL literal.
    pub fn escape_literal(s: &str) -> String {
        s.replace('\'', "''")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_path_sql() {
        let ctx = TenantContext::new("lib_centro").unwrap();
        assert_eq!(
            SchemaBinder::search_path_sql(&ctx),
            "SET search_path TO \"lib_centro\", public, pg_catalog"
        );
    }

    #[test]
    fn test_search_path_sql_global() {
        let ctx = TenantContext::global();
        assert_eq!(
            SchemaBinder::search_path_sql(&ctx),
            "SET search_path TO \"global\", public, pg_catalog"
        );
    }

    #[test]
    fn test_escape_identifier() {
        assert_eq!(SchemaBinder::escape_identifier("items"), "\"items\"");
        assert_eq!(
            SchemaBinder::escape_identifier("odd\"name"),
            "\"odd\"\"name\""
        );
    }

    #[test]
    fn test_escape_literal() {
        assert_eq!(SchemaBinder::escape_literal("it's"), "it''s");
    }
}
