//! Tenant context for persistence operations.
//!
//! This module defines [`TenantContext`], which identifies the active tenant
//! for a single operation. The persistence core requires a `TenantContext`
//! for every tenant-scoped call - operations cannot be performed without one,
//! so tenant isolation is enforced at the type level.

use std::sync::OnceLock;

use regex::Regex;

use crate::error::{PersistenceError, PersistenceResult};

/// Name of the shared schema holding cross-library tables.
pub const GLOBAL_SCHEMA: &str = "global";

/// PostgreSQL identifier length limit.
const MAX_SCHEMA_LENGTH: usize = 63;

fn schema_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[a-z_][a-z0-9_]*$").expect("valid schema pattern"))
}

/// An immutable value identifying the active tenant by its schema name.
///
/// A `TenantContext` is constructed per inbound request or operation, never
/// persisted and never cached. It is cheap to clone and carries no mutable
/// state: every call into the persistence core re-derives its tenant scoping
/// from the context argument rather than from any session state, so tenant
/// isolation cannot leak across pooled-connection reuse.
///
/// # Creation
///
/// The constructor validates the schema name as a safe SQL identifier, so a
/// context can be built directly from request-layer input:
///
/// ```
/// use alexandria_persistence::tenant::TenantContext;
///
/// let ctx = TenantContext::new("lib_centro").unwrap();
/// assert_eq!(ctx.schema(), "lib_centro");
///
/// assert!(TenantContext::new("lib; DROP SCHEMA global").is_err());
/// ```
///
/// # Shared data
///
/// Cross-library tables (installed versions, backups, translations shared by
/// all tenants) live in the `global` schema:
///
/// ```
/// use alexandria_persistence::tenant::TenantContext;
///
/// let ctx = TenantContext::global();
/// assert!(ctx.is_global());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TenantContext {
    schema: String,
}

impl TenantContext {
    /// Creates a context for the given tenant schema.
    ///
    /// The schema name must be a lowercase PostgreSQL identifier
    /// (`[a-z_][a-z0-9_]*`, at most 63 characters); anything else is rejected
    /// with [`PersistenceError::InvalidTenant`] before it can reach a
    /// `SET search_path` statement.
    pub fn new(schema: impl Into<String>) -> PersistenceResult<Self> {
        let schema = schema.into();

        if schema.is_empty() {
            return Err(PersistenceError::InvalidTenant {
                schema,
                reason: "schema name is empty".to_string(),
            });
        }

        if schema.len() > MAX_SCHEMA_LENGTH {
            return Err(PersistenceError::InvalidTenant {
                schema,
                reason: format!(
                    "schema name exceeds maximum length of {} characters",
                    MAX_SCHEMA_LENGTH
                ),
            });
        }

        if !schema_pattern().is_match(&schema) {
            return Err(PersistenceError::InvalidTenant {
                schema,
                reason: "schema name must match [a-z_][a-z0-9_]*".to_string(),
            });
        }

        Ok(Self { schema })
    }

    /// Creates a context for the shared `global` schema.
    pub fn global() -> Self {
        Self {
            schema: GLOBAL_SCHEMA.to_string(),
        }
    }

    /// Returns the tenant's schema name.
    pub fn schema(&self) -> &str {
        &self.schema
    }

    /// Returns `true` if this context names the shared `global` schema.
    pub fn is_global(&self) -> bool {
        self.schema == GLOBAL_SCHEMA
    }
}

impl std::fmt::Display for TenantContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.schema)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_creation() {
        let ctx = TenantContext::new("lib_centro").unwrap();
        assert_eq!(ctx.schema(), "lib_centro");
        assert!(!ctx.is_global());
    }

    #[test]
    fn test_global_context() {
        let ctx = TenantContext::global();
        assert_eq!(ctx.schema(), "global");
        assert!(ctx.is_global());
    }

    #[test]
    fn test_underscore_prefix_allowed() {
        assert!(TenantContext::new("_staging").is_ok());
    }

    #[test]
    fn test_empty_schema_rejected() {
        let result = TenantContext::new("");
        assert!(matches!(
            result,
            Err(PersistenceError::InvalidTenant { .. })
        ));
    }

    #[test]
    fn test_uppercase_rejected() {
        assert!(TenantContext::new("LibCentro").is_err());
    }

    #[test]
    fn test_injection_rejected() {
        assert!(TenantContext::new("lib'; DROP SCHEMA global; --").is_err());
        assert!(TenantContext::new("lib\"centro").is_err());
        assert!(TenantContext::new("lib centro").is_err());
    }

    #[test]
    fn test_leading_digit_rejected() {
        assert!(TenantContext::new("1lib").is_err());
    }

    #[test]
    fn test_overlong_schema_rejected() {
        let long = "a".repeat(64);
        assert!(TenantContext::new(long).is_err());
        let ok = "a".repeat(63);
        assert!(TenantContext::new(ok).is_ok());
    }
}
