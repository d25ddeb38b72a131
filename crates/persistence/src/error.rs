//! Error types for the persistence core.
//!
//! Every failure a caller can observe is a [`PersistenceError`]. The taxonomy
//! is deliberately small: callers decide recovery policy, the core only
//! guarantees that connections are cleaned up before an error propagates and
//! that transactional failures leave no partial writes behind.

use thiserror::Error;

/// The primary error type for all persistence operations.
#[derive(Error, Debug)]
pub enum PersistenceError {
    /// The pool or driver could not supply a connection. Fatal to the calling
    /// operation; the core never retries internally.
    #[error("connection unavailable: {message}")]
    ConnectionUnavailable { message: String },

    /// A bind parameter's runtime type has no registered binder. This is a
    /// programming error, not a transient condition.
    #[error("unsupported parameter type: {type_name}")]
    UnsupportedParameterType { type_name: String },

    /// A SQL-execution-time fault (constraint violation, syntax error,
    /// connectivity loss mid-operation), wrapping the driver cause.
    #[error("query execution failed: {message}")]
    QueryFailed {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A transactional unit of work failed and its writes were rolled back.
    /// The causal failure is carried as the source.
    #[error("transaction rolled back: {reason}")]
    TransactionRolledBack {
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A DAO type could not be constructed by the registry. The registry logs
    /// this and leaves the slot empty rather than raising; the error type
    /// exists for factories to return.
    #[error("could not construct DAO instance {type_name}: {message}")]
    InstanceCreation {
        type_name: &'static str,
        message: String,
    },

    /// A tenant schema name failed identifier validation.
    #[error("invalid tenant schema '{schema}': {reason}")]
    InvalidTenant { schema: String, reason: String },
}

impl PersistenceError {
    /// Creates a [`PersistenceError::QueryFailed`] without a driver cause.
    pub fn query(message: impl Into<String>) -> Self {
        PersistenceError::QueryFailed {
            message: message.into(),
            source: None,
        }
    }
}

/// Result type alias for persistence operations.
pub type PersistenceResult<T> = Result<T, PersistenceError>;

impl From<tokio_postgres::Error> for PersistenceError {
    fn from(err: tokio_postgres::Error) -> Self {
        PersistenceError::QueryFailed {
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }
}

impl From<deadpool_postgres::PoolError> for PersistenceError {
    fn from(err: deadpool_postgres::PoolError) -> Self {
        PersistenceError::ConnectionUnavailable {
            message: err.to_string(),
        }
    }
}

impl From<deadpool_postgres::CreatePoolError> for PersistenceError {
    fn from(err: deadpool_postgres::CreatePoolError) -> Self {
        PersistenceError::ConnectionUnavailable {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_unavailable_display() {
        let err = PersistenceError::ConnectionUnavailable {
            message: "pool exhausted".to_string(),
        };
        assert_eq!(err.to_string(), "connection unavailable: pool exhausted");
    }

    #[test]
    fn test_unsupported_parameter_type_display() {
        let err = PersistenceError::UnsupportedParameterType {
            type_name: "float".to_string(),
        };
        assert_eq!(err.to_string(), "unsupported parameter type: float");
    }

    #[test]
    fn test_invalid_tenant_display() {
        let err = PersistenceError::InvalidTenant {
            schema: "1bad".to_string(),
            reason: "must start with a lowercase letter or underscore".to_string(),
        };
        assert!(err.to_string().contains("invalid tenant schema '1bad'"));
    }

    #[test]
    fn test_rollback_carries_source() {
        let cause = PersistenceError::query("duplicate key");
        let err = PersistenceError::TransactionRolledBack {
            reason: cause.to_string(),
            source: Some(Box::new(cause)),
        };
        assert!(std::error::Error::source(&err).is_some());
    }
}
