//! Typed bind parameters for prepared statements.
//!
//! The supported parameter kinds form a deliberate closed set: text, 64-bit
//! integer, 32-bit integer, boolean and calendar date. Extending the set
//! means adding a variant, never runtime reflection. Dynamic values (from
//! the web layer) resolve through [`SqlValue::from_json`], which reports
//! anything outside the set as
//! [`PersistenceError::UnsupportedParameterType`].

use chrono::NaiveDate;
use postgres_types::ToSql;

use crate::error::{PersistenceError, PersistenceResult};

/// A single bind parameter of a supported kind.
///
/// Every variant wraps an `Option` so that a missing value still binds a
/// *typed* SQL NULL through the driver's typed path - never an untyped null
/// that would trip driver-level type inference.
///
/// ```
/// use alexandria_persistence::params::SqlValue;
///
/// let title: SqlValue = "Atlas".into();
/// let missing_title = SqlValue::Text(None);
/// assert_eq!(title.type_name(), missing_title.type_name());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    /// Text / varchar.
    Text(Option<String>),
    /// 64-bit integer (int8).
    BigInt(Option<i64>),
    /// 32-bit integer (int4).
    Int(Option<i32>),
    /// Boolean.
    Bool(Option<bool>),
    /// Calendar date (no time zone).
    Date(Option<NaiveDate>),
}

impl SqlValue {
    /// Returns the logical kind name, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            SqlValue::Text(_) => "text",
            SqlValue::BigInt(_) => "bigint",
            SqlValue::Int(_) => "int",
            SqlValue::Bool(_) => "bool",
            SqlValue::Date(_) => "date",
        }
    }

    /// Returns the driver-level bind value.
    pub(crate) fn as_sql(&self) -> &(dyn ToSql + Sync) {
        match self {
            SqlValue::Text(v) => v,
            SqlValue::BigInt(v) => v,
            SqlValue::Int(v) => v,
            SqlValue::Bool(v) => v,
            SqlValue::Date(v) => v,
        }
    }

    /// Resolves a dynamic JSON value to a bind parameter.
    ///
    /// Resolution is checked in fixed priority order - string, integer
    /// (32-bit when it fits, 64-bit otherwise), boolean - and the first
    /// match wins. Floats, arrays, objects and bare nulls have no binder:
    /// a bare JSON null carries no logical type, so a typed NULL must be
    /// expressed as e.g. `SqlValue::Text(None)` instead.
    pub fn from_json(value: &serde_json::Value) -> PersistenceResult<Self> {
        use serde_json::Value;

        match value {
            Value::String(s) => Ok(SqlValue::Text(Some(s.clone()))),
            Value::Number(n) => match n.as_i64() {
                Some(v) => match i32::try_from(v) {
                    Ok(i) => Ok(SqlValue::Int(Some(i))),
                    Err(_) => Ok(SqlValue::BigInt(Some(v))),
                },
                None => Err(PersistenceError::UnsupportedParameterType {
                    type_name: "non-integer number".to_string(),
                }),
            },
            Value::Bool(b) => Ok(SqlValue::Bool(Some(*b))),
            Value::Null => Err(PersistenceError::UnsupportedParameterType {
                type_name: "null".to_string(),
            }),
            Value::Array(_) => Err(PersistenceError::UnsupportedParameterType {
                type_name: "array".to_string(),
            }),
            Value::Object(_) => Err(PersistenceError::UnsupportedParameterType {
                type_name: "object".to_string(),
            }),
        }
    }
}

impl From<&str> for SqlValue {
    fn from(s: &str) -> Self {
        SqlValue::Text(Some(s.to_string()))
    }
}

impl From<String> for SqlValue {
    fn from(s: String) -> Self {
        SqlValue::Text(Some(s))
    }
}

impl From<i64> for SqlValue {
    fn from(n: i64) -> Self {
        SqlValue::BigInt(Some(n))
    }
}

impl From<i32> for SqlValue {
    fn from(n: i32) -> Self {
        SqlValue::Int(Some(n))
    }
}

impl From<bool> for SqlValue {
    fn from(b: bool) -> Self {
        SqlValue::Bool(Some(b))
    }
}

impl From<NaiveDate> for SqlValue {
    fn from(d: NaiveDate) -> Self {
        SqlValue::Date(Some(d))
    }
}

impl From<Option<String>> for SqlValue {
    fn from(v: Option<String>) -> Self {
        SqlValue::Text(v)
    }
}

impl From<Option<i64>> for SqlValue {
    fn from(v: Option<i64>) -> Self {
        SqlValue::BigInt(v)
    }
}

impl From<Option<i32>> for SqlValue {
    fn from(v: Option<i32>) -> Self {
        SqlValue::Int(v)
    }
}

impl From<Option<bool>> for SqlValue {
    fn from(v: Option<bool>) -> Self {
        SqlValue::Bool(v)
    }
}

impl From<Option<NaiveDate>> for SqlValue {
    fn from(v: Option<NaiveDate>) -> Self {
        SqlValue::Date(v)
    }
}

/// An ordered sequence of bind parameters.
///
/// Parameter count and order must match the `$n` placeholders in the SQL
/// text; the core does not verify this statically - mismatches surface as a
/// runtime failure at execute time.
///
/// ```
/// use alexandria_persistence::params::Params;
///
/// let params = Params::new().bind("Atlas").bind(2i32);
/// assert_eq!(params.len(), 2);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Params(Vec<SqlValue>);

impl Params {
    /// Creates an empty parameter list.
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Appends a parameter, builder-style.
    pub fn bind(mut self, value: impl Into<SqlValue>) -> Self {
        self.0.push(value.into());
        self
    }

    /// Appends a parameter in place.
    pub fn push(&mut self, value: impl Into<SqlValue>) {
        self.0.push(value.into());
    }

    /// Returns the number of parameters.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if there are no parameters.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Resolves an ordered sequence of dynamic JSON values.
    ///
    /// Fails on the first value outside the supported set.
    pub fn from_json(values: &[serde_json::Value]) -> PersistenceResult<Self> {
        values.iter().map(SqlValue::from_json).collect()
    }

    /// Returns the driver-level bind slice.
    pub(crate) fn as_sql(&self) -> Vec<&(dyn ToSql + Sync)> {
        self.0.iter().map(|v| v.as_sql()).collect()
    }
}

impl FromIterator<SqlValue> for Params {
    fn from_iter<I: IntoIterator<Item = SqlValue>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl From<Vec<SqlValue>> for Params {
    fn from(values: Vec<SqlValue>) -> Self {
        Self(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_impls() {
        assert_eq!(
            SqlValue::from("x"),
            SqlValue::Text(Some("x".to_string()))
        );
        assert_eq!(SqlValue::from(7i64), SqlValue::BigInt(Some(7)));
        assert_eq!(SqlValue::from(7i32), SqlValue::Int(Some(7)));
        assert_eq!(SqlValue::from(true), SqlValue::Bool(Some(true)));
        let d = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        assert_eq!(SqlValue::from(d), SqlValue::Date(Some(d)));
    }

    #[test]
    fn test_typed_nulls() {
        assert_eq!(SqlValue::from(None::<String>), SqlValue::Text(None));
        assert_eq!(SqlValue::from(None::<i32>), SqlValue::Int(None));
        assert_eq!(SqlValue::from(None::<NaiveDate>), SqlValue::Date(None));
        // A typed null still reports its logical kind.
        assert_eq!(SqlValue::Text(None).type_name(), "text");
    }

    #[test]
    fn test_from_json_string() {
        let v = SqlValue::from_json(&json!("Atlas")).unwrap();
        assert_eq!(v, SqlValue::Text(Some("Atlas".to_string())));
    }

    #[test]
    fn test_from_json_int_fits_i32() {
        let v = SqlValue::from_json(&json!(42)).unwrap();
        assert_eq!(v, SqlValue::Int(Some(42)));
    }

    #[test]
    fn test_from_json_int_needs_i64() {
        let v = SqlValue::from_json(&json!(9_000_000_000i64)).unwrap();
        assert_eq!(v, SqlValue::BigInt(Some(9_000_000_000)));
    }

    #[test]
    fn test_from_json_bool() {
        let v = SqlValue::from_json(&json!(false)).unwrap();
        assert_eq!(v, SqlValue::Bool(Some(false)));
    }

    #[test]
    fn test_from_json_unsupported_kinds() {
        for (value, kind) in [
            (json!(1.5), "non-integer number"),
            (json!(null), "null"),
            (json!([1, 2]), "array"),
            (json!({"a": 1}), "object"),
        ] {
            match SqlValue::from_json(&value) {
                Err(PersistenceError::UnsupportedParameterType { type_name }) => {
                    assert_eq!(type_name, kind);
                }
                other => panic!("expected UnsupportedParameterType, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_params_builder() {
        let params = Params::new().bind("x").bind(1i32).bind(true);
        assert_eq!(params.len(), 3);
        assert!(!params.is_empty());
        assert_eq!(params.as_sql().len(), 3);
    }

    #[test]
    fn test_params_from_json_ordered() {
        let params = Params::from_json(&[json!("a"), json!(1), json!(true)]).unwrap();
        assert_eq!(params.len(), 3);
    }

    #[test]
    fn test_params_from_json_fails_on_unsupported() {
        let result = Params::from_json(&[json!("a"), json!(1.25)]);
        assert!(matches!(
            result,
            Err(PersistenceError::UnsupportedParameterType { .. })
        ));
    }
}
