//! Conversion of `sea-query` values into `may_postgres` parameters.
//!
//! Values are first copied into owned [`Param`]s, then borrowed as
//! `&dyn ToSql` for the duration of the closure, so the references stay
//! valid for exactly one executor call.
//!
//! NULLs keep their Rust type: PostgreSQL checks the parameter type even
//! when the value is absent, so a `NULL` bound for a `timestamp` column must
//! be an `Option<NaiveDateTime>`, not an `Option<String>`.

use crate::executor::DbError;
use chrono::NaiveDateTime;
use may_postgres::types::ToSql;
use sea_query::{Value, Values};

#[derive(Debug, Clone, PartialEq)]
enum Param {
    Bool(bool),
    Int(i32),
    BigInt(i64),
    Float(f32),
    Double(f64),
    Text(String),
    Bytes(Vec<u8>),
    Timestamp(NaiveDateTime),
    NullBool(Option<bool>),
    NullInt(Option<i32>),
    NullBigInt(Option<i64>),
    NullFloat(Option<f32>),
    NullDouble(Option<f64>),
    NullText(Option<String>),
    NullBytes(Option<Vec<u8>>),
    NullTimestamp(Option<NaiveDateTime>),
}

impl Param {
    fn from_value(value: &Value) -> Result<Self, DbError> {
        let param = match value {
            Value::Bool(Some(b)) => Param::Bool(*b),
            Value::TinyInt(Some(i)) => Param::Int(i32::from(*i)),
            Value::SmallInt(Some(i)) => Param::Int(i32::from(*i)),
            Value::Int(Some(i)) => Param::Int(*i),
            Value::BigInt(Some(i)) => Param::BigInt(*i),
            Value::TinyUnsigned(Some(u)) => Param::Int(i32::from(*u)),
            Value::SmallUnsigned(Some(u)) => Param::Int(i32::from(*u)),
            Value::Unsigned(Some(u)) => Param::BigInt(i64::from(*u)),
            Value::BigUnsigned(Some(u)) => Param::BigInt(i64::try_from(*u).map_err(|_| {
                DbError::QueryError(format!(
                    "BigUnsigned value {u} exceeds i64::MAX, cannot be bound"
                ))
            })?),
            Value::Float(Some(f)) => Param::Float(*f),
            Value::Double(Some(d)) => Param::Double(*d),
            Value::String(Some(s)) => Param::Text(s.to_string()),
            Value::Bytes(Some(b)) => Param::Bytes(b.to_vec()),
            Value::ChronoDateTime(Some(dt)) => {
                let dt: &NaiveDateTime = dt;
                Param::Timestamp(*dt)
            }
            Value::Json(Some(j)) => Param::Text(
                serde_json::to_string(&**j)
                    .map_err(|e| DbError::QueryError(format!("Failed to serialize JSON: {e}")))?,
            ),
            Value::Bool(None) => Param::NullBool(None),
            Value::TinyInt(None)
            | Value::SmallInt(None)
            | Value::Int(None)
            | Value::TinyUnsigned(None)
            | Value::SmallUnsigned(None) => Param::NullInt(None),
            Value::BigInt(None) | Value::Unsigned(None) | Value::BigUnsigned(None) => {
                Param::NullBigInt(None)
            }
            Value::Float(None) => Param::NullFloat(None),
            Value::Double(None) => Param::NullDouble(None),
            Value::String(None) | Value::Json(None) => Param::NullText(None),
            Value::Bytes(None) => Param::NullBytes(None),
            Value::ChronoDateTime(None) => Param::NullTimestamp(None),
            _ => {
                return Err(DbError::QueryError(format!(
                    "Unsupported value type in query: {value:?}"
                )))
            }
        };
        Ok(param)
    }

    fn as_sql(&self) -> &dyn ToSql {
        match self {
            Param::Bool(v) => v,
            Param::Int(v) => v,
            Param::BigInt(v) => v,
            Param::Float(v) => v,
            Param::Double(v) => v,
            Param::Text(v) => v,
            Param::Bytes(v) => v,
            Param::Timestamp(v) => v,
            Param::NullBool(v) => v,
            Param::NullInt(v) => v,
            Param::NullBigInt(v) => v,
            Param::NullFloat(v) => v,
            Param::NullDouble(v) => v,
            Param::NullText(v) => v,
            Param::NullBytes(v) => v,
            Param::NullTimestamp(v) => v,
        }
    }
}

/// Convert `sea-query` values to `may_postgres` parameters and run `f` with them.
///
/// # Errors
///
/// Returns `DbError::QueryError` for value types that cannot be bound, or
/// whatever `f` returns.
pub fn with_converted_params<F, R, E>(values: &Values, f: F) -> Result<R, E>
where
    F: FnOnce(&[&dyn ToSql]) -> Result<R, E>,
    E: From<DbError>,
{
    let owned = values
        .iter()
        .map(Param::from_value)
        .collect::<Result<Vec<_>, _>>()?;
    let params: Vec<&dyn ToSql> = owned.iter().map(Param::as_sql).collect();
    f(&params)
}
