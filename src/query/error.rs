//! Errors raised by the record engine and its callers.

use crate::executor::DbError;
use std::fmt;

/// Record engine error type
#[derive(Debug)]
pub enum RecordError {
    /// A non-terminal path segment does not name a declared relationship
    InvalidRelationship { segment: String, path: String },
    /// The terminal path segment does not name a declared column
    InvalidField { path: String },
    /// A single-record lookup key is not a direct column of the entity
    InvalidFilterKey { key: String, entity: &'static str },
    /// Pagination window rejected (zero limit)
    InvalidPage(String),
    /// Sort key not in the caller's allowed list
    InvalidSortField(String),
    /// No live record matched
    NotFound { entity: String },
    /// Caller-level uniqueness violation
    Conflict(String),
    /// Input object failed validation
    Validation(String),
    /// Credentials, one-time code or reset token rejected
    Unauthorized(String),
    /// Too many attempts or issued codes
    RateLimited(String),
    /// Error from the executor
    Database(DbError),
}

impl RecordError {
    pub fn not_found(entity: impl Into<String>) -> Self {
        RecordError::NotFound {
            entity: entity.into(),
        }
    }

    /// Whether the database rejected a write on a unique constraint.
    pub fn is_unique_violation(&self) -> bool {
        match self {
            RecordError::Database(DbError::PostgresError(e)) => {
                e.code() == Some(&may_postgres::error::SqlState::UNIQUE_VIOLATION)
            }
            _ => false,
        }
    }

    /// Map a unique-constraint failure to `Conflict(message)`.
    pub fn or_conflict(self, message: &str) -> Self {
        if self.is_unique_violation() {
            RecordError::Conflict(message.to_string())
        } else {
            self
        }
    }

    /// True for both kinds of rejected field path.
    pub fn is_invalid_path(&self) -> bool {
        matches!(
            self,
            RecordError::InvalidRelationship { .. } | RecordError::InvalidField { .. }
        )
    }

    /// HTTP status a calling layer should answer with.
    pub fn status_code(&self) -> u16 {
        match self {
            RecordError::InvalidRelationship { .. }
            | RecordError::InvalidField { .. }
            | RecordError::InvalidFilterKey { .. }
            | RecordError::InvalidPage(_)
            | RecordError::InvalidSortField(_)
            | RecordError::Conflict(_) => 400,
            RecordError::Unauthorized(_) => 401,
            RecordError::NotFound { .. } => 404,
            RecordError::Validation(_) => 422,
            RecordError::RateLimited(_) => 429,
            RecordError::Database(_) => 500,
        }
    }
}

impl fmt::Display for RecordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordError::InvalidRelationship { segment, path } => {
                write!(f, "Invalid relationship: {segment} (in '{path}')")
            }
            RecordError::InvalidField { path } => write!(f, "Invalid field: {path}"),
            RecordError::InvalidFilterKey { key, entity } => {
                write!(f, "Invalid column '{key}' for model '{entity}'")
            }
            RecordError::InvalidPage(s) => write!(f, "Invalid page window: {s}"),
            RecordError::InvalidSortField(s) => write!(f, "Invalid sort field: {s}"),
            RecordError::NotFound { entity } => write!(f, "{entity} not found"),
            RecordError::Conflict(s) => write!(f, "{s}"),
            RecordError::Validation(s) => write!(f, "Validation error: {s}"),
            RecordError::Unauthorized(s) | RecordError::RateLimited(s) => write!(f, "{s}"),
            RecordError::Database(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for RecordError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RecordError::Database(e) => Some(e),
            _ => None,
        }
    }
}

impl From<DbError> for RecordError {
    fn from(err: DbError) -> Self {
        RecordError::Database(err)
    }
}

impl From<may_postgres::Error> for RecordError {
    fn from(err: may_postgres::Error) -> Self {
        RecordError::Database(DbError::PostgresError(err))
    }
}
