//! Helpers for tests, in this crate and downstream.
//!
//! [`RecordingExecutor`] captures statements without a database, which is
//! enough to check what the engine renders and in which order. [`TestDatabase`]
//! hands out a real connection when `TEST_DATABASE_URL` is set.

use crate::connection::{connect, ConnectionError};
use crate::executor::{DbError, MayPostgresExecutor, RecordExecutor};
use crate::schema::create_all;
use may_postgres::types::ToSql;
use may_postgres::Row;
use std::cell::RefCell;
use std::sync::{Mutex, MutexGuard};

/// Executor that records every statement and returns no rows.
///
/// `execute` reports zero affected rows, `query_all` an empty result and
/// `query_one` a "no rows" error.
#[derive(Debug, Default)]
pub struct RecordingExecutor {
    statements: RefCell<Vec<String>>,
    params: RefCell<Vec<Vec<String>>>,
}

impl RecordingExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// SQL of every statement seen so far, in order.
    pub fn statements(&self) -> Vec<String> {
        self.statements.borrow().clone()
    }

    /// Number of bound parameters for each recorded statement.
    pub fn param_counts(&self) -> Vec<usize> {
        self.params.borrow().iter().map(Vec::len).collect()
    }

    /// `Debug` rendering of every bound parameter, per statement.
    pub fn params(&self) -> Vec<Vec<String>> {
        self.params.borrow().clone()
    }

    pub fn clear(&self) {
        self.statements.borrow_mut().clear();
        self.params.borrow_mut().clear();
    }

    fn record(&self, query: &str, params: &[&dyn ToSql]) {
        log::debug!("recorded: {query}");
        self.statements.borrow_mut().push(query.to_string());
        self.params
            .borrow_mut()
            .push(params.iter().map(|p| format!("{p:?}")).collect());
    }
}

impl RecordExecutor for RecordingExecutor {
    fn execute(&self, query: &str, params: &[&dyn ToSql]) -> Result<u64, DbError> {
        self.record(query, params);
        Ok(0)
    }

    fn query_one(&self, query: &str, params: &[&dyn ToSql]) -> Result<Row, DbError> {
        self.record(query, params);
        Err(DbError::QueryError("no rows returned".to_string()))
    }

    fn query_all(&self, query: &str, params: &[&dyn ToSql]) -> Result<Vec<Row>, DbError> {
        self.record(query, params);
        Ok(Vec::new())
    }
}

static DATABASE_LOCK: Mutex<()> = Mutex::new(());

/// Exclusive handle on the database named by `TEST_DATABASE_URL`.
///
/// Tests sharing the database are serialized through a process-wide lock
/// held for the lifetime of the handle.
pub struct TestDatabase {
    url: String,
    _guard: MutexGuard<'static, ()>,
}

impl TestDatabase {
    pub const URL_VAR: &'static str = "TEST_DATABASE_URL";

    /// `None` when `TEST_DATABASE_URL` is unset, so callers can skip.
    pub fn from_env() -> Option<Self> {
        let url = match std::env::var(Self::URL_VAR) {
            Ok(url) if !url.trim().is_empty() => url,
            _ => {
                log::info!("{} not set, skipping database test", Self::URL_VAR);
                return None;
            }
        };
        let guard = DATABASE_LOCK
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Some(Self { url, _guard: guard })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// # Errors
    ///
    /// `ConnectionError` if the server cannot be reached.
    pub fn executor(&self) -> Result<MayPostgresExecutor, ConnectionError> {
        connect(&self.url).map(MayPostgresExecutor::new)
    }

    /// Drop and recreate every table the crate owns.
    ///
    /// # Errors
    ///
    /// `DbError` from the DDL.
    pub fn reset<X: RecordExecutor + ?Sized>(&self, executor: &X) -> Result<(), DbError> {
        let schemas = crate::models::all_schemas();
        let tables: Vec<&str> = schemas.iter().rev().map(|s| s.table).collect();
        executor.execute(&format!("DROP TABLE IF EXISTS {}", tables.join(", ")), &[])?;
        create_all(executor, &schemas)
    }
}
