//! # Meridian
//!
//! Relationship-aware record queries over coroutine-native PostgreSQL
//! (`may_postgres`), with `sea-query` rendering the SQL.
//!
//! Callers list, fetch, create, update and soft-delete records of any entity
//! that publishes an [`schema::EntitySchema`]. Filters, search fields and
//! sort keys may be dotted paths through declared relationships
//! (`"state.country_id"`); the engine joins what each path needs and
//! validates every path before a statement runs.
//!
//! The geographic reference entities ([`models`]) and their caller-level
//! operations ([`service`]) are built on the same engine, as are admin
//! accounts with one-time-code password reset and the API audit log.

pub mod config;
pub mod connection;
pub mod executor;
pub mod metrics;
pub mod models;
pub mod query;
pub mod schema;
pub mod security;
pub mod service;
#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;
pub mod transaction;

pub use config::{AppConfig, AuthConfig, DatabaseConfig, ListingConfig};
pub use connection::{connect, validate_connection_string, ConnectionError};
pub use executor::{DbError, MayPostgresExecutor, RecordExecutor};
pub use query::{
    create_record, delete_record, get_record, get_records, update_record, FilterSet, FilterValue,
    ListParams, LookupOptions, Page, PageWindow, RecordError, SortOrder,
};
pub use schema::{Entity, EntitySchema, FromRow, RecordInput};
pub use transaction::{IsolationLevel, Transaction, TransactionError};
