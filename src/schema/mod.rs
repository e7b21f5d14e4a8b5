//! Entity schema introspection.
//!
//! The record engine never reflects over Rust types. Every entity publishes a
//! static [`EntitySchema`] listing its columns and named relationships, and
//! field paths such as `"state.country_id"` are resolved against those
//! tables at query-build time.
//!
//! ```no_run
//! use meridian::models::CityModel;
//! use meridian::schema::Entity;
//!
//! let schema = CityModel::schema();
//! let state = schema.relation("state").unwrap().target();
//! assert!(state.column("country_id").is_some());
//! ```

pub mod column;
pub mod ddl;
pub mod entity;
pub mod relation;

#[doc(inline)]
pub use column::{ColumnDef, ColumnDefault, ColumnKind};
#[doc(inline)]
pub use ddl::{create_all, create_table_statement};
#[doc(inline)]
pub use entity::{Entity, EntitySchema, FromRow, RecordInput};
#[doc(inline)]
pub use relation::{RelationDef, RelationType};

/// Column every soft-deletable entity carries.
pub const SOFT_DELETE_COLUMN: &str = "is_deleted";
/// Creation timestamp used for the default sort order.
pub const CREATED_AT_COLUMN: &str = "created_at";
/// Timestamp refreshed by update and soft delete.
pub const UPDATED_AT_COLUMN: &str = "updated_at";
