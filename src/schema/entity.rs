//! Entity descriptors and the traits concrete record types implement.

use super::column::ColumnDef;
use super::relation::RelationDef;
use super::SOFT_DELETE_COLUMN;
use may_postgres::Row;
use sea_query::Value;

/// Static description of a table the record engine can query.
#[derive(Debug)]
pub struct EntitySchema {
    /// Type name, e.g. `"CountryModel"`. Used for not-found messages.
    pub name: &'static str,
    pub table: &'static str,
    pub primary_key: &'static str,
    pub columns: &'static [ColumnDef],
    pub relations: &'static [RelationDef],
}

impl EntitySchema {
    pub fn column(&self, name: &str) -> Option<&'static ColumnDef> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn relation(&self, name: &str) -> Option<&'static RelationDef> {
        self.relations.iter().find(|r| r.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    pub fn has_soft_delete(&self) -> bool {
        self.has_column(SOFT_DELETE_COLUMN)
    }

    /// Human-readable name: the type name with a trailing `Model` removed.
    ///
    /// `"CountryModel"` becomes `"Country"`; names without the suffix are
    /// returned unchanged.
    pub fn display_name(&self) -> &'static str {
        match self.name.strip_suffix("Model") {
            Some(stripped) if !stripped.is_empty() => stripped,
            _ => self.name,
        }
    }
}

/// Trait for types that can be built from a database row
pub trait FromRow: Sized {
    /// Convert a database row into this type
    ///
    /// # Errors
    ///
    /// Returns `may_postgres::Error` if a column is missing or has the wrong type.
    fn from_row(row: &Row) -> Result<Self, may_postgres::Error>;
}

/// A record type backed by an [`EntitySchema`].
pub trait Entity: FromRow {
    fn schema() -> &'static EntitySchema;

    /// Primary key value of this record.
    fn id(&self) -> &str;
}

/// A validated input object whose fields map onto entity columns.
///
/// Create writes every returned column; update overwrites every returned
/// column on the live record.
pub trait RecordInput {
    fn column_values(&self) -> Vec<(&'static str, Value)>;
}
