//! Column metadata.

/// Storage type of a column, as far as the engine needs to know it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    /// `VARCHAR(n)`
    Varchar(u32),
    /// Unbounded `TEXT`
    Text,
    /// `INTEGER`
    Integer,
    /// `BOOLEAN`
    Boolean,
    /// `TIMESTAMP` without time zone
    Timestamp,
}

impl ColumnKind {
    /// Whether values of this kind can be compared with `LIKE` without a cast.
    pub const fn is_textual(self) -> bool {
        matches!(self, ColumnKind::Varchar(_) | ColumnKind::Text)
    }
}

/// Server-side default applied when an insert omits the column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnDefault {
    CurrentTimestamp,
    Bool(bool),
    Integer(i32),
}

/// A declared scalar column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: &'static str,
    pub kind: ColumnKind,
    pub nullable: bool,
    pub unique: bool,
    pub default: Option<ColumnDefault>,
}

impl ColumnDef {
    pub const fn new(name: &'static str, kind: ColumnKind) -> Self {
        Self {
            name,
            kind,
            nullable: false,
            unique: false,
            default: None,
        }
    }

    pub const fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub const fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub const fn default_to(mut self, default: ColumnDefault) -> Self {
        self.default = Some(default);
        self
    }
}

/// `id VARCHAR(36)` primary key holding a UUID string.
pub const ID: ColumnDef = ColumnDef::new("id", ColumnKind::Varchar(36));
/// `name VARCHAR(100)`
pub const NAME: ColumnDef = ColumnDef::new("name", ColumnKind::Varchar(100));
pub const CREATED_AT: ColumnDef =
    ColumnDef::new(super::CREATED_AT_COLUMN, ColumnKind::Timestamp).default_to(ColumnDefault::CurrentTimestamp);
pub const UPDATED_AT: ColumnDef =
    ColumnDef::new(super::UPDATED_AT_COLUMN, ColumnKind::Timestamp).default_to(ColumnDefault::CurrentTimestamp);
pub const IS_DELETED: ColumnDef =
    ColumnDef::new(super::SOFT_DELETE_COLUMN, ColumnKind::Boolean).default_to(ColumnDefault::Bool(false));

/// Foreign key column holding another entity's `id`.
pub const fn foreign_key(name: &'static str) -> ColumnDef {
    ColumnDef::new(name, ColumnKind::Varchar(36))
}
