//! Named relationships between entities.

use super::entity::EntitySchema;

/// Type of relationship between entities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelationType {
    /// Many-to-one: this entity holds the foreign key (`city.state`)
    BelongsTo,
    /// One-to-many: the target holds the foreign key (`state.cities`)
    HasMany,
}

/// A relationship declared on an entity.
///
/// The join it produces is always `<this>.from_col = <target>.to_col`:
/// for `BelongsTo` that is `fk = target.id`, for `HasMany` it is
/// `id = target.fk`.
#[derive(Debug, Clone, Copy)]
pub struct RelationDef {
    pub name: &'static str,
    pub rel_type: RelationType,
    pub from_col: &'static str,
    pub to_col: &'static str,
    // Function pointer so schemas can reference each other cyclically.
    pub target: fn() -> &'static EntitySchema,
}

impl RelationDef {
    pub const fn belongs_to(
        name: &'static str,
        foreign_key: &'static str,
        target: fn() -> &'static EntitySchema,
    ) -> Self {
        Self {
            name,
            rel_type: RelationType::BelongsTo,
            from_col: foreign_key,
            to_col: "id",
            target,
        }
    }

    pub const fn has_many(
        name: &'static str,
        foreign_key: &'static str,
        target: fn() -> &'static EntitySchema,
    ) -> Self {
        Self {
            name,
            rel_type: RelationType::HasMany,
            from_col: "id",
            to_col: foreign_key,
            target,
        }
    }

    /// Schema of the entity on the other side.
    pub fn target(&self) -> &'static EntitySchema {
        (self.target)()
    }
}
