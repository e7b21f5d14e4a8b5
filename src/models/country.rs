use super::check_length;
use crate::query::RecordError;
use crate::schema::column::{self, ColumnDef, ColumnKind};
use crate::schema::{Entity, EntitySchema, FromRow, RecordInput, RelationDef};
use chrono::NaiveDateTime;
use may_postgres::Row;
use sea_query::Value;
use serde::{Deserialize, Serialize};

static COLUMNS: [ColumnDef; 6] = [
    column::ID,
    column::NAME,
    ColumnDef::new("code", ColumnKind::Varchar(10)).unique(),
    column::CREATED_AT,
    column::UPDATED_AT,
    column::IS_DELETED,
];

static RELATIONS: [RelationDef; 1] = [RelationDef::has_many("states", "country_id", state_schema)];

fn state_schema() -> &'static EntitySchema {
    super::StateModel::schema()
}

static SCHEMA: EntitySchema = EntitySchema {
    name: "CountryModel",
    table: "countries",
    primary_key: "id",
    columns: &COLUMNS,
    relations: &RELATIONS,
};

/// Row of `countries`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountryModel {
    pub id: String,
    pub name: String,
    pub code: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub is_deleted: bool,
}

impl FromRow for CountryModel {
    fn from_row(row: &Row) -> Result<Self, may_postgres::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            code: row.try_get("code")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
            is_deleted: row.try_get("is_deleted")?,
        })
    }
}

impl Entity for CountryModel {
    fn schema() -> &'static EntitySchema {
        &SCHEMA
    }

    fn id(&self) -> &str {
        &self.id
    }
}

/// Create/update payload for a country.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountryInput {
    pub name: String,
    pub code: String,
}

impl CountryInput {
    /// # Errors
    ///
    /// `Validation` unless `name` is 1..=100 and `code` 1..=10 characters.
    pub fn validate(&self) -> Result<(), RecordError> {
        check_length("name", &self.name, 1, 100)?;
        check_length("code", &self.code, 1, 10)
    }
}

impl RecordInput for CountryInput {
    fn column_values(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("name", self.name.clone().into()),
            ("code", self.code.clone().into()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema() {
        let schema = CountryModel::schema();
        assert_eq!(schema.display_name(), "Country");
        assert!(schema.column("code").is_some_and(|c| c.unique));
        assert_eq!(schema.relation("states").map(|r| r.target().table), Some("states"));
    }

    #[test]
    fn test_validate() {
        let mut input = CountryInput {
            name: "India".into(),
            code: "IN".into(),
        };
        assert!(input.validate().is_ok());
        input.code = String::new();
        assert!(matches!(input.validate(), Err(RecordError::Validation(_))));
    }
}
