use super::{check_length, StateModel};
use crate::query::RecordError;
use crate::schema::column::{self, ColumnDef};
use crate::schema::{Entity, EntitySchema, FromRow, RecordInput, RelationDef};
use chrono::NaiveDateTime;
use may_postgres::Row;
use sea_query::Value;
use serde::{Deserialize, Serialize};

static COLUMNS: [ColumnDef; 6] = [
    column::ID,
    column::NAME,
    column::foreign_key("state_id"),
    column::CREATED_AT,
    column::UPDATED_AT,
    column::IS_DELETED,
];

static RELATIONS: [RelationDef; 1] = [RelationDef::belongs_to("state", "state_id", state_schema)];

fn state_schema() -> &'static EntitySchema {
    StateModel::schema()
}

static SCHEMA: EntitySchema = EntitySchema {
    name: "CityModel",
    table: "cities",
    primary_key: "id",
    columns: &COLUMNS,
    relations: &RELATIONS,
};

/// Row of `cities`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CityModel {
    pub id: String,
    pub name: String,
    pub state_id: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub is_deleted: bool,
}

impl FromRow for CityModel {
    fn from_row(row: &Row) -> Result<Self, may_postgres::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            state_id: row.try_get("state_id")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
            is_deleted: row.try_get("is_deleted")?,
        })
    }
}

impl Entity for CityModel {
    fn schema() -> &'static EntitySchema {
        &SCHEMA
    }

    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CityWithState {
    #[serde(flatten)]
    pub city: CityModel,
    pub state: Option<StateModel>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CityInput {
    pub name: String,
    pub state_id: String,
}

impl CityInput {
    /// # Errors
    ///
    /// `Validation` on out-of-range lengths.
    pub fn validate(&self) -> Result<(), RecordError> {
        check_length("name", &self.name, 1, 100)?;
        check_length("state_id", &self.state_id, 36, 36)
    }
}

impl RecordInput for CityInput {
    fn column_values(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("name", self.name.clone().into()),
            ("state_id", self.state_id.clone().into()),
        ]
    }
}
