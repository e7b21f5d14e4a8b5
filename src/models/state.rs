use super::{check_length, CountryModel};
use crate::query::RecordError;
use crate::schema::column::{self, ColumnDef, ColumnKind};
use crate::schema::{Entity, EntitySchema, FromRow, RecordInput, RelationDef};
use chrono::NaiveDateTime;
use may_postgres::Row;
use sea_query::Value;
use serde::{Deserialize, Serialize};

static COLUMNS: [ColumnDef; 7] = [
    column::ID,
    column::NAME,
    ColumnDef::new("code", ColumnKind::Varchar(10)),
    column::foreign_key("country_id"),
    column::CREATED_AT,
    column::UPDATED_AT,
    column::IS_DELETED,
];

static RELATIONS: [RelationDef; 2] = [
    RelationDef::belongs_to("country", "country_id", country_schema),
    RelationDef::has_many("cities", "state_id", city_schema),
];

fn country_schema() -> &'static EntitySchema {
    CountryModel::schema()
}

fn city_schema() -> &'static EntitySchema {
    super::CityModel::schema()
}

static SCHEMA: EntitySchema = EntitySchema {
    name: "StateModel",
    table: "states",
    primary_key: "id",
    columns: &COLUMNS,
    relations: &RELATIONS,
};

/// Row of `states`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateModel {
    pub id: String,
    pub name: String,
    pub code: String,
    pub country_id: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub is_deleted: bool,
}

impl FromRow for StateModel {
    fn from_row(row: &Row) -> Result<Self, may_postgres::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            code: row.try_get("code")?,
            country_id: row.try_get("country_id")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
            is_deleted: row.try_get("is_deleted")?,
        })
    }
}

impl Entity for StateModel {
    fn schema() -> &'static EntitySchema {
        &SCHEMA
    }

    fn id(&self) -> &str {
        &self.id
    }
}

/// A state with its country embedded, as list and detail responses show it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StateWithCountry {
    #[serde(flatten)]
    pub state: StateModel,
    pub country: Option<CountryModel>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateInput {
    pub name: String,
    pub code: String,
    pub country_id: String,
}

impl StateInput {
    /// # Errors
    ///
    /// `Validation` on out-of-range lengths; `country_id` must be a
    /// 36-character id.
    pub fn validate(&self) -> Result<(), RecordError> {
        check_length("name", &self.name, 1, 100)?;
        check_length("code", &self.code, 1, 10)?;
        check_length("country_id", &self.country_id, 36, 36)
    }
}

impl RecordInput for StateInput {
    fn column_values(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("name", self.name.clone().into()),
            ("code", self.code.clone().into()),
            ("country_id", self.country_id.clone().into()),
        ]
    }
}
