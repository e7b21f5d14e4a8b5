use super::check_length;
use crate::query::RecordError;
use crate::schema::column::{self, ColumnDef, ColumnKind};
use crate::schema::{Entity, EntitySchema, FromRow, RecordInput, RelationDef};
use chrono::NaiveDateTime;
use may_postgres::Row;
use sea_query::Value;
use serde::{Deserialize, Serialize};

static COLUMNS: [ColumnDef; 9] = [
    column::ID,
    ColumnDef::new("url", ColumnKind::Text),
    ColumnDef::new("method", ColumnKind::Varchar(10)),
    ColumnDef::new("payload", ColumnKind::Text).nullable(),
    ColumnDef::new("status_code", ColumnKind::Integer),
    ColumnDef::new("error_message", ColumnKind::Text).nullable(),
    ColumnDef::new("user_id", ColumnKind::Varchar(36)).nullable(),
    ColumnDef::new("user_type", ColumnKind::Varchar(30)).nullable(),
    column::CREATED_AT,
];

static RELATIONS: [RelationDef; 0] = [];

static SCHEMA: EntitySchema = EntitySchema {
    name: "ApiLogModel",
    table: "api_logs",
    primary_key: "id",
    columns: &COLUMNS,
    relations: &RELATIONS,
};

/// Row of `api_logs`. Append-only: no update timestamp, no soft delete.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiLogModel {
    pub id: String,
    pub url: String,
    pub method: String,
    pub payload: Option<String>,
    pub status_code: i32,
    pub error_message: Option<String>,
    pub user_id: Option<String>,
    pub user_type: Option<String>,
    pub created_at: NaiveDateTime,
}

impl FromRow for ApiLogModel {
    fn from_row(row: &Row) -> Result<Self, may_postgres::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            url: row.try_get("url")?,
            method: row.try_get("method")?,
            payload: row.try_get("payload")?,
            status_code: row.try_get("status_code")?,
            error_message: row.try_get("error_message")?,
            user_id: row.try_get("user_id")?,
            user_type: row.try_get("user_type")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

impl Entity for ApiLogModel {
    fn schema() -> &'static EntitySchema {
        &SCHEMA
    }

    fn id(&self) -> &str {
        &self.id
    }
}

/// One handled request, as the calling layer reports it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiLogInput {
    pub url: String,
    pub method: String,
    #[serde(default)]
    pub payload: Option<String>,
    pub status_code: i32,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub user_type: Option<String>,
}

impl ApiLogInput {
    /// # Errors
    ///
    /// `Validation` for an empty url, a method over 10 characters, a status
    /// outside 100..=599, or over-long user fields.
    pub fn validate(&self) -> Result<(), RecordError> {
        if self.url.is_empty() {
            return Err(RecordError::Validation("url must not be empty".to_string()));
        }
        check_length("method", &self.method, 1, 10)?;
        if !(100..=599).contains(&self.status_code) {
            return Err(RecordError::Validation(format!(
                "status_code {} is not an HTTP status",
                self.status_code
            )));
        }
        if let Some(user_id) = &self.user_id {
            check_length("user_id", user_id, 1, 36)?;
        }
        if let Some(user_type) = &self.user_type {
            check_length("user_type", user_type, 1, 30)?;
        }
        Ok(())
    }
}

impl RecordInput for ApiLogInput {
    fn column_values(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("url", self.url.clone().into()),
            ("method", self.method.to_uppercase().into()),
            ("payload", self.payload.clone().into()),
            ("status_code", self.status_code.into()),
            ("error_message", self.error_message.clone().into()),
            ("user_id", self.user_id.clone().into()),
            ("user_type", self.user_type.clone().into()),
        ]
    }
}
