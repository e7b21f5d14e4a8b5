use super::check_length;
use crate::query::RecordError;
use crate::schema::column::{self, ColumnDef, ColumnDefault, ColumnKind};
use crate::schema::{Entity, EntitySchema, FromRow, RecordInput, RelationDef};
use chrono::NaiveDateTime;
use may_postgres::Row;
use sea_query::Value;
use serde::{Deserialize, Serialize};

static COLUMNS: [ColumnDef; 17] = [
    column::ID,
    ColumnDef::new("first_name", ColumnKind::Varchar(100)),
    ColumnDef::new("last_name", ColumnKind::Varchar(100)),
    ColumnDef::new("email", ColumnKind::Varchar(100)).unique(),
    ColumnDef::new("phone", ColumnKind::Varchar(15)).nullable(),
    ColumnDef::new("password", ColumnKind::Varchar(255)),
    ColumnDef::new("otp", ColumnKind::Varchar(64)).nullable(),
    ColumnDef::new("otp_expires_at", ColumnKind::Timestamp).nullable(),
    ColumnDef::new("otp_attempts", ColumnKind::Integer).default_to(ColumnDefault::Integer(0)),
    ColumnDef::new("otp_generated_at", ColumnKind::Timestamp).nullable(),
    ColumnDef::new("otp_generation_count", ColumnKind::Integer).default_to(ColumnDefault::Integer(0)),
    ColumnDef::new("reset_token", ColumnKind::Varchar(64)).nullable(),
    ColumnDef::new("reset_token_expires_at", ColumnKind::Timestamp).nullable(),
    ColumnDef::new("reset_token_used", ColumnKind::Boolean).default_to(ColumnDefault::Bool(false)),
    column::CREATED_AT,
    column::UPDATED_AT,
    column::IS_DELETED,
];

static RELATIONS: [RelationDef; 0] = [];

static SCHEMA: EntitySchema = EntitySchema {
    name: "AdminUserModel",
    table: "admin_users",
    primary_key: "id",
    columns: &COLUMNS,
    relations: &RELATIONS,
};

/// Row of `admin_users`
///
/// The password digest, the one-time-code digest and the reset-token digest
/// are never serialized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdminUserModel {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    #[serde(skip_serializing, default)]
    pub password: String,
    #[serde(skip_serializing, default)]
    pub otp: Option<String>,
    pub otp_expires_at: Option<NaiveDateTime>,
    pub otp_attempts: i32,
    pub otp_generated_at: Option<NaiveDateTime>,
    pub otp_generation_count: i32,
    #[serde(skip_serializing, default)]
    pub reset_token: Option<String>,
    pub reset_token_expires_at: Option<NaiveDateTime>,
    pub reset_token_used: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub is_deleted: bool,
}

impl FromRow for AdminUserModel {
    fn from_row(row: &Row) -> Result<Self, may_postgres::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            first_name: row.try_get("first_name")?,
            last_name: row.try_get("last_name")?,
            email: row.try_get("email")?,
            phone: row.try_get("phone")?,
            password: row.try_get("password")?,
            otp: row.try_get("otp")?,
            otp_expires_at: row.try_get("otp_expires_at")?,
            otp_attempts: row.try_get("otp_attempts")?,
            otp_generated_at: row.try_get("otp_generated_at")?,
            otp_generation_count: row.try_get("otp_generation_count")?,
            reset_token: row.try_get("reset_token")?,
            reset_token_expires_at: row.try_get("reset_token_expires_at")?,
            reset_token_used: row.try_get("reset_token_used")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
            is_deleted: row.try_get("is_deleted")?,
        })
    }
}

impl Entity for AdminUserModel {
    fn schema() -> &'static EntitySchema {
        &SCHEMA
    }

    fn id(&self) -> &str {
        &self.id
    }
}

fn check_email(email: &str) -> Result<(), RecordError> {
    check_length("email", email, 3, 100)?;
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') && !domain.contains('@') => Ok(()),
        _ => Err(RecordError::Validation(format!("email '{email}' is not a valid address"))),
    }
}

fn check_phone(phone: Option<&str>) -> Result<(), RecordError> {
    match phone {
        Some(phone) => check_length("phone", phone, 1, 15),
        None => Ok(()),
    }
}

/// Sign-up payload. `password` is plain text here; the service stores
/// only its digest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminUserInput {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    pub password: String,
}

impl AdminUserInput {
    /// # Errors
    ///
    /// `Validation` for out-of-range names, a malformed email or phone, or a
    /// password shorter than `min_password_len`.
    pub fn validate(&self, min_password_len: usize) -> Result<(), RecordError> {
        check_length("first_name", &self.first_name, 1, 100)?;
        check_length("last_name", &self.last_name, 1, 100)?;
        check_email(&self.email)?;
        check_phone(self.phone.as_deref())?;
        check_password(&self.password, min_password_len)
    }
}

/// Password length rule shared by sign-up, change and reset.
///
/// # Errors
///
/// `Validation` when shorter than `min_len` or longer than 128 characters.
pub fn check_password(password: &str, min_len: usize) -> Result<(), RecordError> {
    check_length("password", password, min_len, 128)
}

/// Profile fields an admin may change on their own account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileInput {
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub phone: Option<String>,
}

impl ProfileInput {
    /// # Errors
    ///
    /// `Validation` for out-of-range names or phone.
    pub fn validate(&self) -> Result<(), RecordError> {
        check_length("first_name", &self.first_name, 1, 100)?;
        check_length("last_name", &self.last_name, 1, 100)?;
        check_phone(self.phone.as_deref())
    }
}

impl RecordInput for ProfileInput {
    fn column_values(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("first_name", self.first_name.clone().into()),
            ("last_name", self.last_name.clone().into()),
            ("phone", self.phone.clone().into()),
        ]
    }
}

/// Arbitrary column assignments on `admin_users`, for the password and
/// one-time-code bookkeeping the services do.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AdminUserChanges(Vec<(&'static str, Value)>);

impl AdminUserChanges {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, column: &'static str, value: impl Into<Value>) -> Self {
        self.0.push((column, value.into()));
        self
    }
}

impl RecordInput for AdminUserChanges {
    fn column_values(&self) -> Vec<(&'static str, Value)> {
        self.0.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input() -> AdminUserInput {
        AdminUserInput {
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            email: "ada@example.com".into(),
            phone: None,
            password: "analytical".into(),
        }
    }

    #[test]
    fn test_schema() {
        let schema = AdminUserModel::schema();
        assert_eq!(schema.display_name(), "AdminUser");
        assert!(schema.has_soft_delete());
        assert!(schema.column("email").is_some_and(|c| c.unique));
        assert!(schema.column("otp").is_some_and(|c| c.nullable));
        assert_eq!(
            schema.column("otp_attempts").and_then(|c| c.default),
            Some(ColumnDefault::Integer(0))
        );
    }

    #[test]
    fn test_validate() {
        assert!(input().validate(8).is_ok());

        let mut bad = input();
        bad.email = "not-an-email".into();
        assert!(matches!(bad.validate(8), Err(RecordError::Validation(_))));

        let mut bad = input();
        bad.password = "short".into();
        assert!(matches!(bad.validate(8), Err(RecordError::Validation(_))));

        let mut bad = input();
        bad.phone = Some("1".repeat(16));
        assert!(bad.validate(8).is_err());
    }

    #[test]
    fn test_secrets_are_not_serialized() {
        let json = serde_json::to_value(AdminUserModel {
            id: "a-1".into(),
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            email: "ada@example.com".into(),
            phone: None,
            password: "sha256$1$aa$bb".into(),
            otp: Some("digest".into()),
            otp_expires_at: None,
            otp_attempts: 0,
            otp_generated_at: None,
            otp_generation_count: 0,
            reset_token: Some("digest".into()),
            reset_token_expires_at: None,
            reset_token_used: false,
            created_at: NaiveDateTime::default(),
            updated_at: NaiveDateTime::default(),
            is_deleted: false,
        })
        .unwrap();
        assert!(json.get("password").is_none());
        assert!(json.get("otp").is_none());
        assert!(json.get("reset_token").is_none());
        assert_eq!(json["email"], "ada@example.com");
    }

    #[test]
    fn test_changes_keep_order() {
        let changes = AdminUserChanges::new()
            .set("otp_attempts", 2)
            .set("otp", Option::<String>::None);
        let values = changes.column_values();
        assert_eq!(values[0], ("otp_attempts", Value::from(2)));
        assert_eq!(values[1], ("otp", Value::String(None)));
    }
}
