//! Admin accounts: sign-up, sign-in, profile and password changes, and the
//! one-time-code password reset.
//!
//! Reset runs in two steps. [`request_password_reset`] issues a numeric code
//! and [`verify_otp`] trades a correct code for a single-use reset token,
//! which [`reset_password_with_token`] spends. Only SHA-256 digests of codes
//! and tokens are stored. Delivering the code to the user is the caller's
//! job, so the plain code is returned exactly once.

use super::ListQuery;
use crate::config::{AuthConfig, ListingConfig};
use crate::executor::RecordExecutor;
use crate::models::{check_password, AdminUserChanges, AdminUserInput, AdminUserModel, ProfileInput};
use crate::query::{
    create_record, delete_record, get_record, get_records, require_record, update_record,
    update_record_if, FilterSet, LookupOptions, Page, RecordError,
};
use crate::schema::RecordInput;
use crate::security;
use chrono::{Duration, NaiveDateTime, Utc};
use sea_query::{Alias, Condition, Expr, ExprTrait, Value};

pub const SEARCH_FIELDS: &[&str] = &["first_name", "last_name", "email"];
pub const SORTABLE: &[&str] = &["first_name", "last_name", "email", "created_at", "updated_at"];

const DUPLICATE_EMAIL: &str = "Email already registered";
const INVALID_CREDENTIALS: &str = "Invalid credentials";
const INVALID_OTP: &str = "Invalid OTP";
const INVALID_TOKEN: &str = "Invalid or expired reset token";

/// A freshly issued one-time code. `otp` is the only copy in plain text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OtpIssued {
    pub otp: String,
    pub expires_at: NaiveDateTime,
}

/// A reset token handed out for a verified code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResetTokenIssued {
    pub token: String,
    pub expires_at: NaiveDateTime,
}

struct NewAdminUser<'a> {
    input: &'a AdminUserInput,
    password_hash: String,
}

impl RecordInput for NewAdminUser<'_> {
    fn column_values(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("first_name", self.input.first_name.clone().into()),
            ("last_name", self.input.last_name.clone().into()),
            ("email", self.input.email.to_lowercase().into()),
            ("phone", self.input.phone.clone().into()),
            ("password", self.password_hash.clone().into()),
        ]
    }
}

fn now() -> NaiveDateTime {
    Utc::now().naive_utc()
}

/// The account holding `email`, deleted or not. Emails are unique across
/// every row.
fn by_email<X: RecordExecutor + ?Sized>(executor: &X, email: &str) -> Result<Option<AdminUserModel>, RecordError> {
    let options = LookupOptions {
        include_deleted: true,
        ..LookupOptions::optional()
    };
    get_record::<AdminUserModel, X>(executor, &FilterSet::new().with("email", email), options)
}

fn live_by_email<X: RecordExecutor + ?Sized>(
    executor: &X,
    email: &str,
) -> Result<Option<AdminUserModel>, RecordError> {
    Ok(by_email(executor, email)?.filter(|user| !user.is_deleted))
}

/// # Errors
///
/// Listing parameter errors or executor errors.
pub fn list_admin_users<X: RecordExecutor + ?Sized>(
    executor: &X,
    listing: &ListingConfig,
    query: &ListQuery,
) -> Result<Page<AdminUserModel>, RecordError> {
    let params = query.params(SEARCH_FIELDS, SORTABLE)?;
    get_records::<AdminUserModel, X>(executor, query.window(listing)?, &params)
}

/// # Errors
///
/// `NotFound` when no live account has this id.
pub fn get_admin_user<X: RecordExecutor + ?Sized>(executor: &X, id: &str) -> Result<AdminUserModel, RecordError> {
    require_record::<AdminUserModel, X>(executor, &FilterSet::new().with("id", id))
}

/// Register an admin. The email is stored lower-cased.
///
/// # Errors
///
/// `Validation`, or `Conflict` when any account, deleted or not, already
/// uses the email.
pub fn create_admin_user<X: RecordExecutor + ?Sized>(
    executor: &X,
    auth: &AuthConfig,
    input: &AdminUserInput,
) -> Result<AdminUserModel, RecordError> {
    input.validate(auth.min_password_len)?;
    if by_email(executor, &input.email)?.is_some() {
        return Err(RecordError::Conflict(DUPLICATE_EMAIL.to_string()));
    }
    let record = NewAdminUser {
        input,
        password_hash: security::hash_password(&input.password),
    };
    let user = create_record::<AdminUserModel, X>(executor, &record).map_err(|e| e.or_conflict(DUPLICATE_EMAIL))?;
    log::info!("created admin {}", user.id);
    Ok(user)
}

/// Check an email and password pair.
///
/// # Errors
///
/// `Unauthorized("Invalid credentials")` for an unknown email or a wrong
/// password, and `Unauthorized("Account is deleted")` for a deleted account.
pub fn sign_in<X: RecordExecutor + ?Sized>(
    executor: &X,
    email: &str,
    password: &str,
) -> Result<AdminUserModel, RecordError> {
    let Some(user) = by_email(executor, email)? else {
        return Err(RecordError::Unauthorized(INVALID_CREDENTIALS.to_string()));
    };
    if !security::verify_password(password, &user.password) {
        log::debug!("rejected sign-in for admin {}", user.id);
        return Err(RecordError::Unauthorized(INVALID_CREDENTIALS.to_string()));
    }
    if user.is_deleted {
        return Err(RecordError::Unauthorized("Account is deleted".to_string()));
    }
    Ok(user)
}

/// # Errors
///
/// `Validation` or `NotFound`.
pub fn update_profile<X: RecordExecutor + ?Sized>(
    executor: &X,
    id: &str,
    input: &ProfileInput,
) -> Result<AdminUserModel, RecordError> {
    input.validate()?;
    update_record::<AdminUserModel, X>(executor, id, input)
}

/// Replace the password after checking the current one.
///
/// # Errors
///
/// `NotFound`, `Unauthorized("Incorrect old password")`, or `Validation`
/// for a new password outside the length rule.
pub fn change_password<X: RecordExecutor + ?Sized>(
    executor: &X,
    auth: &AuthConfig,
    id: &str,
    old_password: &str,
    new_password: &str,
) -> Result<AdminUserModel, RecordError> {
    let user = get_admin_user(executor, id)?;
    if !security::verify_password(old_password, &user.password) {
        return Err(RecordError::Unauthorized("Incorrect old password".to_string()));
    }
    check_password(new_password, auth.min_password_len)?;
    let changes = AdminUserChanges::new().set("password", security::hash_password(new_password));
    update_record::<AdminUserModel, X>(executor, id, &changes)
}

/// # Errors
///
/// `NotFound` or executor errors.
pub fn delete_admin_user<X: RecordExecutor + ?Sized>(executor: &X, id: &str) -> Result<AdminUserModel, RecordError> {
    delete_record::<AdminUserModel, X>(executor, id)
}

/// Codes already issued inside the current generation window.
fn generations_in_window(user: &AdminUserModel, auth: &AuthConfig, at: NaiveDateTime) -> i32 {
    let window_start = at - Duration::minutes(auth.otp_generation_window_minutes);
    match user.otp_generated_at {
        Some(generated) if generated > window_start => user.otp_generation_count,
        _ => 0,
    }
}

/// Issue a new one-time code for `email`, replacing any earlier code and
/// any unspent reset token.
///
/// # Errors
///
/// `NotFound` for an unknown or deleted account, or `RateLimited` once
/// `otp_max_generations` codes were issued inside the generation window.
pub fn request_password_reset<X: RecordExecutor + ?Sized>(
    executor: &X,
    auth: &AuthConfig,
    email: &str,
) -> Result<OtpIssued, RecordError> {
    let user = live_by_email(executor, email)?.ok_or_else(|| RecordError::not_found("User"))?;

    let at = now();
    let issued = generations_in_window(&user, auth, at);
    if issued >= auth.otp_max_generations {
        log::warn!("reset code limit reached for admin {}", user.id);
        return Err(RecordError::RateLimited(
            "Too many codes requested; try again later".to_string(),
        ));
    }

    let otp = security::generate_otp();
    let expires_at = at + Duration::minutes(auth.otp_ttl_minutes);
    let changes = AdminUserChanges::new()
        .set("otp", security::sha256_hex(&otp))
        .set("otp_expires_at", expires_at)
        .set("otp_attempts", 0)
        .set("otp_generated_at", at)
        .set("otp_generation_count", issued + 1)
        .set("reset_token", Option::<String>::None)
        .set("reset_token_expires_at", Option::<NaiveDateTime>::None)
        .set("reset_token_used", false);
    update_record::<AdminUserModel, X>(executor, &user.id, &changes)?;

    log::info!("issued reset code for admin {}", user.id);
    Ok(OtpIssued { otp, expires_at })
}

/// Trade a correct, unexpired code for a reset token. The code is
/// consumed on success; a wrong guess counts against `otp_max_attempts`.
///
/// # Errors
///
/// `Unauthorized` for an unknown account, a wrong, missing or expired code,
/// and `RateLimited` once the attempts are used up.
pub fn verify_otp<X: RecordExecutor + ?Sized>(
    executor: &X,
    auth: &AuthConfig,
    email: &str,
    otp: &str,
) -> Result<ResetTokenIssued, RecordError> {
    let Some(user) = live_by_email(executor, email)? else {
        return Err(RecordError::Unauthorized(INVALID_OTP.to_string()));
    };
    let Some(stored) = user.otp.as_deref() else {
        return Err(RecordError::Unauthorized(INVALID_OTP.to_string()));
    };

    if user.otp_attempts >= auth.otp_max_attempts {
        return Err(RecordError::RateLimited(
            "Too many attempts; request a new code".to_string(),
        ));
    }

    let at = now();
    if user.otp_expires_at.map_or(true, |expires| expires <= at) {
        return Err(RecordError::Unauthorized("OTP expired".to_string()));
    }

    if !security::constant_time_eq(&security::sha256_hex(otp), stored) {
        let changes = AdminUserChanges::new().set("otp_attempts", user.otp_attempts + 1);
        update_record::<AdminUserModel, X>(executor, &user.id, &changes)?;
        log::debug!("wrong reset code for admin {}", user.id);
        return Err(RecordError::Unauthorized(INVALID_OTP.to_string()));
    }

    let token = security::generate_token();
    let expires_at = at + Duration::minutes(auth.reset_token_ttl_minutes);
    let changes = AdminUserChanges::new()
        .set("otp", Option::<String>::None)
        .set("otp_expires_at", Option::<NaiveDateTime>::None)
        .set("otp_attempts", 0)
        .set("reset_token", security::sha256_hex(&token))
        .set("reset_token_expires_at", expires_at)
        .set("reset_token_used", false);
    update_record::<AdminUserModel, X>(executor, &user.id, &changes)?;

    Ok(ResetTokenIssued { token, expires_at })
}

/// Set a new password with a reset token. The token is claimed in the
/// same statement that writes the password, so it works once.
///
/// # Errors
///
/// `Validation` for the new password, or `Unauthorized` for an unknown,
/// spent or expired token.
pub fn reset_password_with_token<X: RecordExecutor + ?Sized>(
    executor: &X,
    auth: &AuthConfig,
    token: &str,
    new_password: &str,
) -> Result<AdminUserModel, RecordError> {
    check_password(new_password, auth.min_password_len)?;

    let digest = security::sha256_hex(token);
    let user = get_record::<AdminUserModel, X>(
        executor,
        &FilterSet::new().with("reset_token", digest.as_str()),
        LookupOptions::optional(),
    )?
    .ok_or_else(|| RecordError::Unauthorized(INVALID_TOKEN.to_string()))?;

    if user.reset_token_used {
        return Err(RecordError::Unauthorized("Reset token already used".to_string()));
    }
    if user.reset_token_expires_at.map_or(true, |expires| expires <= now()) {
        return Err(RecordError::Unauthorized(INVALID_TOKEN.to_string()));
    }

    let unspent = Condition::all()
        .add(Expr::col(Alias::new("reset_token")).eq(digest))
        .add(Expr::col(Alias::new("reset_token_used")).eq(false));
    let changes = AdminUserChanges::new()
        .set("password", security::hash_password(new_password))
        .set("reset_token_used", true);
    let updated = update_record_if::<AdminUserModel, X>(executor, &user.id, &changes, unspent)
        .map_err(|e| match e {
            RecordError::NotFound { .. } => RecordError::Unauthorized("Reset token already used".to_string()),
            other => other,
        })?;

    log::info!("password reset for admin {}", updated.id);
    Ok(updated)
}

/// Reset in one call from an email and its code.
///
/// # Errors
///
/// Anything [`verify_otp`] or [`reset_password_with_token`] reports.
pub fn reset_password<X: RecordExecutor + ?Sized>(
    executor: &X,
    auth: &AuthConfig,
    email: &str,
    otp: &str,
    new_password: &str,
) -> Result<AdminUserModel, RecordError> {
    check_password(new_password, auth.min_password_len)?;
    let issued = verify_otp(executor, auth, email, otp)?;
    reset_password_with_token(executor, auth, &issued.token, new_password)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::RecordingExecutor;

    fn input() -> AdminUserInput {
        AdminUserInput {
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            email: "Ada@Example.com".into(),
            phone: None,
            password: "analytical".into(),
        }
    }

    fn user() -> AdminUserModel {
        AdminUserModel {
            id: "a-1".into(),
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            email: "ada@example.com".into(),
            phone: None,
            password: String::new(),
            otp: None,
            otp_expires_at: None,
            otp_attempts: 0,
            otp_generated_at: None,
            otp_generation_count: 0,
            reset_token: None,
            reset_token_expires_at: None,
            reset_token_used: false,
            created_at: NaiveDateTime::default(),
            updated_at: NaiveDateTime::default(),
            is_deleted: false,
        }
    }

    #[test]
    fn test_stored_row_never_holds_plain_password() {
        let input = input();
        let record = NewAdminUser {
            input: &input,
            password_hash: security::hash_password(&input.password),
        };
        let values = record.column_values();
        assert_eq!(values[2], ("email", Value::from("ada@example.com")));
        let (_, password) = &values[4];
        assert_ne!(*password, Value::from("analytical"));
    }

    #[test]
    fn test_create_validates_then_checks_email() {
        let executor = RecordingExecutor::new();
        let mut bad = input();
        bad.password = "short".into();
        assert!(matches!(
            create_admin_user(&executor, &AuthConfig::default(), &bad),
            Err(RecordError::Validation(_))
        ));
        assert!(executor.statements().is_empty());

        let _ = create_admin_user(&executor, &AuthConfig::default(), &input());
        let statements = executor.statements();
        assert_eq!(statements.len(), 2);
        assert!(statements[0].contains(r#"LOWER("admin_users"."email")"#), "{}", statements[0]);
        assert!(!statements[0].contains("is_deleted"), "{}", statements[0]);
        assert!(statements[1].starts_with(r#"INSERT INTO "admin_users""#));
    }

    #[test]
    fn test_unknown_email_is_invalid_credentials() {
        let executor = RecordingExecutor::new();
        let err = sign_in(&executor, "nobody@example.com", "whatever").unwrap_err();
        assert_eq!(err.to_string(), "Invalid credentials");
        assert_eq!(err.status_code(), 401);
    }

    #[test]
    fn test_unknown_email_gets_no_code() {
        let executor = RecordingExecutor::new();
        let err = request_password_reset(&executor, &AuthConfig::default(), "nobody@example.com").unwrap_err();
        assert_eq!(err.status_code(), 404);
        let err = verify_otp(&executor, &AuthConfig::default(), "nobody@example.com", "123456").unwrap_err();
        assert_eq!(err.status_code(), 401);
    }

    #[test]
    fn test_generation_window() {
        let auth = AuthConfig::default();
        let at = now();
        let mut user = user();
        assert_eq!(generations_in_window(&user, &auth, at), 0);

        user.otp_generation_count = 3;
        user.otp_generated_at = Some(at - Duration::minutes(5));
        assert_eq!(generations_in_window(&user, &auth, at), 3);

        user.otp_generated_at = Some(at - Duration::minutes(auth.otp_generation_window_minutes + 1));
        assert_eq!(generations_in_window(&user, &auth, at), 0);
    }

    #[test]
    fn test_short_reset_password_is_rejected_first() {
        let executor = RecordingExecutor::new();
        let err = reset_password_with_token(&executor, &AuthConfig::default(), "tok", "short").unwrap_err();
        assert!(matches!(err, RecordError::Validation(_)));
        assert!(executor.statements().is_empty());

        let err = reset_password_with_token(&executor, &AuthConfig::default(), "tok", "long enough").unwrap_err();
        assert_eq!(err.to_string(), INVALID_TOKEN);
        // Looked up by digest, never by the plain token.
        assert!(!executor.params()[0].iter().any(|p| p.contains("tok\"")));
    }
}
