//! API request audit log. Rows are only ever appended.

use super::ListQuery;
use crate::config::ListingConfig;
use crate::executor::RecordExecutor;
use crate::models::{ApiLogInput, ApiLogModel};
use crate::query::{create_record, get_records, require_record, FilterSet, Page, RecordError};

pub const SEARCH_FIELDS: &[&str] = &["url", "method", "error_message"];
pub const SORTABLE: &[&str] = &["created_at", "status_code", "method", "url"];

/// Narrowing applied on top of search.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApiLogFilters<'a> {
    pub user_id: Option<&'a str>,
    pub user_type: Option<&'a str>,
    pub status_code: Option<i32>,
    pub method: Option<&'a str>,
}

/// # Errors
///
/// `Validation` or executor errors.
pub fn record_api_log<X: RecordExecutor + ?Sized>(executor: &X, input: &ApiLogInput) -> Result<ApiLogModel, RecordError> {
    input.validate()?;
    let entry = create_record::<ApiLogModel, X>(executor, input)?;
    log::debug!("{} {} -> {}", entry.method, entry.url, entry.status_code);
    Ok(entry)
}

/// Newest first unless the query sorts otherwise.
///
/// # Errors
///
/// Listing parameter errors or executor errors.
pub fn list_api_logs<X: RecordExecutor + ?Sized>(
    executor: &X,
    listing: &ListingConfig,
    query: &ListQuery,
    filters: ApiLogFilters<'_>,
) -> Result<Page<ApiLogModel>, RecordError> {
    let mut params = query.params(SEARCH_FIELDS, SORTABLE)?;
    if let Some(user_id) = filters.user_id {
        params = params.filter("user_id", user_id);
    }
    if let Some(user_type) = filters.user_type {
        params = params.filter("user_type", user_type);
    }
    if let Some(status_code) = filters.status_code {
        params = params.filter("status_code", status_code);
    }
    if let Some(method) = filters.method {
        params = params.filter("method", method.to_uppercase());
    }
    get_records::<ApiLogModel, X>(executor, query.window(listing)?, &params)
}

/// # Errors
///
/// `NotFound("ApiLog")` when no entry has this id.
pub fn get_api_log<X: RecordExecutor + ?Sized>(executor: &X, id: &str) -> Result<ApiLogModel, RecordError> {
    require_record::<ApiLogModel, X>(executor, &FilterSet::new().with("id", id))
}
