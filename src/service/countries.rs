//! Country operations.

use super::ListQuery;
use crate::config::ListingConfig;
use crate::executor::RecordExecutor;
use crate::models::{CountryInput, CountryModel};
use crate::query::{
    create_record, delete_record, get_record, get_records, has_live_children, require_record,
    update_record, FilterSet, LookupOptions, Page, RecordError,
};
use crate::schema::Entity;

pub const SEARCH_FIELDS: &[&str] = &["name", "code"];
pub const SORTABLE: &[&str] = &["name", "code", "created_at", "updated_at"];

const DUPLICATE_CODE: &str = "Country code already exists";

/// # Errors
///
/// Listing parameter errors or executor errors.
pub fn list_countries<X: RecordExecutor + ?Sized>(
    executor: &X,
    listing: &ListingConfig,
    query: &ListQuery,
) -> Result<Page<CountryModel>, RecordError> {
    let params = query.params(SEARCH_FIELDS, SORTABLE)?;
    get_records::<CountryModel, X>(executor, query.window(listing)?, &params)
}

/// # Errors
///
/// `NotFound("Country")` when no live country has this id.
pub fn get_country<X: RecordExecutor + ?Sized>(executor: &X, id: &str) -> Result<CountryModel, RecordError> {
    require_record::<CountryModel, X>(executor, &FilterSet::new().with("id", id))
}

/// The country holding `code`, deleted or not. `countries.code` is unique
/// across every row, so a soft-deleted country still owns its code.
fn code_taken_by<X: RecordExecutor + ?Sized>(
    executor: &X,
    code: &str,
) -> Result<Option<CountryModel>, RecordError> {
    let options = LookupOptions {
        include_deleted: true,
        ..LookupOptions::optional()
    };
    get_record::<CountryModel, X>(executor, &FilterSet::new().with("code", code), options)
}

/// # Errors
///
/// `Validation`, or `Conflict` when any country, including a soft-deleted
/// one, already uses the code (compared case-insensitively).
pub fn create_country<X: RecordExecutor + ?Sized>(
    executor: &X,
    input: &CountryInput,
) -> Result<CountryModel, RecordError> {
    input.validate()?;
    if code_taken_by(executor, &input.code)?.is_some() {
        return Err(RecordError::Conflict(DUPLICATE_CODE.to_string()));
    }
    // A concurrent insert can still win between the check and the write.
    create_record::<CountryModel, X>(executor, input).map_err(|e| e.or_conflict(DUPLICATE_CODE))
}

/// # Errors
///
/// `Validation`, `Conflict` when another country uses the code, or
/// `NotFound`.
pub fn update_country<X: RecordExecutor + ?Sized>(
    executor: &X,
    id: &str,
    input: &CountryInput,
) -> Result<CountryModel, RecordError> {
    input.validate()?;
    if let Some(existing) = code_taken_by(executor, &input.code)? {
        if existing.id != id {
            return Err(RecordError::Conflict(DUPLICATE_CODE.to_string()));
        }
    }
    update_record::<CountryModel, X>(executor, id, input).map_err(|e| e.or_conflict(DUPLICATE_CODE))
}

/// Soft-delete a country that has no live states.
///
/// # Errors
///
/// `NotFound`, or `Conflict` while live states still reference it.
pub fn delete_country<X: RecordExecutor + ?Sized>(executor: &X, id: &str) -> Result<CountryModel, RecordError> {
    if has_live_children(executor, CountryModel::schema(), id, &[])? {
        return Err(RecordError::Conflict(
            "Country still has states; delete them first".to_string(),
        ));
    }
    delete_record::<CountryModel, X>(executor, id)
}
