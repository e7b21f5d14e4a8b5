//! State operations. Every state belongs to a live country.

use super::ListQuery;
use crate::config::ListingConfig;
use crate::executor::RecordExecutor;
use crate::models::{CountryModel, StateInput, StateModel, StateWithCountry};
use crate::query::{
    create_record, delete_record, get_record, get_records, has_live_children, load_by_ids,
    require_record, update_record, FilterSet, LookupOptions, Page, RecordError,
};
use crate::schema::Entity;

pub const SEARCH_FIELDS: &[&str] = &["name", "code"];
pub const SORTABLE: &[&str] = &["name", "code", "created_at", "updated_at", "country.name"];

fn with_countries<X: RecordExecutor + ?Sized>(
    executor: &X,
    states: Vec<StateModel>,
) -> Result<Vec<StateWithCountry>, RecordError> {
    let countries =
        load_by_ids::<CountryModel, X>(executor, states.iter().map(|s| s.country_id.as_str()))?;
    Ok(states
        .into_iter()
        .map(|state| StateWithCountry {
            country: countries.get(&state.country_id).cloned(),
            state,
        })
        .collect())
}

/// List live states, optionally only those of one country.
///
/// # Errors
///
/// Listing parameter errors or executor errors.
pub fn list_states<X: RecordExecutor + ?Sized>(
    executor: &X,
    listing: &ListingConfig,
    query: &ListQuery,
    country_id: Option<&str>,
) -> Result<Page<StateWithCountry>, RecordError> {
    let mut params = query.params(SEARCH_FIELDS, SORTABLE)?;
    if let Some(country_id) = country_id {
        params = params.filter("country_id", country_id);
    }
    let page = get_records::<StateModel, X>(executor, query.window(listing)?, &params)?;
    Ok(Page {
        count: page.count,
        list: with_countries(executor, page.list)?,
    })
}

/// # Errors
///
/// `NotFound("State")` when no live state has this id.
pub fn get_state<X: RecordExecutor + ?Sized>(executor: &X, id: &str) -> Result<StateWithCountry, RecordError> {
    let state = require_record::<StateModel, X>(executor, &FilterSet::new().with("id", id))?;
    let mut list = with_countries(executor, vec![state])?;
    list.pop().ok_or_else(|| RecordError::not_found(StateModel::schema().display_name()))
}

fn require_country<X: RecordExecutor + ?Sized>(executor: &X, country_id: &str) -> Result<(), RecordError> {
    let filters = FilterSet::new().with("id", country_id);
    match get_record::<CountryModel, X>(executor, &filters, LookupOptions::optional())? {
        Some(_) => Ok(()),
        None => Err(RecordError::not_found(CountryModel::schema().display_name())),
    }
}

/// # Errors
///
/// `Validation`, or `NotFound("Country")` when the parent is missing.
pub fn create_state<X: RecordExecutor + ?Sized>(executor: &X, input: &StateInput) -> Result<StateModel, RecordError> {
    input.validate()?;
    require_country(executor, &input.country_id)?;
    create_record::<StateModel, X>(executor, input)
}

/// # Errors
///
/// `Validation`, `NotFound("Country")`, or `NotFound("State")`.
pub fn update_state<X: RecordExecutor + ?Sized>(
    executor: &X,
    id: &str,
    input: &StateInput,
) -> Result<StateModel, RecordError> {
    input.validate()?;
    require_country(executor, &input.country_id)?;
    update_record::<StateModel, X>(executor, id, input)
}

/// Soft-delete a state that has no live cities.
///
/// # Errors
///
/// `NotFound`, or `Conflict` while live cities still reference it.
pub fn delete_state<X: RecordExecutor + ?Sized>(executor: &X, id: &str) -> Result<StateModel, RecordError> {
    if has_live_children(executor, StateModel::schema(), id, &[])? {
        return Err(RecordError::Conflict(
            "State still has cities; delete them first".to_string(),
        ));
    }
    delete_record::<StateModel, X>(executor, id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::RecordingExecutor;

    #[test]
    fn test_country_filter_is_direct() {
        let executor = RecordingExecutor::new();
        list_states(&executor, &ListingConfig::default(), &ListQuery::default(), Some("c-1")).unwrap();
        let statements = executor.statements();
        assert_eq!(statements.len(), 2, "empty page loads no countries");
        assert!(statements[0].contains(r#""states"."country_id" = $"#), "{}", statements[0]);
        assert!(!statements[0].contains("JOIN"));
    }

    #[test]
    fn test_create_requires_parent() {
        let executor = RecordingExecutor::new();
        let input = StateInput {
            name: "Kerala".into(),
            code: "KL".into(),
            country_id: "0".repeat(36),
        };
        let err = create_state(&executor, &input).unwrap_err();
        assert_eq!(err.to_string(), "Country not found");
        assert_eq!(executor.statements().len(), 1);
    }
}
