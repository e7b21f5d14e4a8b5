//! City operations. Every city belongs to a live state.

use super::ListQuery;
use crate::config::ListingConfig;
use crate::executor::RecordExecutor;
use crate::models::{CityInput, CityModel, CityWithState, StateModel};
use crate::query::{
    create_record, delete_record, get_record, get_records, load_by_ids, require_record,
    update_record, FilterSet, LookupOptions, Page, RecordError,
};
use crate::schema::Entity;

pub const SEARCH_FIELDS: &[&str] = &["name"];
pub const SORTABLE: &[&str] = &[
    "name",
    "created_at",
    "updated_at",
    "state.name",
    "state.country.name",
];

/// Optional parent filters for [`list_cities`].
#[derive(Debug, Clone, Copy, Default)]
pub struct CityFilters<'a> {
    pub state_id: Option<&'a str>,
    /// Matched through the city's state (`state.country_id`)
    pub country_id: Option<&'a str>,
}

fn with_states<X: RecordExecutor + ?Sized>(
    executor: &X,
    cities: Vec<CityModel>,
) -> Result<Vec<CityWithState>, RecordError> {
    let states = load_by_ids::<StateModel, X>(executor, cities.iter().map(|c| c.state_id.as_str()))?;
    Ok(cities
        .into_iter()
        .map(|city| CityWithState {
            state: states.get(&city.state_id).cloned(),
            city,
        })
        .collect())
}

/// List live cities, optionally narrowed to one state or one country.
///
/// # Errors
///
/// Listing parameter errors or executor errors.
pub fn list_cities<X: RecordExecutor + ?Sized>(
    executor: &X,
    listing: &ListingConfig,
    query: &ListQuery,
    filters: CityFilters<'_>,
) -> Result<Page<CityWithState>, RecordError> {
    let mut params = query.params(SEARCH_FIELDS, SORTABLE)?;
    if let Some(state_id) = filters.state_id {
        params = params.filter("state_id", state_id);
    }
    if let Some(country_id) = filters.country_id {
        params = params.filter("state.country_id", country_id);
    }
    let page = get_records::<CityModel, X>(executor, query.window(listing)?, &params)?;
    Ok(Page {
        count: page.count,
        list: with_states(executor, page.list)?,
    })
}

/// # Errors
///
/// `NotFound("City")` when no live city has this id.
pub fn get_city<X: RecordExecutor + ?Sized>(executor: &X, id: &str) -> Result<CityWithState, RecordError> {
    let city = require_record::<CityModel, X>(executor, &FilterSet::new().with("id", id))?;
    let mut list = with_states(executor, vec![city])?;
    list.pop().ok_or_else(|| RecordError::not_found(CityModel::schema().display_name()))
}

fn require_state<X: RecordExecutor + ?Sized>(executor: &X, state_id: &str) -> Result<(), RecordError> {
    let filters = FilterSet::new().with("id", state_id);
    match get_record::<StateModel, X>(executor, &filters, LookupOptions::optional())? {
        Some(_) => Ok(()),
        None => Err(RecordError::not_found(StateModel::schema().display_name())),
    }
}

/// # Errors
///
/// `Validation`, or `NotFound("State")` when the parent is missing.
pub fn create_city<X: RecordExecutor + ?Sized>(executor: &X, input: &CityInput) -> Result<CityModel, RecordError> {
    input.validate()?;
    require_state(executor, &input.state_id)?;
    create_record::<CityModel, X>(executor, input)
}

/// # Errors
///
/// `Validation`, `NotFound("State")`, or `NotFound("City")`.
pub fn update_city<X: RecordExecutor + ?Sized>(
    executor: &X,
    id: &str,
    input: &CityInput,
) -> Result<CityModel, RecordError> {
    input.validate()?;
    require_state(executor, &input.state_id)?;
    update_record::<CityModel, X>(executor, id, input)
}

/// # Errors
///
/// `NotFound("City")`.
pub fn delete_city<X: RecordExecutor + ?Sized>(executor: &X, id: &str) -> Result<CityModel, RecordError> {
    delete_record::<CityModel, X>(executor, id)
}
