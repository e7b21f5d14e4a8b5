//! Operations built on the record engine.
//!
//! These are the checks a request handler runs around the generic helpers:
//! payload validation, duplicate codes, parent existence, and refusing to
//! delete a parent that still has live children. Admin accounts and the
//! API audit log sit alongside the reference data.

pub mod admin_users;
pub mod api_logs;
pub mod cities;
pub mod countries;
pub mod states;

use crate::config::ListingConfig;
use crate::query::{resolve_sort_field, ListParams, PageWindow, RecordError, SortOrder};
use serde::Deserialize;

const MAX_SEARCH_LEN: usize = 50;
const MAX_SORT_LEN: usize = 50;

/// Listing parameters as a request supplies them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub start: u64,
    pub limit: Option<u64>,
    pub search: Option<String>,
    pub sort_by: Option<String>,
    pub order: Option<String>,
}

impl ListQuery {
    /// Page window with the limit clamped into `1..=listing.max_limit`.
    ///
    /// # Errors
    ///
    /// Never in practice; the clamped limit is always positive.
    pub fn window(&self, listing: &ListingConfig) -> Result<PageWindow, RecordError> {
        PageWindow::new(self.start, listing.clamp_limit(self.limit))
    }

    /// Engine parameters for an entity searchable on `search_fields` and
    /// sortable on `sortable`.
    ///
    /// # Errors
    ///
    /// `Validation` for an over-long search term or sort key or an order other
    /// than `asc`/`desc`; `InvalidSortField` for a sort key outside `sortable`.
    pub fn params(&self, search_fields: &[&str], sortable: &[&str]) -> Result<ListParams, RecordError> {
        let mut params = ListParams::new();

        if let Some(term) = self.search.as_deref() {
            if term.chars().count() > MAX_SEARCH_LEN {
                return Err(RecordError::Validation(format!(
                    "search must be at most {MAX_SEARCH_LEN} characters"
                )));
            }
            if !term.trim().is_empty() {
                params = params.search(term, search_fields.iter().copied());
            }
        }

        let order = match self.order.as_deref() {
            None => SortOrder::Asc,
            Some(o) if o == "asc" || o == "desc" => SortOrder::from_param(Some(o)),
            Some(o) => {
                return Err(RecordError::Validation(format!(
                    "order must be 'asc' or 'desc', got '{o}'"
                )))
            }
        };

        if let Some(sort_by) = self.sort_by.as_deref() {
            if sort_by.chars().count() > MAX_SORT_LEN {
                return Err(RecordError::Validation(format!(
                    "sort_by must be at most {MAX_SORT_LEN} characters"
                )));
            }
            let field = resolve_sort_field(sort_by, sortable)?;
            params = params.sort_by(field, order);
        }

        Ok(params)
    }
}
