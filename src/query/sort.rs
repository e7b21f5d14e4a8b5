//! Sort direction, sort-field resolution and the sort applier.

use super::error::RecordError;
use super::path::{validate_path, JoinScope};
use crate::schema::{EntitySchema, CREATED_AT_COLUMN};
use sea_query::{Alias, Order, SelectStatement};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    /// Descending only for `"desc"` (any case); anything else is ascending.
    pub fn from_param(order: Option<&str>) -> Self {
        match order {
            Some(o) if o.trim().eq_ignore_ascii_case("desc") => SortOrder::Desc,
            _ => SortOrder::Asc,
        }
    }

    fn to_order(self) -> Order {
        match self {
            SortOrder::Asc => Order::Asc,
            SortOrder::Desc => Order::Desc,
        }
    }
}

/// Map a requested sort key onto one of the caller's allowed field paths.
///
/// An exact match wins. Otherwise the first allowed path whose relationship
/// segments contain the key is used, so `"state"` selects `"state.name"`.
///
/// # Errors
///
/// `InvalidSortField` when nothing matches.
pub fn resolve_sort_field<'a>(sort_by: &str, allowed: &[&'a str]) -> Result<&'a str, RecordError> {
    if let Some(exact) = allowed.iter().find(|f| **f == sort_by) {
        return Ok(*exact);
    }
    allowed
        .iter()
        .find(|field| {
            let segments: Vec<&str> = field.split('.').collect();
            segments[..segments.len().saturating_sub(1)].contains(&sort_by)
        })
        .copied()
        .ok_or_else(|| RecordError::InvalidSortField(sort_by.to_string()))
}

/// Order `query` by `field` (left-joining relationships as needed), or by
/// the creation timestamp descending when no field is given. The primary key
/// is appended in the same direction so ties page deterministically.
///
/// # Errors
///
/// `InvalidRelationship` or `InvalidField` for a bad sort path.
pub fn apply_sort(
    query: &mut SelectStatement,
    root: &'static EntitySchema,
    field: Option<&str>,
    order: SortOrder,
) -> Result<JoinScope, RecordError> {
    let mut scope = JoinScope::outer(root, "ord");

    let direction = match field {
        Some(path) => {
            if let Err(e) = validate_path(root, path) {
                log::warn!("rejected sort path on {}: {e}", root.table);
                return Err(e);
            }
            let column = scope.resolve(query, path)?;
            query.order_by_expr(column.expr(), order.to_order());
            order
        }
        None => {
            if root.has_column(CREATED_AT_COLUMN) {
                query.order_by((Alias::new(root.table), Alias::new(CREATED_AT_COLUMN)), Order::Desc);
            }
            SortOrder::Desc
        }
    };

    if field != Some(root.primary_key) {
        query.order_by(
            (Alias::new(root.table), Alias::new(root.primary_key)),
            direction.to_order(),
        );
    }

    Ok(scope)
}
