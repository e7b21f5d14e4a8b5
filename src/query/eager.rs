//! Batched loading of related records.
//!
//! After a page of children is fetched, their parents are loaded with one
//! `IN` query instead of one lookup per row:
//!
//! 1. collect the distinct foreign key values from the page
//! 2. `SELECT "parent".* FROM "parent" WHERE "parent"."id" IN (...)`
//! 3. index the parents by primary key

use super::error::RecordError;
use super::records::{base_select, fetch_rows, parse_row, Statement};
use crate::executor::RecordExecutor;
use crate::schema::Entity;
use sea_query::{Alias, Expr, ExprTrait, Value};
use std::collections::{BTreeSet, HashMap};

/// Load every `E` whose primary key is in `ids`, keyed by id.
///
/// Soft-deleted parents are included: a relationship still points at them.
/// An empty id list issues no query.
///
/// # Errors
///
/// Executor or row parsing errors.
pub fn load_by_ids<'a, E, X>(
    executor: &X,
    ids: impl IntoIterator<Item = &'a str>,
) -> Result<HashMap<String, E>, RecordError>
where
    E: Entity,
    X: RecordExecutor + ?Sized,
{
    let unique: BTreeSet<&str> = ids.into_iter().collect();
    if unique.is_empty() {
        return Ok(HashMap::new());
    }

    let schema = E::schema();
    let mut query = base_select(schema, true);
    query.cond_where(
        Expr::col((Alias::new(schema.table), Alias::new(schema.primary_key)))
            .is_in(unique.into_iter().map(Value::from)),
    );

    fetch_rows(executor, &Statement::build(&query))?
        .iter()
        .map(|row| parse_row::<E>(row).map(|record| (record.id().to_string(), record)))
        .collect()
}
