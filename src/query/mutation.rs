//! Create, update and soft delete, plus the live-child check.

use super::error::RecordError;
use super::records::{fetch_rows, parse_row, Statement};
use crate::executor::{DbError, RecordExecutor};
use crate::schema::{
    Entity, EntitySchema, RecordInput, RelationType, CREATED_AT_COLUMN, SOFT_DELETE_COLUMN,
    UPDATED_AT_COLUMN,
};
use chrono::{NaiveDateTime, Utc};
use sea_query::{Alias, Condition, Expr, ExprTrait, PostgresQueryBuilder, Query, Value};
use uuid::Uuid;

fn now() -> NaiveDateTime {
    Utc::now().naive_utc()
}

fn checked_columns(
    schema: &'static EntitySchema,
    input: &impl RecordInput,
) -> Result<Vec<(&'static str, Value)>, RecordError> {
    let values = input.column_values();
    for (column, _) in &values {
        if !schema.has_column(column) || *column == schema.primary_key {
            return Err(RecordError::InvalidField {
                path: column.to_string(),
            });
        }
    }
    Ok(values)
}

fn run_returning<E, X>(executor: &X, sql: String, values: sea_query::Values) -> Result<Option<E>, RecordError>
where
    E: Entity,
    X: RecordExecutor + ?Sized,
{
    let statement = Statement { sql, values };
    match fetch_rows(executor, &statement)?.first() {
        Some(row) => parse_row::<E>(row).map(Some),
        None => Ok(None),
    }
}

/// Render the `INSERT ... RETURNING *` for a new record with id `id`.
///
/// # Errors
///
/// `InvalidField` if the input names a column the entity does not declare.
pub fn plan_create(
    schema: &'static EntitySchema,
    id: &str,
    input: &impl RecordInput,
) -> Result<Statement, RecordError> {
    let fields = checked_columns(schema, input)?;
    let stamp = now();

    let mut columns = vec![Alias::new(schema.primary_key)];
    let mut values: Vec<Expr> = vec![Expr::val(id.to_string())];
    for (column, value) in fields {
        columns.push(Alias::new(column));
        values.push(Expr::val(value));
    }
    for timestamp in [CREATED_AT_COLUMN, UPDATED_AT_COLUMN] {
        if schema.has_column(timestamp) {
            columns.push(Alias::new(timestamp));
            values.push(Expr::val(stamp));
        }
    }
    if schema.has_soft_delete() {
        columns.push(Alias::new(SOFT_DELETE_COLUMN));
        values.push(Expr::val(false));
    }

    let mut insert = Query::insert();
    insert.into_table(Alias::new(schema.table)).columns(columns);
    insert
        .values(values)
        .map_err(|e| RecordError::Database(DbError::QueryError(e.to_string())))?;
    insert.returning_all();

    let (sql, values) = insert.build(PostgresQueryBuilder);
    Ok(Statement { sql, values })
}

/// Persist a new record with a fresh UUID v4 id and return it.
///
/// # Errors
///
/// `InvalidField` for undeclared input columns, or executor errors.
pub fn create_record<E, X>(executor: &X, input: &impl RecordInput) -> Result<E, RecordError>
where
    E: Entity,
    X: RecordExecutor + ?Sized,
{
    let schema = E::schema();
    let id = Uuid::new_v4().to_string();
    let statement = plan_create(schema, &id, input)?;

    let created = run_returning::<E, X>(executor, statement.sql, statement.values)?;
    log::debug!("created {} {id}", schema.table);
    created.ok_or_else(|| {
        RecordError::Database(DbError::QueryError(format!(
            "INSERT into {} returned no row",
            schema.table
        )))
    })
}

/// Render the `UPDATE ... RETURNING *` that overwrites a live record.
///
/// # Errors
///
/// `InvalidField` if the input names a column the entity does not declare.
pub fn plan_update(
    schema: &'static EntitySchema,
    id: &str,
    input: &impl RecordInput,
) -> Result<Statement, RecordError> {
    plan_update_if(schema, id, input, None)
}

/// [`plan_update`] with an extra guard on the row.
///
/// # Errors
///
/// `InvalidField` if the input names a column the entity does not declare.
pub fn plan_update_if(
    schema: &'static EntitySchema,
    id: &str,
    input: &impl RecordInput,
    guard: Option<Condition>,
) -> Result<Statement, RecordError> {
    let fields = checked_columns(schema, input)?;

    let mut update = Query::update();
    update.table(Alias::new(schema.table));
    for (column, value) in fields {
        update.value(Alias::new(column), Expr::val(value));
    }
    if let Some(guard) = guard {
        update.cond_where(guard);
    }
    live_row_by_id(&mut update, schema, id);

    let (sql, values) = update.build(PostgresQueryBuilder);
    Ok(Statement { sql, values })
}

fn live_row_by_id(update: &mut sea_query::UpdateStatement, schema: &'static EntitySchema, id: &str) {
    if schema.has_column(UPDATED_AT_COLUMN) {
        update.value(Alias::new(UPDATED_AT_COLUMN), Expr::val(now()));
    }
    update.cond_where(Expr::col(Alias::new(schema.primary_key)).eq(id.to_string()));
    if schema.has_soft_delete() {
        update.cond_where(Expr::col(Alias::new(SOFT_DELETE_COLUMN)).eq(false));
    }
    update.returning_all();
}

/// Overwrite every input column on the live record `id` and refresh its
/// update timestamp.
///
/// # Errors
///
/// `NotFound` if no live record has that id, `InvalidField`, or executor
/// errors.
pub fn update_record<E, X>(executor: &X, id: &str, input: &impl RecordInput) -> Result<E, RecordError>
where
    E: Entity,
    X: RecordExecutor + ?Sized,
{
    let schema = E::schema();
    let statement = plan_update(schema, id, input)?;
    run_returning::<E, X>(executor, statement.sql, statement.values)?
        .ok_or_else(|| RecordError::not_found(schema.display_name()))
}

/// Like [`update_record`], but only when the live row also satisfies
/// `guard`; checked and written in one statement.
///
/// # Errors
///
/// `NotFound` if no live record with that id satisfies the guard,
/// `InvalidField`, or executor errors.
pub fn update_record_if<E, X>(
    executor: &X,
    id: &str,
    input: &impl RecordInput,
    guard: Condition,
) -> Result<E, RecordError>
where
    E: Entity,
    X: RecordExecutor + ?Sized,
{
    let schema = E::schema();
    let statement = plan_update_if(schema, id, input, Some(guard))?;
    run_returning::<E, X>(executor, statement.sql, statement.values)?
        .ok_or_else(|| RecordError::not_found(schema.display_name()))
}

/// Render the soft-delete `UPDATE`.
///
/// # Errors
///
/// `InvalidField` if the entity has no soft-delete column.
pub fn plan_delete(schema: &'static EntitySchema, id: &str) -> Result<Statement, RecordError> {
    if !schema.has_soft_delete() {
        return Err(RecordError::InvalidField {
            path: SOFT_DELETE_COLUMN.to_string(),
        });
    }

    let mut update = Query::update();
    update
        .table(Alias::new(schema.table))
        .value(Alias::new(SOFT_DELETE_COLUMN), Expr::val(true));
    live_row_by_id(&mut update, schema, id);

    let (sql, values) = update.build(PostgresQueryBuilder);
    Ok(Statement { sql, values })
}

/// Soft-delete the live record `id` and return it as stored.
///
/// # Errors
///
/// `NotFound` if no live record has that id, or executor errors.
pub fn delete_record<E, X>(executor: &X, id: &str) -> Result<E, RecordError>
where
    E: Entity,
    X: RecordExecutor + ?Sized,
{
    let schema = E::schema();
    let statement = plan_delete(schema, id)?;
    let deleted = run_returning::<E, X>(executor, statement.sql, statement.values)?
        .ok_or_else(|| RecordError::not_found(schema.display_name()))?;
    log::debug!("soft-deleted {} {id}", schema.table);
    Ok(deleted)
}

/// Whether any live row in a one-to-many relation still points at the live
/// record `id`.
///
/// Relations named in `exclude` are skipped.
///
/// # Errors
///
/// `NotFound` if no live record has that id, or executor errors.
pub fn has_live_children<X: RecordExecutor + ?Sized>(
    executor: &X,
    schema: &'static EntitySchema,
    id: &str,
    exclude: &[&str],
) -> Result<bool, RecordError> {
    let mut parent = Query::select()
        .expr(Expr::val(1))
        .from(Alias::new(schema.table))
        .cond_where(Expr::col(Alias::new(schema.primary_key)).eq(id.to_string()))
        .limit(1)
        .to_owned();
    if schema.has_soft_delete() {
        parent.cond_where(Expr::col(Alias::new(SOFT_DELETE_COLUMN)).eq(false));
    }
    if fetch_rows(executor, &Statement::build(&parent))?.is_empty() {
        return Err(RecordError::not_found(schema.display_name()));
    }

    for relation in schema.relations {
        if relation.rel_type != RelationType::HasMany || exclude.contains(&relation.name) {
            continue;
        }
        let child = relation.target();

        let key = Query::select()
            .column(Alias::new(relation.from_col))
            .from(Alias::new(schema.table))
            .cond_where(Expr::col(Alias::new(schema.primary_key)).eq(id.to_string()))
            .to_owned();
        let mut child_rows = Query::select()
            .expr(Expr::val(1))
            .from(Alias::new(child.table))
            .cond_where(Expr::col((Alias::new(child.table), Alias::new(relation.to_col))).in_subquery(key))
            .limit(1)
            .to_owned();
        if child.has_soft_delete() {
            child_rows.cond_where(Expr::col((Alias::new(child.table), Alias::new(SOFT_DELETE_COLUMN))).eq(false));
        }

        if !fetch_rows(executor, &Statement::build(&child_rows))?.is_empty() {
            log::debug!("{} {id} has live {}", schema.table, relation.name);
            return Ok(true);
        }
    }
    Ok(false)
}
