//! Paged listing and single-record lookup.

use super::error::RecordError;
use super::filter::{apply_filters, FilterSet, FilterValue};
use super::path::validate_all;
use super::search::apply_search;
use super::sort::{apply_sort, SortOrder};
use super::value_conversion::with_converted_params;
use crate::executor::{DbError, RecordExecutor};
use crate::schema::{Entity, EntitySchema, SOFT_DELETE_COLUMN};
use may_postgres::Row;
use sea_query::{
    Alias, Asterisk, Condition, Expr, ExprTrait, Func, PostgresQueryBuilder, Query,
    SelectStatement, Value, Values,
};
use serde::Serialize;

/// A rendered statement with its bound values.
#[derive(Debug, Clone)]
pub struct Statement {
    pub sql: String,
    pub values: Values,
}

impl Statement {
    pub(crate) fn build(query: &SelectStatement) -> Self {
        let (sql, values) = query.build(PostgresQueryBuilder);
        Self { sql, values }
    }
}

/// Offset/limit pair. The limit must be positive; callers bound it from above.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    start: u64,
    limit: u64,
}

impl PageWindow {
    /// # Errors
    ///
    /// `InvalidPage` when `limit` is zero.
    pub fn new(start: u64, limit: u64) -> Result<Self, RecordError> {
        if limit == 0 {
            return Err(RecordError::InvalidPage("limit must be at least 1".to_string()));
        }
        Ok(Self { start, limit })
    }

    pub fn start(&self) -> u64 {
        self.start
    }

    pub fn limit(&self) -> u64 {
        self.limit
    }
}

/// Everything about a listing except the page window.
#[derive(Debug, Clone, Default)]
pub struct ListParams {
    pub filters: FilterSet,
    pub search: Option<String>,
    pub search_fields: Vec<String>,
    pub sort_by: Option<String>,
    pub order: SortOrder,
    /// Extra condition ANDed after the filters
    pub condition: Option<Condition>,
}

impl ListParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filters(mut self, filters: FilterSet) -> Self {
        self.filters = filters;
        self
    }

    pub fn filter(mut self, path: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        self.filters.insert(path, value);
        self
    }

    pub fn search<S: Into<String>>(mut self, term: impl Into<String>, fields: impl IntoIterator<Item = S>) -> Self {
        self.search = Some(term.into());
        self.search_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn sort_by(mut self, field: impl Into<String>, order: SortOrder) -> Self {
        self.sort_by = Some(field.into());
        self.order = order;
        self
    }

    pub fn condition(mut self, condition: Condition) -> Self {
        self.condition = Some(condition);
        self
    }
}

/// One page of records plus the total matching the filters and search.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub count: u64,
    pub list: Vec<T>,
}

/// The two statements `get_records` runs.
#[derive(Debug, Clone)]
pub struct RecordsPlan {
    pub page: Statement,
    pub count: Statement,
}

/// Options for [`get_record`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LookupOptions {
    /// Fail with `NotFound` instead of returning `None`
    pub exception: bool,
    /// Match soft-deleted rows too
    pub include_deleted: bool,
}

impl Default for LookupOptions {
    fn default() -> Self {
        Self {
            exception: true,
            include_deleted: false,
        }
    }
}

impl LookupOptions {
    /// Return `None` rather than failing when nothing matches.
    pub fn optional() -> Self {
        Self {
            exception: false,
            ..Self::default()
        }
    }
}

/// `SELECT "t".* FROM "t"`, restricted to live rows unless asked otherwise.
pub(crate) fn base_select(schema: &'static EntitySchema, include_deleted: bool) -> SelectStatement {
    let mut query = Query::select()
        .column((Alias::new(schema.table), Asterisk))
        .from(Alias::new(schema.table))
        .to_owned();
    if !include_deleted && schema.has_soft_delete() {
        query.cond_where(
            Expr::col((Alias::new(schema.table), Alias::new(SOFT_DELETE_COLUMN))).eq(false),
        );
    }
    query
}

pub(crate) fn fetch_rows<X: RecordExecutor + ?Sized>(
    executor: &X,
    statement: &Statement,
) -> Result<Vec<Row>, RecordError> {
    with_converted_params(&statement.values, |params| {
        executor
            .query_all(&statement.sql, params)
            .map_err(RecordError::from)
    })
}

pub(crate) fn parse_row<E: Entity>(row: &Row) -> Result<E, RecordError> {
    E::from_row(row).map_err(|e| {
        RecordError::Database(DbError::ParseError(format!("Failed to parse row: {e}")))
    })
}

fn fetch_count<X: RecordExecutor + ?Sized>(
    executor: &X,
    statement: &Statement,
) -> Result<u64, RecordError> {
    let rows = fetch_rows(executor, statement)?;
    let count = match rows.first() {
        Some(row) => row.try_get::<_, i64>(0)?,
        None => 0,
    };
    u64::try_from(count)
        .map_err(|_| RecordError::Database(DbError::Other(format!("Count cannot be negative: {count}"))))
}

/// Build the page and count statements for a listing without running them.
///
/// Filters are applied first (inner joins), then search (left joins), and the
/// count statement is captured at that point. Sort (left joins of its own) and
/// the window are applied to the page statement only. Every field path is
/// validated before the query is touched.
///
/// # Errors
///
/// Field path errors from the filters, search fields or sort field.
pub fn plan_records(
    schema: &'static EntitySchema,
    window: PageWindow,
    params: &ListParams,
) -> Result<RecordsPlan, RecordError> {
    let search_fields: Vec<&str> = params.search_fields.iter().map(String::as_str).collect();
    let searching = params
        .search
        .as_deref()
        .is_some_and(|term| !term.trim().is_empty());

    validate_all(
        schema,
        params
            .filters
            .keys()
            .chain(search_fields.iter().copied().filter(|_| searching))
            .chain(params.sort_by.as_deref()),
    )?;

    let mut query = base_select(schema, false);
    apply_filters(&mut query, schema, &params.filters)?;
    if let Some(condition) = &params.condition {
        query.cond_where(condition.clone());
    }
    if let Some(term) = params.search.as_deref() {
        apply_search(&mut query, schema, term, &search_fields)?;
    }

    let inner = Statement::build(&query);
    let count = Statement {
        sql: format!("SELECT COUNT(*) FROM ({}) AS count_subquery", inner.sql),
        values: inner.values,
    };

    apply_sort(&mut query, schema, params.sort_by.as_deref(), params.order)?;
    query.offset(window.start).limit(window.limit);

    Ok(RecordsPlan {
        page: Statement::build(&query),
        count,
    })
}

/// Fetch one page of live `E` records and the total count.
///
/// An empty match is `{count: 0, list: []}`, not an error.
///
/// # Errors
///
/// Field path errors (before any statement runs) or executor errors.
pub fn get_records<E, X>(
    executor: &X,
    window: PageWindow,
    params: &ListParams,
) -> Result<Page<E>, RecordError>
where
    E: Entity,
    X: RecordExecutor + ?Sized,
{
    let schema = E::schema();
    let plan = plan_records(schema, window, params)?;

    let list = fetch_rows(executor, &plan.page)?
        .iter()
        .map(parse_row::<E>)
        .collect::<Result<Vec<_>, _>>()?;
    let count = fetch_count(executor, &plan.count)?;

    log::debug!(
        "listed {} of {count} {} (start {}, limit {})",
        list.len(),
        schema.table,
        window.start,
        window.limit
    );
    Ok(Page { count, list })
}

/// Build the single-record lookup statement.
///
/// # Errors
///
/// `InvalidFilterKey` if any key is not a direct column of `schema`.
pub fn plan_record(
    schema: &'static EntitySchema,
    filters: &FilterSet,
    options: LookupOptions,
) -> Result<Statement, RecordError> {
    for key in filters.keys() {
        if key.contains('.') || !schema.has_column(key) {
            log::warn!("rejected lookup key {key} on {}", schema.table);
            return Err(RecordError::InvalidFilterKey {
                key: key.to_string(),
                entity: schema.name,
            });
        }
    }

    let mut query = base_select(schema, options.include_deleted);
    for (key, value) in filters.iter() {
        let column = Expr::col((Alias::new(schema.table), Alias::new(key.to_string())));
        let condition = match value {
            FilterValue::Scalar(Value::String(Some(s))) => {
                Expr::expr(Func::lower(column)).eq(s.to_lowercase())
            }
            FilterValue::Scalar(v) => column.eq(v.clone()),
            FilterValue::List(vs) => column.is_in(vs.iter().cloned()),
            FilterValue::Null => column.is_null(),
        };
        query.cond_where(condition);
    }
    query.limit(1);

    Ok(Statement::build(&query))
}

/// Fetch the first record whose direct columns match `filters`.
///
/// Text values compare case-insensitively. With `options.exception` set a
/// miss fails with `NotFound` naming the entity (`"Country not found"`);
/// otherwise it returns `None`.
///
/// # Errors
///
/// `InvalidFilterKey` before any statement runs, `NotFound`, or executor
/// errors.
pub fn get_record<E, X>(
    executor: &X,
    filters: &FilterSet,
    options: LookupOptions,
) -> Result<Option<E>, RecordError>
where
    E: Entity,
    X: RecordExecutor + ?Sized,
{
    let schema = E::schema();
    let statement = plan_record(schema, filters, options)?;

    match fetch_rows(executor, &statement)?.first() {
        Some(row) => parse_row::<E>(row).map(Some),
        None if options.exception => Err(RecordError::not_found(schema.display_name())),
        None => Ok(None),
    }
}

/// Like [`get_record`] with the default options, unwrapped.
///
/// # Errors
///
/// `NotFound` when nothing matches, plus everything [`get_record`] returns.
pub fn require_record<E, X>(executor: &X, filters: &FilterSet) -> Result<E, RecordError>
where
    E: Entity,
    X: RecordExecutor + ?Sized,
{
    get_record::<E, X>(executor, filters, LookupOptions::default())?
        .ok_or_else(|| RecordError::not_found(E::schema().display_name()))
}
