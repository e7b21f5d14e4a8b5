//! Case-insensitive substring search across field paths.

use super::error::RecordError;
use super::path::{validate_all, JoinScope};
use crate::schema::EntitySchema;
use sea_query::{Alias, Condition, Expr, ExprTrait, Func, SelectStatement};

/// `%term%` in lower case. `%` and `_` inside the term are not escaped and
/// keep their wildcard meaning.
pub fn search_pattern(term: &str) -> String {
    format!("%{}%", term.trim().to_lowercase())
}

/// OR a `lower(column) LIKE '%term%'` condition for every field onto `query`.
///
/// A term that is empty after trimming, or an empty field list, leaves the
/// query unchanged and returns `None`. Non-text columns are cast to text
/// before comparison. Relationships are left-joined in a scope of their own.
///
/// # Errors
///
/// `InvalidRelationship` or `InvalidField` for the first bad field; nothing
/// is added to the query in that case.
pub fn apply_search(
    query: &mut SelectStatement,
    root: &'static EntitySchema,
    term: &str,
    fields: &[&str],
) -> Result<Option<JoinScope>, RecordError> {
    let term = term.trim();
    if term.is_empty() || fields.is_empty() {
        return Ok(None);
    }

    validate_all(root, fields.iter().copied())?;

    let pattern = search_pattern(term);
    let mut scope = JoinScope::outer(root, "srch");
    let mut any = Condition::any();
    for field in fields {
        let column = scope.resolve(query, field)?;
        let target = if column.column.kind.is_textual() {
            column.expr()
        } else {
            column.expr().cast_as(Alias::new("text"))
        };
        any = any.add(Expr::expr(Func::lower(target)).like(pattern.clone()));
    }
    query.cond_where(any);

    Ok(Some(scope))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CityModel, CountryModel};
    use crate::schema::Entity;
    use sea_query::{Asterisk, PostgresQueryBuilder, Query};

    fn select(table: &'static str) -> SelectStatement {
        Query::select()
            .column((Alias::new(table), Asterisk))
            .from(Alias::new(table))
            .to_owned()
    }

    #[test]
    fn test_blank_term_is_noop() {
        let mut query = select("countries");
        let before = query.to_string(PostgresQueryBuilder);
        let scope = apply_search(&mut query, CountryModel::schema(), "   ", &["name"]).unwrap();
        assert!(scope.is_none());
        assert_eq!(query.to_string(PostgresQueryBuilder), before);
    }

    #[test]
    fn test_fields_are_or_combined() {
        let mut query = select("countries");
        apply_search(&mut query, CountryModel::schema(), " Ind ", &["name", "code"]).unwrap();
        let sql = query.to_string(PostgresQueryBuilder);
        assert!(sql.contains(r#"LOWER("countries"."name") LIKE '%ind%'"#), "{sql}");
        assert!(sql.contains(r#"LOWER("countries"."code") LIKE '%ind%'"#), "{sql}");
        assert!(sql.contains(" OR "), "{sql}");
    }

    #[test]
    fn test_non_text_column_is_cast() {
        let mut query = select("countries");
        apply_search(&mut query, CountryModel::schema(), "2024", &["created_at"]).unwrap();
        let sql = query.to_string(PostgresQueryBuilder);
        assert!(sql.contains(r#"CAST("countries"."created_at" AS text)"#), "{sql}");
    }

    #[test]
    fn test_related_field_uses_left_join() {
        let mut query = select("cities");
        let scope = apply_search(&mut query, CityModel::schema(), "cal", &["name", "state.name"])
            .unwrap()
            .unwrap();
        assert_eq!(scope.join_count(), 1);
        let sql = query.to_string(PostgresQueryBuilder);
        assert!(sql.contains(r#"LEFT JOIN "states" AS "srch_state""#), "{sql}");
        assert!(sql.contains(r#"LOWER("srch_state"."name") LIKE '%cal%'"#), "{sql}");
    }

    #[test]
    fn test_wildcards_pass_through() {
        assert_eq!(search_pattern("50%_OFF"), "%50%_off%");
    }

    #[test]
    fn test_invalid_field_rejected_before_join() {
        let mut query = select("cities");
        let err = apply_search(&mut query, CityModel::schema(), "x", &["state.name", "mayor"]).unwrap_err();
        assert!(matches!(err, RecordError::InvalidField { .. }));
        assert!(!query.to_string(PostgresQueryBuilder).contains("JOIN"));
    }
}
