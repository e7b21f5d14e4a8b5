//! Field-path resolution and the per-phase alias registry.
//!
//! A field path is either a column of the root entity (`"name"`) or a column
//! reached through relationships (`"state.country_id"`). Resolution happens in
//! two steps: [`validate_path`] walks the schemas without touching the query,
//! then [`JoinScope::resolve`] adds whatever joins are missing and returns the
//! column to compare against.

use super::error::RecordError;
use crate::schema::{ColumnDef, EntitySchema, RelationDef, SOFT_DELETE_COLUMN};
use sea_query::{Alias, Condition, Expr, ExprTrait, JoinType, SelectStatement};
use std::collections::HashMap;

/// A column resolved against the root table or one of its join aliases.
#[derive(Debug, Clone)]
pub struct ResolvedColumn {
    /// Root table name, or the join alias the column lives on
    pub table: String,
    pub column: &'static ColumnDef,
}

impl ResolvedColumn {
    pub fn expr(&self) -> Expr {
        Expr::col((Alias::new(self.table.clone()), Alias::new(self.column.name)))
    }
}

/// One relationship hop of a validated path.
#[derive(Debug, Clone, Copy)]
struct Hop {
    /// Byte length of the prefix `s1..si` inside the raw path
    prefix_len: usize,
    relation: &'static RelationDef,
    target: &'static EntitySchema,
}

#[derive(Debug)]
struct ValidatedPath {
    hops: Vec<Hop>,
    column: &'static ColumnDef,
}

fn walk(root: &'static EntitySchema, path: &str) -> Result<ValidatedPath, RecordError> {
    let segments: Vec<&str> = path.split('.').collect();
    if segments.iter().any(|s| s.is_empty()) {
        return Err(RecordError::InvalidField {
            path: path.to_string(),
        });
    }

    let (terminal, relations) = match segments.split_last() {
        Some(parts) => parts,
        None => {
            return Err(RecordError::InvalidField {
                path: path.to_string(),
            })
        }
    };

    let mut current = root;
    let mut hops = Vec::with_capacity(relations.len());
    let mut prefix_len = 0;
    for (i, segment) in relations.iter().enumerate() {
        prefix_len += segment.len() + usize::from(i > 0);
        let relation = current
            .relation(segment)
            .ok_or_else(|| RecordError::InvalidRelationship {
                segment: segment.to_string(),
                path: path.to_string(),
            })?;
        let target = relation.target();
        hops.push(Hop {
            prefix_len,
            relation,
            target,
        });
        current = target;
    }

    let column = current
        .column(terminal)
        .ok_or_else(|| RecordError::InvalidField {
            path: path.to_string(),
        })?;

    Ok(ValidatedPath { hops, column })
}

/// Check a field path against the schemas without building anything.
///
/// # Errors
///
/// `InvalidRelationship` if a non-terminal segment is not a declared
/// relationship, `InvalidField` if the terminal segment is not a declared
/// column (or the path has an empty segment).
pub fn validate_path(root: &'static EntitySchema, path: &str) -> Result<(), RecordError> {
    walk(root, path).map(|_| ())
}

/// Validate every path before anything is joined, so a bad key leaves the
/// query untouched.
pub(crate) fn validate_all<'a>(
    root: &'static EntitySchema,
    paths: impl IntoIterator<Item = &'a str>,
) -> Result<(), RecordError> {
    for path in paths {
        if let Err(e) = validate_path(root, path) {
            log::warn!("rejected field path on {}: {e}", root.table);
            return Err(e);
        }
    }
    Ok(())
}

#[derive(Debug, Clone)]
struct JoinedRelation {
    alias: String,
}

/// Alias registry for one phase of a query build.
///
/// Every relationship prefix is joined at most once per scope; two paths that
/// share a prefix (`state.name`, `state.country_id`) reuse the same alias.
/// Filters use an inner-join scope, search and sort use outer-join scopes of
/// their own.
#[derive(Debug)]
pub struct JoinScope {
    root: &'static EntitySchema,
    join_type: JoinType,
    tag: &'static str,
    aliases: HashMap<String, JoinedRelation>,
}

impl JoinScope {
    /// Inner joins: the related row must exist and be live.
    pub fn inner(root: &'static EntitySchema, tag: &'static str) -> Self {
        Self::new(root, JoinType::InnerJoin, tag)
    }

    /// Left joins: the root row is kept when the related row is missing.
    pub fn outer(root: &'static EntitySchema, tag: &'static str) -> Self {
        Self::new(root, JoinType::LeftJoin, tag)
    }

    fn new(root: &'static EntitySchema, join_type: JoinType, tag: &'static str) -> Self {
        Self {
            root,
            join_type,
            tag,
            aliases: HashMap::new(),
        }
    }

    /// Number of joins this scope has added.
    pub fn join_count(&self) -> usize {
        self.aliases.len()
    }

    /// Alias registered for a relationship prefix, if it was joined.
    pub fn alias_for(&self, prefix: &str) -> Option<&str> {
        self.aliases.get(prefix).map(|j| j.alias.as_str())
    }

    fn alias_name(&self, prefix: &str) -> String {
        format!("{}_{}", self.tag, prefix.replace('.', "__"))
    }

    /// Resolve `path`, adding any joins it needs to `query`.
    ///
    /// # Errors
    ///
    /// Same as [`validate_path`]; on error the query is left unchanged.
    pub fn resolve(
        &mut self,
        query: &mut SelectStatement,
        path: &str,
    ) -> Result<ResolvedColumn, RecordError> {
        let validated = walk(self.root, path)?;

        let mut current = self.root.table.to_string();
        for hop in &validated.hops {
            let prefix = &path[..hop.prefix_len];
            if let Some(joined) = self.aliases.get(prefix) {
                current = joined.alias.clone();
                continue;
            }

            let alias = self.alias_name(prefix);
            let mut on = Condition::all().add(
                Expr::col((Alias::new(current.clone()), Alias::new(hop.relation.from_col)))
                    .equals((Alias::new(alias.clone()), Alias::new(hop.relation.to_col))),
            );
            if hop.target.has_soft_delete() {
                on = on.add(Expr::col((Alias::new(alias.clone()), Alias::new(SOFT_DELETE_COLUMN))).eq(false));
            }
            query.join_as(
                self.join_type,
                Alias::new(hop.target.table),
                Alias::new(alias.clone()),
                on,
            );

            self.aliases.insert(
                prefix.to_string(),
                JoinedRelation {
                    alias: alias.clone(),
                },
            );
            current = alias;
        }

        Ok(ResolvedColumn {
            table: current,
            column: validated.column,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CityModel, CountryModel};
    use crate::schema::Entity;
    use sea_query::{Asterisk, PostgresQueryBuilder, Query};

    fn city_select() -> SelectStatement {
        Query::select()
            .column((Alias::new("cities"), Asterisk))
            .from(Alias::new("cities"))
            .to_owned()
    }

    #[test]
    fn test_single_segment_has_no_join() {
        let mut query = city_select();
        let mut scope = JoinScope::outer(CityModel::schema(), "srch");
        let col = scope.resolve(&mut query, "name").unwrap();
        assert_eq!(col.table, "cities");
        assert_eq!(col.column.name, "name");
        assert_eq!(scope.join_count(), 0);
        assert!(!query.to_string(PostgresQueryBuilder).contains("JOIN"));
    }

    #[test]
    fn test_shared_prefix_joins_once() {
        let mut query = city_select();
        let mut scope = JoinScope::inner(CityModel::schema(), "flt");
        let a = scope.resolve(&mut query, "state.name").unwrap();
        let b = scope.resolve(&mut query, "state.country_id").unwrap();
        assert_eq!(a.table, "flt_state");
        assert_eq!(b.table, "flt_state");
        assert_eq!(scope.join_count(), 1);

        let sql = query.to_string(PostgresQueryBuilder);
        assert_eq!(sql.matches("INNER JOIN").count(), 1, "{sql}");
        assert!(sql.contains(r#"INNER JOIN "states" AS "flt_state""#), "{sql}");
        assert!(sql.contains(r#""cities"."state_id" = "flt_state"."id""#), "{sql}");
        assert!(sql.contains(r#""flt_state"."is_deleted" = FALSE"#), "{sql}");
    }

    #[test]
    fn test_two_hop_path_uses_parent_alias() {
        let mut query = city_select();
        let mut scope = JoinScope::outer(CityModel::schema(), "ord");
        let col = scope.resolve(&mut query, "state.country.name").unwrap();
        assert_eq!(col.table, "ord_state__country");
        assert_eq!(scope.alias_for("state"), Some("ord_state"));
        assert_eq!(scope.alias_for("state.country"), Some("ord_state__country"));

        let sql = query.to_string(PostgresQueryBuilder);
        assert_eq!(sql.matches("LEFT JOIN").count(), 2, "{sql}");
        assert!(
            sql.contains(r#""ord_state"."country_id" = "ord_state__country"."id""#),
            "{sql}"
        );
    }

    #[test]
    fn test_has_many_join_direction() {
        let mut query = Query::select().from(Alias::new("countries")).to_owned();
        let mut scope = JoinScope::outer(CountryModel::schema(), "srch");
        scope.resolve(&mut query, "states.code").unwrap();
        let sql = query.to_string(PostgresQueryBuilder);
        assert!(sql.contains(r#""countries"."id" = "srch_states"."country_id""#), "{sql}");
    }

    #[test]
    fn test_column_as_relationship_rejected() {
        let mut query = city_select();
        let before = query.to_string(PostgresQueryBuilder);
        let mut scope = JoinScope::inner(CityModel::schema(), "flt");
        let err = scope.resolve(&mut query, "name.code").unwrap_err();
        assert!(matches!(err, RecordError::InvalidRelationship { ref segment, .. } if segment == "name"));
        assert_eq!(query.to_string(PostgresQueryBuilder), before);
        assert_eq!(scope.join_count(), 0);
    }

    #[test]
    fn test_unknown_terminal_rejected_without_join() {
        let mut query = city_select();
        let mut scope = JoinScope::inner(CityModel::schema(), "flt");
        let err = scope.resolve(&mut query, "state.population").unwrap_err();
        assert!(matches!(err, RecordError::InvalidField { ref path } if path == "state.population"));
        assert_eq!(scope.join_count(), 0);
        assert!(!query.to_string(PostgresQueryBuilder).contains("JOIN"));
    }

    #[test]
    fn test_validate_path_rejects_empty_segments() {
        let schema = CityModel::schema();
        assert!(validate_path(schema, "").is_err());
        assert!(validate_path(schema, "state.").is_err());
        assert!(validate_path(schema, ".name").is_err());
        assert!(validate_path(schema, "state.country.code").is_ok());
    }
}
