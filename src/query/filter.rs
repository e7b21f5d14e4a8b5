//! Filter sets and the inner-join filter applier.

use super::error::RecordError;
use super::path::{validate_all, JoinScope};
use crate::schema::EntitySchema;
use sea_query::{ExprTrait, SelectStatement, Value};

/// Right-hand side of one filter.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    /// Exact equality
    Scalar(Value),
    /// Membership (`IN`)
    List(Vec<Value>),
    /// `IS NULL`
    Null,
}

impl From<Value> for FilterValue {
    fn from(v: Value) -> Self {
        FilterValue::Scalar(v)
    }
}

impl From<&str> for FilterValue {
    fn from(v: &str) -> Self {
        FilterValue::Scalar(v.into())
    }
}

impl From<String> for FilterValue {
    fn from(v: String) -> Self {
        FilterValue::Scalar(v.into())
    }
}

impl From<&String> for FilterValue {
    fn from(v: &String) -> Self {
        FilterValue::Scalar(v.as_str().into())
    }
}

impl From<bool> for FilterValue {
    fn from(v: bool) -> Self {
        FilterValue::Scalar(v.into())
    }
}

impl From<i32> for FilterValue {
    fn from(v: i32) -> Self {
        FilterValue::Scalar(v.into())
    }
}

impl From<i64> for FilterValue {
    fn from(v: i64) -> Self {
        FilterValue::Scalar(v.into())
    }
}

impl From<Vec<Value>> for FilterValue {
    fn from(v: Vec<Value>) -> Self {
        FilterValue::List(v)
    }
}

impl From<Vec<&str>> for FilterValue {
    fn from(v: Vec<&str>) -> Self {
        FilterValue::List(v.into_iter().map(Value::from).collect())
    }
}

impl From<Vec<String>> for FilterValue {
    fn from(v: Vec<String>) -> Self {
        FilterValue::List(v.into_iter().map(Value::from).collect())
    }
}

fn json_scalar(v: serde_json::Value) -> Value {
    match v {
        serde_json::Value::Null => Value::String(None),
        serde_json::Value::Bool(b) => b.into(),
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(i) => i.into(),
            None => n.as_f64().unwrap_or_default().into(),
        },
        serde_json::Value::String(s) => s.into(),
        other => other.to_string().into(),
    }
}

/// Request payloads arrive as JSON: arrays become `IN`, `null` becomes
/// `IS NULL`, everything else is an equality.
impl From<serde_json::Value> for FilterValue {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => FilterValue::Null,
            serde_json::Value::Array(items) => {
                FilterValue::List(items.into_iter().map(json_scalar).collect())
            }
            other => FilterValue::Scalar(json_scalar(other)),
        }
    }
}

/// Ordered mapping from field path to value. All entries are ANDed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterSet {
    entries: Vec<(String, FilterValue)>,
}

impl FilterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a filter, replacing any earlier value for the same path.
    pub fn insert(&mut self, path: impl Into<String>, value: impl Into<FilterValue>) {
        let path = path.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(p, _)| *p == path) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((path, value)),
        }
    }

    pub fn with(mut self, path: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        self.insert(path, value);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FilterValue)> {
        self.entries.iter().map(|(p, v)| (p.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(p, _)| p.as_str())
    }
}

impl<K: Into<String>, V: Into<FilterValue>> FromIterator<(K, V)> for FilterSet {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut set = FilterSet::new();
        for (k, v) in iter {
            set.insert(k, v);
        }
        set
    }
}

/// AND every filter onto `query`, joining relationships with inner joins.
///
/// All keys are validated first; an invalid key fails the call before any
/// join or condition is added. Returns the scope holding the joins it made.
///
/// # Errors
///
/// `InvalidRelationship` or `InvalidField` for the first bad key.
pub fn apply_filters(
    query: &mut SelectStatement,
    root: &'static EntitySchema,
    filters: &FilterSet,
) -> Result<JoinScope, RecordError> {
    validate_all(root, filters.keys())?;

    let mut scope = JoinScope::inner(root, "flt");
    for (path, value) in filters.iter() {
        let column = scope.resolve(query, path)?;
        let expr = column.expr();
        let condition = match value {
            FilterValue::Scalar(v) => expr.eq(v.clone()),
            FilterValue::List(vs) => expr.is_in(vs.iter().cloned()),
            FilterValue::Null => expr.is_null(),
        };
        query.cond_where(condition);
    }

    Ok(scope)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CityModel;
    use crate::schema::Entity;
    use sea_query::{Alias, Asterisk, PostgresQueryBuilder, Query};

    fn city_select() -> SelectStatement {
        Query::select()
            .column((Alias::new("cities"), Asterisk))
            .from(Alias::new("cities"))
            .to_owned()
    }

    #[test]
    fn test_scalar_and_list_filters() {
        let mut query = city_select();
        let filters = FilterSet::new()
            .with("name", "Springfield")
            .with("state_id", vec!["a", "b"]);
        let scope = apply_filters(&mut query, CityModel::schema(), &filters).unwrap();
        assert_eq!(scope.join_count(), 0);

        let sql = query.to_string(PostgresQueryBuilder);
        assert!(sql.contains(r#""cities"."name" = 'Springfield'"#), "{sql}");
        assert!(sql.contains(r#""cities"."state_id" IN ('a', 'b')"#), "{sql}");
        assert!(sql.contains(" AND "), "{sql}");
    }

    #[test]
    fn test_relationship_filter_uses_inner_join() {
        let mut query = city_select();
        let filters = FilterSet::new()
            .with("state.country_id", "c-1")
            .with("state.code", "CA");
        let scope = apply_filters(&mut query, CityModel::schema(), &filters).unwrap();
        assert_eq!(scope.join_count(), 1);

        let sql = query.to_string(PostgresQueryBuilder);
        assert_eq!(sql.matches("JOIN").count(), 1, "{sql}");
        assert!(sql.contains("INNER JOIN"), "{sql}");
        assert!(sql.contains(r#""flt_state"."country_id" = 'c-1'"#), "{sql}");
        assert!(sql.contains(r#""flt_state"."code" = 'CA'"#), "{sql}");
    }

    #[test]
    fn test_invalid_key_leaves_query_untouched() {
        let mut query = city_select();
        let before = query.to_string(PostgresQueryBuilder);
        let filters = FilterSet::new()
            .with("state.country_id", "c-1")
            .with("population", 5);
        let err = apply_filters(&mut query, CityModel::schema(), &filters).unwrap_err();
        assert!(err.is_invalid_path());
        assert_eq!(query.to_string(PostgresQueryBuilder), before);
    }

    #[test]
    fn test_null_filter() {
        let mut query = city_select();
        let filters: FilterSet = [("state_id", serde_json::Value::Null)].into_iter().collect();
        apply_filters(&mut query, CityModel::schema(), &filters).unwrap();
        let sql = query.to_string(PostgresQueryBuilder);
        assert!(sql.contains(r#""cities"."state_id" IS NULL"#), "{sql}");
    }

    #[test]
    fn test_json_values() {
        assert_eq!(
            FilterValue::from(serde_json::json!(["x", 2])),
            FilterValue::List(vec![Value::from("x"), Value::from(2i64)])
        );
        assert_eq!(
            FilterValue::from(serde_json::json!(false)),
            FilterValue::Scalar(Value::from(false))
        );
    }

    #[test]
    fn test_insert_replaces_existing_key() {
        let mut filters = FilterSet::new();
        filters.insert("name", "a");
        filters.insert("name", "b");
        assert_eq!(filters.len(), 1);
        assert_eq!(filters.iter().next(), Some(("name", &FilterValue::from("b"))));
    }
}
