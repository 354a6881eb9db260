use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Equality filters keyed by field name.
pub type Filters = BTreeMap<String, Value>;

/// A query filter: every `equals` entry must match, and a row whose
/// `exclude` field equals the given value is skipped.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Conditions {
    pub equals: Filters,
    pub exclude: Option<(String, Value)>,
}

impl Conditions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.equals.insert(field.into(), value.into());
        self
    }

    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        self.equals.insert(field.into(), value.into());
    }

    /// Adds filters whose keys are not already constrained.
    pub fn merge_missing(&mut self, filters: &Filters) {
        for (field, value) in filters {
            self.equals
                .entry(field.clone())
                .or_insert_with(|| value.clone());
        }
    }

    pub fn excluding(mut self, field: impl Into<String>, value: Value) -> Self {
        self.exclude = Some((field.into(), value));
        self
    }

    /// Evaluates the filter against a row. A missing column matches `null`.
    pub fn matches(&self, row: &Map<String, Value>) -> bool {
        let field_equals =
            |field: &str, value: &Value| row.get(field).unwrap_or(&Value::Null) == value;

        if !self
            .equals
            .iter()
            .all(|(field, value)| field_equals(field, value))
        {
            return false;
        }
        match &self.exclude {
            Some((field, value)) => !field_equals(field, value),
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn test_matches_all_equalities() {
        let conditions = Conditions::new().with("slug", "foo").with("namespace", "a");
        assert!(conditions.matches(&row(json!({"slug": "foo", "namespace": "a"}))));
        assert!(!conditions.matches(&row(json!({"slug": "foo", "namespace": "b"}))));
        assert!(!conditions.matches(&row(json!({"slug": "foo"}))));
    }

    #[test]
    fn test_missing_column_matches_null() {
        let conditions = Conditions::new().with("namespace", Value::Null);
        assert!(conditions.matches(&row(json!({"slug": "foo"}))));
    }

    #[test]
    fn test_exclusion() {
        let conditions = Conditions::new()
            .with("slug", "foo")
            .excluding("id", json!(1));
        assert!(!conditions.matches(&row(json!({"id": 1, "slug": "foo"}))));
        assert!(conditions.matches(&row(json!({"id": 2, "slug": "foo"}))));
    }

    #[test]
    fn test_merge_missing_keeps_existing_keys() {
        let mut conditions = Conditions::new().with("slug", "foo");
        let mut scope = Filters::new();
        scope.insert("slug".into(), json!("bar"));
        scope.insert("namespace".into(), json!("a"));
        conditions.merge_missing(&scope);
        assert_eq!(conditions.equals.get("slug"), Some(&json!("foo")));
        assert_eq!(conditions.equals.get("namespace"), Some(&json!("a")));
    }
}
