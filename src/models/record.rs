use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};

/// The narrow view of a persisted row that slug generation needs.
///
/// Paths are dot-separated so a source field can reach into a related
/// record, e.g. `author.name`.
pub trait Record {
    fn get(&self, path: &str) -> Option<&Value>;
    fn set(&mut self, path: &str, value: Value);
    fn is_new(&self) -> bool;
    fn is_dirty(&self, field: &str) -> bool;
    fn has_error(&self, field: &str) -> bool;
}

/// In-memory record with dirty tracking and per-field validation errors.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Entity {
    fields: Map<String, Value>,
    dirty: BTreeSet<String>,
    errors: BTreeMap<String, Vec<String>>,
    new: bool,
}

impl Entity {
    /// A record that has not been saved yet. Every given field starts dirty.
    pub fn new(value: Value) -> Self {
        let fields = match value {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        let dirty = fields.keys().cloned().collect();
        Self {
            fields,
            dirty,
            errors: BTreeMap::new(),
            new: true,
        }
    }

    /// A record loaded from storage: clean and not new.
    pub fn persisted(fields: Map<String, Value>) -> Self {
        Self {
            fields,
            dirty: BTreeSet::new(),
            errors: BTreeMap::new(),
            new: false,
        }
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn dirty_fields(&self) -> impl Iterator<Item = &str> {
        self.dirty.iter().map(String::as_str)
    }

    /// Text form of a field, `None` when missing or null.
    pub fn get_str(&self, path: &str) -> Option<String> {
        self.get(path).and_then(value_to_text)
    }

    pub fn unset(&mut self, field: &str) {
        if self.fields.remove(field).is_some() {
            self.dirty.insert(field.to_string());
        }
    }

    pub fn set_error(&mut self, field: &str, message: impl Into<String>) {
        self.errors
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn errors(&self, field: &str) -> &[String] {
        self.errors.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Called by the storage layer once a write went through.
    pub fn mark_persisted(&mut self, primary_key: &str, id: Value) {
        self.fields.insert(primary_key.to_string(), id);
        self.dirty.clear();
        self.new = false;
    }
}

impl Record for Entity {
    fn get(&self, path: &str) -> Option<&Value> {
        let mut parts = path.split('.');
        let first = parts.next()?;
        let mut current = self.fields.get(first)?;
        for part in parts {
            current = match current {
                Value::Object(map) => map.get(part)?,
                Value::Array(items) => items.get(part.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(current)
    }

    fn set(&mut self, path: &str, value: Value) {
        let mut parts: Vec<&str> = path.split('.').collect();
        let Some(last) = parts.pop() else {
            return;
        };
        let root = parts.first().copied().unwrap_or(last).to_string();

        let mut target = &mut self.fields;
        for part in parts {
            let slot = target
                .entry(part.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !slot.is_object() {
                *slot = Value::Object(Map::new());
            }
            let Value::Object(map) = slot else {
                return;
            };
            target = map;
        }
        target.insert(last.to_string(), value);
        self.dirty.insert(root);
    }

    fn is_new(&self) -> bool {
        self.new
    }

    fn is_dirty(&self, field: &str) -> bool {
        self.dirty.contains(field)
    }

    fn has_error(&self, field: &str) -> bool {
        self.errors.get(field).is_some_and(|e| !e.is_empty())
    }
}

/// Converts a scalar attribute to the text a slug is built from.
///
/// Empty strings, `false`, nulls and composite values yield `None`; numbers
/// are always kept, including zero.
pub fn value_to_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(true) => Some("1".to_string()),
        _ => None,
    }
}
