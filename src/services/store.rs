use crate::models::Conditions;
use anyhow::Result;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

/// Persistence collaborator consulted while generating slugs.
pub trait SlugStore {
    /// Whether any stored row satisfies `conditions`.
    fn exists(&self, conditions: &Conditions) -> Result<bool>;

    /// Declared width of a column, used to default the maximum slug length.
    fn column_length(&self, _field: &str) -> Result<Option<usize>> {
        Ok(None)
    }
}

impl<T: SlugStore + ?Sized> SlugStore for &T {
    fn exists(&self, conditions: &Conditions) -> Result<bool> {
        (**self).exists(conditions)
    }

    fn column_length(&self, field: &str) -> Result<Option<usize>> {
        (**self).column_length(field)
    }
}

impl<T: SlugStore + ?Sized> SlugStore for Arc<T> {
    fn exists(&self, conditions: &Conditions) -> Result<bool> {
        (**self).exists(conditions)
    }

    fn column_length(&self, field: &str) -> Result<Option<usize>> {
        (**self).column_length(field)
    }
}

/// Thread-safe in-memory rows, handy for tests and for callers that keep
/// their records outside SQLite.
#[derive(Debug, Default)]
pub struct MemoryStore {
    rows: RwLock<Vec<Map<String, Value>>>,
    column_lengths: HashMap<String, usize>,
    probes: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_column_length(mut self, field: &str, length: usize) -> Self {
        self.column_lengths.insert(field.to_string(), length);
        self
    }

    pub fn insert(&self, row: Map<String, Value>) -> Result<()> {
        self.rows
            .write()
            .map_err(|_| anyhow::anyhow!("memory store lock poisoned"))?
            .push(row);
        Ok(())
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self
            .rows
            .read()
            .map_err(|_| anyhow::anyhow!("memory store lock poisoned"))?
            .len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Rows matching `conditions`, in insertion order.
    pub fn find(&self, conditions: &Conditions) -> Result<Vec<Map<String, Value>>> {
        let rows = self
            .rows
            .read()
            .map_err(|_| anyhow::anyhow!("memory store lock poisoned"))?;
        Ok(rows
            .iter()
            .filter(|row| conditions.matches(row))
            .cloned()
            .collect())
    }

    /// Number of `exists` calls served so far.
    pub fn probes(&self) -> usize {
        self.probes.load(Ordering::Relaxed)
    }
}

impl SlugStore for MemoryStore {
    fn exists(&self, conditions: &Conditions) -> Result<bool> {
        self.probes.fetch_add(1, Ordering::Relaxed);
        let rows = self
            .rows
            .read()
            .map_err(|_| anyhow::anyhow!("memory store lock poisoned"))?;
        Ok(rows.iter().any(|row| conditions.matches(row)))
    }

    fn column_length(&self, field: &str) -> Result<Option<usize>> {
        Ok(self.column_lengths.get(field).copied())
    }
}
