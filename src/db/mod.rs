use crate::models::{Conditions, Entity, Record};
use crate::services::sluggable::{SlugTransition, Sluggable};
use crate::services::store::SlugStore;
use anyhow::{bail, Result};
use once_cell::sync::Lazy;
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use regex::Regex;
use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::{Connection, ErrorCode, OpenFlags};
use serde_json::{Map, Number, Value};
use std::path::Path;

pub type DbPool = Pool<SqliteConnectionManager>;

/// Attempts `SqliteTable::save` makes when a concurrent writer takes the
/// slug between the existence probe and the insert.
pub const MAX_SAVE_ATTEMPTS: usize = 3;

static IDENTIFIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid regex"));
static COLUMN_WIDTH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\(\s*(\d+)\s*\)").expect("valid regex"));

pub struct Database {
    pool: DbPool,
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self { pool: self.pool.clone() }
    }
}

impl Database {
    pub fn open(path: &str, pool_size: u32) -> Result<Self> {
        let path = Path::new(path);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let manager = SqliteConnectionManager::file(path);
        let pool = Pool::builder().max_size(pool_size).build(manager)?;

        let conn = pool.get()?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;

        Ok(Self { pool })
    }

    /// Named in-memory database shared by every pooled connection.
    pub fn open_memory(name: &str) -> Result<Self> {
        let uri = format!("file:{}?mode=memory&cache=shared", name);
        let manager = SqliteConnectionManager::file(uri).with_flags(
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_URI,
        );
        let pool = Pool::builder().max_size(4).build(manager)?;

        let conn = pool.get()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;

        Ok(Self { pool })
    }

    pub fn get(&self) -> Result<r2d2::PooledConnection<SqliteConnectionManager>> {
        Ok(self.pool.get()?)
    }

    /// Runs each schema statement; statements are expected to be idempotent
    /// (`CREATE TABLE IF NOT EXISTS ...`).
    pub fn migrate(&self, statements: &[&str]) -> Result<()> {
        let conn = self.get()?;
        for sql in statements {
            tracing::info!("Running schema statement: {}", first_line(sql));
            conn.execute_batch(sql)?;
        }
        Ok(())
    }
}

fn first_line(sql: &str) -> &str {
    sql.trim().lines().next().unwrap_or_default()
}

/// Table gateway for one slugged table.
#[derive(Clone)]
pub struct SqliteTable {
    db: Database,
    name: String,
    primary_key: String,
}

impl SqliteTable {
    pub fn new(db: Database, name: &str, primary_key: &str) -> Result<Self> {
        ensure_identifier(name)?;
        ensure_identifier(primary_key)?;
        Ok(Self {
            db,
            name: name.to_string(),
            primary_key: primary_key.to_string(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn primary_key(&self) -> &str {
        &self.primary_key
    }

    /// Rows matching `conditions`, ordered by primary key.
    pub fn find(&self, conditions: &Conditions) -> Result<Vec<Entity>> {
        let (clause, params) = where_clause(conditions)?;
        let sql = format!(
            "SELECT * FROM \"{}\" WHERE {} ORDER BY \"{}\"",
            self.name, clause, self.primary_key
        );

        let conn = self.db.get()?;
        let mut stmt = conn.prepare(&sql)?;
        let columns: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();
        let rows = stmt
            .query_map(rusqlite::params_from_iter(params.iter()), |row| {
                let mut fields = Map::new();
                for (i, column) in columns.iter().enumerate() {
                    fields.insert(column.clone(), from_sql(row.get_ref(i)?));
                }
                Ok(Entity::persisted(fields))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn load(&self, id: &Value) -> Result<Option<Entity>> {
        let conditions = Conditions::new().with(self.primary_key.clone(), id.clone());
        Ok(self.find(&conditions)?.into_iter().next())
    }

    /// Inserts a new record and marks it persisted with its row id.
    pub fn insert(&self, entity: &mut Entity) -> Result<i64> {
        let mut columns = Vec::new();
        let mut values = Vec::new();
        for (column, value) in entity.fields() {
            if column == &self.primary_key && value.is_null() {
                continue;
            }
            ensure_identifier(column)?;
            columns.push(format!("\"{}\"", column));
            values.push(column_value(&self.name, column, value)?);
        }

        let conn = self.db.get()?;
        if columns.is_empty() {
            conn.execute(&format!("INSERT INTO \"{}\" DEFAULT VALUES", self.name), [])?;
        } else {
            let placeholders = vec!["?"; columns.len()].join(", ");
            let sql = format!(
                "INSERT INTO \"{}\" ({}) VALUES ({})",
                self.name,
                columns.join(", "),
                placeholders
            );
            conn.execute(&sql, rusqlite::params_from_iter(values.iter()))?;
        }

        let id = conn.last_insert_rowid();
        let key = entity
            .get(&self.primary_key)
            .filter(|v| !v.is_null())
            .cloned()
            .unwrap_or_else(|| Value::from(id));
        entity.mark_persisted(&self.primary_key, key);
        Ok(id)
    }

    /// Writes the dirty fields of a persisted record.
    pub fn update(&self, entity: &mut Entity) -> Result<usize> {
        let Some(id) = entity.get(&self.primary_key).filter(|v| !v.is_null()).cloned() else {
            bail!("cannot update a {} row without a primary key", self.name);
        };

        let mut assignments = Vec::new();
        let mut values = Vec::new();
        for column in entity.dirty_fields() {
            ensure_identifier(column)?;
            assignments.push(format!("\"{}\" = ?", column));
            values.push(match entity.get(column) {
                Some(value) => column_value(&self.name, column, value)?,
                None => SqlValue::Null,
            });
        }
        if assignments.is_empty() {
            return Ok(0);
        }
        values.push(to_sql(&id));

        let sql = format!(
            "UPDATE \"{}\" SET {} WHERE \"{}\" = ?",
            self.name,
            assignments.join(", "),
            self.primary_key
        );
        let conn = self.db.get()?;
        let changed = conn.execute(&sql, rusqlite::params_from_iter(values.iter()))?;
        entity.mark_persisted(&self.primary_key, id);
        Ok(changed)
    }

    /// Generates the slug and persists the record. When a UNIQUE constraint
    /// rejects the write because another writer took the slug in between,
    /// the record is restored and the whole sequence runs again. A failed
    /// save always leaves the record as it was passed in.
    pub fn save<S: SlugStore>(
        &self,
        sluggable: &Sluggable<S>,
        entity: &mut Entity,
    ) -> Result<SlugTransition> {
        let mut attempt = 1;
        loop {
            let snapshot = entity.clone();
            let transition = sluggable.before_save(entity)?;

            let written = if entity.is_new() {
                self.insert(entity).map(|_| ())
            } else {
                self.update(entity).map(|_| ())
            };

            match written {
                Ok(()) => return Ok(transition),
                Err(e) if attempt < MAX_SAVE_ATTEMPTS && is_unique_violation(&e) => {
                    tracing::warn!(
                        "Slug write on {} hit a UNIQUE constraint (attempt {}), resolving again: {}",
                        self.name,
                        attempt,
                        e
                    );
                    *entity = snapshot;
                    attempt += 1;
                }
                Err(e) => {
                    *entity = snapshot;
                    return Err(e);
                }
            }
        }
    }
}

impl SlugStore for SqliteTable {
    fn exists(&self, conditions: &Conditions) -> Result<bool> {
        let (clause, params) = where_clause(conditions)?;
        let sql = format!(
            "SELECT EXISTS(SELECT 1 FROM \"{}\" WHERE {})",
            self.name, clause
        );
        let conn = self.db.get()?;
        let found: bool =
            conn.query_row(&sql, rusqlite::params_from_iter(params.iter()), |row| row.get(0))?;
        Ok(found)
    }

    fn column_length(&self, field: &str) -> Result<Option<usize>> {
        let conn = self.db.get()?;
        column_width(&conn, &self.name, field)
    }
}

fn column_width(conn: &Connection, table: &str, column: &str) -> Result<Option<usize>> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info(\"{}\")", table))?;
    let declared = stmt
        .query_map([], |row| Ok((row.get::<_, String>(1)?, row.get::<_, String>(2)?)))?
        .collect::<Result<Vec<_>, _>>()?
        .into_iter()
        .find(|(name, _)| name == column)
        .map(|(_, declared_type)| declared_type);

    Ok(declared.and_then(|declared_type| {
        COLUMN_WIDTH
            .captures(&declared_type)
            .and_then(|c| c[1].parse().ok())
    }))
}

fn ensure_identifier(name: &str) -> Result<()> {
    if !IDENTIFIER.is_match(name) {
        bail!("Invalid SQL identifier '{}'", name);
    }
    Ok(())
}

fn where_clause(conditions: &Conditions) -> Result<(String, Vec<SqlValue>)> {
    let mut parts = Vec::new();
    let mut params = Vec::new();

    for (field, value) in &conditions.equals {
        ensure_identifier(field)?;
        if value.is_null() {
            parts.push(format!("\"{}\" IS NULL", field));
        } else {
            parts.push(format!("\"{}\" = ?", field));
            params.push(to_sql(value));
        }
    }

    if let Some((field, value)) = &conditions.exclude {
        ensure_identifier(field)?;
        if value.is_null() {
            parts.push(format!("\"{}\" IS NOT NULL", field));
        } else {
            parts.push(format!("\"{}\" IS NOT ?", field));
            params.push(to_sql(value));
        }
    }

    if parts.is_empty() {
        return Ok(("1=1".to_string(), params));
    }
    Ok((parts.join(" AND "), params))
}

fn to_sql(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
        Value::Number(n) => match n.as_i64() {
            Some(i) => SqlValue::Integer(i),
            None => SqlValue::Real(n.as_f64().unwrap_or_default()),
        },
        Value::String(s) => SqlValue::Text(s.clone()),
        other => SqlValue::Text(other.to_string()),
    }
}

/// Only scalars map onto a column; nested values (related records reached
/// through dotted paths) are rejected.
fn column_value(table: &str, column: &str, value: &Value) -> Result<SqlValue> {
    if value.is_object() || value.is_array() {
        bail!(
            "Field '{}' holds a nested value and cannot be written to table '{}'",
            column,
            table
        );
    }
    Ok(to_sql(value))
}

fn from_sql(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null),
        ValueRef::Text(t) | ValueRef::Blob(t) => {
            Value::String(String::from_utf8_lossy(t).into_owned())
        }
    }
}

fn is_unique_violation(err: &anyhow::Error) -> bool {
    matches!(
        err.downcast_ref::<rusqlite::Error>(),
        Some(rusqlite::Error::SqliteFailure(e, _))
            if e.code == ErrorCode::ConstraintViolation
                && e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}
