use crate::db::{Database, SqliteTable};
use crate::models::Filters;
use crate::services::slug::default_replacements;
use crate::services::sluggable::{Scope, SlugConfig, Sluggable, Uniqueness};
use crate::services::slugger::{build_slugger, SluggerSettings};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::path::Path;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub database: DatabaseConfig,
    #[serde(default)]
    pub tables: Vec<TableConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    pub path: String,
    #[serde(default = "default_pool_size")]
    pub pool_size: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TableConfig {
    pub name: String,
    #[serde(default = "default_primary_key")]
    pub primary_key: String,
    /// Schema statement run by `migrate`.
    #[serde(default)]
    pub create: Option<String>,
    pub slug: SlugSettings,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SlugSettings {
    #[serde(default = "default_field")]
    pub field: String,
    pub source_fields: Vec<String>,
    #[serde(default = "default_separator")]
    pub separator: String,
    #[serde(default = "default_replacements")]
    pub replacements: Vec<(String, String)>,
    /// Defaults to the declared width of the slug column.
    #[serde(default)]
    pub max_length: Option<usize>,
    #[serde(default = "default_true")]
    pub unique: bool,
    #[serde(default)]
    pub scope: Filters,
    /// Fields copied from each record into the uniqueness scope.
    #[serde(default)]
    pub scope_fields: Vec<String>,
    #[serde(default)]
    pub on_update: bool,
    #[serde(default)]
    pub on_dirty: bool,
    #[serde(default)]
    pub slugger: SluggerSettings,
}

fn default_pool_size() -> u32 {
    10
}

fn default_primary_key() -> String {
    "id".to_string()
}

fn default_field() -> String {
    "slug".to_string()
}

fn default_separator() -> String {
    "-".to_string()
}

fn default_true() -> bool {
    true
}

impl SlugSettings {
    pub fn scope(&self) -> Scope {
        if self.scope_fields.is_empty() {
            return Scope::Static(self.scope.clone());
        }
        let fixed = self.scope.clone();
        let fields = self.scope_fields.clone();
        Scope::computed(move |record| {
            let mut filters = fixed.clone();
            for field in &fields {
                filters.insert(
                    field.clone(),
                    record.get(field).cloned().unwrap_or(Value::Null),
                );
            }
            filters
        })
    }
}

impl TableConfig {
    /// Binds this table's slug settings to its SQLite table.
    pub fn sluggable(&self, db: &Database) -> Result<Sluggable<SqliteTable>> {
        let table = SqliteTable::new(db.clone(), &self.name, &self.primary_key)?;
        let settings = &self.slug;
        let config = SlugConfig::builder(settings.source_fields.iter().cloned())
            .field(settings.field.clone())
            .primary_key(self.primary_key.clone())
            .separator(settings.separator.clone())
            .replacements(settings.replacements.clone())
            .max_length(settings.max_length)
            .uniqueness(if settings.unique {
                Uniqueness::Default
            } else {
                Uniqueness::Disabled
            })
            .scope(settings.scope())
            .on_update(settings.on_update)
            .on_dirty(settings.on_dirty)
            .slugger(settings.slugger.clone())
            .build_with_schema(&table)?;
        Ok(Sluggable::new(config, table))
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            anyhow::anyhow!(
                "Could not read config file '{}': {}",
                path.display(),
                e
            )
        })?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.database.pool_size == 0 {
            anyhow::bail!("database.pool_size must be greater than 0");
        }

        let mut seen = HashSet::new();
        for table in &self.tables {
            if !seen.insert(table.name.as_str()) {
                anyhow::bail!("table '{}' is configured more than once", table.name);
            }
            if table.slug.source_fields.is_empty() {
                anyhow::bail!("tables.{}.slug.source_fields cannot be empty", table.name);
            }
            if table.slug.max_length == Some(0) {
                anyhow::bail!("tables.{}.slug.max_length must be greater than 0", table.name);
            }
            build_slugger(&table.slug.slugger)?;
        }
        Ok(())
    }

    pub fn table(&self, name: &str) -> Result<&TableConfig> {
        self.tables
            .iter()
            .find(|t| t.name == name)
            .ok_or_else(|| anyhow::anyhow!("No table named '{}' in the config", name))
    }

    pub fn open_database(&self) -> Result<Database> {
        Database::open(&self.database.path, self.database.pool_size)
    }
}
