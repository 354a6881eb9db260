use crate::models::Filters;
use crate::services::slug::validate_slug;
use crate::Config;
use anyhow::Result;
use serde_json::Value;
use std::path::Path;

pub fn run(config_path: &Path, table: &str, slug: &str, scope: Vec<(String, Value)>) -> Result<()> {
    let config = Config::load(config_path)?;
    let db = config.open_database()?;
    let sluggable = config.table(table)?.sluggable(&db)?;

    if !validate_slug(slug, sluggable.config().separator()) {
        tracing::warn!("'{}' does not look like a generated slug", slug);
    }

    let scope: Filters = scope.into_iter().collect();
    let conditions = sluggable.find_by_unique_slug(&scope, Some(slug))?;
    let rows = sluggable.store().find(&conditions)?;

    if rows.is_empty() {
        tracing::info!("No rows in '{}' with slug '{}'", table, slug);
    }
    for row in rows {
        println!("{}", serde_json::to_string_pretty(row.fields())?);
    }
    Ok(())
}
