use crate::models::{Entity, Record};
use crate::services::sluggable::SlugTransition;
use crate::Config;
use anyhow::Result;
use serde_json::{Map, Value};
use std::path::Path;

pub fn add(config_path: &Path, table: &str, fields: Vec<(String, Value)>) -> Result<()> {
    let config = Config::load(config_path)?;
    let db = config.open_database()?;
    let sluggable = config.table(table)?.sluggable(&db)?;

    let mut entity = Entity::new(Value::Object(fields.into_iter().collect::<Map<_, _>>()));
    let transition = sluggable.store().save(&sluggable, &mut entity)?;
    report(
        sluggable.config().primary_key(),
        sluggable.config().field(),
        &entity,
        &transition,
    );
    Ok(())
}

pub fn update(
    config_path: &Path,
    table: &str,
    id: &Value,
    fields: Vec<(String, Value)>,
) -> Result<()> {
    let config = Config::load(config_path)?;
    let db = config.open_database()?;
    let sluggable = config.table(table)?.sluggable(&db)?;

    let Some(mut entity) = sluggable.store().load(id)? else {
        anyhow::bail!(
            "No row in '{}' with {} = {}",
            table,
            sluggable.store().primary_key(),
            id
        );
    };
    for (field, value) in fields {
        entity.set(&field, value);
    }
    let transition = sluggable.store().save(&sluggable, &mut entity)?;
    report(
        sluggable.config().primary_key(),
        sluggable.config().field(),
        &entity,
        &transition,
    );
    Ok(())
}

fn report(primary_key: &str, field: &str, entity: &Entity, transition: &SlugTransition) {
    let id = entity.get(primary_key).cloned().unwrap_or(Value::Null);
    match transition {
        SlugTransition::NoOp => {
            tracing::info!("Saved row {} without touching {}", id, field);
        }
        SlugTransition::Unchanged(slug) => {
            tracing::info!("Saved row {}, {} unchanged", id, field);
            println!("{}", slug);
        }
        SlugTransition::RegenerateFromFields(slug)
        | SlugTransition::RegenerateFromExplicitValue(slug) => {
            tracing::info!("Saved row {} with {} '{}'", id, field, slug);
            println!("{}", slug);
        }
    }
}
