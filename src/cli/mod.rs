pub mod find;
pub mod migrate;
pub mod records;
pub mod slugify;

use clap::{Parser, Subcommand};
use serde_json::Value;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "pebble-slug")]
#[command(version)]
#[command(about = "Generate unique URL slugs for SQLite records", long_about = None)]
pub struct Cli {
    #[arg(short, long, default_value = "pebble-slug.toml", env = "PEBBLE_SLUG_CONFIG")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the slug for a piece of text
    Slugify {
        text: String,
        #[arg(short, long, default_value = "-")]
        separator: String,
        #[arg(long, default_value = "table")]
        slugger: String,
        #[arg(long)]
        max_length: Option<usize>,
        #[arg(long)]
        keep_case: bool,
    },
    /// Insert a record, generating its slug
    Add {
        table: String,
        #[arg(value_parser = parse_assignment, required = true)]
        fields: Vec<(String, Value)>,
    },
    /// Update a record, regenerating its slug when configured to
    Update {
        table: String,
        #[arg(value_parser = parse_value)]
        id: Value,
        #[arg(value_parser = parse_assignment, required = true)]
        fields: Vec<(String, Value)>,
    },
    /// Print the records holding a slug
    Find {
        table: String,
        slug: String,
        #[arg(long = "scope", value_parser = parse_assignment)]
        scope: Vec<(String, Value)>,
    },
    /// Create the configured tables
    Migrate,
}

/// Parses `field=value`. The value is read as JSON when possible, so
/// `counter=2` is a number and `namespace=null` clears the field.
pub fn parse_assignment(s: &str) -> Result<(String, Value), String> {
    let (field, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected field=value, got '{}'", s))?;
    if field.is_empty() {
        return Err(format!("missing field name in '{}'", s));
    }
    Ok((field.to_string(), parse_value(value)?))
}

pub fn parse_value(s: &str) -> Result<Value, String> {
    match serde_json::from_str::<Value>(s) {
        Ok(value @ (Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_))) => {
            Ok(value)
        }
        _ => Ok(Value::String(s.to_string())),
    }
}
