use crate::Config;
use anyhow::Result;
use std::path::Path;

pub fn run(config_path: &Path) -> Result<()> {
    let config = Config::load(config_path)?;
    let db = config.open_database()?;

    let statements: Vec<&str> = config
        .tables
        .iter()
        .filter_map(|t| t.create.as_deref())
        .collect();
    if statements.is_empty() {
        tracing::info!("No table has a create statement, nothing to do");
        return Ok(());
    }

    db.migrate(&statements)?;
    tracing::info!("Migrations complete");
    Ok(())
}
