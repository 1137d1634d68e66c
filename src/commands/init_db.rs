use anyhow::{Context, Result};

use realty_scout::config::Config;
use realty_scout::storage;

/// Create the listing store and its schema
pub fn init_db(config: &Config) -> Result<()> {
    let path = &config.database.sqlite_path;
    let store = storage::open(&config.database)
        .with_context(|| format!("Failed to open database: {}", path.display()))?;
    let count = store.count().context("Failed to count stored listings")?;

    tracing::info!(path = %path.display(), listings = count, "Database ready");
    println!("Database ready: {} ({count} listings)", path.display());
    Ok(())
}
