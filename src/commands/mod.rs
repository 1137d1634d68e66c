pub mod check_config;
pub mod init_db;
pub mod run;

// Re-export command functions for convenience
pub use check_config::check_config;
pub use init_db::init_db;
pub use run::run;

use anyhow::{Context, Result};
use std::path::Path;

use realty_scout::config::Config;

/// Load the config file, apply environment overrides, and validate
///
/// `run_once` forces single-run mode before validation, so a config
/// without schedule times is accepted for `run --once`.
pub fn load_config(path: &Path, run_once: bool) -> Result<Config> {
    let mut config = Config::from_file(path)
        .with_context(|| format!("Failed to load config: {}", path.display()))?;
    config.apply_env_overrides();
    if run_once {
        config.schedule.run_once = true;
    }
    config
        .validate()
        .with_context(|| format!("Invalid config: {}", path.display()))?;
    Ok(config)
}
