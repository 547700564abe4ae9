//! Command implementations.

mod info;
mod run;
mod validate;

pub use info::run_info;
pub use run::run_pipeline;
pub use validate::run_validate;

use std::path::Path;

use contracts::RigConfig;
use tracing::info;

use crate::error::{CliError, Result};

/// Load a configuration file, or the built-in defaults when no path is given
fn load_config(path: Option<&Path>) -> Result<RigConfig> {
    let Some(path) = path else {
        info!("No configuration file given, using defaults");
        return Ok(RigConfig::default());
    };
    if !path.exists() {
        return Err(CliError::config_not_found(path.display().to_string()));
    }
    config_loader::ConfigLoader::load_from_path(path).map_err(CliError::Config)
}
