//! Subcommands.

pub mod config;
pub mod encode;
pub mod inspect;
pub mod predict;

use std::path::{Path, PathBuf};

use mpox_core::MpoxConfig;
use tracing::debug;

/// Location of the user's configuration file.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("mpox")
        .join("config.json")
}

/// Load the explicit config file, else the user's file, else defaults.
pub fn load_config(config_path: Option<&str>) -> anyhow::Result<MpoxConfig> {
    if let Some(path) = config_path {
        return Ok(MpoxConfig::from_file(Path::new(path))?);
    }

    let path = default_config_path();
    if path.exists() {
        debug!("Using configuration from {}", path.display());
        Ok(MpoxConfig::from_file(&path)?)
    } else {
        Ok(MpoxConfig::default())
    }
}
