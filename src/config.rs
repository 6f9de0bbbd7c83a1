//! Config file resolution for the command-line front end.

use anyhow::{Context, Result};
use gf_core::config::Config;
use std::path::{Path, PathBuf};

const DEFAULT_PATHS: [&str; 2] = ["./gifforge.toml", "~/.config/gifforge/config.toml"];

/// Load configuration from `custom_path`, or from the first default location
/// that exists, or fall back to defaults.
///
/// An explicit path must exist and parse.
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    match default_path() {
        Some(path) => load_config(&path),
        None => Ok(Config::default()),
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let config = Config::load(path)
        .with_context(|| format!("Failed to load config file: {}", path.display()))?;

    for warning in config.validate() {
        tracing::warn!("{warning}");
    }
    tracing::debug!("Loaded config from {}", path.display());
    Ok(config)
}

/// First default config location that exists.
pub fn default_path() -> Option<PathBuf> {
    DEFAULT_PATHS
        .iter()
        .map(|p| PathBuf::from(shellexpand::tilde(p).as_ref()))
        .find(|p| p.exists())
}
