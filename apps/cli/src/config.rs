//! CLI configuration loading.

use anyhow::{Context, Result};
use kiln_training::PrepConfig;
use std::path::{Path, PathBuf};

pub const CONFIG_ENV: &str = "KILN_CONFIG";

/// Configuration file to use.
///
/// Precedence:
/// 1. `--config`
/// 2. `KILN_CONFIG`
/// 3. None (built-in defaults)
pub fn config_path(flag: Option<PathBuf>) -> Option<PathBuf> {
    flag.or_else(|| std::env::var_os(CONFIG_ENV).filter(|v| !v.is_empty()).map(PathBuf::from))
}

pub fn load_config(path: Option<&Path>) -> Result<PrepConfig> {
    match path {
        Some(path) => PrepConfig::load_from_file(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display())),
        None => Ok(PrepConfig::default()),
    }
}
