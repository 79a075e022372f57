//! Configuration file loading.

use crate::config::types::WorkbenchConfig;
use crate::error::WorkbenchError;
use std::path::{Path, PathBuf};

/// Default configuration file name for project-local config.
const LOCAL_CONFIG_NAME: &str = "code-workbench.toml";

/// Default configuration file name within XDG config directory.
const XDG_CONFIG_NAME: &str = "config.toml";

/// Application name for XDG directory lookup.
const APP_NAME: &str = "code-workbench";

/// Loads configuration from the default search paths.
///
/// Returns the default configuration if no config file is found.
///
/// # Errors
///
/// Returns an error if a config file exists but cannot be parsed.
pub fn load() -> Result<WorkbenchConfig, WorkbenchError> {
    for path in search_paths() {
        if path.exists() {
            tracing::debug!(path = %path.display(), "loading configuration");
            return from_path(&path);
        }
    }

    Ok(WorkbenchConfig::default())
}

/// Loads configuration from a specific file path.
///
/// # Errors
///
/// Returns an error if:
/// - The file cannot be read
/// - The file contains invalid TOML
/// - The TOML doesn't match the expected schema
pub fn from_path(path: &Path) -> Result<WorkbenchConfig, WorkbenchError> {
    let contents = std::fs::read_to_string(path).map_err(|e| {
        WorkbenchError::configuration(
            "config_file",
            format!("failed to read '{}': {}", path.display(), e),
        )
    })?;

    from_str(&contents).map_err(|e| {
        WorkbenchError::configuration(
            "config_file",
            format!("failed to parse '{}': {}", path.display(), e),
        )
    })
}

/// Parses configuration from a TOML string.
///
/// # Errors
///
/// Returns an error if the TOML is invalid or doesn't match the schema.
pub fn from_str(toml_str: &str) -> Result<WorkbenchConfig, WorkbenchError> {
    let config: WorkbenchConfig = toml::from_str(toml_str)
        .map_err(|e| WorkbenchError::configuration("config", format!("invalid TOML: {e}")))?;
    validate(&config)?;
    Ok(config)
}

/// Returns the paths that would be searched for configuration files.
#[must_use]
pub fn search_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from(LOCAL_CONFIG_NAME)];

    if let Some(config_dir) = xdg_config_dir() {
        paths.push(config_dir.join(XDG_CONFIG_NAME));
    }

    paths
}

/// Returns the path to the XDG config directory for code-workbench.
#[must_use]
pub fn xdg_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join(APP_NAME))
}

fn validate(config: &WorkbenchConfig) -> Result<(), WorkbenchError> {
    if config.llm.models.is_empty() {
        return Err(WorkbenchError::configuration(
            "llm.models",
            "at least one model must be defined",
        ));
    }
    if config.embedding.chunk_size == 0 {
        return Err(WorkbenchError::configuration(
            "embedding.chunk_size",
            "must be greater than zero",
        ));
    }
    if config.embedding.chunk_overlap >= config.embedding.chunk_size {
        return Err(WorkbenchError::configuration(
            "embedding.chunk_overlap",
            "must be smaller than chunk_size",
        ));
    }
    Ok(())
}
