//! Endpoint catalog loader
//!
//! ## Loading Strategy
//! 1. An explicit path, when the caller has one
//! 2. The `POLYCALL_CONFIG` environment variable
//! 3. The first existing file among the probed locations
//!
//! JSON and TOML are both accepted; the format follows the file extension.
//!
//! ## File Locations
//! Probed relative to the current working directory, in order:
//! 1. `./polycall.toml`
//! 2. `./polycall.json`
//! 3. `./config/polycall.toml`

use std::path::{Path, PathBuf};

use polycall_domain::{PolycallError, Result};

use super::catalog::EndpointCatalog;

/// Environment variable naming the catalog file.
pub const CONFIG_ENV_VAR: &str = "POLYCALL_CONFIG";

const PROBED_FILES: [&str; 3] = ["polycall.toml", "polycall.json", "config/polycall.toml"];

/// Load and validate the endpoint catalog.
///
/// # Errors
/// Returns `PolycallError::Config` when no catalog can be found, read or
/// parsed, and `PolycallError::Validation` when an endpoint is invalid.
pub fn load(path: Option<&Path>) -> Result<EndpointCatalog> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => match std::env::var_os(CONFIG_ENV_VAR) {
            Some(value) if !value.is_empty() => {
                tracing::debug!(var = CONFIG_ENV_VAR, "catalog path taken from environment");
                PathBuf::from(value)
            }
            _ => probe_config_paths().ok_or_else(|| {
                PolycallError::Config(
                    "No endpoint catalog found in any of the standard locations".to_string(),
                )
            })?,
        },
    };

    let catalog = load_from_file(&path)?;
    catalog.validate()?;
    tracing::info!(
        path = %path.display(),
        endpoints = catalog.endpoints.len(),
        "Endpoint catalog loaded"
    );
    Ok(catalog)
}

/// Read and parse a catalog file without validating it.
///
/// # Errors
/// Returns `PolycallError::Config` if the file is missing, unreadable or
/// malformed.
pub fn load_from_file(path: &Path) -> Result<EndpointCatalog> {
    if !path.exists() {
        return Err(PolycallError::Config(format!(
            "Config file not found: {}",
            path.display()
        )));
    }

    let contents = std::fs::read_to_string(path)
        .map_err(|e| PolycallError::Config(format!("Failed to read config file: {}", e)))?;

    parse_catalog(&contents, path)
}

/// Parse catalog text, choosing the format from `path`'s extension
/// (`.json` when there is none).
///
/// # Errors
/// Returns `PolycallError::Config` for an unknown format or invalid content.
pub fn parse_catalog(contents: &str, path: &Path) -> Result<EndpointCatalog> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| PolycallError::Config(format!("Invalid TOML format: {}", e))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| PolycallError::Config(format!("Invalid JSON format: {}", e))),
        _ => Err(PolycallError::Config(format!("Unsupported config format: {}", extension))),
    }
}

/// First existing catalog file in the current working directory.
pub fn probe_config_paths() -> Option<PathBuf> {
    let cwd = std::env::current_dir().ok()?;
    probe_in(&cwd)
}

fn probe_in(dir: &Path) -> Option<PathBuf> {
    PROBED_FILES.iter().map(|name| dir.join(name)).find(|path| path.is_file())
}
