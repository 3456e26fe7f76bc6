//! Configuration loading and data folder resolution

use crate::{Error, Result};
use std::path::PathBuf;

/// Default database file name inside the data folder
pub const DB_FILE_NAME: &str = "vault_audit.db";

/// Data folder resolution priority order:
/// 1. Caller-supplied value (highest priority)
/// 2. Environment variable
/// 3. TOML config file (`data_folder` key)
/// 4. OS-dependent compiled default (fallback)
pub fn resolve_data_folder(explicit: Option<&str>, env_var_name: &str) -> PathBuf {
    // Priority 1: caller-supplied value
    if let Some(path) = explicit {
        return PathBuf::from(path);
    }

    // Priority 2: environment variable
    if let Ok(path) = std::env::var(env_var_name) {
        if !path.is_empty() {
            return PathBuf::from(path);
        }
    }

    // Priority 3: TOML config file
    if let Ok(config_path) = find_config_file() {
        if let Ok(toml_content) = std::fs::read_to_string(&config_path) {
            if let Ok(config) = toml::from_str::<toml::Value>(&toml_content) {
                if let Some(folder) = config.get("data_folder").and_then(|v| v.as_str()) {
                    return PathBuf::from(folder);
                }
            }
        }
    }

    // Priority 4: OS-dependent compiled default
    default_data_folder()
}

/// Resolve the database path inside the data folder
pub fn resolve_db_path(explicit: Option<&str>, env_var_name: &str) -> PathBuf {
    resolve_data_folder(explicit, env_var_name).join(DB_FILE_NAME)
}

/// Locate the platform configuration file, if one exists
fn find_config_file() -> Result<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join("vault-audit").join("config.toml"));

    if let Some(path) = user_config {
        if path.exists() {
            return Ok(path);
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/vault-audit/config.toml");
        if system_config.exists() {
            return Ok(system_config);
        }
    }

    Err(Error::Config("No config file found".to_string()))
}

/// OS-dependent default data folder path
fn default_data_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("vault-audit"))
        .unwrap_or_else(|| PathBuf::from("./vault_audit_data"))
}
