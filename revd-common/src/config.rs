//! Configuration loading and data folder resolution

use crate::{Error, Result};
use std::path::PathBuf;

/// Database file name inside the data folder, shared by all binaries
pub const DATABASE_FILE: &str = "revd.db";

/// Data folder resolution priority order:
/// 1. Command-line argument (highest priority)
/// 2. Environment variable (`REVD_DATA`)
/// 3. TOML config file (`revd/config.toml`, key `data_folder`)
/// 4. OS-dependent compiled default (fallback)
pub fn resolve_data_folder(cli_arg: Option<&str>) -> Result<PathBuf> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return Ok(PathBuf::from(path));
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var("REVD_DATA") {
        if !path.is_empty() {
            return Ok(PathBuf::from(path));
        }
    }

    // Priority 3: TOML config file
    if let Ok(config_path) = find_config_file() {
        if let Ok(toml_content) = std::fs::read_to_string(&config_path) {
            if let Ok(config) = toml::from_str::<toml::Value>(&toml_content) {
                if let Some(data_folder) = config.get("data_folder").and_then(|v| v.as_str()) {
                    return Ok(PathBuf::from(data_folder));
                }
            }
        }
    }

    // Priority 4: OS-dependent compiled default
    Ok(default_data_folder())
}

/// Database path inside the resolved data folder
pub fn database_path(data_folder: &std::path::Path) -> PathBuf {
    data_folder.join(DATABASE_FILE)
}

/// Ensure the data folder exists, creating it if missing
pub fn ensure_data_folder(data_folder: &std::path::Path) -> Result<()> {
    if !data_folder.exists() {
        std::fs::create_dir_all(data_folder)?;
        tracing::info!("Created data folder: {}", data_folder.display());
    }
    Ok(())
}

/// Locate the configuration file for the platform
fn find_config_file() -> Result<PathBuf> {
    if cfg!(target_os = "linux") {
        // Try ~/.config/revd/config.toml first, then /etc/revd/config.toml
        if let Some(path) = dirs::config_dir().map(|d| d.join("revd").join("config.toml")) {
            if path.exists() {
                return Ok(path);
            }
        }
        let system_config = PathBuf::from("/etc/revd/config.toml");
        if system_config.exists() {
            return Ok(system_config);
        }
        Err(Error::Config("No config file found".to_string()))
    } else {
        let path = dirs::config_dir()
            .map(|d| d.join("revd").join("config.toml"))
            .ok_or_else(|| Error::Config("Could not determine config directory".to_string()))?;
        if path.exists() {
            Ok(path)
        } else {
            Err(Error::Config(format!("Config file not found: {:?}", path)))
        }
    }
}

/// OS-dependent default data folder path
fn default_data_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("revd"))
        .unwrap_or_else(|| PathBuf::from("./revd_data"))
}
