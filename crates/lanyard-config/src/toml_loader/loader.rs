//! Reading `config.toml`, and seeding it on first run.

use std::io::Write;
use std::path::{Path, PathBuf};

use crate::schema::LanyardConfig;
use crate::validation;
use lanyard_common::ConfigError;
use tracing::{info, warn};

use super::template::default_config_toml;

const CONFIG_DIR: &str = "lanyard";
const CONFIG_FILE: &str = "config.toml";

fn io_error(action: &str, path: &Path, e: std::io::Error) -> ConfigError {
    ConfigError::ParseError(format!("failed to {action} {}: {e}", path.display()))
}

/// Where the config file lives under a given base config directory.
pub(crate) fn config_path_in(base: &Path) -> PathBuf {
    base.join(CONFIG_DIR).join(CONFIG_FILE)
}

/// `<platform config dir>/lanyard/config.toml`.
///
/// On macOS: `~/Library/Application Support/lanyard/config.toml`
/// On Linux: `~/.config/lanyard/config.toml`
pub fn default_config_path() -> Result<PathBuf, ConfigError> {
    dirs::config_dir()
        .map(|base| config_path_in(&base))
        .ok_or_else(|| ConfigError::ParseError("could not determine config directory".into()))
}

/// Write the commented template to `path`, creating parent directories.
///
/// Never replaces an existing file: returns `Ok(false)` if one is already
/// there, `Ok(true)` if the template was written.
pub fn create_default_config(path: &Path) -> Result<bool, ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| io_error("create config directory", parent, e))?;
    }

    let mut file = match std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
    {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => return Ok(false),
        Err(e) => return Err(io_error("create", path, e)),
    };
    file.write_all(default_config_toml().as_bytes())
        .map_err(|e| io_error("write default config to", path, e))?;

    info!("created default config at {}", path.display());
    Ok(true)
}

/// Load config from a specific TOML file path.
///
/// Missing fields are filled from serde defaults. Validation failures are
/// logged as a warning and the parsed config is returned as-is; callers that
/// need a hard failure run [`validation::validate`] themselves.
pub fn load_from_path(path: &Path) -> Result<LanyardConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| io_error("read", path, e))?;

    let config: LanyardConfig = toml::from_str(&content)
        .map_err(|e| ConfigError::ParseError(format!("failed to parse TOML: {e}")))?;

    if let Err(e) = validation::validate(&config) {
        warn!("config validation warning: {e}");
    }

    info!("loaded config from {}", path.display());
    Ok(config)
}

/// Load from [`default_config_path`], seeding the template on first run.
pub fn load_default() -> Result<LanyardConfig, ConfigError> {
    let path = default_config_path()?;

    if !path.exists() && create_default_config(&path)? {
        return Ok(LanyardConfig::default());
    }

    // Someone else may have written the file between the check and the create.
    load_from_path(&path)
}
