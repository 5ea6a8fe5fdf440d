//! Configuration loading and root folder resolution
//!
//! Every setting resolves in the same priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! A missing TOML file is not an error: a warning is logged and the
//! compiled defaults apply. A TOML file that exists but does not parse is a
//! startup error.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Root folder used when nothing else is configured
pub const DEFAULT_ROOT_FOLDER: &str = "./music";

/// Environment variable overriding the root folder
pub const ROOT_ENV_VAR: &str = "COVERFILL_ROOT";

/// Environment variable overriding the TOML config path
pub const CONFIG_ENV_VAR: &str = "COVERFILL_CONFIG";

/// Default log level
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Parsed TOML configuration file
///
/// All fields are optional so that a partial file only overrides what it
/// names.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Music collection root
    pub root_folder: Option<PathBuf>,

    /// `[logging]` section
    #[serde(default)]
    pub logging: LoggingConfig,

    /// `[enrich]` section
    #[serde(default)]
    pub enrich: EnrichSection,

    /// `[supervisor]` section
    #[serde(default)]
    pub supervisor: SupervisorSection,
}

/// `[logging]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// tracing filter directive (e.g. "info", "coverfill=debug")
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

/// `[enrich]` section
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnrichSection {
    /// "metadata-first" or "image-first"
    pub order: Option<String>,
    pub user_agent: Option<String>,
    pub request_timeout_secs: Option<u64>,
    pub musicbrainz_url: Option<String>,
    pub itunes_url: Option<String>,
    pub coverartarchive_url: Option<String>,
    pub cover_cache_dir: Option<PathBuf>,
    /// Append-only log of settled files; unset keeps progress in memory only
    pub state_file: Option<PathBuf>,
}

/// `[supervisor]` section
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SupervisorSection {
    pub cooldown_secs: Option<u64>,
    pub max_cooldown_secs: Option<u64>,
    pub backoff_multiplier: Option<f64>,
    pub max_restarts: Option<u32>,
}

/// Default TOML location: `<config_dir>/coverfill/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("coverfill").join("config.toml"))
}

/// Default cover cache location: `<cache_dir>/coverfill/covers`
pub fn default_cover_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .map(|d| d.join("coverfill").join("covers"))
        .unwrap_or_else(|| PathBuf::from("./.coverfill/covers"))
}

/// Resolve which TOML file to read
///
/// Priority: CLI → `COVERFILL_CONFIG` → platform default.
pub fn resolve_config_path(cli_arg: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    if let Some(path) = env_value(CONFIG_ENV_VAR) {
        return Some(PathBuf::from(path));
    }

    default_config_path()
}

/// Load TOML configuration
///
/// Missing file → warning + defaults. Unreadable or malformed file → error.
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    if !path.exists() {
        warn!(
            path = %path.display(),
            "Config file not found, using compiled defaults"
        );
        return Ok(TomlConfig::default());
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read TOML failed ({}): {}", path.display(), e)))?;

    let config: TomlConfig = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse TOML failed ({}): {}", path.display(), e)))?;

    debug!(path = %path.display(), "Loaded TOML config");
    Ok(config)
}

/// Root folder resolution
///
/// Priority: CLI → `COVERFILL_ROOT` → TOML `root_folder` → `./music`.
pub fn resolve_root_folder(cli_arg: Option<&Path>, toml_config: &TomlConfig) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    if let Some(path) = env_value(ROOT_ENV_VAR) {
        return PathBuf::from(path);
    }

    if let Some(path) = &toml_config.root_folder {
        return path.clone();
    }

    PathBuf::from(DEFAULT_ROOT_FOLDER)
}

/// Resolve a single setting through the CLI → ENV → TOML tiers
///
/// Returns `None` when no tier provides a value so the caller can apply its
/// compiled default.
pub fn resolve_setting(
    cli_arg: Option<String>,
    env_var_name: &str,
    toml_value: Option<String>,
) -> Option<String> {
    cli_arg
        .or_else(|| env_value(env_var_name))
        .or(toml_value)
}

/// Non-empty, trimmed environment variable value
fn env_value(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
