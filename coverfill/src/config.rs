//! Configuration resolution for coverfill
//!
//! Turns the raw TOML sections from `coverfill_common::config` plus CLI
//! overrides into typed settings. Priority per field: CLI → ENV → TOML →
//! compiled default.

use crate::models::ReconcileOrder;
use coverfill_common::config::{
    default_cover_cache_dir, resolve_root_folder, resolve_setting, TomlConfig,
};
use coverfill_common::{Error, Result};
use std::path::PathBuf;
use std::time::Duration;

pub const ORDER_ENV_VAR: &str = "COVERFILL_ORDER";
pub const STATE_FILE_ENV_VAR: &str = "COVERFILL_STATE_FILE";
pub const COVER_CACHE_ENV_VAR: &str = "COVERFILL_COVER_CACHE";

/// MusicBrainz requires an identifying User-Agent
pub const DEFAULT_USER_AGENT: &str = concat!(
    "coverfill/",
    env!("CARGO_PKG_VERSION"),
    " ( https://github.com/coverfill/coverfill )"
);
pub const DEFAULT_MUSICBRAINZ_URL: &str = "https://musicbrainz.org/ws/2";
pub const DEFAULT_ITUNES_URL: &str = "https://itunes.apple.com";
pub const DEFAULT_COVERARTARCHIVE_URL: &str = "https://coverartarchive.org";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 15;

/// Original fixed cooldown between faulted passes (5 minutes)
pub const DEFAULT_COOLDOWN_SECS: u64 = 300;
pub const DEFAULT_MAX_COOLDOWN_SECS: u64 = 3600;
pub const DEFAULT_BACKOFF_MULTIPLIER: f64 = 2.0;

/// Settings shared by every HTTP client
#[derive(Debug, Clone, PartialEq)]
pub struct HttpSettings {
    pub user_agent: String,
    pub timeout: Duration,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }
}

/// Remote API base URLs
#[derive(Debug, Clone, PartialEq)]
pub struct EndpointConfig {
    pub musicbrainz_url: String,
    pub itunes_url: String,
    pub coverartarchive_url: String,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            musicbrainz_url: DEFAULT_MUSICBRAINZ_URL.to_string(),
            itunes_url: DEFAULT_ITUNES_URL.to_string(),
            coverartarchive_url: DEFAULT_COVERARTARCHIVE_URL.to_string(),
        }
    }
}

/// Restart policy for faulted catalog passes
#[derive(Debug, Clone, PartialEq)]
pub struct SupervisorConfig {
    /// Wait after the first fault
    pub cooldown: Duration,
    /// Upper bound for any single wait
    pub max_cooldown: Duration,
    /// Growth factor per consecutive fault (>= 1.0)
    pub backoff_multiplier: f64,
    /// `None` retries without limit
    pub max_restarts: Option<u32>,
}

impl SupervisorConfig {
    /// Wait before restarting after `consecutive_faults` faults in a row
    ///
    /// `cooldown × multiplier^(n-1)`, capped at `max_cooldown`.
    pub fn delay_for(&self, consecutive_faults: u32) -> Duration {
        let exponent = consecutive_faults.saturating_sub(1).min(i32::MAX as u32) as i32;
        let secs = self.cooldown.as_secs_f64() * self.backoff_multiplier.powi(exponent);

        if !secs.is_finite() || secs >= self.max_cooldown.as_secs_f64() {
            self.max_cooldown
        } else {
            Duration::from_secs_f64(secs)
        }
    }

    /// Whether another restart is allowed after `restarts` restarts so far
    pub fn allows_restart(&self, restarts: u32) -> bool {
        self.max_restarts.map_or(true, |max| restarts < max)
    }
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            cooldown: Duration::from_secs(DEFAULT_COOLDOWN_SECS),
            max_cooldown: Duration::from_secs(DEFAULT_MAX_COOLDOWN_SECS),
            backoff_multiplier: DEFAULT_BACKOFF_MULTIPLIER,
            max_restarts: None,
        }
    }
}

/// Values given on the command line
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub root: Option<PathBuf>,
    pub order: Option<String>,
    pub state_file: Option<PathBuf>,
    pub cover_cache: Option<PathBuf>,
}

/// Fully resolved configuration for one run
#[derive(Debug, Clone)]
pub struct EnrichConfig {
    pub root_folder: PathBuf,
    pub order: ReconcileOrder,
    pub http: HttpSettings,
    pub endpoints: EndpointConfig,
    pub cover_cache_dir: PathBuf,
    pub state_file: Option<PathBuf>,
    pub supervisor: SupervisorConfig,
    pub log_level: String,
}

impl EnrichConfig {
    /// Resolve every setting through the CLI → ENV → TOML → default tiers
    pub fn resolve(cli: &CliOverrides, toml_config: &TomlConfig) -> Result<Self> {
        let enrich = &toml_config.enrich;
        let supervisor = &toml_config.supervisor;

        let root_folder = resolve_root_folder(cli.root.as_deref(), toml_config);

        let order = match resolve_setting(cli.order.clone(), ORDER_ENV_VAR, enrich.order.clone()) {
            Some(value) => value.parse::<ReconcileOrder>().map_err(Error::Config)?,
            None => ReconcileOrder::default(),
        };

        let state_file = resolve_setting(
            path_string(&cli.state_file),
            STATE_FILE_ENV_VAR,
            path_string(&enrich.state_file),
        )
        .map(PathBuf::from);

        let cover_cache_dir = resolve_setting(
            path_string(&cli.cover_cache),
            COVER_CACHE_ENV_VAR,
            path_string(&enrich.cover_cache_dir),
        )
        .map(PathBuf::from)
        .unwrap_or_else(default_cover_cache_dir);

        let http = HttpSettings {
            user_agent: enrich
                .user_agent
                .clone()
                .filter(|ua| !ua.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
            timeout: Duration::from_secs(
                enrich
                    .request_timeout_secs
                    .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
            ),
        };

        let endpoints = EndpointConfig {
            musicbrainz_url: enrich
                .musicbrainz_url
                .clone()
                .unwrap_or_else(|| DEFAULT_MUSICBRAINZ_URL.to_string()),
            itunes_url: enrich
                .itunes_url
                .clone()
                .unwrap_or_else(|| DEFAULT_ITUNES_URL.to_string()),
            coverartarchive_url: enrich
                .coverartarchive_url
                .clone()
                .unwrap_or_else(|| DEFAULT_COVERARTARCHIVE_URL.to_string()),
        };

        let backoff_multiplier = supervisor
            .backoff_multiplier
            .unwrap_or(DEFAULT_BACKOFF_MULTIPLIER);
        if !backoff_multiplier.is_finite() || backoff_multiplier < 1.0 {
            return Err(Error::Config(format!(
                "supervisor.backoff_multiplier must be >= 1.0, got {}",
                backoff_multiplier
            )));
        }

        let cooldown = Duration::from_secs(supervisor.cooldown_secs.unwrap_or(DEFAULT_COOLDOWN_SECS));
        let max_cooldown = Duration::from_secs(
            supervisor
                .max_cooldown_secs
                .unwrap_or(DEFAULT_MAX_COOLDOWN_SECS),
        )
        .max(cooldown);

        Ok(Self {
            root_folder,
            order,
            http,
            endpoints,
            cover_cache_dir,
            state_file,
            supervisor: SupervisorConfig {
                cooldown,
                max_cooldown,
                backoff_multiplier,
                max_restarts: supervisor.max_restarts,
            },
            log_level: toml_config.logging.level.clone(),
        })
    }
}

fn path_string(path: &Option<PathBuf>) -> Option<String> {
    path.as_ref().map(|p| p.to_string_lossy().to_string())
}
