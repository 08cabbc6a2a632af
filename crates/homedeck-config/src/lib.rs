//! Shared configuration for homedeck front-ends.
//!
//! TOML profiles merged with `HOMEDECK_` environment overrides, and
//! translation to `homedeck_core::ControllerConfig`. The CLI layers its
//! flag overrides on top of what this crate resolves.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use homedeck_core::{ControllerConfig, RecordingConfig, TlsVerification};

/// File name of the recorded-actions store, kept beside `config.toml`.
pub const ACTIONS_FILE: &str = "actions.json";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("profile '{name}' not found")]
    UnknownProfile { name: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Config {
    /// Profile used when none is selected explicitly.
    pub default_profile: Option<String>,

    #[serde(default)]
    pub defaults: Defaults,

    /// Named device-server profiles.
    #[serde(default)]
    pub profiles: BTreeMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: BTreeMap::new(),
        }
    }
}

impl Config {
    /// Pick a profile: the explicit name, else `default_profile`, else
    /// `"default"`.
    pub fn profile<'a>(
        &'a self,
        name: Option<&'a str>,
    ) -> Result<(&'a str, &'a Profile), ConfigError> {
        let name = name
            .or(self.default_profile.as_deref())
            .unwrap_or("default");
        self.profiles
            .get(name)
            .map(|p| (name, p))
            .ok_or_else(|| ConfigError::UnknownProfile { name: name.into() })
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
            timeout: default_timeout(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}
fn default_timeout() -> u64 {
    10
}

/// A named device-server profile.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Profile {
    /// Server base URL (e.g., "http://homebridge.local:8581").
    pub server: String,

    pub poll_interval_ms: Option<u64>,

    /// Quiet period before coalesced edits are written.
    pub debounce_ms: Option<u64>,

    /// Unset means twice the poll interval.
    pub suppression_timeout_ms: Option<u64>,

    pub max_concurrent_polls: Option<usize>,

    /// Show the characteristic debug table under each device.
    #[serde(default)]
    pub debug: bool,

    /// Record acknowledged writes into this named action.
    pub record_action: Option<String>,

    /// Path to custom CA certificate.
    pub ca_cert: Option<PathBuf>,

    /// Accept self-signed certificates.
    pub insecure: Option<bool>,

    /// Override `defaults.timeout`.
    pub timeout: Option<u64>,
}

impl Profile {
    pub fn new(server: impl Into<String>) -> Self {
        Self {
            server: server.into(),
            ..Self::default()
        }
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    config_dir().join("config.toml")
}

/// Where recorded actions are stored.
pub fn actions_path() -> PathBuf {
    config_dir().join(ACTIONS_FILE)
}

fn config_dir() -> PathBuf {
    ProjectDirs::from("dev", "homedeck", "homedeck").map_or_else(
        dirs_fallback,
        |dirs| dirs.config_dir().to_path_buf(),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("homedeck");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from `path` + environment. A missing file yields the defaults.
///
/// Environment keys nest with a double underscore, e.g.
/// `HOMEDECK_PROFILES__HOME__SERVER`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let config: Config = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("HOMEDECK_").split("__"))
        .extract()?;
    Ok(config)
}

/// Load config, returning a default if the file doesn't exist or is invalid.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(cfg, &config_path())
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Translation ─────────────────────────────────────────────────────

/// Build a `ControllerConfig` from a profile, with no CLI overrides.
/// Recorded actions go to `actions_file`.
pub fn profile_to_controller_config(
    profile: &Profile,
    defaults: &Defaults,
    actions_file: &Path,
) -> Result<ControllerConfig, ConfigError> {
    let base_url: url::Url = profile
        .server
        .parse()
        .map_err(|_| ConfigError::Validation {
            field: "server".into(),
            reason: format!("invalid URL: {}", profile.server),
        })?;

    let mut config = ControllerConfig::new(base_url);

    config.tls = if profile.insecure.unwrap_or(false) {
        TlsVerification::DangerAcceptInvalid
    } else if let Some(ref ca_path) = profile.ca_cert {
        TlsVerification::CustomCa(ca_path.clone())
    } else {
        TlsVerification::SystemDefaults
    };

    config.timeout = Duration::from_secs(profile.timeout.unwrap_or(defaults.timeout));

    if let Some(ms) = profile.poll_interval_ms {
        config.poll_interval = positive_millis("poll_interval_ms", ms)?;
    }
    if let Some(ms) = profile.debounce_ms {
        config.debounce = Duration::from_millis(ms);
    }
    if let Some(ms) = profile.suppression_timeout_ms {
        config.suppression_timeout = Some(positive_millis("suppression_timeout_ms", ms)?);
    }
    if let Some(n) = profile.max_concurrent_polls {
        if n == 0 {
            return Err(ConfigError::Validation {
                field: "max_concurrent_polls".into(),
                reason: "must be at least 1".into(),
            });
        }
        config.max_concurrent_polls = n;
    }

    config.debug = profile.debug;
    config.record_action = profile.record_action.as_ref().map(|action| RecordingConfig {
        action: action.clone(),
        path: actions_file.to_path_buf(),
    });

    Ok(config)
}

fn positive_millis(field: &str, ms: u64) -> Result<Duration, ConfigError> {
    if ms == 0 {
        return Err(ConfigError::Validation {
            field: field.into(),
            reason: "must be greater than zero".into(),
        });
    }
    Ok(Duration::from_millis(ms))
}
