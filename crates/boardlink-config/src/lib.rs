//! Shared configuration for the boardlink CLI.
//!
//! TOML file in the platform config dir, `BOARDLINK_` environment
//! overrides, and translation to `boardlink_core::AgentConfig`. The CLI
//! layers its global flags on top of [`Config`] before calling
//! [`Config::to_agent_config`].

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use boardlink_core::{AgentConfig, TlsMode};

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

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
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    /// Where and how to look for the agent.
    #[serde(default)]
    pub agent: AgentSection,

    /// Operation timeouts, in milliseconds.
    #[serde(default)]
    pub timeouts: Timeouts,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct AgentSection {
    /// Origin probed for `/info` (e.g., "http://127.0.0.1").
    #[serde(default = "default_origin")]
    pub origin: String,

    #[serde(default = "default_first_port")]
    pub first_port: u16,

    #[serde(default = "default_last_port")]
    pub last_port: u16,

    /// Substring an official agent's `update_url` must contain.
    #[serde(default = "default_update_url_substring")]
    pub update_url_substring: String,

    /// Latest published agent version. Older agents are asked to update.
    pub target_version: Option<String>,

    /// Verify the agent's TLS certificate against the system store.
    #[serde(default)]
    pub verify_tls: bool,
}

impl Default for AgentSection {
    fn default() -> Self {
        Self {
            origin: default_origin(),
            first_port: default_first_port(),
            last_port: default_last_port(),
            update_url_substring: default_update_url_substring(),
            target_version: None,
            verify_tls: false,
        }
    }
}

fn default_origin() -> String {
    AgentConfig::default().origin
}
fn default_first_port() -> u16 {
    AgentConfig::default().first_port
}
fn default_last_port() -> u16 {
    AgentConfig::default().last_port
}
fn default_update_url_substring() -> String {
    AgentConfig::default().update_url_substring
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Timeouts {
    pub probe_ms: u64,
    pub connect_ms: u64,
    pub ports_ms: u64,
    pub download_ms: u64,
    pub upload_ms: u64,
    pub monitor_open_ms: u64,
    pub monitor_close_ms: u64,
    pub update_grace_ms: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        let d = AgentConfig::default();
        Self {
            probe_ms: millis(d.probe_timeout),
            connect_ms: millis(d.connect_timeout),
            ports_ms: millis(d.ports_timeout),
            download_ms: millis(d.download_timeout),
            upload_ms: millis(d.upload_timeout),
            monitor_open_ms: millis(d.monitor_open_timeout),
            monitor_close_ms: millis(d.monitor_close_timeout),
            update_grace_ms: millis(d.update_grace),
        }
    }
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "boardlink", "boardlink").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("boardlink");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from an explicit file. A missing file leaves the defaults in place.
///
/// Environment variables use `__` between table and key, e.g.
/// `BOARDLINK_AGENT__FIRST_PORT=8991` or `BOARDLINK_TIMEOUTS__UPLOAD_MS=120000`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("BOARDLINK_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning the defaults if loading fails.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<PathBuf, ConfigError> {
    let path = config_path();
    save_config_to(&path, cfg)?;
    Ok(path)
}

pub fn save_config_to(path: &Path, cfg: &Config) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Translation to the core config ──────────────────────────────────

impl Config {
    /// Validate and build the core's runtime `AgentConfig`.
    pub fn to_agent_config(&self) -> Result<AgentConfig, ConfigError> {
        let agent = &self.agent;

        let origin: url::Url = agent.origin.parse().map_err(|_| ConfigError::Validation {
            field: "agent.origin".into(),
            reason: format!("invalid URL: {}", agent.origin),
        })?;
        if !matches!(origin.scheme(), "http" | "https") {
            return Err(ConfigError::Validation {
                field: "agent.origin".into(),
                reason: format!("expected an http or https origin, got '{}'", origin.scheme()),
            });
        }
        if origin.port().is_some() {
            return Err(ConfigError::Validation {
                field: "agent.origin".into(),
                reason: "origin must not carry a port; set first_port/last_port instead".into(),
            });
        }

        if agent.first_port == 0 || agent.first_port > agent.last_port {
            return Err(ConfigError::Validation {
                field: "agent.first_port".into(),
                reason: format!(
                    "port range {}..={} is empty or starts at 0",
                    agent.first_port, agent.last_port
                ),
            });
        }

        if agent.update_url_substring.trim().is_empty() {
            return Err(ConfigError::Validation {
                field: "agent.update_url_substring".into(),
                reason: "must not be empty".into(),
            });
        }

        let target_version = agent
            .target_version
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_owned);

        let t = &self.timeouts;
        let timeout = |field: &str, ms: u64| -> Result<Duration, ConfigError> {
            if ms == 0 {
                return Err(ConfigError::Validation {
                    field: format!("timeouts.{field}"),
                    reason: "must be greater than zero".into(),
                });
            }
            Ok(Duration::from_millis(ms))
        };

        Ok(AgentConfig {
            origin: origin.as_str().trim_end_matches('/').to_owned(),
            first_port: agent.first_port,
            last_port: agent.last_port,
            update_url_substring: agent.update_url_substring.clone(),
            target_version,
            tls: if agent.verify_tls {
                TlsMode::System
            } else {
                TlsMode::DangerAcceptInvalid
            },
            probe_timeout: timeout("probe_ms", t.probe_ms)?,
            connect_timeout: timeout("connect_ms", t.connect_ms)?,
            ports_timeout: timeout("ports_ms", t.ports_ms)?,
            download_timeout: timeout("download_ms", t.download_ms)?,
            upload_timeout: timeout("upload_ms", t.upload_ms)?,
            monitor_open_timeout: timeout("monitor_open_ms", t.monitor_open_ms)?,
            monitor_close_timeout: timeout("monitor_close_ms", t.monitor_close_ms)?,
            // Zero grace is allowed: the agent may already be back.
            update_grace: Duration::from_millis(t.update_grace_ms),
        })
    }
}
