use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

// ── Top-level config ──────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Root scanned for `auth_info_*` session directories.
    #[serde(default = "default_sessions_root")]
    pub sessions_root: PathBuf,

    /// Root of the per-session persona records.
    #[serde(default = "default_persona_root")]
    pub persona_root: PathBuf,

    /// Wire transport to bind each session to. Only `console` ships
    /// in-tree; real protocols plug in through the `Transport` trait.
    #[serde(default = "default_transport")]
    pub transport: String,

    /// Auto-reply window per conversation key.
    #[serde(default = "default_cooldown_secs")]
    pub cooldown_secs: u64,

    #[serde(default)]
    pub reconnect: ReconnectConfig,

    #[serde(default)]
    pub gateway: GatewayConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconnectConfig {
    #[serde(default = "default_reconnect_initial_secs")]
    pub initial_secs: u64,
    #[serde(default = "default_reconnect_max_secs")]
    pub max_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_gateway_host")]
    pub host: String,
    #[serde(default = "default_gateway_port")]
    pub port: u16,
}

fn default_sessions_root() -> PathBuf {
    PathBuf::from("sessions")
}

fn default_persona_root() -> PathBuf {
    PathBuf::from("id")
}

fn default_transport() -> String {
    "console".to_string()
}

fn default_cooldown_secs() -> u64 {
    300
}

fn default_reconnect_initial_secs() -> u64 {
    1
}

fn default_reconnect_max_secs() -> u64 {
    60
}

fn default_gateway_host() -> String {
    "127.0.0.1".to_string()
}

fn default_gateway_port() -> u16 {
    3000
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sessions_root: default_sessions_root(),
            persona_root: default_persona_root(),
            transport: default_transport(),
            cooldown_secs: default_cooldown_secs(),
            reconnect: ReconnectConfig::default(),
            gateway: GatewayConfig::default(),
        }
    }
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_secs: default_reconnect_initial_secs(),
            max_secs: default_reconnect_max_secs(),
        }
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_gateway_host(),
            port: default_gateway_port(),
        }
    }
}

impl Config {
    /// Loads the TOML config at `path`, or compiled-in defaults when the
    /// file does not exist. A present-but-broken file is an error, never
    /// a silent fallback.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        toml::from_str(&raw).with_context(|| format!("parsing config {}", path.display()))
    }
}
