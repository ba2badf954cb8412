//! Configuration system for the `wschat` client.
//!
//! Supports layered configuration with the following priority (highest first):
//! 1. CLI arguments
//! 2. Environment variables (via clap `env` attribute)
//! 3. TOML config file (`~/.config/wschat/config.toml`)
//! 4. Compiled defaults
//!
//! Missing config file is not an error (defaults are used). An explicit
//! `--config` path that doesn't exist is an error.

use std::path::PathBuf;
use std::time::Duration;

use url::Url;

use crate::net::NetConfig;

/// Server used when nothing else is configured.
const DEFAULT_SERVER_URL: &str = "https://localhost:8443/";

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadFile {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to parse the TOML configuration.
    #[error("failed to parse config file: {0}")]
    ParseToml(#[from] toml::de::Error),

    /// The server URL is not an absolute `http(s)://` or `ws(s)://` URL.
    #[error("invalid server url {url:?}: {reason}")]
    InvalidServerUrl {
        /// The offending value.
        url: String,
        /// What is wrong with it.
        reason: String,
    },

    /// `channel_capacity` must be at least one.
    #[error("server.channel_capacity must be greater than zero")]
    ZeroChannelCapacity,

    /// The reconnect bounds cannot produce a usable backoff.
    #[error("invalid reconnect bounds: floor {floor:?}, ceiling {ceiling:?} (need 0 < floor <= ceiling)")]
    InvalidReconnect {
        /// Resolved first delay.
        floor: Duration,
        /// Resolved maximum delay.
        ceiling: Duration,
    },
}

// ---------------------------------------------------------------------------
// TOML file structs (all fields Option for partial overrides)
// ---------------------------------------------------------------------------

/// Top-level TOML config file structure.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ConfigFile {
    server: ServerFileConfig,
    reconnect: ReconnectFileConfig,
    chat: ChatFileConfig,
    ui: UiFileConfig,
}

/// `[server]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ServerFileConfig {
    url: Option<String>,
    username: Option<String>,
    connect_timeout_secs: Option<u64>,
    channel_capacity: Option<usize>,
}

/// `[reconnect]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ReconnectFileConfig {
    floor_ms: Option<u64>,
    ceiling_ms: Option<u64>,
}

/// `[chat]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ChatFileConfig {
    send_cooldown_ms: Option<u64>,
    typing_idle_ms: Option<u64>,
}

/// `[ui]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct UiFileConfig {
    poll_timeout_ms: Option<u64>,
    timestamp_format: Option<String>,
    bell_on_message: Option<bool>,
    max_log_lines: Option<usize>,
}

// ---------------------------------------------------------------------------
// Resolved configuration (concrete types, all fields populated)
// ---------------------------------------------------------------------------

/// Reconnect backoff bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectConfig {
    /// Delay after the first failure, and after any successful open.
    pub floor: Duration,
    /// Upper bound on the delay.
    pub ceiling: Duration,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            floor: Duration::from_secs(2),
            ceiling: Duration::from_secs(30),
        }
    }
}

/// Fully resolved client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    // -- Server --
    /// Base URL of the chat server (`/login` and `/ws` are resolved against it).
    pub server_url: Url,
    /// Username to pre-fill on the login form.
    pub username: Option<String>,
    /// Password to submit automatically together with `username`.
    pub password: Option<String>,
    /// Timeout for a single WebSocket connect attempt.
    pub connect_timeout: Duration,
    /// Channel capacity for command/event mpsc channels.
    pub channel_capacity: usize,
    /// Reconnect backoff bounds.
    pub reconnect: ReconnectConfig,

    // -- Chat --
    /// Minimum interval between transmitted chat messages.
    pub send_cooldown: Duration,
    /// Idle time after the last keystroke before `typing:false` is sent.
    pub typing_idle: Duration,

    // -- UI --
    /// Poll timeout for the TUI event loop.
    pub poll_timeout: Duration,
    /// Timestamp display format string (chrono).
    pub timestamp_format: String,
    /// Ring the terminal bell when someone else's message arrives.
    pub bell_on_message: bool,
    /// Number of log lines kept before the oldest are dropped.
    pub max_log_lines: usize,
}

impl ClientConfig {
    /// Compiled defaults.
    ///
    /// # Errors
    ///
    /// Only if the built-in server URL fails to parse.
    pub fn defaults() -> Result<Self, ConfigError> {
        Ok(Self {
            server_url: parse_server_url(DEFAULT_SERVER_URL)?,
            username: None,
            password: None,
            connect_timeout: Duration::from_secs(10),
            channel_capacity: 256,
            reconnect: ReconnectConfig::default(),
            send_cooldown: Duration::from_millis(1_000),
            typing_idle: Duration::from_millis(800),
            poll_timeout: Duration::from_millis(50),
            timestamp_format: "%H:%M".to_string(),
            bell_on_message: false,
            max_log_lines: 1_000,
        })
    }

    /// Load configuration by merging CLI args, env vars, and a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the explicit config file cannot be read
    /// or parsed, or if a resolved value is out of range.
    pub fn load(cli: &CliArgs) -> Result<Self, ConfigError> {
        let file = load_config_file(cli.config.as_deref())?;
        Self::resolve(cli, &file)
    }

    /// Resolve a `ClientConfig` from CLI args and a parsed config file.
    ///
    /// Priority: CLI > file > default. This is separated from `load()` to
    /// enable unit testing without CLI parsing.
    fn resolve(cli: &CliArgs, file: &ConfigFile) -> Result<Self, ConfigError> {
        let defaults = Self::defaults()?;

        let server_url = match cli.server.as_deref().or(file.server.url.as_deref()) {
            Some(raw) => parse_server_url(raw)?,
            None => defaults.server_url,
        };

        let channel_capacity = file
            .server
            .channel_capacity
            .unwrap_or(defaults.channel_capacity);
        if channel_capacity == 0 {
            return Err(ConfigError::ZeroChannelCapacity);
        }

        let reconnect = ReconnectConfig {
            floor: file
                .reconnect
                .floor_ms
                .map_or(defaults.reconnect.floor, Duration::from_millis),
            ceiling: file
                .reconnect
                .ceiling_ms
                .map_or(defaults.reconnect.ceiling, Duration::from_millis),
        };
        if reconnect.floor.is_zero() || reconnect.ceiling < reconnect.floor {
            return Err(ConfigError::InvalidReconnect {
                floor: reconnect.floor,
                ceiling: reconnect.ceiling,
            });
        }

        Ok(Self {
            server_url,
            username: cli
                .username
                .clone()
                .or_else(|| file.server.username.clone()),
            password: cli.password.clone(),
            connect_timeout: file
                .server
                .connect_timeout_secs
                .map_or(defaults.connect_timeout, Duration::from_secs),
            channel_capacity,
            reconnect,
            send_cooldown: file
                .chat
                .send_cooldown_ms
                .map_or(defaults.send_cooldown, Duration::from_millis),
            typing_idle: file
                .chat
                .typing_idle_ms
                .map_or(defaults.typing_idle, Duration::from_millis),
            poll_timeout: file
                .ui
                .poll_timeout_ms
                .map_or(defaults.poll_timeout, Duration::from_millis),
            timestamp_format: cli
                .timestamp_format
                .clone()
                .or_else(|| file.ui.timestamp_format.clone())
                .unwrap_or(defaults.timestamp_format),
            bell_on_message: cli.bell
                || file
                    .ui
                    .bell_on_message
                    .unwrap_or(defaults.bell_on_message),
            max_log_lines: file.ui.max_log_lines.unwrap_or(defaults.max_log_lines),
        })
    }

    /// Build the session networking config from this configuration.
    #[must_use]
    pub fn to_net_config(&self) -> NetConfig {
        NetConfig {
            server_url: self.server_url.clone(),
            connect_timeout: self.connect_timeout,
            channel_capacity: self.channel_capacity,
            reconnect: self.reconnect,
        }
    }
}

/// CLI arguments parsed by clap.
#[derive(clap::Parser, Debug, Default)]
#[command(version, about = "Terminal chat client")]
pub struct CliArgs {
    /// Base URL of the chat server (e.g. `https://chat.example.com:8443`).
    #[arg(long, env = "WSCHAT_SERVER")]
    pub server: Option<String>,

    /// Username to log in with.
    #[arg(short, long, env = "WSCHAT_USER")]
    pub username: Option<String>,

    /// Password; together with `--username` logs in without the form.
    #[arg(long, env = "WSCHAT_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Path to config file (default: `~/.config/wschat/config.toml`).
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Timestamp display format (chrono format string).
    #[arg(long)]
    pub timestamp_format: Option<String>,

    /// Ring the terminal bell on incoming messages.
    #[arg(long)]
    pub bell: bool,

    /// Log level filter (trace, debug, info, warn, error).
    #[arg(long, default_value = "info", env = "WSCHAT_LOG")]
    pub log_level: String,

    /// Path to log file (default: `$TMPDIR/wschat.log`).
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

/// Parse and validate a server base URL.
///
/// A missing trailing slash is added so that `login` and `ws` resolve
/// beneath the given path rather than replacing its last segment.
fn parse_server_url(raw: &str) -> Result<Url, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidServerUrl {
        url: raw.to_string(),
        reason,
    };

    let mut url = Url::parse(raw).map_err(|e| invalid(e.to_string()))?;
    match url.scheme() {
        "http" | "https" | "ws" | "wss" => {}
        other => return Err(invalid(format!("unsupported scheme `{other}`"))),
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

/// Load and parse a TOML config file.
///
/// If `explicit_path` is `Some`, the file must exist (error if not).
/// If `explicit_path` is `None`, the default path is tried and missing file
/// is treated as empty config.
fn load_config_file(explicit_path: Option<&std::path::Path>) -> Result<ConfigFile, ConfigError> {
    let path = if let Some(p) = explicit_path {
        let contents = std::fs::read_to_string(p).map_err(|e| ConfigError::ReadFile {
            path: p.to_path_buf(),
            source: e,
        })?;
        return Ok(toml::from_str(&contents)?);
    } else {
        let Some(config_dir) = dirs::config_dir() else {
            return Ok(ConfigFile::default());
        };
        config_dir.join("wschat").join("config.toml")
    };

    match std::fs::read_to_string(&path) {
        Ok(contents) => Ok(toml::from_str(&contents)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ConfigFile::default()),
        Err(e) => Err(ConfigError::ReadFile { path, source: e }),
    }
}
