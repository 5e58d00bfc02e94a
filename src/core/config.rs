use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub announce: AnnounceConfig,
    #[serde(default)]
    pub peers: PeersConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: Option<u16>,
    pub unix_socket: Option<PathBuf>,
    #[serde(default = "default_num_threads")]
    pub num_threads: usize,
    #[serde(default = "default_torrent_capacity")]
    pub torrent_capacity: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnnounceConfig {
    /// Suggested seconds between announces
    #[serde(default = "default_interval")]
    pub interval: u32,
    #[serde(default = "default_numwant")]
    pub default_numwant: usize,
    /// Hard cap on peers returned, whatever the client asks for
    #[serde(default = "default_max_numwant")]
    pub max_numwant: usize,
    /// Fixed `tracker id`; a random one is generated at startup when unset
    pub tracker_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PeersConfig {
    #[serde(default = "default_cleanup_interval")]
    pub cleanup_interval: u64,
    #[serde(default = "default_peer_timeout")]
    pub peer_timeout: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
    #[serde(default = "default_console")]
    pub console: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            unix_socket: None,
            num_threads: default_num_threads(),
            torrent_capacity: default_torrent_capacity(),
        }
    }
}

impl Default for AnnounceConfig {
    fn default() -> Self {
        Self {
            interval: default_interval(),
            default_numwant: default_numwant(),
            max_numwant: default_max_numwant(),
            tracker_id: None,
        }
    }
}

impl Default for PeersConfig {
    fn default() -> Self {
        Self {
            cleanup_interval: default_cleanup_interval(),
            peer_timeout: default_peer_timeout(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            console: default_console(),
        }
    }
}

// Default value functions
fn default_port() -> Option<u16> {
    Some(8000)
}

fn default_num_threads() -> usize {
    num_cpus::get()
}

fn default_torrent_capacity() -> usize {
    10_000
}

fn default_interval() -> u32 {
    1800 // 30 minutes
}

fn default_numwant() -> usize {
    50
}

fn default_max_numwant() -> usize {
    50
}

fn default_cleanup_interval() -> u64 {
    300 // 5 minutes
}

fn default_peer_timeout() -> i64 {
    3600 // 1 hour
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

fn default_console() -> bool {
    false
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .context(format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .context("Failed to parse config file")?;

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        // Validate server config
        if self.server.port.is_none() && self.server.unix_socket.is_none() {
            bail!("Either port or unix_socket must be specified in server config");
        }

        if self.server.num_threads == 0 {
            bail!("num_threads must be greater than 0");
        }

        // Validate announce config
        if self.announce.interval == 0 {
            bail!("interval must be greater than 0");
        }

        if self.announce.max_numwant == 0 {
            bail!("max_numwant must be greater than 0");
        }

        if self.announce.default_numwant > self.announce.max_numwant {
            bail!(
                "default_numwant ({}) must not exceed max_numwant ({})",
                self.announce.default_numwant,
                self.announce.max_numwant
            );
        }

        if let Some(tracker_id) = &self.announce.tracker_id {
            if tracker_id.is_empty() {
                bail!("tracker_id must not be empty when set");
            }
        }

        // Validate peers config
        if self.peers.cleanup_interval == 0 {
            bail!("cleanup_interval must be greater than 0");
        }

        // Validate that peer_timeout is greater than cleanup_interval
        if self.peers.peer_timeout <= self.peers.cleanup_interval as i64 {
            bail!(
                "peer_timeout ({}) must be greater than cleanup_interval ({})",
                self.peers.peer_timeout,
                self.peers.cleanup_interval
            );
        }

        // Validate logging config
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            bail!(
                "Invalid log level '{}'. Must be one of: trace, debug, info, warn, error",
                self.logging.level
            );
        }

        let valid_formats = ["json", "console"];
        if !valid_formats.contains(&self.logging.format.as_str()) {
            bail!(
                "Invalid log format '{}'. Must be one of: json, console",
                self.logging.format
            );
        }

        Ok(())
    }
}
