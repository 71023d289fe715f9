//! Server configuration management.
//!
//! Configuration is stored as TOML. Lookup order:
//! 1. `--config PATH`
//! 2. `$RAMSTASH_CONFIG`
//! 3. `~/.config/ramstash/server.toml` (Linux), `%APPDATA%/ramstash/server.toml` (Windows)
//! 4. built-in defaults
//!
//! A file named explicitly must exist; the default location is optional.

use std::net::{IpAddr, Ipv4Addr};
use std::path::{Path, PathBuf};

use anyhow::Context;
use ramstash_protocol::{DEFAULT_MAX_HEADER_SIZE, DEFAULT_PORT};
use ramstash_server::ServerConfig;
use ramstash_transfer::DEFAULT_MAX_UPLOAD_SIZE;
use serde::{Deserialize, Serialize};

/// Environment variable naming a configuration file.
pub const CONFIG_ENV: &str = "RAMSTASH_CONFIG";

/// Server configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Address to listen on.
    #[serde(default = "default_bind")]
    pub bind: IpAddr,

    /// TCP port (0 = auto-assign).
    #[serde(default = "default_port")]
    pub port: u16,

    /// Longest request header accepted, in bytes.
    #[serde(default = "default_max_header_size")]
    pub max_header_size: usize,

    /// Largest upload accepted, in bytes.
    #[serde(default = "default_max_upload_size")]
    pub max_upload_size: u64,
}

fn default_bind() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_max_header_size() -> usize {
    DEFAULT_MAX_HEADER_SIZE
}

fn default_max_upload_size() -> u64 {
    DEFAULT_MAX_UPLOAD_SIZE
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
            max_header_size: default_max_header_size(),
            max_upload_size: default_max_upload_size(),
        }
    }
}

impl Config {
    /// Loads configuration following the lookup order above.
    pub fn load(explicit: Option<&Path>) -> anyhow::Result<Self> {
        let env = std::env::var_os(CONFIG_ENV).map(PathBuf::from);
        match explicit.map(Path::to_path_buf).or(env) {
            Some(path) => Self::load_from(&path),
            None => match default_config_path() {
                Some(path) if path.exists() => Self::load_from(&path),
                _ => {
                    tracing::debug!("no configuration file, using defaults");
                    Ok(Self::default())
                }
            },
        }
    }

    /// Parses the TOML file at `path`.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("parsing config {}", path.display()))?;
        tracing::debug!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    pub fn to_server_config(&self) -> ServerConfig {
        ServerConfig {
            bind_addr: self.bind,
            port: self.port,
            max_header_size: self.max_header_size,
            max_upload_size: self.max_upload_size,
        }
    }
}

/// Returns the platform-specific configuration file path.
fn default_config_path() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA").map(|appdata| {
            PathBuf::from(appdata).join("ramstash").join("server.toml")
        })
    }

    #[cfg(not(target_os = "windows"))]
    {
        std::env::var_os("HOME").map(|home| {
            PathBuf::from(home)
                .join(".config")
                .join("ramstash")
                .join("server.toml")
        })
    }
}
