//! Configuration module for Lumen Core.
//!
//! Configuration precedence:
//! 1. CLI arguments (handled by the binary)
//! 2. Environment variables
//! 3. Config file (`--config`, or `./lumen.toml` when present)
//! 4. Defaults

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use lumen_models::{BackendType, GatewayConfig};
use serde::Deserialize;
use tracing::debug;

use crate::error::{CoreError, Result};

/// Config file picked up from the working directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "lumen.toml";

/// Server configuration.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ServerConfig {
    /// The address to bind the HTTP server to.
    #[serde(default = "default_address")]
    pub address: SocketAddr,
    /// Directory holding `index.html` and the other front-end assets.
    #[serde(default = "default_static_dir")]
    pub static_dir: PathBuf,
}

fn default_address() -> SocketAddr {
    // This is a compile-time constant, so unwrap is safe
    "127.0.0.1:8000".parse().expect("valid default address")
}

fn default_static_dir() -> PathBuf {
    PathBuf::from("static")
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { address: default_address(), static_dir: default_static_dir() }
    }
}

/// Root configuration for Lumen.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct Config {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Model gateway configuration.
    #[serde(default)]
    pub gateway: GatewayConfig,
}

impl Config {
    /// Create a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse configuration from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| CoreError::Config(e.to_string()))
    }

    /// Load configuration from a TOML file.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| CoreError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&content)
            .map_err(|e| CoreError::Config(format!("{}: {}", path.display(), e)))
    }

    /// Load configuration from the config file and the process environment.
    ///
    /// An explicit `path` must exist. Without one, `./lumen.toml` is read if present.
    #[allow(clippy::disallowed_methods)] // env::var is needed for configuration loading
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::load_from_file(path)?,
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    Self::load_from_file(default_path)?
                } else {
                    debug!("No config file found, using defaults");
                    Self::default()
                }
            }
        };

        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Apply environment overrides, resolving variables through `lookup`.
    ///
    /// Recognised variables: `LUMEN_ADDRESS`, `LUMEN_STATIC_DIR`, `LUMEN_BACKEND`,
    /// `GEMINI_API_KEY`. Empty values are ignored.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(address) = get("LUMEN_ADDRESS") {
            self.server.address = address.trim().parse()?;
        }
        if let Some(static_dir) = get("LUMEN_STATIC_DIR") {
            self.server.static_dir = PathBuf::from(static_dir);
        }
        if let Some(backend) = get("LUMEN_BACKEND") {
            self.gateway.backend = BackendType::from_str(&backend)?;
        }
        if let Some(api_key) = get("GEMINI_API_KEY") {
            self.gateway.api_key = Some(api_key);
        }

        Ok(())
    }
}
