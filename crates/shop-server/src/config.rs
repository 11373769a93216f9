//! Configuration for the shop TCP server.
//!
//! Settings come from a TOML file (every field optional) and are then
//! overridden by a few environment variables:
//!
//! - `SHOP_HOST`        (default: "0.0.0.0")
//! - `SHOP_PORT`        (default: "9000")
//! - `SHOP_BACKLOG`     (default: "5")
//! - `SHOP_MAX_CLIENTS` (default: "1024")
//! - `SHOP_DB_PATH`     (default: "data/db.json")
//!
//! ```toml
//! [server]
//! host = "127.0.0.1"
//! port = 9000
//! commands = ["BALANCE", "SHOPLIST", "INVENTORY", "BUY", "SELL"]
//!
//! [credits]
//! min = 10
//! max = 100
//! step = 5
//! ```

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context, Result};
use serde::Deserialize;
use shop_core::{BonusRange, Command};

/// File looked for in the working directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "shop.toml";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,

    /// Login bonus range.
    pub credits: BonusRange,

    pub store: StoreConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// IP address / interface to bind to (e.g. "0.0.0.0" or "127.0.0.1").
    pub host: String,

    /// TCP port to listen on.
    pub port: u16,

    /// Listen backlog handed to the OS.
    pub backlog: u32,

    /// Maximum number of simultaneously connected clients.
    pub max_clients: usize,

    /// Action names the dispatcher routes to handlers.
    pub commands: Vec<String>,

    /// Drop the user's session when a client disconnects without LOGOUT.
    pub release_on_disconnect: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            host: "0.0.0.0".to_string(),
            port: 9000,
            backlog: 5,
            max_clients: 1024,
            commands: Command::ALL.iter().map(|cmd| cmd.as_str().to_string()).collect(),
            release_on_disconnect: true,
        }
    }
}

impl ServerConfig {
    /// Convenience: `host:port` socket string.
    pub fn socket_addr_string(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Snapshot file.
    pub path: Option<PathBuf>,

    /// Keep everything in memory and never touch `path`.
    pub in_memory: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            path: Some(PathBuf::from("data/db.json")),
            in_memory: false,
        }
    }
}

impl StoreConfig {
    /// File to load and save, if any.
    pub fn snapshot_path(&self) -> Option<&Path> {
        if self.in_memory {
            return None;
        }
        self.path.as_deref()
    }
}

impl Config {
    /// Load from `path`, or from [`DEFAULT_CONFIG_FILE`] if it exists,
    /// or fall back to defaults; then apply environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => Config::default(),
        };

        config.apply_env(|key| env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        Self::from_toml_str(&text).with_context(|| format!("parsing config file {}", path.display()))
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Config = toml::from_str(text)?;
        config.credits.validate()?;
        Ok(config)
    }

    /// Override fields from `lookup` (normally the process environment).
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("SHOP_HOST") {
            self.server.host = host;
        }
        override_parsed(&lookup, "SHOP_PORT", &mut self.server.port)?;
        override_parsed(&lookup, "SHOP_BACKLOG", &mut self.server.backlog)?;
        override_parsed(&lookup, "SHOP_MAX_CLIENTS", &mut self.server.max_clients)?;
        if let Some(path) = lookup("SHOP_DB_PATH") {
            self.store.path = Some(PathBuf::from(path));
        }
        Ok(())
    }
}

fn override_parsed<F, T>(lookup: &F, key: &str, slot: &mut T) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    if let Some(val) = lookup(key) {
        *slot = val
            .parse::<T>()
            .with_context(|| format!("invalid value {:?} for {}", val, key))?;
    }
    Ok(())
}
