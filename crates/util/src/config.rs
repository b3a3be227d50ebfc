use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const ENV_URL: &str = "QBT_URL";
pub const ENV_USERNAME: &str = "QBT_USERNAME";
pub const ENV_PASSWORD: &str = "QBT_PASSWORD";
pub const ENV_TIMEOUT_SECS: &str = "QBT_TIMEOUT_SECS";

lazy_static! {
    /// `<config dir>/qbt-rebuild/config.json`, when the platform has a config dir.
    pub static ref DEFAULT_CONFIG_PATH: Option<PathBuf> =
        dirs::config_dir().map(|dir| dir.join("qbt-rebuild").join("config.json"));
}

/// Connection settings for the daemon's WebUI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub url: String,
    pub username: String,
    pub password: String,
    pub timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            url: "http://localhost:8080".to_string(),
            username: "admin".to_string(),
            password: String::new(),
            timeout_secs: 30,
        }
    }
}

/// Values given on the command line; they win over file and environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overrides {
    pub url: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub timeout_secs: Option<u64>,
}

impl Config {
    pub fn from_file(path: &Path) -> Result<Config> {
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        serde_json::from_str(&data)
            .with_context(|| format!("failed to parse config {}", path.display()))
    }

    /// Reads `path` if given, otherwise the default location if it exists.
    ///
    /// A missing explicit file is an error; a missing default file is not.
    pub fn load(path: Option<&Path>) -> Result<Config> {
        match path {
            Some(path) => Config::from_file(path),
            None => match DEFAULT_CONFIG_PATH.as_deref() {
                Some(default) if default.exists() => Config::from_file(default),
                _ => {
                    debug!("No config file, using defaults");
                    Ok(Config::default())
                }
            },
        }
    }

    /// Applies `QBT_*` variables looked up through `var`.
    pub fn apply_env<F>(&mut self, var: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = var(ENV_URL) {
            self.url = url;
        }
        if let Some(username) = var(ENV_USERNAME) {
            self.username = username;
        }
        if let Some(password) = var(ENV_PASSWORD) {
            self.password = password;
        }
        if let Some(timeout) = var(ENV_TIMEOUT_SECS) {
            self.timeout_secs = timeout
                .trim()
                .parse()
                .with_context(|| format!("{} must be a number of seconds", ENV_TIMEOUT_SECS))?;
        }
        Ok(())
    }

    pub fn apply(&mut self, overrides: Overrides) {
        if let Some(url) = overrides.url {
            self.url = url;
        }
        if let Some(username) = overrides.username {
            self.username = username;
        }
        if let Some(password) = overrides.password {
            self.password = password;
        }
        if let Some(timeout) = overrides.timeout_secs {
            self.timeout_secs = timeout;
        }
    }

    /// File, then process environment, then command line.
    pub fn resolve(path: Option<&Path>, overrides: Overrides) -> Result<Config> {
        let mut config = Config::load(path)?;
        config.apply_env(|key| std::env::var(key).ok())?;
        config.apply(overrides);
        Ok(config)
    }
}
