//! Configuration management.
//!
//! Loads `${FACTSCROLL_HOME}/config.toml` with defaults for every field.
//! Environment variables and command-line flags are applied on top by
//! `main.rs`.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::proximity::DEFAULT_LOOKAHEAD;

pub mod paths {
    //! Path resolution for configuration, logs and the session record.
    //!
    //! FACTSCROLL_HOME resolution order:
    //! 1. FACTSCROLL_HOME environment variable (if set)
    //! 2. `<config_dir>/factscroll` (e.g. `~/.config/factscroll`)

    use std::path::PathBuf;

    const APP_DIR: &str = "factscroll";

    pub fn factscroll_home() -> PathBuf {
        if let Ok(home) = std::env::var("FACTSCROLL_HOME") {
            return PathBuf::from(home);
        }
        dirs::config_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join(APP_DIR)
    }

    pub fn config_path() -> PathBuf {
        factscroll_home().join("config.toml")
    }

    pub fn log_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join(APP_DIR)
    }

    /// Where the session record lives by default.
    ///
    /// `$XDG_RUNTIME_DIR` is removed when the OS login session ends, which
    /// gives the record the lifetime of a browser session.
    pub fn session_dir() -> PathBuf {
        match dirs::runtime_dir() {
            Some(dir) => dir.join(APP_DIR),
            None => std::env::temp_dir().join(format!("{APP_DIR}-session")),
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Backend base URL
    pub api_url: String,

    /// Items kept ready below the selection before fetching more
    pub lookahead: usize,

    /// Default tracing filter (overridden by FACTSCROLL_LOG)
    pub log_level: String,

    /// How long a status-bar notice stays visible, in seconds
    pub notice_secs: u64,

    /// Directory for the session record (defaults to the runtime dir)
    pub session_dir: Option<PathBuf>,

    /// Directory for log files (defaults to the local data dir)
    pub log_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: Self::DEFAULT_API_URL.to_string(),
            lookahead: DEFAULT_LOOKAHEAD,
            log_level: Self::DEFAULT_LOG_LEVEL.to_string(),
            notice_secs: Self::DEFAULT_NOTICE_SECS,
            session_dir: None,
            log_dir: None,
        }
    }
}

impl Config {
    const DEFAULT_API_URL: &'static str = "http://localhost:8080";
    const DEFAULT_LOG_LEVEL: &'static str = "info";
    const DEFAULT_NOTICE_SECS: u64 = 4;

    /// Loads configuration from the default config path.
    pub fn load() -> Result<Self> {
        Self::load_from(&paths::config_path())
    }

    /// Loads configuration from a specific path.
    /// Returns defaults if the file doesn't exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?;
            toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config from {}", path.display()))
        } else {
            Ok(Config::default())
        }
    }

    /// Replace the API URL if `url` is set.
    pub fn with_api_url(mut self, url: Option<String>) -> Self {
        if let Some(url) = url {
            self.api_url = url;
        }
        self
    }

    pub fn session_dir(&self) -> PathBuf {
        self.session_dir.clone().unwrap_or_else(paths::session_dir)
    }

    pub fn log_dir(&self) -> PathBuf {
        self.log_dir.clone().unwrap_or_else(paths::log_dir)
    }
}
