//! Configuration for chat connections.
//!
//! Resolution order: environment variables → config file → defaults.
//!
//! Config file location:
//!   1. $CHATTY_CONFIG (explicit override)
//!   2. $XDG_CONFIG_HOME/chatty/config.toml
//!   3. ~/.config/chatty/config.toml

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::wire::{AUTH_TIMEOUT_SECS, WRITE_TIMEOUT_SECS};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChattyConfig {
    pub connection: ConnectionSettings,
}

/// Per-connection timing and buffering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionSettings {
    /// Deadline for the credentials message, in milliseconds.
    pub auth_timeout_ms: u64,
    /// Deadline for writing one response, in milliseconds.
    pub write_timeout_ms: u64,
    /// Decoded requests buffered before the read pump blocks. 0 is treated as 1.
    pub request_buffer: usize,
    /// Responses buffered before `responses().send()` blocks. 0 is treated as 1.
    pub response_buffer: usize,
}

// ── Defaults ──────────────────────────────────────────────────────────────────

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            auth_timeout_ms: AUTH_TIMEOUT_SECS * 1000,
            write_timeout_ms: WRITE_TIMEOUT_SECS * 1000,
            request_buffer: 16,
            response_buffer: 16,
        }
    }
}

impl ConnectionSettings {
    pub fn auth_timeout(&self) -> Duration {
        Duration::from_millis(self.auth_timeout_ms)
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }

    /// Request channel capacity. Bounded channels need at least one slot.
    pub fn request_capacity(&self) -> usize {
        self.request_buffer.max(1)
    }

    pub fn response_capacity(&self) -> usize {
        self.response_buffer.max(1)
    }
}

// ── Path helpers ──────────────────────────────────────────────────────────────

fn config_dir() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| dirs_or_home().join(".config"))
        .join("chatty")
}

fn dirs_or_home() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
}

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {0}: {1}")]
    ReadFailed(PathBuf, std::io::Error),
    #[error("failed to parse {0}: {1}")]
    ParseFailed(PathBuf, toml::de::Error),
    #[error("failed to write {0}: {1}")]
    WriteFailed(PathBuf, std::io::Error),
    #[error("failed to serialize: {0}")]
    SerializeFailed(toml::ser::Error),
}

// ── Loading ───────────────────────────────────────────────────────────────────

impl ChattyConfig {
    /// Load config: env vars → file → defaults.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::file_path())
    }

    /// Load from an explicit path, falling back to defaults if it is absent.
    pub fn load_from(path: &std::path::Path) -> Result<Self, ConfigError> {
        let mut config = if path.exists() {
            let text = std::fs::read_to_string(path)
                .map_err(|e| ConfigError::ReadFailed(path.to_path_buf(), e))?;
            toml::from_str(&text).map_err(|e| ConfigError::ParseFailed(path.to_path_buf(), e))?
        } else {
            ChattyConfig::default()
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Config file path.
    pub fn file_path() -> PathBuf {
        std::env::var("CHATTY_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| config_dir().join("config.toml"))
    }

    /// Write default config if none exists. Returns the path.
    pub fn write_default_if_missing() -> Result<PathBuf, ConfigError> {
        let path = Self::file_path();
        if !path.exists() {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| ConfigError::WriteFailed(path.clone(), e))?;
            }
            let text = toml::to_string_pretty(&ChattyConfig::default())
                .map_err(ConfigError::SerializeFailed)?;
            std::fs::write(&path, text).map_err(|e| ConfigError::WriteFailed(path.clone(), e))?;
        }
        Ok(path)
    }

    /// Apply CHATTY_* env var overrides. Unparseable values are ignored.
    fn apply_env_overrides(&mut self) {
        let conn = &mut self.connection;
        override_from_env("CHATTY_CONNECTION__AUTH_TIMEOUT_MS", &mut conn.auth_timeout_ms);
        override_from_env("CHATTY_CONNECTION__WRITE_TIMEOUT_MS", &mut conn.write_timeout_ms);
        override_from_env("CHATTY_CONNECTION__REQUEST_BUFFER", &mut conn.request_buffer);
        override_from_env("CHATTY_CONNECTION__RESPONSE_BUFFER", &mut conn.response_buffer);
    }
}

fn override_from_env<T: std::str::FromStr>(key: &str, slot: &mut T) {
    if let Ok(v) = std::env::var(key) {
        if let Ok(parsed) = v.parse() {
            *slot = parsed;
        }
    }
}
