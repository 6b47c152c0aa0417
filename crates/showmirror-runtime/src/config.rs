#![forbid(unsafe_code)]

//! Mirror configuration.
//!
//! ```toml
//! flush_interval_ms = 100
//!
//! [connection]
//! host = "127.0.0.1"
//! port = 7003
//! ```
//!
//! ```rust,ignore
//! let config = MirrorConfig::from_toml_file("showmirror.toml")?.validated()?;
//! ```
//!
//! Loading from TOML or JSON needs the `config` feature. The connection
//! section is carried for the transport that hosts the mirror; the mirror
//! itself only reads the flush interval.

#[cfg(feature = "config")]
use std::path::Path;

use web_time::Duration;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Address of the remote engine.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ConnectionConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 7003,
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct MirrorConfig {
    /// Minimum spacing between value flushes.
    pub flush_interval_ms: u64,
    pub connection: ConnectionConfig,
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            flush_interval_ms: 100,
            connection: ConnectionConfig::default(),
        }
    }
}

impl MirrorConfig {
    #[must_use]
    pub fn flush_interval(&self) -> Duration {
        Duration::from_millis(self.flush_interval_ms)
    }

    /// Load from a TOML string.
    #[cfg(feature = "config")]
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(ConfigError::Toml)
    }

    /// Load from a TOML file on disk.
    #[cfg(feature = "config")]
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(ConfigError::Io)?;
        Self::from_toml_str(&content)
    }

    /// Load from a JSON string.
    #[cfg(feature = "config")]
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(s).map_err(ConfigError::Json)
    }

    /// Load from a JSON file on disk.
    #[cfg(feature = "config")]
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(ConfigError::Io)?;
        Self::from_json_str(&content)
    }

    /// Check every field. An empty list means the config is valid.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.flush_interval_ms == 0 {
            errors.push("flush_interval_ms must be > 0".into());
        }
        if self.connection.host.trim().is_empty() {
            errors.push("connection.host must not be empty".into());
        }
        if self.connection.port == 0 {
            errors.push("connection.port must be > 0".into());
        }
        errors
    }

    /// Return `self` if [`validate`](Self::validate) finds nothing.
    pub fn validated(self) -> Result<Self, ConfigError> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(self)
        } else {
            Err(ConfigError::Validation(errors))
        }
    }
}

/// Errors that can occur when loading a configuration.
#[derive(Debug)]
pub enum ConfigError {
    /// I/O error reading a file.
    Io(std::io::Error),
    /// TOML parse error.
    #[cfg(feature = "config")]
    Toml(toml::de::Error),
    /// JSON parse error.
    #[cfg(feature = "config")]
    Json(serde_json::Error),
    /// Validation errors.
    Validation(Vec<String>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            #[cfg(feature = "config")]
            Self::Toml(e) => write!(f, "TOML parse error: {e}"),
            #[cfg(feature = "config")]
            Self::Json(e) => write!(f, "JSON parse error: {e}"),
            Self::Validation(errors) => {
                write!(f, "validation errors: {}", errors.join("; "))
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            #[cfg(feature = "config")]
            Self::Toml(e) => Some(e),
            #[cfg(feature = "config")]
            Self::Json(e) => Some(e),
            Self::Validation(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = MirrorConfig::default();
        assert!(config.validate().is_empty());
        assert_eq!(config.flush_interval(), Duration::from_millis(100));
        assert_eq!(config.connection.port, 7003);
    }

    #[test]
    fn validate_collects_every_error() {
        let config = MirrorConfig {
            flush_interval_ms: 0,
            connection: ConnectionConfig {
                host: "  ".into(),
                port: 0,
            },
        };
        let errors = config.validate();
        assert_eq!(errors.len(), 3);
        assert!(errors.iter().any(|e| e.contains("flush_interval_ms")));
        assert!(errors.iter().any(|e| e.contains("connection.host")));
    }

    #[test]
    fn validated_wraps_errors() {
        let config = MirrorConfig {
            flush_interval_ms: 0,
            ..MirrorConfig::default()
        };
        let err = config.validated().unwrap_err();
        assert!(matches!(err, ConfigError::Validation(ref e) if e.len() == 1));
        assert!(err.to_string().starts_with("validation errors"));
    }
}
