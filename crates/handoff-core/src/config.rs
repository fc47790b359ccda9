//! Session configuration.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use handoff_common::{Error, Result};

/// Upper bound on the gathering window; past this the user is just waiting.
pub const MAX_GATHER_WINDOW_MS: u64 = 60_000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// STUN/TURN URLs handed to the peer connection.
    pub ice_servers: Vec<String>,

    /// How long each document waits for local candidates.
    pub gather_window_ms: u64,

    /// Label of the chat data channel.
    pub channel_label: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ice_servers: vec!["stun:stun.l.google.com:19302".to_string()],
            gather_window_ms: 3000,
            channel_label: "chat".to_string(),
        }
    }
}

impl SessionConfig {
    pub fn gather_window(&self) -> Duration {
        Duration::from_millis(self.gather_window_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if self.channel_label.trim().is_empty() {
            return Err(Error::config("data channel label cannot be empty"));
        }
        if self.gather_window_ms > MAX_GATHER_WINDOW_MS {
            return Err(Error::config(format!(
                "gather window {}ms exceeds {}ms",
                self.gather_window_ms, MAX_GATHER_WINDOW_MS
            )));
        }
        if let Some(bad) = self.ice_servers.iter().find(|url| {
            !(url.starts_with("stun:") || url.starts_with("turn:") || url.starts_with("turns:"))
        }) {
            return Err(Error::config(format!("unsupported ICE server URL: {bad}")));
        }
        Ok(())
    }

    /// Read a JSON config file. Missing fields keep their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = SessionConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.gather_window(), Duration::from_millis(3000));
        assert_eq!(config.channel_label, "chat");
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let empty_label = SessionConfig {
            channel_label: " ".into(),
            ..Default::default()
        };
        assert!(matches!(empty_label.validate(), Err(Error::Config(_))));

        let long_window = SessionConfig {
            gather_window_ms: MAX_GATHER_WINDOW_MS + 1,
            ..Default::default()
        };
        assert!(long_window.validate().is_err());

        let bad_url = SessionConfig {
            ice_servers: vec!["http://example.com".into()],
            ..Default::default()
        };
        assert!(bad_url.validate().is_err());
    }

    #[test]
    fn test_no_ice_servers_is_allowed() {
        let config = SessionConfig {
            ice_servers: vec![],
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_partial_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"gather_window_ms": 1500}}"#).unwrap();
        let config = SessionConfig::load(file.path()).unwrap();
        assert_eq!(config.gather_window_ms, 1500);
        assert_eq!(config.channel_label, "chat");
    }

    #[test]
    fn test_load_invalid_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        assert!(matches!(
            SessionConfig::load(file.path()),
            Err(Error::Serialization(_))
        ));
    }
}
