//! Listener configuration.
//!
//! The defaults reproduce the behaviour expected by existing clients; a TOML file may override
//! them:
//!
//! ```toml
//! readiness_poll_interval_ms = 1000
//! readiness_attempts = 10
//! request_read_timeout_ms = 10000
//! channel_prefix = "/tmp/.attach_pipe_"
//! thread_name = "Attach Listener"
//! ```

use std::{fs, path::Path, time::Duration};

use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unable to read configuration: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Settings of a [`Dispatcher`](crate::dispatcher::Dispatcher) and its listener thread.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ListenerConfig {
    /// Sleep between two readiness checks of a producer.
    pub readiness_poll_interval_ms: u64,
    /// Number of readiness checks before a producer gives up with `Disabled`.
    pub readiness_attempts: u32,
    /// How long the consumer waits for a V2 client to send its request.
    pub request_read_timeout_ms: u64,
    /// Name-space prefix every channel name must start with.
    pub channel_prefix: String,
    /// Name of the consumer thread.
    pub thread_name: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            readiness_poll_interval_ms: 1000,
            readiness_attempts: 10,
            request_read_timeout_ms: 10_000,
            channel_prefix: default_channel_prefix(),
            thread_name: "Attach Listener".to_owned(),
        }
    }
}

impl ListenerConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_toml_str(&fs::read_to_string(path)?)
    }

    pub fn readiness_poll_interval(&self) -> Duration {
        Duration::from_millis(self.readiness_poll_interval_ms)
    }

    pub fn request_read_timeout(&self) -> Duration {
        Duration::from_millis(self.request_read_timeout_ms)
    }
}

#[cfg(windows)]
fn default_channel_prefix() -> String {
    r"\\.\pipe\".to_owned()
}

#[cfg(not(windows))]
fn default_channel_prefix() -> String {
    let mut path = std::env::temp_dir();
    path.push(".attach_pipe_");
    path.to_string_lossy().into_owned()
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::io::Write;

    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn test_defaults() {
        let config = ListenerConfig::default();
        assert_eq!(config.readiness_poll_interval(), Duration::from_secs(1));
        assert_eq!(config.readiness_attempts, 10);
        assert_eq!(config.request_read_timeout(), Duration::from_secs(10));
        assert!(!config.channel_prefix.is_empty());
    }

    #[test]
    fn test_partial_toml() {
        let config = ListenerConfig::from_toml_str(
            r#"
            readiness_attempts = 3
            channel_prefix = "\\\\.\\pipe\\"
            "#,
        )
        .unwrap();
        assert_eq!(config.readiness_attempts, 3);
        assert_eq!(config.channel_prefix, r"\\.\pipe\");
        assert_eq!(config.readiness_poll_interval_ms, 1000);
        assert_eq!(config.thread_name, "Attach Listener");
    }

    #[test]
    fn test_unknown_key() {
        let res = ListenerConfig::from_toml_str("pool_size = 8");
        assert_matches!(res, Err(ConfigError::Parse(_)));
    }

    #[test]
    fn test_load_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "readiness_poll_interval_ms = 5").unwrap();
        let config = ListenerConfig::load(file.path()).unwrap();
        assert_eq!(config.readiness_poll_interval(), Duration::from_millis(5));

        let res = ListenerConfig::load(file.path().with_extension("missing"));
        assert_matches!(res, Err(ConfigError::Io(_)));
    }
}
