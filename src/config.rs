//! Configuration management for open2do.
//!
//! Configuration can be set via environment variables:
//! - `DATA_DIR` - Optional. Root data directory. Defaults to `./data`.
//! - `IFLOW_COMMAND` - Optional. Assistant command name. Defaults to `iflow`.
//! - `IFLOW_TIMEOUT_SECS` - Optional. Upper bound per assistant call. Defaults to `60`.
//! - `HOST` - Optional. Server host. Defaults to `127.0.0.1`.
//! - `PORT` - Optional. Server port. Defaults to `8000`.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::store::DataPaths;

pub const DEFAULT_DATA_DIR: &str = "data";
pub const DEFAULT_ASSISTANT_COMMAND: &str = "iflow";
pub const DEFAULT_ASSISTANT_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8000;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Root of tasks.json, user_profile.json, task_folders/ and avatars/
    pub data_dir: PathBuf,

    /// External assistant command, invoked as `<cmd> -p <prompt>`
    pub assistant_command: String,

    /// Upper bound on a single assistant invocation
    pub assistant_timeout: Duration,

    /// Server host
    pub host: String,

    /// Server port
    pub port: u16,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if `PORT` or `IFLOW_TIMEOUT_SECS`
    /// is not a valid number.
    pub fn from_env() -> Result<Self, ConfigError> {
        let data_dir = std::env::var("DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_DATA_DIR));

        let assistant_command = std::env::var("IFLOW_COMMAND")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_ASSISTANT_COMMAND.to_string());

        let timeout_secs: u64 = parse_env("IFLOW_TIMEOUT_SECS", DEFAULT_ASSISTANT_TIMEOUT_SECS)?;
        if timeout_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "IFLOW_TIMEOUT_SECS".to_string(),
                "must be greater than zero".to_string(),
            ));
        }

        let host = std::env::var("HOST").unwrap_or_else(|_| DEFAULT_HOST.to_string());
        let port = parse_env("PORT", DEFAULT_PORT)?;

        Ok(Self {
            data_dir,
            assistant_command,
            assistant_timeout: Duration::from_secs(timeout_secs),
            host,
            port,
        })
    }

    /// Create a config with defaults rooted at `data_dir` (useful for testing).
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            assistant_command: DEFAULT_ASSISTANT_COMMAND.to_string(),
            assistant_timeout: Duration::from_secs(DEFAULT_ASSISTANT_TIMEOUT_SECS),
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
        }
    }

    pub fn paths(&self) -> DataPaths {
        DataPaths::new(&self.data_dir)
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_env<T>(name: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| ConfigError::InvalidValue(name.to_string(), format!("{}", e))),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_uses_defaults() {
        let config = Config::new("/tmp/open2do");
        assert_eq!(config.data_dir, PathBuf::from("/tmp/open2do"));
        assert_eq!(config.assistant_command, "iflow");
        assert_eq!(config.assistant_timeout, Duration::from_secs(60));
        assert_eq!(config.bind_addr(), "127.0.0.1:8000");
        assert_eq!(
            config.paths().tasks_file(),
            PathBuf::from("/tmp/open2do/tasks.json")
        );
    }

    #[test]
    fn parse_env_reports_variable_name() {
        std::env::set_var("OPEN2DO_TEST_BAD_NUMBER", "eight");
        let err = parse_env::<u16>("OPEN2DO_TEST_BAD_NUMBER", 1).unwrap_err();
        assert!(err.to_string().contains("OPEN2DO_TEST_BAD_NUMBER"));
        std::env::remove_var("OPEN2DO_TEST_BAD_NUMBER");

        assert_eq!(parse_env::<u16>("OPEN2DO_TEST_UNSET_NUMBER", 7).unwrap(), 7);
    }
}
