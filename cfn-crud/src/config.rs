//! Run configuration.
//!
//! Values come from defaults, then environment variables, then whatever the
//! caller (normally the CLI) sets explicitly.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::errors::CrudError;

/// Environment variable overriding the poll interval, in milliseconds.
pub const POLL_INTERVAL_ENV: &str = "CFN_CRUD_POLL_INTERVAL_MS";

/// Environment variable overriding the debug log file path.
pub const LOG_FILE_ENV: &str = "CFN_CRUD_LOG_FILE";

/// Settings for one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Delay between status polls, in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Path of the debug log file.
    #[serde(default = "default_log_file")]
    pub log_file: PathBuf,
    /// Emit console logs as JSON.
    #[serde(default)]
    pub json_logs: bool,
    /// Provider region; the SDK default chain applies when unset.
    #[serde(default)]
    pub region: Option<String>,
    /// Named credentials profile.
    #[serde(default)]
    pub profile: Option<String>,
}

fn default_poll_interval_ms() -> u64 {
    5_000
}

fn default_log_file() -> PathBuf {
    PathBuf::from("cfn-crud.log")
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            log_file: default_log_file(),
            json_logs: false,
            region: None,
            profile: None,
        }
    }
}

impl RunConfig {
    /// Creates a configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults overridden by the process environment.
    pub fn from_env() -> Result<Self, CrudError> {
        Self::default().with_env(|name| std::env::var(name).ok())
    }

    /// Applies overrides from an environment lookup.
    pub fn with_env<F>(mut self, lookup: F) -> Result<Self, CrudError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(POLL_INTERVAL_ENV) {
            self.poll_interval_ms = raw.trim().parse().map_err(|_| {
                CrudError::Config(format!(
                    "{POLL_INTERVAL_ENV} must be a number of milliseconds, got '{raw}'"
                ))
            })?;
        }
        if let Some(path) = lookup(LOG_FILE_ENV).filter(|p| !p.is_empty()) {
            self.log_file = PathBuf::from(path);
        }
        Ok(self)
    }

    /// Sets the poll interval in milliseconds.
    #[must_use]
    pub const fn with_poll_interval_ms(mut self, millis: u64) -> Self {
        self.poll_interval_ms = millis;
        self
    }

    /// Sets the log file path.
    #[must_use]
    pub fn with_log_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_file = path.into();
        self
    }

    /// Enables or disables JSON console logs.
    #[must_use]
    pub const fn with_json_logs(mut self, json_logs: bool) -> Self {
        self.json_logs = json_logs;
        self
    }

    /// Sets the region.
    #[must_use]
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    /// Sets the credentials profile.
    #[must_use]
    pub fn with_profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = Some(profile.into());
        self
    }

    /// Poll interval as a duration.
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name: &str| vars.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = RunConfig::new();
        assert_eq!(config.poll_interval(), Duration::from_secs(5));
        assert_eq!(config.log_file, PathBuf::from("cfn-crud.log"));
        assert!(!config.json_logs);
        assert!(config.region.is_none());
    }

    #[test]
    fn test_env_overrides() {
        let config = RunConfig::new()
            .with_env(env(&[(POLL_INTERVAL_ENV, "250"), (LOG_FILE_ENV, "/tmp/run.log")]))
            .unwrap();
        assert_eq!(config.poll_interval_ms, 250);
        assert_eq!(config.log_file, PathBuf::from("/tmp/run.log"));
    }

    #[test]
    fn test_invalid_poll_interval() {
        let err = RunConfig::new()
            .with_env(env(&[(POLL_INTERVAL_ENV, "soon")]))
            .unwrap_err();
        assert!(err.to_string().contains(POLL_INTERVAL_ENV));
    }

    #[test]
    fn test_builder_wins_over_env() {
        let config = RunConfig::new()
            .with_env(env(&[(POLL_INTERVAL_ENV, "250")]))
            .unwrap()
            .with_poll_interval_ms(10)
            .with_region("eu-west-1")
            .with_profile("deploy");
        assert_eq!(config.poll_interval_ms, 10);
        assert_eq!(config.region.as_deref(), Some("eu-west-1"));
        assert_eq!(config.profile.as_deref(), Some("deploy"));
    }

    #[test]
    fn test_deserialize_partial() {
        let config: RunConfig = serde_json::from_str(r#"{"json_logs": true}"#).unwrap();
        assert!(config.json_logs);
        assert_eq!(config.poll_interval_ms, 5_000);
    }
}
