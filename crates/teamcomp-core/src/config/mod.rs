//! Runtime configuration for the collector.
//!
//! Values come from the process environment (optionally seeded from a `.env`
//! file by the binary). Every value has a default so a bare invocation scrapes
//! the default team into the default database location.

use std::collections::HashMap;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::util::{is_http_url, normalize_text_option};

pub const DEFAULT_TEAM_TAG: &str = "FOLLY";
pub const DEFAULT_TEAM_ID: i64 = 1_411_729;
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_API_BASE_URL: &str = "https://www.nitrotype.com";
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Settings consumed by the sync job and its collaborators
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Database file, `None` means the platform data directory
    pub db_path: Option<PathBuf>,
    /// Team tag passed to the remote API
    pub team_tag: String,
    /// Remote team id every fetched document must carry
    pub team_id: i64,
    /// Upper bound for one remote fetch
    pub fetch_timeout: Duration,
    /// Base URL of the remote API, without trailing slash
    pub api_base_url: String,
    /// User agent sent with every remote request
    pub user_agent: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: None,
            team_tag: DEFAULT_TEAM_TAG.to_string(),
            team_id: DEFAULT_TEAM_ID,
            fetch_timeout: Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let values: HashMap<String, String> = env::vars().collect();
        Self::from_lookup(|name| values.get(name).cloned())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let db_path = optional_trimmed(&lookup, "TEAMCOMP_DB_PATH").map(PathBuf::from);

        let team_tag = value_or_default(&lookup, "TEAMCOMP_TEAM_TAG", DEFAULT_TEAM_TAG);

        let team_id = match optional_trimmed(&lookup, "TEAMCOMP_TEAM_ID") {
            Some(value) => parse_team_id(&value)?,
            None => DEFAULT_TEAM_ID,
        };

        let timeout_secs = match optional_trimmed(&lookup, "TEAMCOMP_FETCH_TIMEOUT_SECS") {
            Some(value) => value.parse::<u64>().ok().filter(|secs| *secs > 0).ok_or_else(|| {
                ConfigError::Invalid(
                    "TEAMCOMP_FETCH_TIMEOUT_SECS must be a positive integer".to_string(),
                )
            })?,
            None => DEFAULT_FETCH_TIMEOUT_SECS,
        };

        let api_base_url = value_or_default(&lookup, "TEAMCOMP_API_BASE_URL", DEFAULT_API_BASE_URL)
            .trim_end_matches('/')
            .to_string();
        if !is_http_url(&api_base_url) {
            return Err(ConfigError::Invalid(
                "TEAMCOMP_API_BASE_URL must start with http:// or https://".to_string(),
            ));
        }

        let user_agent = value_or_default(&lookup, "TEAMCOMP_USER_AGENT", DEFAULT_USER_AGENT);

        Ok(Self {
            db_path,
            team_tag,
            team_id,
            fetch_timeout: Duration::from_secs(timeout_secs),
            api_base_url,
            user_agent,
        })
    }

    /// Apply command-line overrides on top of environment values.
    pub fn with_team(
        mut self,
        team_tag: Option<String>,
        team_id: Option<i64>,
    ) -> Result<Self, ConfigError> {
        if let Some(tag) = team_tag {
            self.team_tag = normalize_text_option(Some(tag)).ok_or_else(|| {
                ConfigError::Invalid("team tag must not be empty".to_string())
            })?;
        }
        if let Some(id) = team_id {
            if id <= 0 {
                return Err(ConfigError::Invalid(
                    "team id must be a positive integer".to_string(),
                ));
            }
            self.team_id = id;
        }
        Ok(self)
    }
}

fn parse_team_id(value: &str) -> Result<i64, ConfigError> {
    value
        .parse::<i64>()
        .ok()
        .filter(|id| *id > 0)
        .ok_or_else(|| {
            ConfigError::Invalid("TEAMCOMP_TEAM_ID must be a positive integer".to_string())
        })
}

fn value_or_default(lookup: impl Fn(&str) -> Option<String>, name: &str, default: &str) -> String {
    optional_trimmed(lookup, name).unwrap_or_else(|| default.to_string())
}

fn optional_trimmed(lookup: impl Fn(&str) -> Option<String>, name: &str) -> Option<String> {
    normalize_text_option(lookup(name))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use pretty_assertions::assert_eq;

    use super::*;

    fn config_from(pairs: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let map: HashMap<&str, &str> = pairs.iter().copied().collect();
        AppConfig::from_lookup(|key| map.get(key).map(|value| (*value).to_string()))
    }

    #[test]
    fn config_defaults_when_environment_is_empty() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn config_reads_overrides() {
        let config = config_from(&[
            ("TEAMCOMP_DB_PATH", "/tmp/teamcomp.db"),
            ("TEAMCOMP_TEAM_TAG", " NTR "),
            ("TEAMCOMP_TEAM_ID", "42"),
            ("TEAMCOMP_FETCH_TIMEOUT_SECS", "5"),
            ("TEAMCOMP_API_BASE_URL", "http://localhost:9000/"),
        ])
        .unwrap();

        assert_eq!(config.db_path, Some(PathBuf::from("/tmp/teamcomp.db")));
        assert_eq!(config.team_tag, "NTR");
        assert_eq!(config.team_id, 42);
        assert_eq!(config.fetch_timeout, Duration::from_secs(5));
        assert_eq!(config.api_base_url, "http://localhost:9000");
    }

    #[test]
    fn config_rejects_invalid_values() {
        let err = config_from(&[("TEAMCOMP_TEAM_ID", "abc")]).unwrap_err();
        assert!(err.to_string().contains("TEAMCOMP_TEAM_ID"));

        let err = config_from(&[("TEAMCOMP_FETCH_TIMEOUT_SECS", "0")]).unwrap_err();
        assert!(err.to_string().contains("TEAMCOMP_FETCH_TIMEOUT_SECS"));

        let err = config_from(&[("TEAMCOMP_API_BASE_URL", "ftp://example.com")]).unwrap_err();
        assert!(err.to_string().contains("TEAMCOMP_API_BASE_URL"));
    }

    #[test]
    fn with_team_overrides_environment() {
        let config = AppConfig::default()
            .with_team(Some("NTR".to_string()), Some(7))
            .unwrap();
        assert_eq!(config.team_tag, "NTR");
        assert_eq!(config.team_id, 7);

        assert!(AppConfig::default().with_team(Some("  ".to_string()), None).is_err());
        assert!(AppConfig::default().with_team(None, Some(0)).is_err());
    }
}
