//! HTTP access to the remote team API.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use super::TeamResponse;
use crate::config::AppConfig;
use crate::util::compact_text;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("team endpoint returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("undecodable team payload: {0}")]
    Payload(String),
    #[error("team request timed out after {0:?}")]
    Timeout(Duration),
    #[error("team document rejected: {0}")]
    Rejected(String),
}

/// Capability to retrieve the current team document
#[async_trait]
pub trait TeamFetcher: Send + Sync {
    async fn get_team(&self, tag: &str) -> Result<TeamResponse, FetchError>;
}

/// Fetches team documents over plain HTTP
#[derive(Debug, Clone)]
pub struct HttpTeamFetcher {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTeamFetcher {
    pub fn new(config: &AppConfig) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(config.fetch_timeout)
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
        })
    }

    fn team_url(&self, tag: &str) -> String {
        format!("{}/api/teams/{tag}", self.base_url)
    }
}

#[async_trait]
impl TeamFetcher for HttpTeamFetcher {
    async fn get_team(&self, tag: &str) -> Result<TeamResponse, FetchError> {
        let url = self.team_url(tag);
        tracing::debug!(%url, "Requesting team document");

        let response = self
            .client
            .get(&url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                body: compact_text(&body),
            });
        }

        serde_json::from_str(&body).map_err(|error| FetchError::Payload(error.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn team_url_joins_base_and_tag() {
        let config = AppConfig {
            api_base_url: "http://localhost:9000/".to_string(),
            ..AppConfig::default()
        };
        let fetcher = HttpTeamFetcher::new(&config).unwrap();
        assert_eq!(fetcher.team_url("FOLLY"), "http://localhost:9000/api/teams/FOLLY");
    }

    #[test]
    fn fetch_error_messages_name_the_cause() {
        let error = FetchError::Status {
            status: 503,
            body: "down".to_string(),
        };
        assert_eq!(error.to_string(), "team endpoint returned HTTP 503: down");
        assert!(FetchError::Timeout(Duration::from_secs(30))
            .to_string()
            .contains("timed out"));
    }
}
