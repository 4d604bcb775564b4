use std::env;

use thiserror::Error;

const DEFAULT_API_BASE_URL: &str = "https://slack.com/api";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("SLACK_TOKEN is required in environment.")]
    MissingToken,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub token: String,
    pub api_base_url: String,
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let token = lookup("SLACK_TOKEN")
            .map(|token| token.trim().to_string())
            .filter(|token| !token.is_empty())
            .ok_or(ConfigError::MissingToken)?;

        let api_base_url = lookup("SLACK_API_BASE_URL")
            .filter(|url| !url.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());
        let api_base_url = api_base_url.trim().trim_end_matches('/').to_string();

        Ok(Self {
            token,
            api_base_url,
        })
    }
}
