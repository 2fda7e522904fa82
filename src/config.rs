//! Process configuration, read from the environment at startup.

use std::net::SocketAddr;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub telegram_bot_token: String,
    pub github_client_id: String,
    pub github_client_secret: String,
    pub github_app_slug: String,
    pub webhook_secret: String,
    /// Public URL GitHub redirects the browser to after authorization.
    pub oauth_redirect_url: String,
    pub database_path: PathBuf,
    pub listen_addr: SocketAddr,
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ConfigError::Missing(name)),
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let listen_addr = match std::env::var("LISTEN_ADDR") {
            Ok(value) => value.parse().map_err(|_| ConfigError::Invalid {
                name: "LISTEN_ADDR",
                value,
            })?,
            Err(_) => SocketAddr::from(([0, 0, 0, 0], 3000)),
        };

        let database_path = std::env::var("DATABASE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("gitgram.db"));

        Ok(Config {
            telegram_bot_token: required("TELEGRAM_BOT_TOKEN")?,
            github_client_id: required("GITHUB_CLIENT_ID")?,
            github_client_secret: required("GITHUB_CLIENT_SECRET")?,
            github_app_slug: required("GITHUB_APP_SLUG")?,
            webhook_secret: required("GITHUB_WEBHOOK_SECRET")?,
            oauth_redirect_url: required("OAUTH_REDIRECT_URL")?,
            database_path,
            listen_addr,
        })
    }
}
