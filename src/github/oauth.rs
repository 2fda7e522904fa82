//! GitHub OAuth client: authorize URL construction and code exchange.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header;
use serde::Deserialize;
use tracing::warn;
use url::Url;

use crate::accounts::{ExchangeError, OauthProvider, ProviderIdentity};

const AUTHORIZE_URL: &str = "https://github.com/login/oauth/authorize";
const TOKEN_URL: &str = "https://github.com/login/oauth/access_token";
const USER_URL: &str = "https://api.github.com/user";

/// Scopes requested for the linked account. `repo` covers the permission
/// check on private repositories; `read:org` lets it see org repos.
const SCOPES: &str = "repo,read:org";

#[derive(Debug, Clone)]
pub struct GithubOauth {
    http: reqwest::Client,
    client_id: String,
    client_secret: String,
    redirect_url: String,
}

impl GithubOauth {
    pub fn new(client_id: String, client_secret: String, redirect_url: String) -> Self {
        // GitHub's API rejects requests without a User-Agent.
        let http = reqwest::Client::builder()
            .user_agent(concat!("gitgram/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(15))
            .build()
            .unwrap_or_default();
        GithubOauth {
            http,
            client_id,
            client_secret,
            redirect_url,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawTokenResponse {
    access_token: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawUser {
    id: i64,
    login: String,
}

#[async_trait]
impl OauthProvider for GithubOauth {
    fn authorize_url(&self, state: &str) -> String {
        // Static base URL; parsing cannot fail.
        let mut url = Url::parse(AUTHORIZE_URL).expect("valid authorize URL");
        url.query_pairs_mut()
            .append_pair("client_id", &self.client_id)
            .append_pair("redirect_uri", &self.redirect_url)
            .append_pair("scope", SCOPES)
            .append_pair("state", state);
        url.into()
    }

    async fn exchange_code(&self, code: &str) -> Result<ProviderIdentity, ExchangeError> {
        let response = self
            .http
            .post(TOKEN_URL)
            .header(header::ACCEPT, "application/json")
            .json(&serde_json::json!({
                "client_id": self.client_id,
                "client_secret": self.client_secret,
                "code": code,
            }))
            .send()
            .await
            .map_err(|e| ExchangeError::Http(e.to_string()))?;

        let token: RawTokenResponse = response
            .json()
            .await
            .map_err(|e| ExchangeError::Http(e.to_string()))?;

        let access_token = match (token.access_token, token.error) {
            (Some(t), _) if !t.is_empty() => t,
            (_, error) => {
                let reason = token
                    .error_description
                    .or(error)
                    .unwrap_or_else(|| "no access token in response".into());
                warn!(%reason, "oauth code exchange rejected");
                return Err(ExchangeError::Rejected(reason));
            }
        };

        let user: RawUser = self
            .http
            .get(USER_URL)
            .bearer_auth(&access_token)
            .send()
            .await
            .map_err(|e| ExchangeError::Http(e.to_string()))?
            .error_for_status()
            .map_err(|e| ExchangeError::Http(e.to_string()))?
            .json()
            .await
            .map_err(|e| ExchangeError::Http(e.to_string()))?;

        Ok(ProviderIdentity {
            provider_user_id: user.id.to_string(),
            provider_username: user.login,
            access_token,
        })
    }
}
