//! Repository permission checks against the GitHub API.
//!
//! The subscription flow asks "can this user administer or push to the repo"
//! using the user's own OAuth token. Any failure (network, 404, token revoked)
//! degrades to `None`: an unverifiable permission never grants access.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::types::RepoId;

/// Effective permission of a user on one repository, highest wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PermissionLevel {
    None,
    Read,
    Write,
    Admin,
}

impl PermissionLevel {
    /// Subscribing requires write access or better.
    pub fn can_subscribe(&self) -> bool {
        matches!(self, PermissionLevel::Admin | PermissionLevel::Write)
    }
}

/// Resolves a user's permission on a repository. Faked in tests.
#[async_trait]
pub trait PermissionGate: Send + Sync {
    async fn check_repo_permission(&self, access_token: &str, repo: &RepoId) -> PermissionLevel;
}

#[derive(Debug, Clone)]
pub struct GithubPermissions {
    http: reqwest::Client,
}

impl GithubPermissions {
    pub fn new() -> Self {
        let http = reqwest::Client::builder()
            .user_agent(concat!("gitgram/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(15))
            .build()
            .unwrap_or_default();
        GithubPermissions { http }
    }
}

impl Default for GithubPermissions {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Default, Deserialize)]
struct RawRepoPermissions {
    #[serde(default)]
    admin: bool,
    #[serde(default)]
    push: bool,
    #[serde(default)]
    pull: bool,
}

#[derive(Debug, Deserialize)]
struct RawRepoResponse {
    #[serde(default)]
    permissions: Option<RawRepoPermissions>,
}

fn level_from(permissions: &RawRepoPermissions) -> PermissionLevel {
    if permissions.admin {
        PermissionLevel::Admin
    } else if permissions.push {
        PermissionLevel::Write
    } else if permissions.pull {
        PermissionLevel::Read
    } else {
        PermissionLevel::None
    }
}

#[async_trait]
impl PermissionGate for GithubPermissions {
    async fn check_repo_permission(&self, access_token: &str, repo: &RepoId) -> PermissionLevel {
        let url = format!("https://api.github.com/repos/{}/{}", repo.owner, repo.repo);
        let response = self
            .http
            .get(&url)
            .bearer_auth(access_token)
            .header(header::ACCEPT, "application/vnd.github+json")
            .send()
            .await;

        let response = match response {
            Ok(r) => r,
            Err(e) => {
                warn!(repo = %repo, error = %e, "permission check request failed");
                return PermissionLevel::None;
            }
        };

        if !response.status().is_success() {
            // 404 also covers private repos the token cannot see.
            debug!(repo = %repo, status = %response.status(), "permission check denied");
            return PermissionLevel::None;
        }

        match response.json::<RawRepoResponse>().await {
            Ok(body) => level_from(&body.permissions.unwrap_or_default()),
            Err(e) => {
                warn!(repo = %repo, error = %e, "permission check body unreadable");
                PermissionLevel::None
            }
        }
    }
}
