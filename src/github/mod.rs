//! GitHub API clients: OAuth code exchange, identity lookup, and repository
//! permission checks.

pub mod oauth;
pub mod permissions;

pub use oauth::GithubOauth;
pub use permissions::{GithubPermissions, PermissionGate, PermissionLevel};

/// The public page for installing the GitHub App on an account.
pub fn install_url(app_slug: &str) -> String {
    format!("https://github.com/apps/{app_slug}/installations/new")
}
