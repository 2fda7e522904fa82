//! HTTP surface: the webhook endpoint, the OAuth callback, and a health
//! probe.

pub mod health;
pub mod oauth;
pub mod webhook;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;

use crate::accounts::AccountLinker;
use crate::ingress::Ingress;

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    ingress: Ingress,
    linker: AccountLinker,
}

impl AppState {
    pub fn new(ingress: Ingress, linker: AccountLinker) -> Self {
        AppState {
            inner: Arc::new(AppStateInner { ingress, linker }),
        }
    }

    pub fn ingress(&self) -> &Ingress {
        &self.inner.ingress
    }

    pub fn linker(&self) -> &AccountLinker {
        &self.inner.linker
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/webhooks/github", post(webhook::webhook_handler))
        .route("/oauth/callback", get(oauth::callback_handler))
        .route("/health", get(health::health_handler))
        .with_state(state)
}
