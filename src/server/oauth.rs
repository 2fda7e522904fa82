//! The OAuth callback endpoint.
//!
//! GitHub redirects the user's browser here after authorization. The
//! responses are small HTML pages since a person, not an API client, sees
//! them.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use serde::Deserialize;
use tracing::error;

use crate::accounts::LinkError;

use super::AppState;

#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    code: Option<String>,
    state: Option<String>,
}

fn page(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html><html><head><title>{title}</title></head>\
         <body><h1>{title}</h1><p>{body}</p></body></html>"
    )
}

pub async fn callback_handler(
    State(state): State<AppState>,
    Query(params): Query<CallbackParams>,
) -> Response {
    let (Some(code), Some(handshake_state)) = (params.code, params.state) else {
        return (
            StatusCode::BAD_REQUEST,
            Html(page("Missing parameters", "The callback URL is incomplete.")),
        )
            .into_response();
    };

    match state.linker().complete_handshake(&handshake_state, &code).await {
        Ok(identity) => (
            StatusCode::OK,
            Html(page(
                "Account linked",
                &format!(
                    "GitHub account <b>{}</b> is now linked. You can close this tab \
                     and return to Telegram.",
                    identity.provider_username
                ),
            )),
        )
            .into_response(),
        Err(LinkError::HandshakeNotFound) => (
            StatusCode::BAD_REQUEST,
            Html(page(
                "Link failed",
                "This link is unknown or was already used. Run /bind again.",
            )),
        )
            .into_response(),
        Err(LinkError::HandshakeExpired) => (
            StatusCode::BAD_REQUEST,
            Html(page(
                "Link expired",
                "This link expired. Run /bind again for a fresh one.",
            )),
        )
            .into_response(),
        Err(error) => {
            error!(%error, "oauth callback failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Html(page("Link failed", "Something went wrong. Run /bind again.")),
            )
                .into_response()
        }
    }
}
