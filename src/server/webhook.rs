//! The GitHub webhook endpoint.
//!
//! Headers are extracted as options and validated inside the ingestion
//! pipeline, so the signature check always runs against the exact raw body
//! bytes.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use tracing::{error, warn};

use crate::ingress::IngressError;

use super::AppState;

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

pub async fn webhook_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let signature = header(&headers, "x-hub-signature-256");
    let event_kind = header(&headers, "x-github-event");
    let delivery_id = header(&headers, "x-github-delivery");

    match state
        .ingress()
        .ingest(&body, signature, event_kind, delivery_id)
        .await
    {
        Ok(()) => (StatusCode::OK, "OK").into_response(),
        Err(IngressError::MissingHeaders) => {
            warn!("webhook rejected, missing headers");
            (StatusCode::BAD_REQUEST, "missing webhook headers").into_response()
        }
        Err(IngressError::SignatureMismatch) => {
            warn!(event = event_kind, "webhook rejected, bad signature");
            (StatusCode::UNAUTHORIZED, "signature mismatch").into_response()
        }
        Err(error) => {
            error!(%error, event = event_kind, "webhook processing failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "internal error").into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::server::test_support::{test_app, WEBHOOK_SECRET};
    use crate::storage::Subscription;
    use crate::types::ChatId;
    use crate::webhooks::{compute_signature, format_signature_header};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn push_body() -> Vec<u8> {
        serde_json::json!({
            "ref": "refs/heads/main",
            "repository": {"name": "widgets", "owner": {"login": "acme"}},
            "sender": {"login": "octocat"},
            "commits": [],
            "head_commit": null
        })
        .to_string()
        .into_bytes()
    }

    fn signed(body: &[u8]) -> String {
        format_signature_header(&compute_signature(body, WEBHOOK_SECRET))
    }

    fn webhook_request(
        body: Vec<u8>,
        signature: Option<&str>,
        event: Option<&str>,
        delivery: Option<&str>,
    ) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/webhooks/github")
            .header("content-type", "application/json");
        if let Some(signature) = signature {
            builder = builder.header("x-hub-signature-256", signature);
        }
        if let Some(event) = event {
            builder = builder.header("x-github-event", event);
        }
        if let Some(delivery) = delivery {
            builder = builder.header("x-github-delivery", delivery);
        }
        builder.body(Body::from(body)).unwrap()
    }

    #[tokio::test]
    async fn valid_push_returns_200_and_delivers() {
        let (app, db, sender) = test_app(false).await;
        db.upsert_subscription(&Subscription {
            chat_id: 10,
            chat_kind: "private".into(),
            owner: "acme".into(),
            repo: "widgets".into(),
            wants_commit: true,
            wants_issue: false,
            wants_pr: false,
            created_by: 5,
        })
        .await
        .unwrap();

        let body = push_body();
        let signature = signed(&body);
        let response = app
            .oneshot(webhook_request(body, Some(&signature), Some("push"), Some("d-1")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&bytes[..], b"OK");

        let sent = sender.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, ChatId(10));
    }

    #[tokio::test]
    async fn missing_headers_return_400() {
        let (app, _, _) = test_app(false).await;
        let body = push_body();
        let signature = signed(&body);

        let response = app
            .clone()
            .oneshot(webhook_request(body.clone(), None, Some("push"), Some("d-1")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = app
            .oneshot(webhook_request(body, Some(&signature), None, Some("d-1")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn bad_signature_returns_401_without_delivery() {
        let (app, db, sender) = test_app(false).await;
        db.upsert_subscription(&Subscription {
            chat_id: 10,
            chat_kind: "private".into(),
            owner: "acme".into(),
            repo: "widgets".into(),
            wants_commit: true,
            wants_issue: false,
            wants_pr: false,
            created_by: 5,
        })
        .await
        .unwrap();

        let response = app
            .oneshot(webhook_request(
                push_body(),
                Some("sha256=0000"),
                Some("push"),
                Some("d-1"),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(sender.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn unknown_event_kind_still_returns_200() {
        let (app, _, sender) = test_app(false).await;
        let body = br#"{"zen": "Anything added dilutes everything else."}"#.to_vec();
        let signature = signed(&body);

        let response = app
            .oneshot(webhook_request(body, Some(&signature), Some("ping"), Some("d-1")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(sender.sent.lock().unwrap().is_empty());
    }
}
