//! Webhook endpoint.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use joingate::update::Update;
use joingate::{EngineError, EngineHandle, TransportError};
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

#[derive(Debug, Error)]
pub enum WebhookError {
    /// The body is not an update. 400, nothing changes.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Handling the update crashed. 500.
    #[error(transparent)]
    Engine(#[from] EngineError),
}

impl WebhookError {
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::Transport(_) => StatusCode::BAD_REQUEST,
            Self::Engine(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for WebhookError {
    fn into_response(self) -> Response {
        // Generic bodies only; details go to the log.
        let message = match &self {
            Self::Transport(_) => "invalid update payload",
            Self::Engine(_) => "internal error",
        };
        (
            self.status_code(),
            Json(json!({ "status": "error", "error": message })),
        )
            .into_response()
    }
}

pub fn router(engine: EngineHandle) -> Router {
    Router::new()
        .route("/", get(liveness))
        .route("/webhook", post(receive))
        .with_state(engine)
}

async fn liveness() -> &'static str {
    "Joingate is running."
}

async fn receive(
    State(engine): State<EngineHandle>,
    body: Bytes,
) -> Result<Json<serde_json::Value>, WebhookError> {
    let update = parse_update(&body).inspect_err(|err| {
        warn!(error = %err, "Received empty or invalid update");
    })?;

    engine.emit_and_await(update).await.inspect_err(|err| {
        error!(error = %err, "Update handling failed");
    })?;

    Ok(Json(json!({ "status": "ok" })))
}

fn parse_update(body: &[u8]) -> Result<Update, TransportError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(TransportError::Empty);
    }
    Ok(serde_json::from_slice(body)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Method, Request};
    use joingate::{ChatId, EngineBuilder, UserId};
    use joingate_testing::RecordingOutbound;
    use tower::ServiceExt;

    fn app(outbound: &RecordingOutbound) -> (Router, EngineHandle) {
        let handle = EngineBuilder::new(outbound.clone()).build().start();
        (router(handle.clone()), handle)
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn post_webhook(body: impl Into<Body>) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri("/webhook")
            .header("content-type", "application/json")
            .body(body.into())
            .unwrap()
    }

    #[tokio::test]
    async fn liveness_is_plain_text() {
        let (app, _) = app(&RecordingOutbound::new());
        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"Joingate is running.");
    }

    #[tokio::test]
    async fn join_request_is_handled_before_responding() {
        let outbound = RecordingOutbound::new();
        let (app, handle) = app(&outbound);
        let update = json!({
            "update_id": 1,
            "chat_join_request": {
                "chat": {"id": -1001, "type": "supergroup", "title": "Acme"},
                "from": {"id": 42, "first_name": "Ada"},
                "date": 0
            }
        });

        let response = app.oneshot(post_webhook(update.to_string())).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, json!({"status": "ok"}));
        assert!(handle.store().contains(UserId(42)));
        assert_eq!(outbound.sent_to(ChatId(42)).len(), 1);
    }

    #[tokio::test]
    async fn unroutable_updates_still_get_ok() {
        let (app, _) = app(&RecordingOutbound::new());
        let response = app
            .oneshot(post_webhook(r#"{"update_id": 5, "poll": {"id": "1"}}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn malformed_json_is_a_client_error() {
        let (app, handle) = app(&RecordingOutbound::new());
        let response = app.oneshot(post_webhook("{not json")).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(response).await,
            json!({"status": "error", "error": "invalid update payload"})
        );
        assert!(handle.store().is_empty());
    }

    #[tokio::test]
    async fn empty_body_is_a_client_error() {
        let (app, _) = app(&RecordingOutbound::new());
        let response = app.oneshot(post_webhook("")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn get_on_webhook_is_not_allowed() {
        let (app, _) = app(&RecordingOutbound::new());
        let response = app
            .oneshot(Request::builder().uri("/webhook").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }
}
