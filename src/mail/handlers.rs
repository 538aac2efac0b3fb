use axum::{
    body::Bytes,
    extract::State,
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    routing::any,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::{error, instrument};

use super::EmailMessage;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
struct SendEmailRequest {
    to: Option<String>,
    subject: Option<String>,
    html: Option<String>,
}

impl SendEmailRequest {
    fn into_message(self) -> Option<EmailMessage> {
        let present = |v: Option<String>| v.filter(|s| !s.trim().is_empty());
        Some(EmailMessage {
            to: present(self.to)?,
            subject: present(self.subject)?,
            html: present(self.html)?,
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SendEmailResponse {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    message_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl SendEmailResponse {
    fn failed(status: StatusCode, msg: impl Into<String>) -> Response {
        let body = Self {
            success: false,
            message_id: None,
            error: Some(msg.into()),
        };
        (status, Json(body)).into_response()
    }
}

pub fn router() -> Router<AppState> {
    Router::new().route("/send-email", any(send_email))
}

#[instrument(skip(state, body))]
async fn send_email(State(state): State<AppState>, method: Method, body: Bytes) -> Response {
    if method == Method::OPTIONS {
        return StatusCode::OK.into_response();
    }
    if method != Method::POST {
        return SendEmailResponse::failed(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed");
    }

    let request: SendEmailRequest = serde_json::from_slice(&body).unwrap_or_default();
    let Some(message) = request.into_message() else {
        return SendEmailResponse::failed(StatusCode::BAD_REQUEST, "Missing required fields");
    };

    match state.mailer.send(&message).await {
        Ok(receipt) => Json(SendEmailResponse {
            success: true,
            message_id: Some(receipt.message_id),
            error: None,
        })
        .into_response(),
        Err(e) => {
            error!(error = %e, to = %message.to, "error sending email");
            SendEmailResponse::failed(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{read_json, test_state_with_mailer, RecordingMailer};
    use axum::{body::Body, http::Request};
    use std::sync::Arc;
    use tower::ServiceExt;

    async fn call(mailer: Arc<RecordingMailer>, method: Method, body: &str) -> (StatusCode, serde_json::Value) {
        let state = test_state_with_mailer(mailer).await;
        let app = router().with_state(state);
        let res = app
            .oneshot(
                Request::builder()
                    .method(method)
                    .uri("/send-email")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = res.status();
        (status, read_json(res).await)
    }

    #[tokio::test]
    async fn post_sends_and_returns_message_id() {
        let mailer = Arc::new(RecordingMailer::default());
        let (status, body) = call(
            mailer.clone(),
            Method::POST,
            r#"{"to":"a@b.io","subject":"Hi","html":"<p>x</p>"}"#,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert!(body["messageId"].as_str().is_some());
        assert_eq!(mailer.sent()[0].subject, "Hi");
    }

    #[tokio::test]
    async fn missing_field_is_bad_request() {
        let mailer = Arc::new(RecordingMailer::default());
        let (status, body) = call(mailer.clone(), Method::POST, r#"{"to":"a@b.io","subject":"Hi"}"#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Missing required fields");
        assert!(mailer.sent().is_empty());
    }

    #[tokio::test]
    async fn get_is_not_allowed() {
        let (status, body) = call(Arc::new(RecordingMailer::default()), Method::GET, "").await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(body["error"], "Method not allowed");
    }

    #[tokio::test]
    async fn options_is_ok() {
        let (status, _) = call(Arc::new(RecordingMailer::default()), Method::OPTIONS, "").await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn transport_failure_is_server_error() {
        let (status, body) = call(
            Arc::new(RecordingMailer::failing()),
            Method::POST,
            r#"{"to":"a@b.io","subject":"Hi","html":"<p>x</p>"}"#,
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["success"], false);
    }
}
