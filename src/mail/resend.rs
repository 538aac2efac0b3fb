use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::{EmailMessage, MailError, Mailer, SendReceipt};

const RESEND_URL: &str = "https://api.resend.com/emails";

#[derive(Serialize)]
struct ResendRequest<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    html: &'a str,
}

#[derive(Deserialize)]
struct ResendResponse {
    id: Option<String>,
    message: Option<String>,
}

pub struct ResendMailer {
    client: reqwest::Client,
    url: String,
    api_key: String,
    from: String,
}

impl ResendMailer {
    pub fn new(api_key: &str, from: &str) -> Self {
        Self::with_url(RESEND_URL, api_key, from)
    }

    pub fn with_url(url: &str, api_key: &str, from: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.to_string(),
            api_key: api_key.to_string(),
            from: from.to_string(),
        }
    }
}

#[async_trait]
impl Mailer for ResendMailer {
    async fn send(&self, message: &EmailMessage) -> Result<SendReceipt, MailError> {
        let res = self
            .client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&ResendRequest {
                from: &self.from,
                to: [&message.to],
                subject: &message.subject,
                html: &message.html,
            })
            .send()
            .await
            .map_err(|e| MailError::Transport(e.to_string()))?;

        let status = res.status();
        let raw = res
            .text()
            .await
            .map_err(|e| MailError::Transport(e.to_string()))?;
        let body = serde_json::from_str::<ResendResponse>(&raw);

        if !status.is_success() {
            let reason = body
                .ok()
                .and_then(|b| b.message)
                .unwrap_or_else(|| format!("status {status}"));
            warn!(%status, error = %reason, "resend refused message");
            return Err(MailError::Rejected(reason));
        }

        let body =
            body.map_err(|e| MailError::Transport(format!("unreadable resend response: {e}")))?;
        match body.id {
            Some(id) => Ok(SendReceipt { message_id: id }),
            None => {
                warn!(%status, "resend response without id");
                Err(MailError::Rejected("response carried no message id".into()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;

    async fn send_against(status: usize, body: &str) -> Result<SendReceipt, MailError> {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/emails")
            .match_header("authorization", "Bearer re_test")
            .match_body(Matcher::Json(json!({
                "from": "Travelle <noreply@travelle.test>",
                "to": ["ana@example.com"],
                "subject": "Hi",
                "html": "<p>hi</p>"
            })))
            .with_status(status)
            .with_header("content-type", "application/json")
            .with_body(body)
            .create_async()
            .await;

        let mailer = ResendMailer::with_url(
            &format!("{}/emails", server.url()),
            "re_test",
            "Travelle <noreply@travelle.test>",
        );
        let result = mailer
            .send(&EmailMessage {
                to: "ana@example.com".into(),
                subject: "Hi".into(),
                html: "<p>hi</p>".into(),
            })
            .await;
        mock.assert_async().await;
        result
    }

    #[tokio::test]
    async fn id_becomes_message_id() {
        let receipt = send_against(200, r#"{"id":"49a3999c"}"#).await.unwrap();
        assert_eq!(receipt.message_id, "49a3999c");
    }

    #[tokio::test]
    async fn success_without_id_is_rejected() {
        let err = send_against(200, "{}").await.unwrap_err();
        assert!(matches!(err, MailError::Rejected(_)));
    }

    #[tokio::test]
    async fn provider_message_is_surfaced() {
        let err = send_against(
            422,
            r#"{"statusCode":422,"name":"validation_error","message":"Invalid `from` field"}"#,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, MailError::Rejected(ref r) if r == "Invalid `from` field"));

        let err = send_against(500, "").await.unwrap_err();
        assert!(matches!(err, MailError::Rejected(ref r) if r.contains("500")));
    }

    #[tokio::test]
    async fn unreadable_success_body_is_a_transport_error() {
        let err = send_against(200, "<html>").await.unwrap_err();
        assert!(matches!(err, MailError::Transport(_)));
    }
}
