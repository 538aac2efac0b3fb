use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use super::{EmailMessage, MailError, Mailer, SendReceipt};

/// Response body of an email dispatch endpoint.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointResponse {
    pub success: bool,
    pub message_id: Option<String>,
    pub error: Option<String>,
}

/// Posts `{to, subject, html}` to an HTTP email endpoint such as `/api/send-email`.
pub struct EndpointMailer {
    client: reqwest::Client,
    url: String,
}

impl EndpointMailer {
    pub fn new(url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.to_string(),
        }
    }
}

#[async_trait]
impl Mailer for EndpointMailer {
    async fn send(&self, message: &EmailMessage) -> Result<SendReceipt, MailError> {
        let res = self
            .client
            .post(&self.url)
            .json(message)
            .send()
            .await
            .map_err(|e| MailError::Transport(e.to_string()))?;

        let status = res.status();
        let raw = res
            .text()
            .await
            .map_err(|e| MailError::Transport(e.to_string()))?;
        let body = serde_json::from_str::<EndpointResponse>(&raw);

        if !status.is_success() {
            let reason = body
                .ok()
                .and_then(|b| b.error)
                .unwrap_or_else(|| format!("status {status}"));
            warn!(%status, error = %reason, "email endpoint refused message");
            return Err(MailError::Rejected(reason));
        }

        let body = body
            .map_err(|e| MailError::Transport(format!("unreadable endpoint response: {e}")))?;
        if !body.success {
            let reason = body.error.unwrap_or_else(|| "endpoint reported failure".into());
            warn!(%status, error = %reason, "email endpoint refused message");
            return Err(MailError::Rejected(reason));
        }
        debug!(to = %message.to, "email endpoint accepted message");
        Ok(SendReceipt {
            message_id: body.message_id.unwrap_or_default(),
        })
    }
}
