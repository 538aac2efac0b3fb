use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::{MailConfig, MailTransport};

pub mod endpoint;
pub mod handlers;
pub mod notifier;
pub mod resend;
pub mod smtp;
pub mod templates;

/// A fully rendered email, ready for any transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub html: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendReceipt {
    pub message_id: String,
}

#[derive(Error, Debug)]
pub enum MailError {
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("could not build message: {0}")]
    Build(String),

    #[error("template error: {0}")]
    Template(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("provider rejected message: {0}")]
    Rejected(String),
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> Result<SendReceipt, MailError>;
}

/// Development transport: logs the message and reports success.
#[derive(Clone, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, message: &EmailMessage) -> Result<SendReceipt, MailError> {
        info!(to = %message.to, subject = %message.subject, "development mode: email not sent");
        debug!(html = %message.html, "development mode email body");
        Ok(SendReceipt {
            message_id: format!("dev-{}", Uuid::new_v4()),
        })
    }
}

pub fn mailer_from_config(cfg: &MailConfig) -> anyhow::Result<Arc<dyn Mailer>> {
    let mailer: Arc<dyn Mailer> = match cfg.transport {
        MailTransport::Log => Arc::new(LogMailer),
        MailTransport::Smtp => Arc::new(smtp::SmtpMailer::new(&cfg.smtp, &cfg.from)?),
        MailTransport::Endpoint => {
            let url = cfg
                .endpoint_url
                .as_deref()
                .context("EMAIL_ENDPOINT_URL is required for the endpoint transport")?;
            Arc::new(endpoint::EndpointMailer::new(url))
        }
        MailTransport::Resend => {
            let key = cfg
                .resend_api_key
                .as_deref()
                .context("RESEND_API_KEY is required for the resend transport")?;
            Arc::new(resend::ResendMailer::new(key, &cfg.from))
        }
    };
    info!(transport = ?cfg.transport, "mail transport ready");
    Ok(mailer)
}
