use anyhow::Context;
use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use tracing::{debug, error};
use uuid::Uuid;

use super::{EmailMessage, MailError, Mailer, SendReceipt};
use crate::config::SmtpConfig;

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(cfg: &SmtpConfig, from: &str) -> anyhow::Result<Self> {
        let creds = Credentials::new(cfg.username.clone(), cfg.password.clone());
        // implicit TLS when SMTP_SECURE=true, STARTTLS otherwise
        let builder = if cfg.secure {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&cfg.host)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&cfg.host)
        }
        .with_context(|| format!("SMTP setup for {}", cfg.host))?;

        let transport = builder.port(cfg.port).credentials(creds).build();
        let from: Mailbox = from
            .parse()
            .with_context(|| format!("parse sender address {from:?}"))?;
        Ok(Self { transport, from })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, message: &EmailMessage) -> Result<SendReceipt, MailError> {
        let to: Mailbox = message
            .to
            .parse()
            .map_err(|e: lettre::address::AddressError| MailError::InvalidAddress(e.to_string()))?;
        let message_id = format!("<{}@travelle>", Uuid::new_v4());

        let email = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(message.subject.clone())
            .message_id(Some(message_id.clone()))
            .header(ContentType::TEXT_HTML)
            .body(message.html.clone())
            .map_err(|e| MailError::Build(e.to_string()))?;

        self.transport.send(email).await.map_err(|e| {
            error!(error = %e, to = %message.to, "smtp send failed");
            MailError::Transport(e.to_string())
        })?;
        debug!(to = %message.to, %message_id, "smtp message sent");
        Ok(SendReceipt { message_id })
    }
}
