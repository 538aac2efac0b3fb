use std::sync::Arc;

use tracing::{info, instrument};

use super::{
    templates::{
        reset_url, EmailTemplate, PasswordChanged, PasswordRecovery, SecurityAlert, Templates,
        TripCongratulations, TripReminder,
    },
    EmailMessage, MailError, Mailer, SendReceipt,
};
use crate::{reminders::ReminderKind, trips::model::TripList};

/// Renders the typed Travelle emails and hands them to the configured [`Mailer`].
pub struct Notifier {
    mailer: Arc<dyn Mailer>,
    templates: Templates,
    base_url: String,
}

impl Notifier {
    pub fn new(mailer: Arc<dyn Mailer>, base_url: &str) -> Result<Self, MailError> {
        Ok(Self {
            mailer,
            templates: Templates::new()?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn deliver<T: EmailTemplate>(&self, to: &str, payload: &T) -> Result<SendReceipt, MailError> {
        let (subject, html) = self.templates.render(payload)?;
        let receipt = self
            .mailer
            .send(&EmailMessage {
                to: to.to_string(),
                subject,
                html,
            })
            .await?;
        info!(template = T::NAME, message_id = %receipt.message_id, "email dispatched");
        Ok(receipt)
    }

    #[instrument(skip(self, token))]
    pub async fn send_password_recovery(&self, to: &str, token: &str) -> Result<SendReceipt, MailError> {
        let payload = PasswordRecovery {
            reset_url: reset_url(&self.base_url, token),
        };
        self.deliver(to, &payload).await
    }

    #[instrument(skip(self))]
    pub async fn send_security_alert(&self, to: &str) -> Result<SendReceipt, MailError> {
        self.deliver(to, &SecurityAlert {}).await
    }

    #[instrument(skip(self))]
    pub async fn send_password_changed(&self, to: &str) -> Result<SendReceipt, MailError> {
        self.deliver(to, &PasswordChanged {}).await
    }

    #[instrument(skip(self, list), fields(list_id = %list.id))]
    pub async fn send_trip_congratulations(
        &self,
        to: &str,
        list: &TripList,
    ) -> Result<SendReceipt, MailError> {
        self.deliver(to, &TripCongratulations::new(list, &self.base_url))
            .await
    }

    #[instrument(skip(self, list), fields(list_id = %list.id))]
    pub async fn send_trip_reminder(
        &self,
        to: &str,
        list: &TripList,
        kind: ReminderKind,
    ) -> Result<SendReceipt, MailError> {
        self.deliver(to, &TripReminder::new(kind, list, &self.base_url))
            .await
    }
}
