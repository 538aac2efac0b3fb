use handlebars::Handlebars;
use serde::Serialize;
use serde_json::json;
use time::{macros::format_description, Date, OffsetDateTime};

use super::MailError;
use crate::{reminders::ReminderKind, trips::model::TripList};

/// How many pending items a reminder lists before summarizing the rest.
pub const PENDING_PREVIEW: usize = 5;

/// Payload of one email kind. `SOURCE` is the body; the layout wraps it.
pub trait EmailTemplate: Serialize {
    const NAME: &'static str;
    const SOURCE: &'static str;

    fn subject(&self) -> String;
}

const LAYOUT: &str = r#"<div style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto; padding: 20px; border: 1px solid #e0e0e0; border-radius: 5px;">
  <div style="text-align: center; margin-bottom: 20px;">
    <h1 style="color: #1e3a8a;">Travelle</h1>
  </div>
  {{{body}}}
  <div style="margin-top: 30px; padding-top: 20px; border-top: 1px solid #e0e0e0; text-align: center; color: #777; font-size: 12px;">
    <p>This is an automated email, please do not reply to this message.</p>
    <p>&copy; {{year}} Travelle. All rights reserved.</p>
  </div>
</div>"#;

#[derive(Debug, Serialize)]
pub struct PasswordRecovery {
    pub reset_url: String,
}

impl EmailTemplate for PasswordRecovery {
    const NAME: &'static str = "password_recovery";
    const SOURCE: &'static str = r#"<h2 style="color: #1e3a8a; text-align: center;">Password Recovery</h2>
<p>Hello,</p>
<p>You asked to reset your Travelle password. Use the button below to choose a new one:</p>
<div style="text-align: center; margin: 30px 0;">
  <a href="{{reset_url}}" style="background-color: #1e3a8a; color: white; padding: 12px 24px; text-decoration: none; border-radius: 4px; font-weight: bold;">Reset password</a>
</div>
<p>Or copy this link into your browser:</p>
<p style="background-color: #f5f5f5; padding: 10px; border-radius: 4px; word-break: break-all;">{{reset_url}}</p>
<p>This link expires in 1 hour.</p>
<p>If you did not request this change, ignore this email and your password stays the same.</p>"#;

    fn subject(&self) -> String {
        "Password recovery - Travelle".to_string()
    }
}

#[derive(Debug, Serialize)]
pub struct SecurityAlert {}

impl EmailTemplate for SecurityAlert {
    const NAME: &'static str = "security_alert";
    const SOURCE: &'static str = r#"<p>We've detected multiple failed attempts to reset your password.</p>
<p>For security reasons, the reset link has been invalidated.</p>
<p>If this wasn't you, we recommend changing your password immediately.</p>"#;

    fn subject(&self) -> String {
        "Security Alert - Password Reset Attempts Exceeded".to_string()
    }
}

#[derive(Debug, Serialize)]
pub struct PasswordChanged {}

impl EmailTemplate for PasswordChanged {
    const NAME: &'static str = "password_changed";
    const SOURCE: &'static str = r#"<p>Your password has been successfully reset.</p>
<p>If you did not request this change, please contact our support team immediately.</p>"#;

    fn subject(&self) -> String {
        "Password Reset Successful".to_string()
    }
}

#[derive(Debug, Serialize)]
pub struct TripCongratulations {
    pub destination: String,
    pub start_date: String,
    pub end_date: String,
    pub list_url: String,
}

impl TripCongratulations {
    pub fn new(list: &TripList, base_url: &str) -> Self {
        Self {
            destination: list.destination.clone(),
            start_date: us_date(list.start_date),
            end_date: us_date(list.end_date),
            list_url: list_url(base_url, &list.id),
        }
    }
}

impl EmailTemplate for TripCongratulations {
    const NAME: &'static str = "trip_congratulations";
    const SOURCE: &'static str = r#"<h2 style="color: #1e3a8a; text-align: center;">Happy trip to {{destination}}! 🎉✈️</h2>
<p>Today is the big day! Your trip to {{destination}} starts today.</p>
<p>We're glad to see that you have everything ready for your adventure. You've completed all the items on your trip list.</p>
<div style="background-color: #f0f7ff; padding: 15px; border-radius: 5px; margin: 20px 0;">
  <p style="margin: 0; font-weight: bold;">Trip details:</p>
  <p style="margin: 5px 0;">🌍 Destination: {{destination}}</p>
  <p style="margin: 5px 0;">📅 Dates: {{start_date}} - {{end_date}}</p>
</div>
<p>We wish you an amazing trip full of wonderful experiences. Enjoy every moment!</p>
<div style="text-align: center; margin: 30px 0;">
  <a href="{{list_url}}" style="background-color: #1e3a8a; color: white; padding: 12px 24px; text-decoration: none; border-radius: 4px; font-weight: bold;">View my trip list</a>
</div>
<p>Have a great trip!</p>
<p>The Travelle Team</p>"#;

    fn subject(&self) -> String {
        format!("Happy trip to {}! 🎉✈️", self.destination)
    }
}

#[derive(Debug, Serialize)]
pub struct TripReminder {
    #[serde(skip)]
    pub kind: ReminderKind,
    pub destination: String,
    pub headline: String,
    pub intro: String,
    pub accent: &'static str,
    pub background: &'static str,
    pub completed_percent: u32,
    pub pending_count: usize,
    pub pending_preview: Vec<String>,
    pub remaining: usize,
    pub list_url: String,
}

impl TripReminder {
    pub fn new(kind: ReminderKind, list: &TripList, base_url: &str) -> Self {
        let dest = &list.destination;
        let (headline, intro, accent, background) = match kind {
            ReminderKind::Today => (
                format!("Your trip to {dest} is TODAY!"),
                format!("Today is the day of your trip to {dest}! However, we noticed that you still have pending items on your list."),
                "#e53e3e",
                "#fff5f5",
            ),
            ReminderKind::Tomorrow => (
                format!("Your trip to {dest} is TOMORROW!"),
                format!("Only one day left until your trip to {dest}! We've noticed that you still have pending items on your list."),
                "#dd6b20",
                "#fffaf0",
            ),
            ReminderKind::ThreeDays => (
                format!("3 days until your trip to {dest}!"),
                format!("Your trip to {dest} is getting closer. We've noticed that you still have pending items on your list."),
                "#3182ce",
                "#ebf8ff",
            ),
        };
        let pending: Vec<&str> = list.pending_items().map(|i| i.text.as_str()).collect();

        Self {
            kind,
            destination: dest.clone(),
            headline,
            intro,
            accent,
            background,
            completed_percent: list.completion_rounded(),
            pending_count: pending.len(),
            pending_preview: pending
                .iter()
                .take(PENDING_PREVIEW)
                .map(|s| s.to_string())
                .collect(),
            remaining: pending.len().saturating_sub(PENDING_PREVIEW),
            list_url: list_url(base_url, &list.id),
        }
    }
}

impl EmailTemplate for TripReminder {
    const NAME: &'static str = "trip_reminder";
    const SOURCE: &'static str = r#"<h2 style="color: {{accent}}; text-align: center;">{{headline}}</h2>
<p>{{intro}}</p>
<div style="background-color: {{background}}; padding: 15px; border-radius: 5px; margin: 20px 0; border-left: 4px solid {{accent}};">
  <p style="margin: 0; font-weight: bold;">List status:</p>
  <p style="margin: 5px 0;">✅ Completed: {{completed_percent}}%</p>
  <p style="margin: 5px 0;">⏰ Pending items: {{pending_count}}</p>
</div>
<p style="font-weight: bold;">Pending items:</p>
<ul style="background-color: #f7fafc; padding: 15px; border-radius: 5px;">
  {{#each pending_preview}}<li>{{this}}</li>{{/each}}
  {{#if remaining}}<li>... and {{remaining}} more items</li>{{/if}}
</ul>
<div style="text-align: center; margin: 30px 0;">
  <a href="{{list_url}}" style="background-color: {{accent}}; color: white; padding: 12px 24px; text-decoration: none; border-radius: 4px; font-weight: bold;">Complete my list now</a>
</div>
<p>We wish you an excellent trip!</p>
<p>The Travelle Team</p>"#;

    fn subject(&self) -> String {
        let dest = &self.destination;
        match self.kind {
            ReminderKind::Today => format!("URGENT! Pending items for your trip to {dest} TODAY ⚠️"),
            ReminderKind::Tomorrow => format!("Reminder: Your trip to {dest} is TOMORROW 🧳"),
            ReminderKind::ThreeDays => format!("Reminder: 3 days until your trip to {dest} 📝"),
        }
    }
}

pub fn list_url(base_url: &str, list_id: &str) -> String {
    format!("{base_url}/viajes/{list_id}")
}

pub fn reset_url(base_url: &str, token: &str) -> String {
    format!("{base_url}/reset-password/{token}")
}

/// `MM/DD/YYYY`
pub fn us_date(date: Date) -> String {
    let fmt = format_description!("[month]/[day]/[year]");
    date.format(&fmt).unwrap_or_else(|_| date.to_string())
}

/// Registry of every email body plus the shared layout.
pub struct Templates {
    hb: Handlebars<'static>,
}

impl Templates {
    pub fn new() -> Result<Self, MailError> {
        let mut hb = Handlebars::new();
        hb.set_strict_mode(true);
        hb.register_template_string("layout", LAYOUT)
            .map_err(|e| MailError::Template(e.to_string()))?;

        let mut templates = Self { hb };
        templates.register::<PasswordRecovery>()?;
        templates.register::<SecurityAlert>()?;
        templates.register::<PasswordChanged>()?;
        templates.register::<TripCongratulations>()?;
        templates.register::<TripReminder>()?;
        Ok(templates)
    }

    fn register<T: EmailTemplate>(&mut self) -> Result<(), MailError> {
        self.hb
            .register_template_string(T::NAME, T::SOURCE)
            .map_err(|e| MailError::Template(format!("{}: {e}", T::NAME)))
    }

    /// Renders the body and wraps it in the layout. Returns `(subject, html)`.
    pub fn render<T: EmailTemplate>(&self, payload: &T) -> Result<(String, String), MailError> {
        let body = self
            .hb
            .render(T::NAME, payload)
            .map_err(|e| MailError::Template(format!("{}: {e}", T::NAME)))?;
        let html = self
            .hb
            .render(
                "layout",
                &json!({ "body": body, "year": OffsetDateTime::now_utc().year() }),
            )
            .map_err(|e| MailError::Template(format!("layout: {e}")))?;
        Ok((payload.subject(), html))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trips::model::{NewTripItem, NewTripList, TripItem};
    use time::macros::date;

    fn list_with_items(n: usize, done: usize) -> TripList {
        let mut list = TripList::new(NewTripList {
            name: "Spring".into(),
            destination: "Kyoto".into(),
            start_date: date!(2024 - 06 - 10),
            end_date: date!(2024 - 06 - 17),
        });
        for i in 0..n {
            let mut item = TripItem::new(NewTripItem {
                text: format!("item {i}"),
                ..Default::default()
            });
            item.completed = i < done;
            list.items.push(item);
        }
        list
    }

    #[test]
    fn us_date_is_month_day_year() {
        assert_eq!(us_date(date!(2024 - 06 - 03)), "06/03/2024");
    }

    #[test]
    fn recovery_email_carries_reset_link() {
        let t = Templates::new().unwrap();
        let (subject, html) = t
            .render(&PasswordRecovery {
                reset_url: reset_url("https://travelle.app", "abc-123"),
            })
            .unwrap();
        assert_eq!(subject, "Password recovery - Travelle");
        assert!(html.contains("https://travelle.app/reset-password/abc-123"));
        assert!(html.contains("1 hour"));
        assert!(html.contains("All rights reserved"));
    }

    #[test]
    fn reminder_lists_first_five_pending_and_remainder() {
        let t = Templates::new().unwrap();
        let list = list_with_items(8, 1);
        let payload = TripReminder::new(ReminderKind::Today, &list, "http://localhost:5173");
        assert_eq!(payload.pending_count, 7);
        assert_eq!(payload.pending_preview.len(), 5);
        assert_eq!(payload.remaining, 2);

        let (subject, html) = t.render(&payload).unwrap();
        assert_eq!(subject, "URGENT! Pending items for your trip to Kyoto TODAY ⚠️");
        assert!(html.contains("<li>item 1</li>"));
        assert!(html.contains("<li>item 5</li>"));
        assert!(!html.contains("<li>item 6</li>"));
        assert!(html.contains("... and 2 more items"));
        assert!(html.contains("Completed: 13%"));
        assert!(html.contains(&format!("http://localhost:5173/viajes/{}", list.id)));
    }

    #[test]
    fn reminder_without_overflow_has_no_remainder_line() {
        let t = Templates::new().unwrap();
        let list = list_with_items(3, 1);
        let (subject, html) = t
            .render(&TripReminder::new(ReminderKind::ThreeDays, &list, "http://x"))
            .unwrap();
        assert_eq!(subject, "Reminder: 3 days until your trip to Kyoto 📝");
        assert!(!html.contains("more items"));
    }

    #[test]
    fn user_text_is_html_escaped() {
        let t = Templates::new().unwrap();
        let mut list = list_with_items(1, 0);
        list.items[0].text = "<script>x</script>".into();
        let (_, html) = t
            .render(&TripReminder::new(ReminderKind::Tomorrow, &list, "http://x"))
            .unwrap();
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
    }

    #[test]
    fn congratulations_shows_us_dates() {
        let t = Templates::new().unwrap();
        let list = list_with_items(0, 0);
        let (subject, html) = t
            .render(&TripCongratulations::new(&list, "http://x"))
            .unwrap();
        assert_eq!(subject, "Happy trip to Kyoto! 🎉✈️");
        assert!(html.contains("06/10/2024 - 06/17/2024"));
    }
}
