//! On-demand evaluation of a user's trip lists against today's date,
//! sending reminder or congratulation emails where a trip is close.

use serde::Serialize;
use time::Date;
use tracing::{debug, info, warn};

use crate::{session::Session, state::AppState, trips::store::TripListStore};

pub mod handlers;

pub use handlers::router;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReminderKind {
    Today,
    Tomorrow,
    ThreeDays,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReminderAction {
    Congratulate,
    Remind(ReminderKind),
}

/// Whole days from `today` until `start`; negative once the trip has begun.
pub fn day_offset(start: Date, today: Date) -> i64 {
    (start - today).whole_days()
}

pub fn classify(day_offset: i64, completion_percent: f64) -> Option<ReminderAction> {
    let complete = completion_percent >= 100.0;
    match (day_offset, complete) {
        (0, true) => Some(ReminderAction::Congratulate),
        (0, false) => Some(ReminderAction::Remind(ReminderKind::Today)),
        (1, false) => Some(ReminderAction::Remind(ReminderKind::Tomorrow)),
        (3, false) => Some(ReminderAction::Remind(ReminderKind::ThreeDays)),
        _ => None,
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReminderTally {
    pub reminders_sent: u32,
    pub congratulations_sent: u32,
    pub errors: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReminderReport {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub results: Option<ReminderTally>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lists_checked: Option<usize>,
}

impl ReminderReport {
    fn skipped(success: bool, reason: &'static str) -> Self {
        Self {
            success,
            reason: Some(reason),
            results: None,
            lists_checked: None,
        }
    }
}

/// Checks every list of the session user and sends whatever is due today.
/// Each send stands alone: a failure is counted and the run continues.
pub async fn run(state: &AppState, session: Option<&Session>, today: Date) -> ReminderReport {
    let Some(session) = session else {
        debug!("reminder run without a session");
        return ReminderReport::skipped(false, "user-not-authenticated");
    };
    let user = &session.user;

    let store = TripListStore::load(state.kv.clone(), user.id).await;
    let lists = store.sorted();
    if lists.is_empty() {
        return ReminderReport::skipped(true, "no-lists-available");
    }

    let mut tally = ReminderTally::default();
    for list in &lists {
        let offset = day_offset(list.start_date, today);
        let Some(action) = classify(offset, list.completion_percent()) else {
            continue;
        };
        let sent = match action {
            ReminderAction::Congratulate => state
                .notifier
                .send_trip_congratulations(&user.email, list)
                .await
                .map(|_| tally.congratulations_sent += 1),
            ReminderAction::Remind(kind) => state
                .notifier
                .send_trip_reminder(&user.email, list, kind)
                .await
                .map(|_| tally.reminders_sent += 1),
        };
        if let Err(e) = sent {
            warn!(error = %e, list_id = %list.id, ?action, "trip email failed");
            tally.errors += 1;
        }
    }

    info!(
        user_id = user.id,
        lists = lists.len(),
        reminders = tally.reminders_sent,
        congratulations = tally.congratulations_sent,
        errors = tally.errors,
        "reminder run finished"
    );
    ReminderReport {
        success: true,
        reason: None,
        results: Some(tally),
        lists_checked: Some(lists.len()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        testing::{signed_in, test_state, test_state_with_mailer, RecordingMailer},
        trips::model::{NewTripItem, NewTripList},
    };
    use std::sync::Arc;
    use time::{macros::date, Duration};

    const TODAY: Date = date!(2024 - 06 - 10);

    #[test]
    fn classification_table() {
        use ReminderAction::*;
        assert_eq!(classify(0, 100.0), Some(Congratulate));
        assert_eq!(classify(0, 40.0), Some(Remind(ReminderKind::Today)));
        assert_eq!(classify(1, 99.9), Some(Remind(ReminderKind::Tomorrow)));
        assert_eq!(classify(3, 0.0), Some(Remind(ReminderKind::ThreeDays)));
        assert_eq!(classify(1, 100.0), None);
        assert_eq!(classify(3, 100.0), None);
        assert_eq!(classify(2, 0.0), None);
        assert_eq!(classify(-1, 0.0), None);
    }

    #[test]
    fn offsets_use_calendar_days() {
        assert_eq!(day_offset(date!(2024 - 06 - 10), TODAY), 0);
        assert_eq!(day_offset(date!(2024 - 06 - 13), TODAY), 3);
        assert_eq!(day_offset(date!(2024 - 06 - 09), TODAY), -1);
    }

    async fn add_trip(state: &AppState, user_id: i64, name: &str, start: Date, items: &[bool]) {
        let mut store = TripListStore::load(state.kv.clone(), user_id).await;
        let list = store
            .create(NewTripList {
                name: name.into(),
                destination: name.into(),
                start_date: start,
                end_date: start + Duration::days(4),
            })
            .await;
        for (i, done) in items.iter().enumerate() {
            let item = store
                .add_item(&list.id, NewTripItem { text: format!("item {i}"), ..Default::default() })
                .await
                .unwrap();
            if *done {
                store.toggle_item(&list.id, &item.id).await.unwrap();
            }
        }
    }

    #[tokio::test]
    async fn without_session_nothing_is_sent() {
        let (state, mailer) = test_state().await;
        let report = run(&state, None, TODAY).await;
        assert!(!report.success);
        assert_eq!(report.reason, Some("user-not-authenticated"));
        assert!(mailer.sent().is_empty());
    }

    #[tokio::test]
    async fn empty_collection_reports_no_lists() {
        let (state, _) = test_state().await;
        let (user, _) = signed_in(&state, "ana").await;
        let session = state.sessions.current(user.id).await.unwrap();

        let report = run(&state, Some(&session), TODAY).await;
        assert!(report.success);
        assert_eq!(report.reason, Some("no-lists-available"));
    }

    #[tokio::test]
    async fn sends_one_email_per_due_list() {
        let (state, mailer) = test_state().await;
        let (user, _) = signed_in(&state, "ana").await;
        add_trip(&state, user.id, "Paris", TODAY, &[true, true]).await;
        add_trip(&state, user.id, "Berlin", TODAY, &[true, false]).await;
        add_trip(&state, user.id, "Porto", date!(2024 - 06 - 11), &[false]).await;
        add_trip(&state, user.id, "Cusco", date!(2024 - 06 - 13), &[]).await;
        add_trip(&state, user.id, "Quito", date!(2024 - 06 - 13), &[false]).await;
        add_trip(&state, user.id, "Bergen", date!(2024 - 06 - 12), &[false]).await;
        let session = state.sessions.current(user.id).await.unwrap();

        let report = run(&state, Some(&session), TODAY).await;
        assert_eq!(
            report.results,
            Some(ReminderTally {
                reminders_sent: 3,
                congratulations_sent: 1,
                errors: 0
            })
        );
        assert_eq!(report.lists_checked, Some(6));

        let sent = mailer.sent();
        assert_eq!(sent.len(), 4);
        assert!(sent.iter().all(|m| m.to == "ana@example.com"));
        assert!(sent.iter().any(|m| m.subject.contains("Berlin TODAY")));
        assert!(sent.iter().any(|m| m.subject.contains("Porto is TOMORROW")));
        assert!(sent.iter().any(|m| m.subject.contains("3 days until your trip to Quito")));
    }

    #[tokio::test]
    async fn transport_failures_are_counted() {
        let state = test_state_with_mailer(Arc::new(RecordingMailer::failing())).await;
        let (user, _) = signed_in(&state, "ana").await;
        add_trip(&state, user.id, "Berlin", TODAY, &[false]).await;
        add_trip(&state, user.id, "Paris", TODAY, &[]).await;
        let session = state.sessions.current(user.id).await.unwrap();

        let report = run(&state, Some(&session), TODAY).await;
        let tally = report.results.unwrap();
        assert_eq!(tally.errors, 2);
        assert_eq!(tally.reminders_sent + tally.congratulations_sent, 0);
        assert!(report.success);
    }
}
