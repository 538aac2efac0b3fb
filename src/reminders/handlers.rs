use axum::{extract::State, routing::post, Json, Router};
use time::OffsetDateTime;
use tracing::instrument;

use super::{run, ReminderReport};
use crate::{auth::extractors::AuthUser, state::AppState};

pub fn router() -> Router<AppState> {
    Router::new().route("/trips/reminders", post(check_reminders))
}

#[instrument(skip(state, user))]
pub async fn check_reminders(
    State(state): State<AppState>,
    user: Option<AuthUser>,
) -> Json<ReminderReport> {
    let today = OffsetDateTime::now_utc().date();
    let session = user.map(|AuthUser(session)| session);
    Json(run(&state, session.as_ref(), today).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{read_json, signed_in, test_state};
    use axum::{body::Body, http::Request};
    use tower::ServiceExt;

    #[tokio::test]
    async fn anonymous_run_is_refused_in_body() {
        let (state, _) = test_state().await;
        let res = router()
            .with_state(state)
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/trips/reminders")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let body = read_json(res).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["reason"], "user-not-authenticated");
    }

    #[tokio::test]
    async fn signed_in_run_without_lists() {
        let (state, _) = test_state().await;
        let (_, bearer) = signed_in(&state, "ana").await;
        let res = router()
            .with_state(state)
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/trips/reminders")
                    .header("authorization", bearer)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let body = read_json(res).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["reason"], "no-lists-available");
    }
}
