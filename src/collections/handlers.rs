use std::collections::BTreeMap;

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tracing::instrument;

use super::{
    favorites::{self, FavoriteToggle},
    visits::{self, MonthGroup, VisitInput, VisitOutcome, VisitToggle, VisitedPlace},
};
use crate::{
    auth::{dto::SuccessResponse, extractors::{caller_id, AuthUser}},
    catalog::repo_types::PlaceWithLocation,
    error::AppResult,
    state::AppState,
};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FavoriteStatus {
    pub is_favorite: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitStatus {
    pub is_visited: bool,
}

pub fn collection_routes() -> Router<AppState> {
    Router::new()
        .route("/favorites", get(list_favorites))
        .route("/favorites/by-country", get(favorites_by_country))
        .route(
            "/favorites/:place_id",
            get(favorite_status).post(add_favorite).delete(remove_favorite),
        )
        .route("/favorites/:place_id/toggle", post(toggle_favorite))
        .route("/visits", get(list_visits))
        .route("/visits/by-country", get(visits_by_country))
        .route("/visits/by-month", get(visits_by_month))
        .route(
            "/visits/:place_id",
            get(visit_status).put(add_visit).delete(remove_visit),
        )
        .route("/visits/:place_id/toggle", post(toggle_visit))
}

#[instrument(skip(state, user))]
pub async fn list_favorites(
    State(state): State<AppState>,
    user: Option<AuthUser>,
) -> AppResult<Json<Vec<PlaceWithLocation>>> {
    Ok(Json(favorites::fetch_all(&state.db, caller_id(&user)).await?))
}

#[instrument(skip(state, user))]
pub async fn favorites_by_country(
    State(state): State<AppState>,
    user: Option<AuthUser>,
) -> AppResult<Json<BTreeMap<String, Vec<PlaceWithLocation>>>> {
    Ok(Json(favorites::by_country(&state.db, caller_id(&user)).await?))
}

#[instrument(skip(state, user))]
pub async fn favorite_status(
    State(state): State<AppState>,
    user: Option<AuthUser>,
    Path(place_id): Path<i64>,
) -> Json<FavoriteStatus> {
    let is_favorite = favorites::is_favorite(&state.db, caller_id(&user), place_id).await;
    Json(FavoriteStatus { is_favorite })
}

#[instrument(skip(state, user))]
pub async fn add_favorite(
    State(state): State<AppState>,
    user: Option<AuthUser>,
    Path(place_id): Path<i64>,
) -> Json<SuccessResponse> {
    let success = favorites::add(&state.db, caller_id(&user), place_id).await;
    Json(SuccessResponse { success })
}

#[instrument(skip(state, user))]
pub async fn remove_favorite(
    State(state): State<AppState>,
    user: Option<AuthUser>,
    Path(place_id): Path<i64>,
) -> Json<SuccessResponse> {
    let success = favorites::remove(&state.db, caller_id(&user), place_id).await;
    Json(SuccessResponse { success })
}

#[instrument(skip(state, user))]
pub async fn toggle_favorite(
    State(state): State<AppState>,
    user: Option<AuthUser>,
    Path(place_id): Path<i64>,
) -> AppResult<Json<FavoriteToggle>> {
    Ok(Json(
        favorites::toggle(&state.db, caller_id(&user), place_id).await?,
    ))
}

#[instrument(skip(state, user))]
pub async fn list_visits(
    State(state): State<AppState>,
    user: Option<AuthUser>,
) -> AppResult<Json<Vec<VisitedPlace>>> {
    Ok(Json(visits::fetch_all(&state.db, caller_id(&user)).await?))
}

#[instrument(skip(state, user))]
pub async fn visits_by_country(
    State(state): State<AppState>,
    user: Option<AuthUser>,
) -> AppResult<Json<BTreeMap<String, Vec<VisitedPlace>>>> {
    Ok(Json(visits::by_country(&state.db, caller_id(&user)).await?))
}

#[instrument(skip(state, user))]
pub async fn visits_by_month(
    State(state): State<AppState>,
    user: Option<AuthUser>,
) -> AppResult<Json<Vec<MonthGroup>>> {
    Ok(Json(visits::by_month(&state.db, caller_id(&user)).await?))
}

#[instrument(skip(state, user))]
pub async fn visit_status(
    State(state): State<AppState>,
    user: Option<AuthUser>,
    Path(place_id): Path<i64>,
) -> Json<VisitStatus> {
    let is_visited = visits::is_visited(&state.db, caller_id(&user), place_id).await;
    Json(VisitStatus { is_visited })
}

#[instrument(skip(state, user, payload))]
pub async fn add_visit(
    State(state): State<AppState>,
    user: Option<AuthUser>,
    Path(place_id): Path<i64>,
    payload: Option<Json<VisitInput>>,
) -> Json<VisitOutcome> {
    let input = payload.map(|Json(p)| p).unwrap_or_default();
    Json(visits::add(&state.db, caller_id(&user), place_id, input).await)
}

#[instrument(skip(state, user))]
pub async fn remove_visit(
    State(state): State<AppState>,
    user: Option<AuthUser>,
    Path(place_id): Path<i64>,
) -> Json<VisitOutcome> {
    Json(visits::remove(&state.db, caller_id(&user), place_id).await)
}

#[instrument(skip(state, user, payload))]
pub async fn toggle_visit(
    State(state): State<AppState>,
    user: Option<AuthUser>,
    Path(place_id): Path<i64>,
    payload: Option<Json<VisitInput>>,
) -> AppResult<Json<VisitToggle>> {
    let input = payload.map(|Json(p)| p).unwrap_or_default();
    Ok(Json(
        visits::toggle(&state.db, caller_id(&user), place_id, input).await?,
    ))
}
