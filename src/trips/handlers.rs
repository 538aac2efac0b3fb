use axum::{
    extract::{Path, State},
    routing::{get, patch, post},
    Json, Router,
};
use serde::Serialize;
use time::OffsetDateTime;
use tracing::{info, instrument};

use super::{
    model::{
        ItemCategory, NewTripItem, NewTripList, TripItem, TripItemPatch, TripList, TripListPatch,
        CATEGORIES,
    },
    store::TripListStore,
};
use crate::{
    auth::{dto::SuccessResponse, extractors::AuthUser},
    error::{AppError, AppResult},
    state::AppState,
};

/// A trip list as sent to clients, with its rounded completion.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TripListView {
    #[serde(flatten)]
    pub list: TripList,
    pub completion_percent: u32,
}

/// Lists plus the storage error, if the collection could not be read.
#[derive(Debug, Serialize)]
pub struct TripListsResponse {
    pub lists: Vec<TripListView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TripListsResponse {
    fn empty() -> Self {
        Self {
            lists: Vec::new(),
            error: None,
        }
    }

    fn from_store(store: &TripListStore, lists: Vec<TripList>) -> Self {
        Self {
            lists: lists.into_iter().map(TripListView::from).collect(),
            error: store.error().map(str::to_string),
        }
    }
}

impl From<TripList> for TripListView {
    fn from(list: TripList) -> Self {
        let completion_percent = list.completion_rounded();
        Self {
            list,
            completion_percent,
        }
    }
}

pub fn trip_routes() -> Router<AppState> {
    Router::new()
        .route("/trips", get(list_trips).post(create_trip))
        .route("/trips/upcoming", get(upcoming_trips))
        .route("/trips/categories", get(categories))
        .route(
            "/trips/:list_id",
            get(get_trip).patch(update_trip).delete(delete_trip),
        )
        .route("/trips/:list_id/items", post(add_item))
        .route(
            "/trips/:list_id/items/:item_id",
            patch(update_item).delete(delete_item),
        )
        .route("/trips/:list_id/items/:item_id/toggle", post(toggle_item))
}

async fn open_store(state: &AppState, user: &Option<AuthUser>) -> Option<TripListStore> {
    match user {
        Some(u) => Some(TripListStore::load(state.kv.clone(), u.id()).await),
        None => None,
    }
}

/// Fails the request if the last write did not reach storage.
fn persisted<T>(store: &TripListStore, value: T) -> AppResult<T> {
    match store.error() {
        Some(e) => Err(AppError::Storage(e.to_string())),
        None => Ok(value),
    }
}

#[instrument(skip(state, user))]
pub async fn list_trips(
    State(state): State<AppState>,
    user: Option<AuthUser>,
) -> Json<TripListsResponse> {
    let Some(store) = open_store(&state, &user).await else {
        return Json(TripListsResponse::empty());
    };
    Json(TripListsResponse::from_store(&store, store.sorted()))
}

#[instrument(skip(state, user))]
pub async fn upcoming_trips(
    State(state): State<AppState>,
    user: Option<AuthUser>,
) -> Json<TripListsResponse> {
    let Some(store) = open_store(&state, &user).await else {
        return Json(TripListsResponse::empty());
    };
    let today = OffsetDateTime::now_utc().date();
    Json(TripListsResponse::from_store(&store, store.upcoming(today)))
}

pub async fn categories() -> Json<[ItemCategory; 6]> {
    Json(CATEGORIES)
}

#[instrument(skip(state, user, payload))]
pub async fn create_trip(
    State(state): State<AppState>,
    user: Option<AuthUser>,
    Json(payload): Json<NewTripList>,
) -> AppResult<Json<Option<TripListView>>> {
    if payload.name.trim().is_empty() || payload.destination.trim().is_empty() {
        return Err(AppError::Validation("Name and destination are required".into()));
    }
    if payload.end_date < payload.start_date {
        return Err(AppError::Validation("End date is before start date".into()));
    }
    let Some(mut store) = open_store(&state, &user).await else {
        return Ok(Json(None));
    };
    let list = store.create(payload).await;
    let list = persisted(&store, list)?;
    info!(list_id = %list.id, "trip list created");
    Ok(Json(Some(list.into())))
}

#[instrument(skip(state, user))]
pub async fn get_trip(
    State(state): State<AppState>,
    user: Option<AuthUser>,
    Path(list_id): Path<String>,
) -> AppResult<Json<Option<TripListView>>> {
    let Some(store) = open_store(&state, &user).await else {
        return Ok(Json(None));
    };
    Ok(Json(Some(store.get(&list_id)?.clone().into())))
}

#[instrument(skip(state, user, payload))]
pub async fn update_trip(
    State(state): State<AppState>,
    user: Option<AuthUser>,
    Path(list_id): Path<String>,
    Json(payload): Json<TripListPatch>,
) -> AppResult<Json<Option<TripListView>>> {
    let Some(mut store) = open_store(&state, &user).await else {
        return Ok(Json(None));
    };
    let list = store.update(&list_id, payload).await?;
    Ok(Json(Some(persisted(&store, list)?.into())))
}

#[instrument(skip(state, user))]
pub async fn delete_trip(
    State(state): State<AppState>,
    user: Option<AuthUser>,
    Path(list_id): Path<String>,
) -> AppResult<Json<SuccessResponse>> {
    let Some(mut store) = open_store(&state, &user).await else {
        return Ok(Json(SuccessResponse { success: false }));
    };
    store.delete(&list_id).await?;
    persisted(&store, ())?;
    info!(%list_id, "trip list deleted");
    Ok(Json(SuccessResponse { success: true }))
}

#[instrument(skip(state, user, payload))]
pub async fn add_item(
    State(state): State<AppState>,
    user: Option<AuthUser>,
    Path(list_id): Path<String>,
    Json(payload): Json<NewTripItem>,
) -> AppResult<Json<Option<TripItem>>> {
    if payload.text.trim().is_empty() {
        return Err(AppError::Validation("Item text is required".into()));
    }
    let Some(mut store) = open_store(&state, &user).await else {
        return Ok(Json(None));
    };
    let item = store.add_item(&list_id, payload).await?;
    Ok(Json(Some(persisted(&store, item)?)))
}

#[instrument(skip(state, user, payload))]
pub async fn update_item(
    State(state): State<AppState>,
    user: Option<AuthUser>,
    Path((list_id, item_id)): Path<(String, String)>,
    Json(payload): Json<TripItemPatch>,
) -> AppResult<Json<Option<TripItem>>> {
    let Some(mut store) = open_store(&state, &user).await else {
        return Ok(Json(None));
    };
    let item = store.update_item(&list_id, &item_id, payload).await?;
    Ok(Json(Some(persisted(&store, item)?)))
}

#[instrument(skip(state, user))]
pub async fn delete_item(
    State(state): State<AppState>,
    user: Option<AuthUser>,
    Path((list_id, item_id)): Path<(String, String)>,
) -> AppResult<Json<SuccessResponse>> {
    let Some(mut store) = open_store(&state, &user).await else {
        return Ok(Json(SuccessResponse { success: false }));
    };
    store.delete_item(&list_id, &item_id).await?;
    persisted(&store, ())?;
    Ok(Json(SuccessResponse { success: true }))
}

#[instrument(skip(state, user))]
pub async fn toggle_item(
    State(state): State<AppState>,
    user: Option<AuthUser>,
    Path((list_id, item_id)): Path<(String, String)>,
) -> AppResult<Json<Option<TripItem>>> {
    let Some(mut store) = open_store(&state, &user).await else {
        return Ok(Json(None));
    };
    let item = store.toggle_item(&list_id, &item_id).await?;
    Ok(Json(Some(persisted(&store, item)?)))
}
