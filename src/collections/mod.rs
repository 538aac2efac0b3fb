use crate::state::AppState;
use axum::Router;

pub mod favorites;
pub mod handlers;
pub mod visits;

pub fn router() -> Router<AppState> {
    handlers::collection_routes()
}
