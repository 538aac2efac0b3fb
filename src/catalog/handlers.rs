use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use tracing::instrument;

use super::{
    dto::{CityNameResponse, CountriesQuery, LookupQuery, NearbyQuery, RandomQuery, SearchQuery},
    repo,
    repo_types::{City, Country, NearbyPlace, Place, PlaceDetail, PlaceWithLocation, SearchHit},
};
use crate::{
    error::{AppError, AppResult},
    state::AppState,
};

pub fn catalog_routes() -> Router<AppState> {
    Router::new()
        .route("/countries", get(list_countries))
        .route("/countries/:id", get(get_country))
        .route("/cities", get(list_cities))
        .route("/cities/:id/places", get(places_by_city))
        .route("/places", get(all_places))
        .route("/places/random", get(random_places))
        .route("/places/nearby", get(nearby_places))
        .route("/places/lookup", get(lookup_place))
        .route("/places/:id", get(get_place))
        .route("/places/:id/categories", get(place_categories))
        .route("/places/:id/city", get(place_city))
        .route("/search", get(search))
}

#[instrument(skip(state))]
pub async fn list_countries(
    State(state): State<AppState>,
    Query(q): Query<CountriesQuery>,
) -> AppResult<Response> {
    if q.with_cities {
        Ok(Json(Country::list_with_cities(&state.db).await?).into_response())
    } else {
        Ok(Json(Country::list(&state.db).await?).into_response())
    }
}

#[instrument(skip(state))]
pub async fn get_country(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<Option<Country>>> {
    Ok(Json(Country::find(&state.db, id).await?))
}

#[instrument(skip(state))]
pub async fn list_cities(State(state): State<AppState>) -> AppResult<Json<Vec<City>>> {
    Ok(Json(City::list(&state.db).await?))
}

#[instrument(skip(state))]
pub async fn places_by_city(
    State(state): State<AppState>,
    Path(city_id): Path<i64>,
) -> AppResult<Json<Vec<Place>>> {
    Ok(Json(Place::list_by_city(&state.db, city_id).await?))
}

#[instrument(skip(state))]
pub async fn all_places(State(state): State<AppState>) -> AppResult<Json<Vec<PlaceWithLocation>>> {
    Ok(Json(Place::list_with_location(&state.db).await?))
}

#[instrument(skip(state))]
pub async fn random_places(
    State(state): State<AppState>,
    Query(q): Query<RandomQuery>,
) -> AppResult<Json<Vec<PlaceWithLocation>>> {
    Ok(Json(Place::random(&state.db, q.count).await?))
}

#[instrument(skip(state))]
pub async fn nearby_places(
    State(state): State<AppState>,
    Query(q): Query<NearbyQuery>,
) -> AppResult<Json<Vec<NearbyPlace>>> {
    if !(-90.0..=90.0).contains(&q.lat) || !(-180.0..=180.0).contains(&q.lon) {
        return Err(AppError::Validation("Coordinates out of range".into()));
    }
    if q.radius_km.is_nan() || q.radius_km <= 0.0 {
        return Err(AppError::Validation("Radius must be positive".into()));
    }
    Ok(Json(Place::nearby(&state.db, q.lat, q.lon, q.radius_km).await?))
}

#[instrument(skip(state))]
pub async fn lookup_place(
    State(state): State<AppState>,
    Query(q): Query<LookupQuery>,
) -> AppResult<Json<Option<PlaceDetail>>> {
    Ok(Json(
        Place::find_by_names(&state.db, &q.place, &q.city, &q.country).await?,
    ))
}

#[instrument(skip(state))]
pub async fn get_place(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<Option<Place>>> {
    Ok(Json(Place::find(&state.db, id).await?))
}

#[instrument(skip(state))]
pub async fn place_categories(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<Vec<String>>> {
    Ok(Json(Place::categories(&state.db, id).await?))
}

#[instrument(skip(state))]
pub async fn place_city(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<CityNameResponse>> {
    let name = City::name_for_place(&state.db, id).await?;
    Ok(Json(CityNameResponse { name }))
}

#[instrument(skip(state))]
pub async fn search(
    State(state): State<AppState>,
    Query(q): Query<SearchQuery>,
) -> AppResult<Json<Vec<SearchHit>>> {
    Ok(Json(repo::search(&state.db, q.q.trim()).await?))
}
