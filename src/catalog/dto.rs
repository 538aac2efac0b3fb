use serde::{Deserialize, Serialize};

use super::repo::{DEFAULT_RADIUS_KM, DEFAULT_RANDOM_COUNT};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CountriesQuery {
    #[serde(default)]
    pub with_cities: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

#[derive(Debug, Deserialize)]
pub struct RandomQuery {
    #[serde(default = "default_count")]
    pub count: i64,
}

fn default_count() -> i64 {
    DEFAULT_RANDOM_COUNT
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NearbyQuery {
    pub lat: f64,
    pub lon: f64,
    #[serde(default = "default_radius")]
    pub radius_km: f64,
}

fn default_radius() -> f64 {
    DEFAULT_RADIUS_KM
}

#[derive(Debug, Deserialize)]
pub struct LookupQuery {
    pub place: String,
    pub city: String,
    pub country: String,
}

#[derive(Debug, Serialize)]
pub struct CityNameResponse {
    pub name: String,
}
