use serde::Serialize;
use sqlx::FromRow;

#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct Country {
    pub id: i64,
    pub name: String,
    pub flag: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CountryWithCities {
    pub id: i64,
    pub name: String,
    pub flag: Option<String>,
    pub cities: Vec<CityRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CityRef {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct City {
    pub id: i64,
    pub name: String,
    pub country_id: i64,
}

/// Row shape of `places`; images are still three nullable columns.
#[derive(Debug, Clone, FromRow)]
pub struct PlaceRow {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub rating: Option<f64>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub image1: Option<String>,
    pub image2: Option<String>,
    pub image3: Option<String>,
    pub city_id: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Place {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub rating: Option<f64>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    /// Up to three image refs, in column order, missing ones skipped.
    pub images: Vec<String>,
    pub city_id: i64,
}

impl From<PlaceRow> for Place {
    fn from(r: PlaceRow) -> Self {
        Self {
            id: r.id,
            name: r.name,
            description: r.description,
            price: r.price,
            rating: r.rating,
            latitude: r.latitude,
            longitude: r.longitude,
            images: [r.image1, r.image2, r.image3]
                .into_iter()
                .flatten()
                .filter(|s| !s.is_empty())
                .collect(),
            city_id: r.city_id,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct PlaceWithLocationRow {
    #[sqlx(flatten)]
    pub place: PlaceRow,
    pub city: String,
    pub country: String,
    pub country_id: i64,
    pub flag: Option<String>,
}

/// A place with the names of the city and country it belongs to.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceWithLocation {
    #[serde(flatten)]
    pub place: Place,
    pub city: String,
    pub country: String,
    pub country_id: i64,
    pub flag: Option<String>,
}

impl From<PlaceWithLocationRow> for PlaceWithLocation {
    fn from(r: PlaceWithLocationRow) -> Self {
        Self {
            place: r.place.into(),
            city: r.city,
            country: r.country,
            country_id: r.country_id,
            flag: r.flag,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NearbyPlace {
    #[serde(flatten)]
    pub place: PlaceWithLocation,
    pub distance_km: f64,
}

/// Place found by its (place, city, country) names, with the country flag.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaceDetail {
    #[serde(flatten)]
    pub place: Place,
    pub flag: Option<String>,
}

#[derive(Debug, Clone, FromRow)]
pub struct SearchRow {
    pub country_id: i64,
    pub country: String,
    pub flag: Option<String>,
    pub city_id: Option<i64>,
    pub city: Option<String>,
    pub place_id: Option<i64>,
    pub place: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    /// Most specific id available: place, else city, else country.
    pub id: i64,
    pub country: String,
    pub flag: Option<String>,
    pub city: Option<String>,
    pub place: Option<String>,
}

impl From<SearchRow> for SearchHit {
    fn from(r: SearchRow) -> Self {
        Self {
            id: r.place_id.or(r.city_id).unwrap_or(r.country_id),
            country: r.country,
            flag: r.flag,
            city: r.city,
            place: r.place,
        }
    }
}
