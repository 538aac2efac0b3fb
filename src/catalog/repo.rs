use std::collections::BTreeMap;

use sqlx::SqlitePool;

use super::{
    geo::{haversine_km, BoundingBox},
    repo_types::{
        City, CityRef, Country, CountryWithCities, NearbyPlace, Place, PlaceDetail, PlaceRow,
        PlaceWithLocation, PlaceWithLocationRow, SearchHit, SearchRow,
    },
};

pub const DEFAULT_RANDOM_COUNT: i64 = 6;
pub const DEFAULT_RADIUS_KM: f64 = 50.0;
pub const MAX_NEARBY: usize = 50;

const PLACE_COLUMNS: &str = "l.id, l.name, l.description, l.price, l.rating, l.latitude, \
     l.longitude, l.image1, l.image2, l.image3, l.city_id";

/// Select list + joins shared by every query returning [`PlaceWithLocationRow`].
pub(crate) fn place_with_location_select() -> String {
    format!(
        "SELECT {PLACE_COLUMNS}, c.name AS city, p.name AS country, p.id AS country_id, p.flag \
         FROM places l \
         JOIN cities c ON l.city_id = c.id \
         JOIN countries p ON c.country_id = p.id"
    )
}

impl Country {
    pub async fn list(db: &SqlitePool) -> sqlx::Result<Vec<Country>> {
        sqlx::query_as::<_, Country>("SELECT id, name, flag FROM countries ORDER BY name")
            .fetch_all(db)
            .await
    }

    pub async fn find(db: &SqlitePool, id: i64) -> sqlx::Result<Option<Country>> {
        sqlx::query_as::<_, Country>("SELECT id, name, flag FROM countries WHERE id = ?")
            .bind(id)
            .fetch_optional(db)
            .await
    }

    /// Countries ordered by name, each with its cities ordered by name.
    pub async fn list_with_cities(db: &SqlitePool) -> sqlx::Result<Vec<CountryWithCities>> {
        let rows: Vec<(i64, String, Option<String>, Option<i64>, Option<String>)> = sqlx::query_as(
            r#"
            SELECT p.id, p.name, p.flag, c.id, c.name
            FROM countries p
            LEFT JOIN cities c ON c.country_id = p.id
            ORDER BY p.name, p.id, c.name
            "#,
        )
        .fetch_all(db)
        .await?;

        let mut out: Vec<CountryWithCities> = Vec::new();
        for (id, name, flag, city_id, city_name) in rows {
            if out.last().map(|c| c.id) != Some(id) {
                out.push(CountryWithCities {
                    id,
                    name,
                    flag,
                    cities: Vec::new(),
                });
            }
            if let (Some(city_id), Some(city_name), Some(country)) = (city_id, city_name, out.last_mut()) {
                country.cities.push(CityRef {
                    id: city_id,
                    name: city_name,
                });
            }
        }
        Ok(out)
    }
}

impl City {
    pub async fn list(db: &SqlitePool) -> sqlx::Result<Vec<City>> {
        sqlx::query_as::<_, City>("SELECT id, name, country_id FROM cities ORDER BY name")
            .fetch_all(db)
            .await
    }

    /// City name for a place, empty when the place is unknown.
    pub async fn name_for_place(db: &SqlitePool, place_id: i64) -> sqlx::Result<String> {
        let row: Option<(String,)> = sqlx::query_as(
            r#"
            SELECT c.name
            FROM places l
            JOIN cities c ON l.city_id = c.id
            WHERE l.id = ?
            "#,
        )
        .bind(place_id)
        .fetch_optional(db)
        .await?;
        Ok(row.map(|(name,)| name).unwrap_or_default())
    }
}

impl Place {
    pub async fn list_by_city(db: &SqlitePool, city_id: i64) -> sqlx::Result<Vec<Place>> {
        if city_id <= 0 {
            return Ok(Vec::new());
        }
        let rows = sqlx::query_as::<_, PlaceRow>(&format!(
            "SELECT {PLACE_COLUMNS} FROM places l WHERE l.city_id = ? ORDER BY l.name"
        ))
        .bind(city_id)
        .fetch_all(db)
        .await?;
        Ok(rows.into_iter().map(Place::from).collect())
    }

    pub async fn find(db: &SqlitePool, id: i64) -> sqlx::Result<Option<Place>> {
        let row = sqlx::query_as::<_, PlaceRow>(&format!(
            "SELECT {PLACE_COLUMNS} FROM places l WHERE l.id = ?"
        ))
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(row.map(Place::from))
    }

    pub async fn categories(db: &SqlitePool, place_id: i64) -> sqlx::Result<Vec<String>> {
        let rows: Vec<(String,)> = sqlx::query_as(
            r#"
            SELECT c.name
            FROM categories c
            INNER JOIN place_categories pc ON pc.category_id = c.id
            WHERE pc.place_id = ?
            ORDER BY c.name
            "#,
        )
        .bind(place_id)
        .fetch_all(db)
        .await?;
        Ok(rows.into_iter().map(|(n,)| n).collect())
    }

    /// Every place with its city and country, ordered country, city, place.
    pub async fn list_with_location(db: &SqlitePool) -> sqlx::Result<Vec<PlaceWithLocation>> {
        let sql = format!(
            "{} ORDER BY p.name, c.name, l.name",
            place_with_location_select()
        );
        let rows = sqlx::query_as::<_, PlaceWithLocationRow>(&sql)
            .fetch_all(db)
            .await?;
        Ok(rows.into_iter().map(PlaceWithLocation::from).collect())
    }

    pub async fn random(db: &SqlitePool, count: i64) -> sqlx::Result<Vec<PlaceWithLocation>> {
        let sql = format!("{} ORDER BY RANDOM() LIMIT ?", place_with_location_select());
        let rows = sqlx::query_as::<_, PlaceWithLocationRow>(&sql)
            .bind(count.max(0))
            .fetch_all(db)
            .await?;
        Ok(rows.into_iter().map(PlaceWithLocation::from).collect())
    }

    /// Places within `radius_km` of the point, nearest first, at most [`MAX_NEARBY`].
    pub async fn nearby(
        db: &SqlitePool,
        lat: f64,
        lon: f64,
        radius_km: f64,
    ) -> sqlx::Result<Vec<NearbyPlace>> {
        let bbox = BoundingBox::around(lat, lon, radius_km);
        let sql = format!(
            "{} WHERE l.latitude BETWEEN ? AND ? AND l.longitude BETWEEN ? AND ?",
            place_with_location_select()
        );
        let rows = sqlx::query_as::<_, PlaceWithLocationRow>(&sql)
            .bind(bbox.min_lat)
            .bind(bbox.max_lat)
            .bind(bbox.min_lon)
            .bind(bbox.max_lon)
            .fetch_all(db)
            .await?;

        let mut hits: Vec<NearbyPlace> = rows
            .into_iter()
            .filter_map(|row| {
                let (plat, plon) = (row.place.latitude?, row.place.longitude?);
                let distance_km = haversine_km(lat, lon, plat, plon);
                (distance_km <= radius_km).then(|| NearbyPlace {
                    place: row.into(),
                    distance_km,
                })
            })
            .collect();
        hits.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));
        hits.truncate(MAX_NEARBY);
        Ok(hits)
    }

    pub async fn find_by_names(
        db: &SqlitePool,
        place: &str,
        city: &str,
        country: &str,
    ) -> sqlx::Result<Option<PlaceDetail>> {
        let sql = format!(
            "{} WHERE l.name = ? AND c.name = ? AND p.name = ? LIMIT 1",
            place_with_location_select()
        );
        let row = sqlx::query_as::<_, PlaceWithLocationRow>(&sql)
            .bind(place)
            .bind(city)
            .bind(country)
            .fetch_optional(db)
            .await?;
        Ok(row.map(|r| PlaceDetail {
            flag: r.flag,
            place: r.place.into(),
        }))
    }
}

/// Case-insensitive substring match over country, city and place names.
pub async fn search(db: &SqlitePool, text: &str) -> sqlx::Result<Vec<SearchHit>> {
    let pattern = format!("%{}%", text.to_lowercase());
    let rows = sqlx::query_as::<_, SearchRow>(
        r#"
        SELECT p.id AS country_id, p.name AS country, p.flag,
               c.id AS city_id, c.name AS city,
               l.id AS place_id, l.name AS place
        FROM countries p
        LEFT JOIN cities c ON c.country_id = p.id
        LEFT JOIN places l ON l.city_id = c.id
        WHERE LOWER(p.name) LIKE ? OR LOWER(c.name) LIKE ? OR LOWER(l.name) LIKE ?
        ORDER BY p.name, c.name, l.name
        "#,
    )
    .bind(&pattern)
    .bind(&pattern)
    .bind(&pattern)
    .fetch_all(db)
    .await?;
    Ok(rows.into_iter().map(SearchHit::from).collect())
}

/// Groups rows under a key, keeping row order inside each group.
pub(crate) fn group_by<T, K: Ord>(rows: Vec<T>, key: impl Fn(&T) -> Option<K>) -> BTreeMap<K, Vec<T>> {
    let mut out: BTreeMap<K, Vec<T>> = BTreeMap::new();
    for row in rows {
        if let Some(k) = key(&row) {
            out.entry(k).or_default().push(row);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{seed_catalog, test_pool};

    #[tokio::test]
    async fn countries_nest_sorted_cities_and_keep_empty_ones() {
        let db = test_pool().await;
        seed_catalog(&db).await;

        let countries = Country::list_with_cities(&db).await.unwrap();
        let names: Vec<&str> = countries.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["Iceland", "Japan", "Spain"]);
        assert!(countries[0].cities.is_empty());
        let spain: Vec<&str> = countries[2].cities.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(spain, ["Barcelona", "Madrid"]);
    }

    #[tokio::test]
    async fn places_by_city_collapse_images() {
        let db = test_pool().await;
        seed_catalog(&db).await;

        let places = Place::list_by_city(&db, 10).await.unwrap();
        assert_eq!(places[0].name, "Prado Museum");
        assert_eq!(places[0].images, ["prado1.jpg", "prado3.jpg"]);
        assert!(Place::list_by_city(&db, 0).await.unwrap().is_empty());
        assert!(Place::list_by_city(&db, -4).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn lookups_by_id() {
        let db = test_pool().await;
        seed_catalog(&db).await;

        assert_eq!(Place::find(&db, 200).await.unwrap().unwrap().name, "Kinkaku-ji");
        assert!(Place::find(&db, 999).await.unwrap().is_none());
        assert_eq!(Country::find(&db, 2).await.unwrap().unwrap().name, "Japan");
        assert_eq!(Place::categories(&db, 100).await.unwrap(), ["Museum"]);
        assert_eq!(City::name_for_place(&db, 110).await.unwrap(), "Barcelona");
        assert_eq!(City::name_for_place(&db, 999).await.unwrap(), "");
    }

    #[tokio::test]
    async fn search_reports_most_specific_id() {
        let db = test_pool().await;
        seed_catalog(&db).await;

        let hits = search(&db, "PRADO").await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, 100);
        assert_eq!(hits[0].city.as_deref(), Some("Madrid"));

        // country without cities reports the country id
        let hits = search(&db, "iceland").await.unwrap();
        assert_eq!(hits[0].id, 3);
        assert!(hits[0].city.is_none());
    }

    #[tokio::test]
    async fn random_respects_count() {
        let db = test_pool().await;
        seed_catalog(&db).await;
        assert_eq!(Place::random(&db, 2).await.unwrap().len(), 2);
        assert_eq!(Place::random(&db, DEFAULT_RANDOM_COUNT).await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn all_places_ordered_by_country_city_place() {
        let db = test_pool().await;
        seed_catalog(&db).await;
        let names: Vec<String> = Place::list_with_location(&db)
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.place.name)
            .collect();
        assert_eq!(names, ["Kinkaku-ji", "Sagrada Familia", "Prado Museum", "Retiro Park"]);
    }

    #[tokio::test]
    async fn nearby_includes_exact_point_and_drops_box_corners() {
        let db = test_pool().await;
        seed_catalog(&db).await;

        let hits = Place::nearby(&db, 40.4138, -3.6921, 1.0).await.unwrap();
        assert_eq!(hits[0].place.place.id, 100);
        assert!(hits[0].distance_km < 1e-6);
        assert_eq!(hits.len(), 2);

        // Retiro (~0.66 km away) sits inside the 0.65 km box but outside the circle
        let tight = Place::nearby(&db, 40.4138, -3.6921, 0.65).await.unwrap();
        let bbox = BoundingBox::around(40.4138, -3.6921, 0.65);
        assert!(40.4153 <= bbox.max_lat && -3.6845 <= bbox.max_lon);
        assert_eq!(tight.len(), 1);
    }

    #[tokio::test]
    async fn find_by_names_includes_flag() {
        let db = test_pool().await;
        seed_catalog(&db).await;
        let detail = Place::find_by_names(&db, "Sagrada Familia", "Barcelona", "Spain")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(detail.flag.as_deref(), Some("es.png"));
        assert_eq!(detail.place.images, ["sf.jpg", "sf2.jpg"]);
        assert!(Place::find_by_names(&db, "Sagrada Familia", "Madrid", "Spain")
            .await
            .unwrap()
            .is_none());
    }
}
