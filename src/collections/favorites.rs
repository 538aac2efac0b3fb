use std::collections::BTreeMap;

use serde::Serialize;
use sqlx::SqlitePool;
use tracing::{debug, error};

use crate::{
    catalog::{
        repo::{group_by, place_with_location_select},
        repo_types::{PlaceWithLocation, PlaceWithLocationRow},
    },
    error::AppResult,
};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FavoriteToggle {
    pub success: bool,
    pub is_favorite: bool,
    pub favorites: Vec<PlaceWithLocation>,
}

/// Favorites of the caller joined with city and country, ordered by place name.
pub async fn fetch_all(db: &SqlitePool, user: Option<i64>) -> AppResult<Vec<PlaceWithLocation>> {
    let Some(user_id) = user else {
        return Ok(Vec::new());
    };
    let sql = format!(
        "{} JOIN favorites f ON f.place_id = l.id WHERE f.user_id = ? ORDER BY l.name",
        place_with_location_select()
    );
    let rows = sqlx::query_as::<_, PlaceWithLocationRow>(&sql)
        .bind(user_id)
        .fetch_all(db)
        .await?;
    Ok(rows.into_iter().map(PlaceWithLocation::from).collect())
}

pub async fn is_favorite(db: &SqlitePool, user: Option<i64>, place_id: i64) -> bool {
    let Some(user_id) = user else {
        return false;
    };
    let res: sqlx::Result<Option<(i64,)>> =
        sqlx::query_as("SELECT 1 FROM favorites WHERE user_id = ? AND place_id = ?")
            .bind(user_id)
            .bind(place_id)
            .fetch_optional(db)
            .await;
    match res {
        Ok(row) => row.is_some(),
        Err(e) => {
            error!(error = %e, user_id, place_id, "favorite lookup failed");
            false
        }
    }
}

pub async fn add(db: &SqlitePool, user: Option<i64>, place_id: i64) -> bool {
    let Some(user_id) = user else {
        return false;
    };
    let res = sqlx::query("INSERT OR IGNORE INTO favorites (user_id, place_id) VALUES (?, ?)")
        .bind(user_id)
        .bind(place_id)
        .execute(db)
        .await;
    match res {
        Ok(_) => {
            debug!(user_id, place_id, "favorite added");
            true
        }
        Err(e) => {
            error!(error = %e, user_id, place_id, "add favorite failed");
            false
        }
    }
}

pub async fn remove(db: &SqlitePool, user: Option<i64>, place_id: i64) -> bool {
    let Some(user_id) = user else {
        return false;
    };
    let res = sqlx::query("DELETE FROM favorites WHERE user_id = ? AND place_id = ?")
        .bind(user_id)
        .bind(place_id)
        .execute(db)
        .await;
    match res {
        Ok(_) => {
            debug!(user_id, place_id, "favorite removed");
            true
        }
        Err(e) => {
            error!(error = %e, user_id, place_id, "remove favorite failed");
            false
        }
    }
}

pub async fn toggle(db: &SqlitePool, user: Option<i64>, place_id: i64) -> AppResult<FavoriteToggle> {
    let was = is_favorite(db, user, place_id).await;
    let success = if was {
        remove(db, user, place_id).await
    } else {
        add(db, user, place_id).await
    };
    Ok(FavoriteToggle {
        success,
        is_favorite: if success { !was } else { was },
        favorites: fetch_all(db, user).await?,
    })
}

/// Favorites keyed by country name, keys sorted alphabetically.
pub async fn by_country(
    db: &SqlitePool,
    user: Option<i64>,
) -> AppResult<BTreeMap<String, Vec<PlaceWithLocation>>> {
    let rows = fetch_all(db, user).await?;
    Ok(group_by(rows, |p| {
        (!p.country.is_empty()).then(|| p.country.clone())
    }))
}
