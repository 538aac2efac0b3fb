use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use time::{Date, OffsetDateTime};
use tracing::{debug, error};

use crate::{
    catalog::{
        repo::{group_by, place_with_location_select},
        repo_types::{PlaceWithLocation, PlaceWithLocationRow},
    },
    error::AppResult,
};

time::serde::format_description!(iso_date, Date, "[year]-[month]-[day]");

#[derive(Debug, FromRow)]
struct VisitRow {
    visit_id: i64,
    visit_date: Date,
    notes: String,
    #[sqlx(flatten)]
    place: PlaceWithLocationRow,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitedPlace {
    pub visit_id: i64,
    #[serde(with = "iso_date")]
    pub visit_date: Date,
    pub notes: String,
    #[serde(flatten)]
    pub place: PlaceWithLocation,
}

impl From<VisitRow> for VisitedPlace {
    fn from(r: VisitRow) -> Self {
        Self {
            visit_id: r.visit_id,
            visit_date: r.visit_date,
            notes: r.notes,
            place: r.place.into(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct VisitInput {
    #[serde(default, with = "iso_date::option")]
    pub date: Option<Date>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VisitOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl VisitOutcome {
    fn ok() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    fn failed(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(msg.into()),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitToggle {
    #[serde(flatten)]
    pub outcome: VisitOutcome,
    pub is_now_visited: bool,
    pub visits: Vec<VisitedPlace>,
}

/// One `YYYY-MM` bucket of visits.
#[derive(Debug, Serialize)]
pub struct MonthGroup {
    pub month: String,
    pub label: String,
    pub items: Vec<VisitedPlace>,
}

pub async fn fetch_all(db: &SqlitePool, user: Option<i64>) -> AppResult<Vec<VisitedPlace>> {
    let Some(user_id) = user else {
        return Ok(Vec::new());
    };
    let sql = place_with_location_select().replacen(
        "SELECT ",
        "SELECT v.id AS visit_id, v.visit_date, v.notes, ",
        1,
    ) + " JOIN visits v ON v.place_id = l.id WHERE v.user_id = ? ORDER BY v.visit_date DESC, v.id DESC";
    let rows = sqlx::query_as::<_, VisitRow>(&sql)
        .bind(user_id)
        .fetch_all(db)
        .await?;
    Ok(rows.into_iter().map(VisitedPlace::from).collect())
}

pub async fn is_visited(db: &SqlitePool, user: Option<i64>, place_id: i64) -> bool {
    let Some(user_id) = user else {
        return false;
    };
    let res: sqlx::Result<Option<(i64,)>> =
        sqlx::query_as("SELECT 1 FROM visits WHERE user_id = ? AND place_id = ?")
            .bind(user_id)
            .bind(place_id)
            .fetch_optional(db)
            .await;
    match res {
        Ok(row) => row.is_some(),
        Err(e) => {
            error!(error = %e, user_id, place_id, "visit lookup failed");
            false
        }
    }
}

/// Marks a place visited, replacing date and notes of an existing record.
pub async fn add(db: &SqlitePool, user: Option<i64>, place_id: i64, input: VisitInput) -> VisitOutcome {
    let Some(user_id) = user else {
        return VisitOutcome::failed("Not authenticated");
    };
    let date = input.date.unwrap_or_else(|| OffsetDateTime::now_utc().date());
    let notes = input.notes.unwrap_or_default();

    let res = sqlx::query(
        r#"
        INSERT INTO visits (user_id, place_id, visit_date, notes)
        VALUES (?, ?, ?, ?)
        ON CONFLICT (user_id, place_id)
        DO UPDATE SET visit_date = excluded.visit_date, notes = excluded.notes
        "#,
    )
    .bind(user_id)
    .bind(place_id)
    .bind(date)
    .bind(&notes)
    .execute(db)
    .await;

    match res {
        Ok(_) => {
            debug!(user_id, place_id, %date, "visit recorded");
            VisitOutcome::ok()
        }
        Err(e) => {
            error!(error = %e, user_id, place_id, "add visit failed");
            VisitOutcome::failed(e.to_string())
        }
    }
}

pub async fn remove(db: &SqlitePool, user: Option<i64>, place_id: i64) -> VisitOutcome {
    let Some(user_id) = user else {
        return VisitOutcome::failed("Not authenticated");
    };
    let res = sqlx::query("DELETE FROM visits WHERE user_id = ? AND place_id = ?")
        .bind(user_id)
        .bind(place_id)
        .execute(db)
        .await;
    match res {
        Ok(_) => VisitOutcome::ok(),
        Err(e) => {
            error!(error = %e, user_id, place_id, "remove visit failed");
            VisitOutcome::failed(e.to_string())
        }
    }
}

pub async fn toggle(
    db: &SqlitePool,
    user: Option<i64>,
    place_id: i64,
    input: VisitInput,
) -> AppResult<VisitToggle> {
    let was_visited = is_visited(db, user, place_id).await;
    let outcome = if was_visited {
        remove(db, user, place_id).await
    } else {
        add(db, user, place_id, input).await
    };
    let is_now_visited = if outcome.success { !was_visited } else { was_visited };
    Ok(VisitToggle {
        outcome,
        is_now_visited,
        visits: fetch_all(db, user).await?,
    })
}

pub async fn by_country(
    db: &SqlitePool,
    user: Option<i64>,
) -> AppResult<BTreeMap<String, Vec<VisitedPlace>>> {
    let rows = fetch_all(db, user).await?;
    Ok(group_by(rows, |v| {
        (!v.place.country.is_empty()).then(|| v.place.country.clone())
    }))
}

/// Visits bucketed by year and month, most recent month first.
pub async fn by_month(db: &SqlitePool, user: Option<i64>) -> AppResult<Vec<MonthGroup>> {
    let rows = fetch_all(db, user).await?;
    Ok(group_by_month(rows))
}

fn group_by_month(rows: Vec<VisitedPlace>) -> Vec<MonthGroup> {
    let grouped = group_by(rows, |v| Some(month_key(v.visit_date)));
    grouped
        .into_iter()
        .rev()
        .map(|(month, items)| MonthGroup {
            label: month_label(items[0].visit_date),
            month,
            items,
        })
        .collect()
}

fn month_key(date: Date) -> String {
    format!("{:04}-{:02}", date.year(), u8::from(date.month()))
}

/// e.g. `June 2024`
fn month_label(date: Date) -> String {
    format!("{} {}", date.month(), date.year())
}
