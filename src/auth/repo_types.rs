use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// User record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password: String, // Argon2 hash, or plaintext for accounts not yet migrated
    pub profile_photo: Option<String>,
}

/// Unused reset token joined with its owner's email.
#[derive(Debug, Clone, FromRow)]
pub struct ResetTokenRow {
    pub user_id: i64,
    pub email: String,
    pub expires_at: i64, // unix seconds
    pub attempts: i64,
}
