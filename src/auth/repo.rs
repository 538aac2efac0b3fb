use crate::auth::repo_types::{ResetTokenRow, User};
use sqlx::SqlitePool;

impl User {
    /// Find a user by email.
    pub async fn find_by_email(db: &SqlitePool, email: &str) -> sqlx::Result<Option<User>> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, name, email, password, profile_photo
            FROM users
            WHERE email = ?
            "#,
        )
        .bind(email)
        .fetch_optional(db)
        .await
    }

    pub async fn find_by_id(db: &SqlitePool, id: i64) -> sqlx::Result<Option<User>> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, name, email, password, profile_photo
            FROM users
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(db)
        .await
    }

    pub async fn email_exists(db: &SqlitePool, email: &str) -> sqlx::Result<bool> {
        let row: Option<(i64,)> = sqlx::query_as("SELECT id FROM users WHERE email = ?")
            .bind(email)
            .fetch_optional(db)
            .await?;
        Ok(row.is_some())
    }

    pub async fn username_exists(db: &SqlitePool, username: &str) -> sqlx::Result<bool> {
        let row: Option<(i64,)> = sqlx::query_as("SELECT id FROM users WHERE username = ?")
            .bind(username)
            .fetch_optional(db)
            .await?;
        Ok(row.is_some())
    }

    /// Create a new user with an already hashed password, returning its id.
    pub async fn create(
        db: &SqlitePool,
        username: &str,
        name: &str,
        email: &str,
        password_hash: &str,
    ) -> sqlx::Result<i64> {
        let res = sqlx::query(
            r#"
            INSERT INTO users (username, name, email, password)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(username)
        .bind(name)
        .bind(email)
        .bind(password_hash)
        .execute(db)
        .await?;
        Ok(res.last_insert_rowid())
    }

    /// Returns the number of rows touched.
    pub async fn update_password(
        db: &SqlitePool,
        id: i64,
        password_hash: &str,
    ) -> sqlx::Result<u64> {
        let res = sqlx::query("UPDATE users SET password = ? WHERE id = ?")
            .bind(password_hash)
            .bind(id)
            .execute(db)
            .await?;
        Ok(res.rows_affected())
    }
}

// ---- Password reset tokens ----

pub async fn delete_tokens_for_user(db: &SqlitePool, user_id: i64) -> sqlx::Result<()> {
    sqlx::query("DELETE FROM password_reset_tokens WHERE user_id = ?")
        .bind(user_id)
        .execute(db)
        .await?;
    Ok(())
}

pub async fn insert_token(
    db: &SqlitePool,
    user_id: i64,
    token: &str,
    expires_at: i64,
) -> sqlx::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO password_reset_tokens (user_id, token, expires_at, used, attempts)
        VALUES (?, ?, ?, 0, 0)
        "#,
    )
    .bind(user_id)
    .bind(token)
    .bind(expires_at)
    .execute(db)
    .await?;
    Ok(())
}

/// Unused token with its owner's email.
pub async fn find_unused_token(db: &SqlitePool, token: &str) -> sqlx::Result<Option<ResetTokenRow>> {
    sqlx::query_as::<_, ResetTokenRow>(
        r#"
        SELECT r.user_id, u.email, r.expires_at, r.attempts
        FROM password_reset_tokens r
        JOIN users u ON r.user_id = u.id
        WHERE r.token = ? AND r.used = 0
        "#,
    )
    .bind(token)
    .fetch_optional(db)
    .await
}

/// Spends one verification attempt if the token is unused and below `max`.
/// Returns false when the cap was already reached.
pub async fn consume_attempt(db: &SqlitePool, token: &str, max: i64) -> sqlx::Result<bool> {
    let res = sqlx::query(
        r#"
        UPDATE password_reset_tokens
        SET attempts = attempts + 1
        WHERE token = ? AND used = 0 AND attempts < ?
        "#,
    )
    .bind(token)
    .bind(max)
    .execute(db)
    .await?;
    Ok(res.rows_affected() == 1)
}

/// Returns false if the token was already used.
pub async fn mark_used(db: &SqlitePool, token: &str) -> sqlx::Result<bool> {
    let res = sqlx::query("UPDATE password_reset_tokens SET used = 1 WHERE token = ? AND used = 0")
        .bind(token)
        .execute(db)
        .await?;
    Ok(res.rows_affected() == 1)
}
