use lazy_static::lazy_static;
use regex::Regex;
use time::{Duration, OffsetDateTime};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::{
    auth::{
        dto::{AuthResponse, JwtKeys, PublicUser, ResetOutcome, TokenCheck},
        password::{check_stored, hash_password, PasswordCheck},
        repo,
        repo_types::User,
    },
    error::{AppError, AppResult},
    state::AppState,
};

/// Verifications allowed per reset token before it is burned.
pub const MAX_RESET_ATTEMPTS: i64 = 3;
pub const RESET_TOKEN_TTL: Duration = Duration::hours(1);
pub const MIN_PASSWORD_LEN: usize = 8;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub(crate) fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

fn check_password_len(password: &str) -> AppResult<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        warn!("password too short");
        return Err(AppError::Validation(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

fn issue_tokens(state: &AppState, user: PublicUser) -> AppResult<AuthResponse> {
    let keys = JwtKeys::from(&state.config.jwt);
    Ok(AuthResponse {
        access_token: keys.sign_access(user.id)?,
        refresh_token: keys.sign_refresh(user.id)?,
        user,
    })
}

pub async fn login(state: &AppState, email: &str, password: &str) -> AppResult<AuthResponse> {
    let email = normalize_email(email);
    if !is_valid_email(&email) {
        warn!(%email, "invalid email");
        return Err(AppError::Validation("Invalid email".into()));
    }

    let Some(user) = User::find_by_email(&state.db, &email).await? else {
        warn!(%email, "login unknown email");
        return Err(AppError::InvalidCredentials);
    };

    match check_stored(password, &user.password)? {
        PasswordCheck::Valid => {}
        PasswordCheck::ValidLegacy => {
            let hash = hash_password(password)?;
            User::update_password(&state.db, user.id, &hash).await?;
            info!(user_id = user.id, "legacy password migrated to argon2");
        }
        PasswordCheck::Invalid => {
            warn!(%email, user_id = user.id, "login invalid password");
            return Err(AppError::InvalidCredentials);
        }
    }

    let public = PublicUser::from(user);
    state
        .sessions
        .establish(public.clone())
        .await
        .map_err(|e| AppError::Storage(e.to_string()))?;
    info!(user_id = public.id, email = %public.email, "user logged in");
    issue_tokens(state, public)
}

pub async fn register(
    state: &AppState,
    username: &str,
    name: &str,
    email: &str,
    password: &str,
) -> AppResult<AuthResponse> {
    let email = normalize_email(email);
    let username = username.trim();
    if !is_valid_email(&email) {
        warn!(%email, "invalid email");
        return Err(AppError::Validation("Invalid email".into()));
    }
    if username.is_empty() {
        return Err(AppError::Validation("Username is required".into()));
    }
    check_password_len(password)?;

    if User::email_exists(&state.db, &email).await? {
        warn!(%email, "email already registered");
        return Err(AppError::DuplicateEmail);
    }
    if User::username_exists(&state.db, username).await? {
        warn!(%username, "username already taken");
        return Err(AppError::DuplicateUsername);
    }

    let hash = hash_password(password)?;
    let id = User::create(&state.db, username, name.trim(), &email, &hash)
        .await
        .map_err(map_unique_violation)?;

    let user = User::find_by_id(&state.db, id)
        .await?
        .ok_or(AppError::NotFound("user"))?;
    let public = PublicUser::from(user);
    state
        .sessions
        .establish(public.clone())
        .await
        .map_err(|e| AppError::Storage(e.to_string()))?;
    info!(user_id = public.id, email = %public.email, "user registered");
    issue_tokens(state, public)
}

/// A concurrent insert can still hit the unique indexes after the checks.
fn map_unique_violation(e: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db_err) = &e {
        if db_err.is_unique_violation() {
            return if db_err.message().contains("users.username") {
                AppError::DuplicateUsername
            } else {
                AppError::DuplicateEmail
            };
        }
    }
    AppError::DataAccess(e)
}

pub async fn refresh(state: &AppState, refresh_token: &str) -> AppResult<AuthResponse> {
    let keys = JwtKeys::from(&state.config.jwt);
    let claims = keys.verify_refresh(refresh_token).map_err(|e| {
        warn!(error = %e, "refresh rejected");
        AppError::NotAuthenticated
    })?;

    let session = state
        .sessions
        .current(claims.sub)
        .await
        .ok_or(AppError::NotAuthenticated)?;
    issue_tokens(state, session.user)
}

pub async fn logout(state: &AppState, user_id: i64) -> AppResult<()> {
    state
        .sessions
        .end(user_id)
        .await
        .map_err(|e| AppError::Storage(e.to_string()))?;
    info!(user_id, "user logged out");
    Ok(())
}

/// Always succeeds for well-formed input so callers cannot probe which emails exist.
pub async fn request_password_reset(state: &AppState, email: &str) -> AppResult<()> {
    let email = normalize_email(email);
    let Some(user) = User::find_by_email(&state.db, &email).await? else {
        info!(%email, "password reset requested for unknown email");
        return Ok(());
    };

    let token = Uuid::new_v4().to_string();
    let expires_at = (OffsetDateTime::now_utc() + RESET_TOKEN_TTL).unix_timestamp();
    repo::delete_tokens_for_user(&state.db, user.id).await?;
    repo::insert_token(&state.db, user.id, &token, expires_at).await?;
    info!(user_id = user.id, "password reset token issued");

    let notifier = state.notifier.clone();
    tokio::spawn(async move {
        if let Err(e) = notifier.send_password_recovery(&user.email, &token).await {
            error!(error = %e, user_id = user.id, "recovery email failed");
        }
    });
    Ok(())
}

pub async fn verify_reset_token(state: &AppState, token: &str) -> AppResult<TokenCheck> {
    let Some(row) = repo::find_unused_token(&state.db, token).await? else {
        return Ok(TokenCheck::Invalid);
    };

    if row.expires_at < OffsetDateTime::now_utc().unix_timestamp() {
        info!(user_id = row.user_id, "reset token expired");
        return Ok(TokenCheck::Invalid);
    }

    if !repo::consume_attempt(&state.db, token, MAX_RESET_ATTEMPTS).await? {
        warn!(user_id = row.user_id, attempts = row.attempts, "reset token attempts exceeded");
        // only the request that invalidates the token sends the alert
        if repo::mark_used(&state.db, token).await? {
            if let Err(e) = state.notifier.send_security_alert(&row.email).await {
                error!(error = %e, user_id = row.user_id, "security alert email failed");
            }
        }
        return Ok(TokenCheck::AttemptsExceeded);
    }

    Ok(TokenCheck::Valid {
        user_id: row.user_id,
        email: row.email,
    })
}

pub async fn reset_password(
    state: &AppState,
    token: &str,
    new_password: &str,
) -> AppResult<ResetOutcome> {
    // length first, so a rejected password does not spend an attempt
    check_password_len(new_password)?;

    let TokenCheck::Valid { user_id, email } = verify_reset_token(state, token).await? else {
        return Ok(ResetOutcome::failed("The link is invalid or has expired"));
    };

    let hash = hash_password(new_password)?;
    if User::update_password(&state.db, user_id, &hash).await? == 0 {
        error!(user_id, "password update touched no rows");
        return Ok(ResetOutcome::failed("Could not update the password"));
    }
    repo::mark_used(&state.db, token).await?;
    info!(user_id, "password reset");

    if let Err(e) = state.notifier.send_password_changed(&email).await {
        error!(error = %e, user_id, "password changed email failed");
    }
    Ok(ResetOutcome::ok())
}
