use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{request::Parts, StatusCode},
};
use tracing::warn;

use super::{claims::TokenKind, dto::JwtKeys};
use crate::{session::Session, state::AppState};

/// Validates the bearer JWT and resolves the live session behind it.
///
/// Handlers that must degrade instead of failing take `Option<AuthUser>`.
pub struct AuthUser(pub Session);

impl AuthUser {
    pub fn id(&self) -> i64 {
        self.0.user.id
    }

    pub fn email(&self) -> &str {
        &self.0.user.email
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = (StatusCode, String);

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        // Read Authorization header
        let auth = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .ok_or((StatusCode::UNAUTHORIZED, "missing Authorization header".into()))?;

        // Expect "Bearer <token>"
        let token = auth
            .strip_prefix("Bearer ")
            .or_else(|| auth.strip_prefix("bearer "))
            .ok_or((StatusCode::UNAUTHORIZED, "invalid auth scheme".into()))?;

        let keys = JwtKeys::from_ref(state);
        let claims = keys.verify(token).map_err(|_| {
            warn!("invalid or expired token");
            (StatusCode::UNAUTHORIZED, "invalid or expired token".to_string())
        })?;

        if claims.kind != TokenKind::Access {
            return Err((StatusCode::UNAUTHORIZED, "access token required".into()));
        }

        let session = state
            .sessions
            .current(claims.sub)
            .await
            .ok_or((StatusCode::UNAUTHORIZED, "session ended".to_string()))?;

        Ok(AuthUser(session))
    }
}

/// User id of an optional caller, for guard-style services.
pub fn caller_id(user: &Option<AuthUser>) -> Option<i64> {
    user.as_ref().map(AuthUser::id)
}
