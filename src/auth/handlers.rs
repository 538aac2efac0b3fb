use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use crate::{
    auth::{
        dto::{
            AuthResponse, ForgotPasswordRequest, LoginRequest, PublicUser, RefreshRequest,
            RegisterRequest, ResetOutcome, ResetPasswordRequest, SuccessResponse,
            TokenCheckResponse, VerifyTokenRequest,
        },
        extractors::AuthUser,
        services,
    },
    error::AppResult,
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
        .route("/auth/logout", post(logout))
        .route("/auth/password/forgot", post(forgot_password))
        .route("/auth/password/verify", post(verify_token))
        .route("/auth/password/reset", post(reset_password))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/me", get(get_me))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> AppResult<Json<AuthResponse>> {
    let res = services::register(
        &state,
        &payload.username,
        &payload.name,
        &payload.email,
        &payload.password,
    )
    .await?;
    Ok(Json(res))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> AppResult<Json<AuthResponse>> {
    Ok(Json(
        services::login(&state, &payload.email, &payload.password).await?,
    ))
}

#[instrument(skip(state, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> AppResult<Json<AuthResponse>> {
    Ok(Json(services::refresh(&state, &payload.refresh_token).await?))
}

#[instrument(skip(state, user), fields(user_id = user.id()))]
pub async fn logout(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<SuccessResponse>> {
    services::logout(&state, user.id()).await?;
    Ok(Json(SuccessResponse { success: true }))
}

#[instrument(skip(user), fields(user_id = user.id()))]
pub async fn get_me(user: AuthUser) -> Json<PublicUser> {
    Json(user.0.user)
}

#[instrument(skip(state, payload))]
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(payload): Json<ForgotPasswordRequest>,
) -> AppResult<Json<SuccessResponse>> {
    services::request_password_reset(&state, &payload.email).await?;
    Ok(Json(SuccessResponse { success: true }))
}

#[instrument(skip(state, payload))]
pub async fn verify_token(
    State(state): State<AppState>,
    Json(payload): Json<VerifyTokenRequest>,
) -> AppResult<Json<TokenCheckResponse>> {
    let check = services::verify_reset_token(&state, &payload.token).await?;
    Ok(Json(check.into()))
}

#[instrument(skip(state, payload))]
pub async fn reset_password(
    State(state): State<AppState>,
    Json(payload): Json<ResetPasswordRequest>,
) -> AppResult<Json<ResetOutcome>> {
    Ok(Json(
        services::reset_password(&state, &payload.token, &payload.new_password).await?,
    ))
}
