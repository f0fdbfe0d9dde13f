use axum::{
    extract::{FromRef, State},
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument, warn};

use super::{
    dto::{LoginRequest, LoginResponse, MeResponse, MessageResponse, RefreshRequest, RegisterRequest},
    jwt::{AuthUser, JwtKeys, INVALID_TOKEN},
    services,
};
use crate::{
    error::{AppError, AppResult},
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/refresh", post(refresh))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/me", get(get_me))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> AppResult<Json<MessageResponse>> {
    services::register(
        &state.store,
        &payload.full_name,
        &payload.email,
        &payload.password,
    )
    .await?;
    Ok(Json(MessageResponse {
        message: "User registered successfully".into(),
    }))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    let user = services::authenticate(&state.store, &payload.email, &payload.password)
        .await?
        .ok_or_else(|| AppError::Auth("Invalid credentials".into()))?;

    let keys = JwtKeys::from_ref(&state);
    let token = keys.sign_access(&user.email, &user.full_name)?;
    let refresh_token = keys.sign_refresh(&user.email, &user.full_name)?;

    info!(email = %user.email, "user logged in");
    Ok(Json(LoginResponse {
        token,
        refresh_token,
        full_name: user.full_name,
    }))
}

#[instrument(skip(state, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> AppResult<Json<LoginResponse>> {
    let keys = JwtKeys::from_ref(&state);
    let claims = keys.verify_refresh(&payload.refresh_token).map_err(|e| {
        warn!(error = %e, "refresh rejected");
        AppError::Auth(INVALID_TOKEN.into())
    })?;

    // the account must still exist
    let user = state
        .store
        .get_user_by_email(&claims.sub)
        .await?
        .ok_or_else(|| AppError::Auth(INVALID_TOKEN.into()))?;

    Ok(Json(LoginResponse {
        token: keys.sign_access(&user.email, &user.full_name)?,
        refresh_token: keys.sign_refresh(&user.email, &user.full_name)?,
        full_name: user.full_name,
    }))
}

#[instrument(skip_all, fields(email = %user.email))]
pub async fn get_me(user: AuthUser) -> Json<MeResponse> {
    Json(MeResponse {
        full_name: user.full_name,
        email: user.email,
    })
}
