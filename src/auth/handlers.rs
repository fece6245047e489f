use axum::{
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    routing::{get, post, put},
    Router,
};
use tracing::instrument;

use super::{
    dto::{
        AuthResponse, LoginRequest, LogoutRequest, PublicUser, RefreshRequest, RegisterRequest,
        TokenResponse, UpdatePasswordRequest, UpdateProfileRequest,
    },
    extractors::{AuthUser, Session},
    services::{self, Identity, User},
};
use crate::{
    error::AppResult,
    resources::{ApiJson, ResumeField, WithFile},
    response::ApiResponse,
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
        .route("/auth/logout", post(logout))
}

pub fn me_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/me", get(get_me))
        .route("/auth/profile", get(get_profile).put(update_profile))
        .route("/auth/password", put(update_password))
        .route(
            "/auth/profile/resume",
            put(upload_resume).layer(DefaultBodyLimit::max(21 * 1024 * 1024)),
        )
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<RegisterRequest>,
) -> AppResult<ApiResponse<AuthResponse>> {
    let (user, tokens) = services::register(&state, payload).await?;
    Ok(ApiResponse::created(AuthResponse {
        user: PublicUser::from(&user),
        access_token: tokens.access_token,
        refresh_token: tokens.refresh_token,
    })
    .with_message("User registered successfully"))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<LoginRequest>,
) -> AppResult<ApiResponse<AuthResponse>> {
    let (user, tokens) = services::login(&state, payload).await?;
    Ok(ApiResponse::ok(AuthResponse {
        user: PublicUser::from(&user),
        access_token: tokens.access_token,
        refresh_token: tokens.refresh_token,
    })
    .with_message("Login successful"))
}

#[instrument(skip(state, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<RefreshRequest>,
) -> AppResult<ApiResponse<TokenResponse>> {
    let tokens = services::refresh(&state, payload.refresh_token.as_deref()).await?;
    Ok(ApiResponse::ok(TokenResponse {
        access_token: tokens.access_token,
        refresh_token: tokens.refresh_token,
    }))
}

#[instrument(skip_all)]
pub async fn logout(
    State(state): State<AppState>,
    session: Session,
    payload: Option<ApiJson<LogoutRequest>>,
) -> AppResult<StatusCode> {
    let body = payload.map(|ApiJson(b)| b).unwrap_or_default();
    services::logout(&state, &session.claims, body.refresh_token.as_deref()).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument]
pub async fn get_me(AuthUser(identity): AuthUser) -> ApiResponse<Identity> {
    ApiResponse::ok(identity)
}

#[instrument(skip(state))]
pub async fn get_profile(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
) -> AppResult<ApiResponse<User>> {
    Ok(ApiResponse::ok(services::get_profile(&state, &identity).await?))
}

#[instrument(skip(state, payload))]
pub async fn update_profile(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    ApiJson(payload): ApiJson<UpdateProfileRequest>,
) -> AppResult<ApiResponse<User>> {
    let user = services::update_profile(&state, &identity, payload).await?;
    Ok(ApiResponse::ok(user).with_message("Profile updated successfully"))
}

#[instrument(skip(state, payload))]
pub async fn update_password(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    ApiJson(payload): ApiJson<UpdatePasswordRequest>,
) -> AppResult<ApiResponse<PublicUser>> {
    let user = services::update_password(&state, &identity, payload).await?;
    Ok(ApiResponse::ok(PublicUser::from(&user)).with_message("Password updated successfully"))
}

#[instrument(skip(state, body))]
pub async fn upload_resume(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    body: WithFile<serde_json::Value, ResumeField>,
) -> AppResult<ApiResponse<User>> {
    let user = services::upload_resume(&state, &identity, body.file).await?;
    Ok(ApiResponse::ok(user).with_message("Resume uploaded successfully"))
}
