use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::get,
    Router,
};
use tracing::instrument;
use uuid::Uuid;

use super::{
    dto::{CreateExperienceRequest, UpdateExperienceRequest},
    repo::Experience,
    services,
};
use crate::{
    auth::extractors::AuthUser,
    error::AppResult,
    resources::{ApiJson, ApiPath, ListQuery, Page},
    response::ApiResponse,
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/experiences", get(list_experiences).post(create_experience))
        .route(
            "/experiences/:id",
            get(get_experience).put(update_experience).delete(delete_experience),
        )
}

#[instrument(skip(state))]
pub async fn list_experiences(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> AppResult<ApiResponse<Page<Experience>>> {
    Ok(ApiResponse::ok(services::list(&state, &query).await?))
}

#[instrument(skip(state))]
pub async fn get_experience(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<ApiResponse<Experience>> {
    Ok(ApiResponse::ok(services::get(&state, id).await?))
}

#[instrument(skip(state, payload))]
pub async fn create_experience(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    ApiJson(payload): ApiJson<CreateExperienceRequest>,
) -> AppResult<ApiResponse<Experience>> {
    let experience = services::create(&state, &identity, payload).await?;
    Ok(ApiResponse::created(experience).with_message("Experience created successfully"))
}

#[instrument(skip(state, payload))]
pub async fn update_experience(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<UpdateExperienceRequest>,
) -> AppResult<ApiResponse<Experience>> {
    let experience = services::update(&state, &identity, id, payload).await?;
    Ok(ApiResponse::ok(experience).with_message("Experience updated successfully"))
}

#[instrument(skip(state))]
pub async fn delete_experience(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<StatusCode> {
    services::delete(&state, &identity, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
