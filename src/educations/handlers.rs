use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::get,
    Router,
};
use tracing::instrument;
use uuid::Uuid;

use super::{
    dto::{CreateEducationRequest, UpdateEducationRequest},
    repo::Education,
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
        .route("/educations", get(list_educations).post(create_education))
        .route(
            "/educations/:id",
            get(get_education).put(update_education).delete(delete_education),
        )
}

#[instrument(skip(state))]
pub async fn list_educations(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> AppResult<ApiResponse<Page<Education>>> {
    Ok(ApiResponse::ok(services::list(&state, &query).await?))
}

#[instrument(skip(state))]
pub async fn get_education(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<ApiResponse<Education>> {
    Ok(ApiResponse::ok(services::get(&state, id).await?))
}

#[instrument(skip(state, payload))]
pub async fn create_education(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    ApiJson(payload): ApiJson<CreateEducationRequest>,
) -> AppResult<ApiResponse<Education>> {
    let education = services::create(&state, &identity, payload).await?;
    Ok(ApiResponse::created(education).with_message("Education created successfully"))
}

#[instrument(skip(state, payload))]
pub async fn update_education(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<UpdateEducationRequest>,
) -> AppResult<ApiResponse<Education>> {
    let education = services::update(&state, &identity, id, payload).await?;
    Ok(ApiResponse::ok(education).with_message("Education updated successfully"))
}

#[instrument(skip(state))]
pub async fn delete_education(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<StatusCode> {
    services::delete(&state, &identity, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
