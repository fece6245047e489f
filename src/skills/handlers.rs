use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::get,
    Router,
};
use tracing::instrument;
use uuid::Uuid;

use super::{
    dto::{CreateSkillRequest, UpdateSkillRequest},
    repo::Skill,
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
        .route("/skills", get(list_skills).post(create_skill))
        .route(
            "/skills/:id",
            get(get_skill).put(update_skill).delete(delete_skill),
        )
}

#[instrument(skip(state))]
pub async fn list_skills(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> AppResult<ApiResponse<Page<Skill>>> {
    Ok(ApiResponse::ok(services::list(&state, &query).await?))
}

#[instrument(skip(state))]
pub async fn get_skill(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<ApiResponse<Skill>> {
    Ok(ApiResponse::ok(services::get(&state, id).await?))
}

#[instrument(skip(state, payload))]
pub async fn create_skill(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    ApiJson(payload): ApiJson<CreateSkillRequest>,
) -> AppResult<ApiResponse<Skill>> {
    let skill = services::create(&state, &identity, payload).await?;
    Ok(ApiResponse::created(skill).with_message("Skill created successfully"))
}

#[instrument(skip(state, payload))]
pub async fn update_skill(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<UpdateSkillRequest>,
) -> AppResult<ApiResponse<Skill>> {
    let skill = services::update(&state, &identity, id, payload).await?;
    Ok(ApiResponse::ok(skill).with_message("Skill updated successfully"))
}

#[instrument(skip(state))]
pub async fn delete_skill(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<StatusCode> {
    services::delete(&state, &identity, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
