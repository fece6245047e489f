use axum::{
    extract::{DefaultBodyLimit, Query, State},
    http::StatusCode,
    routing::get,
    Router,
};
use tracing::instrument;
use uuid::Uuid;

use super::{
    dto::{CreateProjectRequest, UpdateProjectRequest},
    repo::Project,
    services,
};
use crate::{
    auth::extractors::AuthUser,
    error::AppResult,
    resources::{ApiPath, ListQuery, Page, WithFile},
    response::ApiResponse,
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/projects", get(list_projects).post(create_project))
        .route("/projects/admin", get(list_my_projects))
        .route(
            "/projects/:key",
            get(get_project).put(update_project).delete(delete_project),
        )
        .layer(DefaultBodyLimit::max(11 * 1024 * 1024)) // 10MB image + form data
}

#[instrument(skip(state))]
pub async fn list_projects(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> AppResult<ApiResponse<Page<Project>>> {
    Ok(ApiResponse::ok(services::list_public(&state, &query).await?))
}

#[instrument(skip(state))]
pub async fn list_my_projects(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    Query(query): Query<ListQuery>,
) -> AppResult<ApiResponse<Page<Project>>> {
    Ok(ApiResponse::ok(services::list_own(&state, &identity, &query).await?))
}

#[instrument(skip(state))]
pub async fn get_project(
    State(state): State<AppState>,
    ApiPath(slug): ApiPath<String>,
) -> AppResult<ApiResponse<Project>> {
    Ok(ApiResponse::ok(services::get_published(&state, &slug).await?))
}

#[instrument(skip(state, body))]
pub async fn create_project(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    body: WithFile<CreateProjectRequest>,
) -> AppResult<ApiResponse<Project>> {
    let project = services::create(&state, &identity, body.data, body.file).await?;
    Ok(ApiResponse::created(project).with_message("Project created successfully"))
}

#[instrument(skip(state, body))]
pub async fn update_project(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
    body: WithFile<UpdateProjectRequest>,
) -> AppResult<ApiResponse<Project>> {
    let project = services::update(&state, &identity, id, body.data, body.file).await?;
    Ok(ApiResponse::ok(project).with_message("Project updated successfully"))
}

#[instrument(skip(state))]
pub async fn delete_project(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<StatusCode> {
    services::delete(&state, &identity, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
