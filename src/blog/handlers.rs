use axum::{
    extract::{DefaultBodyLimit, Query, State},
    http::StatusCode,
    routing::{get, put},
    Router,
};
use tracing::instrument;
use uuid::Uuid;

use super::{
    dto::{CreatePostRequest, UpdatePostRequest},
    repo::BlogPost,
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
        .route("/blog", get(list_posts).post(create_post))
        .route("/blog/admin", get(list_my_posts))
        .route(
            "/blog/:key",
            get(get_post).put(update_post).delete(delete_post),
        )
        .route("/blog/:key/publish", put(publish_post))
        .layer(DefaultBodyLimit::max(11 * 1024 * 1024))
}

#[instrument(skip(state))]
pub async fn list_posts(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> AppResult<ApiResponse<Page<BlogPost>>> {
    Ok(ApiResponse::ok(services::list_public(&state, &query).await?))
}

#[instrument(skip(state))]
pub async fn list_my_posts(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    Query(query): Query<ListQuery>,
) -> AppResult<ApiResponse<Page<BlogPost>>> {
    Ok(ApiResponse::ok(services::list_own(&state, &identity, &query).await?))
}

#[instrument(skip(state))]
pub async fn get_post(
    State(state): State<AppState>,
    ApiPath(slug): ApiPath<String>,
) -> AppResult<ApiResponse<BlogPost>> {
    Ok(ApiResponse::ok(services::get_published(&state, &slug).await?))
}

#[instrument(skip(state, body))]
pub async fn create_post(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    body: WithFile<CreatePostRequest>,
) -> AppResult<ApiResponse<BlogPost>> {
    let post = services::create(&state, &identity, body.data, body.file).await?;
    Ok(ApiResponse::created(post).with_message("Post created successfully"))
}

#[instrument(skip(state, body))]
pub async fn update_post(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
    body: WithFile<UpdatePostRequest>,
) -> AppResult<ApiResponse<BlogPost>> {
    let post = services::update(&state, &identity, id, body.data, body.file).await?;
    Ok(ApiResponse::ok(post).with_message("Post updated successfully"))
}

#[instrument(skip(state))]
pub async fn publish_post(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<ApiResponse<BlogPost>> {
    let post = services::publish(&state, &identity, id).await?;
    Ok(ApiResponse::ok(post).with_message("Post published successfully"))
}

#[instrument(skip(state))]
pub async fn delete_post(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<StatusCode> {
    services::delete(&state, &identity, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
