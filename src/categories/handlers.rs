use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::get,
    Router,
};
use tracing::instrument;
use uuid::Uuid;

use super::{
    dto::{CreateCategoryRequest, UpdateCategoryRequest},
    repo::Category,
    services,
};
use crate::{
    auth::extractors::RequireAdmin,
    error::AppResult,
    resources::{ApiJson, ApiPath, ListQuery, Page},
    response::ApiResponse,
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/categories", get(list_categories).post(create_category))
        .route(
            "/categories/:key",
            get(get_category).put(update_category).delete(delete_category),
        )
}

#[instrument(skip(state))]
pub async fn list_categories(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> AppResult<ApiResponse<Page<Category>>> {
    let page = query.page_request(services::DEFAULT_LIMIT);
    Ok(ApiResponse::ok(services::list(&state, page).await?))
}

#[instrument(skip(state))]
pub async fn get_category(
    State(state): State<AppState>,
    ApiPath(slug): ApiPath<String>,
) -> AppResult<ApiResponse<Category>> {
    Ok(ApiResponse::ok(services::get_by_slug(&state, &slug).await?))
}

#[instrument(skip(state, payload))]
pub async fn create_category(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    ApiJson(payload): ApiJson<CreateCategoryRequest>,
) -> AppResult<ApiResponse<Category>> {
    let category = services::create(&state, payload).await?;
    Ok(ApiResponse::created(category).with_message("Category created successfully"))
}

#[instrument(skip(state, payload))]
pub async fn update_category(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<UpdateCategoryRequest>,
) -> AppResult<ApiResponse<Category>> {
    let category = services::update(&state, id, payload).await?;
    Ok(ApiResponse::ok(category).with_message("Category updated successfully"))
}

#[instrument(skip(state))]
pub async fn delete_category(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<StatusCode> {
    services::delete(&state, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
