use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::{get, patch, post},
    Router,
};
use tracing::instrument;
use uuid::Uuid;

use super::{
    dto::{CreateContactRequest, ReplyRequest},
    repo::Contact,
    services,
};
use crate::{
    auth::extractors::{MaybeUser, RequireAdmin},
    error::AppResult,
    resources::{ApiJson, ApiPath, ListQuery, Page},
    response::ApiResponse,
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/contacts", get(list_contacts).post(create_contact))
        .route("/contacts/:id", get(get_contact).delete(delete_contact))
        .route("/contacts/:id/read", patch(mark_read))
        .route("/contacts/:id/reply", post(reply))
}

#[instrument(skip(state, payload))]
pub async fn create_contact(
    State(state): State<AppState>,
    MaybeUser(sender): MaybeUser,
    ApiJson(payload): ApiJson<CreateContactRequest>,
) -> AppResult<ApiResponse<Contact>> {
    let contact = services::create(&state, sender.as_ref(), payload).await?;
    Ok(ApiResponse::created(contact).with_message("Message sent successfully"))
}

#[instrument(skip(state))]
pub async fn list_contacts(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Query(query): Query<ListQuery>,
) -> AppResult<ApiResponse<Page<Contact>>> {
    Ok(ApiResponse::ok(services::list(&state, &query).await?))
}

#[instrument(skip(state))]
pub async fn get_contact(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<ApiResponse<Contact>> {
    Ok(ApiResponse::ok(services::get(&state, id).await?))
}

#[instrument(skip(state))]
pub async fn mark_read(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<ApiResponse<Contact>> {
    let contact = services::mark_read(&state, id).await?;
    Ok(ApiResponse::ok(contact).with_message("Message marked as read"))
}

#[instrument(skip(state, payload))]
pub async fn reply(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<ReplyRequest>,
) -> AppResult<ApiResponse<Contact>> {
    let contact = services::reply(&state, id, payload).await?;
    Ok(ApiResponse::ok(contact).with_message("Reply sent successfully"))
}

#[instrument(skip(state))]
pub async fn delete_contact(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<StatusCode> {
    services::delete(&state, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
