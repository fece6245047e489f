//! Shared pieces of every content endpoint: paging, partial updates,
//! input validation, ownership checks and file attachments.

pub mod extract;
pub mod pagination;
pub mod patch;
pub mod status;
pub mod upload;
pub mod validate;

use uuid::Uuid;

use crate::{
    auth::services::{Identity, Role},
    error::{AppError, AppResult, UniqueViolation},
    store::{Resource, ResourceStore, UniqueKey},
};

pub use extract::{ApiJson, ApiPath, ResumeField, WithFile};
pub use pagination::{paginate, ListQuery, Page, PageRequest};
pub use patch::Patch;
pub use status::PublicationStatus;

/// Owners may mutate their rows; admins may mutate any row.
pub fn ensure_can_modify(identity: &Identity, owner: Option<Uuid>, entity: &str) -> AppResult<()> {
    if identity.role == Role::Admin || owner == Some(identity.id) {
        Ok(())
    } else {
        Err(AppError::forbidden(format!(
            "You are not allowed to modify this {entity}"
        )))
    }
}

pub async fn find_or_404<R: Resource>(store: &dyn ResourceStore<R>, id: Uuid) -> AppResult<R> {
    store
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("{} not found", R::NAME)))
}

/// Pre-insert uniqueness check; the database constraint still backs it up.
/// `except` is the row being updated.
pub async fn ensure_unique<R: Resource>(
    store: &dyn ResourceStore<R>,
    key: UniqueKey,
    value: &str,
    except: Option<Uuid>,
) -> AppResult<()> {
    match store.find_by_key(key, value).await? {
        Some(existing) if Some(existing.id()) != except => Err(AppError::conflict(
            UniqueViolation {
                entity: R::NAME,
                field: key.column(),
            }
            .to_string(),
        )),
        _ => Ok(()),
    }
}
