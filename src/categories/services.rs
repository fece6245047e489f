use time::OffsetDateTime;
use tracing::info;
use uuid::Uuid;

use super::{
    dto::{CreateCategoryRequest, UpdateCategoryRequest},
    repo::Category,
};
use crate::{
    error::{AppError, AppResult},
    resources::{
        ensure_unique, find_or_404, paginate,
        validate::{self, Required},
        Page, PageRequest,
    },
    state::AppState,
    store::{NoFilter, Reference, UniqueKey},
};

pub const DEFAULT_LIMIT: u32 = 20;

fn check_name(name: &str) -> AppResult<()> {
    validate::length("name", name, 2, 50)
}

pub async fn list(state: &AppState, page: PageRequest) -> AppResult<Page<Category>> {
    Ok(paginate(state.categories.as_ref(), &NoFilter, page).await?)
}

pub async fn get_by_slug(state: &AppState, slug: &str) -> AppResult<Category> {
    state
        .categories
        .find_by_key(UniqueKey::Slug, slug)
        .await?
        .ok_or_else(|| AppError::not_found("Category not found"))
}

/// Id behind a category slug, for list filters. Unknown slugs yield `None`.
pub async fn id_for_slug(state: &AppState, slug: &str) -> AppResult<Option<Uuid>> {
    Ok(state
        .categories
        .find_by_key(UniqueKey::Slug, slug.trim())
        .await?
        .map(|c| c.id))
}

/// Rejects references to categories that do not exist.
pub async fn ensure_exists(state: &AppState, id: Option<Uuid>) -> AppResult<()> {
    let Some(id) = id else { return Ok(()) };
    if state.categories.find_by_id(id).await?.is_none() {
        return Err(AppError::validation("categoryId does not match any category"));
    }
    Ok(())
}

pub async fn create(state: &AppState, req: CreateCategoryRequest) -> AppResult<Category> {
    Required::new().text("name", &req.name).check()?;
    let name = req.name.unwrap_or_default().trim().to_string();
    check_name(&name)?;
    let slug = validate::slug_for(req.slug.as_deref(), &name)?;

    let store = state.categories.as_ref();
    ensure_unique(store, UniqueKey::Name, &name, None).await?;
    ensure_unique(store, UniqueKey::Slug, &slug, None).await?;

    let now = OffsetDateTime::now_utc();
    let category = store
        .insert(Category {
            id: Uuid::new_v4(),
            name,
            slug,
            description: validate::optional_text(req.description),
            color: validate::optional_text(req.color),
            icon: validate::optional_text(req.icon),
            created_at: now,
            updated_at: now,
        })
        .await?;
    info!(category_id = %category.id, slug = %category.slug, "category created");
    Ok(category)
}

pub async fn update(state: &AppState, id: Uuid, req: UpdateCategoryRequest) -> AppResult<Category> {
    let store = state.categories.as_ref();
    let mut category = find_or_404(store, id).await?;

    req.name
        .map(|n| n.trim().to_string())
        .apply_required(&mut category.name, "name")?;
    check_name(&category.name)?;
    let mut slug = category.slug.clone();
    req.slug.apply_required(&mut slug, "slug")?;
    if slug != category.slug {
        category.slug = validate::slug_for(Some(&slug), &category.name)?;
    }
    req.description.apply(&mut category.description);
    req.color.apply(&mut category.color);
    req.icon.apply(&mut category.icon);

    ensure_unique(store, UniqueKey::Name, &category.name, Some(id)).await?;
    ensure_unique(store, UniqueKey::Slug, &category.slug, Some(id)).await?;

    category.updated_at = OffsetDateTime::now_utc();
    Ok(store.update(category).await?)
}

pub async fn delete(state: &AppState, id: Uuid) -> AppResult<()> {
    let store = state.categories.as_ref();
    find_or_404(store, id).await?;
    if !store.delete(id).await? {
        return Err(AppError::not_found("Category not found"));
    }
    let projects = state.projects.clear_references(Reference::Category, id).await?;
    let skills = state.skills.clear_references(Reference::Category, id).await?;
    info!(category_id = %id, projects, skills, "category deleted");
    Ok(())
}
