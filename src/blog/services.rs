use time::OffsetDateTime;
use tracing::info;
use uuid::Uuid;

use super::{
    dto::{CreatePostRequest, UpdatePostRequest},
    repo::{BlogPost, PostFilter},
};
use crate::{
    auth::services::Identity,
    error::{AppError, AppResult},
    resources::{
        ensure_can_modify, ensure_unique, find_or_404, paginate,
        upload::{self, FileKind, FileSwap, Upload},
        validate::{self, Required},
        ListQuery, Page, Patch, PublicationStatus,
    },
    state::AppState,
    store::UniqueKey,
};

pub const DEFAULT_LIMIT: u32 = 10;
const WORDS_PER_MINUTE: usize = 200;
const IMAGE_FOLDER: &str = "blog";
const NOT_FOUND: &str = "Post not found";

/// Whole minutes at 200 words per minute, never below one.
pub fn reading_time(content: &str) -> i32 {
    let words = content.split_whitespace().count();
    words.div_ceil(WORDS_PER_MINUTE).max(1) as i32
}

fn check_reading_time(minutes: Option<i32>) -> AppResult<()> {
    match minutes {
        Some(m) if m < 1 => Err(AppError::validation("readingTime must be a positive number of minutes")),
        _ => Ok(()),
    }
}

/// Published posts have a publication date.
fn stamp_publication(post: &mut BlogPost, now: OffsetDateTime) {
    if post.status == PublicationStatus::Published && post.published_at.is_none() {
        post.published_at = Some(now);
    }
}

pub async fn list_public(state: &AppState, query: &ListQuery) -> AppResult<Page<BlogPost>> {
    let filter = PostFilter {
        status: Some(PublicationStatus::Published),
        owner: None,
    };
    Ok(paginate(state.posts.as_ref(), &filter, query.page_request(DEFAULT_LIMIT)).await?)
}

pub async fn list_own(state: &AppState, identity: &Identity, query: &ListQuery) -> AppResult<Page<BlogPost>> {
    let filter = PostFilter {
        status: validate::enum_filter(query.status.as_deref()),
        owner: Some(identity.id),
    };
    Ok(paginate(state.posts.as_ref(), &filter, query.page_request(DEFAULT_LIMIT)).await?)
}

pub async fn get_published(state: &AppState, slug: &str) -> AppResult<BlogPost> {
    state
        .posts
        .find_by_key(UniqueKey::Slug, slug)
        .await?
        .filter(|p| p.status == PublicationStatus::Published)
        .ok_or_else(|| AppError::not_found(NOT_FOUND))
}

pub async fn create(
    state: &AppState,
    identity: &Identity,
    req: CreatePostRequest,
    file: Option<Upload>,
) -> AppResult<BlogPost> {
    Required::new()
        .text("title", &req.title)
        .text("content", &req.content)
        .check()?;
    let title = req.title.unwrap_or_default().trim().to_string();
    validate::length("title", &title, 3, 200)?;
    let content = req.content.unwrap_or_default();
    let slug = validate::slug_for(req.slug.as_deref(), &title)?;
    let status = req
        .status
        .as_deref()
        .map(PublicationStatus::parse)
        .transpose()?
        .unwrap_or_default();
    check_reading_time(req.reading_time)?;
    let image = validate::optional_text(req.image);
    validate::optional_url("image", image.as_deref())?;
    ensure_unique(state.posts.as_ref(), UniqueKey::Slug, &slug, None).await?;

    let now = OffsetDateTime::now_utc();
    let mut post = BlogPost {
        id: Uuid::new_v4(),
        user_id: identity.id,
        title,
        slug,
        excerpt: validate::optional_text(req.excerpt),
        reading_time: Some(req.reading_time.unwrap_or_else(|| reading_time(&content))),
        content,
        status,
        featured: req.featured.unwrap_or(false),
        meta_title: validate::optional_text(req.meta_title),
        meta_desc: validate::optional_text(req.meta_desc),
        image: None,
        published_at: None,
        created_at: now,
        updated_at: now,
    };
    stamp_publication(&mut post, now);

    let storage = state.storage.as_ref();
    let requested = image.map_or(Patch::Missing, Patch::Value);
    let swap = FileSwap::stage(storage, IMAGE_FOLDER, FileKind::Image, file.as_ref(), requested, &mut post.image).await?;
    let post = swap.finish(storage, state.posts.insert(post).await).await?;
    info!(post_id = %post.id, user_id = %identity.id, status = ?post.status, "post created");
    Ok(post)
}

pub async fn update(
    state: &AppState,
    identity: &Identity,
    id: Uuid,
    req: UpdatePostRequest,
    file: Option<Upload>,
) -> AppResult<BlogPost> {
    let store = state.posts.as_ref();
    let mut post = find_or_404(store, id).await?;
    ensure_can_modify(identity, Some(post.user_id), "post")?;

    req.title
        .map(|t| t.trim().to_string())
        .apply_required(&mut post.title, "title")?;
    validate::length("title", &post.title, 3, 200)?;
    let mut slug = post.slug.clone();
    req.slug.apply_required(&mut slug, "slug")?;
    if slug != post.slug {
        post.slug = validate::slug_for(Some(&slug), &post.title)?;
    }
    let content_changed = !req.content.is_missing();
    req.content.apply_required(&mut post.content, "content")?;
    if post.content.trim().is_empty() {
        return Err(AppError::validation("content cannot be empty"));
    }
    match req.reading_time {
        Patch::Value(minutes) => {
            check_reading_time(Some(minutes))?;
            post.reading_time = Some(minutes);
        }
        Patch::Null => post.reading_time = Some(reading_time(&post.content)),
        Patch::Missing if content_changed => post.reading_time = Some(reading_time(&post.content)),
        Patch::Missing => {}
    }
    req.excerpt.apply(&mut post.excerpt);
    req.status
        .try_map(|s| PublicationStatus::parse(&s))?
        .apply_required(&mut post.status, "status")?;
    req.featured.apply_required(&mut post.featured, "featured")?;
    req.meta_title.apply(&mut post.meta_title);
    req.meta_desc.apply(&mut post.meta_desc);
    if let Patch::Value(url) = &req.image {
        validate::url("image", url)?;
    }
    ensure_unique(store, UniqueKey::Slug, &post.slug, Some(id)).await?;

    let now = OffsetDateTime::now_utc();
    stamp_publication(&mut post, now);
    post.updated_at = now;

    let storage = state.storage.as_ref();
    let swap = FileSwap::stage(storage, IMAGE_FOLDER, FileKind::Image, file.as_ref(), req.image, &mut post.image).await?;
    swap.finish(storage, store.update(post).await).await
}

pub async fn publish(state: &AppState, identity: &Identity, id: Uuid) -> AppResult<BlogPost> {
    let store = state.posts.as_ref();
    let mut post = find_or_404(store, id).await?;
    ensure_can_modify(identity, Some(post.user_id), "post")?;
    if post.status == PublicationStatus::Published {
        return Err(AppError::validation("Post is already published"));
    }
    let now = OffsetDateTime::now_utc();
    post.status = PublicationStatus::Published;
    post.published_at = Some(now);
    post.updated_at = now;
    let post = store.update(post).await?;
    info!(post_id = %post.id, "post published");
    Ok(post)
}

pub async fn delete(state: &AppState, identity: &Identity, id: Uuid) -> AppResult<()> {
    let store = state.posts.as_ref();
    let post = find_or_404(store, id).await?;
    ensure_can_modify(identity, Some(post.user_id), "post")?;
    if !store.delete(id).await? {
        return Err(AppError::not_found(NOT_FOUND));
    }
    upload::discard(state.storage.as_ref(), post.image.as_deref()).await;
    Ok(())
}
