use time::OffsetDateTime;
use tracing::info;
use uuid::Uuid;

use super::{
    dto::{CreateProjectRequest, UpdateProjectRequest},
    repo::{Project, ProjectFilter},
};
use crate::{
    auth::services::Identity,
    categories,
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
const IMAGE_FOLDER: &str = "projects";
const NOT_FOUND: &str = "Project not found";

/// Published projects, optionally narrowed by category slug and `featured`.
pub async fn list_public(state: &AppState, query: &ListQuery) -> AppResult<Page<Project>> {
    let page = query.page_request(DEFAULT_LIMIT);
    let category = match query.category.as_deref() {
        Some(slug) => match categories::services::id_for_slug(state, slug).await? {
            Some(id) => Some(id),
            None => return Ok(Page::new(Vec::new(), 0, page)),
        },
        None => None,
    };
    let filter = ProjectFilter {
        status: Some(PublicationStatus::Published),
        owner: None,
        category,
        featured_only: query.featured_only(),
    };
    Ok(paginate(state.projects.as_ref(), &filter, page).await?)
}

/// The caller's own projects in any status.
pub async fn list_own(state: &AppState, identity: &Identity, query: &ListQuery) -> AppResult<Page<Project>> {
    let filter = ProjectFilter {
        status: validate::enum_filter(query.status.as_deref()),
        owner: Some(identity.id),
        ..Default::default()
    };
    Ok(paginate(state.projects.as_ref(), &filter, query.page_request(DEFAULT_LIMIT)).await?)
}

pub async fn get_published(state: &AppState, slug: &str) -> AppResult<Project> {
    state
        .projects
        .find_by_key(UniqueKey::Slug, slug)
        .await?
        .filter(|p| p.status == PublicationStatus::Published)
        .ok_or_else(|| AppError::not_found(NOT_FOUND))
}

fn check_title(title: &str) -> AppResult<()> {
    validate::length("title", title, 3, 200)
}

pub async fn create(
    state: &AppState,
    identity: &Identity,
    req: CreateProjectRequest,
    file: Option<Upload>,
) -> AppResult<Project> {
    Required::new().text("title", &req.title).check()?;
    let title = req.title.unwrap_or_default().trim().to_string();
    check_title(&title)?;
    let slug = validate::slug_for(req.slug.as_deref(), &title)?;
    let status = req
        .status
        .as_deref()
        .map(PublicationStatus::parse)
        .transpose()?
        .unwrap_or_default();
    let github_url = validate::optional_text(req.github_url);
    let demo_url = validate::optional_text(req.demo_url);
    let image = validate::optional_text(req.image);
    validate::optional_url("githubUrl", github_url.as_deref())?;
    validate::optional_url("demoUrl", demo_url.as_deref())?;
    validate::optional_url("image", image.as_deref())?;
    categories::services::ensure_exists(state, req.category_id).await?;
    ensure_unique(state.projects.as_ref(), UniqueKey::Slug, &slug, None).await?;

    let now = OffsetDateTime::now_utc();
    let mut project = Project {
        id: Uuid::new_v4(),
        user_id: identity.id,
        category_id: req.category_id,
        title,
        slug,
        description: validate::optional_text(req.description),
        content: req.content,
        image: None,
        github_url,
        demo_url,
        technologies: validate::tags(req.technologies.unwrap_or_default()),
        status,
        featured: req.featured.unwrap_or(false),
        priority: req.priority.unwrap_or(0),
        created_at: now,
        updated_at: now,
    };

    let requested = image.map_or(Patch::Missing, Patch::Value);
    let storage = state.storage.as_ref();
    let swap = FileSwap::stage(storage, IMAGE_FOLDER, FileKind::Image, file.as_ref(), requested, &mut project.image).await?;
    let project = swap.finish(storage, state.projects.insert(project).await).await?;
    info!(project_id = %project.id, user_id = %identity.id, "project created");
    Ok(project)
}

pub async fn update(
    state: &AppState,
    identity: &Identity,
    id: Uuid,
    req: UpdateProjectRequest,
    file: Option<Upload>,
) -> AppResult<Project> {
    let store = state.projects.as_ref();
    let mut project = find_or_404(store, id).await?;
    ensure_can_modify(identity, Some(project.user_id), "project")?;

    req.title
        .map(|t| t.trim().to_string())
        .apply_required(&mut project.title, "title")?;
    check_title(&project.title)?;
    let mut slug = project.slug.clone();
    req.slug.apply_required(&mut slug, "slug")?;
    if slug != project.slug {
        project.slug = validate::slug_for(Some(&slug), &project.title)?;
    }
    if let Patch::Value(category_id) = req.category_id {
        categories::services::ensure_exists(state, Some(category_id)).await?;
    }
    req.category_id.apply(&mut project.category_id);
    req.description.apply(&mut project.description);
    req.content.apply(&mut project.content);
    for (field, patch) in [("githubUrl", &req.github_url), ("demoUrl", &req.demo_url), ("image", &req.image)] {
        if let Patch::Value(url) = patch {
            validate::url(field, url)?;
        }
    }
    req.github_url.apply(&mut project.github_url);
    req.demo_url.apply(&mut project.demo_url);
    match req.technologies {
        Patch::Missing => {}
        Patch::Null => project.technologies.clear(),
        Patch::Value(list) => project.technologies = validate::tags(list),
    }
    req.status
        .try_map(|s| PublicationStatus::parse(&s))?
        .apply_required(&mut project.status, "status")?;
    req.featured.apply_required(&mut project.featured, "featured")?;
    req.priority.apply_required(&mut project.priority, "priority")?;
    ensure_unique(store, UniqueKey::Slug, &project.slug, Some(id)).await?;

    let storage = state.storage.as_ref();
    let swap = FileSwap::stage(storage, IMAGE_FOLDER, FileKind::Image, file.as_ref(), req.image, &mut project.image).await?;
    project.updated_at = OffsetDateTime::now_utc();
    swap.finish(storage, store.update(project).await).await
}

pub async fn delete(state: &AppState, identity: &Identity, id: Uuid) -> AppResult<()> {
    let store = state.projects.as_ref();
    let project = find_or_404(store, id).await?;
    ensure_can_modify(identity, Some(project.user_id), "project")?;
    if !store.delete(id).await? {
        return Err(AppError::not_found(NOT_FOUND));
    }
    upload::discard(state.storage.as_ref(), project.image.as_deref()).await;
    info!(project_id = %id, user_id = %identity.id, "project deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use bytes::Bytes;

    use super::*;
    use crate::{
        auth::services::Role,
        categories::dto::CreateCategoryRequest,
        storage::{MemoryStorage, StorageClient},
    };

    fn req(title: &str, status: &str) -> CreateProjectRequest {
        CreateProjectRequest {
            title: Some(title.into()),
            status: Some(status.into()),
            ..Default::default()
        }
    }

    fn png() -> Upload {
        Upload {
            field: "image".into(),
            file_name: "shot.png".into(),
            content_type: "image/png".into(),
            bytes: Bytes::from_static(b"\x89PNG...."),
        }
    }

    fn query() -> ListQuery {
        ListQuery::default()
    }

    #[tokio::test]
    async fn public_list_shows_published_and_admin_list_shows_all_own() {
        let state = AppState::fake();
        let alice = Identity::fake(Role::User);
        let bob = Identity::fake(Role::User);
        create(&state, &alice, req("Shipped App", "PUBLISHED"), None).await.unwrap();
        create(&state, &alice, req("Secret Draft", "DRAFT"), None).await.unwrap();
        create(&state, &bob, req("Bob Draft", "draft"), None).await.unwrap();

        let public = list_public(&state, &query()).await.unwrap();
        assert_eq!(public.items.len(), 1);
        assert_eq!(public.items[0].title, "Shipped App");
        assert_eq!(public.pagination.total, 1);

        let own = list_own(&state, &alice, &query()).await.unwrap();
        assert_eq!(own.items.len(), 2);
        assert_eq!(own.pagination.total, 2);

        let drafts = list_own(
            &state,
            &alice,
            &ListQuery {
                status: Some("draft".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(drafts.items.len(), 1);

        // unrecognized status is ignored
        let all = list_own(
            &state,
            &alice,
            &ListQuery {
                status: Some("whatever".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(all.pagination.total, 2);

        assert!(get_published(&state, "shipped-app").await.is_ok());
        let err = get_published(&state, "secret-draft").await.unwrap_err();
        assert_eq!(err.to_string(), NOT_FOUND);
    }

    #[tokio::test]
    async fn ordering_and_featured_and_category_filters() {
        let state = AppState::fake();
        let owner = Identity::fake(Role::User);
        let web = categories::services::create(
            &state,
            CreateCategoryRequest {
                name: Some("Web".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let mut low = req("Low Priority", "PUBLISHED");
        low.priority = Some(1);
        low.category_id = Some(web.id);
        let mut high = req("High Priority", "PUBLISHED");
        high.priority = Some(9);
        let mut star = req("Featured One", "PUBLISHED");
        star.featured = Some(true);
        star.category_id = Some(web.id);
        for r in [low, high, star] {
            create(&state, &owner, r, None).await.unwrap();
        }

        let titles = |page: Page<Project>| page.items.into_iter().map(|p| p.title).collect::<Vec<_>>();
        let all = list_public(&state, &query()).await.unwrap();
        assert_eq!(titles(all), vec!["Featured One", "High Priority", "Low Priority"]);

        let featured = list_public(
            &state,
            &ListQuery {
                featured: Some("true".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(titles(featured), vec!["Featured One"]);

        let in_web = list_public(
            &state,
            &ListQuery {
                category: Some("web".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(titles(in_web), vec!["Featured One", "Low Priority"]);

        let unknown = list_public(
            &state,
            &ListQuery {
                category: Some("nope".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(unknown.pagination.total, 0);

        let mut bad = req("Dangling", "DRAFT");
        bad.category_id = Some(Uuid::new_v4());
        assert!(matches!(
            create(&state, &owner, bad, None).await.unwrap_err(),
            AppError::Validation(_)
        ));
    }

    #[tokio::test]
    async fn create_validates_input() {
        let state = AppState::fake();
        let owner = Identity::fake(Role::User);

        let err = create(&state, &owner, CreateProjectRequest::default(), None).await.unwrap_err();
        assert_eq!(err.to_string(), "Missing required fields: title");

        let err = create(&state, &owner, req("Valid Title", "LIVE"), None).await.unwrap_err();
        assert_eq!(err.to_string(), "status must be one of: DRAFT, PUBLISHED, ARCHIVED");

        let mut bad_url = req("Valid Title", "DRAFT");
        bad_url.github_url = Some("github.com/me".into());
        assert!(create(&state, &owner, bad_url, None).await.is_err());

        create(&state, &owner, req("Same Title", "DRAFT"), None).await.unwrap();
        let err = create(&state, &owner, req("Same  Title!", "DRAFT"), None).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn only_owner_or_admin_may_modify() {
        let state = AppState::fake();
        let owner = Identity::fake(Role::User);
        let stranger = Identity::fake(Role::User);
        let admin = Identity::fake(Role::Admin);
        let project = create(&state, &owner, req("Mine", "DRAFT"), None).await.unwrap();

        let patch = || UpdateProjectRequest {
            status: Patch::Value("published".into()),
            ..Default::default()
        };
        let err = update(&state, &stranger, project.id, patch(), None).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
        assert!(matches!(
            delete(&state, &stranger, project.id).await.unwrap_err(),
            AppError::Forbidden(_)
        ));

        let updated = update(&state, &admin, project.id, patch(), None).await.unwrap();
        assert_eq!(updated.status, PublicationStatus::Published);
        assert_eq!(updated.title, "Mine");

        assert!(matches!(
            delete(&state, &owner, Uuid::new_v4()).await.unwrap_err(),
            AppError::NotFound(_)
        ));
        delete(&state, &owner, project.id).await.unwrap();
        assert!(state.projects.find_by_id(project.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn image_is_replaced_then_removed_with_the_row() {
        let storage = Arc::new(MemoryStorage::default());
        let state = AppState::fake().with_storage(storage.clone());
        let owner = Identity::fake(Role::User);

        let project = create(&state, &owner, req("Pictured", "DRAFT"), Some(png())).await.unwrap();
        let first = project.image.clone().unwrap();
        assert!(first.starts_with("https://files.test/projects/"));

        let updated = update(&state, &owner, project.id, UpdateProjectRequest::default(), Some(png()))
            .await
            .unwrap();
        let second = updated.image.clone().unwrap();
        assert_ne!(first, second);
        assert_eq!(storage.len(), 1);
        assert!(storage.contains(&storage.key_from_url(&second).unwrap()));

        delete(&state, &owner, project.id).await.unwrap();
        assert_eq!(storage.len(), 0);
    }

    #[tokio::test]
    async fn rejected_upload_leaves_no_file() {
        let storage = Arc::new(MemoryStorage::default());
        let state = AppState::fake().with_storage(storage.clone());
        let owner = Identity::fake(Role::User);
        let mut pdf = png();
        pdf.content_type = "application/pdf".into();

        let err = create(&state, &owner, req("Wrong File", "DRAFT"), Some(pdf)).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(storage.len(), 0);
        assert_eq!(state.projects.count(&ProjectFilter::default()).await.unwrap(), 0);
    }
}
