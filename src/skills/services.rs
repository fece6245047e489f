use time::OffsetDateTime;
use tracing::info;
use uuid::Uuid;

use super::{
    dto::{CreateSkillRequest, UpdateSkillRequest},
    repo::{Skill, SkillFilter, SkillLevel},
};
use crate::{
    auth::services::Identity,
    categories,
    error::{AppError, AppResult},
    resources::{
        ensure_can_modify, ensure_unique, find_or_404, paginate,
        validate::{self, Required},
        ListQuery, Page, Patch,
    },
    state::AppState,
    store::UniqueKey,
};

pub const DEFAULT_LIMIT: u32 = 10;

fn normalize_name(raw: &str) -> AppResult<String> {
    let name = raw.trim().to_lowercase();
    validate::length("name", &name, 1, 50)?;
    Ok(name)
}

fn check_years(years: Option<i32>) -> AppResult<()> {
    match years {
        Some(y) if y < 0 => Err(AppError::validation("yearsExp must be zero or more")),
        _ => Ok(()),
    }
}

pub async fn list(state: &AppState, query: &ListQuery) -> AppResult<Page<Skill>> {
    let page = query.page_request(DEFAULT_LIMIT);
    let category = match query.category.as_deref() {
        Some(slug) => match categories::services::id_for_slug(state, slug).await? {
            Some(id) => Some(id),
            None => return Ok(Page::new(Vec::new(), 0, page)),
        },
        None => None,
    };
    Ok(paginate(state.skills.as_ref(), &SkillFilter { category }, page).await?)
}

pub async fn get(state: &AppState, id: Uuid) -> AppResult<Skill> {
    find_or_404(state.skills.as_ref(), id).await
}

pub async fn create(state: &AppState, identity: &Identity, req: CreateSkillRequest) -> AppResult<Skill> {
    Required::new().text("name", &req.name).check()?;
    let name = normalize_name(req.name.as_deref().unwrap_or_default())?;
    let level = req
        .level
        .as_deref()
        .map(SkillLevel::parse)
        .transpose()?
        .unwrap_or_default();
    check_years(req.years_exp)?;
    categories::services::ensure_exists(state, req.category_id).await?;
    ensure_unique(state.skills.as_ref(), UniqueKey::Name, &name, None).await?;

    let now = OffsetDateTime::now_utc();
    let skill = state
        .skills
        .insert(Skill {
            id: Uuid::new_v4(),
            user_id: identity.id,
            category_id: req.category_id,
            name,
            level,
            years_exp: req.years_exp,
            icon: validate::optional_text(req.icon),
            created_at: now,
            updated_at: now,
        })
        .await?;
    info!(skill_id = %skill.id, name = %skill.name, "skill created");
    Ok(skill)
}

pub async fn update(
    state: &AppState,
    identity: &Identity,
    id: Uuid,
    req: UpdateSkillRequest,
) -> AppResult<Skill> {
    let store = state.skills.as_ref();
    let mut skill = find_or_404(store, id).await?;
    ensure_can_modify(identity, Some(skill.user_id), "skill")?;

    req.name
        .try_map(|n| normalize_name(&n))?
        .apply_required(&mut skill.name, "name")?;
    req.level
        .try_map(|l| SkillLevel::parse(&l))?
        .apply_required(&mut skill.level, "level")?;
    if let Patch::Value(years) = req.years_exp {
        check_years(Some(years))?;
    }
    req.years_exp.apply(&mut skill.years_exp);
    if let Patch::Value(category_id) = req.category_id {
        categories::services::ensure_exists(state, Some(category_id)).await?;
    }
    req.category_id.apply(&mut skill.category_id);
    req.icon.apply(&mut skill.icon);
    ensure_unique(store, UniqueKey::Name, &skill.name, Some(id)).await?;

    skill.updated_at = OffsetDateTime::now_utc();
    Ok(store.update(skill).await?)
}

pub async fn delete(state: &AppState, identity: &Identity, id: Uuid) -> AppResult<()> {
    let store = state.skills.as_ref();
    let skill = find_or_404(store, id).await?;
    ensure_can_modify(identity, Some(skill.user_id), "skill")?;
    if !store.delete(id).await? {
        return Err(AppError::not_found("Skill not found"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{auth::services::Role, categories::dto::CreateCategoryRequest};

    fn skill(name: &str, years: Option<i32>) -> CreateSkillRequest {
        CreateSkillRequest {
            name: Some(name.into()),
            years_exp: years,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn names_are_lowercased_and_unique() {
        let state = AppState::fake();
        let me = Identity::fake(Role::User);
        let created = create(&state, &me, skill("  Rust ", Some(4))).await.unwrap();
        assert_eq!(created.name, "rust");
        assert_eq!(created.level, SkillLevel::Intermediate);

        let err = create(&state, &me, skill("RUST", None)).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        assert_eq!(err.to_string(), "Skill with this name already exists");
    }

    #[tokio::test]
    async fn level_and_years_are_validated() {
        let state = AppState::fake();
        let me = Identity::fake(Role::User);
        let mut req = skill("go", None);
        req.level = Some("guru".into());
        let err = create(&state, &me, req).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "level must be one of: BEGINNER, INTERMEDIATE, ADVANCED, EXPERT"
        );

        let err = create(&state, &me, skill("go", Some(-1))).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let mut req = skill("go", Some(0));
        req.level = Some("expert".into());
        let created = create(&state, &me, req).await.unwrap();
        assert_eq!(created.level, SkillLevel::Expert);
    }

    #[tokio::test]
    async fn list_orders_by_years_then_recency_and_filters_category() {
        let state = AppState::fake();
        let me = Identity::fake(Role::User);
        let lang = categories::services::create(
            &state,
            CreateCategoryRequest {
                name: Some("Languages".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        create(&state, &me, skill("docker", None)).await.unwrap();
        let mut rust = skill("rust", Some(5));
        rust.category_id = Some(lang.id);
        create(&state, &me, rust).await.unwrap();
        create(&state, &me, skill("sql", Some(8))).await.unwrap();

        let all = list(&state, &ListQuery::default()).await.unwrap();
        let names: Vec<&str> = all.items.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["sql", "rust", "docker"]);

        let langs = list(
            &state,
            &ListQuery {
                category: Some("languages".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(langs.items.len(), 1);
        assert_eq!(langs.items[0].name, "rust");
    }

    #[tokio::test]
    async fn update_and_delete_follow_ownership() {
        let state = AppState::fake();
        let me = Identity::fake(Role::User);
        let created = create(&state, &me, skill("axum", Some(1))).await.unwrap();

        let updated = update(
            &state,
            &me,
            created.id,
            UpdateSkillRequest {
                level: Patch::Value("Advanced".into()),
                years_exp: Patch::Null,
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(updated.level, SkillLevel::Advanced);
        assert_eq!(updated.years_exp, None);
        assert_eq!(updated.name, "axum");

        let stranger = Identity::fake(Role::User);
        assert!(matches!(
            delete(&state, &stranger, created.id).await.unwrap_err(),
            AppError::Forbidden(_)
        ));
        delete(&state, &me, created.id).await.unwrap();
        assert!(matches!(get(&state, created.id).await.unwrap_err(), AppError::NotFound(_)));
    }
}
