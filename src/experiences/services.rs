use time::OffsetDateTime;
use tracing::info;
use uuid::Uuid;

use super::{
    dto::{CreateExperienceRequest, UpdateExperienceRequest},
    repo::{Experience, ExperienceType},
};
use crate::{
    auth::services::Identity,
    error::{AppError, AppResult},
    resources::{
        ensure_can_modify, find_or_404, paginate,
        validate::{self, Required},
        ListQuery, Page, Patch,
    },
    state::AppState,
    store::NoFilter,
};

pub const DEFAULT_LIMIT: u32 = 10;

pub async fn list(state: &AppState, query: &ListQuery) -> AppResult<Page<Experience>> {
    Ok(paginate(state.experiences.as_ref(), &NoFilter, query.page_request(DEFAULT_LIMIT)).await?)
}

pub async fn get(state: &AppState, id: Uuid) -> AppResult<Experience> {
    find_or_404(state.experiences.as_ref(), id).await
}

pub async fn create(
    state: &AppState,
    identity: &Identity,
    req: CreateExperienceRequest,
) -> AppResult<Experience> {
    Required::new()
        .text("title", &req.title)
        .text("company", &req.company)
        .text("startDate", &req.start_date)
        .check()?;
    let start = validate::parse_date("startDate", req.start_date.as_deref().unwrap_or_default())?;
    let end = req
        .end_date
        .as_deref()
        .map(|d| validate::parse_date("endDate", d))
        .transpose()?;
    validate::date_range(Some(start), end)?;
    let employment_type = req
        .employment_type
        .as_deref()
        .map(ExperienceType::parse)
        .transpose()?
        .unwrap_or_default();

    let now = OffsetDateTime::now_utc();
    let experience = state
        .experiences
        .insert(Experience {
            id: Uuid::new_v4(),
            user_id: identity.id,
            title: req.title.unwrap_or_default().trim().to_string(),
            company: req.company.unwrap_or_default().trim().to_string(),
            location: validate::optional_text(req.location),
            description: req.description,
            technologies: validate::tags(req.technologies.unwrap_or_default()),
            employment_type,
            start_date: start,
            end_date: end,
            current: req.current.unwrap_or(false),
            created_at: now,
            updated_at: now,
        })
        .await?;
    info!(experience_id = %experience.id, "experience created");
    Ok(experience)
}

pub async fn update(
    state: &AppState,
    identity: &Identity,
    id: Uuid,
    req: UpdateExperienceRequest,
) -> AppResult<Experience> {
    let store = state.experiences.as_ref();
    let mut exp = find_or_404(store, id).await?;
    ensure_can_modify(identity, Some(exp.user_id), "experience")?;

    req.title
        .map(|t| t.trim().to_string())
        .apply_required(&mut exp.title, "title")?;
    req.company
        .map(|c| c.trim().to_string())
        .apply_required(&mut exp.company, "company")?;
    if exp.title.is_empty() || exp.company.is_empty() {
        return Err(AppError::validation("title and company cannot be empty"));
    }
    req.location.apply(&mut exp.location);
    req.description.apply(&mut exp.description);
    match req.technologies {
        Patch::Missing => {}
        Patch::Null => exp.technologies.clear(),
        Patch::Value(list) => exp.technologies = validate::tags(list),
    }
    req.employment_type
        .try_map(|t| ExperienceType::parse(&t))?
        .apply_required(&mut exp.employment_type, "type")?;
    validate::patch_period(req.start_date, req.end_date, &mut exp.start_date, &mut exp.end_date)?;
    req.current.apply_required(&mut exp.current, "current")?;

    exp.updated_at = OffsetDateTime::now_utc();
    Ok(store.update(exp).await?)
}

pub async fn delete(state: &AppState, identity: &Identity, id: Uuid) -> AppResult<()> {
    let store = state.experiences.as_ref();
    let exp = find_or_404(store, id).await?;
    ensure_can_modify(identity, Some(exp.user_id), "experience")?;
    if !store.delete(id).await? {
        return Err(AppError::not_found("Experience not found"));
    }
    Ok(())
}
