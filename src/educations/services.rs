use time::OffsetDateTime;
use tracing::info;
use uuid::Uuid;

use super::{
    dto::{CreateEducationRequest, UpdateEducationRequest},
    repo::Education,
};
use crate::{
    auth::services::Identity,
    error::{AppError, AppResult},
    resources::{
        ensure_can_modify, find_or_404, paginate,
        validate::{self, Required},
        ListQuery, Page,
    },
    state::AppState,
    store::NoFilter,
};

pub const DEFAULT_LIMIT: u32 = 10;

pub async fn list(state: &AppState, query: &ListQuery) -> AppResult<Page<Education>> {
    Ok(paginate(state.educations.as_ref(), &NoFilter, query.page_request(DEFAULT_LIMIT)).await?)
}

pub async fn get(state: &AppState, id: Uuid) -> AppResult<Education> {
    find_or_404(state.educations.as_ref(), id).await
}

pub async fn create(
    state: &AppState,
    identity: &Identity,
    req: CreateEducationRequest,
) -> AppResult<Education> {
    Required::new()
        .text("degree", &req.degree)
        .text("school", &req.school)
        .text("startDate", &req.start_date)
        .check()?;
    let start = validate::parse_date("startDate", req.start_date.as_deref().unwrap_or_default())?;
    let end = req
        .end_date
        .as_deref()
        .map(|d| validate::parse_date("endDate", d))
        .transpose()?;
    validate::date_range(Some(start), end)?;

    let now = OffsetDateTime::now_utc();
    let education = state
        .educations
        .insert(Education {
            id: Uuid::new_v4(),
            user_id: identity.id,
            degree: req.degree.unwrap_or_default().trim().to_string(),
            school: req.school.unwrap_or_default().trim().to_string(),
            field: validate::optional_text(req.field),
            location: validate::optional_text(req.location),
            description: req.description,
            grade: validate::optional_text(req.grade),
            start_date: start,
            end_date: end,
            current: req.current.unwrap_or(false),
            created_at: now,
            updated_at: now,
        })
        .await?;
    info!(education_id = %education.id, "education created");
    Ok(education)
}

pub async fn update(
    state: &AppState,
    identity: &Identity,
    id: Uuid,
    req: UpdateEducationRequest,
) -> AppResult<Education> {
    let store = state.educations.as_ref();
    let mut edu = find_or_404(store, id).await?;
    ensure_can_modify(identity, Some(edu.user_id), "education")?;

    req.degree
        .map(|d| d.trim().to_string())
        .apply_required(&mut edu.degree, "degree")?;
    req.school
        .map(|s| s.trim().to_string())
        .apply_required(&mut edu.school, "school")?;
    if edu.degree.is_empty() || edu.school.is_empty() {
        return Err(AppError::validation("degree and school cannot be empty"));
    }
    req.field.apply(&mut edu.field);
    req.location.apply(&mut edu.location);
    req.description.apply(&mut edu.description);
    req.grade.apply(&mut edu.grade);
    validate::patch_period(req.start_date, req.end_date, &mut edu.start_date, &mut edu.end_date)?;
    req.current.apply_required(&mut edu.current, "current")?;

    edu.updated_at = OffsetDateTime::now_utc();
    Ok(store.update(edu).await?)
}

pub async fn delete(state: &AppState, identity: &Identity, id: Uuid) -> AppResult<()> {
    let store = state.educations.as_ref();
    let edu = find_or_404(store, id).await?;
    ensure_can_modify(identity, Some(edu.user_id), "education")?;
    if !store.delete(id).await? {
        return Err(AppError::not_found("Education not found"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{auth::services::Role, resources::Patch};

    fn degree(name: &str, start: &str, end: Option<&str>) -> CreateEducationRequest {
        CreateEducationRequest {
            degree: Some(name.into()),
            school: Some("State University".into()),
            start_date: Some(start.into()),
            end_date: end.map(str::to_string),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn create_and_list_by_start_date() {
        let state = AppState::fake();
        let me = Identity::fake(Role::User);
        create(&state, &me, degree("BSc", "2012-09-01", Some("2015-06-30"))).await.unwrap();
        create(&state, &me, degree("MSc", "2015-09-01", Some("2017-06-30"))).await.unwrap();

        let page = list(&state, &ListQuery::default()).await.unwrap();
        let degrees: Vec<&str> = page.items.iter().map(|e| e.degree.as_str()).collect();
        assert_eq!(degrees, vec!["MSc", "BSc"]);
        assert_eq!(page.pagination.pages, 1);
    }

    #[tokio::test]
    async fn invalid_periods_are_rejected() {
        let state = AppState::fake();
        let me = Identity::fake(Role::User);
        let err = create(&state, &me, degree("PhD", "2020-01-01", Some("2019-01-01")))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(state.educations.count(&NoFilter).await.unwrap(), 0);

        let mut missing = degree("PhD", "2020-01-01", None);
        missing.school = None;
        let err = create(&state, &me, missing).await.unwrap_err();
        assert_eq!(err.to_string(), "Missing required fields: school");
    }

    #[tokio::test]
    async fn update_patches_and_checks_owner() {
        let state = AppState::fake();
        let me = Identity::fake(Role::User);
        let mut req = degree("BSc", "2012-09-01", None);
        req.grade = Some("A".into());
        let edu = create(&state, &me, req).await.unwrap();

        let updated = update(
            &state,
            &me,
            edu.id,
            UpdateEducationRequest {
                field: Patch::Value("Computer Science".into()),
                grade: Patch::Null,
                end_date: Patch::Value("2015-06-30".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(updated.field.as_deref(), Some("Computer Science"));
        assert_eq!(updated.grade, None);
        assert!(updated.end_date.is_some());

        let other = Identity::fake(Role::User);
        let err = update(&state, &other, edu.id, UpdateEducationRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));

        let admin = Identity::fake(Role::Admin);
        delete(&state, &admin, edu.id).await.unwrap();
        assert!(matches!(get(&state, edu.id).await.unwrap_err(), AppError::NotFound(_)));
    }
}
