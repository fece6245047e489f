use axum::{
    extract::{Query, State},
    routing::get,
    Router,
};
use serde::Deserialize;
use time::OffsetDateTime;
use tracing::instrument;

use super::{
    client::{self, GithubProfile, GithubRepo, RepoQuery},
    stats::{self, StatsReport},
};
use crate::{
    error::{AppError, AppResult},
    resources::ApiPath,
    response::ApiResponse,
    state::AppState,
};

const SORTS: &[&str] = &["created", "updated", "pushed", "full_name"];

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/github/profile/:username", get(profile))
        .route("/github/repos/:username", get(repos))
        .route("/github/stats/:username", get(user_stats))
}

#[derive(Debug, Default, Deserialize)]
pub struct RepoParams {
    pub page: Option<String>,
    pub per_page: Option<String>,
    pub sort: Option<String>,
    pub direction: Option<String>,
}

impl RepoParams {
    /// Unknown or out-of-range values fall back to the defaults.
    fn to_query(&self) -> RepoQuery {
        let defaults = RepoQuery::default();
        let number = |raw: &Option<String>| {
            raw.as_deref()
                .and_then(|v| v.trim().parse::<u32>().ok())
                .filter(|v| *v > 0)
        };
        let sort = self
            .sort
            .as_deref()
            .and_then(|s| SORTS.iter().find(|known| **known == s).copied())
            .unwrap_or(defaults.sort);
        let direction = match self.direction.as_deref() {
            Some("asc") => "asc",
            Some("desc") => "desc",
            _ => defaults.direction,
        };
        RepoQuery {
            page: number(&self.page).unwrap_or(defaults.page),
            per_page: number(&self.per_page).map_or(defaults.per_page, |n| n.min(100)),
            sort,
            direction,
        }
    }
}

fn check_username(username: &str) -> AppResult<()> {
    if client::is_valid_username(username) {
        Ok(())
    } else {
        Err(AppError::validation("Invalid GitHub username"))
    }
}

#[instrument(skip(state))]
pub async fn profile(
    State(state): State<AppState>,
    ApiPath(username): ApiPath<String>,
) -> AppResult<ApiResponse<GithubProfile>> {
    check_username(&username)?;
    Ok(ApiResponse::ok(state.github.profile(&username).await?))
}

#[instrument(skip(state))]
pub async fn repos(
    State(state): State<AppState>,
    ApiPath(username): ApiPath<String>,
    Query(params): Query<RepoParams>,
) -> AppResult<ApiResponse<Vec<GithubRepo>>> {
    check_username(&username)?;
    let repos = state.github.repos(&username, &params.to_query()).await?;
    Ok(ApiResponse::ok(repos))
}

#[instrument(skip(state))]
pub async fn user_stats(
    State(state): State<AppState>,
    ApiPath(username): ApiPath<String>,
) -> AppResult<ApiResponse<StatsReport>> {
    check_username(&username)?;
    let report = stats::collect(state.github.as_ref(), &username, OffsetDateTime::now_utc()).await?;
    Ok(ApiResponse::ok(report))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(page: &str, per_page: &str, sort: &str, direction: &str) -> RepoParams {
        RepoParams {
            page: Some(page.into()),
            per_page: Some(per_page.into()),
            sort: Some(sort.into()),
            direction: Some(direction.into()),
        }
    }

    #[test]
    fn repo_params_are_lenient() {
        assert_eq!(RepoParams::default().to_query(), RepoQuery::default());

        let q = params("3", "500", "pushed", "asc").to_query();
        assert_eq!((q.page, q.per_page, q.sort, q.direction), (3, 100, "pushed", "asc"));

        let q = params("zero", "-1", "stars", "sideways").to_query();
        assert_eq!(q, RepoQuery::default());
    }

    #[test]
    fn usernames_are_checked_before_calling_out() {
        assert!(check_username("octocat").is_ok());
        assert!(check_username("a/b").is_err());
    }
}
