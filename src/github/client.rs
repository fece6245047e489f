//! Read-only client for the public GitHub REST API.

use std::time::Duration;

use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use reqwest::{header, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use time::{format_description::well_known::Rfc3339, OffsetDateTime};

use crate::{config::GithubConfig, error::AppError};

const USER_AGENT: &str = "folio-api";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

lazy_static! {
    static ref LAST_PAGE: Regex =
        Regex::new(r#"[?&]page=(\d+)[^>]*>;\s*rel="last""#).expect("static regex");
    static ref USERNAME: Regex =
        Regex::new(r"^[A-Za-z0-9](?:[A-Za-z0-9-]{0,38})$").expect("static regex");
}

#[derive(Debug, thiserror::Error)]
pub enum GithubError {
    #[error("GitHub resource not found")]
    NotFound,

    #[error("GitHub API error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("GitHub request failed: {0}")]
    Request(#[from] reqwest::Error),
}

impl From<GithubError> for AppError {
    fn from(err: GithubError) -> Self {
        match err {
            GithubError::NotFound => AppError::not_found("GitHub user not found"),
            other => AppError::Internal(anyhow::Error::new(other).context("github")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GithubProfile {
    pub login: String,
    pub id: u64,
    pub avatar_url: String,
    pub html_url: String,
    pub name: Option<String>,
    pub company: Option<String>,
    pub blog: Option<String>,
    pub location: Option<String>,
    pub email: Option<String>,
    pub bio: Option<String>,
    #[serde(default)]
    pub public_repos: u64,
    #[serde(default)]
    pub followers: u64,
    #[serde(default)]
    pub following: u64,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GithubOwner {
    pub login: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GithubRepo {
    pub id: u64,
    pub name: String,
    pub full_name: String,
    pub owner: GithubOwner,
    pub html_url: String,
    pub description: Option<String>,
    #[serde(default)]
    pub fork: bool,
    pub homepage: Option<String>,
    #[serde(default)]
    pub stargazers_count: u64,
    #[serde(default)]
    pub forks_count: u64,
    #[serde(default)]
    pub open_issues_count: u64,
    pub language: Option<String>,
    #[serde(default)]
    pub topics: Vec<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
    pub pushed_at: Option<String>,
}

/// Query for `GET /users/{username}/repos`. Values are already validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoQuery {
    pub page: u32,
    pub per_page: u32,
    pub sort: &'static str,
    pub direction: &'static str,
}

impl Default for RepoQuery {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: 10,
            sort: "updated",
            direction: "desc",
        }
    }
}

#[async_trait]
pub trait GithubApi: Send + Sync {
    async fn profile(&self, username: &str) -> Result<GithubProfile, GithubError>;

    async fn repos(&self, username: &str, query: &RepoQuery) -> Result<Vec<GithubRepo>, GithubError>;

    /// Commits on the default branch of `owner/repo` in `[since, until)`.
    async fn commit_count(
        &self,
        owner: &str,
        repo: &str,
        since: OffsetDateTime,
        until: OffsetDateTime,
    ) -> Result<u64, GithubError>;
}

/// GitHub logins are 1-39 characters of ASCII letters, digits and hyphens.
pub fn is_valid_username(username: &str) -> bool {
    USERNAME.is_match(username)
}

/// Page number of the `rel="last"` link, if the response was paginated.
fn last_page(link: &str) -> Option<u64> {
    LAST_PAGE
        .captures(link)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

pub struct HttpGithub {
    client: reqwest::Client,
    api_url: String,
    token: Option<String>,
}

impl HttpGithub {
    pub fn new(config: &GithubConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self {
            client,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
        })
    }

    fn get(&self, path: &str) -> reqwest::RequestBuilder {
        let request = self
            .client
            .get(format!("{}{path}", self.api_url))
            .header(header::ACCEPT, "application/vnd.github.v3+json");
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn checked(response: reqwest::Response) -> Result<reqwest::Response, GithubError> {
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(GithubError::NotFound);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GithubError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    async fn fetch<T: DeserializeOwned>(&self, request: reqwest::RequestBuilder) -> Result<T, GithubError> {
        let response = Self::checked(request.send().await?).await?;
        Ok(response.json().await?)
    }
}

#[async_trait]
impl GithubApi for HttpGithub {
    async fn profile(&self, username: &str) -> Result<GithubProfile, GithubError> {
        self.fetch(self.get(&format!("/users/{username}"))).await
    }

    async fn repos(&self, username: &str, query: &RepoQuery) -> Result<Vec<GithubRepo>, GithubError> {
        let request = self.get(&format!("/users/{username}/repos")).query(&[
            ("page", query.page.to_string()),
            ("per_page", query.per_page.to_string()),
            ("sort", query.sort.to_string()),
            ("direction", query.direction.to_string()),
        ]);
        self.fetch(request).await
    }

    async fn commit_count(
        &self,
        owner: &str,
        repo: &str,
        since: OffsetDateTime,
        until: OffsetDateTime,
    ) -> Result<u64, GithubError> {
        let fmt = |t: OffsetDateTime| t.format(&Rfc3339).unwrap_or_default();
        let request = self.get(&format!("/repos/{owner}/{repo}/commits")).query(&[
            ("since", fmt(since)),
            ("until", fmt(until)),
            ("per_page", "1".to_string()),
        ]);
        let response = Self::checked(request.send().await?).await?;

        // one commit per page, so the last page number is the commit count
        let link = response
            .headers()
            .get(header::LINK)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        if let Some(pages) = link.as_deref().and_then(last_page) {
            return Ok(pages);
        }
        let commits: Vec<serde_json::Value> = response.json().await?;
        Ok(commits.len() as u64)
    }
}

/// Canned GitHub data for tests.
#[cfg(test)]
#[derive(Default)]
pub struct StaticGithub {
    pub profile: Option<GithubProfile>,
    pub repos: Vec<GithubRepo>,
    /// Commit counts by repo name; repos missing here fail.
    pub commits: std::collections::HashMap<String, u64>,
}

#[cfg(test)]
impl StaticGithub {
    pub fn profile(login: &str) -> GithubProfile {
        GithubProfile {
            login: login.into(),
            id: 1,
            avatar_url: format!("https://avatars.test/{login}"),
            html_url: format!("https://github.com/{login}"),
            name: Some("Test User".into()),
            company: None,
            blog: None,
            location: None,
            email: None,
            bio: None,
            public_repos: 0,
            followers: 3,
            following: 1,
            created_at: "2015-01-01T00:00:00Z".into(),
            updated_at: "2024-01-01T00:00:00Z".into(),
        }
    }

    pub fn repo(owner: &str, name: &str, stars: u64, forks: u64, language: Option<&str>) -> GithubRepo {
        GithubRepo {
            id: stars * 1000 + forks,
            name: name.into(),
            full_name: format!("{owner}/{name}"),
            owner: GithubOwner { login: owner.into() },
            html_url: format!("https://github.com/{owner}/{name}"),
            description: None,
            fork: false,
            homepage: None,
            stargazers_count: stars,
            forks_count: forks,
            open_issues_count: 1,
            language: language.map(str::to_string),
            topics: Vec::new(),
            created_at: None,
            updated_at: None,
            pushed_at: None,
        }
    }
}

#[cfg(test)]
#[async_trait]
impl GithubApi for StaticGithub {
    async fn profile(&self, username: &str) -> Result<GithubProfile, GithubError> {
        self.profile
            .clone()
            .filter(|p| p.login.eq_ignore_ascii_case(username))
            .ok_or(GithubError::NotFound)
    }

    async fn repos(&self, username: &str, query: &RepoQuery) -> Result<Vec<GithubRepo>, GithubError> {
        self.profile(username).await?;
        let skip = ((query.page - 1) * query.per_page) as usize;
        Ok(self
            .repos
            .iter()
            .skip(skip)
            .take(query.per_page as usize)
            .cloned()
            .collect())
    }

    async fn commit_count(
        &self,
        _owner: &str,
        repo: &str,
        _since: OffsetDateTime,
        _until: OffsetDateTime,
    ) -> Result<u64, GithubError> {
        self.commits.get(repo).copied().ok_or(GithubError::Api {
            status: 409,
            body: "Git Repository is empty.".into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_last_page_from_link_header() {
        let link = r#"<https://api.github.com/repositories/1/commits?since=x&per_page=1&page=2>; rel="next", <https://api.github.com/repositories/1/commits?since=x&per_page=1&page=57>; rel="last""#;
        assert_eq!(last_page(link), Some(57));
        let only_next = r#"<https://api.github.com/x?page=2>; rel="next""#;
        assert_eq!(last_page(only_next), None);
    }

    #[test]
    fn username_rules() {
        assert!(is_valid_username("octocat"));
        assert!(is_valid_username("some-user-42"));
        assert!(!is_valid_username("-leading"));
        assert!(!is_valid_username("../etc"));
        assert!(!is_valid_username(&"a".repeat(40)));
    }

    #[test]
    fn not_found_maps_to_404_and_others_to_500() {
        use axum::http::StatusCode;
        assert_eq!(AppError::from(GithubError::NotFound).status(), StatusCode::NOT_FOUND);
        let api = GithubError::Api {
            status: 403,
            body: "rate limited".into(),
        };
        assert_eq!(AppError::from(api).status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
