use std::collections::HashMap;

use futures::{stream, StreamExt};
use serde::Serialize;
use time::{Date, Month, OffsetDateTime};
use tracing::debug;

use super::client::{GithubApi, GithubError, GithubProfile, GithubRepo, RepoQuery};

/// Upper bound on repositories considered (one GitHub page).
const MAX_REPOS: u32 = 100;
const COMMIT_FETCH_CONCURRENCY: usize = 8;
const TOP_REPOS: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LanguageShare {
    pub name: String,
    pub count: u64,
    pub percentage: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopRepo {
    pub name: String,
    pub description: Option<String>,
    pub url: String,
    pub stars: u64,
    pub forks: u64,
    pub language: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GithubStats {
    pub total_stars: u64,
    pub total_forks: u64,
    /// Open issues and pull requests across all repositories.
    pub total_contributions: u64,
    pub total_commits_this_year: u64,
    pub total_repos: u64,
    pub languages: Vec<LanguageShare>,
    pub top_repos: Vec<TopRepo>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatsReport {
    pub profile: GithubProfile,
    pub stats: GithubStats,
}

/// Aggregates over the repository list; commit counting happens elsewhere.
pub fn summarize(repos: &[GithubRepo], commits_this_year: u64) -> GithubStats {
    let total = repos.len() as u64;

    let mut by_language: HashMap<&str, u64> = HashMap::new();
    for lang in repos.iter().filter_map(|r| r.language.as_deref()) {
        *by_language.entry(lang).or_default() += 1;
    }
    let mut languages: Vec<LanguageShare> = by_language
        .into_iter()
        .map(|(name, count)| LanguageShare {
            name: name.to_string(),
            count,
            percentage: ((count as f64 / total as f64) * 100.0).round() as u32,
        })
        .collect();
    languages.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.name.cmp(&b.name)));

    let mut ranked: Vec<&GithubRepo> = repos.iter().collect();
    ranked.sort_by(|a, b| b.stargazers_count.cmp(&a.stargazers_count));
    let top_repos = ranked
        .into_iter()
        .take(TOP_REPOS)
        .map(|r| TopRepo {
            name: r.name.clone(),
            description: r.description.clone(),
            url: r.html_url.clone(),
            stars: r.stargazers_count,
            forks: r.forks_count,
            language: r.language.clone(),
        })
        .collect();

    GithubStats {
        total_stars: repos.iter().map(|r| r.stargazers_count).sum(),
        total_forks: repos.iter().map(|r| r.forks_count).sum(),
        total_contributions: repos.iter().map(|r| r.open_issues_count).sum(),
        total_commits_this_year: commits_this_year,
        total_repos: total,
        languages,
        top_repos,
    }
}

fn year_bounds(now: OffsetDateTime) -> (OffsetDateTime, OffsetDateTime) {
    let start_of = |year: i32| {
        Date::from_calendar_date(year, Month::January, 1)
            .map(|d| d.midnight().assume_utc())
            .unwrap_or(now)
    };
    (start_of(now.year()), start_of(now.year() + 1))
}

/// Sums this year's commits over `repos`; repositories that fail (empty,
/// private, rate limited) count as zero.
async fn commits_this_year(api: &dyn GithubApi, repos: &[GithubRepo], now: OffsetDateTime) -> u64 {
    let (since, until) = year_bounds(now);
    let targets: Vec<(String, String, String)> = repos
        .iter()
        .map(|r| (r.owner.login.clone(), r.name.clone(), r.full_name.clone()))
        .collect();
    stream::iter(targets)
        .map(|(owner, name, full_name)| async move {
            match api.commit_count(&owner, &name, since, until).await {
                Ok(n) => n,
                Err(e) => {
                    debug!(repo = %full_name, error = %e, "skipping commit count");
                    0
                }
            }
        })
        .buffer_unordered(COMMIT_FETCH_CONCURRENCY)
        .fold(0u64, |acc, n| async move { acc + n })
        .await
}

pub async fn collect(
    api: &dyn GithubApi,
    username: &str,
    now: OffsetDateTime,
) -> Result<StatsReport, GithubError> {
    let query = RepoQuery {
        per_page: MAX_REPOS,
        ..RepoQuery::default()
    };
    let (profile, repos) = tokio::try_join!(api.profile(username), api.repos(username, &query))?;
    let commits = commits_this_year(api, &repos, now).await;
    Ok(StatsReport {
        profile,
        stats: summarize(&repos, commits),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::github::client::StaticGithub;

    fn repos() -> Vec<GithubRepo> {
        vec![
            StaticGithub::repo("octo", "a", 5, 1, Some("Rust")),
            StaticGithub::repo("octo", "b", 50, 4, Some("Rust")),
            StaticGithub::repo("octo", "c", 0, 0, Some("TypeScript")),
            StaticGithub::repo("octo", "d", 7, 2, None),
            StaticGithub::repo("octo", "e", 1, 0, Some("Go")),
            StaticGithub::repo("octo", "f", 3, 0, Some("Rust")),
        ]
    }

    #[test]
    fn summarize_totals_languages_and_top_repos() {
        let stats = summarize(&repos(), 12);
        assert_eq!(stats.total_stars, 66);
        assert_eq!(stats.total_forks, 7);
        assert_eq!(stats.total_contributions, 6);
        assert_eq!(stats.total_repos, 6);
        assert_eq!(stats.total_commits_this_year, 12);

        assert_eq!(stats.languages[0], LanguageShare { name: "Rust".into(), count: 3, percentage: 50 });
        // ties broken by name
        assert_eq!(stats.languages[1].name, "Go");
        assert_eq!(stats.languages[1].percentage, 17);
        assert_eq!(stats.languages.len(), 3);

        let top: Vec<&str> = stats.top_repos.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(top, vec!["b", "d", "a", "f", "e"]);
    }

    #[test]
    fn summarize_empty_list() {
        let stats = summarize(&[], 0);
        assert_eq!(stats.total_repos, 0);
        assert!(stats.languages.is_empty());
        assert!(stats.top_repos.is_empty());
    }

    #[tokio::test]
    async fn collect_ignores_failing_repos() {
        let github = StaticGithub {
            profile: Some(StaticGithub::profile("octo")),
            repos: repos(),
            commits: [("a".to_string(), 10), ("b".to_string(), 32)].into_iter().collect(),
        };
        let report = collect(&github, "octo", OffsetDateTime::now_utc()).await.unwrap();
        assert_eq!(report.profile.login, "octo");
        assert_eq!(report.stats.total_commits_this_year, 42);
    }

    #[tokio::test]
    async fn collect_unknown_user_is_not_found() {
        let github = StaticGithub::default();
        let err = collect(&github, "ghost", OffsetDateTime::now_utc()).await.unwrap_err();
        assert!(matches!(err, GithubError::NotFound));
    }

    #[test]
    fn year_bounds_cover_calendar_year() {
        let now = OffsetDateTime::from_unix_timestamp(1_718_000_000).unwrap(); // June 2024
        let (since, until) = year_bounds(now);
        assert_eq!(since.year(), 2024);
        assert_eq!((since.month(), since.day()), (Month::January, 1));
        assert_eq!(until.year(), 2025);
    }
}
