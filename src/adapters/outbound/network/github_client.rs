use super::http;
use crate::health_scoring::domain::{RepositoryMetrics, RepositorySlug};
use crate::ports::outbound::{DataSource, SourceCollector};
use crate::shared::security::validate_url_component;
use crate::shared::{CollectorError, CollectorResult};
use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, SecondsFormat, Utc};
use regex::Regex;
use reqwest::header::{ACCEPT, AUTHORIZATION, LINK};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::sync::LazyLock;
use std::time::Duration;

const SOURCE_NAME: &str = "github";
const COMMIT_WINDOW_DAYS: i64 = 30;
const ISSUE_WINDOW_DAYS: i64 = 90;
const PAGE_SIZE: u32 = 100;

static LAST_PAGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"[?&]page=(\d+)[^>]*>;\s*rel="last""#).expect("valid Link header pattern")
});

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RepositoryDocument {
    html_url: String,
    stargazers_count: u64,
    forks_count: u64,
    subscribers_count: Option<u64>,
    watchers_count: u64,
    open_issues_count: u64,
    archived: bool,
    fork: bool,
    license: Option<LicenseDocument>,
    topics: Vec<String>,
    default_branch: Option<String>,
    created_at: Option<DateTime<Utc>>,
    pushed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct LicenseDocument {
    spdx_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CommitItem {
    commit: CommitDetail,
}

#[derive(Debug, Deserialize)]
struct CommitDetail {
    #[serde(default)]
    committer: Option<CommitSignature>,
}

#[derive(Debug, Deserialize)]
struct CommitSignature {
    #[serde(default)]
    date: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct IssueItem {
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    closed_at: Option<DateTime<Utc>>,
    /// Present when the "issue" is really a pull request
    #[serde(default)]
    pull_request: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct PullRequestItem {
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    merged_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Default, PartialEq)]
struct IssueStats {
    close_rate: f64,
    avg_close_days: Option<f64>,
}

#[derive(Debug, Default, PartialEq)]
struct PullRequestStats {
    merge_rate: f64,
    avg_merge_days: Option<f64>,
    open_count: u64,
}

/// GitHubClient adapter for the GitHub REST v3 API
///
/// Accepts `owner/repo` or any GitHub URL as identifier. The repository
/// document is mandatory; commit, issue, pull request and contributor
/// statistics are fetched concurrently afterwards and a failing sub-query
/// leaves the metrics it feeds unknown. Such a document is partial (see
/// [`RepositoryMetrics::is_partial`]) and is cached only briefly.
///
/// # Authentication
/// An optional token is sent as `Authorization: token …`. It raises the
/// unauthenticated limit of 60 requests per hour.
pub struct GitHubClient {
    client: reqwest::Client,
    token: Option<String>,
}

impl GitHubClient {
    const API_BASE: &'static str = "https://api.github.com";
    const TTL: Duration = Duration::from_secs(24 * 60 * 60);

    pub fn new(client: reqwest::Client, token: Option<String>) -> Self {
        Self {
            client,
            token: token.filter(|t| !t.trim().is_empty()),
        }
    }

    fn parse_slug(identifier: &str) -> CollectorResult<RepositorySlug> {
        let slug = RepositorySlug::parse(identifier).ok_or_else(|| CollectorError::NotFound {
            source_name: SOURCE_NAME,
            identifier: identifier.to_string(),
        })?;

        validate_url_component(slug.owner(), "Repository owner")
            .and_then(|_| validate_url_component(slug.repo(), "Repository name"))
            .map_err(|e| CollectorError::network(SOURCE_NAME, e))?;

        Ok(slug)
    }

    fn request(&self, url: &str) -> reqwest::RequestBuilder {
        let request = self
            .client
            .get(url)
            .header(ACCEPT, "application/vnd.github.v3+json");
        match &self.token {
            Some(token) => request.header(AUTHORIZATION, format!("token {}", token)),
            None => request,
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        slug: &RepositorySlug,
        path_and_query: &str,
    ) -> CollectorResult<T> {
        let url = format!("{}/repos/{}{}", Self::API_BASE, slug, path_and_query);
        let response = http::send(SOURCE_NAME, &slug.to_string(), self.request(&url)).await?;
        http::read_json(SOURCE_NAME, response).await
    }

    async fn recent_commits(&self, slug: &RepositorySlug, now: DateTime<Utc>) -> CollectorResult<Vec<CommitItem>> {
        let query = format!(
            "/commits?since={}&per_page={}",
            since_param(now, COMMIT_WINDOW_DAYS),
            PAGE_SIZE
        );
        self.get_json(slug, &query).await
    }

    async fn issue_stats(&self, slug: &RepositorySlug, now: DateTime<Utc>) -> CollectorResult<IssueStats> {
        let open_query = format!("/issues?state=open&per_page={}", PAGE_SIZE);
        let closed_query = format!(
            "/issues?state=closed&since={}&per_page={}",
            since_param(now, ISSUE_WINDOW_DAYS),
            PAGE_SIZE
        );
        let (open, closed) = futures::try_join!(
            self.get_json::<Vec<IssueItem>>(slug, &open_query),
            self.get_json::<Vec<IssueItem>>(slug, &closed_query),
        )?;
        Ok(summarize_issues(&open, &closed))
    }

    async fn pull_request_stats(&self, slug: &RepositorySlug) -> CollectorResult<PullRequestStats> {
        let open_query = format!("/pulls?state=open&per_page={}", PAGE_SIZE);
        let closed_query = format!("/pulls?state=closed&per_page={}", PAGE_SIZE);
        let (open, closed) = futures::try_join!(
            self.get_json::<Vec<PullRequestItem>>(slug, &open_query),
            self.get_json::<Vec<PullRequestItem>>(slug, &closed_query),
        )?;
        Ok(summarize_pull_requests(&open, &closed))
    }

    /// With one contributor per page, the last page number is the count.
    async fn contributor_count(&self, slug: &RepositorySlug) -> CollectorResult<u64> {
        let url = format!(
            "{}/repos/{}/contributors?per_page=1&anon=true",
            Self::API_BASE,
            slug
        );
        let response = http::send(SOURCE_NAME, &slug.to_string(), self.request(&url)).await?;

        let from_link = response
            .headers()
            .get(LINK)
            .and_then(|v| v.to_str().ok())
            .and_then(last_page_from_link);
        if let Some(count) = from_link {
            return Ok(count);
        }

        let contributors: Vec<serde_json::Value> = http::read_json(SOURCE_NAME, response).await?;
        Ok(contributors.len() as u64)
    }
}

fn degrade<T>(result: CollectorResult<T>, metric: &'static str, slug: &RepositorySlug) -> Option<T> {
    result
        .map_err(|e| {
            tracing::debug!(source = SOURCE_NAME, repository = %slug, metric, error = %e, "sub-query failed, metric unknown");
        })
        .ok()
}

#[async_trait]
impl SourceCollector for GitHubClient {
    type Output = RepositoryMetrics;

    fn source(&self) -> DataSource {
        DataSource::Repository
    }

    fn cache_key(&self, identifier: &str) -> String {
        let slug = RepositorySlug::parse(identifier)
            .map(|s| s.to_string())
            .unwrap_or_else(|| identifier.to_string());
        format!("github:repo:{}", slug)
    }

    fn default_ttl(&self) -> Duration {
        Self::TTL
    }

    fn is_partial(&self, output: &RepositoryMetrics) -> bool {
        output.is_partial()
    }

    async fn fetch(&self, identifier: &str) -> CollectorResult<RepositoryMetrics> {
        let slug = Self::parse_slug(identifier)?;
        let now = Utc::now();
        tracing::debug!(source = SOURCE_NAME, repository = %slug, "fetching repository metrics");

        let document: RepositoryDocument = self.get_json(&slug, "").await?;

        let (commits, issues, pulls, contributors) = futures::join!(
            self.recent_commits(&slug, now),
            self.issue_stats(&slug, now),
            self.pull_request_stats(&slug),
            self.contributor_count(&slug),
        );

        Ok(build_metrics(
            document,
            degrade(commits, "commits", &slug),
            degrade(issues, "issues", &slug),
            degrade(pulls, "pull_requests", &slug),
            degrade(contributors, "contributors", &slug),
        ))
    }
}

fn since_param(now: DateTime<Utc>, days: i64) -> String {
    let since = (now - ChronoDuration::days(days)).to_rfc3339_opts(SecondsFormat::Secs, true);
    urlencoding::encode(&since).into_owned()
}

fn days_between(start: DateTime<Utc>, end: DateTime<Utc>) -> f64 {
    (end - start).num_seconds().max(0) as f64 / 86_400.0
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

fn summarize_issues(open: &[IssueItem], closed: &[IssueItem]) -> IssueStats {
    let is_issue = |item: &&IssueItem| item.pull_request.is_none();
    let open_count = open.iter().filter(is_issue).count();
    let closed: Vec<&IssueItem> = closed.iter().filter(is_issue).collect();

    let total = open_count + closed.len();
    let close_rate = if total == 0 {
        0.0
    } else {
        closed.len() as f64 / total as f64
    };

    let close_days: Vec<f64> = closed
        .iter()
        .filter_map(|i| Some(days_between(i.created_at?, i.closed_at?)))
        .collect();

    IssueStats {
        close_rate,
        avg_close_days: mean(&close_days),
    }
}

fn summarize_pull_requests(open: &[PullRequestItem], closed: &[PullRequestItem]) -> PullRequestStats {
    let merged: Vec<&PullRequestItem> = closed.iter().filter(|pr| pr.merged_at.is_some()).collect();

    let total = open.len() + closed.len();
    let merge_rate = if total == 0 {
        0.0
    } else {
        merged.len() as f64 / total as f64
    };

    let merge_days: Vec<f64> = merged
        .iter()
        .filter_map(|pr| Some(days_between(pr.created_at?, pr.merged_at?)))
        .collect();

    PullRequestStats {
        merge_rate,
        avg_merge_days: mean(&merge_days),
        open_count: open.len() as u64,
    }
}

fn last_page_from_link(link: &str) -> Option<u64> {
    LAST_PAGE
        .captures(link)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Sub-query results are `None` when that query failed.
fn build_metrics(
    document: RepositoryDocument,
    commits: Option<Vec<CommitItem>>,
    issues: Option<IssueStats>,
    pulls: Option<PullRequestStats>,
    contributors: Option<u64>,
) -> RepositoryMetrics {
    let last_commit_date = commits
        .iter()
        .flatten()
        .filter_map(|c| c.commit.committer.as_ref()?.date)
        .max()
        .or(document.pushed_at);

    RepositoryMetrics {
        url: document.html_url,
        stars: document.stargazers_count,
        forks: document.forks_count,
        watchers: document.subscribers_count.unwrap_or(document.watchers_count),
        open_issues: document.open_issues_count,
        open_pull_requests: pulls.as_ref().map(|p| p.open_count),
        contributors,
        archived: document.archived,
        fork: document.fork,
        license: document
            .license
            .and_then(|l| l.spdx_id)
            .filter(|id| id != "NOASSERTION"),
        topics: document.topics,
        default_branch: document.default_branch,
        last_commit_date,
        created_at: document.created_at,
        commit_frequency: commits.map(|c| c.len() as f64 / COMMIT_WINDOW_DAYS as f64),
        issue_close_rate: issues.as_ref().map(|i| i.close_rate),
        pr_merge_rate: pulls.as_ref().map(|p| p.merge_rate),
        avg_issue_close_days: issues.and_then(|i| i.avg_close_days),
        avg_pr_merge_days: pulls.and_then(|p| p.avg_merge_days),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> GitHubClient {
        GitHubClient::new(http::build_client(http::DEFAULT_TIMEOUT).unwrap(), None)
    }

    #[test]
    fn test_cache_key_is_canonical() {
        let client = client();
        assert_eq!(client.source(), DataSource::Repository);
        assert_eq!(
            client.cache_key("https://github.com/PSF/requests.git"),
            "github:repo:psf/requests"
        );
        assert_eq!(client.cache_key("psf/requests"), "github:repo:psf/requests");
        assert_eq!(client.default_ttl(), Duration::from_secs(86_400));
    }

    #[test]
    fn test_blank_token_is_ignored() {
        let client = GitHubClient::new(
            http::build_client(http::DEFAULT_TIMEOUT).unwrap(),
            Some("  ".to_string()),
        );
        assert!(client.token.is_none());
    }

    #[tokio::test]
    async fn test_non_github_identifier_is_not_found() {
        let error = client()
            .fetch("https://gitlab.com/group/project")
            .await
            .unwrap_err();
        assert!(error.is_not_found());
    }

    #[test]
    fn test_last_page_from_link_header() {
        let link = r#"<https://api.github.com/repositories/1362490/contributors?per_page=1&anon=true&page=2>; rel="next", <https://api.github.com/repositories/1362490/contributors?per_page=1&anon=true&page=731>; rel="last""#;
        assert_eq!(last_page_from_link(link), Some(731));
        assert_eq!(last_page_from_link(r#"<https://x?page=2>; rel="next""#), None);
    }

    #[test]
    fn test_issue_summary_excludes_pull_requests() {
        let open: Vec<IssueItem> = serde_json::from_str(
            r#"[{"created_at": "2024-01-01T00:00:00Z"},
                {"created_at": "2024-01-01T00:00:00Z", "pull_request": {}}]"#,
        )
        .unwrap();
        let closed: Vec<IssueItem> = serde_json::from_str(
            r#"[{"created_at": "2024-01-01T00:00:00Z", "closed_at": "2024-01-03T00:00:00Z"},
                {"created_at": "2024-01-01T00:00:00Z", "closed_at": "2024-01-05T00:00:00Z"},
                {"created_at": "2024-01-01T00:00:00Z", "closed_at": "2024-01-02T00:00:00Z", "pull_request": {}}]"#,
        )
        .unwrap();

        let stats = summarize_issues(&open, &closed);
        assert!((stats.close_rate - 2.0 / 3.0).abs() < 1e-9);
        assert_eq!(stats.avg_close_days, Some(3.0));
    }

    #[test]
    fn test_pull_request_summary() {
        let open: Vec<PullRequestItem> =
            serde_json::from_str(r#"[{"created_at": "2024-01-01T00:00:00Z"}]"#).unwrap();
        let closed: Vec<PullRequestItem> = serde_json::from_str(
            r#"[{"created_at": "2024-01-01T00:00:00Z", "merged_at": "2024-01-02T00:00:00Z"},
                {"created_at": "2024-01-01T00:00:00Z", "merged_at": null},
                {"created_at": "2024-01-01T00:00:00Z", "merged_at": "2024-01-04T00:00:00Z"}]"#,
        )
        .unwrap();

        let stats = summarize_pull_requests(&open, &closed);
        assert_eq!(stats.open_count, 1);
        assert_eq!(stats.merge_rate, 0.5);
        assert_eq!(stats.avg_merge_days, Some(2.0));
    }

    #[test]
    fn test_empty_activity_yields_zero_rates() {
        assert_eq!(summarize_issues(&[], &[]), IssueStats::default());
        assert_eq!(summarize_pull_requests(&[], &[]), PullRequestStats::default());
    }

    #[test]
    fn test_build_metrics_from_documents() {
        let document: RepositoryDocument = serde_json::from_str(
            r#"{
                "html_url": "https://github.com/psf/requests",
                "stargazers_count": 52000,
                "forks_count": 9300,
                "subscribers_count": 1300,
                "open_issues_count": 250,
                "archived": false,
                "fork": false,
                "license": {"spdx_id": "Apache-2.0"},
                "topics": ["http", "python"],
                "default_branch": "main",
                "created_at": "2011-02-13T18:38:17Z",
                "pushed_at": "2024-05-01T00:00:00Z"
            }"#,
        )
        .unwrap();
        let commits: Vec<CommitItem> = serde_json::from_str(
            r#"[{"commit": {"committer": {"date": "2024-05-20T10:00:00Z"}}},
                {"commit": {"committer": {"date": "2024-05-10T10:00:00Z"}}},
                {"commit": {"committer": null}}]"#,
        )
        .unwrap();

        let metrics = build_metrics(
            document,
            Some(commits),
            Some(IssueStats {
                close_rate: 0.8,
                avg_close_days: Some(4.0),
            }),
            Some(PullRequestStats::default()),
            Some(731),
        );

        assert_eq!(metrics.stars, 52_000);
        assert_eq!(metrics.watchers, 1_300);
        assert_eq!(metrics.contributors, Some(731));
        assert_eq!(metrics.license.as_deref(), Some("Apache-2.0"));
        assert_eq!(metrics.commit_frequency, Some(0.1));
        assert_eq!(metrics.pr_merge_rate, Some(0.0));
        assert!(!metrics.is_partial());
        assert_eq!(
            metrics.last_commit_date.unwrap().to_rfc3339(),
            "2024-05-20T10:00:00+00:00"
        );
    }

    #[test]
    fn test_last_commit_falls_back_to_push_date() {
        let document: RepositoryDocument =
            serde_json::from_str(r#"{"pushed_at": "2023-01-01T00:00:00Z", "license": {"spdx_id": "NOASSERTION"}}"#)
                .unwrap();
        let metrics = build_metrics(
            document,
            Some(Vec::new()),
            Some(IssueStats::default()),
            Some(PullRequestStats::default()),
            Some(0),
        );
        assert!(metrics.last_commit_date.is_some());
        assert_eq!(metrics.commit_frequency, Some(0.0));
        assert!(metrics.license.is_none());
    }

    #[test]
    fn test_failed_sub_queries_leave_metrics_unknown() {
        let slug = RepositorySlug::parse("psf/requests").unwrap();
        let rate_limited = || CollectorError::RateLimited {
            source_name: SOURCE_NAME,
            retry_after: None,
        };
        let document: RepositoryDocument =
            serde_json::from_str(r#"{"stargazers_count": 52000}"#).unwrap();

        let metrics = build_metrics(
            document,
            Some(Vec::new()),
            Some(IssueStats::default()),
            degrade::<PullRequestStats>(Err(rate_limited()), "pull_requests", &slug),
            degrade::<u64>(Err(rate_limited()), "contributors", &slug),
        );

        assert_eq!(metrics.stars, 52_000);
        assert_eq!(metrics.contributors, None);
        assert_eq!(metrics.pr_merge_rate, None);
        assert_eq!(metrics.open_pull_requests, None);
        assert_eq!(metrics.commit_frequency, Some(0.0));
        assert!(metrics.is_partial());
        assert!(client().is_partial(&metrics));
    }
}
