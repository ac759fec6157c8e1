use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

static GITHUB_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)github\.com[/:]([A-Za-z0-9_.-]+)/([A-Za-z0-9_.-]+?)(?:\.git)?(?:[/#?].*)?$")
        .expect("valid GitHub URL pattern")
});

static BARE_SLUG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Za-z0-9_.-]+)/([A-Za-z0-9_.-]+?)(?:\.git)?/?$").expect("valid slug pattern")
});

/// `owner/repo` coordinates of a GitHub repository, lowercased.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepositorySlug {
    owner: String,
    repo: String,
}

impl RepositorySlug {
    /// Extracts a slug from a GitHub URL (https, ssh or `git+` forms) or a
    /// bare `owner/repo` string. Returns `None` for anything else, including
    /// repositories hosted elsewhere.
    pub fn parse(input: &str) -> Option<Self> {
        let input = input.trim();
        let looks_like_url = input.contains("://")
            || input.contains('@')
            || input.to_ascii_lowercase().contains("github.com");
        let captures = if looks_like_url {
            GITHUB_URL.captures(input)?
        } else {
            BARE_SLUG.captures(input)?
        };

        let owner = captures.get(1)?.as_str();
        let repo = captures.get(2)?.as_str();
        let suspicious = |part: &str| part.is_empty() || part.starts_with('.') || part.contains("..");
        if suspicious(owner) || suspicious(repo) {
            return None;
        }

        Some(Self {
            owner: owner.to_ascii_lowercase(),
            repo: repo.to_ascii_lowercase(),
        })
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn repo(&self) -> &str {
        &self.repo
    }
}

impl fmt::Display for RepositorySlug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}

/// Activity and community signals for a source repository.
///
/// The rate fields are derived once when the metrics are collected. A
/// derived metric whose query failed is `None`, which is distinct from a
/// confirmed zero.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RepositoryMetrics {
    pub url: String,
    pub stars: u64,
    pub forks: u64,
    pub watchers: u64,
    pub open_issues: u64,
    #[serde(default)]
    pub open_pull_requests: Option<u64>,
    #[serde(default)]
    pub contributors: Option<u64>,
    pub archived: bool,
    pub fork: bool,
    #[serde(default)]
    pub license: Option<String>,
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default)]
    pub default_branch: Option<String>,
    #[serde(default)]
    pub last_commit_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    /// Commits per day over the last 30 days
    #[serde(default)]
    pub commit_frequency: Option<f64>,
    /// Closed / (open + closed) issues over the last 90 days
    #[serde(default)]
    pub issue_close_rate: Option<f64>,
    /// Merged / (open + closed) pull requests over the last 90 days
    #[serde(default)]
    pub pr_merge_rate: Option<f64>,
    #[serde(default)]
    pub avg_issue_close_days: Option<f64>,
    #[serde(default)]
    pub avg_pr_merge_days: Option<f64>,
}

impl RepositoryMetrics {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    pub fn days_since_commit(&self, now: DateTime<Utc>) -> Option<i64> {
        self.last_commit_date
            .map(|date| (now - date).num_days().max(0))
    }

    /// True when at least one derived activity metric could not be collected.
    pub fn is_partial(&self) -> bool {
        self.contributors.is_none()
            || self.commit_frequency.is_none()
            || self.issue_close_rate.is_none()
            || self.pr_merge_rate.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_days_since_commit() {
        let now = Utc::now();
        let mut metrics = RepositoryMetrics::new("https://github.com/psf/requests");
        assert_eq!(metrics.days_since_commit(now), None);

        metrics.last_commit_date = Some(now - Duration::days(3));
        assert_eq!(metrics.days_since_commit(now), Some(3));

        metrics.last_commit_date = Some(now + Duration::days(1));
        assert_eq!(metrics.days_since_commit(now), Some(0));
    }

    #[test]
    fn test_partial_until_every_derived_metric_is_known() {
        let mut metrics = RepositoryMetrics::new("https://github.com/psf/requests");
        assert!(metrics.is_partial());

        metrics.contributors = Some(0);
        metrics.commit_frequency = Some(0.0);
        metrics.issue_close_rate = Some(0.0);
        metrics.pr_merge_rate = Some(0.0);
        assert!(!metrics.is_partial());
    }

    #[test]
    fn test_slug_from_urls() {
        let slug = |s: &str| RepositorySlug::parse(s).map(|s| s.to_string());
        assert_eq!(slug("https://github.com/psf/requests"), Some("psf/requests".into()));
        assert_eq!(slug("https://github.com/psf/requests.git"), Some("psf/requests".into()));
        assert_eq!(
            slug("https://github.com/pallets/flask/tree/main/src"),
            Some("pallets/flask".into())
        );
        assert_eq!(slug("git@github.com:Pallets/Click.git"), Some("pallets/click".into()));
        assert_eq!(slug("github.com/encode/httpx/"), Some("encode/httpx".into()));
        assert_eq!(slug("psf/black"), Some("psf/black".into()));
    }

    #[test]
    fn test_slug_rejects_other_hosts_and_traversal() {
        assert!(RepositorySlug::parse("https://gitlab.com/group/project").is_none());
        assert!(RepositorySlug::parse("https://github.com/psf").is_none());
        assert!(RepositorySlug::parse("../etc").is_none());
        assert!(RepositorySlug::parse("owner/..").is_none());
        assert!(RepositorySlug::parse("").is_none());
    }
}
