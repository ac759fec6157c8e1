use super::mocks::MockSourceCollector;
use chrono::{Duration, Utc};
use dep_health::health_scoring::domain::DownloadStats;
use dep_health::prelude::*;

pub type RegistryMock = MockSourceCollector<RegistryMetadata>;
pub type DownloadsMock = MockSourceCollector<DownloadStats>;
pub type RepositoryMock = MockSourceCollector<RepositoryMetrics>;
pub type FeedMock = MockSourceCollector<Vec<Vulnerability>>;

/// Registry metadata for an actively released package hosted on GitHub.
pub fn registry(name: &str, version: &str, repository: &str) -> RegistryMetadata {
    let mut registry = RegistryMetadata::new(name, version);
    registry.latest_release_date = Some(Utc::now() - Duration::days(12));
    registry.first_release_date = Some(Utc::now() - Duration::days(4000));
    registry.total_releases = 40;
    registry.license = Some("Apache-2.0".to_string());
    registry.project_urls.insert(
        "Source".to_string(),
        format!("https://github.com/{}", repository),
    );
    registry
}

/// Repository metrics of a busy, well-staffed project.
pub fn healthy_repository(slug: &str) -> RepositoryMetrics {
    let mut metrics = RepositoryMetrics::new(format!("https://github.com/{}", slug));
    metrics.stars = 52_000;
    metrics.forks = 9_000;
    metrics.watchers = 1_300;
    metrics.contributors = Some(180);
    metrics.commit_frequency = Some(1.2);
    metrics.issue_close_rate = Some(0.9);
    metrics.pr_merge_rate = Some(0.75);
    metrics.avg_issue_close_days = Some(4.0);
    metrics.last_commit_date = Some(Utc::now() - Duration::days(2));
    metrics
}

pub fn downloads(last_month: u64) -> DownloadStats {
    DownloadStats {
        last_day: last_month / 30,
        last_week: last_month / 4,
        last_month,
    }
}

/// Mocks answering for `requests` (repository `psf/requests`) with healthy data.
pub fn healthy_requests() -> (RegistryMock, DownloadsMock, RepositoryMock, FeedMock) {
    (
        RegistryMock::new(DataSource::Registry)
            .with_response("requests", registry("requests", "2.32.3", "psf/requests")),
        DownloadsMock::new(DataSource::Downloads).with_response("requests", downloads(250_000_000)),
        RepositoryMock::new(DataSource::Repository)
            .with_response("psf/requests", healthy_repository("psf/requests")),
        FeedMock::new(DataSource::VulnerabilityFeed).with_response("requests", vec![]),
    )
}
