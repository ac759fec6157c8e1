/// Integration tests for the application layer
mod test_utilities;

use dep_health::application::dto::SourceStatus;
use dep_health::health_scoring::domain::{ConfidenceLevel, SecurityDataState};
use dep_health::prelude::*;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use test_utilities::fixtures::*;
use test_utilities::mocks::*;

type CachedUseCase = AssessHealthUseCase<
    CachingCollector<RegistryMock>,
    CachingCollector<DownloadsMock>,
    CachingCollector<RepositoryMock>,
    CachingCollector<FeedMock>,
>;

fn cached_use_case(
    mocks: (RegistryMock, DownloadsMock, RepositoryMock, FeedMock),
    cache: Option<Arc<dyn CacheStore>>,
) -> CachedUseCase {
    let (registry, downloads, repository, feed) = mocks;
    AssessHealthUseCase::new(
        CachingCollector::new(registry, cache.clone()),
        CachingCollector::new(downloads, cache.clone()),
        CachingCollector::new(repository, cache.clone()),
        CachingCollector::new(feed, cache),
        HealthCalculator::default(),
    )
}

fn requests() -> PackageIdentifier {
    "requests".parse().unwrap()
}

#[tokio::test]
async fn test_healthy_package_scores_a_with_high_confidence() {
    let use_case = cached_use_case(healthy_requests(), None);

    let report = use_case.execute(&requests()).await;

    assert_eq!(report.health.grade, HealthGrade::A);
    assert_eq!(report.health.confidence, ConfidenceLevel::High);
    assert_eq!(report.health.components.security, 100.0);
    assert!(report.sources.all_available());
    assert_eq!(report.repository.as_ref().map(|r| r.stars), Some(52_000));
}

#[tokio::test]
async fn test_repository_timeout_gives_medium_confidence() {
    let (registry, downloads, _, feed) = healthy_requests();
    let repository = RepositoryMock::new(DataSource::Repository).with_error(
        "psf/requests",
        CollectorError::Timeout {
            source_name: "github",
        },
    );
    let use_case = cached_use_case((registry, downloads, repository, feed), None);

    let report = use_case.execute(&requests()).await;

    assert_eq!(report.health.confidence, ConfidenceLevel::Medium);
    assert!(report.repository.is_none());
    assert_eq!(
        report.sources.repository,
        SourceStatus {
            available: false,
            absence: Some(AbsenceReason::Timeout),
        }
    );
}

#[tokio::test]
async fn test_feed_outage_is_unknown_security_not_clean() {
    let (registry, downloads, repository, _) = healthy_requests();
    let feed = FeedMock::new(DataSource::VulnerabilityFeed).with_error(
        "requests",
        CollectorError::network("osv", "503 Service Unavailable"),
    );
    let use_case = cached_use_case((registry, downloads, repository, feed), None);

    let report = use_case.execute(&requests()).await;

    assert_eq!(report.health.components.security, 50.0);
    assert_eq!(report.health.security_data, SecurityDataState::Unknown);
    assert_ne!(report.health.confidence, ConfidenceLevel::High);
    assert!(report
        .health
        .risk_factors
        .iter()
        .any(|f| f.contains("Vulnerability data unavailable")));
}

#[tokio::test]
async fn test_second_assessment_is_served_from_sqlite_cache() {
    let dir = TempDir::new().unwrap();
    let store: Arc<dyn CacheStore> =
        Arc::new(SqliteCacheStore::open(&dir.path().join("cache.db")).unwrap());
    let mocks = healthy_requests();
    let handles = (mocks.0.clone(), mocks.2.clone(), mocks.3.clone());
    let use_case = cached_use_case(mocks, Some(Arc::clone(&store)));

    let first = use_case.execute(&requests()).await;
    let second = use_case.execute(&requests()).await;

    assert_eq!(first.health.overall, second.health.overall);
    assert_eq!(handles.0.get_call_count(), 1);
    assert_eq!(handles.1.get_call_count(), 1);
    assert_eq!(handles.2.get_call_count(), 1);

    let stats = store.stats().await.unwrap();
    assert_eq!(stats.valid_entries, 4);
}

#[tokio::test]
async fn test_cache_survives_reopening_the_database() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("cache.db");

    {
        let store = SqliteCacheStore::open(&path).unwrap();
        let store: Arc<dyn CacheStore> = Arc::new(store);
        cached_use_case(healthy_requests(), Some(store))
            .execute(&requests())
            .await;
    }

    // Every source is down now; the cached answers still stand
    let offline = (
        RegistryMock::new(DataSource::Registry),
        DownloadsMock::new(DataSource::Downloads),
        RepositoryMock::new(DataSource::Repository),
        FeedMock::new(DataSource::VulnerabilityFeed),
    );
    let store: Arc<dyn CacheStore> = Arc::new(SqliteCacheStore::open(&path).unwrap());
    let report = cached_use_case(offline, Some(store))
        .execute(&requests())
        .await;

    assert!(report.sources.all_available());
    assert_eq!(report.health.grade, HealthGrade::A);
}

#[tokio::test]
async fn test_unknown_package_is_negatively_cached() {
    let store: Arc<dyn CacheStore> = Arc::new(InMemoryCacheStore::new());
    let mocks = healthy_requests();
    let registry = mocks.0.clone();
    let use_case = cached_use_case(mocks, Some(store));
    let ghost: PackageIdentifier = "ghost-package".parse().unwrap();

    let first = use_case.execute(&ghost).await;
    let second = use_case.execute(&ghost).await;

    assert_eq!(first.sources.registry.absence, Some(AbsenceReason::NotFound));
    assert_eq!(second.sources.registry.absence, Some(AbsenceReason::NotFound));
    assert_eq!(registry.get_call_count(), 1);
    assert_eq!(second.health.confidence, ConfidenceLevel::Low);
}

#[tokio::test]
async fn test_rate_limit_is_not_cached() {
    let store: Arc<dyn CacheStore> = Arc::new(InMemoryCacheStore::new());
    let (registry, downloads, _, feed) = healthy_requests();
    let repository = RepositoryMock::new(DataSource::Repository).with_error(
        "psf/requests",
        CollectorError::RateLimited {
            source_name: "github",
            retry_after: Some(Duration::from_secs(600)),
        },
    );
    let handle = repository.clone();
    let use_case = cached_use_case((registry, downloads, repository, feed), Some(store));

    let report = use_case.execute(&requests()).await;
    use_case.execute(&requests()).await;

    assert_eq!(handle.get_call_count(), 2);
    assert_eq!(
        report.sources.repository.absence,
        Some(AbsenceReason::RateLimited {
            retry_after_secs: Some(600)
        })
    );
}

#[tokio::test]
async fn test_broken_cache_never_fails_an_assessment() {
    let store = Arc::new(FailingCacheStore::new());
    let cache: Arc<dyn CacheStore> = store.clone();
    let use_case = cached_use_case(healthy_requests(), Some(cache));

    let report = use_case.execute(&requests()).await;

    assert!(report.sources.all_available());
    assert_eq!(report.health.grade, HealthGrade::A);
    assert!(store.attempts() >= 8);
}

#[tokio::test]
async fn test_batch_scan_keeps_order_and_rejects_bad_entries() {
    let mocks = healthy_requests();
    let registry = mocks.0.clone();
    let use_case = cached_use_case(mocks, None);
    let reporter = MockProgressReporter::new();
    let scanner = ScanPackagesUseCase::new(use_case, reporter.clone(), 2).unwrap();
    let input: Vec<String> = ["requests==2.31.0", "not a package", "requests[socks]", "ghost"]
        .iter()
        .map(|s| s.to_string())
        .collect();

    let response = scanner.execute(&input).await;

    let order: Vec<&str> = response.entries.iter().map(ScanEntry::input).collect();
    assert_eq!(
        order,
        vec!["requests==2.31.0", "not a package", "requests[socks]", "ghost"]
    );
    assert_eq!(response.rejected_count(), 1);
    assert_eq!(registry.get_call_count(), 3);

    let pinned = response.entries[0].report().unwrap();
    assert_eq!(pinned.installed_version.as_deref(), Some("2.31.0"));
    assert!(pinned.update_available);

    let messages = reporter.get_messages();
    assert!(messages.iter().any(|m| m.starts_with("Error:")));
    assert_eq!(
        messages.iter().filter(|m| m.starts_with("Progress:")).count(),
        3
    );
    assert!(messages.iter().any(|m| m.starts_with("Completed:")));
}

#[tokio::test]
async fn test_batch_scan_runs_packages_concurrently() {
    let delay = Duration::from_millis(200);
    let (registry, downloads, repository, feed) = healthy_requests();
    let use_case = cached_use_case(
        (
            registry.with_delay(delay),
            downloads,
            repository,
            feed,
        ),
        None,
    );
    let scanner = ScanPackagesUseCase::new(use_case, SilentProgressReporter, 4).unwrap();
    let input: Vec<String> = vec!["requests".to_string(); 4];

    let started = std::time::Instant::now();
    let response = scanner.execute(&input).await;

    assert_eq!(response.entries.len(), 4);
    assert!(
        started.elapsed() < delay * 3,
        "took {:?}",
        started.elapsed()
    );
}

#[tokio::test]
async fn test_report_serializes_for_consumers() {
    let use_case = cached_use_case(healthy_requests(), None);
    let report = use_case.execute(&"requests==2.32.3".parse().unwrap()).await;

    let json = serde_json::to_value(&report).unwrap();

    assert_eq!(json["package"], "requests==2.32.3");
    assert_eq!(json["health"]["grade"], "A");
    assert_eq!(json["health"]["confidence"], "HIGH");
    assert_eq!(json["sources"]["repository"]["available"], true);
    assert_eq!(json["registry"]["downloads_last_month"], 250_000_000);
    assert_eq!(json["update_available"], false);
}
