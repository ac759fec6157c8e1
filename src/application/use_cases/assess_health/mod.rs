use crate::application::dto::{AbsenceReason, DependencyReport, SourceOutcome, SourceReport};
use crate::health_scoring::domain::{
    version, DownloadStats, PackageIdentifier, RegistryMetadata, RepositoryMetrics,
    RepositorySlug, Vulnerability,
};
use crate::health_scoring::services::{HealthCalculator, VulnerabilityClassifier};
use crate::ports::inbound::HealthAssessmentPort;
use crate::ports::outbound::SourceCollector;
use async_trait::async_trait;

/// Registry metadata together with how the download source fared.
type RegistryOutcomes = (SourceOutcome<RegistryMetadata>, SourceOutcome<DownloadStats>);

/// AssessHealthUseCase - Core use case for assessing one dependency
///
/// This use case orchestrates collection and scoring using generic
/// dependency injection for every data source.
///
/// Three pipelines run concurrently:
/// - registry metadata and download counts (merged once both answer)
/// - repository metrics, which need the repository URL from the registry
/// - the vulnerability feed, queried by name only
///
/// A failing pipeline never aborts the others; its gap is recorded in the
/// report and lowers the confidence of the score.
///
/// # Type Parameters
/// * `R` - Registry metadata collector
/// * `D` - Download statistics collector
/// * `G` - Repository metrics collector
/// * `V` - Vulnerability feed collector
pub struct AssessHealthUseCase<R, D, G, V> {
    registry: R,
    downloads: D,
    repository: G,
    vulnerabilities: V,
    calculator: HealthCalculator,
}

impl<R, D, G, V> AssessHealthUseCase<R, D, G, V>
where
    R: SourceCollector<Output = RegistryMetadata>,
    D: SourceCollector<Output = DownloadStats>,
    G: SourceCollector<Output = RepositoryMetrics>,
    V: SourceCollector<Output = Vec<Vulnerability>>,
{
    /// Creates a new AssessHealthUseCase with injected collectors
    pub fn new(
        registry: R,
        downloads: D,
        repository: G,
        vulnerabilities: V,
        calculator: HealthCalculator,
    ) -> Self {
        Self {
            registry,
            downloads,
            repository,
            vulnerabilities,
            calculator,
        }
    }

    /// Executes the assessment for one package
    pub async fn execute(&self, package: &PackageIdentifier) -> DependencyReport {
        let name = package.normalized_name();
        tracing::debug!(package = %package, "assessing");

        // Step 1: Collect all sources; the repository waits on the registry only
        let registry_and_repository = async {
            let (registry, downloads) = self.collect_registry(name).await;
            let repository = self.collect_repository(registry.as_ref()).await;
            (registry, downloads, repository)
        };
        let ((registry, downloads, repository), vulnerabilities) = futures::join!(
            registry_and_repository,
            self.collect_vulnerabilities(name)
        );

        let sources = SourceReport {
            registry: registry.status(),
            downloads: downloads.status(),
            repository: repository.status(),
            vulnerability_feed: vulnerabilities.status(),
        };
        log_absences(package, &sources);

        // Step 2: Resolve the installed version
        let registry = registry.into_option();
        let latest_version = registry.as_ref().map(|r| r.version.clone());
        let installed_version = package
            .version()
            .map(str::to_string)
            .or_else(|| latest_version.clone());

        // Step 3: Classify advisories against the installed version
        let vulnerabilities = vulnerabilities
            .map(|vulns| VulnerabilityClassifier::classify(installed_version.as_deref(), vulns))
            .into_option();

        // Step 4: Score
        let repository = repository.into_option();
        let health = self.calculator.score(
            registry.as_ref(),
            repository.as_ref(),
            vulnerabilities.as_deref(),
        );

        let update_available = match (&latest_version, &installed_version) {
            (Some(latest), Some(installed)) => version::is_newer(latest, installed),
            _ => false,
        };

        tracing::debug!(
            package = %package,
            score = health.overall,
            grade = %health.grade,
            "assessed"
        );

        DependencyReport {
            package: package.to_string(),
            name: name.to_string(),
            installed_version,
            latest_version,
            update_available,
            health,
            registry,
            repository,
            sources,
        }
    }

    /// Fetches registry metadata and download counts in parallel and
    /// attaches the counts to the metadata.
    async fn collect_registry(&self, name: &str) -> RegistryOutcomes {
        let (registry, downloads) =
            futures::join!(self.registry.fetch(name), self.downloads.fetch(name));
        let downloads = SourceOutcome::from(downloads);
        let monthly = downloads.as_ref().map(|stats| stats.last_month);
        let registry = SourceOutcome::from(registry).map(|r| r.with_downloads(monthly));
        (registry, downloads)
    }

    async fn collect_repository(
        &self,
        registry: Option<&RegistryMetadata>,
    ) -> SourceOutcome<RepositoryMetrics> {
        let Some(slug) = registry
            .and_then(RegistryMetadata::repository_url)
            .and_then(RepositorySlug::parse)
        else {
            return SourceOutcome::Absent(AbsenceReason::NoRepository);
        };

        self.repository.fetch(&slug.to_string()).await.into()
    }

    async fn collect_vulnerabilities(&self, name: &str) -> SourceOutcome<Vec<Vulnerability>> {
        self.vulnerabilities.fetch(name).await.into()
    }
}

fn log_absences(package: &PackageIdentifier, sources: &SourceReport) {
    let statuses = [
        ("registry", &sources.registry),
        ("downloads", &sources.downloads),
        ("repository", &sources.repository),
        ("vulnerability_feed", &sources.vulnerability_feed),
    ];
    for (source, status) in statuses {
        match &status.absence {
            Some(AbsenceReason::NoRepository) => {
                tracing::debug!(package = %package, "no GitHub repository linked");
            }
            Some(reason) => {
                tracing::warn!(package = %package, source, reason = ?reason, "source unavailable");
            }
            None => {}
        }
    }
}

#[async_trait]
impl<R, D, G, V> HealthAssessmentPort for AssessHealthUseCase<R, D, G, V>
where
    R: SourceCollector<Output = RegistryMetadata>,
    D: SourceCollector<Output = DownloadStats>,
    G: SourceCollector<Output = RepositoryMetrics>,
    V: SourceCollector<Output = Vec<Vulnerability>>,
{
    async fn assess(&self, package: &PackageIdentifier) -> DependencyReport {
        self.execute(package).await
    }
}
