//! dep-health - dependency health assessment for PyPI packages
//!
//! This library collects registry metadata, download statistics, repository
//! activity and published advisories for a package, and combines them into a
//! composite health score, following hexagonal architecture and Domain-Driven
//! Design principles.
//!
//! # Architecture
//!
//! The library is organized into the following layers:
//!
//! - **Domain Layer** (`health_scoring`): Pure scoring logic and domain models
//! - **Application Layer** (`application`): Use cases and DTOs
//! - **Ports** (`ports`): Interface definitions for infrastructure
//! - **Adapters** (`adapters`): Cache stores, HTTP collectors, console output
//! - **Shared** (`shared`): Common utilities and error types
//!
//! # Example
//!
//! ```no_run
//! use dep_health::prelude::*;
//!
//! # async fn run() -> Result<()> {
//! // Create adapters
//! let client = build_client(DEFAULT_TIMEOUT)?;
//! let cache: Option<std::sync::Arc<dyn CacheStore>> =
//!     Some(std::sync::Arc::new(InMemoryCacheStore::new()));
//!
//! // Create use case
//! let use_case = AssessHealthUseCase::new(
//!     CachingCollector::new(PyPiClient::new(client.clone()), cache.clone()),
//!     CachingCollector::new(PyPiStatsClient::new(client.clone()), cache.clone()),
//!     CachingCollector::new(GitHubClient::new(client.clone(), None), cache.clone()),
//!     CachingCollector::new(OsvClient::new(client), cache),
//!     HealthCalculator::default(),
//! );
//!
//! // Execute
//! let package: PackageIdentifier = "requests==2.31.0".parse()?;
//! let report = use_case.execute(&package).await;
//! println!("{} {}", report.package, report.health.grade);
//! # Ok(())
//! # }
//! ```

pub mod adapters;
pub mod application;
pub mod config;
pub mod health_scoring;
pub mod ports;
pub mod shared;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::adapters::outbound::cache::{InMemoryCacheStore, SqliteCacheStore};
    pub use crate::adapters::outbound::console::StderrProgressReporter;
    pub use crate::adapters::outbound::network::{
        build_client, CachingCollector, GitHubClient, OsvClient, PyPiClient, PyPiStatsClient,
        DEFAULT_TIMEOUT,
    };
    pub use crate::application::dto::{
        AbsenceReason, DependencyReport, ScanEntry, ScanResponse, SourceOutcome, SourceReport,
    };
    pub use crate::application::use_cases::{AssessHealthUseCase, ScanPackagesUseCase};
    pub use crate::health_scoring::domain::{
        HealthGrade, HealthScore, PackageIdentifier, RegistryMetadata, RepositoryMetrics,
        Severity, Vulnerability,
    };
    pub use crate::health_scoring::policies::ScoringWeights;
    pub use crate::health_scoring::services::HealthCalculator;
    pub use crate::ports::inbound::HealthAssessmentPort;
    pub use crate::ports::outbound::{
        CacheStore, DataSource, ProgressReporter, SilentProgressReporter, SourceCollector,
    };
    pub use crate::shared::{CollectorError, HealthError, Result};
}
