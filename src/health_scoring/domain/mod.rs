pub mod health_score;
pub mod package;
pub mod registry_metadata;
pub mod repository_metrics;
pub mod version;
pub mod vulnerability;

pub use health_score::{
    ComponentScores, ConfidenceLevel, HealthGrade, HealthScore, MaintenanceStatus,
    SecurityDataState,
};
pub use package::{PackageIdentifier, PackageName};
pub use registry_metadata::{DownloadStats, RegistryMetadata};
pub use repository_metrics::{RepositoryMetrics, RepositorySlug};
pub use vulnerability::{CvssScore, Severity, Vulnerability};
