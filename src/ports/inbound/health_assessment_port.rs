use crate::application::dto::DependencyReport;
use crate::health_scoring::domain::PackageIdentifier;
use async_trait::async_trait;

/// HealthAssessmentPort - Inbound port for assessing one package
///
/// This port defines the interface that batch scanning and external
/// adapters use to assess a dependency. It represents the application's
/// public API.
///
/// Assessment never fails as a whole: every source failure is recorded in
/// the returned report and reflected in its confidence.
#[async_trait]
pub trait HealthAssessmentPort: Send + Sync {
    /// Collects every source for `package` and scores it
    ///
    /// # Arguments
    /// * `package` - Validated package identifier
    ///
    /// # Returns
    /// A report carrying the score, the collected data and per-source status
    async fn assess(&self, package: &PackageIdentifier) -> DependencyReport;
}
