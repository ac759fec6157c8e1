use crate::application::dto::{ScanEntry, ScanResponse};
use crate::health_scoring::domain::PackageIdentifier;
use crate::ports::inbound::HealthAssessmentPort;
use crate::ports::outbound::ProgressReporter;
use crate::shared::HealthError;
use futures::stream::{self, StreamExt};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Default number of packages assessed at the same time.
pub const DEFAULT_MAX_CONCURRENCY: usize = 8;

/// ScanPackagesUseCase - assesses a batch of package specifiers
///
/// Specifiers are parsed first; entries that fail to parse are rejected
/// individually and never reach the network. Valid packages are assessed
/// with bounded concurrency, and the response keeps input order.
///
/// # Type Parameters
/// * `A` - HealthAssessmentPort implementation
/// * `PR` - ProgressReporter implementation
pub struct ScanPackagesUseCase<A, PR> {
    assessor: A,
    progress_reporter: PR,
    max_concurrency: usize,
}

impl<A, PR> ScanPackagesUseCase<A, PR>
where
    A: HealthAssessmentPort,
    PR: ProgressReporter,
{
    /// Creates a new ScanPackagesUseCase
    ///
    /// # Errors
    /// Returns an error if `max_concurrency` is zero
    pub fn new(assessor: A, progress_reporter: PR, max_concurrency: usize) -> Result<Self, HealthError> {
        if max_concurrency == 0 {
            return Err(HealthError::Validation {
                message: "max_concurrency must be at least 1".to_string(),
            });
        }

        Ok(Self {
            assessor,
            progress_reporter,
            max_concurrency,
        })
    }

    /// Executes the scan
    ///
    /// # Arguments
    /// * `specifiers` - Raw specifiers such as `requests==2.31.0`
    ///
    /// # Returns
    /// One entry per specifier, in the same order
    pub async fn execute(&self, specifiers: &[String]) -> ScanResponse {
        // Step 1: Parse every specifier up front
        let parsed: Vec<(String, Result<PackageIdentifier, HealthError>)> = specifiers
            .iter()
            .map(|input| (input.clone(), input.parse::<PackageIdentifier>()))
            .collect();

        let valid = parsed.iter().filter(|(_, result)| result.is_ok()).count();
        tracing::info!(
            total = specifiers.len(),
            valid,
            max_concurrency = self.max_concurrency,
            "starting scan"
        );
        self.progress_reporter
            .report(&format!("🔍 Assessing {} package(s)...", valid));

        // Step 2: Assess with bounded concurrency; `buffered` keeps input order
        let done = AtomicUsize::new(0);
        let entries: Vec<ScanEntry> = stream::iter(parsed)
            .map(|(input, result)| {
                let done = &done;
                async move {
                    match result {
                        Ok(package) => {
                            let report = self.assessor.assess(&package).await;
                            let finished = done.fetch_add(1, Ordering::SeqCst) + 1;
                            self.progress_reporter.report_progress(
                                finished,
                                valid,
                                Some(package.name().as_str()),
                            );
                            ScanEntry::Assessed {
                                input,
                                report: Box::new(report),
                            }
                        }
                        Err(error) => {
                            tracing::warn!(input = %input, "rejected package specifier");
                            self.progress_reporter
                                .report_error(&format!("⚠️  Skipping '{}': {}", input, first_line(&error)));
                            ScanEntry::Rejected {
                                input,
                                error: error.to_string(),
                            }
                        }
                    }
                }
            })
            .buffered(self.max_concurrency)
            .collect()
            .await;

        let response = ScanResponse::new(entries);
        tracing::info!(
            assessed = valid,
            rejected = response.rejected_count(),
            concerning = response.concerning_count(),
            "scan finished"
        );
        self.progress_reporter.report_completion(&format!(
            "✅ Assessed {} package(s), {} need attention",
            valid,
            response.concerning_count()
        ));

        response
    }
}

fn first_line(error: &HealthError) -> String {
    error.to_string().lines().next().unwrap_or_default().to_string()
}
