use super::factor_analyzer::FactorAnalyzer;
use super::normalization::{clamp_score, linear_scale, log_scale};
use crate::health_scoring::domain::{
    ComponentScores, ConfidenceLevel, HealthGrade, HealthScore, MaintenanceStatus,
    RegistryMetadata, RepositoryMetrics, SecurityDataState, Vulnerability,
};
use crate::health_scoring::policies::{LicensePolicy, ScoringWeights};
use chrono::{DateTime, Utc};

/// Neutral score for a component whose inputs are missing.
const NEUTRAL_SCORE: f64 = 50.0;

/// Security score used when the vulnerability feed did not answer.
pub const UNKNOWN_SECURITY_SCORE: f64 = 50.0;

/// Share of the open-advisory deduction charged for an advisory that the
/// installed version already fixes.
const FIXED_DEDUCTION_RATIO: f64 = 0.1;

/// Everything the scoring rules look at for one package.
#[derive(Debug, Clone, Copy)]
pub struct ScoringInputs<'a> {
    pub registry: Option<&'a RegistryMetadata>,
    pub repository: Option<&'a RepositoryMetrics>,
    /// `None` means the feed was unavailable, not that it was empty
    pub vulnerabilities: Option<&'a [Vulnerability]>,
    pub now: DateTime<Utc>,
}

/// HealthCalculator - turns collected signals into a [`HealthScore`]
///
/// Pure and synchronous: identical inputs (including `now`) always produce
/// identical scores.
#[derive(Debug, Clone, Default)]
pub struct HealthCalculator {
    weights: ScoringWeights,
}

impl HealthCalculator {
    pub fn new(weights: ScoringWeights) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> &ScoringWeights {
        &self.weights
    }

    /// Scores a package as of the current time.
    pub fn score(
        &self,
        registry: Option<&RegistryMetadata>,
        repository: Option<&RepositoryMetrics>,
        vulnerabilities: Option<&[Vulnerability]>,
    ) -> HealthScore {
        self.score_at(registry, repository, vulnerabilities, Utc::now())
    }

    /// Scores a package as of `now`.
    pub fn score_at(
        &self,
        registry: Option<&RegistryMetadata>,
        repository: Option<&RepositoryMetrics>,
        vulnerabilities: Option<&[Vulnerability]>,
        now: DateTime<Utc>,
    ) -> HealthScore {
        let inputs = ScoringInputs {
            registry,
            repository,
            vulnerabilities,
            now,
        };

        let components = ComponentScores {
            security: round1(security_score(vulnerabilities)),
            maintenance: round1(maintenance_score(&inputs)),
            community: round1(community_score(repository)),
            popularity: round1(popularity_score(registry, repository)),
            code_quality: round1(code_quality_score(repository)),
            license: license_score(registry, repository),
        };

        let overall = round1(clamp_score(
            components.security * self.weights.security()
                + components.maintenance * self.weights.maintenance()
                + components.community * self.weights.community()
                + components.popularity * self.weights.popularity(),
        ));

        HealthScore {
            overall,
            grade: HealthGrade::from_score(overall),
            components,
            maintenance_status: maintenance_status(&inputs),
            vulnerabilities: vulnerabilities.map(<[Vulnerability]>::to_vec).unwrap_or_default(),
            risk_factors: FactorAnalyzer::risk_factors(&inputs),
            positive_factors: FactorAnalyzer::positive_factors(&inputs),
            confidence: confidence(&inputs),
            security_data: if vulnerabilities.is_some() {
                SecurityDataState::Known
            } else {
                SecurityDataState::Unknown
            },
            calculated_at: now,
        }
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// 100 minus severity-tiered deductions; fixed advisories cost a tenth.
pub fn security_score(vulnerabilities: Option<&[Vulnerability]>) -> f64 {
    let Some(vulnerabilities) = vulnerabilities else {
        return UNKNOWN_SECURITY_SCORE;
    };

    let deductions: f64 = vulnerabilities
        .iter()
        .map(|v| {
            let deduction = v.severity.deduction();
            if v.fixed_in_installed_version {
                deduction * FIXED_DEDUCTION_RATIO
            } else {
                deduction
            }
        })
        .sum();

    (100.0 - deductions).max(0.0)
}

fn maintenance_score(inputs: &ScoringInputs<'_>) -> f64 {
    let mut score = NEUTRAL_SCORE;

    if let Some(registry) = inputs.registry {
        score += match registry.days_since_release(inputs.now) {
            Some(days) if days < 30 => 15.0,
            Some(days) if days < 90 => 10.0,
            Some(days) if days < 180 => 7.0,
            Some(days) if days < 365 => 3.0,
            Some(days) if days > 730 => -10.0,
            _ => 0.0,
        };

        score += if registry.total_releases > 10 {
            5.0
        } else if registry.total_releases > 5 {
            2.0
        } else {
            0.0
        };

        if registry.is_deprecated() {
            score -= 20.0;
        }
    }

    if let Some(repository) = inputs.repository {
        score += match repository.commit_frequency {
            Some(f) if f > 1.0 => 10.0,
            Some(f) if f > 0.1 => 6.0,
            Some(f) if f > 0.0 => 3.0,
            _ => 0.0,
        };

        score += match repository.issue_close_rate {
            Some(rate) if rate > 0.8 => 8.0,
            Some(rate) if rate > 0.5 => 4.0,
            _ => 0.0,
        };

        if repository.archived {
            score -= 30.0;
        }
    }

    clamp_score(score)
}

fn community_score(repository: Option<&RepositoryMetrics>) -> f64 {
    let Some(repository) = repository else {
        return NEUTRAL_SCORE;
    };

    let mut score = NEUTRAL_SCORE;
    score += log_scale(repository.stars as f64, 10.0, 50_000.0, 20.0);
    score += log_scale(repository.forks as f64, 1.0, 500.0, 10.0);
    if let Some(rate) = repository.pr_merge_rate {
        score += linear_scale(rate, 0.0, 1.0, 10.0);
    }

    // An unknown contributor count earns neither the bonus nor the penalty
    if let Some(contributors) = repository.contributors {
        score += log_scale(contributors as f64, 1.0, 200.0, 20.0);
        if contributors <= 1 {
            score -= 10.0;
        }
    }
    if repository.archived {
        score -= 25.0;
    }

    clamp_score(score)
}

fn popularity_score(
    registry: Option<&RegistryMetadata>,
    repository: Option<&RepositoryMetrics>,
) -> f64 {
    let mut score = NEUTRAL_SCORE;

    match registry.and_then(|r| r.downloads_last_month) {
        Some(downloads) => score += log_scale(downloads as f64, 100.0, 50_000_000.0, 40.0),
        None => score -= 5.0,
    }

    if let Some(repository) = repository {
        score += log_scale(repository.watchers as f64, 10.0, 5_000.0, 10.0);
    }

    clamp_score(score)
}

fn code_quality_score(repository: Option<&RepositoryMetrics>) -> f64 {
    let Some(repository) = repository else {
        return NEUTRAL_SCORE;
    };

    let mut score = NEUTRAL_SCORE;

    score += match repository.contributors {
        Some(n) if n > 5 => 15.0,
        Some(n) if n > 2 => 10.0,
        _ => 0.0,
    };

    score += match repository.pr_merge_rate {
        Some(rate) if rate > 0.6 => 15.0,
        Some(rate) if rate > 0.3 => 10.0,
        _ => 0.0,
    };

    score += match repository.avg_issue_close_days {
        Some(days) if days < 7.0 => 10.0,
        Some(days) if days < 30.0 => 5.0,
        _ => 0.0,
    };

    if !repository.fork {
        score += 10.0;
    }

    clamp_score(score)
}

fn license_score(
    registry: Option<&RegistryMetadata>,
    repository: Option<&RepositoryMetrics>,
) -> f64 {
    let license = LicensePolicy::select(
        repository.and_then(|r| r.license.as_deref()),
        registry.and_then(|r| r.license.as_deref()),
    );
    LicensePolicy::categorize(license).score()
}

/// LOW without registry data; otherwise by how many of repository,
/// vulnerability and download data are missing.
fn confidence(inputs: &ScoringInputs<'_>) -> ConfidenceLevel {
    let Some(registry) = inputs.registry else {
        return ConfidenceLevel::Low;
    };

    let missing = [
        inputs.repository.is_none(),
        inputs.vulnerabilities.is_none(),
        registry.downloads_last_month.is_none(),
    ]
    .into_iter()
    .filter(|missing| *missing)
    .count();

    match missing {
        0 => ConfidenceLevel::High,
        1 => ConfidenceLevel::Medium,
        _ => ConfidenceLevel::Low,
    }
}

fn maintenance_status(inputs: &ScoringInputs<'_>) -> MaintenanceStatus {
    if inputs.repository.is_some_and(|r| r.archived) {
        return MaintenanceStatus::Archived;
    }
    if inputs.registry.is_some_and(|r| r.is_deprecated()) {
        return MaintenanceStatus::Deprecated;
    }

    let since_release = inputs
        .registry
        .and_then(|r| r.days_since_release(inputs.now));
    let since_commit = inputs
        .repository
        .and_then(|r| r.days_since_commit(inputs.now));

    let most_recent = match (since_release, since_commit) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    };

    MaintenanceStatus::from_days_inactive(most_recent)
}
