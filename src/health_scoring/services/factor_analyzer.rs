use super::health_calculator::ScoringInputs;
use crate::health_scoring::domain::Severity;

/// FactorAnalyzer - human-readable explanations to go with a score
pub struct FactorAnalyzer;

impl FactorAnalyzer {
    pub fn risk_factors(inputs: &ScoringInputs<'_>) -> Vec<String> {
        let mut factors = Vec::new();

        match inputs.vulnerabilities {
            Some(vulnerabilities) => {
                for (severity, label) in [(Severity::Critical, "critical"), (Severity::High, "high")] {
                    let count = vulnerabilities
                        .iter()
                        .filter(|v| v.is_open() && v.severity == severity)
                        .count();
                    if count > 0 {
                        factors.push(format!(
                            "{} open {} vulnerabilit{}",
                            count,
                            label,
                            if count == 1 { "y" } else { "ies" }
                        ));
                    }
                }
            }
            None => factors.push("Vulnerability data unavailable".to_string()),
        }

        if let Some(repository) = inputs.repository {
            if repository.archived {
                factors.push("Repository is archived".to_string());
            }
        }

        if let Some(registry) = inputs.registry {
            if registry.is_deprecated() {
                factors.push("Package is deprecated".to_string());
            }

            match registry.days_since_release(inputs.now) {
                Some(days) if days > 730 => {
                    factors.push(format!("No release in {} years", days / 365));
                }
                Some(days) if days > 365 => factors.push("No release in over a year".to_string()),
                _ => {}
            }

            if registry.yanked_releases > 0 {
                factors.push(format!(
                    "{} yanked release{}",
                    registry.yanked_releases,
                    if registry.yanked_releases == 1 { "" } else { "s" }
                ));
            }
        }

        if let Some(repository) = inputs.repository {
            if repository.contributors == Some(1) {
                factors.push("Single maintainer (bus factor risk)".to_string());
            }
            if repository.open_issues > 100 && repository.issue_close_rate.is_some_and(|r| r < 0.1) {
                factors.push("Many open issues with low resolution rate".to_string());
            }
        }

        factors
    }

    pub fn positive_factors(inputs: &ScoringInputs<'_>) -> Vec<String> {
        let mut factors = Vec::new();

        if let Some(registry) = inputs.registry {
            match registry.downloads_last_month {
                Some(d) if d >= 1_000_000 => {
                    factors.push("Highly popular (1M+ monthly downloads)".to_string())
                }
                Some(d) if d >= 100_000 => {
                    factors.push("Popular package (100K+ monthly downloads)".to_string())
                }
                _ => {}
            }

            if registry.total_releases > 20 {
                factors.push("Mature project with many releases".to_string());
            }

            if registry
                .days_since_release(inputs.now)
                .is_some_and(|days| days < 30)
            {
                factors.push("Recently updated".to_string());
            }
        }

        if let Some(repository) = inputs.repository {
            match repository.contributors {
                Some(n) if n > 50 => factors.push("Large contributor community".to_string()),
                Some(n) if n > 10 => factors.push("Active contributor community".to_string()),
                _ => {}
            }

            if repository.stars > 5_000 {
                factors.push("Highly starred repository".to_string());
            } else if repository.stars > 1_000 {
                factors.push("Well-starred repository".to_string());
            }

            if repository.issue_close_rate.is_some_and(|r| r > 0.8) {
                factors.push("Excellent issue resolution rate".to_string());
            }
            if repository.pr_merge_rate.is_some_and(|r| r > 0.8) {
                factors.push("Excellent PR merge rate".to_string());
            }
            if repository.avg_issue_close_days.is_some_and(|days| days < 7.0) {
                factors.push("Fast issue resolution".to_string());
            }
        }

        factors
    }
}
