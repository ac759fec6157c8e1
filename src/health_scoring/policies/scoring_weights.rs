use crate::shared::error::HealthError;
use serde::{Deserialize, Serialize};

/// Weight overrides as they appear in configuration; any subset may be set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PartialWeights {
    pub security: Option<f64>,
    pub maintenance: Option<f64>,
    pub community: Option<f64>,
    pub popularity: Option<f64>,
}

/// Relative importance of the four weighted score components.
///
/// Always normalized so the four weights sum to 1.0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoringWeights {
    security: f64,
    maintenance: f64,
    community: f64,
    popularity: f64,
}

impl ScoringWeights {
    pub const DEFAULT_SECURITY: f64 = 0.35;
    pub const DEFAULT_MAINTENANCE: f64 = 0.30;
    pub const DEFAULT_COMMUNITY: f64 = 0.20;
    pub const DEFAULT_POPULARITY: f64 = 0.15;

    /// Builds weights from explicit values, renormalizing them to sum to 1.0.
    pub fn new(
        security: f64,
        maintenance: f64,
        community: f64,
        popularity: f64,
    ) -> Result<Self, HealthError> {
        let raw = [
            ("security", security),
            ("maintenance", maintenance),
            ("community", community),
            ("popularity", popularity),
        ];

        for (name, value) in raw {
            if !value.is_finite() || value < 0.0 {
                return Err(HealthError::Configuration {
                    message: format!("weight '{}' must be a non-negative number, got {}", name, value),
                    hint: "Use values such as 0.35; they are rescaled to sum to 1.0".to_string(),
                });
            }
        }

        let total: f64 = raw.iter().map(|(_, value)| value).sum();
        if total <= 0.0 {
            return Err(HealthError::Configuration {
                message: "at least one score weight must be greater than zero".to_string(),
                hint: "Remove the weights section to use the defaults".to_string(),
            });
        }

        Ok(Self {
            security: security / total,
            maintenance: maintenance / total,
            community: community / total,
            popularity: popularity / total,
        })
    }

    /// Fills omitted weights with their defaults, then renormalizes.
    pub fn from_partial(partial: &PartialWeights) -> Result<Self, HealthError> {
        Self::new(
            partial.security.unwrap_or(Self::DEFAULT_SECURITY),
            partial.maintenance.unwrap_or(Self::DEFAULT_MAINTENANCE),
            partial.community.unwrap_or(Self::DEFAULT_COMMUNITY),
            partial.popularity.unwrap_or(Self::DEFAULT_POPULARITY),
        )
    }

    pub fn security(&self) -> f64 {
        self.security
    }

    pub fn maintenance(&self) -> f64 {
        self.maintenance
    }

    pub fn community(&self) -> f64 {
        self.community
    }

    pub fn popularity(&self) -> f64 {
        self.popularity
    }
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            security: Self::DEFAULT_SECURITY,
            maintenance: Self::DEFAULT_MAINTENANCE,
            community: Self::DEFAULT_COMMUNITY,
            popularity: Self::DEFAULT_POPULARITY,
        }
    }
}
