mod factor_analyzer;
mod health_calculator;
mod normalization;
mod vulnerability_classifier;

pub use factor_analyzer::FactorAnalyzer;
pub use health_calculator::{
    security_score, HealthCalculator, ScoringInputs, UNKNOWN_SECURITY_SCORE,
};
pub use vulnerability_classifier::VulnerabilityClassifier;
