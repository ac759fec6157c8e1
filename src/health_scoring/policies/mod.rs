pub mod license_policy;
pub mod scoring_weights;

pub use license_policy::{LicenseCategory, LicensePolicy};
pub use scoring_weights::{PartialWeights, ScoringWeights};
