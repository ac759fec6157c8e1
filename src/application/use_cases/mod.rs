/// Use cases module containing application business logic orchestration
mod assess_health;
mod scan_packages;

pub use assess_health::AssessHealthUseCase;
pub use scan_packages::{ScanPackagesUseCase, DEFAULT_MAX_CONCURRENCY};
