/// Data Transfer Objects for application layer
///
/// DTOs are used to transfer data between the application layer
/// and adapters, keeping the domain layer isolated.
mod dependency_report;
mod source_outcome;

pub use dependency_report::{DependencyReport, ScanEntry, ScanResponse};
pub use source_outcome::{AbsenceReason, SourceOutcome, SourceReport, SourceStatus};
