/// Inbound ports (Driving ports) - Use case interfaces
///
/// These ports define the interfaces that external adapters (e.g., CLI)
/// use to interact with the application core.
pub mod health_assessment_port;

pub use health_assessment_port::HealthAssessmentPort;
