use crate::application::dto::{DependencyReport, ScanEntry, ScanResponse};
use crate::health_scoring::domain::HealthGrade;
use owo_colors::OwoColorize;
use std::fmt::Write;

/// Human-readable scan summary for stderr.
///
/// `colored` is decided by the caller (usually whether stderr is a terminal).
pub fn render_summary(response: &ScanResponse, colored: bool) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "📊 Dependency health summary");

    for entry in &response.entries {
        match entry {
            ScanEntry::Assessed { report, .. } => {
                let _ = writeln!(out, "   {}", report_line(report, colored));
            }
            ScanEntry::Rejected { input, .. } => {
                let label = paint("invalid", colored, |s| s.red().to_string());
                let _ = writeln!(out, "   {:<30} {}", input, label);
            }
        }
    }

    let concerning = response.concerning_count();
    if concerning > 0 {
        let line = format!("⚠️  {} package(s) need attention", concerning);
        let _ = writeln!(out, "{}", paint(&line, colored, |s| s.yellow().to_string()));
    }

    out
}

fn report_line(report: &DependencyReport, colored: bool) -> String {
    let health = &report.health;
    let grade = health.grade.to_string();
    let grade = match health.grade {
        HealthGrade::A | HealthGrade::B => paint(&grade, colored, |s| s.green().to_string()),
        HealthGrade::C => paint(&grade, colored, |s| s.yellow().to_string()),
        HealthGrade::D | HealthGrade::F => paint(&grade, colored, |s| s.red().to_string()),
    };

    let mut line = format!(
        "{:<30} {} {:>5.1}  confidence {}",
        report.package,
        grade,
        health.overall,
        health.confidence.as_str()
    );

    let open = health.open_vulnerabilities().count();
    if open > 0 {
        let _ = write!(line, ", {} open advisory(ies)", open);
    }
    if report.update_available {
        if let Some(latest) = &report.latest_version {
            let _ = write!(line, ", {} available", latest);
        }
    }
    line
}

fn paint(text: &str, colored: bool, style: impl Fn(&str) -> String) -> String {
    if colored {
        style(text)
    } else {
        text.to_string()
    }
}
