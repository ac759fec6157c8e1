use super::http;
use crate::health_scoring::domain::version;
use crate::health_scoring::domain::{CvssScore, Severity, Vulnerability};
use crate::ports::outbound::{DataSource, SourceCollector};
use crate::shared::{CollectorError, CollectorResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::time::Duration;

const SOURCE_NAME: &str = "osv";
const ECOSYSTEM: &str = "PyPI";

/// Range types whose events are package versions. `GIT` ranges carry commit
/// hashes and never take part in version comparison.
const VERSION_RANGE_TYPES: [&str; 2] = ["ECOSYSTEM", "SEMVER"];

/// OSV API client for fetching the advisory history of a package
///
/// Uses the OSV.dev query API without a version so one cached response serves
/// every installed version; open/fixed classification happens afterwards.
///
/// # Security
/// - Implements timeout (shared client, 30 seconds by default)
/// - Does not retry failed requests
/// - Follows at most `MAX_PAGES` page tokens
pub struct OsvClient {
    client: reqwest::Client,
    api_url: String,
}

impl OsvClient {
    const API_ENDPOINT: &'static str = "https://api.osv.dev/v1/query";
    const MAX_PAGES: usize = 10;
    const TTL: Duration = Duration::from_secs(6 * 60 * 60);

    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            api_url: Self::API_ENDPOINT.to_string(),
        }
    }

    async fn fetch_page(
        &self,
        package_name: &str,
        page_token: Option<String>,
    ) -> CollectorResult<OsvQueryResponse> {
        let query = OsvQuery {
            package: OsvPackage {
                name: package_name.to_string(),
                ecosystem: ECOSYSTEM.to_string(),
            },
            page_token,
        };

        let request = self.client.post(&self.api_url).json(&query);
        let response = http::send(SOURCE_NAME, package_name, request).await?;
        http::read_json(SOURCE_NAME, response).await
    }
}

#[async_trait]
impl SourceCollector for OsvClient {
    type Output = Vec<Vulnerability>;

    fn source(&self) -> DataSource {
        DataSource::VulnerabilityFeed
    }

    fn cache_key(&self, identifier: &str) -> String {
        format!("vuln:feed:{}", identifier)
    }

    fn default_ttl(&self) -> Duration {
        Self::TTL
    }

    /// An unknown package yields an empty list: OSV answers `{}` rather
    /// than 404 for packages without advisories.
    async fn fetch(&self, identifier: &str) -> CollectorResult<Vec<Vulnerability>> {
        let mut vulnerabilities = Vec::new();
        let mut page_token = None;

        for page in 1..=Self::MAX_PAGES {
            let response = self.fetch_page(identifier, page_token.take()).await?;
            vulnerabilities.extend(response.vulns.iter().map(convert_to_vulnerability));

            match response.next_page_token.filter(|t| !t.is_empty()) {
                Some(token) if page < Self::MAX_PAGES => page_token = Some(token),
                Some(_) => {
                    tracing::warn!(
                        source = SOURCE_NAME,
                        package = identifier,
                        pages = Self::MAX_PAGES,
                        "advisory list truncated at page limit"
                    );
                }
                None => break,
            }
        }

        Ok(vulnerabilities)
    }
}

/// Converts a single OSV record to the domain model
fn convert_to_vulnerability(osv_vuln: &OsvVulnerability) -> Vulnerability {
    // Only v3 vectors carry the metrics the base-score formula needs
    let cvss_score = osv_vuln
        .severity
        .iter()
        .find(|s| s.severity_type == "CVSS_V3")
        .and_then(|s| parse_cvss_score(&s.score));

    // CVSS score first, then database_specific.severity, then MEDIUM
    let severity = if let Some(score) = cvss_score {
        Severity::from_cvss_score(score)
    } else if let Some(db_severity) = osv_vuln
        .database_specific
        .as_ref()
        .and_then(|db| db.severity.as_deref())
    {
        parse_severity_string(db_severity)
    } else {
        Severity::Medium
    };

    let title = osv_vuln
        .summary
        .clone()
        .filter(|s| !s.trim().is_empty())
        .or_else(|| {
            osv_vuln
                .details
                .as_deref()
                .and_then(|d| d.lines().next())
                .map(str::to_string)
        })
        .unwrap_or_else(|| osv_vuln.id.clone());

    let ranges: Vec<&OsvRange> = osv_vuln
        .affected
        .iter()
        .filter(|a| {
            a.package
                .as_ref()
                .is_none_or(|p| p.ecosystem.eq_ignore_ascii_case(ECOSYSTEM))
        })
        .flat_map(|a| a.ranges.iter())
        .filter(|r| r.is_version_range())
        .collect();

    let mut vulnerability = Vulnerability::new(osv_vuln.id.clone(), severity, title)
        .with_affected_versions(render_affected_ranges(&ranges));
    vulnerability.description = osv_vuln.details.clone().unwrap_or_default();
    vulnerability.published = osv_vuln.published;
    vulnerability.references = osv_vuln.references.iter().map(|r| r.url.clone()).collect();
    vulnerability.fixed_version = highest_fixed_version(&ranges);
    vulnerability.cvss_score = cvss_score;
    vulnerability
}

/// The highest `fixed` event: an installed version must clear every branch's
/// fix before the advisory counts as fixed.
fn highest_fixed_version(ranges: &[&OsvRange]) -> Option<String> {
    ranges
        .iter()
        .flat_map(|r| r.events.iter())
        .filter_map(|e| e.fixed.as_deref())
        .max_by(|a, b| version::compare(a, b))
        .map(str::to_string)
}

/// Renders ranges as `>=introduced, <fixed` clauses joined by ` || `.
fn render_affected_ranges(ranges: &[&OsvRange]) -> String {
    let mut intervals = Vec::new();

    for range in ranges {
        let mut clauses: Vec<String> = Vec::new();
        for event in &range.events {
            if let Some(introduced) = event.introduced.as_deref() {
                if !clauses.is_empty() {
                    intervals.push(clauses.join(", "));
                    clauses.clear();
                }
                if introduced != "0" {
                    clauses.push(format!(">={}", introduced));
                }
            }
            if let Some(fixed) = event.fixed.as_deref() {
                clauses.push(format!("<{}", fixed));
                intervals.push(clauses.join(", "));
                clauses.clear();
            }
            if let Some(last) = event.last_affected.as_deref() {
                clauses.push(format!("<={}", last));
                intervals.push(clauses.join(", "));
                clauses.clear();
            }
        }
        if !clauses.is_empty() {
            intervals.push(clauses.join(", "));
        }
    }

    intervals.retain(|i| !i.is_empty());
    intervals.sort_by(|a, b| natural_order(a, b));
    intervals.dedup();
    intervals.join(" || ")
}

/// Orders intervals by lower bound; an interval without one starts at `0`.
fn natural_order(a: &str, b: &str) -> Ordering {
    let lower = |s: &str| -> String {
        match s.strip_prefix(">=") {
            Some(rest) => rest.split(',').next().unwrap_or_default().trim().to_string(),
            None => "0".to_string(),
        }
    };
    version::compare(&lower(a), &lower(b))
}

// OSV API request/response structures

#[derive(Debug, Serialize)]
struct OsvQuery {
    package: OsvPackage,
    #[serde(skip_serializing_if = "Option::is_none")]
    page_token: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct OsvPackage {
    name: String,
    ecosystem: String, // "PyPI"
}

#[derive(Debug, Deserialize)]
struct OsvQueryResponse {
    #[serde(default)]
    vulns: Vec<OsvVulnerability>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OsvVulnerability {
    id: String,
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    details: Option<String>,
    #[serde(default)]
    published: Option<DateTime<Utc>>,
    #[serde(default)]
    references: Vec<OsvReference>,
    #[serde(default)]
    severity: Vec<OsvSeverity>,
    #[serde(default)]
    database_specific: Option<DatabaseSpecific>,
    #[serde(default)]
    affected: Vec<OsvAffected>,
}

#[derive(Debug, Deserialize)]
struct OsvReference {
    url: String,
}

#[derive(Debug, Deserialize)]
struct OsvSeverity {
    #[serde(rename = "type")]
    severity_type: String, // "CVSS_V3"
    score: String,         // e.g., "CVSS:3.1/AV:N/AC:L/..."
}

#[derive(Debug, Deserialize)]
struct DatabaseSpecific {
    #[serde(default)]
    severity: Option<String>, // "CRITICAL", "HIGH", "MODERATE", "MEDIUM", "LOW"
}

#[derive(Debug, Deserialize)]
struct OsvAffected {
    #[serde(default)]
    package: Option<OsvPackage>,
    #[serde(default)]
    ranges: Vec<OsvRange>,
}

#[derive(Debug, Deserialize)]
struct OsvRange {
    #[serde(rename = "type", default)]
    range_type: String, // "ECOSYSTEM", "SEMVER" or "GIT"
    #[serde(default)]
    events: Vec<OsvEvent>,
}

impl OsvRange {
    fn is_version_range(&self) -> bool {
        VERSION_RANGE_TYPES
            .iter()
            .any(|t| self.range_type.eq_ignore_ascii_case(t))
    }
}

#[derive(Debug, Deserialize)]
struct OsvEvent {
    #[serde(default)]
    introduced: Option<String>,
    #[serde(default)]
    fixed: Option<String>,
    #[serde(default)]
    last_affected: Option<String>,
}

/// Computes a CVSS v3 base score from its vector string
///
/// Example: "CVSS:3.1/AV:N/AC:L/PR:N/UI:N/S:U/C:H/I:H/A:H" -> Some(9.8)
///
/// Vectors of other CVSS versions lack the v3 metrics and yield `None`.
fn parse_cvss_score(cvss_vector: &str) -> Option<CvssScore> {
    let metrics: std::collections::HashMap<&str, &str> = cvss_vector
        .split('/')
        .skip(1) // Skip "CVSS:3.1" or "CVSS:3.0"
        .filter_map(|part| {
            let mut split = part.split(':');
            Some((split.next()?, split.next()?))
        })
        .collect();

    let av = metrics.get("AV")?;
    let ac = metrics.get("AC")?;
    let pr = metrics.get("PR")?;
    let ui = metrics.get("UI")?;
    let s = metrics.get("S")?;
    let c = metrics.get("C")?;
    let i = metrics.get("I")?;
    let a = metrics.get("A")?;

    let av_score = match *av {
        "N" => 0.85,
        "A" => 0.62,
        "L" => 0.55,
        "P" => 0.2,
        _ => return None,
    };

    let ac_score = match *ac {
        "L" => 0.77,
        "H" => 0.44,
        _ => return None,
    };

    let pr_score = match (*pr, *s) {
        ("N", _) => 0.85,
        ("L", "U") => 0.62,
        ("L", "C") => 0.68,
        ("H", "U") => 0.27,
        ("H", "C") => 0.5,
        _ => return None,
    };

    let ui_score = match *ui {
        "N" => 0.85,
        "R" => 0.62,
        _ => return None,
    };

    let impact_value = |metric: &str| match metric {
        "N" => Some(0.0),
        "L" => Some(0.22),
        "H" => Some(0.56),
        _ => None,
    };
    let c_score: f64 = impact_value(c)?;
    let i_score: f64 = impact_value(i)?;
    let a_score: f64 = impact_value(a)?;

    // Impact sub-score
    let iss = 1.0_f64 - ((1.0 - c_score) * (1.0 - i_score) * (1.0 - a_score));

    let impact = if *s == "U" {
        6.42 * iss
    } else {
        7.52 * (iss - 0.029) - 3.25 * (iss - 0.02_f64).powi(15)
    };

    let exploitability = 8.22 * av_score * ac_score * pr_score * ui_score;

    let base_score = if impact <= 0.0 {
        0.0
    } else if *s == "U" {
        f64::min(impact + exploitability, 10.0)
    } else {
        f64::min(1.08 * (impact + exploitability), 10.0)
    };

    // Round up to one decimal place
    let rounded_score = (base_score * 10.0).ceil() / 10.0;

    CvssScore::new(rounded_score as f32).ok()
}

/// Parses severity string from OSV database_specific field
///
/// - "CRITICAL" -> Severity::Critical
/// - "HIGH" -> Severity::High
/// - "MODERATE" or "MEDIUM" -> Severity::Medium
/// - "LOW" -> Severity::Low
/// - Unknown values -> Severity::Medium
fn parse_severity_string(severity: &str) -> Severity {
    match severity.trim().to_uppercase().as_str() {
        "CRITICAL" => Severity::Critical,
        "HIGH" => Severity::High,
        "LOW" => Severity::Low,
        _ => Severity::Medium,
    }
}
