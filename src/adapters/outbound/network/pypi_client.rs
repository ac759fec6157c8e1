use super::http;
use crate::health_scoring::domain::RegistryMetadata;
use crate::ports::outbound::{DataSource, SourceCollector};
use crate::shared::security::validate_url_component;
use crate::shared::{CollectorError, CollectorResult};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;

const SOURCE_NAME: &str = "pypi";

#[derive(Debug, Deserialize)]
struct PyPiPackageDocument {
    info: PyPiInfo,
    #[serde(default)]
    releases: BTreeMap<String, Vec<PyPiReleaseFile>>,
}

#[derive(Debug, Deserialize)]
struct PyPiInfo {
    name: String,
    version: String,
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    license: Option<String>,
    #[serde(default)]
    license_expression: Option<String>,
    #[serde(default)]
    requires_python: Option<String>,
    #[serde(default)]
    requires_dist: Option<Vec<String>>,
    #[serde(default)]
    home_page: Option<String>,
    #[serde(default)]
    project_urls: Option<BTreeMap<String, String>>,
    #[serde(default)]
    classifiers: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct PyPiReleaseFile {
    #[serde(default)]
    upload_time_iso_8601: Option<DateTime<Utc>>,
    #[serde(default)]
    upload_time: Option<NaiveDateTime>,
    #[serde(default)]
    yanked: bool,
}

impl PyPiReleaseFile {
    fn uploaded_at(&self) -> Option<DateTime<Utc>> {
        self.upload_time_iso_8601
            .or_else(|| self.upload_time.map(|t| t.and_utc()))
    }
}

/// PyPiClient adapter for the PyPI JSON API
///
/// Fetches `https://pypi.org/pypi/{name}/json` and condenses the project
/// document into [`RegistryMetadata`]. Download counts are not part of this
/// document; see [`PyPiStatsClient`](super::PyPiStatsClient).
///
/// Pinned versions are not looked up individually: the project document
/// already names the latest version and lists every release, and one cache
/// entry then serves all pins of a package.
pub struct PyPiClient {
    client: reqwest::Client,
    base_url: String,
}

impl PyPiClient {
    const API_BASE: &'static str = "https://pypi.org/pypi";
    const TTL: Duration = Duration::from_secs(60 * 60);

    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            base_url: Self::API_BASE.to_string(),
        }
    }
}

#[async_trait]
impl SourceCollector for PyPiClient {
    type Output = RegistryMetadata;

    fn source(&self) -> DataSource {
        DataSource::Registry
    }

    fn cache_key(&self, identifier: &str) -> String {
        format!("pypi:pkg:{}", identifier)
    }

    fn default_ttl(&self) -> Duration {
        Self::TTL
    }

    async fn fetch(&self, identifier: &str) -> CollectorResult<RegistryMetadata> {
        validate_url_component(identifier, "Package name")
            .map_err(|e| CollectorError::network(SOURCE_NAME, e))?;

        let url = format!(
            "{}/{}/json",
            self.base_url,
            urlencoding::encode(identifier)
        );
        tracing::debug!(source = SOURCE_NAME, %url, "fetching registry metadata");

        let response = http::send(SOURCE_NAME, identifier, self.client.get(&url)).await?;
        let document: PyPiPackageDocument = http::read_json(SOURCE_NAME, response).await?;
        Ok(into_metadata(document))
    }
}

fn into_metadata(document: PyPiPackageDocument) -> RegistryMetadata {
    let PyPiPackageDocument { info, releases } = document;

    let upload_dates: Vec<DateTime<Utc>> = releases
        .values()
        .flatten()
        .filter_map(PyPiReleaseFile::uploaded_at)
        .collect();

    let yanked_releases = releases
        .values()
        .filter(|files| !files.is_empty() && files.iter().all(|f| f.yanked))
        .count();

    let license = info
        .license_expression
        .filter(|l| !l.trim().is_empty())
        .or(info.license.filter(|l| !l.trim().is_empty()));

    let mut metadata = RegistryMetadata::new(info.name, info.version);
    metadata.summary = info.summary.filter(|s| !s.is_empty());
    metadata.license = license;
    metadata.requires_python = info.requires_python.filter(|s| !s.is_empty());
    metadata.requires_dist = info.requires_dist.unwrap_or_default();
    metadata.home_page = info.home_page.filter(|s| !s.is_empty());
    metadata.project_urls = info.project_urls.unwrap_or_default();
    metadata.classifiers = info.classifiers;
    metadata.latest_release_date = upload_dates.iter().max().copied();
    metadata.first_release_date = upload_dates.iter().min().copied();
    metadata.total_releases = releases.len();
    metadata.yanked_releases = yanked_releases;
    metadata
}
