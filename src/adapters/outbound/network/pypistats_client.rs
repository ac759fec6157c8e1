use super::http;
use crate::health_scoring::domain::DownloadStats;
use crate::ports::outbound::{DataSource, SourceCollector};
use crate::shared::security::validate_url_component;
use crate::shared::{CollectorError, CollectorResult};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

const SOURCE_NAME: &str = "pypistats";

#[derive(Debug, Deserialize)]
struct RecentDownloadsDocument {
    data: RecentDownloads,
}

#[derive(Debug, Deserialize)]
struct RecentDownloads {
    #[serde(default)]
    last_day: Option<u64>,
    #[serde(default)]
    last_week: Option<u64>,
    #[serde(default)]
    last_month: Option<u64>,
}

/// PyPiStatsClient adapter for pypistats.org recent download counts
pub struct PyPiStatsClient {
    client: reqwest::Client,
}

impl PyPiStatsClient {
    const API_BASE: &'static str = "https://pypistats.org/api/packages";
    const TTL: Duration = Duration::from_secs(6 * 60 * 60);

    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SourceCollector for PyPiStatsClient {
    type Output = DownloadStats;

    fn source(&self) -> DataSource {
        DataSource::Downloads
    }

    fn cache_key(&self, identifier: &str) -> String {
        format!("pypistats:downloads:{}", identifier)
    }

    fn default_ttl(&self) -> Duration {
        Self::TTL
    }

    async fn fetch(&self, identifier: &str) -> CollectorResult<DownloadStats> {
        validate_url_component(identifier, "Package name")
            .map_err(|e| CollectorError::network(SOURCE_NAME, e))?;

        let url = format!(
            "{}/{}/recent",
            Self::API_BASE,
            urlencoding::encode(identifier)
        );
        let request = self
            .client
            .get(&url)
            .header(reqwest::header::ACCEPT, "application/json");

        let response = http::send(SOURCE_NAME, identifier, request).await?;
        let document: RecentDownloadsDocument = http::read_json(SOURCE_NAME, response).await?;
        into_stats(document)
    }
}

/// A document without a monthly figure is treated as malformed rather than
/// read as zero downloads.
fn into_stats(document: RecentDownloadsDocument) -> CollectorResult<DownloadStats> {
    let data = document.data;
    let last_month = data.last_month.ok_or_else(|| {
        CollectorError::network(SOURCE_NAME, "response is missing last_month")
    })?;

    Ok(DownloadStats {
        last_day: data.last_day.unwrap_or_default(),
        last_week: data.last_week.unwrap_or_default(),
        last_month,
    })
}
