use crate::shared::CollectorResult;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// External data sources consulted during an assessment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    Registry,
    Downloads,
    Repository,
    VulnerabilityFeed,
}

impl DataSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataSource::Registry => "registry",
            DataSource::Downloads => "downloads",
            DataSource::Repository => "repository",
            DataSource::VulnerabilityFeed => "vulnerability_feed",
        }
    }
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// SourceCollector port for fetching one kind of data about a package
///
/// Each implementation talks to exactly one source. Failures are returned as
/// [`CollectorError`](crate::shared::CollectorError) values and never
/// replaced by zero or default data.
///
/// Implementations must be `Send + Sync` to support concurrent fetches.
#[async_trait]
pub trait SourceCollector: Send + Sync {
    type Output: Serialize + DeserializeOwned + Clone + Send + Sync + 'static;

    fn source(&self) -> DataSource;

    /// Canonical cache key for `identifier`.
    fn cache_key(&self, identifier: &str) -> String;

    /// How long a successful result stays fresh.
    fn default_ttl(&self) -> Duration;

    /// Whether a successful result is missing some of its data. Partial
    /// results are cached only briefly so the gaps get another chance.
    fn is_partial(&self, _output: &Self::Output) -> bool {
        false
    }

    /// Fetches fresh data for `identifier`.
    async fn fetch(&self, identifier: &str) -> CollectorResult<Self::Output>;
}

#[async_trait]
impl<C: SourceCollector> SourceCollector for Arc<C> {
    type Output = C::Output;

    fn source(&self) -> DataSource {
        (**self).source()
    }

    fn cache_key(&self, identifier: &str) -> String {
        (**self).cache_key(identifier)
    }

    fn default_ttl(&self) -> Duration {
        (**self).default_ttl()
    }

    fn is_partial(&self, output: &Self::Output) -> bool {
        (**self).is_partial(output)
    }

    async fn fetch(&self, identifier: &str) -> CollectorResult<Self::Output> {
        (**self).fetch(identifier).await
    }
}
