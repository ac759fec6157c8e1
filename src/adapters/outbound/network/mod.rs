/// Network adapters for external API calls
mod caching_collector;
mod github_client;
mod http;
mod osv_client;
mod pypi_client;
mod pypistats_client;

pub use caching_collector::{CachingCollector, DEFAULT_NOT_FOUND_TTL};
pub use github_client::GitHubClient;
pub use http::{build_client, DEFAULT_TIMEOUT};
pub use osv_client::OsvClient;
pub use pypi_client::PyPiClient;
pub use pypistats_client::PyPiStatsClient;
