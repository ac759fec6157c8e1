use crate::shared::security::validate_response_size;
use crate::shared::{CollectorError, CollectorResult, Result};
use chrono::Utc;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Builds the HTTP client shared by every collector.
///
/// The timeout bounds each request as a whole. Collectors never retry.
pub fn build_client(timeout: Duration) -> Result<reqwest::Client> {
    let version = env!("CARGO_PKG_VERSION");
    let user_agent = format!("dep-health/{}", version);
    let client = reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(user_agent)
        .build()?;
    Ok(client)
}

/// Maps a non-success status onto a [`CollectorError`].
///
/// Returns `None` for 2xx responses.
pub(crate) fn status_error(
    source_name: &'static str,
    identifier: &str,
    status: StatusCode,
    headers: &HeaderMap,
) -> Option<CollectorError> {
    if status.is_success() {
        return None;
    }

    let error = match status {
        StatusCode::NOT_FOUND => CollectorError::NotFound {
            source_name,
            identifier: identifier.to_string(),
        },
        StatusCode::TOO_MANY_REQUESTS => CollectorError::RateLimited {
            source_name,
            retry_after: retry_after(headers),
        },
        StatusCode::FORBIDDEN if header_str(headers, "x-ratelimit-remaining") == Some("0") => {
            CollectorError::RateLimited {
                source_name,
                retry_after: rate_limit_reset(headers, Utc::now().timestamp()),
            }
        }
        other => CollectorError::Network {
            source_name,
            status: Some(other.as_u16()),
            details: other
                .canonical_reason()
                .unwrap_or("unexpected status")
                .to_string(),
        },
    };

    Some(error)
}

/// Maps a reqwest transport failure onto a [`CollectorError`].
pub(crate) fn transport_error(source_name: &'static str, error: reqwest::Error) -> CollectorError {
    if error.is_timeout() {
        CollectorError::Timeout { source_name }
    } else {
        CollectorError::Network {
            source_name,
            status: error.status().map(|s| s.as_u16()),
            details: error.to_string(),
        }
    }
}

/// Sends a prepared request and returns the successful response.
pub(crate) async fn send(
    source_name: &'static str,
    identifier: &str,
    request: reqwest::RequestBuilder,
) -> CollectorResult<Response> {
    let response = request
        .send()
        .await
        .map_err(|e| transport_error(source_name, e))?;

    if let Some(error) = status_error(source_name, identifier, response.status(), response.headers())
    {
        return Err(error);
    }

    validate_response_size(response.content_length(), response.url().as_str())
        .map_err(|e| CollectorError::network(source_name, e))?;

    Ok(response)
}

/// Decodes a JSON body, mapping failures to the collector taxonomy.
pub(crate) async fn read_json<T: DeserializeOwned>(
    source_name: &'static str,
    response: Response,
) -> CollectorResult<T> {
    response.json::<T>().await.map_err(|e| {
        if e.is_timeout() {
            CollectorError::Timeout { source_name }
        } else {
            CollectorError::network(source_name, format!("invalid response body: {}", e))
        }
    })
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok()).map(str::trim)
}

/// `Retry-After` in delta-seconds form. HTTP-date values are ignored.
fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

/// Seconds until an `X-RateLimit-Reset` epoch timestamp.
fn rate_limit_reset(headers: &HeaderMap, now_epoch_secs: i64) -> Option<Duration> {
    let reset = header_str(headers, "x-ratelimit-reset")?.parse::<i64>().ok()?;
    let wait = u64::try_from(reset.saturating_sub(now_epoch_secs)).unwrap_or(0);
    Some(Duration::from_secs(wait))
}
