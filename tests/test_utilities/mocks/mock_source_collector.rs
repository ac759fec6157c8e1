use async_trait::async_trait;
use dep_health::prelude::*;
use dep_health::shared::CollectorResult;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Mock SourceCollector for testing
///
/// Answers from a fixed table keyed by identifier; unknown identifiers are
/// `NotFound`. Call counts are shared between clones so a test can keep a
/// handle after moving the collector into a use case.
pub struct MockSourceCollector<T> {
    source: DataSource,
    responses: Arc<HashMap<String, CollectorResult<T>>>,
    delay: Option<Duration>,
    call_count: Arc<AtomicUsize>,
}

impl<T> Clone for MockSourceCollector<T> {
    fn clone(&self) -> Self {
        Self {
            source: self.source,
            responses: Arc::clone(&self.responses),
            delay: self.delay,
            call_count: Arc::clone(&self.call_count),
        }
    }
}

impl<T> MockSourceCollector<T> {
    pub fn new(source: DataSource) -> Self {
        Self {
            source,
            responses: Arc::new(HashMap::new()),
            delay: None,
            call_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_response(mut self, identifier: &str, response: T) -> Self {
        self.insert(identifier, Ok(response));
        self
    }

    pub fn with_error(mut self, identifier: &str, error: CollectorError) -> Self {
        self.insert(identifier, Err(error));
        self
    }

    /// Every fetch sleeps this long before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn get_call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    fn insert(&mut self, identifier: &str, response: CollectorResult<T>) {
        Arc::get_mut(&mut self.responses)
            .expect("configure the mock before cloning it")
            .insert(identifier.to_string(), response);
    }
}

#[async_trait]
impl<T> SourceCollector for MockSourceCollector<T>
where
    T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    type Output = T;

    fn source(&self) -> DataSource {
        self.source
    }

    fn cache_key(&self, identifier: &str) -> String {
        format!("mock:{}:{}", self.source, identifier)
    }

    fn default_ttl(&self) -> Duration {
        Duration::from_secs(3600)
    }

    async fn fetch(&self, identifier: &str) -> CollectorResult<T> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        match self.responses.get(identifier) {
            Some(response) => response.clone(),
            None => Err(CollectorError::NotFound {
                source_name: self.source.as_str(),
                identifier: identifier.to_string(),
            }),
        }
    }
}
