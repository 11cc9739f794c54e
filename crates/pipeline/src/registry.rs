//! Pipeline Registry Implementation

use crate::pipeline::{Pipeline, PipelineKey, PipelineLoader};
use crate::PipelineError;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tokio::sync::watch;
use tracing::{info, warn};

type LoadResult = Result<Arc<dyn Pipeline>, PipelineError>;

/// State of one (task, model) cache slot
enum Slot {
    /// Pipeline loaded and reusable
    Ready(Arc<dyn Pipeline>),
    /// Load in flight; receiver resolves once it finishes
    Loading(watch::Receiver<Option<LoadResult>>),
}

/// Process-wide cache mapping (task, model) to loaded pipelines
///
/// Entries load lazily on first use and live for the process lifetime;
/// there is no eviction. Concurrent requests for the same uncached key
/// share a single in-flight load, and a failed load caches nothing so
/// the next request retries.
pub struct PipelineRegistry {
    loader: Arc<dyn PipelineLoader>,
    entries: Arc<Mutex<HashMap<PipelineKey, Slot>>>,
}

impl PipelineRegistry {
    /// Create a registry backed by `loader`
    pub fn new(loader: Arc<dyn PipelineLoader>) -> Self {
        Self {
            loader,
            entries: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Number of loaded pipelines (in-flight loads not counted)
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .map(|map| {
                map.values()
                    .filter(|slot| matches!(slot, Slot::Ready(_)))
                    .count()
            })
            .unwrap_or(0)
    }

    /// Whether no pipeline has been loaded yet
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Return the pipeline for (task, model), loading it first if needed
    ///
    /// The hit path returns the cached entry without suspending. On a
    /// miss the loader runs on the blocking pool as a detached task, so
    /// an aborted request still completes the load and populates the
    /// cache; every request waiting on that key shares the outcome.
    pub async fn get_or_load(
        &self,
        task: &str,
        model: &str,
    ) -> Result<Arc<dyn Pipeline>, PipelineError> {
        let key = PipelineKey::new(task, model);

        let mut rx = {
            let mut entries = self.entries.lock().map_err(|e| {
                PipelineError::LoadFailed(format!("registry lock poisoned: {}", e))
            })?;
            match entries.get(&key) {
                Some(Slot::Ready(pipeline)) => return Ok(pipeline.clone()),
                Some(Slot::Loading(rx)) => rx.clone(),
                None => {
                    let (tx, rx) = watch::channel(None);
                    entries.insert(key.clone(), Slot::Loading(rx.clone()));
                    self.spawn_load(key.clone(), tx);
                    rx
                }
            }
        };

        loop {
            if let Some(result) = rx.borrow_and_update().clone() {
                return result;
            }
            if rx.changed().await.is_err() {
                return Err(PipelineError::LoadFailed(format!(
                    "load task for {} dropped before completing",
                    key
                )));
            }
        }
    }

    /// Run the loader off the request loop and publish the outcome
    fn spawn_load(&self, key: PipelineKey, tx: watch::Sender<Option<LoadResult>>) {
        let loader = Arc::clone(&self.loader);
        let entries = Arc::clone(&self.entries);

        tokio::spawn(async move {
            info!("Loading pipeline {}", key);
            let start = Instant::now();

            let load_key = key.clone();
            let result: LoadResult =
                match tokio::task::spawn_blocking(move || loader.load(&load_key)).await {
                    Ok(Ok(pipeline)) => Ok(Arc::from(pipeline)),
                    Ok(Err(e)) => Err(e),
                    Err(e) => Err(PipelineError::LoadFailed(format!(
                        "load task panicked: {}",
                        e
                    ))),
                };

            match &result {
                Ok(_) => info!(
                    "Pipeline {} loaded in {}ms",
                    key,
                    start.elapsed().as_millis()
                ),
                Err(e) => warn!("Pipeline {} failed to load: {}", key, e),
            }

            match entries.lock() {
                Ok(mut map) => match &result {
                    Ok(pipeline) => {
                        map.insert(key, Slot::Ready(pipeline.clone()));
                    }
                    Err(_) => {
                        // failed loads must not poison the slot
                        map.remove(&key);
                    }
                },
                Err(e) => warn!("registry lock poisoned, dropping slot update: {}", e),
            }

            // waiters may all be gone; the cache update above still holds
            let _ = tx.send(Some(result));
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Map, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct EchoPipeline;

    impl Pipeline for EchoPipeline {
        fn run(&self, inputs: &Value, _options: &Map<String, Value>) -> Result<Value, PipelineError> {
            match inputs {
                Value::String(text) => Ok(json!({ "echo": text })),
                other => Err(PipelineError::InvalidInput(format!(
                    "expected a string, got {}",
                    other
                ))),
            }
        }
    }

    /// Counts loads, optionally failing the first `fail_first` of them
    struct CountingLoader {
        loads: AtomicUsize,
        fail_first: usize,
        delay: Duration,
    }

    impl CountingLoader {
        fn new() -> Self {
            Self {
                loads: AtomicUsize::new(0),
                fail_first: 0,
                delay: Duration::ZERO,
            }
        }

        fn failing_first(count: usize) -> Self {
            Self {
                fail_first: count,
                ..Self::new()
            }
        }

        fn slow(delay: Duration) -> Self {
            Self {
                delay,
                ..Self::new()
            }
        }

        fn load_count(&self) -> usize {
            self.loads.load(Ordering::SeqCst)
        }
    }

    impl PipelineLoader for CountingLoader {
        fn load(&self, _key: &PipelineKey) -> Result<Box<dyn Pipeline>, PipelineError> {
            let n = self.loads.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                std::thread::sleep(self.delay);
            }
            if n < self.fail_first {
                return Err(PipelineError::LoadFailed("backend unavailable".to_string()));
            }
            Ok(Box::new(EchoPipeline))
        }
    }

    #[tokio::test]
    async fn test_second_request_reuses_cached_pipeline() {
        let loader = Arc::new(CountingLoader::new());
        let registry = PipelineRegistry::new(loader.clone());

        registry
            .get_or_load("sentiment-analysis", "distilbert-base")
            .await
            .unwrap();
        registry
            .get_or_load("sentiment-analysis", "distilbert-base")
            .await
            .unwrap();

        assert_eq!(loader.load_count(), 1);
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_first_requests_load_once() {
        let loader = Arc::new(CountingLoader::slow(Duration::from_millis(50)));
        let registry = Arc::new(PipelineRegistry::new(loader.clone()));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let registry = registry.clone();
            handles.push(tokio::spawn(async move {
                registry.get_or_load("sentiment-analysis", "distilbert-base").await
            }));
        }

        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(loader.load_count(), 1);
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn test_failed_load_is_not_cached() {
        let loader = Arc::new(CountingLoader::failing_first(1));
        let registry = PipelineRegistry::new(loader.clone());

        let err = registry
            .get_or_load("sentiment-analysis", "distilbert-base")
            .await
            .err()
            .unwrap();
        assert!(matches!(err, PipelineError::LoadFailed(_)));
        assert!(registry.is_empty());

        // the retry goes back to the loader and succeeds
        registry
            .get_or_load("sentiment-analysis", "distilbert-base")
            .await
            .unwrap();
        assert_eq!(loader.load_count(), 2);
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn test_inference_failure_keeps_entry_valid() {
        let loader = Arc::new(CountingLoader::new());
        let registry = PipelineRegistry::new(loader.clone());

        let pipeline = registry.get_or_load("echo", "echo-base").await.unwrap();
        let err = crate::invoke(pipeline, json!(42), Map::new()).await.unwrap_err();
        assert!(matches!(err, PipelineError::InvalidInput(_)));

        // same entry, no reload, valid inputs still work
        let pipeline = registry.get_or_load("echo", "echo-base").await.unwrap();
        let result = crate::invoke(pipeline, json!("hello"), Map::new()).await.unwrap();
        assert_eq!(result, json!({ "echo": "hello" }));
        assert_eq!(loader.load_count(), 1);
    }

    #[tokio::test]
    async fn test_distinct_keys_load_independently() {
        let loader = Arc::new(CountingLoader::new());
        let registry = PipelineRegistry::new(loader.clone());

        registry
            .get_or_load("sentiment-analysis", "distilbert-base")
            .await
            .unwrap();
        registry
            .get_or_load("sentiment-analysis", "bert-large")
            .await
            .unwrap();
        registry.get_or_load("fill-mask", "bert-large").await.unwrap();

        assert_eq!(loader.load_count(), 3);
        assert_eq!(registry.len(), 3);
    }
}
