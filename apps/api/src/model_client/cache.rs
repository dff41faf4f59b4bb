//! Content-addressed embedding cache with single-flight collapse on
//! concurrent misses (spec §4.6, §5).

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use dashmap::DashMap;
use futures::future::{FutureExt, Shared};
use sha2::{Digest, Sha256};

use super::ModelError;

type EmbedFuture = Shared<Pin<Box<dyn Future<Output = Result<Vec<f32>, ModelError>> + Send>>>;

/// Keyed by SHA-256(text || model). `store` holds resolved vectors; `in_flight`
/// holds the shared future for a key currently being computed so concurrent
/// misses for the same key await the same provider call instead of issuing
/// their own (spec §5: "multiple concurrent misses for the same key MUST
/// collapse to one provider call").
#[derive(Default)]
pub struct EmbeddingCache {
    store: DashMap<String, Vec<f32>>,
    in_flight: DashMap<String, EmbedFuture>,
}

pub fn cache_key(text: &str, model: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hasher.update(b"|");
    hasher.update(model.as_bytes());
    hex::encode(hasher.finalize())
}

impl EmbeddingCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<Vec<f32>> {
        self.store.get(key).map(|v| v.clone())
    }

    /// Resolves `key` via `compute` (the actual provider call), collapsing
    /// concurrent misses for the same key into a single in-flight future.
    pub async fn get_or_compute<F>(&self, key: String, compute: F) -> Result<Vec<f32>, ModelError>
    where
        F: Future<Output = Result<Vec<f32>, ModelError>> + Send + 'static,
    {
        if let Some(hit) = self.get(&key) {
            return Ok(hit);
        }

        let shared = match self.in_flight.get(&key) {
            Some(existing) => existing.clone(),
            None => {
                let boxed: Pin<Box<dyn Future<Output = Result<Vec<f32>, ModelError>> + Send>> =
                    Box::pin(compute);
                let shared: EmbedFuture = boxed.shared();
                self.in_flight.insert(key.clone(), shared.clone());
                shared
            }
        };

        let result = shared.await;
        self.in_flight.remove(&key);
        if let Ok(vec) = &result {
            self.store.insert(key, vec.clone());
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_cache_key_is_stable_for_same_input() {
        let a = cache_key("hello world", "model-a");
        let b = cache_key("hello world", "model-a");
        assert_eq!(a, b);
    }

    #[test]
    fn test_cache_key_differs_by_model() {
        let a = cache_key("hello world", "model-a");
        let b = cache_key("hello world", "model-b");
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_concurrent_misses_collapse_to_one_compute() {
        let cache = Arc::new(EmbeddingCache::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let key = cache_key("same text", "m");

        let mut handles = Vec::new();
        for _ in 0..8 {
            let cache = cache.clone();
            let calls = calls.clone();
            let key = key.clone();
            handles.push(tokio::spawn(async move {
                cache
                    .get_or_compute(key, async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
                        Ok(vec![1.0, 2.0, 3.0])
                    })
                    .await
            }));
        }
        for h in handles {
            assert!(h.await.unwrap().is_ok());
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_second_call_after_resolution_hits_cache() {
        let cache = EmbeddingCache::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let key = cache_key("text", "m");

        for _ in 0..2 {
            let calls = calls.clone();
            let key = key.clone();
            cache
                .get_or_compute(key, async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(vec![0.5])
                })
                .await
                .unwrap();
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
