//! ModelClient (C1): the single contract for chat-completion and embedding
//! providers, with retries, a circuit breaker, and a content-addressed
//! embedding cache (spec §4.1).

pub mod cache;
pub mod circuit;
pub mod prompts;
pub mod schema;

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use cache::{cache_key, EmbeddingCache};
use circuit::CircuitBreaker;
use schema::Schema;

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
pub const MODEL: &str = "claude-sonnet-4-5";
const MAX_TOKENS: u32 = 4096;

/// Provider failure taxonomy (spec §4.1, §7). `CircuitOpen` is local —
/// raised without contacting the provider when the breaker is tripped.
#[derive(Debug, Error, Clone)]
pub enum ModelError {
    #[error("rate limited after {attempts} attempts")]
    RateLimited { attempts: u32 },
    #[error("transient provider error: {0}")]
    Transient(String),
    #[error("permanent provider error: {0}")]
    Permanent(String),
    #[error("response failed schema validation: {0}")]
    SchemaViolation(String),
    #[error("circuit breaker open")]
    CircuitOpen,
}

/// Retry/backoff knobs (spec §6: max_attempts, initial_wait, max_wait).
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_wait: Duration,
    pub max_wait: Duration,
}

impl RetryPolicy {
    fn delay_for(&self, attempt: u32) -> Duration {
        let scaled = self.initial_wait.as_millis().saturating_mul(1u128 << attempt.min(16));
        Duration::from_millis(scaled.min(self.max_wait.as_millis()) as u64)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_wait: Duration::from_secs(1),
            max_wait: Duration::from_secs(30),
        }
    }
}

/// `{complete, embed}` per spec §4.1. Implementations must tolerate output
/// non-determinism on `complete` and guarantee at-most-once provider calls
/// per distinct `embed` input (via the content-hash cache).
#[async_trait]
pub trait ModelClient: Send + Sync {
    async fn complete(
        &self,
        prompt: &str,
        system: &str,
        schema: Schema,
        budget: Duration,
    ) -> Result<Value, ModelError>;

    async fn embed(&self, texts: &[String], model: &str) -> Result<Vec<Vec<f32>>, ModelError>;
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AnthropicErrorBody {
    error: AnthropicErrorMessage,
}

#[derive(Debug, Deserialize)]
struct AnthropicErrorMessage {
    message: String,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    embeddings: Vec<Vec<f32>>,
}

pub struct AnthropicModelClient {
    client: Client,
    api_key: String,
    embedding_endpoint: String,
    embedding_batch_size: usize,
    retry: RetryPolicy,
    circuit: CircuitBreaker,
    cache: EmbeddingCache,
}

impl AnthropicModelClient {
    pub fn new(
        api_key: String,
        embedding_endpoint: String,
        embedding_batch_size: usize,
        retry: RetryPolicy,
        circuit_threshold: u32,
        circuit_cooldown: Duration,
    ) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(120))
                .build()
                .expect("failed to build HTTP client"),
            api_key,
            embedding_endpoint,
            embedding_batch_size: embedding_batch_size.max(1),
            retry,
            circuit: CircuitBreaker::new(circuit_threshold, circuit_cooldown),
            cache: EmbeddingCache::new(),
        }
    }

    async fn call_with_retry<T, F, Fut>(&self, call: F) -> Result<T, ModelError>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<T, ModelError>>,
    {
        if !self.circuit.allow_call() {
            return Err(ModelError::CircuitOpen);
        }

        let mut last_error: Option<ModelError> = None;
        for attempt in 0..self.retry.max_attempts {
            if attempt > 0 {
                let delay = self.retry.delay_for(attempt - 1);
                warn!(attempt, delay_ms = delay.as_millis() as u64, "retrying provider call");
                tokio::time::sleep(delay).await;
            }

            match call().await {
                Ok(value) => {
                    self.circuit.record_success();
                    return Ok(value);
                }
                Err(e @ (ModelError::RateLimited { .. } | ModelError::Transient(_))) => {
                    last_error = Some(e);
                    continue;
                }
                Err(permanent) => {
                    self.circuit.record_failure();
                    return Err(permanent);
                }
            }
        }

        self.circuit.record_failure();
        Err(last_error.unwrap_or(ModelError::RateLimited {
            attempts: self.retry.max_attempts,
        }))
    }

    async fn post_chat(&self, prompt: &str, system: &str, budget: Duration) -> Result<String, ModelError> {
        let body = serde_json::json!({
            "model": MODEL,
            "max_tokens": MAX_TOKENS,
            "system": system,
            "messages": [{"role": "user", "content": prompt}],
        });

        let response = tokio::time::timeout(
            budget,
            self.client
                .post(ANTHROPIC_API_URL)
                .header("x-api-key", &self.api_key)
                .header("anthropic-version", ANTHROPIC_VERSION)
                .header("content-type", "application/json")
                .json(&body)
                .send(),
        )
        .await
        .map_err(|_| ModelError::Transient("deadline exceeded".into()))?
        .map_err(|e| ModelError::Transient(e.to_string()))?;

        let status = response.status();
        if status.as_u16() == 429 || status.is_server_error() {
            let text = response.text().await.unwrap_or_default();
            return Err(ModelError::Transient(format!("status {status}: {text}")));
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<AnthropicErrorBody>(&text)
                .map(|e| e.error.message)
                .unwrap_or(text);
            return Err(ModelError::Permanent(message));
        }

        let parsed: AnthropicResponse = response
            .json()
            .await
            .map_err(|e| ModelError::Transient(e.to_string()))?;

        parsed
            .content
            .into_iter()
            .find(|b| b.block_type == "text")
            .and_then(|b| b.text)
            .ok_or_else(|| ModelError::SchemaViolation("empty content block".into()))
    }

    async fn post_embedding_batch(&self, texts: &[String], model: &str) -> Result<Vec<Vec<f32>>, ModelError> {
        let body = serde_json::json!({ "model": model, "input": texts });
        let response = self
            .client
            .post(&self.embedding_endpoint)
            .header("x-api-key", &self.api_key)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| ModelError::Transient(e.to_string()))?;

        let status = response.status();
        if status.as_u16() == 429 || status.is_server_error() {
            let text = response.text().await.unwrap_or_default();
            return Err(ModelError::Transient(format!("status {status}: {text}")));
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ModelError::Permanent(text));
        }

        let parsed: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| ModelError::Transient(e.to_string()))?;

        if parsed.embeddings.len() != texts.len() {
            return Err(ModelError::SchemaViolation(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                parsed.embeddings.len()
            )));
        }
        Ok(parsed.embeddings)
    }
}

#[async_trait]
impl ModelClient for AnthropicModelClient {
    async fn complete(
        &self,
        prompt: &str,
        system: &str,
        schema: Schema,
        budget: Duration,
    ) -> Result<Value, ModelError> {
        let text = self
            .call_with_retry(|| self.post_chat(prompt, system, budget))
            .await?;

        let text = strip_json_fences(&text);
        let value: Value = serde_json::from_str(text)
            .map_err(|e| ModelError::SchemaViolation(format!("{}: {e}", schema.name())))?;

        debug!(schema = schema.name(), "model completion parsed");
        Ok(value)
    }

    async fn embed(&self, texts: &[String], model: &str) -> Result<Vec<Vec<f32>>, ModelError> {
        let mut uncached_indices = Vec::new();
        let mut out: Vec<Option<Vec<f32>>> = Vec::with_capacity(texts.len());
        let mut keys = Vec::with_capacity(texts.len());

        for (i, text) in texts.iter().enumerate() {
            let key = cache_key(text, model);
            if let Some(hit) = self.cache.get(&key) {
                out.push(Some(hit));
            } else {
                out.push(None);
                uncached_indices.push(i);
            }
            keys.push(key);
        }

        for batch in uncached_indices.chunks(self.embedding_batch_size) {
            let batch_texts: Vec<String> = batch.iter().map(|&i| texts[i].clone()).collect();
            for (offset, &i) in batch.iter().enumerate() {
                let key = keys[i].clone();
                let text = batch_texts[offset].clone();
                let model = model.to_string();
                let client = self.client.clone();
                let api_key = self.api_key.clone();
                let endpoint = self.embedding_endpoint.clone();
                let retry = self.retry.clone();
                let vector = self
                    .cache
                    .get_or_compute(key, async move {
                        let mut last_error = None;
                        for attempt in 0..retry.max_attempts {
                            if attempt > 0 {
                                tokio::time::sleep(retry.delay_for(attempt - 1)).await;
                            }
                            let body = serde_json::json!({ "model": model, "input": [text.clone()] });
                            let resp = client
                                .post(&endpoint)
                                .header("x-api-key", &api_key)
                                .header("content-type", "application/json")
                                .json(&body)
                                .send()
                                .await;
                            let resp = match resp {
                                Ok(r) => r,
                                Err(e) => {
                                    last_error = Some(ModelError::Transient(e.to_string()));
                                    continue;
                                }
                            };
                            let status = resp.status();
                            if status.as_u16() == 429 || status.is_server_error() {
                                last_error = Some(ModelError::Transient(format!("status {status}")));
                                continue;
                            }
                            if !status.is_success() {
                                let text = resp.text().await.unwrap_or_default();
                                return Err(ModelError::Permanent(text));
                            }
                            let parsed: EmbeddingResponse = match resp.json().await {
                                Ok(p) => p,
                                Err(e) => return Err(ModelError::SchemaViolation(e.to_string())),
                            };
                            return parsed
                                .embeddings
                                .into_iter()
                                .next()
                                .ok_or_else(|| ModelError::SchemaViolation("empty embedding batch".into()));
                        }
                        Err(last_error.unwrap_or(ModelError::RateLimited {
                            attempts: retry.max_attempts,
                        }))
                    })
                    .await?;
                out[i] = Some(vector);
            }
        }

        Ok(out.into_iter().map(|v| v.expect("every index filled")).collect())
    }
}

/// Strips ```json ... ``` or ``` ... ``` code fences from model output.
fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    if let Some(stripped) = text.strip_prefix("```json") {
        stripped.trim_start().strip_suffix("```").map(|s| s.trim()).unwrap_or(stripped.trim_start())
    } else if let Some(stripped) = text.strip_prefix("```") {
        stripped.trim_start().strip_suffix("```").map(|s| s.trim()).unwrap_or(stripped.trim_start())
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_json_fences_with_json_tag() {
        assert_eq!(strip_json_fences("```json\n{\"a\":1}\n```"), "{\"a\":1}");
    }

    #[test]
    fn test_strip_json_fences_no_fences() {
        assert_eq!(strip_json_fences("{\"a\":1}"), "{\"a\":1}");
    }

    #[test]
    fn test_retry_policy_delay_is_exponential_and_capped() {
        let policy = RetryPolicy {
            max_attempts: 5,
            initial_wait: Duration::from_millis(1000),
            max_wait: Duration::from_millis(5000),
        };
        assert_eq!(policy.delay_for(0), Duration::from_millis(1000));
        assert_eq!(policy.delay_for(1), Duration::from_millis(2000));
        assert_eq!(policy.delay_for(2), Duration::from_millis(4000));
        assert_eq!(policy.delay_for(3), Duration::from_millis(5000));
    }
}
