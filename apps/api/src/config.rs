use std::collections::BTreeMap;
use std::time::Duration;

use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Panics at startup if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub redis_url: String,
    pub anthropic_api_key: String,
    pub embedding_endpoint: String,
    pub port: u16,
    pub rust_log: String,

    // Scoring/embedding surface (spec §6)
    pub embedding_model: String,
    pub embedding_dim: usize,
    pub sentence_min_chars: usize,
    pub similarity_tau_coverage: f64,
    pub similarity_tau_alignment: f64,
    pub score_weights: Option<BTreeMap<String, f64>>,
    pub rerank_batch_size: usize,
    pub rerank_enabled: bool,
    pub embedding_batch_size: usize,

    // Retry / circuit breaker (spec §6, §4.1)
    pub max_attempts: u32,
    pub initial_wait_ms: u64,
    pub max_wait_ms: u64,
    pub circuit_threshold: u32,
    pub circuit_cooldown_ms: u64,

    // Broker concurrency (spec §4.3)
    pub jd_queue_concurrency: usize,
    pub resume_queue_concurrency: usize,
    pub rank_queue_concurrency: usize,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            redis_url: require_env("REDIS_URL")?,
            anthropic_api_key: require_env("ANTHROPIC_API_KEY")?,
            embedding_endpoint: std::env::var("EMBEDDING_ENDPOINT")
                .unwrap_or_else(|_| "https://api.anthropic.com/v1/embeddings".to_string()),
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),

            embedding_model: std::env::var("EMBEDDING_MODEL")
                .unwrap_or_else(|_| "text-embedding-3-large".to_string()),
            embedding_dim: env_parse_default("EMBEDDING_DIM", 1536)?,
            sentence_min_chars: env_parse_default("SENTENCE_MIN_CHARS", 3)?,
            similarity_tau_coverage: env_parse_default("SIMILARITY_TAU_COVERAGE", 0.65)?,
            similarity_tau_alignment: env_parse_default("SIMILARITY_TAU_ALIGNMENT", 0.55)?,
            score_weights: match std::env::var("SCORE_WEIGHTS") {
                Ok(raw) => Some(
                    serde_json::from_str(&raw).context("SCORE_WEIGHTS must be a JSON object")?,
                ),
                Err(_) => None,
            },
            rerank_batch_size: env_parse_default("RERANK_BATCH_SIZE", 30)?,
            rerank_enabled: env_parse_default("RERANK_ENABLED", true)?,
            embedding_batch_size: env_parse_default("EMBEDDING_BATCH_SIZE", 256)?,

            max_attempts: env_parse_default("MAX_ATTEMPTS", 3)?,
            initial_wait_ms: env_parse_default("INITIAL_WAIT_MS", 1000)?,
            max_wait_ms: env_parse_default("MAX_WAIT_MS", 30_000)?,
            circuit_threshold: env_parse_default("CIRCUIT_THRESHOLD", 5)?,
            circuit_cooldown_ms: env_parse_default("CIRCUIT_COOLDOWN_MS", 60_000)?,

            jd_queue_concurrency: env_parse_default("JD_QUEUE_CONCURRENCY", 2)?,
            resume_queue_concurrency: env_parse_default("RESUME_QUEUE_CONCURRENCY", 5)?,
            rank_queue_concurrency: env_parse_default("RANK_QUEUE_CONCURRENCY", 1)?,
        })
    }

    pub fn initial_wait(&self) -> Duration {
        Duration::from_millis(self.initial_wait_ms)
    }

    pub fn max_wait(&self) -> Duration {
        Duration::from_millis(self.max_wait_ms)
    }

    pub fn circuit_cooldown(&self) -> Duration {
        Duration::from_millis(self.circuit_cooldown_ms)
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn env_parse_default<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("{key} has an invalid value: {e}")),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_parse_default_falls_back_when_unset() {
        std::env::remove_var("TOTALLY_UNUSED_CONFIG_KEY_FOR_TEST");
        let v: u32 = env_parse_default("TOTALLY_UNUSED_CONFIG_KEY_FOR_TEST", 7).unwrap();
        assert_eq!(v, 7);
    }
}
