//! Redis-backed `Broker`: lists for queue storage, a hash for per-job
//! progress/result, and simple keys for flow counters and cancellation.

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::errors::AppError;

use super::payload::{Envelope, JdPayload, RankChildPayload, RankParentPayload, ResumePayload};
use super::{Broker, FlowStatus, QueueName};

fn queue_key(queue: QueueName) -> String {
    format!("ranker:queue:{}", queue.as_str())
}

fn cancel_key(job_id: Uuid) -> String {
    format!("ranker:cancel:{job_id}")
}

fn flow_key(job_id: Uuid) -> String {
    format!("ranker:flow:{job_id}")
}

fn progress_key(job_id: Uuid) -> String {
    format!("ranker:progress:{job_id}")
}

pub struct RedisBroker {
    /// Shared connection for the non-blocking ops (push/hash/key commands).
    conn: Mutex<MultiplexedConnection>,
    /// Kept to hand out a fresh connection per blocking `BRPOP` call so a
    /// long poll never holds `conn`'s mutex and starves the other ops
    /// (spec §4.3/§5: per-queue concurrency and progress latency must not
    /// degrade because one worker happens to be mid-poll).
    client: redis::Client,
}

impl RedisBroker {
    pub async fn new(client: &redis::Client) -> Result<Self, AppError> {
        let conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| AppError::BrokerFailure(e.to_string()))?;
        Ok(Self { conn: Mutex::new(conn), client: client.clone() })
    }

    async fn push<T: serde::Serialize>(&self, queue: QueueName, envelope: &Envelope<T>) -> Result<(), AppError> {
        let body = serde_json::to_string(envelope).map_err(|e| AppError::Internal(e.into()))?;
        let mut conn = self.conn.lock().await;
        conn.lpush::<_, _, ()>(queue_key(queue), body)
            .await
            .map_err(|e| AppError::BrokerFailure(e.to_string()))
    }

    /// `BRPOP` with a timeout so a worker loop can periodically re-check
    /// cancellation/shutdown rather than block forever on an empty queue.
    /// Opens its own connection rather than taking `self.conn`'s lock: a
    /// blocking command on the shared multiplexed connection would otherwise
    /// serialize every other broker call (dequeues on other queues,
    /// `update_progress`, `complete_child`, `is_cancelled`) behind the poll
    /// timeout.
    async fn pop<T: DeserializeOwned>(
        &self,
        queue: QueueName,
        timeout_secs: u64,
    ) -> Result<Option<Envelope<T>>, AppError> {
        let mut conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| AppError::BrokerFailure(e.to_string()))?;
        let reply: Option<(String, String)> = conn
            .brpop(queue_key(queue), timeout_secs as f64)
            .await
            .map_err(|e| AppError::BrokerFailure(e.to_string()))?;
        drop(conn);
        match reply {
            Some((_, body)) => {
                let envelope: Envelope<T> = serde_json::from_str(&body)
                    .map_err(|e| AppError::SchemaViolation(format!("queue envelope: {e}")))?;
                Ok(Some(envelope))
            }
            None => Ok(None),
        }
    }
}

#[async_trait]
impl Broker for RedisBroker {
    async fn enqueue_jd(&self, payload: JdPayload) -> Result<(), AppError> {
        self.push(QueueName::Jd, &Envelope::first(payload)).await
    }

    async fn enqueue_resume(&self, payload: ResumePayload) -> Result<(), AppError> {
        self.push(QueueName::Resume, &Envelope::first(payload)).await
    }

    async fn enqueue_rank_parent(&self, payload: RankParentPayload) -> Result<(), AppError> {
        self.push(QueueName::Rank, &Envelope::first(payload)).await
    }

    async fn enqueue_rank_child(&self, payload: RankChildPayload) -> Result<(), AppError> {
        self.push(QueueName::Rank, &Envelope::first(payload)).await
    }

    async fn dequeue_jd(&self, timeout_secs: u64) -> Result<Option<Envelope<JdPayload>>, AppError> {
        self.pop(QueueName::Jd, timeout_secs).await
    }

    async fn dequeue_resume(&self, timeout_secs: u64) -> Result<Option<Envelope<ResumePayload>>, AppError> {
        self.pop(QueueName::Resume, timeout_secs).await
    }

    async fn dequeue_rank(&self, timeout_secs: u64) -> Result<Option<Envelope<RankParentPayload>>, AppError> {
        self.pop(QueueName::Rank, timeout_secs).await
    }

    async fn requeue_jd(&self, envelope: Envelope<JdPayload>) -> Result<(), AppError> {
        self.push(QueueName::Jd, &envelope).await
    }

    async fn requeue_resume(&self, envelope: Envelope<ResumePayload>) -> Result<(), AppError> {
        self.push(QueueName::Resume, &envelope).await
    }

    async fn register_flow(&self, parent_job_id: Uuid, total_children: u32) -> Result<(), AppError> {
        let mut conn = self.conn.lock().await;
        conn.hset_multiple::<_, _, _, ()>(
            flow_key(parent_job_id),
            &[("total", total_children), ("completed", 0)],
        )
        .await
        .map_err(|e| AppError::BrokerFailure(e.to_string()))
    }

    async fn complete_child(&self, parent_job_id: Uuid) -> Result<FlowStatus, AppError> {
        let mut conn = self.conn.lock().await;
        let completed: u32 = conn
            .hincr(flow_key(parent_job_id), "completed", 1i64)
            .await
            .map_err(|e| AppError::BrokerFailure(e.to_string()))?;
        let total: u32 = conn
            .hget(flow_key(parent_job_id), "total")
            .await
            .map_err(|e| AppError::BrokerFailure(e.to_string()))?;
        if completed >= total {
            Ok(FlowStatus::ParentComplete)
        } else {
            Ok(FlowStatus::Pending { completed, total })
        }
    }

    async fn update_progress(&self, job_id: Uuid, percent: u8, stage: &str, message: &str) -> Result<(), AppError> {
        let mut conn = self.conn.lock().await;
        let key = progress_key(job_id);
        let previous: Option<u8> = conn
            .hget(&key, "percent")
            .await
            .map_err(|e| AppError::BrokerFailure(e.to_string()))?;
        if let Some(prev) = previous {
            if percent < prev {
                // Monotonic guarantee (spec §4.3): silently drop a regression
                // rather than surface an error to the caller's stage logic.
                return Ok(());
            }
        }
        conn.hset_multiple::<_, _, _, ()>(
            &key,
            &[("percent", percent.to_string()), ("stage", stage.to_string()), ("message", message.to_string())],
        )
        .await
        .map_err(|e| AppError::BrokerFailure(e.to_string()))
    }

    async fn cancel_job(&self, job_id: Uuid) -> Result<(), AppError> {
        let mut conn = self.conn.lock().await;
        conn.set_ex::<_, _, ()>(cancel_key(job_id), true, 86_400)
            .await
            .map_err(|e| AppError::BrokerFailure(e.to_string()))
    }

    async fn is_cancelled(&self, job_id: Uuid) -> Result<bool, AppError> {
        let mut conn = self.conn.lock().await;
        conn.exists(cancel_key(job_id))
            .await
            .map_err(|e| AppError::BrokerFailure(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queue_key_is_namespaced_per_queue() {
        assert_eq!(queue_key(QueueName::Jd), "ranker:queue:jd");
        assert_eq!(queue_key(QueueName::Resume), "ranker:queue:resume");
        assert_eq!(queue_key(QueueName::Rank), "ranker:queue:rank");
    }

    #[test]
    fn test_default_concurrency_matches_contract() {
        assert_eq!(QueueName::Jd.default_concurrency(), 2);
        assert_eq!(QueueName::Resume.default_concurrency(), 5);
        assert_eq!(QueueName::Rank.default_concurrency(), 1);
    }
}
