//! Broker (C3): named work queues with child-flow semantics, progress
//! updates, and retries (spec §4.3).

pub mod payload;
pub mod redis_broker;

use async_trait::async_trait;
use uuid::Uuid;

use crate::errors::AppError;
use payload::{Envelope, JdPayload, RankChildPayload, RankParentPayload, ResumePayload};

pub use redis_broker::RedisBroker;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueName {
    Jd,
    Resume,
    Rank,
}

impl QueueName {
    pub fn as_str(self) -> &'static str {
        match self {
            QueueName::Jd => "jd",
            QueueName::Resume => "resume",
            QueueName::Rank => "rank",
        }
    }

    /// Per-queue concurrency contract (spec §4.3: jd=2, resume=5, rank=1).
    pub fn default_concurrency(self) -> usize {
        match self {
            QueueName::Jd => 2,
            QueueName::Resume => 5,
            QueueName::Rank => 1,
        }
    }
}

/// Outcome of a child completing within a parent/child flow (spec §4.3,
/// §GLOSSARY "Flow").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowStatus {
    /// Siblings remain outstanding.
    Pending { completed: u32, total: u32 },
    /// This was the last child; the parent may now complete.
    ParentComplete,
}

#[async_trait]
pub trait Broker: Send + Sync {
    async fn enqueue_jd(&self, payload: JdPayload) -> Result<(), AppError>;
    async fn enqueue_resume(&self, payload: ResumePayload) -> Result<(), AppError>;
    async fn enqueue_rank_parent(&self, payload: RankParentPayload) -> Result<(), AppError>;
    async fn enqueue_rank_child(&self, payload: RankChildPayload) -> Result<(), AppError>;

    /// Blocking pop with a timeout; `Ok(None)` on timeout (no work available),
    /// letting a worker loop re-check cancellation/shutdown between polls.
    async fn dequeue_jd(&self, timeout_secs: u64) -> Result<Option<Envelope<JdPayload>>, AppError>;
    async fn dequeue_resume(&self, timeout_secs: u64) -> Result<Option<Envelope<ResumePayload>>, AppError>;
    async fn dequeue_rank(&self, timeout_secs: u64) -> Result<Option<Envelope<RankParentPayload>>, AppError>;

    /// Re-enqueues a job with its `attempt` counter already incremented by
    /// the caller (spec §4.3: up to 3 attempts, backoff starting at 5s).
    async fn requeue_jd(&self, envelope: Envelope<JdPayload>) -> Result<(), AppError>;
    async fn requeue_resume(&self, envelope: Envelope<ResumePayload>) -> Result<(), AppError>;

    /// Registers a flow's expected child count before children are enqueued,
    /// so an out-of-order completion can never be read as "all done" early.
    async fn register_flow(&self, parent_job_id: Uuid, total_children: u32) -> Result<(), AppError>;
    async fn complete_child(&self, parent_job_id: Uuid) -> Result<FlowStatus, AppError>;

    /// §4.3: percent must be monotonic non-decreasing within one job
    /// execution; implementations should no-op (not error) on a regression.
    async fn update_progress(&self, job_id: Uuid, percent: u8, stage: &str, message: &str) -> Result<(), AppError>;

    async fn cancel_job(&self, job_id: Uuid) -> Result<(), AppError>;
    async fn is_cancelled(&self, job_id: Uuid) -> Result<bool, AppError>;
}
