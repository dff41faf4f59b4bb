//! Queue payload shapes (spec §6). All are at-least-once; handlers must be
//! idempotent keyed by `job_id`/`resume_id`.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JdPayload {
    pub job_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResumePayload {
    pub resume_id: Uuid,
    pub job_id: Uuid,
    pub file_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankParentPayload {
    pub job_id: Uuid,
    pub total_batches: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankChildPayload {
    pub job_id: Uuid,
    pub batch_index: u32,
    pub score_result_ids: Vec<Uuid>,
}

/// Envelope carrying the broker's own at-least-once/retry bookkeeping
/// (spec §4.3: "up to 3 attempts with exponential backoff starting at 5s").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub payload: T,
    pub attempt: u32,
}

impl<T> Envelope<T> {
    pub fn first(payload: T) -> Self {
        Self { payload, attempt: 0 }
    }

    pub fn retry(self) -> Self {
        Self {
            payload: self.payload,
            attempt: self.attempt + 1,
        }
    }
}
