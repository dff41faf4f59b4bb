//! Queue-driven worker loops (spec §9: "Thread-pool parallelism of the
//! source... replaced by queue-driven workers. No in-process fan-out is
//! required; parallelism is expressed at the broker level").
//!
//! Each loop blocks on `Broker::dequeue_*` with a short poll timeout so it
//! can keep coming back even when the queue is empty, runs the relevant
//! pipeline stage, and requeues on a retryable failure per spec §4.3 ("up
//! to 3 attempts with exponential backoff starting at 5s").

use std::time::Duration;

use tracing::{error, warn};

use crate::broker::payload::{Envelope, JdPayload, RankParentPayload, ResumePayload};
use crate::errors::AppError;
use crate::state::AppState;

use super::{run_jd, run_resume, score_and_rank};

const POLL_TIMEOUT_SECS: u64 = 5;
const RETRY_BASE_DELAY: Duration = Duration::from_secs(5);

fn is_retryable(error: &AppError) -> bool {
    matches!(
        error,
        AppError::Transient(_) | AppError::RateLimited(_) | AppError::BrokerFailure(_) | AppError::DeadlineExceeded(_) | AppError::StoreConflict(_)
    )
}

fn backoff_for(attempt: u32) -> Duration {
    let scaled = RETRY_BASE_DELAY.as_secs().saturating_mul(1u64 << attempt.min(4));
    Duration::from_secs(scaled.min(60))
}

pub fn spawn_jd_workers(state: AppState, count: usize) {
    for worker_id in 0..count.max(1) {
        let state = state.clone();
        tokio::spawn(async move {
            loop {
                match state.broker.dequeue_jd(POLL_TIMEOUT_SECS).await {
                    Ok(Some(envelope)) => run_one_jd(&state, envelope).await,
                    Ok(None) => continue,
                    Err(e) => {
                        warn!(worker_id, error = %e, "jd worker dequeue failed, backing off");
                        tokio::time::sleep(Duration::from_secs(1)).await;
                    }
                }
            }
        });
    }
}

pub fn spawn_resume_workers(state: AppState, count: usize) {
    for worker_id in 0..count.max(1) {
        let state = state.clone();
        tokio::spawn(async move {
            loop {
                match state.broker.dequeue_resume(POLL_TIMEOUT_SECS).await {
                    Ok(Some(envelope)) => run_one_resume(&state, envelope).await,
                    Ok(None) => continue,
                    Err(e) => {
                        warn!(worker_id, error = %e, "resume worker dequeue failed, backing off");
                        tokio::time::sleep(Duration::from_secs(1)).await;
                    }
                }
            }
        });
    }
}

pub fn spawn_rank_workers(state: AppState, count: usize) {
    for worker_id in 0..count.max(1) {
        let state = state.clone();
        tokio::spawn(async move {
            loop {
                match state.broker.dequeue_rank(POLL_TIMEOUT_SECS).await {
                    Ok(Some(envelope)) => run_one_rank(&state, envelope).await,
                    Ok(None) => continue,
                    Err(e) => {
                        warn!(worker_id, error = %e, "rank worker dequeue failed, backing off");
                        tokio::time::sleep(Duration::from_secs(1)).await;
                    }
                }
            }
        });
    }
}

async fn run_one_jd(state: &AppState, envelope: Envelope<JdPayload>) {
    let job_id = envelope.payload.job_id;
    let result = run_jd(
        job_id,
        state.store.as_ref(),
        state.broker.as_ref(),
        &state.progress,
        state.model_client.as_ref(),
        &state.config,
        &state.cancellation,
    )
    .await;

    if let Err(e) = result {
        if is_retryable(&e) && envelope.attempt + 1 < state.config.max_attempts {
            let delay = backoff_for(envelope.attempt);
            warn!(%job_id, attempt = envelope.attempt, error = %e, "jd stage failed, requeueing");
            tokio::time::sleep(delay).await;
            if let Err(re) = state.broker.requeue_jd(envelope.retry()).await {
                error!(%job_id, error = %re, "failed to requeue jd job");
            }
        } else {
            error!(%job_id, error = %e, "jd stage failed terminally");
        }
    }
}

async fn run_one_resume(state: &AppState, envelope: Envelope<ResumePayload>) {
    let resume_id = envelope.payload.resume_id;
    let job_id = envelope.payload.job_id;
    let result = run_resume(
        resume_id,
        job_id,
        state.store.as_ref(),
        state.broker.as_ref(),
        &state.progress,
        state.model_client.as_ref(),
        &state.config,
        &state.cancellation,
    )
    .await;

    if let Err(e) = result {
        if is_retryable(&e) && envelope.attempt + 1 < state.config.max_attempts {
            let delay = backoff_for(envelope.attempt);
            warn!(%resume_id, %job_id, attempt = envelope.attempt, error = %e, "resume stage failed, requeueing");
            tokio::time::sleep(delay).await;
            if let Err(re) = state.broker.requeue_resume(envelope.retry()).await {
                error!(%resume_id, error = %re, "failed to requeue resume job");
            }
        } else {
            error!(%resume_id, %job_id, error = %e, "resume stage failed terminally, excluded from scoring");
        }
    }
}

async fn run_one_rank(state: &AppState, envelope: Envelope<RankParentPayload>) {
    let job_id = envelope.payload.job_id;
    if let Err(e) = score_and_rank(
        job_id,
        state.store.as_ref(),
        state.broker.as_ref(),
        &state.progress,
        state.model_client.as_ref(),
        &state.config,
        &state.cancellation,
    )
    .await
    {
        warn!(%job_id, error = %e, "manual rank re-run failed");
    }
}
