//! Admin surface (spec §6): create a job, enqueue its JD/resume/rank stages,
//! cancel it, and read back progress and scores. Thin wrappers over the
//! `Store`/`Broker`/orchestrator primitives — no business logic lives here.

use std::convert::Infallible;
use std::time::Duration;

use axum::extract::{Path, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::IntoResponse;
use axum::Json;
use futures::Stream;
use serde::{Deserialize, Serialize};
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;
use uuid::Uuid;

use crate::broker::payload::{JdPayload, RankParentPayload, ResumePayload};
use crate::errors::AppError;
use crate::models::job::JobStatus;
use crate::orchestrator;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateJobRequest {
    pub title: String,
    pub raw_jd_text: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct JobSummary {
    pub job_id: Uuid,
    pub title: String,
    pub status: String,
    pub error: Option<String>,
}

/// POST /api/v1/jobs
pub async fn create_job(State(state): State<AppState>, Json(req): Json<CreateJobRequest>) -> Result<Json<JobSummary>, AppError> {
    if req.title.trim().is_empty() {
        return Err(AppError::Validation("title must not be empty".to_string()));
    }
    let job = state.store.create_job(&req.title, req.raw_jd_text).await?;
    Ok(Json(JobSummary { job_id: job.job_id, title: job.title, status: job.status.as_str().to_string(), error: job.error }))
}

/// GET /api/v1/jobs/:job_id
pub async fn get_job(State(state): State<AppState>, Path(job_id): Path<Uuid>) -> Result<Json<JobSummary>, AppError> {
    let job = state.store.fetch_job(job_id).await?;
    Ok(Json(JobSummary { job_id: job.job_id, title: job.title, status: job.status.as_str().to_string(), error: job.error }))
}

/// POST /api/v1/jobs/:job_id/jd
///
/// Queues the JD stage (spec §4.5). The job must already carry source text
/// or a PDF reference (enforced by the pipeline itself on dequeue).
pub async fn enqueue_jd(State(state): State<AppState>, Path(job_id): Path<Uuid>) -> Result<Json<JobSummary>, AppError> {
    let job = state.store.fetch_job(job_id).await?;
    if job.locked {
        return Err(AppError::StoreConflict(format!("job {job_id} is locked")));
    }
    state.store.set_job_locked(job_id).await?;
    state.store.set_job_status(job_id, JobStatus::Queued.as_str(), None).await?;
    state.broker.enqueue_jd(JdPayload { job_id }).await?;
    let job = state.store.fetch_job(job_id).await?;
    Ok(Json(JobSummary { job_id: job.job_id, title: job.title, status: job.status.as_str().to_string(), error: job.error }))
}

#[derive(Debug, Deserialize)]
pub struct ResumeUpload {
    pub filename: String,
    pub raw_text: String,
}

#[derive(Debug, Deserialize)]
pub struct EnqueueResumesRequest {
    pub resumes: Vec<ResumeUpload>,
}

#[derive(Debug, Serialize)]
pub struct EnqueueResumesResponse {
    pub resume_ids: Vec<Uuid>,
}

/// POST /api/v1/jobs/:job_id/resumes
///
/// Batch resume intake (spec §4.6): creates one resume row per upload,
/// registers the completion flow used to trigger scoring, then enqueues
/// each resume individually so the resume worker pool can pick them up.
pub async fn enqueue_resumes(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
    Json(req): Json<EnqueueResumesRequest>,
) -> Result<Json<EnqueueResumesResponse>, AppError> {
    if req.resumes.is_empty() {
        return Err(AppError::Validation("resumes must not be empty".to_string()));
    }
    let filenames: Vec<String> = req.resumes.iter().map(|r| r.filename.clone()).collect();
    let resume_ids = orchestrator::enqueue_resumes(job_id, &filenames, state.store.as_ref(), state.broker.as_ref()).await?;

    for (resume_id, upload) in resume_ids.iter().zip(req.resumes.iter()) {
        state.store.set_resume_raw_text(*resume_id, &upload.raw_text).await?;
        state
            .broker
            .enqueue_resume(ResumePayload { resume_id: *resume_id, job_id, file_path: upload.filename.clone() })
            .await?;
    }

    Ok(Json(EnqueueResumesResponse { resume_ids }))
}

/// POST /api/v1/jobs/:job_id/rank
///
/// Manually (re-)triggers scoring and ranking for a job whose resumes are
/// already processed, without waiting on the resume completion flow.
pub async fn enqueue_rank(State(state): State<AppState>, Path(job_id): Path<Uuid>) -> Result<Json<JobSummary>, AppError> {
    state.broker.enqueue_rank_parent(RankParentPayload { job_id, total_batches: 1 }).await?;
    let job = state.store.fetch_job(job_id).await?;
    Ok(Json(JobSummary { job_id: job.job_id, title: job.title, status: job.status.as_str().to_string(), error: job.error }))
}

/// POST /api/v1/jobs/:job_id/cancel
///
/// Cancellation is cooperative (spec §4.10): marks the job cancelled at
/// both the durable broker layer and the in-process registry so a worker
/// already running this job observes it at its next stage boundary.
pub async fn cancel_job(State(state): State<AppState>, Path(job_id): Path<Uuid>) -> Result<impl IntoResponse, AppError> {
    state.broker.cancel_job(job_id).await?;
    state.cancellation.cancel(job_id);
    Ok(Json(serde_json::json!({ "job_id": job_id, "cancelled": true })))
}

/// GET /api/v1/jobs/:job_id/scores
pub async fn get_scores(State(state): State<AppState>, Path(job_id): Path<Uuid>) -> Result<impl IntoResponse, AppError> {
    let scores = state.store.fetch_scores_for_job(job_id).await?;
    Ok(Json(scores))
}

/// GET /api/v1/jobs/:job_id/progress
///
/// Server-sent events stream of `ProgressEvent`s (spec §4.4). A late
/// subscriber first receives a replay of the most recent event per stage.
pub async fn subscribe_progress(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.progress.subscribe(job_id);
    let stream = ReceiverStream::new(rx).map(|event| {
        let data = serde_json::to_string(&event).unwrap_or_else(|_| "{}".to_string());
        Ok(Event::default().event("progress").data(data))
    });
    Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)))
}
