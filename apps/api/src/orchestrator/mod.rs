//! Orchestrator (C10): drives one job through
//! JDPipeline → ComplianceFilter → ResumePipeline → Scorer → Ranker,
//! with cooperative cancellation checked at stage boundaries (spec §4.10).
//!
//! State machine (spec §4.10):
//! `draft → queued-jd → parsing-jd → embedding-jd → compliance-parsed →
//! jd-ready → queued-resumes → processing-resumes(n/N) → filtered →
//! scoring → scored → ranking → completed`
//!
//! A failed JD terminates the job. A failed resume does not; it is excluded
//! from scoring and reported in the final result.

pub mod workers;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use dashmap::DashMap;
use tokio_util::sync::CancellationToken;
use tracing::warn;
use uuid::Uuid;

use crate::broker::{Broker, FlowStatus};
use crate::compliance;
use crate::config::Config;
use crate::errors::AppError;
use crate::jd;
use crate::model_client::ModelClient;
use crate::models::job::JobStatus;
use crate::models::resume::{ParsedContent, StageStatus};
use crate::models::score::ScoreResult;
use crate::progress::{EventKind, ProgressEvent, ProgressHub};
use crate::ranking;
use crate::resume;
use crate::scoring;
use crate::store::Store;

const RERANK_DEADLINE: Duration = Duration::from_secs(60);

/// Per-job cooperative cancellation tokens, owned rather than ambient global
/// state (spec §9 redesign). In-flight model calls are allowed to finish;
/// the token is only observed between stages.
#[derive(Default, Clone)]
pub struct CancellationRegistry {
    tokens: Arc<DashMap<Uuid, CancellationToken>>,
}

impl CancellationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn token_for(&self, job_id: Uuid) -> CancellationToken {
        self.tokens.entry(job_id).or_insert_with(CancellationToken::new).clone()
    }

    pub fn cancel(&self, job_id: Uuid) {
        if let Some(token) = self.tokens.get(&job_id) {
            token.cancel();
        }
    }

    pub fn clear(&self, job_id: Uuid) {
        self.tokens.remove(&job_id);
    }
}

async fn publish(progress: &ProgressHub, job_id: Uuid, kind: EventKind, percent: u8, stage: &str, message: &str) {
    progress.publish(
        job_id,
        ProgressEvent {
            kind,
            job_id,
            percent,
            stage: stage.to_string(),
            message: message.to_string(),
            timestamp: Utc::now(),
        },
    );
}

/// Runs the JD stage for a job (spec §4.5, driven as C5 from the FSM).
pub async fn run_jd(
    job_id: Uuid,
    store: &dyn Store,
    broker: &dyn Broker,
    progress: &ProgressHub,
    model_client: &dyn ModelClient,
    config: &Config,
    cancellation: &CancellationRegistry,
) -> Result<(), AppError> {
    if cancellation.token_for(job_id).is_cancelled() {
        return Err(AppError::CancelRequested);
    }
    jd::pipeline::run(job_id, store, broker, progress, model_client, config).await
}

/// Creates resume rows for a job and registers the completion flow so the
/// last resume to finish can trigger scoring (spec §4.3 parent/child flow).
pub async fn enqueue_resumes(
    job_id: Uuid,
    filenames: &[String],
    store: &dyn Store,
    broker: &dyn Broker,
) -> Result<Vec<Uuid>, AppError> {
    let mut resume_ids = Vec::with_capacity(filenames.len());
    for filename in filenames {
        let resume = store.create_resume(job_id, filename).await?;
        resume_ids.push(resume.resume_id);
    }
    broker.register_flow(job_id, resume_ids.len() as u32).await?;
    Ok(resume_ids)
}

/// Runs one resume's pipeline, then records its completion against the
/// job's flow. A resume-level failure is logged and excluded from scoring,
/// never propagated as a job failure.
pub async fn run_resume(
    resume_id: Uuid,
    job_id: Uuid,
    store: &dyn Store,
    broker: &dyn Broker,
    progress: &ProgressHub,
    model_client: &dyn ModelClient,
    config: &Config,
    cancellation: &CancellationRegistry,
) -> Result<(), AppError> {
    if cancellation.token_for(job_id).is_cancelled() {
        broker.complete_child(job_id).await?;
        return Err(AppError::CancelRequested);
    }

    let job = store.fetch_job(job_id).await?;
    if let Err(e) = resume::pipeline::run(resume_id, &job, store, broker, progress, model_client, config).await {
        warn!(%resume_id, %job_id, error = %e, "resume pipeline failed, excluding from scoring");
    }

    match broker.complete_child(job_id).await? {
        FlowStatus::Pending { completed, total } => {
            let percent = ((completed as f64 / total.max(1) as f64) * 60.0) as u8 + 20;
            publish(
                progress,
                job_id,
                EventKind::Progress,
                percent.min(79),
                "processing-resumes",
                &format!("{completed}/{total} resumes processed"),
            )
            .await;
            Ok(())
        }
        FlowStatus::ParentComplete => {
            publish(progress, job_id, EventKind::Progress, 80, "filtered", "all resumes processed, scoring").await;
            score_and_rank(job_id, store, broker, progress, model_client, config, cancellation).await
        }
    }
}

/// Scores every compliant, fully-embedded resume against the job and runs
/// the ranker (spec §4.8, §4.9).
pub async fn score_and_rank(
    job_id: Uuid,
    store: &dyn Store,
    broker: &dyn Broker,
    progress: &ProgressHub,
    model_client: &dyn ModelClient,
    config: &Config,
    cancellation: &CancellationRegistry,
) -> Result<(), AppError> {
    if cancellation.token_for(job_id).is_cancelled() || broker.is_cancelled(job_id).await? {
        return Err(AppError::CancelRequested);
    }

    let job = store.fetch_job(job_id).await?;
    let jd_analysis = job
        .jd_analysis
        .clone()
        .ok_or_else(|| AppError::UnprocessableEntity("jd analysis not available".to_string()))?;
    let jd_embeddings = job
        .jd_embeddings
        .clone()
        .ok_or_else(|| AppError::UnprocessableEntity("jd embeddings not available".to_string()))?;

    publish(progress, job_id, EventKind::Progress, 82, "scoring", "computing candidate scores").await;

    let resumes = store.fetch_resumes_for_job(job_id).await?;

    let mut raw_scores: BTreeMap<Uuid, (f64, f64, f64)> = BTreeMap::new();
    let mut compliance_results: BTreeMap<Uuid, crate::models::requirement::ComplianceResult> = BTreeMap::new();
    let mut parsed_by_resume: BTreeMap<Uuid, ParsedContent> = BTreeMap::new();

    for r in &resumes {
        if r.embedding_status != StageStatus::Success {
            continue;
        }
        let (Some(parsed), Some(embeddings)) = (&r.parsed_content, &r.resume_embeddings) else {
            continue;
        };
        let compliance_result = compliance::evaluate(parsed, &job.filter_requirements);
        let primitives = scoring::compute_primitives(
            &jd_analysis,
            parsed,
            &compliance_result,
            &jd_embeddings,
            embeddings,
            config.similarity_tau_coverage,
            config.similarity_tau_alignment,
            config.score_weights.as_ref(),
        );
        raw_scores.insert(r.resume_id, (primitives.project_score, primitives.keyword_score, primitives.raw_semantic_score));
        compliance_results.insert(r.resume_id, compliance_result);
        parsed_by_resume.insert(r.resume_id, parsed.clone());
    }

    let ids: Vec<Uuid> = raw_scores.keys().copied().collect();
    let raw_semantic_values: Vec<f64> = ids.iter().map(|id| raw_scores[id].2).collect();
    let normalized_semantic = scoring::semantic::normalize_batch(&raw_semantic_values);

    let mut score_results = Vec::with_capacity(ids.len());
    for (idx, id) in ids.iter().enumerate() {
        let (project, keyword, _raw_semantic) = raw_scores[id];
        let semantic = normalized_semantic[idx];
        let final_score = scoring::final_score(project, semantic, keyword);
        let compliance_result = compliance_results.remove(id).expect("present for every scored resume");
        let score_result = ScoreResult {
            job_id,
            resume_id: *id,
            project_score: project,
            keyword_score: keyword,
            semantic_score: semantic,
            final_score,
            llm_rerank_score: None,
            compliance: compliance_result,
            rank: None,
            adjusted_score: None,
        };
        store.upsert_score_result(score_result.clone()).await?;
        score_results.push(score_result);
    }

    publish(progress, job_id, EventKind::Progress, 90, "scored", "ranking candidates").await;

    if cancellation.token_for(job_id).is_cancelled() {
        return Err(AppError::CancelRequested);
    }

    let ranked = ranking::rank(
        score_results,
        &parsed_by_resume,
        &jd_analysis,
        &job.filter_requirements,
        model_client,
        config.rerank_enabled,
        config.rerank_batch_size,
        RERANK_DEADLINE,
    )
    .await;

    for result in &ranked {
        store.upsert_score_result(result.clone()).await?;
    }

    store.set_job_status(job_id, JobStatus::Completed.as_str(), None).await?;
    publish(progress, job_id, EventKind::Complete, 100, "completed", "ranking complete").await;
    cancellation.clear(job_id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancellation_registry_reuses_token_for_same_job() {
        let registry = CancellationRegistry::new();
        let job_id = Uuid::new_v4();
        let a = registry.token_for(job_id);
        let b = registry.token_for(job_id);
        registry.cancel(job_id);
        assert!(a.is_cancelled());
        assert!(b.is_cancelled());
    }

    #[test]
    fn test_clear_drops_token_so_a_later_job_starts_fresh() {
        let registry = CancellationRegistry::new();
        let job_id = Uuid::new_v4();
        registry.cancel(job_id);
        registry.clear(job_id);
        let fresh = registry.token_for(job_id);
        assert!(!fresh.is_cancelled());
    }
}
