//! ResumePipeline (C6): extract/parse/embed/persist stages, idempotent per
//! stage so an at-least-once redelivery never redoes finished work
//! (spec §4.6).

use std::time::Duration;

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::broker::Broker;
use crate::config::Config;
use crate::errors::AppError;
use crate::model_client::ModelClient;
use crate::models::embedding::{normalize_unit, Section, SectionEmbeddings};
use crate::models::job::Job;
use crate::models::resume::{ParsedContent, StageStatus};
use crate::models::text::split_sentences;
use crate::progress::{EventKind, ProgressEvent, ProgressHub};
use crate::store::{ResumeStageField, Store};

use super::parser;

const CHAT_DEADLINE: Duration = Duration::from_secs(60);

async fn report(progress: &ProgressHub, broker: &dyn Broker, job_id: Uuid, percent: u8, stage: &str, message: &str) {
    if let Err(e) = broker.update_progress(job_id, percent, stage, message).await {
        warn!(error = %e, job_id = %job_id, "failed to persist resume progress");
    }
    progress.publish(
        job_id,
        ProgressEvent {
            kind: EventKind::Progress,
            job_id,
            percent,
            stage: stage.to_string(),
            message: message.to_string(),
            timestamp: Utc::now(),
        },
    );
}

async fn embed_section(
    embeddings: &mut SectionEmbeddings,
    section: Section,
    text: &str,
    model_client: &dyn ModelClient,
    model: &str,
    min_chars: usize,
) -> Result<(), AppError> {
    let sentences = split_sentences(text, min_chars);
    if sentences.is_empty() {
        return Ok(());
    }
    let mut vectors = model_client.embed(&sentences, model).await?;
    for v in vectors.iter_mut() {
        normalize_unit(v);
    }
    embeddings.insert(section, vectors);
    Ok(())
}

async fn embed_resume(
    model_client: &dyn ModelClient,
    parsed: &ParsedContent,
    raw_text: &str,
    model: &str,
    min_chars: usize,
) -> Result<SectionEmbeddings, AppError> {
    let mut embeddings = SectionEmbeddings::new();

    let profile_text = format!(
        "{}. {} years of experience. {}",
        parsed.candidate_name.as_deref().unwrap_or(""),
        parsed.years_experience.map(|y| y.to_string()).unwrap_or_default(),
        parsed.location.as_deref().unwrap_or(""),
    );
    embed_section(&mut embeddings, Section::Profile, &profile_text, model_client, model, min_chars).await?;

    let skills_text = parsed.skill_surface().join(". ");
    embed_section(&mut embeddings, Section::Skills, &skills_text, model_client, model, min_chars).await?;

    let projects_text = parsed
        .projects
        .iter()
        .map(|p| format!("{}: {}", p.name, p.description))
        .collect::<Vec<_>>()
        .join(" ");
    embed_section(&mut embeddings, Section::Projects, &projects_text, model_client, model, min_chars).await?;

    let responsibilities_text = parsed
        .experience_entries
        .iter()
        .map(|e| format!("{}: {}", e.title, e.description))
        .collect::<Vec<_>>()
        .join(" ");
    embed_section(&mut embeddings, Section::Responsibilities, &responsibilities_text, model_client, model, min_chars)
        .await?;

    let education_text = parsed
        .education
        .iter()
        .map(|e| format!("{} {} {}", e.degree.clone().unwrap_or_default(), e.field, e.institution.clone().unwrap_or_default()))
        .collect::<Vec<_>>()
        .join(". ");
    embed_section(&mut embeddings, Section::Education, &education_text, model_client, model, min_chars).await?;

    embed_section(&mut embeddings, Section::Overall, raw_text, model_client, model, min_chars).await?;

    Ok(embeddings)
}

/// Runs the whole resume pipeline for one resume. A resume failure does not
/// terminate the job (spec §4.10): the caller records the failure and moves
/// on to the next resume, excluding this one from scoring.
pub async fn run(
    resume_id: Uuid,
    job: &Job,
    store: &dyn Store,
    broker: &dyn Broker,
    progress: &ProgressHub,
    model_client: &dyn ModelClient,
    config: &Config,
) -> Result<(), AppError> {
    let resume = store.fetch_resume(resume_id).await?;

    if resume.extraction_status != StageStatus::Success {
        match &resume.raw_text {
            Some(text) if !text.trim().is_empty() => {
                store
                    .set_resume_stage_status(resume_id, ResumeStageField::Extraction, StageStatus::Success.as_str(), None)
                    .await?;
                let _ = text;
            }
            _ => {
                let msg = "resume has no extracted text".to_string();
                store
                    .set_resume_stage_status(resume_id, ResumeStageField::Extraction, StageStatus::Failed.as_str(), Some(msg.clone()))
                    .await?;
                return Err(AppError::InputMissing(msg));
            }
        }
    }

    if broker.is_cancelled(job.job_id).await? {
        return Err(AppError::CancelRequested);
    }

    let parsed = if resume.parsing_status == StageStatus::Success && resume.parsed_content.is_some() {
        resume.parsed_content.clone().expect("checked is_some above")
    } else {
        report(progress, broker, job.job_id, 0, "processing-resumes", "parsing resume").await;
        let jd_domain_tags: Vec<String> = job.jd_analysis.as_ref().map(|a| a.domain_tags.clone()).unwrap_or_default();
        let raw_text = resume.raw_text.clone().unwrap_or_default();
        match parser::parse_resume(model_client, &raw_text, &jd_domain_tags, CHAT_DEADLINE).await {
            Ok(p) => {
                store.write_resume_parsed_content(resume_id, p.clone()).await?;
                store
                    .set_resume_stage_status(resume_id, ResumeStageField::Parsing, StageStatus::Success.as_str(), None)
                    .await?;
                p
            }
            Err(e) => {
                store
                    .set_resume_stage_status(resume_id, ResumeStageField::Parsing, StageStatus::Failed.as_str(), Some(e.to_string()))
                    .await?;
                return Err(e);
            }
        }
    };

    if broker.is_cancelled(job.job_id).await? {
        return Err(AppError::CancelRequested);
    }

    if resume.embedding_status != StageStatus::Success || resume.resume_embeddings.is_none() {
        let raw_text = resume.raw_text.clone().unwrap_or_default();
        match embed_resume(model_client, &parsed, &raw_text, &config.embedding_model, config.sentence_min_chars).await {
            Ok(embeddings) => {
                store.write_resume_embeddings(resume_id, embeddings).await?;
                store
                    .set_resume_stage_status(resume_id, ResumeStageField::Embedding, StageStatus::Success.as_str(), None)
                    .await?;
            }
            Err(e) => {
                store
                    .set_resume_stage_status(resume_id, ResumeStageField::Embedding, StageStatus::Failed.as_str(), Some(e.to_string()))
                    .await?;
                return Err(e);
            }
        }
    }

    info!(%resume_id, "resume pipeline complete");
    Ok(())
}
