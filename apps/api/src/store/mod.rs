//! Store (C2): persistent entity CRUD for Job, Resume, ScoreResult (spec §4.2).

pub mod pg;

use async_trait::async_trait;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::job::{Job, JdAnalysis};
use crate::models::embedding::SectionEmbeddings;
use crate::models::requirement::FilterRequirements;
use crate::models::resume::{ParsedContent, Resume};
use crate::models::score::ScoreResult;

pub use pg::PgStore;

/// Full-replacement JD artifacts, written atomically as one blob update each
/// (spec §4.2, §6).
pub struct JdArtifacts {
    pub jd_analysis: JdAnalysis,
    pub jd_embeddings: SectionEmbeddings,
    pub filter_requirements: FilterRequirements,
}

#[async_trait]
pub trait Store: Send + Sync {
    async fn create_job(&self, title: &str, raw_jd_text: Option<String>) -> Result<Job, AppError>;
    async fn fetch_job(&self, job_id: Uuid) -> Result<Job, AppError>;
    async fn set_job_locked(&self, job_id: Uuid) -> Result<(), AppError>;
    async fn set_job_status(&self, job_id: Uuid, status: &str, error: Option<String>) -> Result<(), AppError>;
    async fn write_jd_artifacts(&self, job_id: Uuid, artifacts: JdArtifacts) -> Result<(), AppError>;

    async fn create_resume(&self, job_id: Uuid, filename: &str) -> Result<Resume, AppError>;
    async fn fetch_resume(&self, resume_id: Uuid) -> Result<Resume, AppError>;
    async fn fetch_resumes_for_job(&self, job_id: Uuid) -> Result<Vec<Resume>, AppError>;
    async fn set_resume_raw_text(&self, resume_id: Uuid, raw_text: &str) -> Result<(), AppError>;
    async fn set_resume_stage_status(
        &self,
        resume_id: Uuid,
        field: ResumeStageField,
        status: &str,
        error: Option<String>,
    ) -> Result<(), AppError>;
    async fn write_resume_parsed_content(&self, resume_id: Uuid, parsed: ParsedContent) -> Result<(), AppError>;
    async fn write_resume_embeddings(&self, resume_id: Uuid, embeddings: SectionEmbeddings) -> Result<(), AppError>;

    /// Atomic upsert keyed by (job_id, resume_id) (spec §4.2).
    async fn upsert_score_result(&self, score: ScoreResult) -> Result<(), AppError>;
    async fn fetch_scores_for_job(&self, job_id: Uuid) -> Result<Vec<ScoreResult>, AppError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResumeStageField {
    Extraction,
    Parsing,
    Embedding,
}

impl ResumeStageField {
    pub fn column(self) -> &'static str {
        match self {
            ResumeStageField::Extraction => "extraction_status",
            ResumeStageField::Parsing => "parsing_status",
            ResumeStageField::Embedding => "embedding_status",
        }
    }
}
