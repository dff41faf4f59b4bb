//! PostgreSQL-backed `Store` implementation over the shared `sqlx::PgPool`.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::embedding::SectionEmbeddings;
use crate::models::job::{Job, JdAnalysis, JobRow, JobStatus};
use crate::models::requirement::{ComplianceResult, FilterRequirements};
use crate::models::resume::{ParsedContent, Resume, ResumeRow, StageStatus};
use crate::models::score::{ScoreResult, ScoreResultRow};

use super::{JdArtifacts, ResumeStageField, Store};

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn job_from_row(row: JobRow) -> Result<Job, AppError> {
    let jd_analysis = row
        .jd_analysis
        .map(|v| serde_json::from_value::<JdAnalysis>(v))
        .transpose()
        .map_err(|e| AppError::SchemaViolation(format!("jd_analysis: {e}")))?;
    let jd_embeddings = row
        .jd_embeddings
        .map(|v| serde_json::from_value::<SectionEmbeddings>(v))
        .transpose()
        .map_err(|e| AppError::SchemaViolation(format!("jd_embeddings: {e}")))?;
    let filter_requirements = row
        .filter_requirements
        .map(|v| serde_json::from_value::<FilterRequirements>(v))
        .transpose()
        .map_err(|e| AppError::SchemaViolation(format!("filter_requirements: {e}")))?
        .unwrap_or_default();
    let status = row
        .status
        .parse::<JobStatus>()
        .map_err(AppError::SchemaViolation)?;

    Ok(Job {
        job_id: row.id,
        title: row.title,
        raw_jd_text: row.raw_jd_text,
        jd_pdf_ref: row.jd_pdf_ref,
        status,
        locked: row.locked,
        jd_analysis,
        jd_embeddings,
        filter_requirements,
        error: row.error,
    })
}

fn resume_from_row(row: ResumeRow) -> Result<Resume, AppError> {
    let parsed_content = row
        .parsed_content
        .map(serde_json::from_value::<ParsedContent>)
        .transpose()
        .map_err(|e| AppError::SchemaViolation(format!("parsed_content: {e}")))?;
    let resume_embeddings = row
        .resume_embeddings
        .map(serde_json::from_value::<SectionEmbeddings>)
        .transpose()
        .map_err(|e| AppError::SchemaViolation(format!("resume_embeddings: {e}")))?;

    Ok(Resume {
        resume_id: row.id,
        job_id: row.job_id,
        filename: row.filename,
        raw_text: row.raw_text,
        extraction_status: row.extraction_status.parse::<StageStatus>().map_err(AppError::SchemaViolation)?,
        parsing_status: row.parsing_status.parse::<StageStatus>().map_err(AppError::SchemaViolation)?,
        embedding_status: row.embedding_status.parse::<StageStatus>().map_err(AppError::SchemaViolation)?,
        parsed_content,
        resume_embeddings,
        error: row.error,
    })
}

fn score_from_row(row: ScoreResultRow) -> Result<ScoreResult, AppError> {
    let compliance = serde_json::from_value::<ComplianceResult>(row.compliance)
        .map_err(|e| AppError::SchemaViolation(format!("compliance: {e}")))?;
    Ok(ScoreResult {
        job_id: row.job_id,
        resume_id: row.resume_id,
        project_score: row.project_score,
        keyword_score: row.keyword_score,
        semantic_score: row.semantic_score,
        final_score: row.final_score,
        llm_rerank_score: row.llm_rerank_score,
        compliance,
        rank: row.rank.map(|r| r as u32),
        adjusted_score: row.adjusted_score,
    })
}

#[async_trait]
impl Store for PgStore {
    async fn create_job(&self, title: &str, raw_jd_text: Option<String>) -> Result<Job, AppError> {
        let row = sqlx::query_as::<_, JobRow>(
            "INSERT INTO jobs (id, title, raw_jd_text, status, locked, created_at, updated_at)
             VALUES ($1, $2, $3, 'draft', false, now(), now())
             RETURNING id, title, raw_jd_text, jd_pdf_ref, status, locked, jd_analysis,
                       jd_embeddings, filter_requirements, error, created_at, updated_at",
        )
        .bind(Uuid::new_v4())
        .bind(title)
        .bind(raw_jd_text)
        .fetch_one(&self.pool)
        .await?;
        job_from_row(row)
    }

    async fn fetch_job(&self, job_id: Uuid) -> Result<Job, AppError> {
        let row = sqlx::query_as::<_, JobRow>(
            "SELECT id, title, raw_jd_text, jd_pdf_ref, status, locked, jd_analysis,
                    jd_embeddings, filter_requirements, error, created_at, updated_at
             FROM jobs WHERE id = $1",
        )
        .bind(job_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("job {job_id}")))?;
        job_from_row(row)
    }

    async fn set_job_locked(&self, job_id: Uuid) -> Result<(), AppError> {
        sqlx::query("UPDATE jobs SET locked = true, updated_at = now() WHERE id = $1")
            .bind(job_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn set_job_status(&self, job_id: Uuid, status: &str, error: Option<String>) -> Result<(), AppError> {
        sqlx::query("UPDATE jobs SET status = $2, error = $3, updated_at = now() WHERE id = $1")
            .bind(job_id)
            .bind(status)
            .bind(error)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn write_jd_artifacts(&self, job_id: Uuid, artifacts: JdArtifacts) -> Result<(), AppError> {
        let jd_analysis = serde_json::to_value(&artifacts.jd_analysis)
            .map_err(|e| AppError::Internal(e.into()))?;
        let jd_embeddings = serde_json::to_value(&artifacts.jd_embeddings)
            .map_err(|e| AppError::Internal(e.into()))?;
        let filter_requirements = serde_json::to_value(&artifacts.filter_requirements)
            .map_err(|e| AppError::Internal(e.into()))?;

        sqlx::query(
            "UPDATE jobs SET jd_analysis = $2, jd_embeddings = $3, filter_requirements = $4,
             updated_at = now() WHERE id = $1",
        )
        .bind(job_id)
        .bind(jd_analysis)
        .bind(jd_embeddings)
        .bind(filter_requirements)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn create_resume(&self, job_id: Uuid, filename: &str) -> Result<Resume, AppError> {
        let row = sqlx::query_as::<_, ResumeRow>(
            "INSERT INTO resumes (id, job_id, filename, extraction_status, parsing_status,
                                   embedding_status, created_at, updated_at)
             VALUES ($1, $2, $3, 'pending', 'pending', 'pending', now(), now())
             RETURNING id, job_id, filename, raw_text, extraction_status, parsing_status,
                       embedding_status, parsed_content, resume_embeddings, error,
                       created_at, updated_at",
        )
        .bind(Uuid::new_v4())
        .bind(job_id)
        .bind(filename)
        .fetch_one(&self.pool)
        .await?;
        resume_from_row(row)
    }

    async fn fetch_resume(&self, resume_id: Uuid) -> Result<Resume, AppError> {
        let row = sqlx::query_as::<_, ResumeRow>(
            "SELECT id, job_id, filename, raw_text, extraction_status, parsing_status,
                    embedding_status, parsed_content, resume_embeddings, error, created_at, updated_at
             FROM resumes WHERE id = $1",
        )
        .bind(resume_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("resume {resume_id}")))?;
        resume_from_row(row)
    }

    async fn fetch_resumes_for_job(&self, job_id: Uuid) -> Result<Vec<Resume>, AppError> {
        let rows = sqlx::query_as::<_, ResumeRow>(
            "SELECT id, job_id, filename, raw_text, extraction_status, parsing_status,
                    embedding_status, parsed_content, resume_embeddings, error, created_at, updated_at
             FROM resumes WHERE job_id = $1",
        )
        .bind(job_id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(resume_from_row).collect()
    }

    async fn set_resume_raw_text(&self, resume_id: Uuid, raw_text: &str) -> Result<(), AppError> {
        sqlx::query("UPDATE resumes SET raw_text = $2, updated_at = now() WHERE id = $1")
            .bind(resume_id)
            .bind(raw_text)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn set_resume_stage_status(
        &self,
        resume_id: Uuid,
        field: ResumeStageField,
        status: &str,
        error: Option<String>,
    ) -> Result<(), AppError> {
        let sql = format!(
            "UPDATE resumes SET {col} = $2, error = $3, updated_at = now() WHERE id = $1",
            col = field.column()
        );
        sqlx::query(&sql)
            .bind(resume_id)
            .bind(status)
            .bind(error)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn write_resume_parsed_content(&self, resume_id: Uuid, parsed: ParsedContent) -> Result<(), AppError> {
        let value = serde_json::to_value(&parsed).map_err(|e| AppError::Internal(e.into()))?;
        sqlx::query("UPDATE resumes SET parsed_content = $2, updated_at = now() WHERE id = $1")
            .bind(resume_id)
            .bind(value)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn write_resume_embeddings(&self, resume_id: Uuid, embeddings: SectionEmbeddings) -> Result<(), AppError> {
        let value = serde_json::to_value(&embeddings).map_err(|e| AppError::Internal(e.into()))?;
        sqlx::query("UPDATE resumes SET resume_embeddings = $2, updated_at = now() WHERE id = $1")
            .bind(resume_id)
            .bind(value)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn upsert_score_result(&self, score: ScoreResult) -> Result<(), AppError> {
        let compliance = serde_json::to_value(&score.compliance).map_err(|e| AppError::Internal(e.into()))?;
        sqlx::query(
            "INSERT INTO score_results (id, job_id, resume_id, project_score, keyword_score,
                 semantic_score, final_score, llm_rerank_score, compliance, rank, adjusted_score,
                 created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, now(), now())
             ON CONFLICT (job_id, resume_id) DO UPDATE SET
                 project_score = EXCLUDED.project_score,
                 keyword_score = EXCLUDED.keyword_score,
                 semantic_score = EXCLUDED.semantic_score,
                 final_score = EXCLUDED.final_score,
                 llm_rerank_score = EXCLUDED.llm_rerank_score,
                 compliance = EXCLUDED.compliance,
                 rank = EXCLUDED.rank,
                 adjusted_score = EXCLUDED.adjusted_score,
                 updated_at = now()",
        )
        .bind(Uuid::new_v4())
        .bind(score.job_id)
        .bind(score.resume_id)
        .bind(score.project_score)
        .bind(score.keyword_score)
        .bind(score.semantic_score)
        .bind(score.final_score)
        .bind(score.llm_rerank_score)
        .bind(compliance)
        .bind(score.rank.map(|r| r as i32))
        .bind(score.adjusted_score)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn fetch_scores_for_job(&self, job_id: Uuid) -> Result<Vec<ScoreResult>, AppError> {
        let rows = sqlx::query_as::<_, ScoreResultRow>(
            "SELECT id, job_id, resume_id, project_score, keyword_score, semantic_score,
                    final_score, llm_rerank_score, compliance, rank, adjusted_score,
                    created_at, updated_at
             FROM score_results WHERE job_id = $1 ORDER BY final_score DESC NULLS LAST",
        )
        .bind(job_id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(score_from_row).collect()
    }
}
