//! Job entity and structured JD analysis (spec §3).

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::embedding::SectionEmbeddings;
use super::requirement::FilterRequirements;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Draft,
    Queued,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Draft => "draft",
            JobStatus::Queued => "queued",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }
}

impl std::str::FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(JobStatus::Draft),
            "queued" => Ok(JobStatus::Queued),
            "processing" => Ok(JobStatus::Processing),
            "completed" => Ok(JobStatus::Completed),
            "failed" => Ok(JobStatus::Failed),
            other => Err(format!("unknown job status: {other}")),
        }
    }
}

/// Skills grouped by category, shared representation for JD and resume.
pub type CanonicalSkillGroups = BTreeMap<String, Vec<String>>;

/// Structured summary produced by the JD parse stage (spec §4.5.2).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JdAnalysis {
    pub role_title: String,
    pub seniority: Option<String>,
    pub required_skills: Vec<String>,
    pub preferred_skills: Vec<String>,
    pub responsibilities: Vec<String>,
    pub keywords_flat: Vec<String>,
    pub keywords_weighted: BTreeMap<String, f64>,
    pub canonical_skills: CanonicalSkillGroups,
    pub tools_tech: Vec<String>,
    pub soft_skills: Vec<String>,
    pub years_experience_required: Option<f64>,
    pub domain_tags: Vec<String>,
    /// Overrides for §4.8.2 keyword component weights; re-normalized to 1.0
    /// if present and non-empty.
    pub weighting: BTreeMap<String, f64>,
}

/// The row persisted via `Store`; JSON blobs hold the nested structures that
/// are replaced atomically per spec §4.2/§6.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct JobRow {
    pub id: Uuid,
    pub title: String,
    pub raw_jd_text: Option<String>,
    pub jd_pdf_ref: Option<String>,
    pub status: String,
    pub locked: bool,
    pub jd_analysis: Option<serde_json::Value>,
    pub jd_embeddings: Option<serde_json::Value>,
    pub filter_requirements: Option<serde_json::Value>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// In-memory view of a Job with the JSON blobs deserialized, used by the
/// pipeline and scorer so they never handle raw `serde_json::Value`.
#[derive(Debug, Clone)]
pub struct Job {
    pub job_id: Uuid,
    pub title: String,
    pub raw_jd_text: Option<String>,
    pub jd_pdf_ref: Option<String>,
    pub status: JobStatus,
    pub locked: bool,
    pub jd_analysis: Option<JdAnalysis>,
    pub jd_embeddings: Option<SectionEmbeddings>,
    pub filter_requirements: FilterRequirements,
    pub error: Option<String>,
}

impl Job {
    /// §3: at least one of raw_jd_text/jd_pdf_ref must be non-empty to enter
    /// processing.
    pub fn has_jd_source(&self) -> bool {
        self.raw_jd_text.as_deref().is_some_and(|s| !s.trim().is_empty())
            || self.jd_pdf_ref.as_deref().is_some_and(|s| !s.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_status_round_trips_through_str() {
        for s in [
            JobStatus::Draft,
            JobStatus::Queued,
            JobStatus::Processing,
            JobStatus::Completed,
            JobStatus::Failed,
        ] {
            let parsed: JobStatus = s.as_str().parse().unwrap();
            assert_eq!(parsed, s);
        }
    }

    #[test]
    fn test_has_jd_source_requires_non_blank_text_or_pdf() {
        let mut job = Job {
            job_id: Uuid::new_v4(),
            title: "Engineer".into(),
            raw_jd_text: None,
            jd_pdf_ref: None,
            status: JobStatus::Draft,
            locked: false,
            jd_analysis: None,
            jd_embeddings: None,
            filter_requirements: FilterRequirements::default(),
            error: None,
        };
        assert!(!job.has_jd_source());
        job.raw_jd_text = Some("   ".into());
        assert!(!job.has_jd_source());
        job.raw_jd_text = Some("We need a backend engineer.".into());
        assert!(job.has_jd_source());
    }
}
