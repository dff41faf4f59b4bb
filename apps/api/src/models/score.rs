//! ScoreResult entity (spec §3, §4.8, §4.9).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::requirement::ComplianceResult;

/// §4.8.5/§4.10: a candidate's final classification, distinct from
/// compliance filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    Ranked,
    Filtered,
    Skipped,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ScoreResultRow {
    pub id: Uuid,
    pub job_id: Uuid,
    pub resume_id: Uuid,
    pub project_score: f64,
    pub keyword_score: f64,
    pub semantic_score: f64,
    pub final_score: Option<f64>,
    pub llm_rerank_score: Option<f64>,
    pub compliance: serde_json::Value,
    pub rank: Option<i32>,
    pub adjusted_score: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreResult {
    pub job_id: Uuid,
    pub resume_id: Uuid,
    pub project_score: f64,
    pub keyword_score: f64,
    pub semantic_score: f64,
    pub final_score: Option<f64>,
    pub llm_rerank_score: Option<f64>,
    pub compliance: ComplianceResult,
    pub rank: Option<u32>,
    pub adjusted_score: Option<f64>,
}

impl ScoreResult {
    /// §3: rank is assigned only among compliant candidates; §4.8.5: a
    /// candidate with all-zero primitives has no final_score and is
    /// classified `skipped` rather than `filtered`.
    pub fn classification(&self) -> Classification {
        if !self.compliance.passed {
            return Classification::Filtered;
        }
        if self.final_score.is_none() {
            return Classification::Skipped;
        }
        Classification::Ranked
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base(passed: bool, final_score: Option<f64>) -> ScoreResult {
        ScoreResult {
            job_id: Uuid::new_v4(),
            resume_id: Uuid::new_v4(),
            project_score: 0.0,
            keyword_score: 0.0,
            semantic_score: 0.0,
            final_score,
            llm_rerank_score: None,
            compliance: ComplianceResult {
                passed,
                score: if passed { 1.0 } else { 0.0 },
                met: vec![],
                missing: vec![],
                reason: None,
                per_requirement: Default::default(),
            },
            rank: None,
            adjusted_score: None,
        }
    }

    #[test]
    fn test_filtered_when_compliance_fails() {
        assert_eq!(base(false, Some(0.5)).classification(), Classification::Filtered);
    }

    #[test]
    fn test_skipped_when_passed_but_no_final_score() {
        assert_eq!(base(true, None).classification(), Classification::Skipped);
    }

    #[test]
    fn test_ranked_when_passed_and_scored() {
        assert_eq!(base(true, Some(0.42)).classification(), Classification::Ranked);
    }
}
