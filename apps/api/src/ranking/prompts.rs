//! Prompt construction for the reranker batch call (spec §4.9.3).

use serde_json::json;

pub use crate::model_client::prompts::rerank_system;
use crate::models::job::JdAnalysis;
use crate::models::requirement::FilterRequirements;

use super::CandidateSummary;

pub fn rerank_prompt(jd: &JdAnalysis, filters: &FilterRequirements, batch: &[CandidateSummary]) -> String {
    let payload = json!({
        "job_analysis": {
            "role_title": jd.role_title,
            "seniority": jd.seniority,
            "required_skills": jd.required_skills,
            "preferred_skills": jd.preferred_skills,
            "responsibilities": jd.responsibilities,
            "years_experience_required": jd.years_experience_required,
        },
        "filter_requirements": filters,
        "candidates": batch,
    });
    payload.to_string()
}
