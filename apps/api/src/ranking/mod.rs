//! Ranker (C9): batched LLM rerank over the algorithmically scored and
//! compliant candidate set, with graceful degradation (spec §4.9).

pub mod prompts;

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;
use uuid::Uuid;

use crate::model_client::schema::Schema;
use crate::model_client::ModelClient;
use crate::models::job::JdAnalysis;
use crate::models::requirement::{ComplianceResult, FilterRequirements};
use crate::models::resume::ParsedContent;
use crate::models::score::ScoreResult;

/// Per-candidate summary sent to the reranker (spec §4.9.3).
#[derive(Debug, Clone, Serialize)]
pub struct CandidateSummary {
    pub candidate_id: Uuid,
    pub scores: CandidateScoreSummary,
    pub years_experience: Option<f64>,
    pub location: Option<String>,
    pub top_skills: Vec<String>,
    pub top_projects: Vec<String>,
    pub compliance_per_requirement: BTreeMap<String, bool>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CandidateScoreSummary {
    pub project_score: f64,
    pub semantic_score: f64,
    pub keyword_score: f64,
    pub final_score: f64,
}

#[derive(Debug, Clone, Deserialize)]
struct LlmVerdict {
    candidate_id: Uuid,
    llm_rerank_score: f64,
    #[allow(dead_code)]
    meets_requirements: bool,
    #[allow(dead_code)]
    #[serde(default)]
    requirements_met: Vec<String>,
    #[allow(dead_code)]
    #[serde(default)]
    requirements_missing: Vec<String>,
}

fn build_summary(score: &ScoreResult, resume: &ParsedContent) -> CandidateSummary {
    let mut top_skills: Vec<String> = resume.skill_surface();
    top_skills.truncate(10);

    let mut top_projects: Vec<String> = resume.projects.iter().map(|p| p.name.clone()).collect();
    top_projects.truncate(3);

    let compliance_per_requirement = score
        .compliance
        .per_requirement
        .iter()
        .map(|(name, outcome)| (name.clone(), outcome.meets))
        .collect();

    CandidateSummary {
        candidate_id: score.resume_id,
        scores: CandidateScoreSummary {
            project_score: score.project_score,
            semantic_score: score.semantic_score,
            keyword_score: score.keyword_score,
            final_score: score.final_score.unwrap_or(0.0),
        },
        years_experience: resume.years_experience,
        location: resume.location.clone(),
        top_skills,
        top_projects,
        compliance_per_requirement,
    }
}

/// Runs one batch through `ModelClient::complete`. A transport or schema
/// failure (after the client's own retries) degrades to "no llm scores for
/// this batch" rather than failing the whole ranking (spec §4.9 "Failure
/// semantics").
async fn rerank_batch(
    model_client: &dyn ModelClient,
    jd: &JdAnalysis,
    filters: &FilterRequirements,
    batch: &[CandidateSummary],
    chat_deadline: Duration,
) -> BTreeMap<Uuid, f64> {
    let system = prompts::rerank_system();
    let prompt = prompts::rerank_prompt(jd, filters, batch);

    let response: Result<Value, _> = model_client
        .complete(&prompt, &system, Schema::RerankCandidates, chat_deadline)
        .await;

    let value = match response {
        Ok(v) => v,
        Err(e) => {
            warn!(error = %e, "rerank batch call failed, falling back to algorithmic scores for this batch");
            return BTreeMap::new();
        }
    };

    let verdicts: Vec<LlmVerdict> = match serde_json::from_value(value) {
        Ok(v) => v,
        Err(e) => {
            warn!(error = %e, "rerank batch response failed schema validation, falling back for this batch");
            return BTreeMap::new();
        }
    };

    let batch_ids: std::collections::BTreeSet<Uuid> = batch.iter().map(|c| c.candidate_id).collect();
    verdicts
        .into_iter()
        .filter(|v| batch_ids.contains(&v.candidate_id))
        .map(|v| (v.candidate_id, v.llm_rerank_score))
        .collect()
}

/// Runs the full ranking pass over every candidate that passed compliance and
/// has a `final_score` (spec §4.9). Filtered and skipped candidates are left
/// untouched (`rank` stays `None`) and returned alongside the ranked set.
pub async fn rank(
    mut candidates: Vec<ScoreResult>,
    resumes: &BTreeMap<Uuid, ParsedContent>,
    jd: &JdAnalysis,
    filters: &FilterRequirements,
    model_client: &dyn ModelClient,
    rerank_enabled: bool,
    batch_size: usize,
    chat_deadline: Duration,
) -> Vec<ScoreResult> {
    let mut rankable: Vec<usize> = candidates
        .iter()
        .enumerate()
        .filter(|(_, c)| c.compliance.passed && c.final_score.is_some())
        .map(|(i, _)| i)
        .collect();

    // Preliminary dense rank order: final_score desc, candidate_id asc.
    rankable.sort_by(|&a, &b| {
        let sa = candidates[a].final_score.unwrap_or(0.0);
        let sb = candidates[b].final_score.unwrap_or(0.0);
        sb.partial_cmp(&sa)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(candidates[a].resume_id.cmp(&candidates[b].resume_id))
    });

    let mut llm_scores: BTreeMap<Uuid, f64> = BTreeMap::new();

    if rerank_enabled && !rankable.is_empty() {
        let batch_size = batch_size.max(1);
        for chunk in rankable.chunks(batch_size) {
            let summaries: Vec<CandidateSummary> = chunk
                .iter()
                .filter_map(|&i| {
                    resumes
                        .get(&candidates[i].resume_id)
                        .map(|r| build_summary(&candidates[i], r))
                })
                .collect();
            if summaries.is_empty() {
                continue;
            }
            let batch_scores = rerank_batch(model_client, jd, filters, &summaries, chat_deadline).await;
            llm_scores.extend(batch_scores);
        }
    }

    for &i in &rankable {
        let resume_id = candidates[i].resume_id;
        let llm_score = llm_scores.get(&resume_id).copied();
        candidates[i].llm_rerank_score = llm_score;
        candidates[i].adjusted_score = Some(llm_score.unwrap_or_else(|| candidates[i].final_score.unwrap_or(0.0)));
    }

    rankable.sort_by(|&a, &b| {
        let aa = candidates[a].adjusted_score.unwrap_or(0.0);
        let ab = candidates[b].adjusted_score.unwrap_or(0.0);
        ab.partial_cmp(&aa)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| {
                let fa = candidates[a].final_score.unwrap_or(0.0);
                let fb = candidates[b].final_score.unwrap_or(0.0);
                fb.partial_cmp(&fa).unwrap_or(std::cmp::Ordering::Equal)
            })
            .then(candidates[a].resume_id.cmp(&candidates[b].resume_id))
    });

    for (rank, &i) in rankable.iter().enumerate() {
        candidates[i].rank = Some((rank + 1) as u32);
    }

    candidates
}

#[allow(dead_code)]
fn hard_requirements_gate(compliance: &ComplianceResult) -> bool {
    compliance.passed
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn score(resume_id: Uuid, final_score: Option<f64>, passed: bool) -> ScoreResult {
        ScoreResult {
            job_id: Uuid::new_v4(),
            resume_id,
            project_score: 0.5,
            keyword_score: 0.5,
            semantic_score: 0.5,
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

    struct StubClient {
        calls: Arc<AtomicUsize>,
        response: Value,
    }

    #[async_trait]
    impl ModelClient for StubClient {
        async fn complete(
            &self,
            _prompt: &str,
            _system: &str,
            _schema: Schema,
            _budget: Duration,
        ) -> Result<Value, crate::model_client::ModelError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.response.clone())
        }

        async fn embed(&self, _texts: &[String], _model: &str) -> Result<Vec<Vec<f32>>, crate::model_client::ModelError> {
            unimplemented!()
        }
    }

    #[tokio::test]
    async fn test_filtered_and_skipped_candidates_are_never_ranked() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let candidates = vec![score(a, None, true), score(b, Some(0.9), false)];
        let resumes = BTreeMap::new();
        let jd = JdAnalysis::default();
        let filters = FilterRequirements::default();
        let client = StubClient { calls: Arc::new(AtomicUsize::new(0)), response: serde_json::json!([]) };

        let result = rank(candidates, &resumes, &jd, &filters, &client, true, 30, Duration::from_secs(1)).await;
        assert!(result.iter().all(|c| c.rank.is_none()));
    }

    #[tokio::test]
    async fn test_llm_score_overrides_final_score_ordering() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let mut resumes = BTreeMap::new();
        resumes.insert(a, ParsedContent::default());
        resumes.insert(b, ParsedContent::default());
        let candidates = vec![score(a, Some(0.5), true), score(b, Some(0.9), true)];
        let jd = JdAnalysis::default();
        let filters = FilterRequirements::default();

        let response = serde_json::json!([
            {"candidate_id": a, "llm_rerank_score": 0.95, "meets_requirements": true, "requirements_met": [], "requirements_missing": []},
            {"candidate_id": b, "llm_rerank_score": 0.2, "meets_requirements": true, "requirements_met": [], "requirements_missing": []},
        ]);
        let client = StubClient { calls: Arc::new(AtomicUsize::new(0)), response };

        let result = rank(candidates, &resumes, &jd, &filters, &client, true, 30, Duration::from_secs(1)).await;
        let winner = result.iter().find(|c| c.rank == Some(1)).unwrap();
        assert_eq!(winner.resume_id, a);
    }

    #[tokio::test]
    async fn test_batch_failure_falls_back_to_final_score() {
        let a = Uuid::new_v4();
        let mut resumes = BTreeMap::new();
        resumes.insert(a, ParsedContent::default());
        let candidates = vec![score(a, Some(0.7), true)];
        let jd = JdAnalysis::default();
        let filters = FilterRequirements::default();
        // malformed response (not an array of verdicts) to force fallback.
        let client = StubClient { calls: Arc::new(AtomicUsize::new(0)), response: serde_json::json!({"not": "a list"}) };

        let result = rank(candidates, &resumes, &jd, &filters, &client, true, 30, Duration::from_secs(1)).await;
        assert_eq!(result[0].rank, Some(1));
        assert_eq!(result[0].adjusted_score, Some(0.7));
        assert!(result[0].llm_rerank_score.is_none());
    }

    #[tokio::test]
    async fn test_rerank_disabled_ranks_by_final_score_only() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let resumes = BTreeMap::new();
        let candidates = vec![score(a, Some(0.3), true), score(b, Some(0.8), true)];
        let jd = JdAnalysis::default();
        let filters = FilterRequirements::default();
        let client = StubClient { calls: Arc::new(AtomicUsize::new(0)), response: serde_json::json!([]) };

        let result = rank(candidates, &resumes, &jd, &filters, &client, false, 30, Duration::from_secs(1)).await;
        let winner = result.iter().find(|c| c.rank == Some(1)).unwrap();
        assert_eq!(winner.resume_id, b);
        assert_eq!(client.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_batches_respect_size_cap() {
        let mut candidates = Vec::new();
        let mut resumes = BTreeMap::new();
        for i in 0..5 {
            let id = Uuid::new_v4();
            resumes.insert(id, ParsedContent::default());
            candidates.push(score(id, Some(0.1 * i as f64 + 0.1), true));
        }
        let jd = JdAnalysis::default();
        let filters = FilterRequirements::default();
        let calls = Arc::new(AtomicUsize::new(0));
        let client = StubClient { calls: calls.clone(), response: serde_json::json!([]) };

        let _ = rank(candidates, &resumes, &jd, &filters, &client, true, 2, Duration::from_secs(1)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
