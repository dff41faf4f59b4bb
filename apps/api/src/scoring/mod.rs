//! Scorer (C8): four sub-scorers plus composite aggregation (spec §4.8).
//!
//! Pure, synchronous, CPU-bound — no I/O happens here (spec §5: "no
//! suspension inside the scoring arithmetic").

pub mod keyword;
pub mod project;
pub mod semantic;

use crate::models::job::JdAnalysis;
use crate::models::requirement::ComplianceResult;
use crate::models::resume::ParsedContent;

/// §4.8.1: gating signal only, stored for audit; does not feed the
/// composite formula.
pub fn hard_requirements_score(compliance: &ComplianceResult) -> f64 {
    if compliance.passed {
        1.0
    } else {
        0.0
    }
}

/// The four primitive scores computed for one (job, resume) pair, before
/// batch-level semantic normalization.
pub struct PrimitiveScores {
    pub project_score: f64,
    pub keyword_score: f64,
    pub raw_semantic_score: f64,
}

pub fn compute_primitives(
    jd: &JdAnalysis,
    resume: &ParsedContent,
    compliance: &ComplianceResult,
    jd_embeddings: &crate::models::embedding::SectionEmbeddings,
    resume_embeddings: &crate::models::embedding::SectionEmbeddings,
    tau_coverage: f64,
    tau_alignment: f64,
    config_default_weights: Option<&std::collections::BTreeMap<String, f64>>,
) -> PrimitiveScores {
    PrimitiveScores {
        project_score: project::project_score(resume),
        keyword_score: keyword::keyword_score(jd, resume, compliance, config_default_weights),
        raw_semantic_score: semantic::raw_semantic_score(jd_embeddings, resume_embeddings, tau_coverage, tau_alignment),
    }
}

/// §4.8.5: the composite score, given the already batch-normalized semantic
/// score. Returns `None` when all three primitives are exactly zero (the
/// candidate is "skipped", distinct from compliance-filtered). Uses a fixed
/// summation order (project, semantic, keyword) for reproducibility.
pub fn final_score(project_score: f64, semantic_score: f64, keyword_score: f64) -> Option<f64> {
    let nonzero_count = [project_score, semantic_score, keyword_score]
        .iter()
        .filter(|&&v| v != 0.0)
        .count();

    if nonzero_count == 0 {
        return None;
    }

    if nonzero_count == 1 {
        // Sparse-evidence decay: penalize without excluding (spec §4.8.5).
        let only_nonzero = [project_score, semantic_score, keyword_score]
            .into_iter()
            .find(|&v| v != 0.0)
            .unwrap();
        return Some((only_nonzero - 0.08).max(0.0));
    }

    let composite = 0.35 * project_score + 0.35 * semantic_score + 0.30 * keyword_score;
    Some(composite.clamp(0.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scenario_d_sparse_evidence_decay() {
        let score = final_score(0.0, 0.6, 0.0);
        assert!((score.unwrap() - 0.52).abs() < 1e-9);
    }

    #[test]
    fn test_scenario_e_all_zero_is_skipped() {
        assert!(final_score(0.0, 0.0, 0.0).is_none());
    }

    #[test]
    fn test_composite_uses_declared_weights() {
        let score = final_score(1.0, 1.0, 1.0).unwrap();
        assert!((score - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_sparse_decay_floors_at_zero() {
        let score = final_score(0.05, 0.0, 0.0);
        assert_eq!(score.unwrap(), 0.0);
    }

    #[test]
    fn test_hard_requirements_score_matches_compliance_flag() {
        let passed = ComplianceResult {
            passed: true,
            score: 1.0,
            met: vec![],
            missing: vec![],
            reason: None,
            per_requirement: Default::default(),
        };
        assert_eq!(hard_requirements_score(&passed), 1.0);
    }
}
