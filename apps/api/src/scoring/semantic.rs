//! Semantic score: per-section cosine-similarity signal aggregated across
//! six weighted sections, then min-max normalized across a batch
//! (spec §4.8.3).

use crate::models::embedding::{cosine_similarity, Section, SectionEmbeddings};

/// Aggregate section weights (spec §4.8.3).
fn section_weight(section: Section) -> f64 {
    match section {
        Section::Skills => 0.30,
        Section::Projects => 0.25,
        Section::Responsibilities => 0.20,
        Section::Profile => 0.10,
        Section::Education => 0.05,
        Section::Overall => 0.10,
    }
}

/// `coverage/alignment/best` over the cosine similarity matrix between JD
/// vectors (rows) and resume vectors (columns) for one section. `None` if
/// either side is empty for this section (spec: "section_score = 0 and is
/// skipped from weight normalization").
fn section_score(
    jd_vectors: &[Vec<f32>],
    resume_vectors: &[Vec<f32>],
    tau_coverage: f64,
    tau_alignment: f64,
) -> Option<f64> {
    if jd_vectors.is_empty() || resume_vectors.is_empty() {
        return None;
    }

    let matrix: Vec<Vec<f32>> = jd_vectors
        .iter()
        .map(|a| resume_vectors.iter().map(|b| cosine_similarity(a, b)).collect())
        .collect();

    let covered_rows = matrix
        .iter()
        .filter(|row| row.iter().cloned().fold(f32::MIN, f32::max) as f64 >= tau_coverage)
        .count();
    let coverage = covered_rows as f64 / jd_vectors.len() as f64;

    let aligned_cols = (0..resume_vectors.len())
        .filter(|&j| {
            matrix.iter().map(|row| row[j]).fold(f32::MIN, f32::max) as f64 >= tau_alignment
        })
        .count();
    let alignment = aligned_cols as f64 / resume_vectors.len() as f64;

    let best = matrix
        .iter()
        .flat_map(|row| row.iter().cloned())
        .fold(f32::MIN, f32::max) as f64;

    // `best` is a cosine similarity and can be negative; clamp the section
    // score into [0,1] so the invariant holds even when coverage/alignment
    // are both 0 and the closest pair still points apart (spec §8 inv. 4).
    Some((0.5 * coverage + 0.4 * alignment + 0.1 * best).clamp(0.0, 1.0))
}

/// Raw (pre-batch-normalization) semantic score for one candidate against
/// one JD, weighted across the six sections with renormalization for
/// missing sections.
pub fn raw_semantic_score(
    jd_embeddings: &SectionEmbeddings,
    resume_embeddings: &SectionEmbeddings,
    tau_coverage: f64,
    tau_alignment: f64,
) -> f64 {
    let mut weighted_sum = 0.0;
    let mut weight_total = 0.0;

    for section in Section::ALL {
        let jd_vectors = jd_embeddings.get(section);
        let resume_vectors = resume_embeddings.get(section);
        let (Some(jd_vectors), Some(resume_vectors)) = (jd_vectors, resume_vectors) else {
            continue;
        };
        if let Some(score) = section_score(jd_vectors, resume_vectors, tau_coverage, tau_alignment) {
            let weight = section_weight(section);
            weighted_sum += weight * score;
            weight_total += weight;
        }
    }

    if weight_total <= 0.0 {
        0.0
    } else {
        weighted_sum / weight_total
    }
}

/// Min-max normalizes raw semantic scores across one job's candidate batch
/// to [0,1]. All-equal input (zero range) maps every candidate to 0.5
/// (spec §4.8.3).
pub fn normalize_batch(raw_scores: &[f64]) -> Vec<f64> {
    if raw_scores.is_empty() {
        return Vec::new();
    }
    let min = raw_scores.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = raw_scores.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let range = max - min;
    if range <= 0.0 {
        return vec![0.5; raw_scores.len()];
    }
    raw_scores.iter().map(|&s| (s - min) / range).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn embeddings_with(section: Section, vectors: Vec<Vec<f32>>) -> SectionEmbeddings {
        let mut se = SectionEmbeddings::new();
        se.insert(section, vectors);
        se
    }

    #[test]
    fn test_section_score_perfect_match_is_one() {
        let v = vec![vec![1.0, 0.0]];
        let score = section_score(&v, &v, 0.65, 0.55).unwrap();
        assert!((score - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_section_score_none_when_side_is_empty() {
        assert!(section_score(&[], &[vec![1.0]], 0.65, 0.55).is_none());
    }

    #[test]
    fn test_section_score_clamped_nonnegative_when_vectors_point_apart() {
        // Opposite unit vectors: coverage=alignment=0 (below both taus),
        // best = -1.0, so the raw weighted sum would be -0.1.
        let jd = vec![vec![1.0, 0.0]];
        let resume = vec![vec![-1.0, 0.0]];
        let score = section_score(&jd, &resume, 0.65, 0.55).unwrap();
        assert!(score >= 0.0 && score <= 1.0);
        assert_eq!(score, 0.0);
    }

    #[test]
    fn test_raw_semantic_score_ignores_missing_sections() {
        let jd = embeddings_with(Section::Skills, vec![vec![1.0, 0.0]]);
        let resume = embeddings_with(Section::Skills, vec![vec![1.0, 0.0]]);
        let score = raw_semantic_score(&jd, &resume, 0.65, 0.55);
        assert!((score - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_raw_semantic_score_zero_when_no_sections_overlap() {
        let jd = embeddings_with(Section::Skills, vec![vec![1.0, 0.0]]);
        let resume = embeddings_with(Section::Education, vec![vec![1.0, 0.0]]);
        assert_eq!(raw_semantic_score(&jd, &resume, 0.65, 0.55), 0.0);
    }

    #[test]
    fn test_normalize_batch_zero_range_yields_half() {
        let normalized = normalize_batch(&[0.4, 0.4, 0.4]);
        assert_eq!(normalized, vec![0.5, 0.5, 0.5]);
    }

    #[test]
    fn test_normalize_batch_spans_zero_to_one() {
        let normalized = normalize_batch(&[0.2, 0.6, 1.0]);
        assert_eq!(normalized[0], 0.0);
        assert_eq!(normalized[2], 1.0);
        assert!((normalized[1] - 0.5).abs() < 1e-9);
    }
}
