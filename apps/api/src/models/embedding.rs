//! Section-embedding schema shared by JD and resume artifacts (spec §3, §4.5.4).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// The six named sections every JD and resume is embedded into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Section {
    Profile,
    Skills,
    Projects,
    Responsibilities,
    Education,
    Overall,
}

impl Section {
    pub const ALL: [Section; 6] = [
        Section::Profile,
        Section::Skills,
        Section::Projects,
        Section::Responsibilities,
        Section::Education,
        Section::Overall,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Section::Profile => "profile",
            Section::Skills => "skills",
            Section::Projects => "projects",
            Section::Responsibilities => "responsibilities",
            Section::Education => "education",
            Section::Overall => "overall",
        }
    }
}

/// An ordered sequence of unit vectors, one per sentence, for a section.
pub type SectionVectors = Vec<Vec<f32>>;

/// Section name → ordered per-sentence vectors, for a JD or a resume.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SectionEmbeddings(pub BTreeMap<Section, SectionVectors>);

impl SectionEmbeddings {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    pub fn insert(&mut self, section: Section, vectors: SectionVectors) {
        self.0.insert(section, vectors);
    }

    pub fn get(&self, section: Section) -> Option<&SectionVectors> {
        self.0.get(&section)
    }

    /// True once every one of the six sections has an entry (possibly empty).
    pub fn has_all_sections(&self) -> bool {
        Section::ALL.iter().all(|s| self.0.contains_key(s))
    }
}

/// Normalizes a vector to unit length in place. No-op on a zero vector.
pub fn normalize_unit(v: &mut [f32]) {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}

/// Cosine similarity between two equal-length vectors. Zero if either is
/// degenerate (zero-length or mismatched dimension).
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_similarity_identical_vectors_is_one() {
        let v = vec![1.0, 2.0, 3.0];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_similarity_orthogonal_is_zero() {
        let a = vec![1.0, 0.0];
        let b = vec![0.0, 1.0];
        assert!(cosine_similarity(&a, &b).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_similarity_mismatched_len_is_zero() {
        let a = vec![1.0, 0.0];
        let b = vec![1.0, 0.0, 0.0];
        assert_eq!(cosine_similarity(&a, &b), 0.0);
    }

    #[test]
    fn test_has_all_sections() {
        let mut se = SectionEmbeddings::new();
        assert!(!se.has_all_sections());
        for s in Section::ALL {
            se.insert(s, vec![]);
        }
        assert!(se.has_all_sections());
    }
}
