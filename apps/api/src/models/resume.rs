//! Resume entity and structured parsed content (spec §3, §4.6).

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::embedding::SectionEmbeddings;
use super::job::CanonicalSkillGroups;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    Pending,
    Processing,
    Success,
    Failed,
}

impl StageStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            StageStatus::Pending => "pending",
            StageStatus::Processing => "processing",
            StageStatus::Success => "success",
            StageStatus::Failed => "failed",
        }
    }
}

impl std::str::FromStr for StageStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(StageStatus::Pending),
            "processing" => Ok(StageStatus::Processing),
            "success" => Ok(StageStatus::Success),
            "failed" => Ok(StageStatus::Failed),
            other => Err(format!("unknown stage status: {other}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferredSkill {
    pub skill: String,
    pub confidence: f64,
    #[serde(default)]
    pub provenance: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillProficiency {
    pub skill: String,
    pub level: Option<String>,
}

/// The 7 project quality metrics, each in [0,1] (spec §4.6.2, §4.8.4).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ProjectMetrics {
    pub difficulty: f64,
    pub novelty: f64,
    pub skill_relevance: f64,
    pub complexity: f64,
    pub technical_depth: f64,
    pub domain_relevance: f64,
    pub execution_quality: f64,
}

impl ProjectMetrics {
    /// Mean of the 7 metrics, equal weight 1/7 each (spec §4.8.4).
    pub fn weighted_avg(&self) -> f64 {
        (self.difficulty
            + self.novelty
            + self.skill_relevance
            + self.complexity
            + self.technical_depth
            + self.domain_relevance
            + self.execution_quality)
            / 7.0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub tech_keywords: Vec<String>,
    #[serde(default)]
    pub primary_skills: Vec<String>,
    pub metrics: ProjectMetrics,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperienceEntry {
    pub title: String,
    pub organization: Option<String>,
    pub description: String,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Education {
    pub field: String,
    pub institution: Option<String>,
    pub degree: Option<String>,
}

/// Structured output of the resume parse stage (spec §4.6.2).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParsedContent {
    pub candidate_name: Option<String>,
    pub years_experience: Option<f64>,
    pub canonical_skills: CanonicalSkillGroups,
    pub inferred_skills: Vec<InferredSkill>,
    pub skill_proficiency: Vec<SkillProficiency>,
    pub projects: Vec<Project>,
    pub experience_entries: Vec<ExperienceEntry>,
    pub education: Vec<Education>,
    pub location: Option<String>,
    /// Evaluated as Boolean requirement candidate values (spec §4.7); keyed
    /// by requirement name since the source schema does not otherwise name
    /// where a boolean attribute like "willing_to_relocate" lives.
    pub boolean_flags: BTreeMap<String, bool>,
    pub domain_tags: Vec<String>,
}

impl ParsedContent {
    /// Union of every surface the compliance filter and keyword scorer treat
    /// as "the candidate's skills" (spec §4.7 skill-matching source set).
    pub fn skill_surface(&self) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        out.extend(self.canonical_skills.values().flatten().cloned());
        out.extend(self.inferred_skills.iter().map(|s| s.skill.clone()));
        out.extend(self.skill_proficiency.iter().map(|s| s.skill.clone()));
        for p in &self.projects {
            out.extend(p.tech_keywords.iter().cloned());
            out.extend(p.primary_skills.iter().cloned());
        }
        out
    }

    /// Concatenated free text of projects and experience, used as the
    /// fallback substring search surface (spec §4.7) and for keyword text
    /// scans (spec §4.8.2).
    pub fn free_text(&self) -> String {
        let mut parts: Vec<&str> = Vec::new();
        for p in &self.projects {
            parts.push(p.description.as_str());
        }
        for e in &self.experience_entries {
            parts.push(e.description.as_str());
        }
        parts.join(" ")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ResumeRow {
    pub id: Uuid,
    pub job_id: Uuid,
    pub filename: String,
    pub raw_text: Option<String>,
    pub extraction_status: String,
    pub parsing_status: String,
    pub embedding_status: String,
    pub parsed_content: Option<serde_json::Value>,
    pub resume_embeddings: Option<serde_json::Value>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct Resume {
    pub resume_id: Uuid,
    pub job_id: Uuid,
    pub filename: String,
    pub raw_text: Option<String>,
    pub extraction_status: StageStatus,
    pub parsing_status: StageStatus,
    pub embedding_status: StageStatus,
    pub parsed_content: Option<ParsedContent>,
    pub resume_embeddings: Option<SectionEmbeddings>,
    pub error: Option<String>,
}

impl Resume {
    /// §3 invariant: embedding success implies parsing success implies
    /// extraction success.
    pub fn stage_invariant_holds(&self) -> bool {
        if self.embedding_status == StageStatus::Success {
            return self.parsing_status == StageStatus::Success
                && self.extraction_status == StageStatus::Success;
        }
        if self.parsing_status == StageStatus::Success {
            return self.extraction_status == StageStatus::Success;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(v: f64) -> ProjectMetrics {
        ProjectMetrics {
            difficulty: v,
            novelty: v,
            skill_relevance: v,
            complexity: v,
            technical_depth: v,
            domain_relevance: v,
            execution_quality: v,
        }
    }

    #[test]
    fn test_project_metrics_weighted_avg_is_plain_mean() {
        assert!((metrics(0.8).weighted_avg() - 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_skill_surface_unions_all_sources() {
        let mut pc = ParsedContent::default();
        pc.canonical_skills
            .insert("programming".into(), vec!["Python".into()]);
        pc.inferred_skills.push(InferredSkill {
            skill: "Docker".into(),
            confidence: 0.9,
            provenance: vec![],
        });
        pc.projects.push(Project {
            name: "p".into(),
            description: "desc".into(),
            tech_keywords: vec!["Kubernetes".into()],
            primary_skills: vec!["Leadership".into()],
            metrics: metrics(0.5),
        });
        let surface = pc.skill_surface();
        assert!(surface.contains(&"Python".to_string()));
        assert!(surface.contains(&"Docker".to_string()));
        assert!(surface.contains(&"Kubernetes".to_string()));
        assert!(surface.contains(&"Leadership".to_string()));
    }

    #[test]
    fn test_stage_invariant_rejects_success_embedding_without_parse() {
        let r = Resume {
            resume_id: Uuid::new_v4(),
            job_id: Uuid::new_v4(),
            filename: "r.pdf".into(),
            raw_text: None,
            extraction_status: StageStatus::Success,
            parsing_status: StageStatus::Failed,
            embedding_status: StageStatus::Success,
            parsed_content: None,
            resume_embeddings: None,
            error: None,
        };
        assert!(!r.stage_invariant_holds());
    }
}
