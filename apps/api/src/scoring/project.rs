//! Project score: mean of per-project weighted metric average (spec §4.8.4).

use crate::models::resume::ParsedContent;

pub fn project_score(resume: &ParsedContent) -> f64 {
    if resume.projects.is_empty() {
        return 0.0;
    }
    let sum: f64 = resume.projects.iter().map(|p| p.metrics.weighted_avg()).sum();
    sum / resume.projects.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::resume::{Project, ProjectMetrics};

    fn project(avg: f64) -> Project {
        Project {
            name: "p".into(),
            description: "d".into(),
            tech_keywords: vec![],
            primary_skills: vec![],
            metrics: ProjectMetrics {
                difficulty: avg,
                novelty: avg,
                skill_relevance: avg,
                complexity: avg,
                technical_depth: avg,
                domain_relevance: avg,
                execution_quality: avg,
            },
        }
    }

    #[test]
    fn test_empty_projects_score_zero() {
        let resume = ParsedContent::default();
        assert_eq!(project_score(&resume), 0.0);
    }

    #[test]
    fn test_mean_across_multiple_projects() {
        let mut resume = ParsedContent::default();
        resume.projects.push(project(0.8));
        resume.projects.push(project(0.4));
        assert!((project_score(&resume) - 0.6).abs() < 1e-9);
    }
}
