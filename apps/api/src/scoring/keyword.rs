//! Keyword score: weighted sum of components (spec §4.8.2).

use std::collections::BTreeMap;

use crate::models::job::JdAnalysis;
use crate::models::requirement::ComplianceResult;
use crate::models::resume::ParsedContent;
use crate::models::skill::fold;

/// Default component weights (spec §4.8.2 table). Overridable via
/// `jd_analysis.weighting`; the override is re-normalized to sum to 1.0.
pub fn default_weights() -> BTreeMap<&'static str, f64> {
    BTreeMap::from([
        ("required_skills", 0.18),
        ("preferred_skills", 0.08),
        ("weighted_keywords", 0.15),
        ("experience_keywords", 0.25),
        ("domain_relevance", 0.10),
        ("technical_depth", 0.10),
        ("project_metrics", 0.09),
        ("responsibilities", 0.03),
        ("education", 0.02),
    ])
}

/// Leadership/action-verb weight table (spec §4.8.2 `experience_keywords`).
fn experience_verb_weights() -> BTreeMap<&'static str, f64> {
    BTreeMap::from([
        ("lead", 4.0),
        ("led", 4.0),
        ("architect", 4.0),
        ("architected", 4.0),
        ("designed", 3.6),
        ("built", 3.6),
        ("scaled", 3.4),
        ("implemented", 3.2),
        ("productionized", 3.6),
        ("mentored", 2.8),
        ("improved", 3.0),
    ])
}

fn skill_present(skill: &str, resume: &ParsedContent) -> bool {
    let needle = fold(skill);
    let surface: Vec<String> = resume.skill_surface().iter().map(|s| fold(s)).collect();
    if surface.iter().any(|s| s == &needle) {
        return true;
    }
    fold(&resume.free_text()).contains(&needle)
}

fn fraction_present(items: &[String], resume: &ParsedContent) -> f64 {
    if items.is_empty() {
        return 0.0;
    }
    let present = items.iter().filter(|s| skill_present(s, resume)).count();
    present as f64 / items.len() as f64
}

fn weighted_keywords_component(jd: &JdAnalysis, resume: &ParsedContent) -> f64 {
    let denom: f64 = jd.keywords_weighted.values().sum();
    if denom <= 0.0 {
        return 0.0;
    }
    let numerator: f64 = jd
        .keywords_weighted
        .iter()
        .filter(|(k, _)| skill_present(k, resume))
        .map(|(_, w)| w)
        .sum();
    numerator / denom
}

fn experience_text(resume: &ParsedContent) -> String {
    resume
        .experience_entries
        .iter()
        .map(|e| e.description.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

fn experience_keywords_component(resume: &ParsedContent) -> f64 {
    let table = experience_verb_weights();
    let denom: f64 = table.values().sum();
    let folded = fold(&experience_text(resume));
    let words: std::collections::BTreeSet<&str> = folded
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();
    let numerator: f64 = table
        .iter()
        .filter(|(verb, _)| words.contains(*verb))
        .map(|(_, w)| w)
        .sum();
    numerator / denom
}

fn domain_relevance_component(jd: &JdAnalysis, resume: &ParsedContent) -> f64 {
    if jd.domain_tags.is_empty() {
        return 0.0;
    }
    let candidate: Vec<String> = resume.domain_tags.iter().map(|t| fold(t)).collect();
    let matched = jd.domain_tags.iter().filter(|t| candidate.contains(&fold(t))).count();
    matched as f64 / jd.domain_tags.len() as f64
}

fn technical_depth_component(resume: &ParsedContent) -> f64 {
    if resume.projects.is_empty() {
        return 0.0;
    }
    let sum: f64 = resume.projects.iter().map(|p| p.metrics.technical_depth).sum();
    sum / resume.projects.len() as f64
}

fn project_metrics_component(resume: &ParsedContent) -> f64 {
    if resume.projects.is_empty() {
        return 0.0;
    }
    let sum: f64 = resume.projects.iter().map(|p| p.metrics.weighted_avg()).sum();
    sum / resume.projects.len() as f64
}

fn responsibilities_component(jd: &JdAnalysis, resume: &ParsedContent) -> f64 {
    let words: Vec<String> = jd
        .responsibilities
        .iter()
        .flat_map(|r| r.split_whitespace())
        .map(|w| fold(w.trim_matches(|c: char| !c.is_alphanumeric())))
        .filter(|w| w.chars().count() > 3)
        .collect();
    if words.is_empty() {
        return 0.0;
    }
    let haystack = fold(&resume.free_text());
    let present = words.iter().filter(|w| haystack.contains(w.as_str())).count();
    present as f64 / words.len() as f64
}

/// 1.0 if the compliance step found any education requirement satisfied,
/// else 0.0. `jd_analysis` carries no standalone "required education field"
/// outside the compliance filter_requirements, so this component reuses that
/// evaluation rather than re-deriving it.
fn education_component(compliance: &ComplianceResult) -> f64 {
    let matched = compliance
        .per_requirement
        .iter()
        .any(|(name, outcome)| name.to_ascii_lowercase().contains("education") && outcome.meets);
    if matched {
        1.0
    } else {
        0.0
    }
}

/// Re-normalizes a weight map to sum to 1.0. No-op on an empty or all-zero map.
fn renormalize(weights: &mut BTreeMap<&'static str, f64>) {
    let sum: f64 = weights.values().sum();
    if sum > 0.0 {
        for v in weights.values_mut() {
            *v /= sum;
        }
    }
}

/// Computes the keyword score (spec §4.8.2), applying the JD's `weighting`
/// override (if present, else the process-wide `score_weights` default from
/// `Config`) and the required-skills penalty.
pub fn keyword_score(
    jd: &JdAnalysis,
    resume: &ParsedContent,
    compliance: &ComplianceResult,
    config_default_weights: Option<&BTreeMap<String, f64>>,
) -> f64 {
    let mut weights = default_weights();
    let override_weights = if !jd.weighting.is_empty() { Some(&jd.weighting) } else { config_default_weights };
    if let Some(override_weights) = override_weights {
        for (k, v) in override_weights {
            if let Some(slot) = weights.get_mut(k.as_str()) {
                *slot = *v;
            }
        }
        renormalize(&mut weights);
    }

    let components: BTreeMap<&'static str, f64> = BTreeMap::from([
        ("required_skills", fraction_present(&jd.required_skills, resume)),
        ("preferred_skills", fraction_present(&jd.preferred_skills, resume)),
        ("weighted_keywords", weighted_keywords_component(jd, resume)),
        ("experience_keywords", experience_keywords_component(resume)),
        ("domain_relevance", domain_relevance_component(jd, resume)),
        ("technical_depth", technical_depth_component(resume)),
        ("project_metrics", project_metrics_component(resume)),
        ("responsibilities", responsibilities_component(jd, resume)),
        ("education", education_component(compliance)),
    ]);

    let mut total = 0.0;
    for (name, weight) in &weights {
        total += weight * components.get(name).copied().unwrap_or(0.0);
    }

    let required_component = components["required_skills"];
    if required_component < 0.5 {
        total -= (0.5 - required_component) * 0.3;
    }

    total.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::requirement::RequirementOutcome;

    fn empty_compliance() -> ComplianceResult {
        ComplianceResult {
            passed: true,
            score: 1.0,
            met: vec![],
            missing: vec![],
            reason: None,
            per_requirement: Default::default(),
        }
    }

    #[test]
    fn test_all_required_skills_present_scores_full_component() {
        let mut jd = JdAnalysis::default();
        jd.required_skills = vec!["Python".into(), "Machine Learning".into()];
        let mut resume = ParsedContent::default();
        resume.canonical_skills.insert(
            "programming".into(),
            vec!["Python".into(), "Machine Learning".into()],
        );
        assert_eq!(fraction_present(&jd.required_skills, &resume), 1.0);
    }

    #[test]
    fn test_penalty_applied_when_required_component_below_half() {
        let mut jd = JdAnalysis::default();
        jd.required_skills = vec!["Python".into(), "Rust".into(), "Go".into(), "Java".into()];
        let resume = ParsedContent::default();
        let score = keyword_score(&jd, &resume, &empty_compliance(), None);
        assert!(score >= 0.0);
    }

    #[test]
    fn test_weighting_override_is_renormalized() {
        let mut jd = JdAnalysis::default();
        jd.weighting.insert("required_skills".into(), 0.9);
        jd.weighting.insert("preferred_skills".into(), 0.9);
        let mut weights = default_weights();
        for (k, v) in &jd.weighting {
            if let Some(slot) = weights.get_mut(k.as_str()) {
                *slot = *v;
            }
        }
        renormalize(&mut weights);
        let sum: f64 = weights.values().sum();
        assert!((sum - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_config_default_weights_used_only_when_jd_has_no_weighting() {
        let jd = JdAnalysis::default();
        let resume = ParsedContent::default();
        let mut config_defaults = BTreeMap::new();
        config_defaults.insert("required_skills".to_string(), 1.0);
        let with_default = keyword_score(&jd, &resume, &empty_compliance(), Some(&config_defaults));
        let without_default = keyword_score(&jd, &resume, &empty_compliance(), None);
        // An all-empty resume scores 0 either way, but the override path must
        // not panic and must still land in [0,1].
        assert!((0.0..=1.0).contains(&with_default));
        assert!((0.0..=1.0).contains(&without_default));

        let mut jd_with_own = JdAnalysis::default();
        jd_with_own.weighting.insert("preferred_skills".into(), 1.0);
        let jd_weighting_wins = keyword_score(&jd_with_own, &resume, &empty_compliance(), Some(&config_defaults));
        assert!((0.0..=1.0).contains(&jd_weighting_wins));
    }

    #[test]
    fn test_experience_keywords_matches_weighted_verbs() {
        let mut resume = ParsedContent::default();
        resume.experience_entries.push(crate::models::resume::ExperienceEntry {
            title: "Eng".into(),
            organization: None,
            description: "Led and architected the platform migration.".into(),
            start_date: None,
            end_date: None,
        });
        let score = experience_keywords_component(&resume);
        assert!(score > 0.0 && score <= 1.0);
    }

    #[test]
    fn test_experience_keywords_does_not_match_substrings_of_other_words() {
        let mut resume = ParsedContent::default();
        resume.experience_entries.push(crate::models::resume::ExperienceEntry {
            title: "Eng".into(),
            organization: None,
            description: "Enabled the rebuilt scheduled pipeline.".into(),
            start_date: None,
            end_date: None,
        });
        // "enabled" contains "led", "rebuilt" contains "built", "scheduled"
        // contains "led" too — none of these are the standalone verbs.
        let score = experience_keywords_component(&resume);
        assert_eq!(score, 0.0);
    }

    #[test]
    fn test_experience_keywords_matches_whole_word_verb_at_boundary() {
        let mut resume = ParsedContent::default();
        resume.experience_entries.push(crate::models::resume::ExperienceEntry {
            title: "Eng".into(),
            organization: None,
            description: "Built, led, and mentored the team.".into(),
            start_date: None,
            end_date: None,
        });
        let score = experience_keywords_component(&resume);
        assert!(score > 0.0);
    }
}
