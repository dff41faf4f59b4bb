//! ComplianceFilter (C7): typed requirement dispatch, gating candidates
//! before scoring (spec §4.7).

use std::collections::BTreeSet;

use crate::models::requirement::{
    ComplianceResult, EducationCategory, FilterRequirements, RequirementOutcome, RequirementSpec,
};
use crate::models::resume::ParsedContent;
use crate::models::skill::fold;

const IT_EDUCATION_FIELDS: &[&str] = &[
    "computer science",
    "cs",
    "cse",
    "computer engineering",
    "information technology",
    "it",
    "software engineering",
    "data science",
    "ai",
    "ml",
    "artificial intelligence",
];

fn words_longer_than(text: &str, min_len: usize) -> Vec<String> {
    text.split_whitespace()
        .map(|w| fold(w.trim_matches(|c: char| !c.is_alphanumeric())))
        .filter(|w| w.chars().count() > min_len)
        .collect()
}

/// The union of every surface the filter treats as "the candidate's skills",
/// normalized (spec §4.7 skill-matching source set).
fn normalized_skill_set(resume: &ParsedContent) -> BTreeSet<String> {
    resume.skill_surface().into_iter().map(|s| fold(&s)).collect()
}

fn skill_is_present(skill: &str, skill_set: &BTreeSet<String>, resume: &ParsedContent) -> bool {
    let needle = fold(skill);
    if skill_set.contains(&needle) {
        return true;
    }
    let haystack = fold(&resume.free_text());
    haystack.contains(&needle)
}

fn evaluate_numeric(min: f64, resume: &ParsedContent) -> RequirementOutcome {
    match resume.years_experience {
        Some(years) if years >= min => RequirementOutcome {
            meets: true,
            detail: format!("{years} years experience meets minimum {min}"),
        },
        Some(years) => RequirementOutcome {
            meets: false,
            detail: format!("{years} years experience below minimum {min}"),
        },
        None => RequirementOutcome {
            meets: false,
            detail: "years_experience not provided".to_string(),
        },
    }
}

fn evaluate_list(required: &[String], skill_set: &BTreeSet<String>, resume: &ParsedContent) -> RequirementOutcome {
    let missing: Vec<&String> = required
        .iter()
        .filter(|s| !skill_is_present(s, skill_set, resume))
        .collect();
    if missing.is_empty() {
        RequirementOutcome {
            meets: true,
            detail: "all required skills present".to_string(),
        }
    } else {
        RequirementOutcome {
            meets: false,
            detail: format!("missing: {}", missing.iter().map(|s| s.as_str()).collect::<Vec<_>>().join(", ")),
        }
    }
}

fn evaluate_location(required: &str, resume: &ParsedContent) -> RequirementOutcome {
    let req = fold(required);
    if req == "any" {
        return RequirementOutcome { meets: true, detail: "any location accepted".to_string() };
    }
    let candidate = resume.location.as_deref().map(fold).unwrap_or_default();
    if req == "remote" && candidate.contains("remote") {
        return RequirementOutcome { meets: true, detail: "remote matches remote".to_string() };
    }
    if candidate.is_empty() {
        return RequirementOutcome { meets: false, detail: "candidate location unknown".to_string() };
    }
    if candidate.contains(&req) || req.contains(&candidate) {
        RequirementOutcome { meets: true, detail: format!("{candidate} matches {req}") }
    } else {
        RequirementOutcome { meets: false, detail: format!("{candidate} does not match {req}") }
    }
}

fn evaluate_education(
    required_fields: &[String],
    category: Option<&EducationCategory>,
    allowed: &[String],
    excluded: &[String],
    resume: &ParsedContent,
) -> RequirementOutcome {
    let fields: Vec<String> = resume.education.iter().map(|e| fold(&e.field)).collect();

    if !excluded.is_empty() {
        for ex in excluded {
            let ex = fold(ex);
            if fields.iter().any(|f| f.contains(&ex)) {
                return RequirementOutcome { meets: false, detail: format!("excluded field matched: {ex}") };
            }
        }
    }

    if let Some(category) = category {
        let it_match = fields.iter().any(|f| IT_EDUCATION_FIELDS.iter().any(|it| f.contains(it)));
        let meets = match category {
            EducationCategory::It => it_match,
            EducationCategory::NonIt => !it_match,
        };
        return RequirementOutcome {
            meets,
            detail: format!("education category check ({category:?}): {meets}"),
        };
    }

    if !required_fields.is_empty() {
        let meets = required_fields
            .iter()
            .any(|rf| fields.iter().any(|f| f.contains(&fold(rf))));
        return RequirementOutcome {
            meets,
            detail: if meets { "required field matched".to_string() } else { "no required field matched".to_string() },
        };
    }

    if !allowed.is_empty() {
        let meets = allowed.iter().any(|a| fields.iter().any(|f| f.contains(&fold(a))));
        return RequirementOutcome {
            meets,
            detail: if meets { "allowed field matched".to_string() } else { "no allowed field matched".to_string() },
        };
    }

    RequirementOutcome { meets: true, detail: "no education constraint specified".to_string() }
}

fn evaluate_text(key_terms: &[String], resume: &ParsedContent, skill_set: &BTreeSet<String>) -> RequirementOutcome {
    let requirement_text = key_terms.join(" ");
    let terms = words_longer_than(&requirement_text, 3);
    if terms.is_empty() {
        return RequirementOutcome { meets: true, detail: "no key terms to match".to_string() };
    }

    let mut haystack = fold(&resume.free_text());
    haystack.push(' ');
    haystack.push_str(&skill_set.iter().cloned().collect::<Vec<_>>().join(" "));

    let matched = terms.iter().filter(|t| haystack.contains(t.as_str())).count();
    let ratio = matched as f64 / terms.len() as f64;
    let first_two_present = terms.len() >= 2 && haystack.contains(&terms[0]) && haystack.contains(&terms[1]);

    let meets = ratio >= 0.5 || first_two_present;
    RequirementOutcome {
        meets,
        detail: format!("{matched}/{} key terms matched", terms.len()),
    }
}

fn evaluate_boolean(name: &str, required: bool, resume: &ParsedContent) -> RequirementOutcome {
    match resume.boolean_flags.get(name) {
        Some(value) if *value == required => {
            RequirementOutcome { meets: true, detail: format!("{name}={value} matches required {required}") }
        }
        Some(value) => RequirementOutcome {
            meets: false,
            detail: format!("{name}={value} does not match required {required}"),
        },
        None => RequirementOutcome { meets: false, detail: format!("{name} not provided") },
    }
}

/// Typed dispatch over the requirement variant tag (spec §9 redesign).
pub fn evaluate_requirement(
    name: &str,
    spec: &RequirementSpec,
    resume: &ParsedContent,
    skill_set: &BTreeSet<String>,
) -> RequirementOutcome {
    match spec {
        RequirementSpec::Numeric { min, .. } => evaluate_numeric(*min, resume),
        RequirementSpec::List { required, .. } => evaluate_list(required, skill_set, resume),
        RequirementSpec::Location { required } => evaluate_location(required, resume),
        RequirementSpec::Education { required_fields, category, allowed, excluded } => {
            evaluate_education(required_fields, category.as_ref(), allowed, excluded, resume)
        }
        RequirementSpec::Text { key_terms } => evaluate_text(key_terms, resume, skill_set),
        RequirementSpec::Boolean { required } => evaluate_boolean(name, *required, resume),
    }
}

/// Runs the full mandatory/soft evaluation (spec §4.7 "Mandatory filter
/// semantics (100% strict)").
pub fn evaluate(resume: &ParsedContent, filters: &FilterRequirements) -> ComplianceResult {
    let skill_set = normalized_skill_set(resume);

    let mut met = Vec::new();
    let mut missing = Vec::new();
    let mut per_requirement = std::collections::BTreeMap::new();

    for (name, spec) in &filters.mandatory {
        let outcome = evaluate_requirement(name, spec, resume, &skill_set);
        if outcome.meets {
            met.push(name.clone());
        } else {
            missing.push(name.clone());
        }
        per_requirement.insert(name.clone(), outcome);
    }

    // Soft requirements are evaluated for display but never gate (spec §9
    // open question: display-only, no implicit scoring bonus).
    for (name, spec) in &filters.soft {
        let outcome = evaluate_requirement(name, spec, resume, &skill_set);
        per_requirement.insert(name.clone(), outcome);
    }

    let specified_count = filters.mandatory.len();
    let score = if specified_count == 0 { 1.0 } else { met.len() as f64 / specified_count as f64 };
    let passed = missing.is_empty();

    let reason = if missing.is_empty() {
        None
    } else {
        Some(
            missing
                .iter()
                .take(3)
                .filter_map(|name| per_requirement.get(name).map(|o| format!("{name}: {}", o.detail)))
                .collect::<Vec<_>>()
                .join("; "),
        )
    };

    ComplianceResult { passed, score, met, missing, reason, per_requirement }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::requirement::RequirementBlock;

    fn resume_with(years: Option<f64>, skills: Vec<&str>) -> ParsedContent {
        let mut pc = ParsedContent::default();
        pc.years_experience = years;
        pc.canonical_skills.insert(
            "programming".into(),
            skills.into_iter().map(String::from).collect(),
        );
        pc
    }

    #[test]
    fn test_scenario_a_happy_path_passes() {
        let resume = resume_with(Some(6.0), vec!["Python", "Machine Learning"]);
        let mut mandatory = RequirementBlock::new();
        mandatory.insert("experience".into(), RequirementSpec::Numeric { min: 5.0, max: None, unit: None });
        mandatory.insert(
            "hard_skills".into(),
            RequirementSpec::List { required: vec!["Python".into(), "Machine Learning".into()], optional: vec![] },
        );
        let filters = FilterRequirements { mandatory, soft: Default::default() };
        let result = evaluate(&resume, &filters);
        assert!(result.passed);
        assert_eq!(result.score, 1.0);
    }

    #[test]
    fn test_scenario_b_filtered_on_missing_skill() {
        let resume = resume_with(Some(6.0), vec!["Python"]);
        let mut mandatory = RequirementBlock::new();
        mandatory.insert(
            "hard_skills".into(),
            RequirementSpec::List { required: vec!["Python".into(), "Machine Learning".into()], optional: vec![] },
        );
        let filters = FilterRequirements { mandatory, soft: Default::default() };
        let result = evaluate(&resume, &filters);
        assert!(!result.passed);
        assert_eq!(result.missing, vec!["hard_skills".to_string()]);
    }

    #[test]
    fn test_scenario_c_max_is_never_used_for_gating() {
        let resume = resume_with(Some(12.0), vec![]);
        let mut mandatory = RequirementBlock::new();
        mandatory.insert("experience".into(), RequirementSpec::Numeric { min: 5.0, max: Some(7.0), unit: None });
        let filters = FilterRequirements { mandatory, soft: Default::default() };
        let result = evaluate(&resume, &filters);
        assert!(result.passed);
    }

    #[test]
    fn test_no_mandatory_requirements_yields_full_score() {
        let resume = resume_with(None, vec![]);
        let filters = FilterRequirements::default();
        let result = evaluate(&resume, &filters);
        assert!(result.passed);
        assert_eq!(result.score, 1.0);
    }

    #[test]
    fn test_location_matches_remote_either_direction() {
        let mut resume = ParsedContent::default();
        resume.location = Some("Remote (US)".to_string());
        let outcome = evaluate_location("remote", &resume);
        assert!(outcome.meets);
    }

    #[test]
    fn test_boolean_requirement_mismatches_when_absent() {
        let resume = ParsedContent::default();
        let outcome = evaluate_boolean("willing_to_relocate", true, &resume);
        assert!(!outcome.meets);
    }
}
