//! Prompt construction for the resume parse stage (spec §4.6.2).

use serde_json::json;

/// Includes the JD's domain tags (when available) so the extractor can bias
/// project `domain_relevance` scoring toward the role being filled.
pub fn parse_resume_prompt(raw_text: &str, jd_domain_tags: &[String]) -> String {
    let payload = json!({
        "instruction": "Extract a structured profile from this resume. Return JSON with fields: \
            candidate_name, years_experience (number or null), canonical_skills (object of \
            category -> array of skills), inferred_skills (array of {skill, confidence, \
            provenance}), skill_proficiency (array of {skill, level}), projects (array of \
            {name, description, tech_keywords, primary_skills, metrics}) where metrics is \
            {difficulty, novelty, skill_relevance, complexity, technical_depth, \
            domain_relevance, execution_quality} each in [0,1], experience_entries (array of \
            {title, organization, description, start_date, end_date}), education (array of \
            {field, institution, degree}), location, boolean_flags (object of \
            requirement-name -> boolean, e.g. willing_to_relocate), domain_tags (array). \
            Score each project's 7 metrics honestly relative to the described scope, not just \
            whether the section exists.",
        "job_domain_tags": jd_domain_tags,
        "resume_text": raw_text,
    });
    payload.to_string()
}
