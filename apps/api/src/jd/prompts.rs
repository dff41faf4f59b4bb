//! Prompt construction for the two JD-side model calls (spec §4.5).

use serde_json::json;

pub fn parse_jd_prompt(raw_text: &str) -> String {
    let payload = json!({
        "instruction": "Extract a structured analysis of this job description. \
            Return JSON with fields: role_title, seniority, required_skills (array), \
            preferred_skills (array), responsibilities (array), keywords_flat (array), \
            keywords_weighted (object of keyword -> weight), canonical_skills (object of \
            category -> array of skills), tools_tech (array), soft_skills (array), \
            years_experience_required (number or null), domain_tags (array), \
            weighting (object, optional overrides for scoring component weights).",
        "job_description": raw_text,
    });
    payload.to_string()
}

pub fn parse_compliance_prompt(raw_text: &str) -> String {
    let payload = json!({
        "instruction": "Identify the mandatory and soft (nice-to-have) requirements in this \
            job description. Return JSON shaped as {\"mandatory\": {name -> spec}, \"soft\": \
            {name -> spec}} where each spec is one of: \
            {\"type\":\"numeric\",\"min\":number,\"max\":number|null,\"unit\":string|null}, \
            {\"type\":\"list\",\"required\":[string],\"optional\":[string]}, \
            {\"type\":\"location\",\"required\":string}, \
            {\"type\":\"education\",\"required_fields\":[string],\"category\":\"it\"|\"non_it\"|null,\"allowed\":[string],\"excluded\":[string]}, \
            {\"type\":\"text\",\"key_terms\":[string]}, \
            {\"type\":\"boolean\",\"required\":boolean}. \
            Omit a requirement entirely rather than guessing a spec you are not confident about.",
        "job_description": raw_text,
    });
    payload.to_string()
}
