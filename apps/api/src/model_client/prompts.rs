#![allow(dead_code)]

//! System prompt fragments shared across the four named schemas.

pub const JSON_ONLY_SYSTEM: &str = "You are a precise, structured assistant. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

pub const CANONICALIZATION_INSTRUCTION: &str = "\
    Normalize every skill mention to its canonical form (e.g. 'ML' -> 'Machine Learning', \
    'RAG' -> 'Retrieval Augmented Generation'). Use the same canonical spelling every time \
    the same skill is mentioned.";

pub fn parse_jd_system() -> String {
    format!("{JSON_ONLY_SYSTEM}\n{CANONICALIZATION_INSTRUCTION}")
}

pub fn parse_resume_system() -> String {
    format!(
        "{JSON_ONLY_SYSTEM}\n{CANONICALIZATION_INSTRUCTION}\n\
        Score each project on 7 metrics (difficulty, novelty, skill_relevance, complexity, \
        technical_depth, domain_relevance, execution_quality), each in [0,1]."
    )
}

pub fn parse_compliance_system() -> String {
    format!(
        "{JSON_ONLY_SYSTEM}\n\
        Convert the free-text mandatory and soft requirement prompts into typed requirement \
        specs. Every requirement must be one of: numeric, list, location, education, text, \
        boolean."
    )
}

pub fn rerank_system() -> String {
    format!(
        "{JSON_ONLY_SYSTEM}\n\
        You are ranking already-compliant candidates for a single job. Return an ordered list \
        restricted to the candidate_ids provided, each with an llm_rerank_score in [0,1]."
    )
}
