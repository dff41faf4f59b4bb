//! Model-backed resume parsing (spec §4.6.2).

use std::time::Duration;

use crate::errors::AppError;
use crate::model_client::{prompts as model_prompts, schema::Schema, ModelClient};
use crate::models::resume::ParsedContent;
use crate::models::skill::normalize;

use super::prompts;

fn canonicalize(parsed: &mut ParsedContent) {
    for skills in parsed.canonical_skills.values_mut() {
        *skills = skills.iter().map(|s| normalize(s)).collect();
    }
    for inferred in parsed.inferred_skills.iter_mut() {
        inferred.skill = normalize(&inferred.skill);
    }
    for proficiency in parsed.skill_proficiency.iter_mut() {
        proficiency.skill = normalize(&proficiency.skill);
    }
    for project in parsed.projects.iter_mut() {
        project.tech_keywords = project.tech_keywords.iter().map(|s| normalize(s)).collect();
        project.primary_skills = project.primary_skills.iter().map(|s| normalize(s)).collect();
    }
}

/// Runs the parse stage: one `ModelClient::complete` call against
/// `Schema::ParseResume`, then canonicalizes every skill mention.
pub async fn parse_resume(
    model_client: &dyn ModelClient,
    raw_text: &str,
    jd_domain_tags: &[String],
    chat_deadline: Duration,
) -> Result<ParsedContent, AppError> {
    let system = model_prompts::parse_resume_system();
    let prompt = prompts::parse_resume_prompt(raw_text, jd_domain_tags);
    let value = model_client.complete(&prompt, &system, Schema::ParseResume, chat_deadline).await?;
    let mut parsed: ParsedContent =
        serde_json::from_value(value).map_err(|e| AppError::SchemaViolation(format!("parse_resume: {e}")))?;
    canonicalize(&mut parsed);
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::{json, Value};

    struct StubClient(Value);

    #[async_trait]
    impl ModelClient for StubClient {
        async fn complete(
            &self,
            _prompt: &str,
            _system: &str,
            _schema: Schema,
            _budget: Duration,
        ) -> Result<Value, crate::model_client::ModelError> {
            Ok(self.0.clone())
        }

        async fn embed(&self, _texts: &[String], _model: &str) -> Result<Vec<Vec<f32>>, crate::model_client::ModelError> {
            unimplemented!()
        }
    }

    #[tokio::test]
    async fn test_parse_resume_canonicalizes_inferred_skills() {
        let response = json!({
            "candidate_name": "Ada",
            "years_experience": 6.0,
            "canonical_skills": {},
            "inferred_skills": [{"skill": "k8s", "confidence": 0.8, "provenance": []}],
            "skill_proficiency": [],
            "projects": [],
            "experience_entries": [],
            "education": [],
            "location": null,
            "boolean_flags": {},
            "domain_tags": [],
        });
        let client = StubClient(response);
        let parsed = parse_resume(&client, "text", &[], Duration::from_secs(1)).await.unwrap();
        assert_eq!(parsed.inferred_skills[0].skill, "Kubernetes");
    }

    #[tokio::test]
    async fn test_parse_resume_rejects_malformed_response() {
        let client = StubClient(json!({"projects": "not a list"}));
        let result = parse_resume(&client, "text", &[], Duration::from_secs(1)).await;
        assert!(matches!(result, Err(AppError::SchemaViolation(_))));
    }
}
