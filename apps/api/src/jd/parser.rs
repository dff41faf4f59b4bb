//! Model-backed JD analysis and compliance extraction (spec §4.5.2, §4.5.3).

use std::time::Duration;

use crate::errors::AppError;
use crate::model_client::{prompts as model_prompts, schema::Schema, ModelClient};
use crate::models::job::JdAnalysis;
use crate::models::requirement::FilterRequirements;
use crate::models::skill::normalize;

use super::prompts;

fn canonicalize(analysis: &mut JdAnalysis) {
    analysis.required_skills = analysis.required_skills.iter().map(|s| normalize(s)).collect();
    analysis.preferred_skills = analysis.preferred_skills.iter().map(|s| normalize(s)).collect();
    analysis.tools_tech = analysis.tools_tech.iter().map(|s| normalize(s)).collect();
    for skills in analysis.canonical_skills.values_mut() {
        *skills = skills.iter().map(|s| normalize(s)).collect();
    }
}

/// Runs the parse stage (spec §4.5.2): one `ModelClient::complete` call
/// against `Schema::ParseJd`, then canonicalizes every skill mention.
pub async fn parse_jd(model_client: &dyn ModelClient, raw_text: &str, chat_deadline: Duration) -> Result<JdAnalysis, AppError> {
    let system = model_prompts::parse_jd_system();
    let prompt = prompts::parse_jd_prompt(raw_text);
    let value = model_client.complete(&prompt, &system, Schema::ParseJd, chat_deadline).await?;
    let mut analysis: JdAnalysis =
        serde_json::from_value(value).map_err(|e| AppError::SchemaViolation(format!("parse_jd: {e}")))?;
    canonicalize(&mut analysis);
    Ok(analysis)
}

/// Runs the compliance-structuring stage (spec §4.5.3): turns the JD's
/// free-text requirements into typed `RequirementSpec`s.
pub async fn parse_compliance(
    model_client: &dyn ModelClient,
    raw_text: &str,
    chat_deadline: Duration,
) -> Result<FilterRequirements, AppError> {
    let system = model_prompts::parse_compliance_system();
    let prompt = prompts::parse_compliance_prompt(raw_text);
    let value = model_client.complete(&prompt, &system, Schema::ParseCompliance, chat_deadline).await?;
    let filters: FilterRequirements =
        serde_json::from_value(value).map_err(|e| AppError::SchemaViolation(format!("parse_compliance: {e}")))?;
    Ok(filters)
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
    async fn test_parse_jd_canonicalizes_skills() {
        let response = json!({
            "role_title": "Backend Engineer",
            "seniority": "Senior",
            "required_skills": ["py", "k8s"],
            "preferred_skills": [],
            "responsibilities": [],
            "keywords_flat": [],
            "keywords_weighted": {},
            "canonical_skills": {},
            "tools_tech": [],
            "soft_skills": [],
            "years_experience_required": 5.0,
            "domain_tags": [],
            "weighting": {},
        });
        let client = StubClient(response);
        let analysis = parse_jd(&client, "text", Duration::from_secs(1)).await.unwrap();
        assert_eq!(analysis.required_skills, vec!["Python".to_string(), "Kubernetes".to_string()]);
    }

    #[tokio::test]
    async fn test_parse_compliance_rejects_malformed_response() {
        let client = StubClient(json!({"mandatory": "not a map"}));
        let result = parse_compliance(&client, "text", Duration::from_secs(1)).await;
        assert!(matches!(result, Err(AppError::SchemaViolation(_))));
    }
}
