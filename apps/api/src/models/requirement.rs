//! Typed compliance requirement specs (spec §4.7).
//!
//! Redesign note (spec §9): the source dispatches on a dynamic dict; here the
//! dispatcher is a typed match over this enum's tag, not a string lookup.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EducationCategory {
    It,
    NonIt,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RequirementSpec {
    Numeric {
        min: f64,
        max: Option<f64>,
        #[serde(default)]
        unit: Option<String>,
    },
    List {
        required: Vec<String>,
        #[serde(default)]
        optional: Vec<String>,
    },
    Location {
        required: String,
    },
    Education {
        #[serde(default)]
        required_fields: Vec<String>,
        #[serde(default)]
        category: Option<EducationCategory>,
        #[serde(default)]
        allowed: Vec<String>,
        #[serde(default)]
        excluded: Vec<String>,
    },
    Text {
        key_terms: Vec<String>,
    },
    Boolean {
        required: bool,
    },
}

/// `{name -> spec}` block — mandatory or soft.
pub type RequirementBlock = std::collections::BTreeMap<String, RequirementSpec>;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilterRequirements {
    #[serde(default)]
    pub mandatory: RequirementBlock,
    #[serde(default)]
    pub soft: RequirementBlock,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequirementOutcome {
    pub meets: bool,
    pub detail: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComplianceResult {
    pub passed: bool,
    pub score: f64,
    pub met: Vec<String>,
    pub missing: Vec<String>,
    pub reason: Option<String>,
    pub per_requirement: std::collections::BTreeMap<String, RequirementOutcome>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_spec_round_trips() {
        let json = r#"{"type":"numeric","min":5.0,"max":7.0,"unit":"years"}"#;
        let spec: RequirementSpec = serde_json::from_str(json).unwrap();
        match spec {
            RequirementSpec::Numeric { min, max, unit } => {
                assert_eq!(min, 5.0);
                assert_eq!(max, Some(7.0));
                assert_eq!(unit.as_deref(), Some("years"));
            }
            _ => panic!("wrong variant"),
        }
    }

    #[test]
    fn test_list_spec_defaults_optional_empty() {
        let json = r#"{"type":"list","required":["Python"]}"#;
        let spec: RequirementSpec = serde_json::from_str(json).unwrap();
        match spec {
            RequirementSpec::List { required, optional } => {
                assert_eq!(required, vec!["Python".to_string()]);
                assert!(optional.is_empty());
            }
            _ => panic!("wrong variant"),
        }
    }
}
