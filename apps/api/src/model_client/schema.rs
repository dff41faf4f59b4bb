//! Named structured-output schemas for `ModelClient::complete` (spec §6).
//!
//! Redesign note (spec §9): dispatch on the schema is a typed match over this
//! enum, not a string passed around and compared at call sites.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Schema {
    ParseJd,
    ParseResume,
    ParseCompliance,
    RerankCandidates,
}

impl Schema {
    pub fn name(self) -> &'static str {
        match self {
            Schema::ParseJd => "parse_jd",
            Schema::ParseResume => "parse_resume",
            Schema::ParseCompliance => "parse_compliance",
            Schema::RerankCandidates => "rerank_candidates",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_names_are_stable() {
        assert_eq!(Schema::ParseJd.name(), "parse_jd");
        assert_eq!(Schema::ParseResume.name(), "parse_resume");
        assert_eq!(Schema::ParseCompliance.name(), "parse_compliance");
        assert_eq!(Schema::RerankCandidates.name(), "rerank_candidates");
    }
}
