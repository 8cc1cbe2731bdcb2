//! `search_defaults.yml` (spec §6): defaults for every tunable the search
//! pipeline exposes. Every field is required — a missing key or a
//! malformed file fails `load()` rather than silently falling back, since
//! a silently-wrong default (e.g. reranking enabled when an operator
//! meant to disable it) is worse than a startup crash.

use std::path::Path;

use serde::Deserialize;

use airweave_common::error::{AirweaveError, Result};
use airweave_destinations::SearchStrategy;

#[derive(Debug, Clone, Deserialize)]
pub struct SearchDefaults {
    pub retrieval_strategy: String,
    pub offset: u32,
    pub limit: u32,
    pub temporal_relevance: f32,
    pub expand_query: bool,
    pub interpret_filters: bool,
    pub rerank: bool,
    pub generate_answer: bool,
}

impl SearchDefaults {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref()).map_err(AirweaveError::Storage)?;
        Self::parse(&raw)
    }

    pub fn parse(raw: &str) -> Result<Self> {
        let defaults: SearchDefaults = serde_yaml::from_str(raw)
            .map_err(|e| AirweaveError::Validation(format!("search_defaults.yml: {e}")))?;
        defaults.retrieval_strategy()?;
        Ok(defaults)
    }

    pub fn retrieval_strategy(&self) -> Result<SearchStrategy> {
        parse_strategy(&self.retrieval_strategy)
    }
}

pub(crate) fn parse_strategy(name: &str) -> Result<SearchStrategy> {
    match name {
        "hybrid" => Ok(SearchStrategy::Hybrid),
        "neural" => Ok(SearchStrategy::Neural),
        "keyword" => Ok(SearchStrategy::Keyword),
        other => Err(AirweaveError::Validation(format!(
            "unknown retrieval strategy {other:?}, expected hybrid, neural, or keyword"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = r#"
retrieval_strategy: hybrid
offset: 0
limit: 20
temporal_relevance: 0.3
expand_query: true
interpret_filters: true
rerank: true
generate_answer: true
"#;

    #[test]
    fn parses_a_complete_file() {
        let defaults = SearchDefaults::parse(VALID).unwrap();
        assert_eq!(defaults.limit, 20);
        assert_eq!(defaults.retrieval_strategy().unwrap(), SearchStrategy::Hybrid);
    }

    #[test]
    fn rejects_a_missing_key() {
        let missing_limit = VALID.replace("limit: 20\n", "");
        assert!(SearchDefaults::parse(&missing_limit).is_err());
    }

    #[test]
    fn rejects_an_unknown_strategy() {
        let bad_strategy = VALID.replace("hybrid", "fuzzy");
        assert!(SearchDefaults::parse(&bad_strategy).is_err());
    }

    #[test]
    fn rejects_malformed_yaml() {
        assert!(SearchDefaults::parse("not: [valid").is_err());
    }
}
