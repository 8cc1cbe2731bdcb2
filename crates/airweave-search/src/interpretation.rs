//! Query interpretation node (spec §4.12 step 2): extract structured
//! filter fragments from natural language against a caller-supplied
//! schema of filterable fields. Each fragment carries a confidence;
//! fragments below the threshold are dropped rather than risking a wrong
//! filter silently narrowing results.

use serde_json::{json, Value};

use airweave_common::error::{AirweaveError, Result};
use airweave_llm::{ChatClient, ChatOptions, Message};

/// A field the caller allows the interpreter to filter on.
#[derive(Debug, Clone)]
pub struct FilterableField {
    pub name: String,
    pub field_type: String,
    pub description: String,
}

#[derive(Debug, Clone)]
pub struct InterpretedFilter {
    pub field: String,
    pub value: Value,
    pub confidence: f32,
}

/// Default floor below which an extracted filter is ignored (spec leaves
/// the exact number open; 0.5 treats a coin-flip-confidence guess as not
/// worth applying).
pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.5;

fn schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "filters": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "field": { "type": "string" },
                        "value": {},
                        "confidence": { "type": "number" },
                    },
                    "required": ["field", "value", "confidence"],
                }
            }
        },
        "required": ["filters"],
    })
}

pub async fn interpret_filters(
    chat: &dyn ChatClient,
    query: &str,
    known_fields: &[FilterableField],
    confidence_threshold: f32,
) -> Result<Vec<InterpretedFilter>> {
    if known_fields.is_empty() {
        return Ok(vec![]);
    }

    let field_descriptions: Vec<String> = known_fields
        .iter()
        .map(|f| format!("- {} ({}): {}", f.name, f.field_type, f.description))
        .collect();

    let messages = [
        Message::system(
            "Extract structured filter fragments implied by the user's query, using only \
             the known filterable fields. Assign each a confidence in [0, 1]. If nothing in \
             the query maps to a known field, return an empty list.",
        ),
        Message::user(format!(
            "Known fields:\n{}\n\nQuery: {query}",
            field_descriptions.join("\n")
        )),
    ];

    let output = chat
        .complete_structured(&messages, schema(), ChatOptions::default())
        .await?;

    let filters = output
        .get("filters")
        .and_then(Value::as_array)
        .ok_or_else(|| AirweaveError::ProviderPermanent("filter interpretation returned no filters array".into()))?;

    let known_names: std::collections::HashSet<&str> =
        known_fields.iter().map(|f| f.name.as_str()).collect();

    let mut accepted = Vec::new();
    for entry in filters {
        let Some(field) = entry.get("field").and_then(Value::as_str) else {
            continue;
        };
        if !known_names.contains(field) {
            continue;
        }
        let confidence = entry.get("confidence").and_then(Value::as_f64).unwrap_or(0.0) as f32;
        if confidence < confidence_threshold {
            continue;
        }
        let Some(value) = entry.get("value") else {
            continue;
        };
        accepted.push(InterpretedFilter {
            field: field.to_string(),
            value: value.clone(),
            confidence,
        });
    }
    Ok(accepted)
}

/// Folds accepted filter fragments into a Qdrant-shaped `must` filter,
/// merging with any caller-supplied filter.
pub fn merge_into_filter(base: Option<Value>, fragments: &[InterpretedFilter]) -> Option<Value> {
    if fragments.is_empty() {
        return base;
    }

    let mut must: Vec<Value> = base
        .as_ref()
        .and_then(|f| f.get("must"))
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    for fragment in fragments {
        must.push(json!({ "key": fragment.field, "match": { "value": fragment.value } }));
    }

    Some(json!({ "must": must }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct StubChat(Value);

    #[async_trait]
    impl ChatClient for StubChat {
        async fn complete(&self, _messages: &[Message], _options: ChatOptions) -> Result<String> {
            unreachable!()
        }

        async fn complete_structured(
            &self,
            _messages: &[Message],
            _schema: Value,
            _options: ChatOptions,
        ) -> Result<Value> {
            Ok(self.0.clone())
        }
    }

    fn fields() -> Vec<FilterableField> {
        vec![FilterableField {
            name: "author".into(),
            field_type: "string".into(),
            description: "the document author".into(),
        }]
    }

    #[tokio::test]
    async fn no_known_fields_skips_the_llm_call_entirely() {
        let chat = StubChat(json!({ "filters": [] }));
        let result = interpret_filters(&chat, "anything", &[], DEFAULT_CONFIDENCE_THRESHOLD)
            .await
            .unwrap();
        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn drops_low_confidence_fragments() {
        let chat = StubChat(json!({
            "filters": [{ "field": "author", "value": "alice", "confidence": 0.1 }]
        }));
        let result = interpret_filters(&chat, "docs by alice", &fields(), DEFAULT_CONFIDENCE_THRESHOLD)
            .await
            .unwrap();
        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn drops_fragments_for_unknown_fields() {
        let chat = StubChat(json!({
            "filters": [{ "field": "color", "value": "red", "confidence": 0.9 }]
        }));
        let result = interpret_filters(&chat, "red docs", &fields(), DEFAULT_CONFIDENCE_THRESHOLD)
            .await
            .unwrap();
        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn accepts_a_confident_known_fragment() {
        let chat = StubChat(json!({
            "filters": [{ "field": "author", "value": "alice", "confidence": 0.9 }]
        }));
        let result = interpret_filters(&chat, "docs by alice", &fields(), DEFAULT_CONFIDENCE_THRESHOLD)
            .await
            .unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].field, "author");
    }

    #[test]
    fn merge_is_identity_when_no_fragments_survive() {
        let base = Some(json!({ "must": [{ "key": "x", "match": { "value": 1 } }] }));
        assert_eq!(merge_into_filter(base.clone(), &[]), base);
    }

    #[test]
    fn merge_appends_fragments_to_an_existing_filter() {
        let base = Some(json!({ "must": [{ "key": "x", "match": { "value": 1 } }] }));
        let fragments = vec![InterpretedFilter {
            field: "author".into(),
            value: json!("alice"),
            confidence: 0.9,
        }];
        let merged = merge_into_filter(base, &fragments).unwrap();
        assert_eq!(merged["must"].as_array().unwrap().len(), 2);
    }
}
