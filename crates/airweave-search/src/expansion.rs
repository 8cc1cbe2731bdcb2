//! Query expansion node (spec §4.12 step 1): ask the chat model for K
//! alternate phrasings of the same question, to widen recall before
//! retrieval. The original query is always included so a failed or
//! degenerate expansion never loses it.

use serde_json::{json, Value};

use airweave_common::error::{AirweaveError, Result};
use airweave_llm::{ChatClient, ChatOptions, Message};

fn schema(k: usize) -> Value {
    json!({
        "type": "object",
        "properties": {
            "phrasings": {
                "type": "array",
                "items": { "type": "string" },
                "minItems": 1,
                "maxItems": k,
            }
        },
        "required": ["phrasings"],
    })
}

pub async fn expand_query(chat: &dyn ChatClient, query: &str, k: usize) -> Result<Vec<String>> {
    if k == 0 {
        return Ok(vec![query.to_string()]);
    }

    let messages = [
        Message::system(
            "Rewrite the user's search query into alternate phrasings that preserve its \
             meaning but vary word choice and structure, to widen search recall.",
        ),
        Message::user(format!("Query: {query}\nGenerate up to {k} alternate phrasings.")),
    ];

    let output = chat
        .complete_structured(&messages, schema(k), ChatOptions::default())
        .await?;

    let phrasings = output
        .get("phrasings")
        .and_then(Value::as_array)
        .ok_or_else(|| AirweaveError::ProviderPermanent("query expansion returned no phrasings array".into()))?;

    let mut expanded: Vec<String> = vec![query.to_string()];
    for phrasing in phrasings {
        if let Some(text) = phrasing.as_str() {
            if !text.trim().is_empty() && text != query {
                expanded.push(text.to_string());
            }
        }
    }
    Ok(expanded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct StubChat(Value);

    #[async_trait]
    impl ChatClient for StubChat {
        async fn complete(&self, _messages: &[Message], _options: ChatOptions) -> Result<String> {
            unreachable!("expansion only calls complete_structured")
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

    #[tokio::test]
    async fn zero_k_returns_only_the_original_query() {
        let chat = StubChat(json!({ "phrasings": [] }));
        let expanded = expand_query(&chat, "what changed yesterday", 0).await.unwrap();
        assert_eq!(expanded, vec!["what changed yesterday".to_string()]);
    }

    #[tokio::test]
    async fn dedups_a_phrasing_identical_to_the_original() {
        let chat = StubChat(json!({ "phrasings": ["q", "a rewrite"] }));
        let expanded = expand_query(&chat, "q", 2).await.unwrap();
        assert_eq!(expanded, vec!["q".to_string(), "a rewrite".to_string()]);
    }
}
