//! Reranking node (spec §4.12 step 7): reorder retrieved candidates with
//! an LLM rubric. Capped to the top ~1000 candidates so the reorder
//! prompt stays bounded regardless of how many hits retrieval returned.

use serde_json::{json, Value};

use airweave_common::error::Result;
use airweave_destinations::SearchHit;
use airweave_llm::{ChatClient, ChatOptions, Message};

pub const MAX_RERANK_CANDIDATES: usize = 1000;

fn schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "order": {
                "type": "array",
                "items": { "type": "integer" },
            }
        },
        "required": ["order"],
    })
}

/// Reorders `hits` in place of relevance to `query`. Candidates past
/// [`MAX_RERANK_CANDIDATES`] keep their retrieval-order position at the
/// tail, untouched by the rubric.
pub async fn rerank(chat: &dyn ChatClient, query: &str, hits: Vec<SearchHit>) -> Result<Vec<SearchHit>> {
    if hits.len() <= 1 {
        return Ok(hits);
    }

    let split = hits.len().min(MAX_RERANK_CANDIDATES);
    let (head, tail) = hits.split_at(split);
    let tail = tail.to_vec();

    let candidates: Vec<Value> = head
        .iter()
        .enumerate()
        .map(|(i, hit)| json!({ "index": i, "payload": hit.payload }))
        .collect();

    let messages = [
        Message::system(
            "Rank the candidates by relevance to the query, most relevant first. Respond \
             with every candidate index exactly once.",
        ),
        Message::user(format!(
            "Query: {query}\nCandidates: {}",
            serde_json::to_string(&candidates).unwrap_or_default()
        )),
    ];

    let order = match chat.complete_structured(&messages, schema(), ChatOptions::default()).await {
        Ok(output) => output
            .get("order")
            .and_then(Value::as_array)
            .map(|arr| arr.iter().filter_map(Value::as_u64).map(|i| i as usize).collect::<Vec<_>>())
            .unwrap_or_default(),
        Err(_) => vec![],
    };

    let mut by_index: Vec<Option<SearchHit>> = head.iter().cloned().map(Some).collect();
    let mut reordered = Vec::with_capacity(hits.len());
    let mut seen = vec![false; by_index.len()];

    for index in order {
        if index < by_index.len() && !seen[index] {
            if let Some(hit) = by_index[index].take() {
                reordered.push(hit);
                seen[index] = true;
            }
        }
    }

    // A malformed or partial ranking still yields every candidate: anything
    // the model didn't account for keeps its original relative order.
    for (hit, already) in by_index.into_iter().zip(seen) {
        if !already {
            if let Some(hit) = hit {
                reordered.push(hit);
            }
        }
    }

    reordered.extend(tail);
    Ok(reordered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use uuid::Uuid;

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

    fn hit(score: f32) -> SearchHit {
        SearchHit {
            entity_id: Uuid::new_v4(),
            score,
            payload: json!({ "score": score }),
        }
    }

    #[tokio::test]
    async fn applies_a_valid_reorder() {
        let hits = vec![hit(0.1), hit(0.2), hit(0.3)];
        let chat = StubChat(json!({ "order": [2, 0, 1] }));
        let reordered = rerank(&chat, "q", hits.clone()).await.unwrap();
        assert_eq!(reordered[0].entity_id, hits[2].entity_id);
        assert_eq!(reordered[1].entity_id, hits[0].entity_id);
        assert_eq!(reordered[2].entity_id, hits[1].entity_id);
    }

    #[tokio::test]
    async fn falls_back_to_retrieval_order_on_a_malformed_ranking() {
        let hits = vec![hit(0.1), hit(0.2), hit(0.3)];
        let chat = StubChat(json!({ "order": [99] }));
        let reordered = rerank(&chat, "q", hits.clone()).await.unwrap();
        assert_eq!(reordered.len(), 3);
        assert_eq!(reordered[0].entity_id, hits[0].entity_id);
    }

    #[tokio::test]
    async fn single_hit_skips_the_llm_call() {
        let hits = vec![hit(0.5)];
        let chat = StubChat(json!({ "order": [] }));
        let reordered = rerank(&chat, "q", hits.clone()).await.unwrap();
        assert_eq!(reordered.len(), 1);
    }
}
