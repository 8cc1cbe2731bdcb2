//! Answer generation node (spec §4.12 step 8): a grounded, free-form
//! completion over the retrieved hits, citing sources inline as
//! `[[entity_id]]` so a caller can resolve citations back to the hits
//! that produced them.

use airweave_common::error::Result;
use airweave_destinations::SearchHit;
use airweave_llm::{ChatClient, ChatOptions, Message};

pub async fn generate_answer(chat: &dyn ChatClient, query: &str, hits: &[SearchHit]) -> Result<String> {
    let context: Vec<String> = hits
        .iter()
        .map(|hit| format!("[[{}]]: {}", hit.entity_id, hit.payload))
        .collect();

    let messages = [
        Message::system(
            "Answer the user's question using only the given sources. Cite every claim \
             inline with the source's [[entity_id]] marker. If the sources don't answer \
             the question, say so plainly.",
        ),
        Message::user(format!("Question: {query}\n\nSources:\n{}", context.join("\n"))),
    ];

    chat.complete(&messages, ChatOptions::default()).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use uuid::Uuid;

    struct StubChat;

    #[async_trait]
    impl ChatClient for StubChat {
        async fn complete(&self, messages: &[Message], _options: ChatOptions) -> Result<String> {
            Ok(messages.last().unwrap().content.clone())
        }

        async fn complete_structured(
            &self,
            _messages: &[Message],
            _schema: Value,
            _options: ChatOptions,
        ) -> Result<Value> {
            unreachable!()
        }
    }

    #[tokio::test]
    async fn prompt_includes_every_hit_as_a_cited_source() {
        let id = Uuid::new_v4();
        let hits = vec![SearchHit {
            entity_id: id,
            score: 1.0,
            payload: json!({ "text": "the answer" }),
        }];
        let prompt = generate_answer(&StubChat, "what happened?", &hits).await.unwrap();
        assert!(prompt.contains(&id.to_string()));
    }
}
