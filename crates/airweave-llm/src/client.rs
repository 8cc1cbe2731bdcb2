//! The chat-completion contract search nodes call against (spec §4.12):
//! query expansion, query interpretation, reranking, and answer generation
//! all go through this one trait. Generalized from `ai-client::traits::Agent`.

use async_trait::async_trait;
use serde_json::Value;

use airweave_common::error::Result;

use crate::message::Message;

#[derive(Debug, Clone, Copy)]
pub struct ChatOptions {
    pub temperature: f32,
    pub max_tokens: Option<u32>,
}

impl Default for ChatOptions {
    fn default() -> Self {
        Self {
            temperature: 0.2,
            max_tokens: None,
        }
    }
}

#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Free-form completion: used for answer generation.
    async fn complete(&self, messages: &[Message], options: ChatOptions) -> Result<String>;

    /// Completion constrained to `schema` (JSON Schema), returned already
    /// parsed: used for query expansion, interpretation, and reranking,
    /// all of which need a predictable shape back.
    async fn complete_structured(
        &self,
        messages: &[Message],
        schema: Value,
        options: ChatOptions,
    ) -> Result<Value>;
}
