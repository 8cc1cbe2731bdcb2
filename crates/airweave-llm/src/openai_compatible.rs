//! A `ChatClient` for any OpenAI-wire-compatible endpoint (OpenAI,
//! OpenRouter, a self-hosted vLLM gateway). Rate-gated the same way
//! `airweave_chunking::HttpEmbedder` gates embedding calls — through the
//! per-pod limiter, never the source limiter (this traffic isn't
//! attributable to a connector).

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use airweave_common::error::{AirweaveError, Result};
use airweave_ratelimit::PerPodLimiter;

use crate::client::{ChatClient, ChatOptions};
use crate::message::Message;
use crate::wire::{ChatRequest, ChatResponse, JsonSchemaFormat, ResponseFormat, WireMessage};

pub struct OpenAiCompatibleClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    limiter: Arc<PerPodLimiter>,
}

impl OpenAiCompatibleClient {
    pub fn new(
        client: reqwest::Client,
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        limiter: Arc<PerPodLimiter>,
    ) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            model: model.into(),
            limiter,
        }
    }

    async fn send(&self, request: &ChatRequest) -> Result<ChatResponse> {
        self.limiter.acquire().await?;

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await
            .map_err(map_reqwest_err)?;

        let status = response.status();
        if status.as_u16() == 429 || status.is_server_error() {
            return Err(AirweaveError::ProviderTransient(format!(
                "chat completion returned {status}"
            )));
        }
        if !status.is_success() {
            return Err(AirweaveError::ProviderPermanent(format!(
                "chat completion returned {status}"
            )));
        }

        response.json::<ChatResponse>().await.map_err(map_reqwest_err)
    }
}

#[async_trait]
impl ChatClient for OpenAiCompatibleClient {
    async fn complete(&self, messages: &[Message], options: ChatOptions) -> Result<String> {
        let request = ChatRequest {
            model: self.model.clone(),
            messages: messages.iter().map(WireMessage::from).collect(),
            temperature: Some(options.temperature),
            max_tokens: options.max_tokens,
            response_format: None,
        };

        let response = self.send(&request).await?;
        response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| AirweaveError::ProviderPermanent("empty chat completion".into()))
    }

    async fn complete_structured(
        &self,
        messages: &[Message],
        schema: Value,
        options: ChatOptions,
    ) -> Result<Value> {
        let request = ChatRequest {
            model: self.model.clone(),
            messages: messages.iter().map(WireMessage::from).collect(),
            temperature: Some(options.temperature),
            max_tokens: options.max_tokens,
            response_format: Some(ResponseFormat {
                format_type: "json_schema",
                json_schema: JsonSchemaFormat {
                    name: "structured_output",
                    strict: true,
                    schema,
                },
            }),
        };

        let response = self.send(&request).await?;
        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| AirweaveError::ProviderPermanent("empty chat completion".into()))?;

        serde_json::from_str(&content).map_err(|e| {
            AirweaveError::ProviderPermanent(format!("structured output was not valid JSON: {e}"))
        })
    }
}

fn map_reqwest_err(e: reqwest::Error) -> AirweaveError {
    if e.is_timeout() || e.is_connect() {
        AirweaveError::ProviderTransient(e.to_string())
    } else {
        AirweaveError::ProviderPermanent(e.to_string())
    }
}
