//! The embedding contract (spec §4.3): a dense vector plus an optional
//! sparse vector, dimension fixed per collection. Calls to an external
//! embedding API are required to go through the per-pod limiter — that's
//! enforced by constructing every `Embedder` around a `PerPodLimiter`
//! rather than trusting callers to remember.

use async_trait::async_trait;
use std::sync::Arc;

use airweave_common::error::{AirweaveError, Result};
use airweave_ratelimit::PerPodLimiter;

use crate::chunker::ChunkConfig;

pub type SparseVector = Vec<(u32, f32)>;

#[async_trait]
pub trait Embedder: Send + Sync {
    fn vector_size(&self) -> usize;

    async fn embed_dense(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    async fn embed_sparse(&self, _texts: &[String]) -> Result<Vec<Option<SparseVector>>> {
        Ok(vec![])
    }
}

/// Calls a generic HTTP embeddings endpoint (OpenAI-shaped request/response)
/// behind the per-pod limiter.
pub struct HttpEmbedder {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    vector_size: usize,
    limiter: Arc<PerPodLimiter>,
}

impl HttpEmbedder {
    pub fn new(
        client: reqwest::Client,
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        vector_size: usize,
        limiter: Arc<PerPodLimiter>,
    ) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            model: model.into(),
            vector_size,
            limiter,
        }
    }
}

#[derive(serde::Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(serde::Deserialize)]
struct EmbedResponseRow {
    embedding: Vec<f32>,
}

#[derive(serde::Deserialize)]
struct EmbedResponse {
    data: Vec<EmbedResponseRow>,
}

#[async_trait]
impl Embedder for HttpEmbedder {
    fn vector_size(&self) -> usize {
        self.vector_size
    }

    async fn embed_dense(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        self.limiter.acquire().await?;

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&EmbedRequest {
                model: &self.model,
                input: texts,
            })
            .send()
            .await
            .map_err(|e| AirweaveError::ProviderTransient(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let kind = if status.as_u16() == 429 || status.is_server_error() {
                AirweaveError::ProviderTransient
            } else {
                AirweaveError::ProviderPermanent
            };
            return Err(kind(format!("embedding request failed with {status}")));
        }

        let parsed: EmbedResponse = response
            .json()
            .await
            .map_err(|e| AirweaveError::ProviderPermanent(e.to_string()))?;

        Ok(parsed.data.into_iter().map(|row| row.embedding).collect())
    }
}

/// Test/offline embedder producing a deterministic, dimensionally-correct
/// vector without any network call.
pub struct DeterministicEmbedder {
    vector_size: usize,
}

impl DeterministicEmbedder {
    pub fn new(vector_size: usize) -> Self {
        Self { vector_size }
    }
}

#[async_trait]
impl Embedder for DeterministicEmbedder {
    fn vector_size(&self) -> usize {
        self.vector_size
    }

    async fn embed_dense(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts
            .iter()
            .map(|text| {
                let mut v = vec![0.0f32; self.vector_size];
                for (i, byte) in text.bytes().enumerate() {
                    v[i % self.vector_size] += byte as f32;
                }
                v
            })
            .collect())
    }
}

/// Query/chunk token budget shared with the search pipeline (spec §4.12:
/// queries capped at ~2048 tokens; used here for chunk sizing defaults too).
pub fn default_chunk_config_for(vector_size: usize) -> ChunkConfig {
    // Larger embedding models tend to pair with larger context windows;
    // scale the chunk budget modestly rather than hardcoding one number.
    let max_tokens = if vector_size >= 1536 { 768 } else { 512 };
    ChunkConfig {
        max_tokens,
        overlap_tokens: max_tokens / 10,
    }
}
