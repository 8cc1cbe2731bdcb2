//! The search operation graph (spec §4.12): query expansion, query
//! interpretation, embed, temporal relevance, user filter, retrieval,
//! reranking, answer generation. Every optional node is independently
//! time-budgeted; a node that times out or errors falls back rather than
//! failing the whole search — the one exception is retrieval itself,
//! which the graph cannot meaningfully fall back from.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tiktoken_rs::CoreBPE;
use tracing::warn;
use uuid::Uuid;

use airweave_chunking::{check_query_token_budget, Embedder};
use airweave_common::error::Result;
use airweave_destinations::{Destination, SearchHit, SearchRequest, SearchStrategy, TemporalConfig};
use airweave_llm::ChatClient;

use crate::answer::generate_answer;
use crate::config::SearchDefaults;
use crate::expansion::expand_query;
use crate::interpretation::{interpret_filters, merge_into_filter, FilterableField, InterpretedFilter};
use crate::rerank::rerank;

const EXPANSION_WIDTH: usize = 3;
const DEFAULT_NODE_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_MAX_QUERY_TOKENS: usize = 2048;

pub struct SearchPipeline {
    chat: Arc<dyn ChatClient>,
    embedder: Arc<dyn Embedder>,
    destination: Arc<dyn Destination>,
    defaults: SearchDefaults,
    bpe: Arc<CoreBPE>,
    node_timeout: Duration,
}

#[derive(Debug, Clone, Default)]
pub struct SearchPipelineRequest {
    pub collection_id: Uuid,
    pub query: String,
    pub user_filter: Option<Value>,
    pub known_fields: Vec<FilterableField>,
    pub retrieval_strategy: Option<SearchStrategy>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
    pub temporal_field: Option<String>,
    pub expand_query: Option<bool>,
    pub interpret_filters: Option<bool>,
    pub rerank: Option<bool>,
    pub generate_answer: Option<bool>,
}

#[derive(Debug, Clone)]
pub struct SearchResponse {
    pub hits: Vec<SearchHit>,
    pub expanded_queries: Vec<String>,
    pub interpreted_filters: Vec<InterpretedFilter>,
    pub answer: Option<String>,
}

impl SearchPipeline {
    pub fn new(
        chat: Arc<dyn ChatClient>,
        embedder: Arc<dyn Embedder>,
        destination: Arc<dyn Destination>,
        defaults: SearchDefaults,
        bpe: Arc<CoreBPE>,
    ) -> Self {
        Self {
            chat,
            embedder,
            destination,
            defaults,
            bpe,
            node_timeout: DEFAULT_NODE_TIMEOUT,
        }
    }

    pub fn with_node_timeout(mut self, timeout: Duration) -> Self {
        self.node_timeout = timeout;
        self
    }

    pub async fn run(&self, request: SearchPipelineRequest) -> Result<SearchResponse> {
        check_query_token_budget(&self.bpe, &request.query, DEFAULT_MAX_QUERY_TOKENS)?;

        let do_expand = request.expand_query.unwrap_or(self.defaults.expand_query);
        let do_interpret = request.interpret_filters.unwrap_or(self.defaults.interpret_filters);
        let do_rerank = request.rerank.unwrap_or(self.defaults.rerank);
        let do_answer = request.generate_answer.unwrap_or(self.defaults.generate_answer);

        let (expanded_queries, interpreted_filters) = futures::join!(
            self.node_or_fallback(
                "query_expansion",
                if do_expand {
                    Some(expand_query(self.chat.as_ref(), &request.query, EXPANSION_WIDTH))
                } else {
                    None
                },
                vec![request.query.clone()],
            ),
            self.node_or_fallback(
                "query_interpretation",
                if do_interpret && !request.known_fields.is_empty() {
                    Some(interpret_filters(
                        self.chat.as_ref(),
                        &request.query,
                        &request.known_fields,
                        crate::interpretation::DEFAULT_CONFIDENCE_THRESHOLD,
                    ))
                } else {
                    None
                },
                vec![],
            ),
        );

        let filter = merge_into_filter(request.user_filter.clone(), &interpreted_filters);

        let queries_to_embed: Vec<String> = if expanded_queries.is_empty() {
            vec![request.query.clone()]
        } else {
            expanded_queries.clone()
        };
        let dense_vectors = self.embedder.embed_dense(&queries_to_embed).await?;
        let sparse_vectors = self.embedder.embed_sparse(&queries_to_embed).await.unwrap_or_default();

        let dense = average_vectors(&dense_vectors);
        let sparse = sparse_vectors.into_iter().flatten().next();

        let temporal = request.temporal_field.map(|field| TemporalConfig {
            weight: self.defaults.temporal_relevance,
            timestamp_field: field,
        });

        let strategy = request
            .retrieval_strategy
            .unwrap_or(self.defaults.retrieval_strategy()?);

        let search_request = SearchRequest {
            collection_id: request.collection_id,
            dense,
            sparse,
            query_text: Some(request.query.clone()),
            limit: request.limit.unwrap_or(self.defaults.limit),
            offset: request.offset.unwrap_or(self.defaults.offset),
            filter,
            strategy,
            temporal,
        };

        let hits = self.destination.search(search_request).await?;

        let hits = if do_rerank {
            self.node_or_fallback(
                "rerank",
                Some(rerank(self.chat.as_ref(), &request.query, hits.clone())),
                hits,
            )
            .await
        } else {
            hits
        };

        let answer = if do_answer {
            match tokio::time::timeout(
                self.node_timeout,
                generate_answer(self.chat.as_ref(), &request.query, &hits),
            )
            .await
            {
                Ok(Ok(text)) => Some(text),
                Ok(Err(e)) => {
                    warn!(node = "answer_generation", error = %e, "search node failed, using fallback");
                    None
                }
                Err(_) => {
                    warn!(node = "answer_generation", timeout_secs = self.node_timeout.as_secs(), "search node timed out, using fallback");
                    None
                }
            }
        } else {
            None
        };

        Ok(SearchResponse {
            hits,
            expanded_queries,
            interpreted_filters,
            answer,
        })
    }

    /// Runs an optional, time-budgeted node; any timeout or error falls
    /// back to `fallback` rather than failing the whole search.
    async fn node_or_fallback<T, F>(&self, name: &str, task: Option<F>, fallback: T) -> T
    where
        F: Future<Output = Result<T>>,
    {
        let Some(task) = task else {
            return fallback;
        };
        match tokio::time::timeout(self.node_timeout, task).await {
            Ok(Ok(value)) => value,
            Ok(Err(e)) => {
                warn!(node = name, error = %e, "search node failed, using fallback");
                fallback
            }
            Err(_) => {
                warn!(node = name, timeout_secs = self.node_timeout.as_secs(), "search node timed out, using fallback");
                fallback
            }
        }
    }
}

fn average_vectors(vectors: &[Vec<f32>]) -> Option<Vec<f32>> {
    let dim = vectors.first()?.len();
    let mut sum = vec![0.0f32; dim];
    for vector in vectors {
        for (i, value) in vector.iter().enumerate() {
            sum[i] += value;
        }
    }
    let n = vectors.len() as f32;
    Some(sum.into_iter().map(|v| v / n).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;

    use airweave_destinations::{ProcessingRequirement, RawRecord, VectorRecord};

    struct FailingChat;

    #[async_trait]
    impl ChatClient for FailingChat {
        async fn complete(&self, _messages: &[airweave_llm::Message], _options: airweave_llm::ChatOptions) -> Result<String> {
            Err(airweave_common::error::AirweaveError::ProviderPermanent("down".into()))
        }

        async fn complete_structured(
            &self,
            _messages: &[airweave_llm::Message],
            _schema: Value,
            _options: airweave_llm::ChatOptions,
        ) -> Result<Value> {
            Err(airweave_common::error::AirweaveError::ProviderPermanent("down".into()))
        }
    }

    struct StubEmbedder;

    #[async_trait]
    impl Embedder for StubEmbedder {
        fn vector_size(&self) -> usize {
            3
        }

        async fn embed_dense(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|_| vec![1.0, 0.0, 0.0]).collect())
        }
    }

    struct StubDestination;

    #[async_trait]
    impl Destination for StubDestination {
        fn processing_requirement(&self) -> ProcessingRequirement {
            ProcessingRequirement::ChunksAndEmbeddings
        }

        async fn bulk_insert(&self, _records: &[VectorRecord]) -> Result<()> {
            Ok(())
        }

        async fn bulk_insert_raw(&self, _records: &[RawRecord]) -> Result<()> {
            Ok(())
        }

        async fn bulk_delete(&self, _entity_ids: &[Uuid], _sync_id: Uuid) -> Result<()> {
            Ok(())
        }

        async fn bulk_delete_by_parent_ids(&self, _parent_ids: &[Uuid], _sync_id: Uuid) -> Result<()> {
            Ok(())
        }

        async fn delete_by_sync_id(&self, _sync_id: Uuid) -> Result<()> {
            Ok(())
        }

        async fn delete_by_collection_id(&self, _collection_id: Uuid) -> Result<()> {
            Ok(())
        }

        async fn search(&self, _request: SearchRequest) -> Result<Vec<SearchHit>> {
            Ok(vec![SearchHit {
                entity_id: Uuid::new_v4(),
                score: 0.9,
                payload: json!({ "text": "a result" }),
            }])
        }
    }

    fn defaults(expand: bool, interpret: bool, rerank: bool, answer: bool) -> SearchDefaults {
        SearchDefaults::parse(&format!(
            "retrieval_strategy: hybrid\noffset: 0\nlimit: 10\ntemporal_relevance: 0.0\n\
             expand_query: {expand}\ninterpret_filters: {interpret}\nrerank: {rerank}\ngenerate_answer: {answer}\n"
        ))
        .unwrap()
    }

    fn pipeline(defaults: SearchDefaults) -> SearchPipeline {
        SearchPipeline::new(
            Arc::new(FailingChat),
            Arc::new(StubEmbedder),
            Arc::new(StubDestination),
            defaults,
            Arc::new(tiktoken_rs::cl100k_base().unwrap()),
        )
    }

    #[tokio::test]
    async fn retrieval_still_succeeds_when_every_llm_node_fails() {
        let pipeline = pipeline(defaults(true, true, true, true));
        let request = SearchPipelineRequest {
            query: "what happened".into(),
            known_fields: vec![FilterableField {
                name: "author".into(),
                field_type: "string".into(),
                description: "doc author".into(),
            }],
            ..Default::default()
        };

        let response = pipeline.run(request).await.unwrap();
        assert_eq!(response.hits.len(), 1);
        assert_eq!(response.expanded_queries, vec!["what happened".to_string()]);
        assert!(response.interpreted_filters.is_empty());
        assert!(response.answer.is_none());
    }

    #[tokio::test]
    async fn disabled_nodes_never_call_the_chat_client() {
        let pipeline = pipeline(defaults(false, false, false, false));
        let request = SearchPipelineRequest {
            query: "anything".into(),
            ..Default::default()
        };

        let response = pipeline.run(request).await.unwrap();
        assert_eq!(response.hits.len(), 1);
        assert!(response.answer.is_none());
    }

    #[tokio::test]
    async fn oversized_query_is_rejected_before_touching_any_node() {
        let pipeline = pipeline(defaults(false, false, false, false));
        let request = SearchPipelineRequest {
            query: "word ".repeat(3000),
            ..Default::default()
        };

        assert!(pipeline.run(request).await.is_err());
    }
}
