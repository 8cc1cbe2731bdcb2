//! The search operation graph (spec §4.12, C14): query expansion,
//! interpretation, embedding, temporal relevance, user filtering,
//! retrieval, reranking, and answer generation, wired into one
//! orchestrator over a pluggable [`airweave_destinations::Destination`]
//! and [`airweave_llm::ChatClient`].

pub mod answer;
pub mod config;
pub mod expansion;
pub mod interpretation;
pub mod pipeline;
pub mod rerank;

pub use config::SearchDefaults;
pub use interpretation::{FilterableField, InterpretedFilter};
pub use pipeline::{SearchPipeline, SearchPipelineRequest, SearchResponse};
