//! Chunking, sanitization, and embedding (spec §4.3, C8).

pub mod chunker;
pub mod embedder;
pub mod query_budget;
pub mod sanitize;

pub use chunker::{stable_chunk_id, ChunkConfig, Chunker, CodeChunker, SemanticChunker};
pub use embedder::{default_chunk_config_for, DeterministicEmbedder, Embedder, HttpEmbedder, SparseVector};
pub use query_budget::{check_query_token_budget, DEFAULT_MAX_QUERY_TOKENS};
pub use sanitize::sanitize_text;
