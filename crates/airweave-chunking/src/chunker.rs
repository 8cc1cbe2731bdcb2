//! Semantic and code-aware chunkers (spec §4.3). Both split on a
//! token-counted sliding window via `tiktoken-rs`'s BPE encoder, the same
//! tokenizer family used for the query-length cap (spec §4.12), so a
//! chunk's token count and the search pipeline's token count agree.

use std::sync::Arc;

use tiktoken_rs::CoreBPE;
use uuid::Uuid;

use airweave_common::entity::{ChunkEntity, EntityCommon};

use crate::sanitize::sanitize_text;

#[derive(Debug, Clone, Copy)]
pub struct ChunkConfig {
    pub max_tokens: usize,
    pub overlap_tokens: usize,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            max_tokens: 512,
            overlap_tokens: 50,
        }
    }
}

pub trait Chunker: Send + Sync {
    fn chunk(&self, common: &EntityCommon, text: &str) -> Vec<ChunkEntity>;
}

/// Splits text into overlapping token windows, decoding each window back to
/// a string. Used for prose entities (chunks, email bodies).
pub struct SemanticChunker {
    bpe: Arc<CoreBPE>,
    config: ChunkConfig,
}

impl SemanticChunker {
    pub fn new(bpe: Arc<CoreBPE>, config: ChunkConfig) -> Self {
        Self { bpe, config }
    }

    fn windows(&self, tokens: &[usize]) -> Vec<(usize, usize)> {
        if tokens.is_empty() {
            return vec![];
        }
        let stride = self.config.max_tokens.saturating_sub(self.config.overlap_tokens).max(1);
        let mut windows = Vec::new();
        let mut start = 0;
        while start < tokens.len() {
            let end = (start + self.config.max_tokens).min(tokens.len());
            windows.push((start, end));
            if end == tokens.len() {
                break;
            }
            start += stride;
        }
        windows
    }
}

impl Chunker for SemanticChunker {
    fn chunk(&self, common: &EntityCommon, text: &str) -> Vec<ChunkEntity> {
        let clean = sanitize_text(text);
        let tokens = self.bpe.encode_with_special_tokens(&clean);
        let windows = self.windows(&tokens);

        windows
            .into_iter()
            .enumerate()
            .map(|(index, (start, end))| {
                let slice = &tokens[start..end];
                let window_text = self.bpe.decode(slice.to_vec()).unwrap_or_default();
                ChunkEntity {
                    common: common.clone(),
                    textual_representation: window_text,
                    chunk_index: Some(index as u32),
                }
            })
            .collect()
    }
}

/// Prefers splitting at blank-line boundaries (likely function/class
/// breaks) before falling back to a raw token window, so a code chunk
/// rarely cuts a function body in half.
pub struct CodeChunker {
    bpe: Arc<CoreBPE>,
    config: ChunkConfig,
}

impl CodeChunker {
    pub fn new(bpe: Arc<CoreBPE>, config: ChunkConfig) -> Self {
        Self { bpe, config }
    }
}

impl Chunker for CodeChunker {
    fn chunk(&self, common: &EntityCommon, text: &str) -> Vec<ChunkEntity> {
        let clean = sanitize_text(text);
        let blocks: Vec<&str> = clean.split("\n\n").collect();

        let mut chunks = Vec::new();
        let mut current = String::new();
        let mut current_tokens = 0usize;

        let mut flush = |buf: &mut String, idx: &mut u32, chunks: &mut Vec<ChunkEntity>| {
            if buf.trim().is_empty() {
                return;
            }
            chunks.push(ChunkEntity {
                common: common.clone(),
                textual_representation: std::mem::take(buf),
                chunk_index: Some(*idx),
            });
            *idx += 1;
        };

        let mut idx = 0u32;
        for block in blocks {
            let block_tokens = self.bpe.encode_with_special_tokens(block).len();
            if current_tokens + block_tokens > self.config.max_tokens && !current.is_empty() {
                flush(&mut current, &mut idx, &mut chunks);
                current_tokens = 0;
            }
            if !current.is_empty() {
                current.push_str("\n\n");
            }
            current.push_str(block);
            current_tokens += block_tokens;
        }
        flush(&mut current, &mut idx, &mut chunks);

        if chunks.is_empty() {
            // Fall back to the semantic chunker's raw token windows for a
            // single block with no blank-line structure at all.
            return SemanticChunker::new(self.bpe.clone(), self.config).chunk(common, text);
        }
        chunks
    }
}

pub fn stable_chunk_id(source_entity_id: &str, entity_type_id: &str, chunk_index: u32) -> Uuid {
    Uuid::new_v5(
        &Uuid::NAMESPACE_URL,
        format!("{entity_type_id}:{source_entity_id}:{chunk_index}").as_bytes(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn common() -> EntityCommon {
        EntityCommon {
            source_entity_id: "doc-1".into(),
            entity_type_id: "doc".into(),
            breadcrumbs: vec![],
            display_name: "Doc 1".into(),
            created_at: None,
            updated_at: None,
            payload: serde_json::json!({}),
            embeddable_fields: vec![],
        }
    }

    fn bpe() -> Arc<CoreBPE> {
        Arc::new(tiktoken_rs::cl100k_base().expect("bundled encoder data"))
    }

    #[test]
    fn semantic_chunker_splits_long_text_with_overlap() {
        let chunker = SemanticChunker::new(
            bpe(),
            ChunkConfig {
                max_tokens: 20,
                overlap_tokens: 5,
            },
        );
        let text = "word ".repeat(100);
        let chunks = chunker.chunk(&common(), &text);
        assert!(chunks.len() > 1);
        assert_eq!(chunks[0].chunk_index, Some(0));
    }

    #[test]
    fn semantic_chunker_single_window_for_short_text() {
        let chunker = SemanticChunker::new(bpe(), ChunkConfig::default());
        let chunks = chunker.chunk(&common(), "a short sentence");
        assert_eq!(chunks.len(), 1);
    }

    #[test]
    fn code_chunker_splits_on_blank_lines_within_budget() {
        let chunker = CodeChunker::new(
            bpe(),
            ChunkConfig {
                max_tokens: 10,
                overlap_tokens: 0,
            },
        );
        let code = "fn a() {}\n\nfn b() {}\n\nfn c() {}";
        let chunks = chunker.chunk(&common(), code);
        assert!(!chunks.is_empty());
    }

    #[test]
    fn stable_chunk_id_is_deterministic() {
        let a = stable_chunk_id("doc-1", "doc", 0);
        let b = stable_chunk_id("doc-1", "doc", 0);
        assert_eq!(a, b);
    }
}
