//! Query-length cap shared with the search pipeline (spec §4.12): queries
//! longer than ~2048 BPE tokens are rejected outright rather than silently
//! truncated, since truncation would quietly change what the user asked.

use std::sync::Arc;

use tiktoken_rs::CoreBPE;

use airweave_common::error::{AirweaveError, Result};

pub const DEFAULT_MAX_QUERY_TOKENS: usize = 2048;

pub fn check_query_token_budget(
    bpe: &Arc<CoreBPE>,
    query: &str,
    max_tokens: usize,
) -> Result<usize> {
    let count = bpe.encode_with_special_tokens(query).len();
    if count > max_tokens {
        return Err(AirweaveError::Validation(format!(
            "query is {count} tokens, exceeding the {max_tokens}-token limit"
        )));
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_queries_over_the_cap() {
        let bpe = Arc::new(tiktoken_rs::cl100k_base().unwrap());
        let long_query = "word ".repeat(3000);
        assert!(check_query_token_budget(&bpe, &long_query, DEFAULT_MAX_QUERY_TOKENS).is_err());
    }

    #[test]
    fn accepts_short_queries() {
        let bpe = Arc::new(tiktoken_rs::cl100k_base().unwrap());
        assert!(check_query_token_budget(&bpe, "what changed last week?", DEFAULT_MAX_QUERY_TOKENS).is_ok());
    }
}
