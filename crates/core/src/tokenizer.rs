//! Pluggable token/word counting for context-budget allocation.
//!
//! `WordCountTokenizer` is the one the hybrid-retrieval context assembler
//! actually uses — a plain whitespace split, not a BPE or byte estimate.
//! `BytesEstimateTokenizer` and the optional `TiktokenTokenizer` are also
//! provided for callers that want a cheap estimate or an LLM-accurate count
//! instead.

use std::sync::Arc;

pub trait Tokenizer: Send + Sync {
    fn count_tokens(&self, text: &str) -> usize;
    fn name(&self) -> &str;
}

/// Plain whitespace-split word count.
pub struct WordCountTokenizer;

impl Tokenizer for WordCountTokenizer {
    fn count_tokens(&self, text: &str) -> usize {
        text.split_whitespace().count()
    }
    fn name(&self) -> &str {
        "word-count"
    }
}

/// Fast bytes/3 estimation, no dependencies.
pub struct BytesEstimateTokenizer;

impl Tokenizer for BytesEstimateTokenizer {
    fn count_tokens(&self, text: &str) -> usize {
        text.len().div_ceil(3)
    }
    fn name(&self) -> &str {
        "bytes-estimate"
    }
}

#[cfg(feature = "tiktoken")]
pub struct TiktokenTokenizer {
    bpe: tiktoken_rs::CoreBPE,
}

#[cfg(feature = "tiktoken")]
impl TiktokenTokenizer {
    pub fn new() -> Self {
        Self { bpe: tiktoken_rs::cl100k_base().unwrap() }
    }
}

#[cfg(feature = "tiktoken")]
impl Tokenizer for TiktokenTokenizer {
    fn count_tokens(&self, text: &str) -> usize {
        self.bpe.encode_with_special_tokens(text).len()
    }
    fn name(&self) -> &str {
        "tiktoken"
    }
}

/// Create a tokenizer by name, falling back to the word-count tokenizer
/// for unknown names (since that's the default the retrieval pipeline
/// expects).
pub fn create_tokenizer(name: &str) -> Arc<dyn Tokenizer> {
    match name {
        "bytes-estimate" => Arc::new(BytesEstimateTokenizer),
        #[cfg(feature = "tiktoken")]
        "tiktoken" => Arc::new(TiktokenTokenizer::new()),
        _ => Arc::new(WordCountTokenizer),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn word_count_matches_python_split_semantics() {
        let t = WordCountTokenizer;
        assert_eq!(t.count_tokens("the quick brown fox"), 4);
        assert_eq!(t.count_tokens("  leading  and   trailing  "), 2);
        assert_eq!(t.count_tokens(""), 0);
    }
}
