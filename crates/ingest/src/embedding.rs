//! `EmbeddingProvider` trait and the FastEmbed-backed implementation. A
//! single configurable model (`EMBEDDING_MODEL`/`EMBEDDING_DIM`) is loaded
//! once per process; no device-selection or multi-model preset table is
//! needed beyond that.

use async_trait::async_trait;
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use hybridrag_core::error::{RagError, Result};
use std::sync::Mutex;

#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Default batches sequentially; override for native batch support.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            out.push(self.embed(text).await?);
        }
        Ok(out)
    }

    fn dimensions(&self) -> usize;

    /// Provenance tag stamped onto every `VectorRecord` this provider
    /// produces.
    fn name(&self) -> &str;
}

fn resolve_fastembed_model(name: &str) -> EmbeddingModel {
    match name {
        "bge-small-en" | "bge-small" => EmbeddingModel::BGESmallENV15,
        "bge-base-en" | "bge-base" => EmbeddingModel::BGEBaseENV15,
        _ => EmbeddingModel::AllMiniLML6V2,
    }
}

/// Local ONNX embedding provider. `TextEmbedding` is not `Sync`-safe for
/// concurrent `embed()` calls without internal locking, so a `Mutex`
/// serializes inference through a single process-wide embedding queue.
pub struct FastEmbedProvider {
    model: Mutex<TextEmbedding>,
    dimensions: usize,
    name: String,
}

impl FastEmbedProvider {
    pub fn new(model_name: &str, dimensions: usize) -> Result<Self> {
        let model_enum = resolve_fastembed_model(model_name);
        let model = TextEmbedding::try_new(InitOptions::new(model_enum))
            .map_err(|e| RagError::Embedding { provider: model_name.to_string(), message: e.to_string() })?;
        Ok(Self { model: Mutex::new(model), dimensions, name: model_name.to_string() })
    }
}

#[async_trait]
impl EmbeddingProvider for FastEmbedProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let vectors = self.embed_batch(std::slice::from_ref(&text.to_string())).await?;
        vectors.into_iter().next().ok_or_else(|| RagError::Embedding {
            provider: "fastembed".to_string(),
            message: "embedding model returned no vectors".to_string(),
        })
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let model = self.model.lock().unwrap();
        model
            .embed(texts.to_vec(), None)
            .map_err(|e| RagError::Embedding { provider: "fastembed".to_string(), message: e.to_string() })
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Deterministic embedding stand-in for tests: hashes each token into a
/// fixed-width vector so the same text always embeds to the same point.
pub struct DeterministicEmbeddingProvider {
    pub dimensions: usize,
}

#[async_trait]
impl EmbeddingProvider for DeterministicEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vector = vec![0.0f32; self.dimensions];
        for (i, word) in text.split_whitespace().enumerate() {
            let bucket = (word.len() + i) % self.dimensions;
            vector[bucket] += 1.0;
        }
        let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut vector {
                *v /= norm;
            }
        }
        Ok(vector)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn name(&self) -> &str {
        "deterministic-test-embedder"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn deterministic_provider_is_stable_for_same_text() {
        let provider = DeterministicEmbeddingProvider { dimensions: 8 };
        let a = provider.embed("hello world").await.unwrap();
        let b = provider.embed("hello world").await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn embed_batch_default_impl_matches_sequential_embed() {
        let provider = DeterministicEmbeddingProvider { dimensions: 8 };
        let batch = provider.embed_batch(&["a".to_string(), "b c".to_string()]).await.unwrap();
        assert_eq!(batch[0], provider.embed("a").await.unwrap());
        assert_eq!(batch[1], provider.embed("b c").await.unwrap());
    }
}
