use anyhow::{bail, Context, Result};
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use news_core::EMBEDDING_DIM;
use tokio::sync::OnceCell;

/// Lazily initialized wrapper around the sentence-embedding model.
///
/// Loading the model is expensive, so it happens at most once per process:
/// the first caller initializes, concurrent callers wait on the same
/// initialization, and everyone shares the one live instance. Construct a
/// single `Embedder` at the composition root and hand out `Arc` clones.
pub struct Embedder {
    model: OnceCell<TextEmbedding>,
}

impl Embedder {
    pub fn new() -> Self {
        Self {
            model: OnceCell::new(),
        }
    }

    async fn model(&self) -> Result<&TextEmbedding> {
        self.model
            .get_or_try_init(|| async {
                tracing::info!(
                    "Loading embedding model all-MiniLM-L6-v2 ({} dimensions)...",
                    EMBEDDING_DIM
                );
                let model = TextEmbedding::try_new(InitOptions::new(
                    EmbeddingModel::AllMiniLML6V2,
                ))
                .context("embedding model unavailable")?;
                tracing::info!("Embedding model loaded");
                Ok(model)
            })
            .await
    }

    /// Embed a batch of texts: one vector per input, same order, all
    /// exactly `EMBEDDING_DIM` wide. A dimensionality mismatch is a schema
    /// violation and fails loudly.
    pub async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let count = texts.len();
        let embeddings = self
            .model()
            .await?
            .embed(texts, None)
            .context("embedding model unavailable")?;

        check_batch(&embeddings, count)?;
        Ok(embeddings)
    }

    /// Embed a single text (query-side convenience).
    pub async fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        let mut embeddings = self.embed(vec![text.to_string()]).await?;
        embeddings
            .pop()
            .context("embedding model returned no vector")
    }
}

impl Default for Embedder {
    fn default() -> Self {
        Self::new()
    }
}

/// Verify batch shape: exactly one vector per input, fixed dimensionality.
fn check_batch(embeddings: &[Vec<f32>], expected_count: usize) -> Result<()> {
    if embeddings.len() != expected_count {
        bail!(
            "embedding count mismatch: got {} vectors for {} texts",
            embeddings.len(),
            expected_count
        );
    }
    for embedding in embeddings {
        if embedding.len() != EMBEDDING_DIM {
            bail!(
                "embedding dimensionality mismatch: got {}, expected {}",
                embedding.len(),
                EMBEDDING_DIM
            );
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_check_batch_accepts_well_formed() {
        let embeddings = vec![vec![0.0; EMBEDDING_DIM]; 3];
        assert!(check_batch(&embeddings, 3).is_ok());
    }

    #[test]
    fn test_check_batch_rejects_wrong_dimension() {
        let embeddings = vec![vec![0.0; EMBEDDING_DIM - 1]];
        assert!(check_batch(&embeddings, 1).is_err());
    }

    #[test]
    fn test_check_batch_rejects_count_mismatch() {
        let embeddings = vec![vec![0.0; EMBEDDING_DIM]];
        assert!(check_batch(&embeddings, 2).is_err());
    }

    #[tokio::test]
    async fn test_embed_empty_batch_skips_model_load() {
        // Must not trigger a model download.
        let embedder = Embedder::new();
        let embeddings = embedder.embed(Vec::new()).await.unwrap();
        assert!(embeddings.is_empty());
    }

    #[tokio::test]
    #[ignore] // Downloads the embedding model on first run
    async fn test_embed_is_deterministic_and_ordered() {
        let embedder = Embedder::new();

        let first = embedder.embed_one("central bank raises rates").await.unwrap();
        let second = embedder.embed_one("central bank raises rates").await.unwrap();
        assert_eq!(first, second);

        let batch = embedder
            .embed(vec![
                "central bank raises rates".to_string(),
                "local team wins championship".to_string(),
            ])
            .await
            .unwrap();
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[0], first);
        assert_ne!(batch[0], batch[1]);
    }

    #[tokio::test]
    #[ignore] // Downloads the embedding model on first run
    async fn test_concurrent_first_use_initializes_once() {
        let embedder = Arc::new(Embedder::new());

        let mut handles = Vec::new();
        for _ in 0..8 {
            let embedder = Arc::clone(&embedder);
            handles.push(tokio::spawn(async move {
                embedder.embed_one("concurrent init probe").await.unwrap()
            }));
        }

        let mut vectors = Vec::new();
        for handle in handles {
            vectors.push(handle.await.unwrap());
        }

        // All callers observe the same working instance.
        for vector in &vectors {
            assert_eq!(vector.len(), EMBEDDING_DIM);
            assert_eq!(vector, &vectors[0]);
        }
    }
}
