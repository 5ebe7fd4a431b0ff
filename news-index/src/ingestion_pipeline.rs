use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use news_core::{ArticleRecord, RawArticle};

use crate::embedder::Embedder;
use crate::vector_store::{article_to_point, ArticleStore};

/// Counters from one indexing batch
#[derive(Debug, Default, Clone, PartialEq)]
pub struct IngestStats {
    pub articles_seen: usize,
    pub articles_skipped: usize,
    pub articles_indexed: usize,
}

/// Write path of the index:
/// 1. Normalizes fetched articles into indexable records
/// 2. Collapses duplicate URLs within the batch
/// 3. Embeds all surviving texts in one batched call
/// 4. Upserts into the vector store, keyed by URL
pub struct IngestionPipeline {
    embedder: Arc<Embedder>,
    store: Arc<ArticleStore>,
}

impl IngestionPipeline {
    pub fn new(embedder: Arc<Embedder>, store: Arc<ArticleStore>) -> Self {
        Self { embedder, store }
    }

    /// Normalize a fetched batch. Entries without usable text or a URL are
    /// dropped; duplicate URLs collapse to one record, last occurrence
    /// winning, first-seen order preserved. Pure, no I/O.
    pub fn prepare(raw_articles: &[RawArticle]) -> Vec<ArticleRecord> {
        let mut index_by_url: HashMap<String, usize> = HashMap::new();
        let mut records: Vec<ArticleRecord> = Vec::new();

        for record in raw_articles.iter().filter_map(RawArticle::normalize) {
            match index_by_url.get(&record.source_url) {
                Some(&idx) => records[idx] = record,
                None => {
                    index_by_url.insert(record.source_url.clone(), records.len());
                    records.push(record);
                }
            }
        }

        records
    }

    /// Embed and upsert already-normalized records. One embedding call for
    /// the whole batch; the upsert is all-or-nothing from the caller's view.
    pub async fn index_records(&self, records: Vec<ArticleRecord>) -> Result<usize> {
        if records.is_empty() {
            tracing::warn!("No articles to index");
            return Ok(0);
        }

        let texts: Vec<String> = records.iter().map(|r| r.article_text.clone()).collect();

        tracing::info!("Generating embeddings for {} articles...", texts.len());
        let embeddings = self.embedder.embed(texts).await?;

        let points = records
            .iter()
            .zip(embeddings)
            .map(|(record, embedding)| article_to_point(record, embedding))
            .collect::<Result<Vec<_>>>()?;

        let indexed = points.len();
        self.store.upsert_points(points).await?;

        tracing::info!("Indexed {} articles", indexed);
        Ok(indexed)
    }

    /// Normalize, embed and upsert one fetched batch.
    pub async fn index_batch(&self, raw_articles: &[RawArticle]) -> Result<IngestStats> {
        let records = Self::prepare(raw_articles);

        let mut stats = IngestStats {
            articles_seen: raw_articles.len(),
            articles_skipped: raw_articles.len() - records.len(),
            ..Default::default()
        };

        stats.articles_indexed = self.index_records(records).await?;

        tracing::info!(
            "Ingestion complete: {} seen, {} skipped, {} indexed",
            stats.articles_seen,
            stats.articles_skipped,
            stats.articles_indexed
        );
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(content: &str, url: &str) -> RawArticle {
        RawArticle {
            content: Some(content.to_string()),
            url: Some(url.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_prepare_skips_unusable_entries() {
        let batch = vec![
            raw("Body one.", "https://example.com/1"),
            RawArticle::default(), // no content, no url
            RawArticle {
                content: Some("   ".to_string()),
                url: Some("https://example.com/2".to_string()),
                ..Default::default()
            },
        ];

        let records = IngestionPipeline::prepare(&batch);
        assert_eq!(records.len(), 1);
        assert!(records.iter().all(|r| !r.article_text.is_empty()));
    }

    #[test]
    fn test_prepare_collapses_duplicate_urls() {
        let batch = vec![
            raw("Old body.", "https://example.com/1"),
            raw("Other article.", "https://example.com/2"),
            raw("New body.", "https://example.com/1"),
        ];

        let records = IngestionPipeline::prepare(&batch);
        assert_eq!(records.len(), 2);
        // Last occurrence wins, first-seen order preserved.
        assert_eq!(records[0].source_url, "https://example.com/1");
        assert_eq!(records[0].article_text, "New body.");
        assert_eq!(records[1].source_url, "https://example.com/2");
    }

    #[tokio::test]
    #[ignore] // Requires Qdrant running and downloads the embedding model
    async fn test_reindexing_overwrites_by_url() {
        let embedder = Arc::new(Embedder::new());
        let store = Arc::new(
            ArticleStore::connect("http://localhost:6334", "test_news_articles".to_string())
                .unwrap(),
        );
        store.ensure_collection().await.unwrap();

        let pipeline = IngestionPipeline::new(Arc::clone(&embedder), Arc::clone(&store));

        let url = "https://example.com/reindex";
        pipeline
            .index_batch(&[raw("A story about football results.", url)])
            .await
            .unwrap();
        let count_after_first = store.count().await.unwrap();

        pipeline
            .index_batch(&[raw("A story about central bank policy.", url)])
            .await
            .unwrap();
        let count_after_second = store.count().await.unwrap();

        // Same URL, same point: no duplicate row appears.
        assert_eq!(count_after_first, count_after_second);

        // The search now reflects the new content.
        let query = embedder.embed_one("central bank policy").await.unwrap();
        let hits = store.search(query, 1, None).await.unwrap();
        assert_eq!(hits.len(), 1);
    }
}
