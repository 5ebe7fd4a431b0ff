use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use news_index::{ArticleStore, Embedder};
use qdrant_client::qdrant::{Condition, Filter, Range, ScoredPoint};
use serde::Serialize;
use thiserror::Error;

use crate::planner::{plan, TemporalWindow};
use crate::synthesizer::Synthesizer;

/// Number of nearest records retrieved per query.
pub const TOP_K: u64 = 5;

const NO_MATCH_ANSWER: &str = "I cannot find relevant articles matching your criteria.";
const NO_CONTENT_ANSWER: &str = "Retrieved articles do not have content.";
const DEGRADED_ANSWER: &str = "An error occurred during the search. Please try again.";

/// Rejected before any planning or I/O happens.
#[derive(Debug, Error, PartialEq)]
pub enum QueryError {
    #[error("Query cannot be empty.")]
    EmptyQuery,
}

/// A retrieved article as surfaced to the caller.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SourceArticle {
    pub title: String,
    pub content: String,
    pub url: String,
    pub published_at: String,
    pub similarity_score: f32,
}

/// Retrieval response: an answer plus the sources it was drawn from.
/// `error` carries the diagnostic detail of a degraded answer.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AnswerBundle {
    pub answer: String,
    pub sources: Vec<SourceArticle>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AnswerBundle {
    fn fixed(answer: &str, sources: Vec<SourceArticle>) -> Self {
        Self {
            answer: answer.to_string(),
            sources,
            error: None,
        }
    }
}

/// Read path: plan -> search -> dedupe -> assemble context -> synthesize.
///
/// Every failure past query validation is converted at this boundary into a
/// degraded bundle with a fixed user-readable answer; callers never see a
/// hard failure from this path.
pub struct NewsRetriever {
    embedder: Arc<Embedder>,
    store: Arc<ArticleStore>,
    synthesizer: Option<Synthesizer>,
    top_k: u64,
}

impl NewsRetriever {
    pub fn new(
        embedder: Arc<Embedder>,
        store: Arc<ArticleStore>,
        synthesizer: Option<Synthesizer>,
    ) -> Self {
        Self {
            embedder,
            store,
            synthesizer,
            top_k: TOP_K,
        }
    }

    /// Answer a free-text question from the indexed articles.
    ///
    /// The only `Err` is `QueryError::EmptyQuery`; everything downstream
    /// resolves to an `AnswerBundle`, degraded if need be.
    pub async fn answer(&self, user_query: &str) -> Result<AnswerBundle, QueryError> {
        let query = user_query.trim();
        if query.is_empty() {
            return Err(QueryError::EmptyQuery);
        }

        match self.run(query).await {
            Ok(bundle) => Ok(bundle),
            Err(e) => {
                tracing::error!("RAG search failed: {:#}", e);
                Ok(AnswerBundle {
                    answer: DEGRADED_ANSWER.to_string(),
                    sources: Vec::new(),
                    error: Some(format!("{:#}", e)),
                })
            }
        }
    }

    async fn run(&self, query: &str) -> Result<AnswerBundle> {
        let planned = plan(query);
        tracing::debug!(
            "Planned query: semantic='{}', window={:?}",
            planned.semantic_query,
            planned.window
        );

        let query_vector = self.embedder.embed_one(&planned.semantic_query).await?;
        let filter = planned.window.map(window_filter);

        let hits = self
            .store
            .search(query_vector, self.top_k, filter)
            .await
            .context("vector search failed")?;

        let sources = dedupe_by_url(hits.iter().map(source_from_hit).collect());
        tracing::info!("Retrieved {} articles ({} after dedup)", hits.len(), sources.len());

        if sources.is_empty() {
            return Ok(AnswerBundle::fixed(NO_MATCH_ANSWER, sources));
        }

        let context = build_context(&sources);
        if context.trim().is_empty() {
            return Ok(AnswerBundle::fixed(NO_CONTENT_ANSWER, sources));
        }

        let synthesizer = self
            .synthesizer
            .as_ref()
            .context("answer synthesizer is not configured (OPENAI_API_KEY is unset)")?;

        let answer = synthesizer
            .answer(&context, query)
            .await
            .context("answer synthesis failed")?;

        Ok(AnswerBundle {
            answer,
            sources,
            error: None,
        })
    }
}

/// Restrict matches to records published after the window cutoff. Records
/// without a parseable publication date carry no `published_ts` and fall
/// outside any window.
fn window_filter(window: TemporalWindow) -> Filter {
    Filter::must([Condition::range(
        "published_ts",
        Range {
            gte: Some(window.cutoff().timestamp_millis() as f64),
            ..Default::default()
        },
    )])
}

fn source_from_hit(hit: &ScoredPoint) -> SourceArticle {
    SourceArticle {
        title: payload_string(hit, "title").unwrap_or_else(|| "No Title".to_string()),
        content: payload_string(hit, "article_text").unwrap_or_default(),
        url: payload_string(hit, "source_url").unwrap_or_default(),
        published_at: payload_string(hit, "published_at").unwrap_or_else(|| "Unknown".to_string()),
        similarity_score: hit.score,
    }
}

fn payload_string(hit: &ScoredPoint, key: &str) -> Option<String> {
    hit.payload
        .get(key)
        .and_then(|v| v.kind.as_ref())
        .and_then(|kind| match kind {
            qdrant_client::qdrant::value::Kind::StringValue(s) => Some(s.clone()),
            _ => None,
        })
}

/// Collapse duplicate URLs: one entry per URL, last seen wins, first-seen
/// order preserved. URL-less entries are kept as-is.
fn dedupe_by_url(sources: Vec<SourceArticle>) -> Vec<SourceArticle> {
    let mut index_by_url: HashMap<String, usize> = HashMap::new();
    let mut deduped: Vec<SourceArticle> = Vec::new();

    for (i, source) in sources.into_iter().enumerate() {
        let key = if source.url.is_empty() {
            format!("no_url_{}", i)
        } else {
            source.url.clone()
        };

        match index_by_url.get(&key) {
            Some(&idx) => deduped[idx] = source,
            None => {
                index_by_url.insert(key, deduped.len());
                deduped.push(source);
            }
        }
    }

    deduped
}

/// One block per article: title, colon, content (placeholder when blank),
/// blocks separated by blank lines.
fn build_context(sources: &[SourceArticle]) -> String {
    sources
        .iter()
        .map(|s| {
            let body = if s.content.trim().is_empty() {
                "No content"
            } else {
                s.content.trim()
            };
            format!("{}: {}", s.title, body)
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(url: &str, content: &str) -> SourceArticle {
        SourceArticle {
            title: "Title".to_string(),
            content: content.to_string(),
            url: url.to_string(),
            published_at: "Unknown".to_string(),
            similarity_score: 0.5,
        }
    }

    fn retriever() -> NewsRetriever {
        let embedder = Arc::new(Embedder::new());
        let store = Arc::new(
            ArticleStore::connect("http://localhost:6334", "test_news_articles".to_string())
                .unwrap(),
        );
        NewsRetriever::new(embedder, store, None)
    }

    #[tokio::test]
    async fn test_empty_query_rejected_before_any_search() {
        // No Qdrant and no model are running here: validation must fire first.
        let retriever = retriever();
        assert_eq!(retriever.answer("").await, Err(QueryError::EmptyQuery));
        assert_eq!(retriever.answer("   ").await, Err(QueryError::EmptyQuery));
    }

    #[test]
    fn test_dedupe_keeps_one_entry_per_url() {
        let deduped = dedupe_by_url(vec![
            source("https://example.com/1", "old"),
            source("https://example.com/2", "other"),
            source("https://example.com/1", "new"),
        ]);

        assert_eq!(deduped.len(), 2);
        // Last seen wins, first-seen order preserved.
        assert_eq!(deduped[0].url, "https://example.com/1");
        assert_eq!(deduped[0].content, "new");
        assert_eq!(deduped[1].url, "https://example.com/2");
    }

    #[test]
    fn test_dedupe_keeps_url_less_entries() {
        let deduped = dedupe_by_url(vec![source("", "a"), source("", "b")]);
        assert_eq!(deduped.len(), 2);
    }

    #[test]
    fn test_build_context_format_and_placeholder() {
        let context = build_context(&[
            source("https://example.com/1", "Body text."),
            source("https://example.com/2", "  "),
        ]);

        assert_eq!(context, "Title: Body text.\n\nTitle: No content");
    }

    #[test]
    fn test_window_filter_uses_published_ts() {
        let filter = window_filter(TemporalWindow::PastWeek);
        assert_eq!(filter.must.len(), 1);
    }

    #[test]
    fn test_bundle_serialization_omits_absent_error() {
        let bundle = AnswerBundle::fixed(NO_MATCH_ANSWER, Vec::new());
        let json = serde_json::to_string(&bundle).unwrap();
        assert!(json.contains("\"answer\""));
        assert!(json.contains("\"sources\":[]"));
        assert!(!json.contains("\"error\""));
    }

    #[tokio::test]
    #[ignore] // May download the embedding model on first run
    async fn test_zero_hits_returns_fixed_answer() {
        // Requires Qdrant running: an empty collection yields zero hits,
        // which is a normal outcome, not an error.
        let store = Arc::new(
            ArticleStore::connect("http://localhost:6334", "test_news_zero_hits".to_string())
                .unwrap(),
        );
        store.ensure_collection().await.unwrap();

        let retriever = NewsRetriever::new(Arc::new(Embedder::new()), store, None);

        let bundle = retriever
            .answer("past week quantum basket weaving results")
            .await
            .unwrap();
        assert_eq!(bundle.answer, NO_MATCH_ANSWER);
        assert!(bundle.sources.is_empty());
        assert!(bundle.error.is_none());
    }

    #[tokio::test]
    #[ignore] // May download the embedding model on first run
    async fn test_unreachable_dependency_degrades_not_fails() {
        // The store points at a closed port; depending on the environment
        // either the model load or the search fails first. Both must come
        // back as the fixed degraded answer, never as a hard failure.
        let retriever = NewsRetriever {
            embedder: Arc::new(Embedder::new()),
            store: Arc::new(
                ArticleStore::connect("http://127.0.0.1:1", "none".to_string()).unwrap(),
            ),
            synthesizer: None,
            top_k: TOP_K,
        };

        let bundle = match retriever.answer("anything at all").await {
            Ok(bundle) => bundle,
            Err(_) => unreachable!("non-empty query must not be rejected"),
        };
        assert_eq!(bundle.answer, DEGRADED_ANSWER);
        assert!(bundle.sources.is_empty());
        assert!(bundle.error.is_some());
    }
}
