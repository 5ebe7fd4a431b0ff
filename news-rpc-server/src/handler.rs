use std::sync::Arc;
use std::time::Instant;

use news_answer::{AnswerBundle, NewsRetriever, QueryError};
use news_index::{ArticleStore, IngestionPipeline};

use crate::error::RpcError;
use crate::protocol::*;

/// Handler for news RAG methods
pub struct NewsHandler {
    pipeline: Arc<IngestionPipeline>,
    retriever: Arc<NewsRetriever>,
    store: Arc<ArticleStore>,
}

impl NewsHandler {
    pub fn new(
        pipeline: Arc<IngestionPipeline>,
        retriever: Arc<NewsRetriever>,
        store: Arc<ArticleStore>,
    ) -> Self {
        Self {
            pipeline,
            retriever,
            store,
        }
    }

    /// Handle a news.ask request. Empty queries are rejected here with a
    /// validation error; every downstream failure comes back inside the
    /// bundle as a degraded answer.
    pub async fn handle_ask(&self, params: AskRequest) -> Result<AnswerBundle, RpcError> {
        let query_start = Instant::now();

        let bundle = self
            .retriever
            .answer(&params.query)
            .await
            .map_err(|e| match e {
                QueryError::EmptyQuery => RpcError::EmptyQuery,
            })?;

        tracing::info!(
            "news.ask completed: sources={}, degraded={}, duration={}ms",
            bundle.sources.len(),
            bundle.error.is_some(),
            query_start.elapsed().as_millis()
        );

        Ok(bundle)
    }

    /// Handle a news.index request: normalize now, embed and upsert in a
    /// spawned task. The response only reports what was scheduled; the
    /// caller never observes indexing success or failure.
    pub async fn handle_index(&self, params: IndexRequest) -> Result<IndexResponse, RpcError> {
        let records = IngestionPipeline::prepare(&params.articles);
        let queued = records.len();

        if queued == 0 {
            tracing::info!(
                "news.index: nothing usable in {} articles",
                params.articles.len()
            );
            return Ok(IndexResponse { queued });
        }

        let pipeline = Arc::clone(&self.pipeline);
        tokio::spawn(async move {
            match pipeline.index_records(records).await {
                Ok(indexed) => tracing::info!("Background indexing done: {} articles", indexed),
                Err(e) => tracing::error!("Background indexing failed: {:#}", e),
            }
        });

        tracing::info!("Queued {} articles for background indexing", queued);
        Ok(IndexResponse { queued })
    }

    /// Handle a news.count request (administrative).
    pub async fn handle_count(&self) -> Result<CountResponse, RpcError> {
        let row_count = self
            .store
            .count()
            .await
            .map_err(|e| RpcError::StoreError(format!("{:#}", e)))?;

        Ok(CountResponse { row_count })
    }
}
