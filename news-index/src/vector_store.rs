use anyhow::{bail, Context, Result};
use news_core::{ArticleRecord, EMBEDDING_DIM};
use qdrant_client::qdrant::{
    CountPointsBuilder, CreateCollectionBuilder, Distance, Filter, PointStruct, ScoredPoint,
    SearchPointsBuilder, UpsertPointsBuilder, VectorParamsBuilder,
};
use qdrant_client::Qdrant;
use uuid::Uuid;

/// Qdrant-backed store for article records.
///
/// Owns the collection schema and the upsert/search primitives. The point
/// ID is derived from the source URL, so writing the same URL twice
/// overwrites rather than duplicates.
pub struct ArticleStore {
    client: Qdrant,
    collection_name: String,
}

impl ArticleStore {
    /// Build the Qdrant client. Cheap and connectionless until the first
    /// call, so constructing more than once is harmless.
    pub fn connect(qdrant_url: &str, collection_name: String) -> Result<Self> {
        let client = Qdrant::from_url(qdrant_url).build()?;

        tracing::info!("Connecting to Qdrant at {}", qdrant_url);

        Ok(Self {
            client,
            collection_name,
        })
    }

    /// Create the collection if it does not exist; leave it untouched if it
    /// does. Idempotent, safe to call on every process start.
    pub async fn ensure_collection(&self) -> Result<()> {
        let exists = self
            .client
            .collection_exists(&self.collection_name)
            .await
            .context("failed to check collection existence")?;

        if exists {
            tracing::info!("Qdrant collection '{}' already exists", self.collection_name);
            return Ok(());
        }

        self.client
            .create_collection(
                CreateCollectionBuilder::new(&self.collection_name).vectors_config(
                    VectorParamsBuilder::new(EMBEDDING_DIM as u64, Distance::Euclid),
                ),
            )
            .await
            .context("failed to create collection")?;

        tracing::info!("Created Qdrant collection: {}", self.collection_name);
        Ok(())
    }

    /// Upsert a batch of points. Waits for the write to be applied so a
    /// search issued afterwards in the same process observes it.
    pub async fn upsert_points(&self, points: Vec<PointStruct>) -> Result<()> {
        if points.is_empty() {
            return Ok(());
        }

        tracing::info!("Upserting {} points to Qdrant", points.len());

        self.client
            .upsert_points(UpsertPointsBuilder::new(&self.collection_name, points).wait(true))
            .await?;

        Ok(())
    }

    /// Search for the `limit` nearest records (smaller L2 distance = more
    /// similar), optionally restricted by `filter`. No matches is an empty
    /// result, not an error.
    pub async fn search(
        &self,
        query_vector: Vec<f32>,
        limit: u64,
        filter: Option<Filter>,
    ) -> Result<Vec<ScoredPoint>> {
        let mut search_builder =
            SearchPointsBuilder::new(&self.collection_name, query_vector, limit)
                .with_payload(true);

        if let Some(f) = filter {
            search_builder = search_builder.filter(f);
        }

        let search_result = self.client.search_points(search_builder).await?;

        Ok(search_result.result)
    }

    /// Exact number of stored records (administrative).
    pub async fn count(&self) -> Result<u64> {
        let response = self
            .client
            .count(CountPointsBuilder::new(&self.collection_name).exact(true))
            .await?;

        Ok(response.result.map(|r| r.count).unwrap_or(0))
    }
}

/// Build a Qdrant point for an article record.
///
/// The point ID is a UUIDv5 of the source URL, which makes the upsert
/// idempotent per URL. The embedding must match the collection schema.
pub fn article_to_point(record: &ArticleRecord, embedding: Vec<f32>) -> Result<PointStruct> {
    if embedding.len() != EMBEDDING_DIM {
        bail!(
            "embedding dimensionality mismatch for {}: got {}, expected {}",
            record.source_url,
            embedding.len(),
            EMBEDDING_DIM
        );
    }

    let point_id = Uuid::new_v5(&Uuid::NAMESPACE_URL, record.source_url.as_bytes()).to_string();

    let mut payload = serde_json::Map::new();
    payload.insert("title".to_string(), record.title.clone().into());
    payload.insert("article_text".to_string(), record.article_text.clone().into());
    payload.insert("source_url".to_string(), record.source_url.clone().into());
    payload.insert("author".to_string(), record.author.clone().into());
    payload.insert("published_at".to_string(), record.published_at.clone().into());
    payload.insert("source_name".to_string(), record.source_name.clone().into());
    payload.insert("category".to_string(), record.category.clone().into());
    if let Some(ts) = record.published_ts {
        payload.insert("published_ts".to_string(), ts.into());
    }

    Ok(PointStruct::new(point_id, embedding, payload))
}
