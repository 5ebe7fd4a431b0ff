pub mod embedder;
pub mod ingestion_pipeline;
pub mod vector_store;

// Re-export commonly used items
pub use embedder::Embedder;
pub use ingestion_pipeline::{IngestStats, IngestionPipeline};
pub use vector_store::{article_to_point, ArticleStore};
