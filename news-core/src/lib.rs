pub mod types;

// Re-export common types
pub use types::{ArticleRecord, RawArticle, RawSource, EMBEDDING_DIM};
