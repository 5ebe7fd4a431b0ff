pub mod planner;
pub mod retriever;
pub mod synthesizer;

// Re-export commonly used items
pub use planner::{plan, PlannedQuery, TemporalWindow};
pub use retriever::{AnswerBundle, NewsRetriever, QueryError, SourceArticle};
pub use synthesizer::{Synthesizer, SynthesizerConfig};
