use chrono::DateTime;
use serde::Deserialize;

/// Output dimensionality of the embedding model (all-MiniLM-L6-v2).
/// Every stored vector must have exactly this many components.
pub const EMBEDDING_DIM: usize = 384;

/// Marker the news provider inserts where it truncates article bodies,
/// e.g. "... [+1234 chars]". Text after the marker is boilerplate.
const READ_MORE_MARKER: &str = "[+";

pub const DEFAULT_TITLE: &str = "No Title";
pub const DEFAULT_AUTHOR: &str = "Unknown";
pub const DEFAULT_PUBLISHED_AT: &str = "Unknown";
pub const DEFAULT_SOURCE_NAME: &str = "Unknown";
pub const DEFAULT_CATEGORY: &str = "general";

/// Source block of a fetched article (provider shape).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawSource {
    pub name: Option<String>,
}

/// A fetched article as the news provider returns it. Every field is
/// optional; the pipeline must tolerate any subset being absent.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawArticle {
    pub title: Option<String>,
    pub content: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
    pub author: Option<String>,
    #[serde(rename = "publishedAt")]
    pub published_at: Option<String>,
    pub source: Option<RawSource>,
    pub category: Option<String>,
}

/// Normalized, indexable article. `source_url` is the primary key;
/// `article_text` is guaranteed non-empty.
#[derive(Debug, Clone, PartialEq)]
pub struct ArticleRecord {
    pub title: String,
    pub article_text: String,
    pub source_url: String,
    pub author: String,
    pub published_at: String,
    pub source_name: String,
    pub category: String,
    /// Epoch milliseconds parsed from `published_at`, when it parses.
    /// Temporal filters range over this; records without it are excluded
    /// from temporally filtered queries.
    pub published_ts: Option<i64>,
}

impl RawArticle {
    /// Normalize a fetched article into an indexable record.
    ///
    /// Returns `None` when the article has no usable text (`content`
    /// falling back to `description`, both empty) or no URL to key on.
    pub fn normalize(&self) -> Option<ArticleRecord> {
        let source_url = non_empty(self.url.as_deref())?.to_string();

        let raw_text =
            non_empty(self.content.as_deref()).or_else(|| non_empty(self.description.as_deref()))?;
        let article_text = strip_read_more(raw_text);
        if article_text.is_empty() {
            return None;
        }

        let published_at = non_empty(self.published_at.as_deref())
            .unwrap_or(DEFAULT_PUBLISHED_AT)
            .to_string();
        let published_ts = DateTime::parse_from_rfc3339(&published_at)
            .ok()
            .map(|dt| dt.timestamp_millis());

        Some(ArticleRecord {
            title: non_empty(self.title.as_deref())
                .unwrap_or(DEFAULT_TITLE)
                .to_string(),
            article_text,
            source_url,
            author: non_empty(self.author.as_deref())
                .unwrap_or(DEFAULT_AUTHOR)
                .to_string(),
            published_at,
            source_name: self
                .source
                .as_ref()
                .and_then(|s| non_empty(s.name.as_deref()))
                .unwrap_or(DEFAULT_SOURCE_NAME)
                .to_string(),
            category: non_empty(self.category.as_deref())
                .unwrap_or(DEFAULT_CATEGORY)
                .to_string(),
            published_ts,
        })
    }
}

/// Cut the text at the provider's read-more marker, then trim.
fn strip_read_more(text: &str) -> String {
    match text.find(READ_MORE_MARKER) {
        Some(idx) => text[..idx].trim().to_string(),
        None => text.trim().to_string(),
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}
