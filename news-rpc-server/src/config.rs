/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub qdrant_url: String,
    pub collection_name: String,
    pub model: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 7878,
            qdrant_url: "http://localhost:6334".to_string(),
            collection_name: "news_articles".to_string(),
            model: "gpt-4o-mini".to_string(),
        }
    }
}
