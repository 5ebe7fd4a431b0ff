use news_core::RawArticle;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// JSON-RPC 2.0 Request
#[derive(Debug, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub id: Option<Value>,
    pub method: String,
    pub params: Option<Value>,
}

/// JSON-RPC 2.0 Success Response
#[derive(Debug, Serialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub id: Option<Value>,
    pub result: Value,
}

/// JSON-RPC 2.0 Error Response
#[derive(Debug, Serialize)]
pub struct JsonRpcError {
    pub jsonrpc: String,
    pub id: Option<Value>,
    pub error: ErrorObject,
}

/// JSON-RPC Error Object
#[derive(Debug, Serialize)]
pub struct ErrorObject {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

// Standard JSON-RPC error codes
pub const PARSE_ERROR: i32 = -32700;
pub const INVALID_REQUEST: i32 = -32600;
pub const METHOD_NOT_FOUND: i32 = -32601;
pub const INVALID_PARAMS: i32 = -32602;
pub const INTERNAL_ERROR: i32 = -32603;

// Custom error codes for news operations
pub const EMPTY_QUERY: i32 = -32001;
pub const STORE_ERROR: i32 = -32002;
pub const EMBEDDING_ERROR: i32 = -32003;

/// Parameters of news.ask
#[derive(Debug, Deserialize)]
pub struct AskRequest {
    pub query: String,
}

/// Parameters of news.index
#[derive(Debug, Deserialize)]
pub struct IndexRequest {
    pub articles: Vec<RawArticle>,
}

/// Response of news.index: the number of articles scheduled for background
/// indexing. Indexing success or failure is observable only in the logs.
#[derive(Debug, Serialize)]
pub struct IndexResponse {
    pub queued: usize,
}

/// Response of news.count
#[derive(Debug, Serialize)]
pub struct CountResponse {
    pub row_count: u64,
}
