use anyhow::{Context, Result};
use serde_json::Value;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

use news_answer::{NewsRetriever, Synthesizer, SynthesizerConfig};
use news_index::{ArticleStore, Embedder, IngestionPipeline};

use crate::config::ServerConfig;
use crate::error::RpcError;
use crate::handler::NewsHandler;
use crate::protocol::*;

/// JSON-RPC server for the news RAG pipeline
pub struct RpcServer {
    config: ServerConfig,
    handler: Arc<NewsHandler>,
}

impl RpcServer {
    /// Wire up the pipeline components. The embedding model is loaded
    /// lazily on first use, not here; collection provisioning is
    /// best-effort so a briefly unreachable Qdrant does not abort startup.
    pub async fn new(config: ServerConfig) -> Result<Self> {
        tracing::info!("Initializing news RAG components...");

        let embedder = Arc::new(Embedder::new());

        let store = Arc::new(
            ArticleStore::connect(&config.qdrant_url, config.collection_name.clone())
                .context("Failed to build Qdrant client")?,
        );

        if let Err(e) = store.ensure_collection().await {
            tracing::error!("Collection provisioning failed (continuing): {:#}", e);
        }

        let synthesizer = Synthesizer::from_env(SynthesizerConfig {
            model: config.model.clone(),
            ..Default::default()
        })?;
        match &synthesizer {
            Some(_) => tracing::info!("Answer synthesizer configured (model: {})", config.model),
            None => tracing::warn!(
                "OPENAI_API_KEY is unset; news.ask will degrade instead of synthesizing"
            ),
        }

        let pipeline = Arc::new(IngestionPipeline::new(
            Arc::clone(&embedder),
            Arc::clone(&store),
        ));
        let retriever = Arc::new(NewsRetriever::new(
            embedder,
            Arc::clone(&store),
            synthesizer,
        ));

        let handler = Arc::new(NewsHandler::new(pipeline, retriever, store));

        tracing::info!("News RAG components initialized");

        Ok(Self { config, handler })
    }

    /// Start the server and handle connections
    pub async fn run(&self) -> Result<()> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let listener = TcpListener::bind(&addr)
            .await
            .context(format!("Failed to bind to {}", addr))?;

        tracing::info!("News JSON-RPC server listening on {}", addr);

        loop {
            match listener.accept().await {
                Ok((socket, addr)) => {
                    tracing::debug!("New connection from {}", addr);
                    let handler = Arc::clone(&self.handler);

                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(socket, handler).await {
                            tracing::error!("Connection error from {}: {}", addr, e);
                        }
                    });
                }
                Err(e) => {
                    tracing::error!("Failed to accept connection: {}", e);
                }
            }
        }
    }
}

/// Handle a single TCP connection
async fn handle_connection(mut socket: TcpStream, handler: Arc<NewsHandler>) -> Result<()> {
    let (reader, mut writer) = socket.split();
    let mut reader = BufReader::new(reader);
    let mut line = String::new();

    loop {
        line.clear();
        let bytes_read = reader.read_line(&mut line).await?;

        if bytes_read == 0 {
            // Connection closed
            break;
        }

        tracing::debug!("Received request: {}", line.trim());

        let response = process_request(&line, &handler).await;

        let response_json = serde_json::to_string(&response)?;
        writer.write_all(response_json.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;
    }

    Ok(())
}

/// Process a JSON-RPC request
async fn process_request(line: &str, handler: &NewsHandler) -> Value {
    let request: JsonRpcRequest = match serde_json::from_str(line) {
        Ok(req) => req,
        Err(e) => {
            return serde_json::to_value(JsonRpcError {
                jsonrpc: "2.0".to_string(),
                id: None,
                error: ErrorObject {
                    code: PARSE_ERROR,
                    message: format!("Parse error: {}", e),
                    data: None,
                },
            })
            .unwrap();
        }
    };

    if request.jsonrpc != "2.0" {
        return create_error_response(
            request.id,
            RpcError::InvalidRequest("JSON-RPC version must be 2.0".to_string()),
        );
    }

    match request.method.as_str() {
        "news.ask" => {
            let id = request.id.clone();
            match parse_params::<AskRequest>(request) {
                Ok(params) => match handler.handle_ask(params).await {
                    Ok(result) => create_success_response(id, &result),
                    Err(e) => create_error_response(id, e),
                },
                Err(e) => create_error_response(id, e),
            }
        }
        "news.index" => {
            let id = request.id.clone();
            match parse_params::<IndexRequest>(request) {
                Ok(params) => match handler.handle_index(params).await {
                    Ok(result) => create_success_response(id, &result),
                    Err(e) => create_error_response(id, e),
                },
                Err(e) => create_error_response(id, e),
            }
        }
        "news.count" => {
            let id = request.id.clone();
            match handler.handle_count().await {
                Ok(result) => create_success_response(id, &result),
                Err(e) => create_error_response(id, e),
            }
        }
        _ => create_error_response(request.id, RpcError::MethodNotFound(request.method.clone())),
    }
}

/// Deserialize the params object of a request
fn parse_params<T: serde::de::DeserializeOwned>(request: JsonRpcRequest) -> Result<T, RpcError> {
    match request.params {
        Some(params) => serde_json::from_value(params)
            .map_err(|e| RpcError::InvalidParams(format!("Invalid params: {}", e))),
        None => Err(RpcError::InvalidParams("Missing params".to_string())),
    }
}

/// Create a success response
fn create_success_response<T: serde::Serialize>(id: Option<Value>, result: &T) -> Value {
    serde_json::to_value(JsonRpcResponse {
        jsonrpc: "2.0".to_string(),
        id,
        result: serde_json::to_value(result).unwrap(),
    })
    .unwrap()
}

/// Create an error response
fn create_error_response(id: Option<Value>, error: RpcError) -> Value {
    serde_json::to_value(JsonRpcError {
        jsonrpc: "2.0".to_string(),
        id,
        error: ErrorObject {
            code: error.code(),
            message: error.to_string(),
            data: error.data(),
        },
    })
    .unwrap()
}
