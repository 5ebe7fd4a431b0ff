use anyhow::{anyhow, Result};
use async_openai::{
    config::OpenAIConfig,
    types::{
        ChatCompletionRequestMessage, ChatCompletionRequestUserMessage,
        ChatCompletionRequestUserMessageContent, CreateChatCompletionRequest,
    },
    Client as OpenAiClient,
};
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

/// Configuration for the answer synthesizer
#[derive(Debug, Clone)]
pub struct SynthesizerConfig {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub requests_per_minute: u32,
    pub timeout_seconds: u64,
    pub max_retries: u32,
}

impl Default for SynthesizerConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            max_tokens: 500,
            temperature: 0.2,
            requests_per_minute: 10,
            timeout_seconds: 30,
            max_retries: 3,
        }
    }
}

/// LLM boundary of the read path: turns (context, question) into an answer.
///
/// Treated as unreliable: slow calls are cut off by a bounded timeout,
/// transient failures are retried with backoff, and an unconfigured client
/// is represented by the absence of a `Synthesizer` (see `from_env`).
pub struct Synthesizer {
    client: OpenAiClient<OpenAIConfig>,
    rate_limiter: Arc<DefaultDirectRateLimiter>,
    config: SynthesizerConfig,
}

impl Synthesizer {
    pub fn new(config: SynthesizerConfig, api_key: String) -> Result<Self> {
        tracing::info!(
            "Initializing synthesizer: model={}, rate_limit={}/min, timeout={}s",
            config.model,
            config.requests_per_minute,
            config.timeout_seconds
        );

        let client = OpenAiClient::with_config(OpenAIConfig::new().with_api_key(api_key));

        let requests_per_minute = NonZeroU32::new(config.requests_per_minute)
            .ok_or_else(|| anyhow!("requests_per_minute must be > 0"))?;
        let rate_limiter = Arc::new(RateLimiter::direct(Quota::per_minute(requests_per_minute)));

        Ok(Self {
            client,
            rate_limiter,
            config,
        })
    }

    /// Build a synthesizer from `OPENAI_API_KEY`. `None` means the answer
    /// model is not configured; retrieval then degrades instead of failing.
    pub fn from_env(config: SynthesizerConfig) -> Result<Option<Self>> {
        match std::env::var("OPENAI_API_KEY") {
            Ok(key) if !key.trim().is_empty() => Ok(Some(Self::new(config, key)?)),
            _ => Ok(None),
        }
    }

    /// Answer `question` using only `context`.
    pub async fn answer(&self, context: &str, question: &str) -> Result<String> {
        self.rate_limiter.until_ready().await;

        let prompt = build_prompt(context, question);
        tracing::debug!("Sending prompt to LLM (length: {} chars)", prompt.len());

        let mut last_error = None;

        for attempt in 0..self.config.max_retries {
            match self.call_llm(&prompt).await {
                Ok(answer) => {
                    tracing::info!(
                        "LLM answer received: model={}, length={} chars",
                        self.config.model,
                        answer.len()
                    );
                    return Ok(answer);
                }
                Err(e) => {
                    last_error = Some(e);

                    if attempt + 1 < self.config.max_retries {
                        let backoff_ms = 2_u64.pow(attempt) * 1000;
                        tracing::warn!(
                            "LLM call failed (attempt {}/{}), retrying in {}ms: {}",
                            attempt + 1,
                            self.config.max_retries,
                            backoff_ms,
                            last_error.as_ref().unwrap()
                        );
                        sleep(Duration::from_millis(backoff_ms)).await;
                    }
                }
            }
        }

        Err(last_error.unwrap_or_else(|| anyhow!("All retry attempts failed")))
    }

    async fn call_llm(&self, prompt: &str) -> Result<String> {
        let request = CreateChatCompletionRequest {
            model: self.config.model.clone(),
            messages: vec![ChatCompletionRequestMessage::User(
                ChatCompletionRequestUserMessage {
                    content: ChatCompletionRequestUserMessageContent::Text(prompt.to_string()),
                    name: None,
                },
            )],
            max_tokens: Some(self.config.max_tokens),
            temperature: Some(self.config.temperature),
            ..Default::default()
        };

        let response = tokio::time::timeout(
            Duration::from_secs(self.config.timeout_seconds),
            self.client.chat().create(request),
        )
        .await
        .map_err(|_| anyhow!("LLM request timed out after {}s", self.config.timeout_seconds))?
        .map_err(|e| anyhow!("OpenAI API error: {}", e))?;

        let answer = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty())
            .ok_or_else(|| anyhow!("Empty response from LLM"))?;

        Ok(answer)
    }
}

/// Fixed RAG prompt: the model must answer from the supplied context only.
fn build_prompt(context: &str, question: &str) -> String {
    format!(
        "Answer the question based only on the following context. \
         If the context is not sufficient, say so.\n\n\
         Context:\n{context}\n\nQuestion: {question}\nAnswer:"
    )
}
