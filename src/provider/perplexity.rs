//! Chat completions client for the Perplexity API.

use super::{DataSource, build_prompt};
use crate::config::ProviderConfig;
use crate::error::{Error, FetchError, Result};
use crate::storage::{ContentStore, Metadata};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use sha2::{Digest, Sha256};
use std::sync::Arc;

/// System message sent ahead of every query
const SYSTEM_MESSAGE: &str = "Be precise and concise.";

/// Number of hex characters of the prompt hash used in cache paths
const CACHE_KEY_LEN: usize = 32;

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f64,
    top_p: f64,
    presence_penalty: f64,
    frequency_penalty: f64,
    search_recency_filter: &'a str,
    return_images: bool,
    return_related_questions: bool,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: Option<ChatResponseMessage>,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

/// Provider client implementing [`DataSource`]
///
/// Built from an explicit [`ProviderConfig`]; each client owns its credential.
/// When a content store is attached, every successful `(query, result)` pair
/// is written to [`cache_path_for`] on a background task. Cache failures are
/// logged and otherwise ignored.
///
/// # Examples
///
/// ```no_run
/// use city_directory::config::ProviderConfig;
/// use city_directory::provider::{DataSource, PerplexityClient};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let client = PerplexityClient::new(ProviderConfig::from_env()?)?;
/// let text = client.fetch("Chicago", "Illinois").await?;
/// println!("{text}");
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct PerplexityClient {
    http: reqwest::Client,
    config: ProviderConfig,
    api_key: String,
    cache: Option<Arc<dyn ContentStore>>,
}

impl std::fmt::Debug for PerplexityClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PerplexityClient")
            .field("api_url", &self.config.api_url)
            .field("model", &self.config.model)
            .field("cache", &self.cache.as_ref().map(|c| c.name()))
            .finish_non_exhaustive()
    }
}

impl PerplexityClient {
    /// Create a client from configuration
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the endpoint is invalid or no API key is set.
    pub fn new(config: ProviderConfig) -> Result<Self> {
        config.validate()?;
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| Error::config("API key is required", "provider.api_key"))?;

        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| Error::config(format!("failed to build HTTP client: {e}"), "provider"))?;

        Ok(Self {
            http,
            config,
            api_key,
            cache: None,
        })
    }

    /// Attach a content store for the response cache
    pub fn with_cache(mut self, store: Arc<dyn ContentStore>) -> Self {
        self.cache = Some(store);
        self
    }

    /// Send one query and return the first choice's content
    pub async fn complete(&self, prompt: &str) -> std::result::Result<String, FetchError> {
        let body = ChatRequest {
            model: &self.config.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: SYSTEM_MESSAGE,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: self.config.temperature,
            top_p: self.config.top_p,
            presence_penalty: self.config.presence_penalty,
            frequency_penalty: self.config.frequency_penalty,
            search_recency_filter: &self.config.search_recency_filter,
            return_images: false,
            return_related_questions: false,
            stream: false,
        };

        tracing::debug!(
            model = %self.config.model,
            query_type = %self.config.query_type,
            prompt_len = prompt.len(),
            "sending provider request"
        );

        let response = self
            .http
            .post(&self.config.api_url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "provider request failed before a response");
                FetchError::Transport(e.to_string())
            })?;

        let status = response.status();
        let text = response.text().await.map_err(FetchError::from)?;

        if !status.is_success() {
            let err = map_status(status, &text);
            tracing::warn!(status = %status, error = %err, "provider returned an error");
            return Err(err);
        }

        let parsed: ChatResponse = serde_json::from_str(&text)
            .map_err(|e| FetchError::Provider(format!("malformed response: {e}")))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message)
            .and_then(|m| m.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or(FetchError::EmptyResponse)?;

        tracing::debug!(len = content.len(), "received provider response");

        self.cache_result(prompt, &content);
        Ok(content)
    }

    /// Write the `(query, result)` pair to the cache (fire and forget)
    fn cache_result(&self, prompt: &str, result: &str) {
        if !self.config.cache_results {
            return;
        }
        let Some(store) = self.cache.clone() else {
            return;
        };

        let query_type = self.config.query_type.clone();
        let path = cache_path_for(&query_type, prompt);
        let content = json!({
            "prompt": prompt,
            "result": result,
            "type": query_type,
            "timestamp": chrono::Utc::now().to_rfc3339(),
        });
        let mut metadata = Metadata::new();
        metadata.insert("type".to_string(), Value::from("perplexity_result"));
        metadata.insert("resultType".to_string(), Value::from(query_type));

        tokio::spawn(async move {
            match store.put(&path, &content, metadata).await {
                Ok(_) => tracing::debug!(path = %path, "cached provider result"),
                Err(e) => tracing::warn!(path = %path, error = %e, "failed to cache provider result"),
            }
        });
    }
}

/// Cache path of a query: `perplexity/{query_type}/{hash}.json`
///
/// `hash` is the first 32 hex characters of the query's SHA-256 digest.
pub fn cache_path_for(query_type: &str, prompt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(prompt.as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    format!("perplexity/{}/{}.json", query_type, &digest[..CACHE_KEY_LEN])
}

/// Map a non-success status and body onto the fetch error taxonomy
fn map_status(status: StatusCode, body: &str) -> FetchError {
    match status {
        StatusCode::UNAUTHORIZED => FetchError::Unauthorized,
        StatusCode::TOO_MANY_REQUESTS => FetchError::RateLimited,
        _ => {
            let message = serde_json::from_str::<Value>(body)
                .ok()
                .and_then(|v| provider_error_message(&v));
            match message {
                Some(msg) => FetchError::Provider(msg),
                None if body.trim().is_empty() => FetchError::Provider(format!("HTTP {status}")),
                None => FetchError::Provider(format!("HTTP {status}: {}", body.trim())),
            }
        }
    }
}

/// Extract `error.message` or a bare `error` string from a provider error body
fn provider_error_message(body: &Value) -> Option<String> {
    match body.get("error")? {
        Value::String(s) => Some(s.clone()),
        Value::Object(obj) => obj
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string),
        _ => None,
    }
}

#[async_trait]
impl DataSource for PerplexityClient {
    async fn fetch(&self, name: &str, region: &str) -> std::result::Result<String, FetchError> {
        let prompt = build_prompt(name, region);
        self.complete(&prompt).await
    }

    fn name(&self) -> &'static str {
        "perplexity"
    }
}
