//! Language-model provider abstraction and implementations.
//!
//! Every action asks the model for a JSON object matching a schema. The
//! [`LanguageModel`] trait is that seam; concrete backends:
//! - **[`DisabledModel`]** — always errors; used when no provider is configured.
//! - **[`OpenAiModel`]** — OpenAI-compatible `POST /chat/completions` with a
//!   `json_schema` response format.
//! - **[`OllamaModel`]** — local Ollama `POST /api/chat` with `format` set to
//!   the schema.
//!
//! # Retry Strategy
//!
//! Both HTTP providers retry transient failures with exponential backoff:
//! - HTTP 429 (rate limited) and 5xx (server error) → retry
//! - HTTP 4xx (client error, not 429) → fail immediately
//! - Network errors → retry
//! - Backoff: 1s, 2s, 4s, 8s, 16s, 32s (capped at 2^5)

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::ModelConfig;

const OPENAI_DEFAULT_URL: &str = "https://api.openai.com/v1";
const OLLAMA_DEFAULT_URL: &str = "http://localhost:11434";

/// One structured-output request.
#[derive(Debug, Clone)]
pub struct GenerateRequest {
    pub prompt: String,
    /// Schema name sent to providers that require one (OpenAI).
    pub schema_name: String,
    pub schema: Value,
}

impl GenerateRequest {
    pub fn new(prompt: impl Into<String>, schema_name: impl Into<String>, schema: Value) -> Self {
        Self {
            prompt: prompt.into(),
            schema_name: schema_name.into(),
            schema,
        }
    }
}

/// A hosted or local model that returns JSON for a prompt + schema.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Returns the model identifier (e.g. `"gpt-4o-mini"`).
    fn model_name(&self) -> &str;

    /// Runs the prompt and returns the model's JSON object.
    async fn generate(&self, request: &GenerateRequest) -> Result<Value>;
}

/// Runs `request` and deserializes the result into `T`.
///
/// Deserialization is the output-schema check: a response missing required
/// fields or carrying the wrong types is an error.
pub async fn generate_typed<T: DeserializeOwned>(
    model: &dyn LanguageModel,
    request: &GenerateRequest,
) -> Result<T> {
    let value = model.generate(request).await?;
    serde_json::from_value(value).with_context(|| {
        format!(
            "output schema validation failed for '{}' ({})",
            request.schema_name,
            model.model_name()
        )
    })
}

/// Instantiates the provider named in `config.provider`.
pub fn create_model(config: &ModelConfig) -> Result<Box<dyn LanguageModel>> {
    match config.provider.as_str() {
        "disabled" => Ok(Box::new(DisabledModel)),
        "openai" => Ok(Box::new(OpenAiModel::new(config)?)),
        "ollama" => Ok(Box::new(OllamaModel::new(config)?)),
        other => bail!("Unknown model provider: {}", other),
    }
}

// ============ Disabled ============

pub struct DisabledModel;

#[async_trait]
impl LanguageModel for DisabledModel {
    fn model_name(&self) -> &str {
        "disabled"
    }

    async fn generate(&self, _request: &GenerateRequest) -> Result<Value> {
        bail!("Model provider is disabled; set [model].provider in the config")
    }
}

// ============ OpenAI ============

/// OpenAI-compatible chat completions backend.
///
/// The API key is read from the environment variable named by
/// `model.api_key_env` at construction time.
pub struct OpenAiModel {
    client: reqwest::Client,
    model: String,
    url: String,
    api_key: String,
    temperature: f32,
    max_retries: u32,
}

impl OpenAiModel {
    pub fn new(config: &ModelConfig) -> Result<Self> {
        let model = config
            .model
            .clone()
            .ok_or_else(|| anyhow!("model.model required for OpenAI provider"))?;
        let api_key = std::env::var(&config.api_key_env)
            .map_err(|_| anyhow!("{} environment variable not set", config.api_key_env))?;
        let url = config
            .url
            .clone()
            .unwrap_or_else(|| OPENAI_DEFAULT_URL.to_string());

        Ok(Self {
            client: build_client(config)?,
            model,
            url: url.trim_end_matches('/').to_string(),
            api_key,
            temperature: config.temperature,
            max_retries: config.max_retries,
        })
    }
}

#[async_trait]
impl LanguageModel for OpenAiModel {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, request: &GenerateRequest) -> Result<Value> {
        let body = json!({
            "model": self.model,
            "temperature": self.temperature,
            "messages": [{ "role": "user", "content": request.prompt }],
            "response_format": {
                "type": "json_schema",
                "json_schema": {
                    "name": request.schema_name,
                    "schema": request.schema,
                }
            }
        });
        let endpoint = format!("{}/chat/completions", self.url);
        let auth = format!("Bearer {}", self.api_key);

        let json = post_with_retry(self.max_retries, "OpenAI", || {
            self.client
                .post(&endpoint)
                .header("Authorization", &auth)
                .json(&body)
        })
        .await?;

        let content = json
            .pointer("/choices/0/message/content")
            .and_then(Value::as_str)
            .ok_or_else(|| anyhow!("Invalid OpenAI response: missing choices[0].message.content"))?;
        parse_json_content(content)
    }
}

// ============ Ollama ============

pub struct OllamaModel {
    client: reqwest::Client,
    model: String,
    url: String,
    temperature: f32,
    max_retries: u32,
}

impl OllamaModel {
    pub fn new(config: &ModelConfig) -> Result<Self> {
        let model = config
            .model
            .clone()
            .ok_or_else(|| anyhow!("model.model required for Ollama provider"))?;
        let url = config
            .url
            .clone()
            .unwrap_or_else(|| OLLAMA_DEFAULT_URL.to_string());

        Ok(Self {
            client: build_client(config)?,
            model,
            url: url.trim_end_matches('/').to_string(),
            temperature: config.temperature,
            max_retries: config.max_retries,
        })
    }
}

#[async_trait]
impl LanguageModel for OllamaModel {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, request: &GenerateRequest) -> Result<Value> {
        let body = json!({
            "model": self.model,
            "stream": false,
            "format": request.schema,
            "options": { "temperature": self.temperature },
            "messages": [{ "role": "user", "content": request.prompt }],
        });
        let endpoint = format!("{}/api/chat", self.url);

        let json = post_with_retry(self.max_retries, "Ollama", || {
            self.client.post(&endpoint).json(&body)
        })
        .await?;

        let content = json
            .pointer("/message/content")
            .and_then(Value::as_str)
            .ok_or_else(|| anyhow!("Invalid Ollama response: missing message.content"))?;
        parse_json_content(content)
    }
}

// ============ Shared HTTP plumbing ============

fn build_client(config: &ModelConfig) -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()?)
}

fn backoff_delay(attempt: u32) -> Duration {
    Duration::from_secs(1 << (attempt - 1).min(5))
}

async fn post_with_retry<F>(max_retries: u32, provider: &str, build: F) -> Result<Value>
where
    F: Fn() -> reqwest::RequestBuilder,
{
    let mut last_err = None;

    for attempt in 0..=max_retries {
        if attempt > 0 {
            let delay = backoff_delay(attempt);
            debug!(provider, attempt, ?delay, "retrying model request");
            tokio::time::sleep(delay).await;
        }

        match build().send().await {
            Ok(response) => {
                let status = response.status();

                if status.is_success() {
                    return Ok(response.json().await?);
                }

                let body_text = response.text().await.unwrap_or_default();
                if status.as_u16() == 429 || status.is_server_error() {
                    warn!(provider, %status, "transient model API error");
                    last_err = Some(anyhow!("{} API error {}: {}", provider, status, body_text));
                    continue;
                }

                bail!("{} API error {}: {}", provider, status, body_text);
            }
            Err(e) => {
                warn!(provider, error = %e, "model request failed");
                last_err = Some(e.into());
                continue;
            }
        }
    }

    Err(last_err.unwrap_or_else(|| anyhow!("{} request failed after retries", provider)))
}

/// Parses model text as a JSON object, tolerating a surrounding code fence.
pub fn parse_json_content(text: &str) -> Result<Value> {
    let trimmed = text.trim();
    let body = match trimmed.strip_prefix("```") {
        Some(rest) => {
            let rest = rest.strip_prefix("json").unwrap_or(rest);
            rest.strip_suffix("```").unwrap_or(rest).trim()
        }
        None => trimmed,
    };

    let value: Value =
        serde_json::from_str(body).with_context(|| "model returned content that is not JSON")?;
    if !value.is_object() {
        bail!("model returned JSON that is not an object");
    }
    Ok(value)
}
