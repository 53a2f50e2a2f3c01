use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::types::{AppError, AppResult, LLMProvider, LLMRequest, LLMResponse};

#[async_trait]
pub trait LLMAdapter: Send + Sync {
    async fn create_chat_completion(&self, request: &LLMRequest) -> AppResult<LLMResponse>;
}

/// Connection settings for one LLM provider
#[derive(Debug, Clone)]
pub struct LLMProviderConfig {
    pub name: String,
    pub api_key: String,
    /// Overrides the provider's default endpoint
    pub base_url: Option<String>,
    pub timeout: Duration,
}

/// Build the shared HTTP client with a bounded per-request timeout
pub fn http_client(timeout: Duration) -> AppResult<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| AppError::Config(format!("Failed to create HTTP client: {}", e)))
}

pub struct LLM {
    adapter: Box<dyn LLMAdapter>,
    provider_name: String,
}

impl LLM {
    pub fn new(provider: LLMProviderConfig) -> AppResult<Self> {
        let kind = LLMProvider::from_id(&provider.name).ok_or_else(|| {
            AppError::Config(format!("Unsupported LLM provider: {}", provider.name))
        })?;
        let client = http_client(provider.timeout)?;
        let base_url = provider.base_url.as_deref();

        let adapter: Box<dyn LLMAdapter> = match kind {
            LLMProvider::Google => Box::new(crate::llm::google::GoogleAdapter::new(
                &provider.api_key,
                client,
                base_url,
            )),
            LLMProvider::OpenAI => Box::new(crate::llm::openai::OpenAIAdapter::new(
                &provider.api_key,
                client,
                base_url,
            )),
            LLMProvider::Anthropic => Box::new(crate::llm::anthropic::AnthropicAdapter::new(
                &provider.api_key,
                client,
                base_url,
            )),
            LLMProvider::OpenRouter => Box::new(crate::llm::openrouter::OpenRouterAdapter::new(
                &provider.api_key,
                client,
                base_url,
            )),
            LLMProvider::Groq => Box::new(crate::llm::groq::GroqAdapter::new(
                &provider.api_key,
                client,
                base_url,
            )),
        };

        debug!(provider = %kind, "LLM adapter created");

        Ok(Self {
            adapter,
            provider_name: kind.to_string(),
        })
    }

    /// Wrap an existing adapter, e.g. a local or scripted one
    pub fn from_adapter(name: impl Into<String>, adapter: Box<dyn LLMAdapter>) -> Self {
        Self {
            adapter,
            provider_name: name.into(),
        }
    }

    pub fn provider_name(&self) -> &str {
        &self.provider_name
    }

    pub async fn create_chat_completion(&self, request: &LLMRequest) -> AppResult<LLMResponse> {
        self.adapter.create_chat_completion(request).await
    }
}

/// Read an error body, keeping the provider's own message when it sends one
pub(crate) async fn error_from_response(provider: &str, response: reqwest::Response) -> AppError {
    let status = response.status();
    let error_text = response.text().await.unwrap_or_default();

    let message = serde_json::from_str::<serde_json::Value>(&error_text)
        .ok()
        .and_then(|v| {
            v.get("error")
                .and_then(|e| e.get("message").or(Some(e)))
                .and_then(|m| m.as_str().map(String::from))
        })
        .unwrap_or(error_text);

    AppError::LLMApi(format!("{} API error ({}): {}", provider, status, message))
}
