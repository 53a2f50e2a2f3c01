// OpenRouter adapter (OpenAI-compatible API)

use crate::llm::openai::OpenAIAdapter;
use crate::llm::provider::LLMAdapter;
use crate::types::{AppResult, LLMRequest, LLMResponse};
use async_trait::async_trait;
use reqwest::Client;

const OPENROUTER_API_BASE: &str = "https://openrouter.ai/api/v1";

pub struct OpenRouterAdapter {
    inner: OpenAIAdapter,
}

impl OpenRouterAdapter {
    pub fn new(api_key: &str, client: Client, base_url: Option<&str>) -> Self {
        Self {
            inner: OpenAIAdapter::new_with_api_base(
                api_key,
                client,
                base_url.unwrap_or(OPENROUTER_API_BASE),
                "OpenRouter",
            ),
        }
    }
}

#[async_trait]
impl LLMAdapter for OpenRouterAdapter {
    async fn create_chat_completion(&self, request: &LLMRequest) -> AppResult<LLMResponse> {
        self.inner.create_chat_completion(request).await
    }
}
