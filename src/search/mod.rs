//! Search Module
//!
//! Web search backends the tool executor runs the model's queries against:
//! - DuckDuckGo (default) - HTML endpoint, no API key
//! - SerpAPI - Google results through the SerpAPI JSON endpoint
//!
//! Every backend renders its hits as plain text for the model to read.

pub mod duckduckgo;
pub mod serpapi;

pub use duckduckgo::DuckDuckGoClient;
pub use serpapi::SerpApiClient;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::{SearchBackend, SearchConfig};
use crate::types::{AppError, AppResult};

/// Errors that can occur during search operations
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("Search API key not configured")]
    NoApiKey,

    #[error("Search request failed: {0}")]
    RequestFailed(String),

    #[error("Failed to parse search results: {0}")]
    ParseError(String),
}

/// A single hit, before rendering
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub title: String,
    pub snippet: String,
    pub link: String,
}

#[async_trait]
pub trait SearchProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Run one query and return its results as text
    ///
    /// A query without hits is not an error; providers return a short
    /// "no results" line instead.
    async fn search(&self, query: &str) -> Result<String, SearchError>;
}

/// Render hits as numbered title / snippet / link blocks
pub fn format_hits(query: &str, hits: &[SearchHit]) -> String {
    if hits.is_empty() {
        return format!("No results found for: {}", query);
    }

    hits.iter()
        .enumerate()
        .map(|(i, hit)| {
            let mut block = format!("{}. {}", i + 1, hit.title);
            if !hit.snippet.is_empty() {
                block.push_str(&format!("\n{}", hit.snippet));
            }
            if !hit.link.is_empty() {
                block.push_str(&format!("\nSource: {}", hit.link));
            }
            block
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Build the configured search backend
pub fn from_config(config: &SearchConfig, client: reqwest::Client) -> AppResult<Box<dyn SearchProvider>> {
    let provider: Box<dyn SearchProvider> = match config.backend {
        SearchBackend::DuckDuckGo => Box::new(DuckDuckGoClient::new(
            client,
            config.base_url.as_deref(),
            config.max_results,
        )),
        SearchBackend::SerpApi => {
            if config.serpapi_key.is_empty() {
                return Err(AppError::Config(
                    "SERPAPI_API_KEY must be set to use SerpAPI search".to_string(),
                ));
            }
            let mut serpapi = SerpApiClient::new(config.serpapi_key.clone(), client)
                .with_engine(config.serpapi_engine.as_str())
                .with_max_results(config.max_results);
            if let Some(base) = config.base_url.as_deref() {
                serpapi = serpapi.with_api_base(base);
            }
            Box::new(serpapi)
        }
    };
    Ok(provider)
}
