//! SerpAPI Client
//!
//! Google results through SerpAPI's JSON endpoint. The engine is configurable:
//! `google_light` (default) is the fast general web search, `google` the full
//! one, and `google_scholar` returns papers with publication info.

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, info};

use super::{format_hits, SearchError, SearchHit, SearchProvider};

const SERPAPI_BASE: &str = "https://serpapi.com";

/// SerpAPI client for web search
pub struct SerpApiClient {
    client: Client,
    api_key: String,
    engine: String,
    api_base: String,
    max_results: usize,
}

impl SerpApiClient {
    /// Create a new SerpAPI client
    pub fn new(api_key: String, client: Client) -> Self {
        Self {
            client,
            api_key,
            engine: "google_light".to_string(),
            api_base: SERPAPI_BASE.to_string(),
            max_results: 5,
        }
    }

    /// Set maximum results per search
    pub fn with_max_results(mut self, max: usize) -> Self {
        self.max_results = max;
        self
    }

    /// Select the SerpAPI engine
    pub fn with_engine(mut self, engine: impl Into<String>) -> Self {
        self.engine = engine.into();
        self
    }

    pub fn with_api_base(mut self, api_base: &str) -> Self {
        self.api_base = api_base.trim_end_matches('/').to_string();
        self
    }

    async fn fetch(&self, query: &str) -> Result<serde_json::Value, SearchError> {
        if self.api_key.is_empty() {
            return Err(SearchError::NoApiKey);
        }

        let num = self.max_results.to_string();
        let response = self
            .client
            .get(format!("{}/search.json", self.api_base))
            .query(&[
                ("engine", self.engine.as_str()),
                ("q", query),
                ("hl", "en"),
                ("num", num.as_str()),
                ("api_key", self.api_key.as_str()),
            ])
            .send()
            .await
            .map_err(|e| SearchError::RequestFailed(e.to_string()))?;

        let status = response.status();
        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| SearchError::ParseError(e.to_string()))?;

        if let Some(error) = body.get("error").and_then(|v| v.as_str()) {
            // SerpAPI reports "no results" through the error field
            if error.contains("hasn't returned any results") {
                return Ok(serde_json::json!({ "organic_results": [] }));
            }
            return Err(SearchError::RequestFailed(error.to_string()));
        }
        if !status.is_success() {
            return Err(SearchError::RequestFailed(format!("HTTP {}", status)));
        }

        Ok(body)
    }
}

/// Parse `organic_results` into hits
fn parse_organic_results(body: &serde_json::Value, max_results: usize) -> Result<Vec<SearchHit>, SearchError> {
    let results = match body.get("organic_results") {
        Some(results) => results
            .as_array()
            .ok_or_else(|| SearchError::ParseError("Expected array of results".to_string()))?,
        None => return Ok(Vec::new()),
    };

    let hits = results
        .iter()
        .take(max_results)
        .map(|result| {
            let title = result
                .get("title")
                .and_then(|v| v.as_str())
                .unwrap_or("Untitled")
                .to_string();

            let mut snippet = result
                .get("snippet")
                .and_then(|v| v.as_str())
                .unwrap_or("")
                .to_string();

            // Scholar results carry "Authors - Journal, Year" here
            if let Some(summary) = result
                .get("publication_info")
                .and_then(|p| p.get("summary"))
                .and_then(|v| v.as_str())
            {
                snippet = if snippet.is_empty() {
                    summary.to_string()
                } else {
                    format!("{} ({})", snippet, summary)
                };
            }

            let link = result
                .get("link")
                .and_then(|v| v.as_str())
                .unwrap_or("")
                .to_string();

            SearchHit { title, snippet, link }
        })
        .collect();

    Ok(hits)
}

#[async_trait]
impl SearchProvider for SerpApiClient {
    fn name(&self) -> &str {
        "serpapi"
    }

    async fn search(&self, query: &str) -> Result<String, SearchError> {
        info!(query = %query, engine = %self.engine, "Searching via SerpAPI");

        let body = self.fetch(query).await?;
        debug!("Raw SerpAPI response received");

        let hits = parse_organic_results(&body, self.max_results)?;
        info!(count = hits.len(), "SerpAPI search completed");
        Ok(format_hits(query, &hits))
    }
}
