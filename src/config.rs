use serde::Deserialize;
use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::types::{AppError, AppResult, LLMProvider};

#[derive(Debug, Clone)]
pub struct Config {
    pub llm: LLMConfig,
    pub search: SearchConfig,
    pub agent: AgentConfig,
    /// Upper bound on every outgoing HTTP call
    pub request_timeout: Duration,
}

#[derive(Clone, Deserialize)]
pub struct LLMConfig {
    pub provider: LLMProvider,
    pub model: String,
    pub api_key: String,
    pub base_url: Option<String>,
    pub temperature: f32,
    pub max_tokens: u32,
}

// Keep the key out of logs
impl std::fmt::Debug for LLMConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LLMConfig")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchBackend {
    DuckDuckGo,
    SerpApi,
}

impl SearchBackend {
    pub fn from_id(id: &str) -> Option<Self> {
        match id.trim().to_lowercase().as_str() {
            "duckduckgo" | "ddg" => Some(SearchBackend::DuckDuckGo),
            "serpapi" => Some(SearchBackend::SerpApi),
            _ => None,
        }
    }
}

#[derive(Clone, Deserialize)]
pub struct SearchConfig {
    pub backend: SearchBackend,
    pub serpapi_key: String,
    pub serpapi_engine: String,
    pub base_url: Option<String>,
    /// Hits kept per query
    pub max_results: usize,
    /// Characters kept from each query's rendered results
    pub result_limit: usize,
    /// Run a record's queries concurrently
    pub parallel: bool,
}

impl std::fmt::Debug for SearchConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchConfig")
            .field("backend", &self.backend)
            .field("serpapi_engine", &self.serpapi_engine)
            .field("base_url", &self.base_url)
            .field("max_results", &self.max_results)
            .field("result_limit", &self.result_limit)
            .field("parallel", &self.parallel)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AgentConfig {
    /// Revision cycles after the initial answer
    pub max_iterations: u32,
    /// Cap on search queries per record
    pub max_search_queries: usize,
    pub verbose: bool,
}

fn parse_var<T>(key: &str, raw: Option<String>, default: T) -> AppResult<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match raw.filter(|v| !v.trim().is_empty()) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|e| AppError::Config(format!("{} has invalid value '{}': {}", key, value, e))),
        None => Ok(default),
    }
}

impl Config {
    /// Load `.env.dev` / `.env` and read configuration from the environment
    pub fn from_env() -> AppResult<Self> {
        Self::from_env_with_overrides(&[])
    }

    /// Like [`Config::from_env`], with `overrides` taking precedence over the environment
    pub fn from_env_with_overrides(overrides: &[(&str, String)]) -> AppResult<Self> {
        dotenvy::from_filename(".env.dev").ok();
        dotenvy::dotenv().ok();

        Self::from_lookup(|key| {
            overrides
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.clone())
                .or_else(|| env::var(key).ok())
        })
    }

    /// Build configuration from any key lookup
    pub fn from_lookup<F>(lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let provider_id = lookup("LLM_PROVIDER").unwrap_or_else(|| "google".to_string());
        let provider = LLMProvider::from_id(&provider_id)
            .ok_or_else(|| AppError::Config(format!("Unsupported LLM provider: {}", provider_id)))?;

        let api_key = lookup(provider.api_key_var())
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                AppError::Config(format!(
                    "{} must be set to use the {} provider",
                    provider.api_key_var(),
                    provider
                ))
            })?;

        let backend_id = lookup("SEARCH_PROVIDER").unwrap_or_else(|| "duckduckgo".to_string());
        let backend = SearchBackend::from_id(&backend_id)
            .ok_or_else(|| AppError::Config(format!("Unsupported search provider: {}", backend_id)))?;

        let config = Self {
            llm: LLMConfig {
                provider,
                model: lookup("LLM_MODEL").unwrap_or_else(|| default_model(provider).to_string()),
                api_key,
                base_url: lookup("LLM_BASE_URL").filter(|v| !v.is_empty()),
                temperature: parse_var("TEMPERATURE", lookup("TEMPERATURE"), 0.7)?,
                max_tokens: parse_var("LLM_MAX_TOKENS", lookup("LLM_MAX_TOKENS"), 4096)?,
            },
            search: SearchConfig {
                backend,
                serpapi_key: lookup("SERPAPI_API_KEY").unwrap_or_default(),
                serpapi_engine: lookup("SERPAPI_ENGINE").unwrap_or_else(|| "google_light".to_string()),
                base_url: lookup("SEARCH_BASE_URL").filter(|v| !v.is_empty()),
                max_results: parse_var("SEARCH_MAX_RESULTS", lookup("SEARCH_MAX_RESULTS"), 5)?,
                result_limit: parse_var("SEARCH_RESULT_LIMIT", lookup("SEARCH_RESULT_LIMIT"), 800)?,
                parallel: parse_var("PARALLEL_SEARCH", lookup("PARALLEL_SEARCH"), false)?,
            },
            agent: AgentConfig {
                max_iterations: parse_var("MAX_ITERATIONS", lookup("MAX_ITERATIONS"), 2)?,
                max_search_queries: parse_var("MAX_SEARCH_QUERIES", lookup("MAX_SEARCH_QUERIES"), 3)?,
                verbose: parse_var("VERBOSE", lookup("VERBOSE"), true)?,
            },
            request_timeout: Duration::from_secs(parse_var(
                "REQUEST_TIMEOUT_SECS",
                lookup("REQUEST_TIMEOUT_SECS"),
                60,
            )?),
        };

        config.validate()?;
        Ok(config)
    }

    /// Check ranges that parsing alone cannot
    pub fn validate(&self) -> AppResult<()> {
        if self.agent.max_iterations == 0 {
            return Err(AppError::Config("MAX_ITERATIONS must be at least 1".to_string()));
        }
        if self.agent.max_search_queries == 0 {
            return Err(AppError::Config("MAX_SEARCH_QUERIES must be at least 1".to_string()));
        }
        if self.search.max_results == 0 {
            return Err(AppError::Config("SEARCH_MAX_RESULTS must be at least 1".to_string()));
        }
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(AppError::Config(format!(
                "TEMPERATURE must be between 0 and 2, got {}",
                self.llm.temperature
            )));
        }
        if self.request_timeout.is_zero() {
            return Err(AppError::Config("REQUEST_TIMEOUT_SECS must be at least 1".to_string()));
        }
        if self.search.backend == SearchBackend::SerpApi && self.search.serpapi_key.is_empty() {
            return Err(AppError::Config(
                "SERPAPI_API_KEY must be set to use SerpAPI search".to_string(),
            ));
        }
        Ok(())
    }
}

/// Model used when `LLM_MODEL` is unset
pub fn default_model(provider: LLMProvider) -> &'static str {
    match provider {
        LLMProvider::Google => "gemini-2.5-flash",
        LLMProvider::OpenAI => "gpt-4o-mini",
        LLMProvider::Anthropic => "claude-sonnet-4-5",
        LLMProvider::OpenRouter => "google/gemini-2.5-flash",
        LLMProvider::Groq => "llama-3.3-70b-versatile",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup_from(&[("GOOGLE_API_KEY", "g-key")])).unwrap();
        assert_eq!(config.llm.provider, LLMProvider::Google);
        assert_eq!(config.llm.model, "gemini-2.5-flash");
        assert_eq!(config.llm.temperature, 0.7);
        assert_eq!(config.agent.max_iterations, 2);
        assert_eq!(config.agent.max_search_queries, 3);
        assert_eq!(config.search.result_limit, 800);
        assert_eq!(config.search.backend, SearchBackend::DuckDuckGo);
        assert!(!config.search.parallel);
        assert!(config.agent.verbose);
        assert_eq!(config.request_timeout, Duration::from_secs(60));
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup_from(&[
            ("LLM_PROVIDER", "openai"),
            ("OPENAI_API_KEY", "sk-test"),
            ("LLM_MODEL", "gpt-4o"),
            ("MAX_ITERATIONS", "1"),
            ("PARALLEL_SEARCH", "true"),
            ("VERBOSE", "false"),
            ("SEARCH_PROVIDER", "serpapi"),
            ("SERPAPI_API_KEY", "serp"),
        ]))
        .unwrap();
        assert_eq!(config.llm.provider, LLMProvider::OpenAI);
        assert_eq!(config.llm.model, "gpt-4o");
        assert_eq!(config.agent.max_iterations, 1);
        assert!(config.search.parallel);
        assert!(!config.agent.verbose);
        assert_eq!(config.search.backend, SearchBackend::SerpApi);
    }

    #[test]
    fn test_missing_api_key() {
        let err = Config::from_lookup(lookup_from(&[("LLM_PROVIDER", "anthropic")])).unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
        assert!(err.to_string().contains("ANTHROPIC_API_KEY"));
    }

    #[test]
    fn test_invalid_values() {
        let zero_iterations = Config::from_lookup(lookup_from(&[
            ("GOOGLE_API_KEY", "k"),
            ("MAX_ITERATIONS", "0"),
        ]));
        assert!(matches!(zero_iterations, Err(AppError::Config(_))));

        let not_a_number = Config::from_lookup(lookup_from(&[
            ("GOOGLE_API_KEY", "k"),
            ("MAX_SEARCH_QUERIES", "three"),
        ]));
        assert!(matches!(not_a_number, Err(AppError::Config(_))));

        let unknown_provider = Config::from_lookup(lookup_from(&[("LLM_PROVIDER", "glm")]));
        assert!(matches!(unknown_provider, Err(AppError::Config(_))));

        let serpapi_without_key = Config::from_lookup(lookup_from(&[
            ("GOOGLE_API_KEY", "k"),
            ("SEARCH_PROVIDER", "serpapi"),
        ]));
        assert!(matches!(serpapi_without_key, Err(AppError::Config(_))));
    }

    #[test]
    fn test_debug_hides_keys() {
        let config = Config::from_lookup(lookup_from(&[("GOOGLE_API_KEY", "secret-key")])).unwrap();
        assert!(!format!("{:?}", config).contains("secret-key"));
    }
}
