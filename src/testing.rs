// Scripted model and search doubles for pipeline tests

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use crate::llm::provider::{LLMAdapter, LLM};
use crate::search::{SearchError, SearchProvider};
use crate::types::{AppError, AppResult, LLMRequest, LLMResponse, TokenUsage, ToolCall};

pub type RequestLog = Arc<Mutex<Vec<LLMRequest>>>;

/// Replays canned responses in order and records every request
struct ScriptedAdapter {
    responses: Mutex<VecDeque<LLMResponse>>,
    requests: RequestLog,
}

#[async_trait]
impl LLMAdapter for ScriptedAdapter {
    async fn create_chat_completion(&self, request: &LLMRequest) -> AppResult<LLMResponse> {
        self.requests.lock().unwrap().push(request.clone());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| AppError::LLMApi("scripted model has no more responses".to_string()))
    }
}

pub fn scripted_llm(responses: Vec<LLMResponse>) -> (LLM, RequestLog) {
    let requests = RequestLog::default();
    let adapter = ScriptedAdapter {
        responses: Mutex::new(responses.into()),
        requests: requests.clone(),
    };
    (LLM::from_adapter("scripted", Box::new(adapter)), requests)
}

fn tool_call_response(name: &str, arguments: serde_json::Value) -> LLMResponse {
    LLMResponse {
        content: String::new(),
        tool_calls: vec![ToolCall {
            id: format!("call_{}", uuid::Uuid::new_v4().simple()),
            name: name.to_string(),
            arguments,
        }],
        finish_reason: "tool_calls".to_string(),
        usage: TokenUsage {
            prompt_tokens: 100,
            completion_tokens: 50,
            total_tokens: 150,
        },
    }
}

pub fn answer_response(queries: &[&str]) -> LLMResponse {
    tool_call_response(
        "AnswerQuestion",
        json!({
            "answer": "2 + 2 equals 4.",
            "reflection": { "missing": "Nothing substantial", "superfluous": "None" },
            "search_queries": queries,
        }),
    )
}

pub fn revision_response(answer: &str, queries: &[&str]) -> LLMResponse {
    tool_call_response(
        "ReviseAnswer",
        json!({
            "answer": answer,
            "reflection": { "missing": "None", "superfluous": "None" },
            "search_queries": queries,
            "references": ["https://example.com/source"],
        }),
    )
}

/// Search double: fixed per-query outcomes, optional per-query delay
#[derive(Default)]
pub struct ScriptedSearch {
    failures: Vec<String>,
    delays: HashMap<String, Duration>,
    pub queries: Mutex<Vec<String>>,
}

impl ScriptedSearch {
    pub fn failing_on(mut self, query: &str) -> Self {
        self.failures.push(query.to_string());
        self
    }

    pub fn delayed(mut self, query: &str, delay: Duration) -> Self {
        self.delays.insert(query.to_string(), delay);
        self
    }
}

#[async_trait]
impl SearchProvider for ScriptedSearch {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn search(&self, query: &str) -> Result<String, SearchError> {
        self.queries.lock().unwrap().push(query.to_string());
        if let Some(delay) = self.delays.get(query) {
            tokio::time::sleep(*delay).await;
        }
        if self.failures.iter().any(|q| q == query) {
            return Err(SearchError::RequestFailed("connection reset".to_string()));
        }
        Ok(format!("results for {}", query))
    }
}

/// Base URL of a server that accepts connections and never answers
pub async fn silent_server() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });
    format!("http://{}", addr)
}
