//! Tool Executor
//!
//! Runs the search queries of the latest record and appends one tool-result
//! message carrying every query's output. A failing query is reported inline
//! instead of failing the step.

use std::sync::Arc;

use futures::future::join_all;
use serde::Serialize;
use tracing::{info, warn};

use crate::config::Config;
use crate::models::ConversationState;
use crate::search::SearchProvider;
use crate::types::{AppError, AppResult};
use crate::utils::truncate_chars;

#[derive(Debug, Serialize)]
struct QueryOutcome {
    query: String,
    result: String,
}

pub struct ToolExecutor {
    search: Arc<dyn SearchProvider>,
    max_queries: usize,
    result_limit: usize,
    parallel: bool,
}

impl ToolExecutor {
    pub fn new(
        search: Arc<dyn SearchProvider>,
        max_queries: usize,
        result_limit: usize,
        parallel: bool,
    ) -> Self {
        Self {
            search,
            max_queries,
            result_limit,
            parallel,
        }
    }

    pub fn from_config(search: Arc<dyn SearchProvider>, config: &Config) -> Self {
        Self::new(
            search,
            config.agent.max_search_queries,
            config.search.result_limit,
            config.search.parallel,
        )
    }

    async fn run_query(&self, query: &str) -> QueryOutcome {
        let result = match self.search.search(query).await {
            Ok(text) => truncate_chars(&text, self.result_limit).to_string(),
            Err(e) => {
                warn!(query = %query, error = %e, "Search failed, continuing with remaining queries");
                format!("Search unavailable: {}", e)
            }
        };
        QueryOutcome {
            query: query.to_string(),
            result,
        }
    }

    /// Search for the latest record's queries and append the results
    pub async fn execute(&self, conversation: &mut ConversationState) -> AppResult<()> {
        let (call_id, record) = conversation
            .last_record()
            .ok_or_else(|| AppError::Internal("No structured record to execute searches for".to_string()))?;

        let call_id = call_id.to_string();
        let tool_name = record.tool_name();
        let queries: Vec<String> = record
            .search_queries()
            .iter()
            .take(self.max_queries)
            .cloned()
            .collect();

        info!(
            provider = %self.search.name(),
            queries = queries.len(),
            parallel = self.parallel,
            "Executing search queries"
        );

        let outcomes: Vec<QueryOutcome> = if self.parallel {
            join_all(queries.iter().map(|q| self.run_query(q))).await
        } else {
            let mut outcomes = Vec::with_capacity(queries.len());
            for query in &queries {
                outcomes.push(self.run_query(query).await);
            }
            outcomes
        };

        let output = serde_json::to_string(&outcomes)
            .map_err(|e| AppError::Internal(format!("Failed to encode search results: {}", e)))?;

        conversation.push_tool_result(call_id, tool_name, output);
        info!(results = outcomes.len(), "Search results added to conversation");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AnswerRecord, MessageContent, Reflection, StructuredRecord};
    use crate::testing::ScriptedSearch;
    use std::time::Duration;

    fn conversation_with_queries(queries: &[&str]) -> ConversationState {
        let mut state = ConversationState::new("What are the benefits of intermittent fasting?");
        state.push_record(
            "call_1",
            StructuredRecord::Answer(AnswerRecord {
                answer: "Weight loss and metabolic benefits.".to_string(),
                reflection: Reflection {
                    missing: "Trial data".to_string(),
                    superfluous: "None".to_string(),
                },
                search_queries: queries.iter().map(|q| q.to_string()).collect(),
            }),
        );
        state
    }

    fn tool_output(state: &ConversationState) -> (String, String, Vec<serde_json::Value>) {
        match &state.messages().last().unwrap().content {
            MessageContent::ToolResult {
                call_id,
                tool_name,
                output,
            } => (
                call_id.clone(),
                tool_name.clone(),
                serde_json::from_str(output).unwrap(),
            ),
            other => panic!("expected tool result, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_results_match_record_and_keep_order() {
        let search = Arc::new(ScriptedSearch::default());
        let executor = ToolExecutor::new(search.clone(), 3, 800, false);
        let mut state = conversation_with_queries(&["q1", "q2"]);

        executor.execute(&mut state).await.unwrap();

        let (call_id, tool_name, outcomes) = tool_output(&state);
        assert_eq!(call_id, "call_1");
        assert_eq!(tool_name, "AnswerQuestion");
        assert_eq!(outcomes.len(), 2);
        assert_eq!(outcomes[0]["query"], "q1");
        assert_eq!(outcomes[0]["result"], "results for q1");
        assert_eq!(outcomes[1]["query"], "q2");
        assert_eq!(*search.queries.lock().unwrap(), vec!["q1", "q2"]);
    }

    #[tokio::test]
    async fn test_failed_query_is_isolated() {
        let search = Arc::new(ScriptedSearch::default().failing_on("q2"));
        let executor = ToolExecutor::new(search, 3, 800, false);
        let mut state = conversation_with_queries(&["q1", "q2", "q3"]);

        executor.execute(&mut state).await.unwrap();

        let (_, _, outcomes) = tool_output(&state);
        assert_eq!(outcomes.len(), 3);
        assert_eq!(outcomes[0]["result"], "results for q1");
        assert!(outcomes[1]["result"]
            .as_str()
            .unwrap()
            .starts_with("Search unavailable:"));
        assert_eq!(outcomes[2]["result"], "results for q3");
    }

    #[tokio::test]
    async fn test_parallel_preserves_submission_order() {
        let search = Arc::new(
            ScriptedSearch::default()
                .delayed("slow", Duration::from_millis(50))
                .delayed("medium", Duration::from_millis(20)),
        );
        let executor = ToolExecutor::new(search, 3, 800, true);
        let mut state = conversation_with_queries(&["slow", "medium", "fast"]);

        executor.execute(&mut state).await.unwrap();

        let (_, _, outcomes) = tool_output(&state);
        let order: Vec<_> = outcomes.iter().map(|o| o["query"].as_str().unwrap()).collect();
        assert_eq!(order, vec!["slow", "medium", "fast"]);
    }

    #[tokio::test]
    async fn test_results_are_truncated_and_capped() {
        let search = Arc::new(ScriptedSearch::default());
        let executor = ToolExecutor::new(search.clone(), 2, 7, false);
        let mut state = conversation_with_queries(&["alpha", "beta", "gamma"]);

        executor.execute(&mut state).await.unwrap();

        let (_, _, outcomes) = tool_output(&state);
        assert_eq!(outcomes.len(), 2);
        assert_eq!(outcomes[0]["result"], "results");
        assert_eq!(search.queries.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_empty_queries_still_answer_the_call() {
        let executor = ToolExecutor::new(Arc::new(ScriptedSearch::default()), 3, 800, false);
        let mut state = conversation_with_queries(&[]);

        executor.execute(&mut state).await.unwrap();

        let (call_id, _, outcomes) = tool_output(&state);
        assert_eq!(call_id, "call_1");
        assert!(outcomes.is_empty());
    }

    #[tokio::test]
    async fn test_hung_search_does_not_stall_the_step() {
        let base_url = crate::testing::silent_server().await;
        let client = crate::llm::provider::http_client(Duration::from_secs(1)).unwrap();
        let search = Arc::new(crate::search::DuckDuckGoClient::new(client, Some(base_url.as_str()), 5));
        let executor = ToolExecutor::new(search, 3, 800, false);
        let mut state = conversation_with_queries(&["fasting trials"]);

        let started = std::time::Instant::now();
        executor.execute(&mut state).await.unwrap();

        assert!(started.elapsed() < Duration::from_secs(3));
        let (_, _, outcomes) = tool_output(&state);
        assert_eq!(outcomes.len(), 1);
        assert!(outcomes[0]["result"]
            .as_str()
            .unwrap()
            .starts_with("Search unavailable:"));
    }

    #[tokio::test]
    async fn test_no_record_is_internal_error() {
        let executor = ToolExecutor::new(Arc::new(ScriptedSearch::default()), 3, 800, false);
        let mut state = ConversationState::new("q");

        let err = executor.execute(&mut state).await.unwrap_err();
        assert!(matches!(err, AppError::Internal(_)));
        assert_eq!(state.len(), 1);
    }
}
