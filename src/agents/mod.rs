//! Agent System
//!
//! The reflect-then-revise pipeline that answers a question:
//!
//! - **Initial Responder**: answers, critiques its own answer, proposes searches
//! - **Tool Executor**: runs the proposed searches
//! - **Revisor**: rewrites the answer with the search results and cites sources
//! - **Loop Controller**: decides whether another search/revise cycle runs
//!
//! ## Pipeline Overview
//!
//! ```text
//! User Question
//!      │
//!      ▼
//! ┌─────────────┐
//! │  Initial    │  → Answer + reflection + search queries
//! │  Responder  │
//! └─────────────┘
//!      │
//!      ▼
//! ┌─────────────┐
//! │    Tool     │  → Search results (optionally in parallel)   ◄──┐
//! │  Executor   │                                                 │
//! └─────────────┘                                                 │
//!      │                                                          │
//!      ▼                                                          │
//! ┌─────────────┐                                                 │
//! │   Revisor   │  → Revised answer + references                  │
//! └─────────────┘                                                 │
//!      │                                                          │
//!      ▼                                                          │
//! ┌─────────────┐                                                 │
//! │    Loop     │  → CONTINUE ─────────────────────────────────────┘
//! │ Controller  │  → STOP
//! └─────────────┘
//!      │
//!      ▼
//!  Initial + Final Answer
//! ```

pub mod loop_controller;
pub mod prompts;
pub mod responder;
pub mod tool_executor;

pub use loop_controller::{LoopController, LoopDecision};
pub use responder::{InitialResponder, ParsedRecord, ResponderSettings, Revisor};
pub use tool_executor::ToolExecutor;

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, info_span, Instrument};

use crate::config::Config;
use crate::llm::provider::{http_client, LLMProviderConfig, LLM};
use crate::models::{AnswerRecord, ConversationState, RevisedAnswerRecord, StructuredRecord};
use crate::search::{self, SearchProvider};
use crate::types::{AppError, AppResult};

/// What one run hands back to the caller
#[derive(Debug, Clone, Serialize)]
pub struct AgentOutcome {
    pub run_id: String,
    pub question: String,
    pub initial_answer: AnswerRecord,
    pub final_answer: RevisedAnswerRecord,
    pub revision_count: u32,
    pub message_count: usize,
}

/// Runs the pipeline; holds no per-run state, so one agent can serve many questions
pub struct ReflectionAgent {
    responder: InitialResponder,
    tool_executor: ToolExecutor,
    revisor: Revisor,
    loop_controller: LoopController,
}

impl ReflectionAgent {
    pub fn new(config: &Config, llm: Arc<LLM>, search: Arc<dyn SearchProvider>) -> Self {
        let settings = ResponderSettings::from_config(config);
        Self {
            responder: InitialResponder::new(llm.clone(), settings.clone()),
            tool_executor: ToolExecutor::from_config(search, config),
            revisor: Revisor::new(llm, settings),
            loop_controller: LoopController::new(config.agent.max_iterations),
        }
    }

    /// Build the configured model and search backends
    pub fn from_config(config: &Config) -> AppResult<Self> {
        let llm = LLM::new(LLMProviderConfig {
            name: config.llm.provider.to_string(),
            api_key: config.llm.api_key.clone(),
            base_url: config.llm.base_url.clone(),
            timeout: config.request_timeout,
        })?;
        let search = search::from_config(&config.search, http_client(config.request_timeout)?)?;

        info!(
            provider = %llm.provider_name(),
            model = %config.llm.model,
            search = %search.name(),
            max_iterations = config.agent.max_iterations,
            "Reflection agent ready"
        );

        Ok(Self::new(config, Arc::new(llm), Arc::from(search)))
    }

    /// Answer `question`, revising up to the configured number of times
    pub async fn run(&self, question: &str) -> AppResult<AgentOutcome> {
        let question = question.trim();
        if question.is_empty() {
            return Err(AppError::InvalidRequest("Question must not be empty".to_string()));
        }

        let run_id = uuid::Uuid::new_v4().to_string();
        let span = info_span!("reflection_run", run_id = %run_id);

        async {
            info!(question_len = question.len(), "Starting reflection pipeline");
            let conversation = self.execute_pipeline(question).await?;
            let outcome = Self::extract_outcome(run_id.clone(), question, &conversation)?;
            info!(
                revisions = outcome.revision_count,
                messages = outcome.message_count,
                references = outcome.final_answer.references.len(),
                "Reflection pipeline complete"
            );
            Ok::<_, AppError>(outcome)
        }
        .instrument(span)
        .await
    }

    async fn execute_pipeline(&self, question: &str) -> AppResult<ConversationState> {
        let mut conversation = ConversationState::new(question);

        let initial = self.responder.respond(&conversation).await?;
        conversation.push_record(initial.call_id, StructuredRecord::Answer(initial.record));

        let mut revisions_completed = 0u32;
        loop {
            self.tool_executor.execute(&mut conversation).await?;

            let revised = self.revisor.revise(&conversation).await?;
            conversation.push_record(revised.call_id, StructuredRecord::Revision(revised.record));
            revisions_completed += 1;

            match self.loop_controller.decide(revisions_completed) {
                LoopDecision::Stop => break,
                LoopDecision::Continue => {
                    info!(
                        cycle = revisions_completed + 1,
                        max = self.loop_controller.max_iterations(),
                        "Starting another revision cycle"
                    );
                }
            }
        }

        Ok(conversation)
    }

    fn extract_outcome(
        run_id: String,
        question: &str,
        conversation: &ConversationState,
    ) -> AppResult<AgentOutcome> {
        let initial_answer = conversation.first_answer().cloned().ok_or_else(|| {
            AppError::MalformedResponse("Conversation has no initial answer".to_string())
        })?;
        let final_answer = conversation.last_revision().cloned().ok_or_else(|| {
            AppError::MalformedResponse("Conversation has no revised answer".to_string())
        })?;

        Ok(AgentOutcome {
            run_id,
            question: question.to_string(),
            initial_answer,
            final_answer,
            revision_count: conversation.revision_count() as u32,
            message_count: conversation.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{answer_response, revision_response, scripted_llm, ScriptedSearch};
    use crate::types::{LLMResponse, TokenUsage};
    use std::collections::HashMap;

    fn config(max_iterations: u32, parallel: bool) -> Config {
        let vars: HashMap<&str, String> = [
            ("GOOGLE_API_KEY", "test-key".to_string()),
            ("MAX_ITERATIONS", max_iterations.to_string()),
            ("PARALLEL_SEARCH", parallel.to_string()),
        ]
        .into_iter()
        .collect();
        Config::from_lookup(|key| vars.get(key).cloned()).unwrap()
    }

    #[tokio::test]
    async fn test_single_iteration_runs_generate_search_revise() {
        let (llm, requests) = scripted_llm(vec![
            answer_response(&["2+2 arithmetic"]),
            revision_response("2 + 2 = 4, basic arithmetic.", &[]),
        ]);
        let search = Arc::new(ScriptedSearch::default());
        let agent = ReflectionAgent::new(&config(1, false), Arc::new(llm), search.clone());

        let outcome = agent.run("What is 2+2?").await.unwrap();

        assert_eq!(requests.lock().unwrap().len(), 2);
        assert_eq!(*search.queries.lock().unwrap(), vec!["2+2 arithmetic"]);
        assert_eq!(outcome.revision_count, 1);
        assert_eq!(outcome.initial_answer.answer, "2 + 2 equals 4.");
        assert_eq!(outcome.final_answer.answer, "2 + 2 = 4, basic arithmetic.");
        // question, answer, search results, revision
        assert_eq!(outcome.message_count, 4);
        assert!(!outcome.run_id.is_empty());
    }

    #[tokio::test]
    async fn test_stops_after_max_iterations() {
        let (llm, requests) = scripted_llm(vec![
            answer_response(&["q1"]),
            revision_response("first", &["q2"]),
            revision_response("second", &["q3"]),
            revision_response("never requested", &[]),
        ]);
        let search = Arc::new(ScriptedSearch::default());
        let agent = ReflectionAgent::new(&config(2, false), Arc::new(llm), search.clone());

        let outcome = agent.run("Benefits of intermittent fasting?").await.unwrap();

        assert_eq!(outcome.revision_count, 2);
        assert_eq!(outcome.final_answer.answer, "second");
        assert_eq!(requests.lock().unwrap().len(), 3);
        assert_eq!(*search.queries.lock().unwrap(), vec!["q1", "q2"]);
    }

    #[tokio::test]
    async fn test_revisor_sees_search_results() {
        let (llm, requests) = scripted_llm(vec![
            answer_response(&["fasting trials"]),
            revision_response("revised", &[]),
        ]);
        let agent = ReflectionAgent::new(
            &config(1, true),
            Arc::new(llm),
            Arc::new(ScriptedSearch::default()),
        );

        agent.run("Benefits of fasting?").await.unwrap();

        let sent = requests.lock().unwrap();
        let history = &sent[1].messages;
        assert_eq!(history.len(), 3);
        assert_eq!(history[1].role, "assistant");
        assert_eq!(history[2].role, "tool");
        assert_eq!(history[2].tool_call_id, Some(history[1].tool_calls[0].id.clone()));
        assert!(history[2].content.contains("results for fasting trials"));
        assert_eq!(sent[1].tool_choice.as_deref(), Some("ReviseAnswer"));
    }

    #[tokio::test]
    async fn test_search_failure_does_not_abort_run() {
        let (llm, _) = scripted_llm(vec![
            answer_response(&["good", "bad"]),
            revision_response("done", &[]),
        ]);
        let search = Arc::new(ScriptedSearch::default().failing_on("bad"));
        let agent = ReflectionAgent::new(&config(1, false), Arc::new(llm), search);

        let outcome = agent.run("q").await.unwrap();
        assert_eq!(outcome.final_answer.answer, "done");
    }

    #[tokio::test]
    async fn test_malformed_revision_fails_run() {
        let incomplete = LLMResponse {
            content: String::new(),
            tool_calls: vec![crate::types::ToolCall {
                id: "call_x".to_string(),
                name: "ReviseAnswer".to_string(),
                arguments: serde_json::json!({ "answer": "4" }),
            }],
            finish_reason: "tool_calls".to_string(),
            usage: TokenUsage::default(),
        };
        let (llm, _) = scripted_llm(vec![answer_response(&["q"]), incomplete]);
        let agent = ReflectionAgent::new(
            &config(1, false),
            Arc::new(llm),
            Arc::new(ScriptedSearch::default()),
        );

        let err = agent.run("What is 2+2?").await.unwrap_err();
        assert!(matches!(err, AppError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn test_empty_question_is_rejected() {
        let (llm, requests) = scripted_llm(vec![]);
        let agent = ReflectionAgent::new(
            &config(1, false),
            Arc::new(llm),
            Arc::new(ScriptedSearch::default()),
        );

        let err = agent.run("   ").await.unwrap_err();
        assert!(matches!(err, AppError::InvalidRequest(_)));
        assert!(requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_queries_bounded_in_every_record() {
        let (llm, _) = scripted_llm(vec![
            answer_response(&["a", "b", "c", "d"]),
            revision_response("r1", &["e", "f", "g", "h", "i"]),
            revision_response("r2", &[]),
        ]);
        let search = Arc::new(ScriptedSearch::default());
        let agent = ReflectionAgent::new(&config(2, false), Arc::new(llm), search.clone());

        let outcome = agent.run("q").await.unwrap();

        assert_eq!(outcome.initial_answer.search_queries.len(), 3);
        assert_eq!(search.queries.lock().unwrap().len(), 6);
    }

    #[tokio::test]
    async fn test_outcome_serializes() {
        let (llm, _) = scripted_llm(vec![answer_response(&[]), revision_response("4", &[])]);
        let agent = ReflectionAgent::new(
            &config(1, false),
            Arc::new(llm),
            Arc::new(ScriptedSearch::default()),
        );

        let outcome = agent.run("What is 2+2?").await.unwrap();
        let value = serde_json::to_value(&outcome).unwrap();
        assert_eq!(value["question"], "What is 2+2?");
        assert_eq!(value["final_answer"]["references"][0], "https://example.com/source");
        assert_eq!(value["revision_count"], 1);
    }
}
