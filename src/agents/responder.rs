//! Initial Responder and Revisor
//!
//! Both make one model call with a fixed system instruction and the whole
//! conversation, force their record's tool, and parse the result. Neither
//! retries: a failed call or an unreadable record ends the run.

use std::sync::Arc;

use tracing::{info, warn};

use crate::agents::prompts;
use crate::config::Config;
use crate::llm::provider::LLM;
use crate::llm::structured::{parse_record, StructuredOutput};
use crate::models::{AnswerRecord, ConversationState, RevisedAnswerRecord};
use crate::types::{AppResult, LLMRequest, TokenUsage};

/// Model settings shared by both responders
#[derive(Debug, Clone)]
pub struct ResponderSettings {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub max_search_queries: usize,
}

impl ResponderSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            model: config.llm.model.clone(),
            temperature: config.llm.temperature,
            max_tokens: config.llm.max_tokens,
            max_search_queries: config.agent.max_search_queries,
        }
    }
}

/// A record together with the id of the call that produced it
#[derive(Debug, Clone)]
pub struct ParsedRecord<T> {
    pub call_id: String,
    pub record: T,
    pub usage: TokenUsage,
}

async fn invoke_structured<T: StructuredOutput>(
    llm: &LLM,
    settings: &ResponderSettings,
    system_instruction: String,
    conversation: &ConversationState,
) -> AppResult<ParsedRecord<T>> {
    let request = LLMRequest {
        model: settings.model.clone(),
        messages: conversation.to_llm_messages(),
        max_tokens: Some(settings.max_tokens),
        temperature: Some(settings.temperature),
        system_instruction: Some(system_instruction),
        tools: vec![T::tool_definition(settings.max_search_queries)],
        tool_choice: Some(T::TOOL_NAME.to_string()),
    };

    let response = llm.create_chat_completion(&request).await?;
    let mut record: T = parse_record(&response)?;

    let dropped = record.limit_queries(settings.max_search_queries);
    if dropped > 0 {
        warn!(
            tool = T::TOOL_NAME,
            dropped,
            limit = settings.max_search_queries,
            "Model proposed too many search queries, extra queries dropped"
        );
    }

    let call_id = response
        .tool_calls
        .iter()
        .find(|c| c.name == T::TOOL_NAME)
        .or_else(|| response.tool_calls.first())
        .map(|c| c.id.clone())
        .filter(|id| !id.is_empty())
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    Ok(ParsedRecord {
        call_id,
        record,
        usage: response.usage,
    })
}

/// Produces the first answer, its critique, and the gap-filling queries
pub struct InitialResponder {
    llm: Arc<LLM>,
    settings: ResponderSettings,
}

impl InitialResponder {
    pub fn new(llm: Arc<LLM>, settings: ResponderSettings) -> Self {
        Self { llm, settings }
    }

    pub async fn respond(
        &self,
        conversation: &ConversationState,
    ) -> AppResult<ParsedRecord<AnswerRecord>> {
        info!(provider = %self.llm.provider_name(), model = %self.settings.model, "Generating initial response with self-critique");

        let parsed: ParsedRecord<AnswerRecord> = invoke_structured(
            &self.llm,
            &self.settings,
            prompts::initial_instruction(self.settings.max_search_queries),
            conversation,
        )
        .await?;

        info!(
            answer_chars = parsed.record.answer.chars().count(),
            queries = parsed.record.search_queries.len(),
            tokens = parsed.usage.total_tokens,
            missing = %parsed.record.reflection.missing,
            "Initial answer generated"
        );
        Ok(parsed)
    }
}

/// Rewrites the latest answer using the search results in the conversation
pub struct Revisor {
    llm: Arc<LLM>,
    settings: ResponderSettings,
}

impl Revisor {
    pub fn new(llm: Arc<LLM>, settings: ResponderSettings) -> Self {
        Self { llm, settings }
    }

    pub async fn revise(
        &self,
        conversation: &ConversationState,
    ) -> AppResult<ParsedRecord<RevisedAnswerRecord>> {
        info!(messages = conversation.len(), "Revising answer with research findings");

        let parsed: ParsedRecord<RevisedAnswerRecord> = invoke_structured(
            &self.llm,
            &self.settings,
            prompts::revision_instruction(self.settings.max_search_queries),
            conversation,
        )
        .await?;

        info!(
            answer_chars = parsed.record.answer.chars().count(),
            references = parsed.record.references.len(),
            queries = parsed.record.search_queries.len(),
            tokens = parsed.usage.total_tokens,
            "Answer revised"
        );
        Ok(parsed)
    }
}
