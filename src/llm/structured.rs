//! Structured extraction
//!
//! Records are requested from the model as a forced function call. This module
//! owns the two ends of that exchange: the tool definition sent with the request
//! and `parse_record`, which turns a raw response back into a typed record.
//! Providers only ever see [`ToolDefinition`]s and return [`ToolCall`]s, so the
//! binding mechanism can change without touching the agents.

use serde::de::DeserializeOwned;
use tracing::debug;

use crate::types::{AppError, AppResult, LLMResponse, ToolCall, ToolDefinition};
use crate::utils::extract_json_block;

/// A record the model fills in through a named tool
pub trait StructuredOutput: DeserializeOwned + Sized {
    const TOOL_NAME: &'static str;
    const DESCRIPTION: &'static str;

    /// JSON schema of the tool arguments
    fn parameters_schema(max_queries: usize) -> serde_json::Value;

    fn search_queries_mut(&mut self) -> &mut Vec<String>;

    fn tool_definition(max_queries: usize) -> ToolDefinition {
        ToolDefinition {
            name: Self::TOOL_NAME.to_string(),
            description: Self::DESCRIPTION.to_string(),
            parameters: Self::parameters_schema(max_queries),
        }
    }

    /// Drop queries past `max`, returning how many were dropped
    fn limit_queries(&mut self, max: usize) -> usize {
        let queries = self.search_queries_mut();
        let dropped = queries.len().saturating_sub(max);
        queries.truncate(max);
        dropped
    }
}

/// Pick the tool call carrying `T`'s record, if the model made one
fn find_call<'a, T: StructuredOutput>(calls: &'a [ToolCall]) -> Option<&'a ToolCall> {
    calls
        .iter()
        .find(|c| c.name == T::TOOL_NAME)
        .or_else(|| calls.first())
}

/// Parse a model response into `T`
///
/// Tool-call arguments are preferred; a JSON object in the text content is
/// accepted as a fallback for providers that answer in prose. Any missing
/// required field is a [`AppError::MalformedResponse`].
pub fn parse_record<T: StructuredOutput>(response: &LLMResponse) -> AppResult<T> {
    if let Some(call) = find_call::<T>(&response.tool_calls) {
        debug!(tool = %call.name, call_id = %call.id, "Parsing record from tool call");
        // Some providers send arguments as an encoded JSON string
        let arguments = match &call.arguments {
            serde_json::Value::String(raw) => serde_json::from_str(raw).map_err(|e| {
                AppError::MalformedResponse(format!(
                    "{} arguments are not valid JSON: {}",
                    T::TOOL_NAME,
                    e
                ))
            })?,
            other => other.clone(),
        };
        return serde_json::from_value(arguments).map_err(|e| {
            AppError::MalformedResponse(format!("{} record is incomplete: {}", T::TOOL_NAME, e))
        });
    }

    let content = response.content.trim();
    if content.is_empty() {
        return Err(AppError::MalformedResponse(format!(
            "model returned neither a {} call nor text content",
            T::TOOL_NAME
        )));
    }

    debug!(content_len = content.len(), "No tool call in response, parsing text content");
    serde_json::from_str(extract_json_block(content)).map_err(|e| {
        AppError::MalformedResponse(format!(
            "could not read a {} record from text content: {}",
            T::TOOL_NAME,
            e
        ))
    })
}
