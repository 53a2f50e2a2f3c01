// Conversation data model: messages, answer records, and the append-only log

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::llm::structured::StructuredOutput;
use crate::types::{LLMMessage, ToolCall};

/// Self-critique attached to every answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reflection {
    /// What critical information is missing from the answer
    pub missing: String,
    /// What in the answer is unnecessary
    pub superfluous: String,
}

/// First-pass answer: answer, critique, and queries to fill the gaps
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerRecord {
    pub answer: String,
    pub reflection: Reflection,
    pub search_queries: Vec<String>,
}

/// Revised answer, same shape as [`AnswerRecord`] plus citations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevisedAnswerRecord {
    pub answer: String,
    pub reflection: Reflection,
    pub search_queries: Vec<String>,
    pub references: Vec<String>,
}

fn reflection_schema() -> serde_json::Value {
    json!({
        "type": "object",
        "description": "Critical self-assessment of your answer. Identify what's missing and what's unnecessary.",
        "properties": {
            "missing": {
                "type": "string",
                "description": "What critical information or evidence is missing from the answer. Be specific: mention studies, data, perspectives, or considerations you didn't include."
            },
            "superfluous": {
                "type": "string",
                "description": "What information in the answer is unnecessary or could be removed. Identify tangents, redundancies, or irrelevant details."
            }
        },
        "required": ["missing", "superfluous"]
    })
}

fn search_queries_schema(max_queries: usize) -> serde_json::Value {
    json!({
        "type": "array",
        "items": { "type": "string" },
        "maxItems": max_queries,
        "description": format!(
            "1-{} specific search queries to find the missing information. Base these on what you identified as missing in your reflection.",
            max_queries
        )
    })
}

impl StructuredOutput for AnswerRecord {
    const TOOL_NAME: &'static str = "AnswerQuestion";
    const DESCRIPTION: &'static str =
        "Answer the question, critique the answer, and propose search queries to fill the gaps.";

    fn parameters_schema(max_queries: usize) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "answer": {
                    "type": "string",
                    "description": "Comprehensive answer to the user's question. Write 2-3 detailed paragraphs based on your existing knowledge."
                },
                "reflection": reflection_schema(),
                "search_queries": search_queries_schema(max_queries)
            },
            "required": ["answer", "reflection", "search_queries"]
        })
    }

    fn search_queries_mut(&mut self) -> &mut Vec<String> {
        &mut self.search_queries
    }
}

impl StructuredOutput for RevisedAnswerRecord {
    const TOOL_NAME: &'static str = "ReviseAnswer";
    const DESCRIPTION: &'static str =
        "Revise the previous answer using the search results, cite sources, and critique it again.";

    fn parameters_schema(max_queries: usize) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "answer": {
                    "type": "string",
                    "description": "Improved, evidence-based answer to the user's question in 2-3 paragraphs."
                },
                "reflection": reflection_schema(),
                "search_queries": search_queries_schema(max_queries),
                "references": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "List of URLs or citations used to improve the answer. Extract these from the search results."
                }
            },
            "required": ["answer", "reflection", "search_queries", "references"]
        })
    }

    fn search_queries_mut(&mut self) -> &mut Vec<String> {
        &mut self.search_queries
    }
}

/// Either kind of structured model output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StructuredRecord {
    Answer(AnswerRecord),
    Revision(RevisedAnswerRecord),
}

impl StructuredRecord {
    pub fn tool_name(&self) -> &'static str {
        match self {
            StructuredRecord::Answer(_) => AnswerRecord::TOOL_NAME,
            StructuredRecord::Revision(_) => RevisedAnswerRecord::TOOL_NAME,
        }
    }

    pub fn search_queries(&self) -> &[String] {
        match self {
            StructuredRecord::Answer(r) => &r.search_queries,
            StructuredRecord::Revision(r) => &r.search_queries,
        }
    }

    /// The record's fields as tool-call arguments
    fn arguments(&self) -> serde_json::Value {
        let value = match self {
            StructuredRecord::Answer(r) => serde_json::to_value(r),
            StructuredRecord::Revision(r) => serde_json::to_value(r),
        };
        value.unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    Tool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum MessageContent {
    Text(String),
    Record {
        call_id: String,
        record: StructuredRecord,
    },
    ToolResult {
        /// Id of the record message these results answer
        call_id: String,
        tool_name: String,
        output: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub role: Role,
    pub content: MessageContent,
}

impl Message {
    fn new(role: Role, content: MessageContent) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            role,
            content,
        }
    }

    fn to_llm_message(&self) -> LLMMessage {
        match &self.content {
            MessageContent::Text(text) => match self.role {
                Role::Assistant => LLMMessage::assistant(text.clone()),
                _ => LLMMessage::user(text.clone()),
            },
            MessageContent::Record { call_id, record } => LLMMessage::assistant_tool_call(ToolCall {
                id: call_id.clone(),
                name: record.tool_name().to_string(),
                arguments: record.arguments(),
            }),
            MessageContent::ToolResult {
                call_id,
                tool_name,
                output,
            } => LLMMessage::tool_result(call_id.clone(), tool_name.clone(), output.clone()),
        }
    }
}

/// Ordered, append-only message log threaded through one pipeline run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversationState {
    messages: Vec<Message>,
}

impl ConversationState {
    /// Start a conversation from the user's question
    pub fn new(question: impl Into<String>) -> Self {
        let mut state = Self::default();
        state.push_user(question);
        state
    }

    pub fn push_user(&mut self, text: impl Into<String>) {
        self.messages
            .push(Message::new(Role::User, MessageContent::Text(text.into())));
    }

    pub fn push_record(&mut self, call_id: impl Into<String>, record: StructuredRecord) {
        self.messages.push(Message::new(
            Role::Assistant,
            MessageContent::Record {
                call_id: call_id.into(),
                record,
            },
        ));
    }

    pub fn push_tool_result(
        &mut self,
        call_id: impl Into<String>,
        tool_name: impl Into<String>,
        output: impl Into<String>,
    ) {
        self.messages.push(Message::new(
            Role::Tool,
            MessageContent::ToolResult {
                call_id: call_id.into(),
                tool_name: tool_name.into(),
                output: output.into(),
            },
        ));
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    fn records(&self) -> impl DoubleEndedIterator<Item = (&str, &StructuredRecord)> + '_ {
        self.messages.iter().filter_map(|m| match &m.content {
            MessageContent::Record { call_id, record } => Some((call_id.as_str(), record)),
            _ => None,
        })
    }

    /// Most recent structured record with the id of the call that produced it
    pub fn last_record(&self) -> Option<(&str, &StructuredRecord)> {
        self.records().next_back()
    }

    pub fn first_answer(&self) -> Option<&AnswerRecord> {
        self.records().find_map(|(_, r)| match r {
            StructuredRecord::Answer(a) => Some(a),
            _ => None,
        })
    }

    pub fn last_revision(&self) -> Option<&RevisedAnswerRecord> {
        self.records().rev().find_map(|(_, r)| match r {
            StructuredRecord::Revision(rev) => Some(rev),
            _ => None,
        })
    }

    pub fn revision_count(&self) -> usize {
        self.records()
            .filter(|(_, r)| matches!(r, StructuredRecord::Revision(_)))
            .count()
    }

    /// Provider-neutral history for the next model call
    pub fn to_llm_messages(&self) -> Vec<LLMMessage> {
        self.messages.iter().map(Message::to_llm_message).collect()
    }
}
