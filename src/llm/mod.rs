// LLM abstraction layer

pub mod provider;
pub mod structured;
pub mod openai;
pub mod anthropic;
pub mod google;
pub mod openrouter;
pub mod groq;

pub use provider::*;
pub use structured::{parse_record, StructuredOutput};
