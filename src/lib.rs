// Reflection Agent - answer, self-critique, search, and revise with cited sources

pub mod agents;
pub mod config;
pub mod display;
pub mod llm;
pub mod models;
pub mod search;    // Web search backends (DuckDuckGo, SerpAPI)
pub mod types;
pub mod utils;

#[cfg(test)]
pub(crate) mod testing;

// Re-exports for convenience
pub use agents::{AgentOutcome, ReflectionAgent};
pub use config::Config;
