//! bzx LLM - OpenAI-compatible chat completion client

pub mod openai;
pub mod provider;
pub mod types;

pub use openai::OpenAiCompatProvider;
pub use provider::{ChatProvider, LlmError, LlmResult};
pub use types::*;
