//! LLM integration - OpenRouter API
//!
//! Chat-completions client and the OpenAI-compatible wire types it speaks.

mod client;
mod types;

pub use client::{LlmClient, LlmClientBuilder};
pub use types::{
    ChatRequest, ChatResponse, Choice, CompletionOptions, LlmResponse, Message, MessageRole, Usage,
};
