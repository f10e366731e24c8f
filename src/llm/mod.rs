//! Chat-completions integration
//!
//! A thin OpenAI-compatible client, the prompt templates, and the reply
//! generator that wraps them with input sanitizing and output filtering.

pub mod client;
pub mod generator;
pub mod prompts;
pub mod types;

pub use client::{ChatCompletion, LlmError, OpenAiClient};
pub use generator::{
    GeneratedReply, GenerationError, GenerationRequest, LlmResponseGenerator, ResponseGenerator,
};
pub use types::{CallProfile, ChatCompletionRequest, ChatMessage};
