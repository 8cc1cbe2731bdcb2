//! Provider-agnostic chat client for the search pipeline's LLM-backed
//! nodes (spec §4.12), generalized from `ai-client`'s `Agent` /
//! `PromptBuilder` pattern into a single trait plus one OpenAI-compatible
//! implementation.

pub mod client;
pub mod message;
pub mod openai_compatible;
mod wire;

pub use client::{ChatClient, ChatOptions};
pub use message::{Message, MessageRole};
pub use openai_compatible::OpenAiCompatibleClient;
