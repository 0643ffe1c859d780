//! LLM-backed review generation.
//!
//! Wraps an OpenAI-compatible chat-completions endpoint behind
//! [`GeneratorClient`]. Prompts carry the shop's language and a handful of
//! real reviews as few-shot samples; the model answers with a single JSON
//! object that parses into [`GeneratedReview`].

pub mod client;
pub mod error;
pub mod prompt;

pub use client::{GeneratedReview, GeneratorClient, ReviewRequest, ReviewSample};
pub use error::AiError;
