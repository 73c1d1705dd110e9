//! LLM backend implementations.
//!
//! # Available Backends
//!
//! - [`openai`] - OpenAI API (and OpenAI-compatible servers via `base_url`)

mod error;
pub mod openai;

pub use error::LlmError;
pub use openai::{OpenAI, OpenAIConfig};
