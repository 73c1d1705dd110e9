//! ragline - A retrieval-augmented LLM relay for the LINE Messaging API
//!
//! LINE posts a webhook for each user message. ragline verifies the
//! signature, optionally looks up reference passages in a precomputed
//! embedding index, asks an OpenAI chat model for an answer, and sends it
//! back with the event's one-time reply token.
//!
//! The pieces are usable on their own:
//! - [`llms::OpenAI`] implements [`chat::ChatProvider`] and
//!   [`embedding::EmbeddingProvider`]
//! - [`messaging::line`] holds webhook types, signature checks and the
//!   reply client
//! - [`retrieval`] builds, loads and searches the vector index
//! - [`relay::Relay`] wires them together and [`server`] exposes it over HTTP

pub mod chat;
pub mod embedding;
pub mod error;
pub mod llms;
pub mod message;
pub mod messaging;
pub mod prelude;
pub mod prompt;
pub mod relay;
pub mod retrieval;
pub mod server;
pub mod usage;

pub use error::{Error, LlmError, Result};
