//! OpenAI API client implementation.
//!
//! This module provides a client for the OpenAI API, supporting:
//! - Chat completions
//! - Text embeddings

mod chat;
mod client;
mod config;
mod embedding;
mod types;

pub use client::OpenAI;
pub use config::OpenAIConfig;
