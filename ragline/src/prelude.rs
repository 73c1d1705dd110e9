//! Prelude module for convenient imports.
//!
//! # Usage
//!
//! ```rust,ignore
//! use ragline::prelude::*;
//! ```

pub use crate::llms::{OpenAI, OpenAIConfig};

pub use crate::error::{Error, IndexError, LlmError, MessagingError, Result};

pub use crate::chat::{ChatProvider, ChatRequest, ChatResponse, SharedChatProvider, StopReason};
pub use crate::embedding::{
    Embedding, EmbeddingProvider, EmbeddingRequest, EmbeddingResponse, SharedEmbeddingProvider,
};
pub use crate::message::{Message, Role};
pub use crate::usage::Usage;

pub use crate::messaging::line::{Event, LineClient, LineConfig, TextMessage, WebhookPayload};
pub use crate::messaging::{ReplySink, SharedReplySink, split_reply};

pub use crate::prompt::PromptTemplate;
pub use crate::relay::{EventOutcome, Relay, RelayReport, RelaySettings};
pub use crate::retrieval::{
    Hit, IndexBuilder, IndexEntry, IndexFile, IndexParams, Retriever, VectorIndex,
};
pub use crate::server::{ServerConfig, router, serve, shutdown_signal};
