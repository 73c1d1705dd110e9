//! LINE Messaging API support.
//!
//! - [`webhook`] - webhook bodies and text-event extraction
//! - [`signature`] - `X-Line-Signature` verification
//! - [`LineClient`] - reply API client

mod client;
mod config;
pub mod signature;
pub mod webhook;

pub use client::LineClient;
pub use config::LineConfig;
pub use signature::{SIGNATURE_HEADER, sign, verify_signature};
pub use webhook::{Event, EventMessage, TextMessage, WebhookPayload};

/// Maximum characters in one text message.
pub const MAX_TEXT_CHARS: usize = 5000;

/// Maximum messages in one reply.
pub const MAX_MESSAGES_PER_REPLY: usize = 5;
