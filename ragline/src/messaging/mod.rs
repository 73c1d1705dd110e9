//! Messaging platform integration.
//!
//! The relay talks to a platform through [`ReplySink`], so tests and other
//! transports can stand in for the LINE client.

mod error;
pub mod line;
mod split;

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;

pub use error::MessagingError;
pub use split::split_reply;

/// Delivers reply messages for an inbound event.
#[async_trait]
pub trait ReplySink: Send + Sync {
    /// Send `texts` as the reply for `reply_token`.
    async fn reply(&self, reply_token: &str, texts: &[String]) -> Result<()>;

    /// Platform name used in logs.
    fn platform(&self) -> &'static str;
}

/// A shared reply sink.
pub type SharedReplySink = Arc<dyn ReplySink>;
