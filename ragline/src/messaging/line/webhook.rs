//! LINE webhook request bodies.
//!
//! Only the fields the relay reads are modelled. Unknown fields are ignored
//! and unknown message kinds deserialize to [`EventMessage::Other`], so a
//! new event shape on LINE's side never rejects the whole delivery.

use serde::{Deserialize, Serialize};

use crate::messaging::MessagingError;

/// Body of a webhook POST from the LINE platform.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WebhookPayload {
    /// Bot user ID that should receive the events.
    #[serde(default)]
    pub destination: Option<String>,
    /// Events in delivery order. Verification requests send an empty list.
    #[serde(default)]
    pub events: Vec<Event>,
}

impl WebhookPayload {
    /// Parse a raw webhook body.
    pub fn from_slice(body: &[u8]) -> Result<Self, MessagingError> {
        serde_json::from_slice(body).map_err(|e| MessagingError::Payload(e.to_string()))
    }
}

/// One webhook event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    /// Event type (`message`, `follow`, `postback`, ...).
    #[serde(rename = "type")]
    pub kind: String,
    /// One-time token for the reply API.
    #[serde(default)]
    pub reply_token: Option<String>,
    /// Sender of the event.
    #[serde(default)]
    pub source: Option<Source>,
    /// Milliseconds since the epoch.
    #[serde(default)]
    pub timestamp: Option<i64>,
    /// Channel mode, `active` or `standby`.
    #[serde(default)]
    pub mode: Option<String>,
    /// Message body for `message` events.
    #[serde(default)]
    pub message: Option<EventMessage>,
    /// Unique event ID, stable across redeliveries.
    #[serde(default)]
    pub webhook_event_id: Option<String>,
    /// Redelivery marker.
    #[serde(default)]
    pub delivery_context: Option<DeliveryContext>,
}

/// Who sent the event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Source {
    /// `user`, `group` or `room`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Sending user, absent for some group events.
    #[serde(default)]
    pub user_id: Option<String>,
    /// Group the event came from.
    #[serde(default)]
    pub group_id: Option<String>,
    /// Multi-person chat the event came from.
    #[serde(default)]
    pub room_id: Option<String>,
}

/// Message body of a `message` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum EventMessage {
    /// Plain text message.
    Text {
        /// Message ID.
        #[serde(default)]
        id: String,
        /// Message text.
        text: String,
    },
    /// Any other kind (image, sticker, location, ...).
    #[serde(other)]
    Other,
}

/// Delivery metadata attached to each event.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryContext {
    /// True when LINE is resending an event it could not deliver before.
    #[serde(default)]
    pub is_redelivery: bool,
}

/// A text message event that can be answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextMessage<'a> {
    /// Message text as typed by the user.
    pub text: &'a str,
    /// Reply token for answering this message.
    pub reply_token: &'a str,
    /// Sender's user ID, when LINE provides it.
    pub user_id: Option<&'a str>,
}

impl Event {
    /// Returns the text message carried by this event, if it is a
    /// `message` event with a text body and a reply token.
    #[must_use]
    pub fn as_text_message(&self) -> Option<TextMessage<'_>> {
        if self.kind != "message" {
            return None;
        }
        let Some(EventMessage::Text { text, .. }) = &self.message else {
            return None;
        };
        let reply_token = self.reply_token.as_deref().filter(|t| !t.is_empty())?;

        Some(TextMessage {
            text,
            reply_token,
            user_id: self.source.as_ref().and_then(|s| s.user_id.as_deref()),
        })
    }

    /// Returns true if LINE flagged this event as a redelivery.
    #[must_use]
    pub fn is_redelivery(&self) -> bool {
        self.delivery_context.is_some_and(|c| c.is_redelivery)
    }
}
