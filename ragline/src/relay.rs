//! The webhook-to-model-to-reply pipeline.
//!
//! For every text message in a webhook delivery the relay:
//! 1. optionally looks up reference passages with the [`Retriever`],
//! 2. renders the system instruction with the [`PromptTemplate`],
//! 3. calls the chat model with the instruction and the user's text,
//! 4. splits the answer into LINE-sized messages and sends them with the
//!    event's reply token.
//!
//! Events are independent: a failure on one is logged and counted, and the
//! rest of the delivery is still processed.

use tracing::{debug, info, instrument, warn};

use crate::chat::{ChatRequest, SharedChatProvider};
use crate::error::{LlmError, Result};
use crate::messaging::line::{Event, MAX_MESSAGES_PER_REPLY, MAX_TEXT_CHARS, TextMessage, WebhookPayload};
use crate::messaging::{SharedReplySink, split_reply};
use crate::prompt::PromptTemplate;
use crate::retrieval::{Hit, Retriever};

/// Tunables for reply handling.
#[derive(Debug, Clone)]
pub struct RelaySettings {
    /// Sent when the model call fails or returns nothing.
    pub fallback_reply: Option<String>,
    /// Skip events LINE marks as redelivered.
    pub skip_redeliveries: bool,
    /// Completion token cap passed to the model.
    pub max_completion_tokens: Option<u32>,
    /// Sampling temperature passed to the model.
    pub temperature: Option<f32>,
    /// Maximum characters per reply message.
    pub max_chars: usize,
    /// Maximum messages per reply.
    pub max_messages: usize,
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self {
            fallback_reply: None,
            skip_redeliveries: true,
            max_completion_tokens: None,
            temperature: None,
            max_chars: MAX_TEXT_CHARS,
            max_messages: MAX_MESSAGES_PER_REPLY,
        }
    }
}

/// What happened to a single event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOutcome {
    /// The model's answer was delivered.
    Replied,
    /// The model failed and the fallback text was delivered instead.
    FallbackSent,
    /// Not a text message, no reply token, or a skipped redelivery.
    Skipped,
    /// Nothing could be delivered.
    Failed,
}

/// Tally of one webhook delivery.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelayReport {
    /// Events in the payload.
    pub received: usize,
    /// Events answered by the model.
    pub handled: usize,
    /// Events that needed no reply.
    pub skipped: usize,
    /// Events where the model or the reply failed. Includes events answered
    /// with the fallback text.
    pub failed: usize,
}

impl RelayReport {
    fn record(&mut self, outcome: EventOutcome) {
        match outcome {
            EventOutcome::Replied => self.handled += 1,
            EventOutcome::Skipped => self.skipped += 1,
            EventOutcome::FallbackSent | EventOutcome::Failed => self.failed += 1,
        }
    }
}

/// Orchestrates retrieval, the chat model and the reply sink.
#[derive(Clone)]
pub struct Relay {
    chat: SharedChatProvider,
    retriever: Option<Retriever>,
    sink: SharedReplySink,
    prompt: PromptTemplate,
    model: String,
    settings: RelaySettings,
}

impl std::fmt::Debug for Relay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Relay")
            .field("provider", &self.chat.provider_name())
            .field("platform", &self.sink.platform())
            .field("retriever", &self.retriever)
            .field("model", &self.model)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl Relay {
    /// Create a relay without retrieval, using the provider's default model.
    #[must_use]
    pub fn new(chat: SharedChatProvider, sink: SharedReplySink) -> Self {
        Self {
            chat,
            retriever: None,
            sink,
            prompt: PromptTemplate::default(),
            model: String::new(),
            settings: RelaySettings::default(),
        }
    }

    /// Enables retrieval augmentation.
    #[must_use]
    pub fn with_retriever(mut self, retriever: Retriever) -> Self {
        self.retriever = Some(retriever);
        self
    }

    /// Sets the prompt template.
    #[must_use]
    pub fn with_prompt(mut self, prompt: PromptTemplate) -> Self {
        self.prompt = prompt;
        self
    }

    /// Sets the chat model. Empty means the provider default.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Sets reply handling options.
    #[must_use]
    pub fn with_settings(mut self, settings: RelaySettings) -> Self {
        self.settings = settings;
        self
    }

    /// Returns true if retrieval is enabled.
    #[must_use]
    pub const fn has_retriever(&self) -> bool {
        self.retriever.is_some()
    }

    /// Process every event of a webhook delivery in order.
    pub async fn handle_payload(&self, payload: &WebhookPayload) -> RelayReport {
        let mut report = RelayReport {
            received: payload.events.len(),
            ..RelayReport::default()
        };

        for event in &payload.events {
            report.record(self.handle_event(event).await);
        }

        if report.received > 0 {
            info!(
                received = report.received,
                handled = report.handled,
                skipped = report.skipped,
                failed = report.failed,
                "webhook processed"
            );
        }
        report
    }

    /// Process one event. Never fails; problems are logged.
    #[instrument(skip_all, fields(event_id = event.webhook_event_id.as_deref().unwrap_or("-")))]
    pub async fn handle_event(&self, event: &Event) -> EventOutcome {
        let Some(message) = event.as_text_message() else {
            debug!(kind = %event.kind, "ignoring non-text event");
            return EventOutcome::Skipped;
        };

        if self.settings.skip_redeliveries && event.is_redelivery() {
            info!("skipping redelivered event");
            return EventOutcome::Skipped;
        }

        match self.answer(message).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(error = %e, "failed to answer message");
                EventOutcome::Failed
            }
        }
    }

    async fn answer(&self, message: TextMessage<'_>) -> Result<EventOutcome> {
        let (reply, outcome) = match self.complete(message.text, message.user_id).await {
            Ok(text) => (text, EventOutcome::Replied),
            Err(e) => match &self.settings.fallback_reply {
                Some(fallback) => {
                    warn!(error = %e, "model call failed, sending fallback reply");
                    (fallback.clone(), EventOutcome::FallbackSent)
                }
                None => return Err(e),
            },
        };

        let chunks = split_reply(&reply, self.settings.max_chars, self.settings.max_messages);
        if chunks.is_empty() {
            return Err(LlmError::response_format("non-empty reply", "empty reply").into());
        }
        self.sink.reply(message.reply_token, &chunks).await?;
        debug!(messages = chunks.len(), platform = self.sink.platform(), "reply sent");
        Ok(outcome)
    }

    /// Run retrieval and the chat model for one user message and return the
    /// answer text.
    ///
    /// Retrieval failures are logged and the query proceeds without
    /// reference passages. An empty answer is an error.
    pub async fn complete(&self, text: &str, user_id: Option<&str>) -> Result<String> {
        let hits = self.retrieve(text).await;
        let mut request = ChatRequest::new(self.model.clone())
            .system(self.prompt.render(&hits))
            .user(text);
        request.max_completion_tokens = self.settings.max_completion_tokens;
        request.temperature = self.settings.temperature;
        if let Some(user_id) = user_id {
            request = request.user_id(user_id);
        }

        let response = self.chat.chat(&request).await?;
        if response.is_truncated() {
            debug!("model answer hit the token limit");
        }

        response
            .text()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_owned)
            .ok_or_else(|| LlmError::response_format("non-empty answer", "empty answer").into())
    }

    async fn retrieve(&self, text: &str) -> Vec<Hit> {
        let Some(retriever) = &self.retriever else {
            return Vec::new();
        };
        match retriever.lookup(text).await {
            Ok(hits) => hits,
            Err(e) => {
                warn!(error = %e, "retrieval failed, answering without reference text");
                Vec::new()
            }
        }
    }
}
