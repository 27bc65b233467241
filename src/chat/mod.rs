/// Chat assistant session.
///
/// [`ChatSession`] owns everything the chat page used to keep in globals:
/// the API client, the ordered message history, the carried-forward health
/// context, and the in-flight flag that gates outgoing messages. Display
/// goes through a [`ChatSurface`] passed into each call, so the session can
/// drive the terminal, an HTML export, or a test double.
///
/// # Reply procedure
///
/// 1. Append the user node and history entry (persisted).
/// 2. Show the typing indicator and disable the send control.
/// 3. If streaming is enabled, `POST /api/chat/stream`; on a 2xx status,
///    create exactly one assistant placeholder and render chunks into it.
/// 4. On any streaming failure, make one `POST /api/chat` call. Its reply
///    goes into the placeholder when one exists.
/// 5. Only if that also fails, show a failure notice (not persisted).
/// 6. Re-enable the send control and persist.
pub mod history;
pub mod stream;
pub mod surface;

use serde_json::Value;
use tracing::{error, info, warn};

use crate::api::types::ChatRequest;
use crate::api::{ApiClient, ClientError};
use history::{ChatMessage, HistoryStore, Role};
use surface::{ChatSurface, MessageId};

/// Shown when neither the stream nor the fallback produced a reply.
pub const REPLY_FAILED: &str =
    "❌ Sorry, I'm having technical trouble right now. Please try again later.";

/// Shown when an analysis is requested without any health data.
pub const NO_HEALTH_DATA: &str =
    "❌ No health data found. Please run a prediction on the main page first.";

/// What happened to an outgoing message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// Empty message, or a request was already in flight.
    Ignored,
    /// No health context to analyse; nothing was sent.
    MissingContext,
    /// Reply arrived over the stream.
    Streamed,
    /// Reply came from the non-streaming endpoint.
    Fallback,
    /// Both attempts failed; the failure notice was shown.
    Failed,
}

pub struct ChatSession {
    client: ApiClient,
    store: HistoryStore,
    messages: Vec<ChatMessage>,
    context: Option<Value>,
    in_flight: bool,
    streaming: bool,
}

impl ChatSession {
    /// Open a session, restoring history and context from `store`.
    pub fn open(client: ApiClient, store: HistoryStore) -> Self {
        let snapshot = store.load();
        info!(
            messages = snapshot.messages.len(),
            has_context = snapshot.context.is_some(),
            "chat session opened"
        );
        Self {
            client,
            store,
            messages: snapshot.messages,
            context: snapshot.context,
            in_flight: false,
            streaming: true,
        }
    }

    /// Use the streaming endpoint (default) or go straight to `/api/chat`.
    pub fn with_streaming(mut self, streaming: bool) -> Self {
        self.streaming = streaming;
        self
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn context(&self) -> Option<&Value> {
        self.context.as_ref()
    }

    /// Replace the health context and persist it.
    pub fn set_context(&mut self, context: Option<Value>) {
        self.context = context;
        self.persist();
    }

    /// True while a reply is being fetched.
    pub fn is_busy(&self) -> bool {
        self.in_flight
    }

    /// Render the restored history into a fresh surface.
    pub fn replay(&self, surface: &mut dyn ChatSurface) {
        for message in &self.messages {
            surface.restore(message);
        }
    }

    /// Send a user message using the session's health context.
    pub fn send(&mut self, message: &str, surface: &mut dyn ChatSurface) -> SendOutcome {
        self.submit(message, None, surface)
    }

    /// Replace the health context, then send `message` with it attached.
    pub fn send_with_context(
        &mut self,
        message: &str,
        context: Value,
        surface: &mut dyn ChatSurface,
    ) -> SendOutcome {
        if self.in_flight {
            return SendOutcome::Ignored;
        }
        self.context = Some(context.clone());
        self.submit(message, Some(context), surface)
    }

    /// Ask the assistant to analyse the stored health context.
    pub fn request_analysis(&mut self, surface: &mut dyn ChatSurface) -> SendOutcome {
        let Some(context) = &self.context else {
            surface.append(Role::Assistant, NO_HEALTH_DATA);
            return SendOutcome::MissingContext;
        };
        let message = analysis_message(context);
        self.send(&message, surface)
    }

    /// Forget history and context, in memory and in storage.
    pub fn clear(&mut self, surface: &mut dyn ChatSurface) {
        self.messages.clear();
        self.context = None;
        if let Err(e) = self.store.clear() {
            warn!("could not clear stored chat history: {e:#}");
        }
        surface.clear();
        info!("chat history cleared");
    }

    // -- Internal -----------------------------------------------------------

    fn submit(
        &mut self,
        message: &str,
        explicit_context: Option<Value>,
        surface: &mut dyn ChatSurface,
    ) -> SendOutcome {
        let message = message.trim();
        if message.is_empty() || self.in_flight {
            return SendOutcome::Ignored;
        }

        surface.append(Role::User, message);
        self.messages
            .push(ChatMessage::user(message).with_context(explicit_context.clone()));
        self.persist();

        let context = explicit_context.or_else(|| self.context.clone());
        let request = ChatRequest {
            message,
            context: context.as_ref(),
        };

        self.in_flight = true;
        surface.set_send_enabled(false);
        surface.show_typing();

        let mut placeholder = None;
        let streamed = self
            .streaming
            .then(|| self.stream_reply(&request, surface, &mut placeholder));

        let outcome = match streamed {
            Some(Ok(reply)) => {
                self.messages.push(ChatMessage::assistant(reply));
                SendOutcome::Streamed
            }
            Some(Err(e)) => {
                warn!("streaming reply failed, falling back: {e}");
                self.fallback_reply(&request, surface, placeholder)
            }
            None => self.fallback_reply(&request, surface, placeholder),
        };

        self.in_flight = false;
        surface.set_send_enabled(true);
        self.persist();
        outcome
    }

    fn stream_reply(
        &self,
        request: &ChatRequest<'_>,
        surface: &mut dyn ChatSurface,
        placeholder: &mut Option<MessageId>,
    ) -> Result<String, ClientError> {
        let body = self.client.chat_stream(request)?;
        surface.hide_typing();
        let id = surface.append(Role::Assistant, "");
        *placeholder = Some(id);
        stream::consume(body, surface, id)
    }

    fn fallback_reply(
        &mut self,
        request: &ChatRequest<'_>,
        surface: &mut dyn ChatSurface,
        placeholder: Option<MessageId>,
    ) -> SendOutcome {
        surface.hide_typing();
        let (text, outcome) = match self.client.chat(request) {
            Ok(reply) => {
                self.messages.push(ChatMessage::assistant(reply.clone()));
                (reply, SendOutcome::Fallback)
            }
            Err(e) => {
                error!("chat fallback failed: {e}");
                (REPLY_FAILED.to_string(), SendOutcome::Failed)
            }
        };

        match placeholder {
            Some(id) => surface.update(id, &text),
            None => {
                surface.append(Role::Assistant, &text);
            }
        }
        outcome
    }

    fn persist(&mut self) {
        if let Err(e) = self.store.save(&self.messages, self.context.as_ref()) {
            warn!("could not save chat history: {e:#}");
        }
    }
}

/// Compose the analysis request for a health context.
pub fn analysis_message(context: &Value) -> String {
    let field = |pointer: &str| match context.pointer(pointer) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => "-".to_string(),
        Some(other) => other.to_string(),
    };

    format!(
        "Could you analyse my health data and give me personalised recommendations?\n\
         \n\
         📊 **My data:**\n\
         - BMI: {}\n\
         - Status: {}\n\
         - Confidence: %{}\n\
         \n\
         Looking forward to detailed advice! 😊",
        field("/prediction/bmi"),
        field("/prediction/predicted_class"),
        field("/prediction/confidence"),
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
