//! Conversation history with the remote model.
//!
//! The first message is the system prime and is never removed. History is
//! append-only apart from [`Session::clear_history`] and
//! [`Session::replace_history`].

use tracing::{debug, instrument};

use crate::cancel::CancelFlag;
use crate::core::types::{ConversationMessage, Role};
use crate::io::model::{ChatBackend, ChatRequest, ModelError};

/// Fixed generation parameters sent with every request.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionParams {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

pub struct Session<B> {
    backend: B,
    params: SessionParams,
    messages: Vec<ConversationMessage>,
    cancel: CancelFlag,
}

impl<B: ChatBackend> Session<B> {
    pub fn new(
        backend: B,
        system_prompt: impl Into<String>,
        params: SessionParams,
        cancel: CancelFlag,
    ) -> Self {
        Self {
            backend,
            params,
            messages: vec![ConversationMessage::system(system_prompt)],
            cancel,
        }
    }

    /// Send `user_text` (skipped when empty) and stream the reply.
    ///
    /// Each fragment is passed to `on_fragment` as it arrives. The full reply
    /// is appended to history and returned. If the cancel flag is raised
    /// mid-stream the stream is dropped and nothing is appended for the reply.
    /// The flag is only checked when a fragment arrives, so a stalled stream
    /// notices an interrupt at the next fragment or the transport timeout.
    #[instrument(skip_all, fields(history = self.messages.len()))]
    pub fn send<F: FnMut(&str)>(
        &mut self,
        user_text: &str,
        mut on_fragment: F,
    ) -> Result<String, ModelError> {
        if !user_text.is_empty() {
            self.messages.push(ConversationMessage::user(user_text));
        }

        let request = ChatRequest {
            model: &self.params.model,
            messages: &self.messages,
            temperature: self.params.temperature,
            max_tokens: self.params.max_tokens,
            stream: true,
        };
        let stream = self.backend.stream(&request)?;

        let mut reply = String::new();
        for fragment in stream {
            if self.cancel.is_set() {
                debug!("response cancelled mid-stream");
                return Err(ModelError::Cancelled);
            }
            let fragment = fragment?;
            on_fragment(&fragment);
            reply.push_str(&fragment);
        }

        debug!(chars = reply.chars().count(), "response complete");
        self.messages.push(ConversationMessage::assistant(reply.clone()));
        Ok(reply)
    }

    /// Drop everything but the system prime.
    pub fn clear_history(&mut self) {
        self.messages.truncate(1);
    }

    /// Replace the conversation with `messages`, keeping the current system
    /// prime. System messages in `messages` are ignored.
    pub fn replace_history(&mut self, messages: Vec<ConversationMessage>) {
        self.clear_history();
        self.messages
            .extend(messages.into_iter().filter(|m| m.role != Role::System));
    }

    pub fn messages(&self) -> &[ConversationMessage] {
        &self.messages
    }

    pub fn cancel_flag(&self) -> &CancelFlag {
        &self.cancel
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }
}
