//! Streaming chat-completion endpoint.
//!
//! The [`ChatBackend`] trait hides the transport. A response is exposed as a
//! [`FragmentStream`]: a lazy, finite, non-restartable iterator of text
//! fragments. Dropping the stream closes the underlying connection.

use std::io::{BufRead, BufReader};
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::blocking::Client;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::core::sse::{SseLine, decode_line};
use crate::core::types::ConversationMessage;

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(45);

#[derive(Debug, Error)]
pub enum ModelError {
    /// Transport failure, including failures while reading the stream.
    #[error("network error: {0}")]
    Network(String),
    /// Non-success HTTP status from the provider.
    #[error("api request failed with status {status}: {body}")]
    Api { status: u16, body: String },
    /// The user interrupted the response.
    #[error("request cancelled")]
    Cancelled,
}

/// Body of a streaming chat-completion request.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest<'a> {
    pub model: &'a str,
    pub messages: &'a [ConversationMessage],
    pub temperature: f32,
    pub max_tokens: u32,
    pub stream: bool,
}

pub type FragmentStream = Box<dyn Iterator<Item = Result<String, ModelError>> + Send>;

pub trait ChatBackend {
    /// Issue one request and return its response as a fragment stream.
    fn stream(&self, request: &ChatRequest<'_>) -> Result<FragmentStream, ModelError>;
}

/// OpenAI-compatible endpoint over HTTP(S).
#[derive(Debug, Clone)]
pub struct HttpChatBackend {
    client: Client,
    url: String,
    api_key: String,
}

impl HttpChatBackend {
    pub fn new(
        url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("build http client")?;
        Ok(Self {
            client,
            url: url.into(),
            api_key: api_key.into(),
        })
    }
}

impl ChatBackend for HttpChatBackend {
    #[instrument(skip_all, fields(model = request.model, messages = request.messages.len()))]
    fn stream(&self, request: &ChatRequest<'_>) -> Result<FragmentStream, ModelError> {
        info!(url = %self.url, "sending chat request");
        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .map_err(|err| ModelError::Network(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .unwrap_or_else(|_| status.canonical_reason().unwrap_or("").to_string());
            warn!(status = status.as_u16(), "chat request rejected");
            return Err(ModelError::Api {
                status: status.as_u16(),
                body,
            });
        }

        debug!(status = status.as_u16(), "streaming response");
        Ok(Box::new(SseFragments::new(BufReader::new(response))))
    }
}

/// Iterator over the text fragments of a server-sent event body.
///
/// Ends at the `[DONE]` sentinel or end of body. Malformed `data:` lines are
/// skipped; read errors are yielded once and end the stream.
pub struct SseFragments<R> {
    reader: R,
    finished: bool,
}

impl<R: BufRead> SseFragments<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            finished: false,
        }
    }
}

impl<R: BufRead> Iterator for SseFragments<R> {
    type Item = Result<String, ModelError>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.finished {
            let mut buf = Vec::new();
            match self.reader.read_until(b'\n', &mut buf) {
                Ok(0) => self.finished = true,
                Ok(_) => match decode_line(&String::from_utf8_lossy(&buf)) {
                    SseLine::Fragment(text) => return Some(Ok(text)),
                    SseLine::Done => self.finished = true,
                    SseLine::Ignored => {}
                    SseLine::Malformed(err) => debug!(err = %err, "skipping malformed stream line"),
                },
                Err(err) => {
                    self.finished = true;
                    return Some(Err(ModelError::Network(err.to_string())));
                }
            }
        }
        None
    }
}
