//! Scripted test doubles for the model endpoint, the shell and the
//! confirmation prompt.

use std::cell::RefCell;
use std::collections::VecDeque;

use anyhow::Result;

use crate::core::gate::Reply;
use crate::core::types::{ConversationMessage, ExecutionResult};
use crate::io::confirm::{ConfirmRequest, Confirmer};
use crate::io::executor::CommandExecutor;
use crate::io::model::{ChatBackend, ChatRequest, FragmentStream, ModelError};

/// Owned copy of a request seen by [`ScriptedBackend`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub messages: Vec<ConversationMessage>,
}

/// Chat backend that answers from a queue.
///
/// Each queued entry is either the fragments of one streamed reply or the
/// error returned for that request. An empty queue is a network error.
#[derive(Debug, Default)]
pub struct ScriptedBackend {
    responses: RefCell<VecDeque<Result<Vec<String>, ModelError>>>,
    requests: RefCell<Vec<RecordedRequest>>,
}

impl ScriptedBackend {
    pub fn new(responses: Vec<Result<Vec<String>, ModelError>>) -> Self {
        Self {
            responses: RefCell::new(responses.into()),
            requests: RefCell::new(Vec::new()),
        }
    }

    /// A successful reply streamed as `fragments`.
    pub fn reply(fragments: &[&str]) -> Result<Vec<String>, ModelError> {
        Ok(fragments.iter().map(|f| f.to_string()).collect())
    }

    /// Requests received so far, oldest first.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.borrow().clone()
    }
}

impl ChatBackend for ScriptedBackend {
    fn stream(&self, request: &ChatRequest<'_>) -> Result<FragmentStream, ModelError> {
        self.requests.borrow_mut().push(RecordedRequest {
            model: request.model.to_string(),
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            messages: request.messages.to_vec(),
        });
        let next = self
            .responses
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| Err(ModelError::Network("script exhausted".to_string())))?;
        Ok(Box::new(next.into_iter().map(Ok::<String, ModelError>)))
    }
}

/// Executor that returns queued results, then `fallback` once the queue is
/// empty. Records every command it was asked to run.
#[derive(Debug)]
pub struct ScriptedExecutor {
    results: RefCell<VecDeque<ExecutionResult>>,
    fallback: ExecutionResult,
    commands: RefCell<Vec<String>>,
}

impl ScriptedExecutor {
    pub fn new(results: Vec<ExecutionResult>) -> Self {
        Self {
            results: RefCell::new(results.into()),
            fallback: ExecutionResult::failure("no scripted result"),
            commands: RefCell::new(Vec::new()),
        }
    }

    /// Every command gets `result`.
    pub fn always(result: ExecutionResult) -> Self {
        Self {
            fallback: result,
            ..Self::new(Vec::new())
        }
    }

    pub fn commands(&self) -> Vec<String> {
        self.commands.borrow().clone()
    }
}

impl CommandExecutor for ScriptedExecutor {
    fn run(&self, command: &str) -> Result<ExecutionResult> {
        self.commands.borrow_mut().push(command.to_string());
        Ok(self
            .results
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone()))
    }
}

/// Confirmer that answers from a queue and records prompts.
///
/// Mirrors the terminal confirmer: in auto mode it approves without
/// consuming an answer. An empty queue behaves like an elapsed deadline.
#[derive(Debug, Default)]
pub struct ScriptedConfirmer {
    replies: RefCell<VecDeque<Reply>>,
    prompts: RefCell<Vec<String>>,
}

impl ScriptedConfirmer {
    pub fn new(replies: Vec<Reply>) -> Self {
        Self {
            replies: RefCell::new(replies.into()),
            prompts: RefCell::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.borrow().clone()
    }
}

impl Confirmer for ScriptedConfirmer {
    fn confirm(&self, request: &ConfirmRequest) -> Reply {
        self.prompts.borrow_mut().push(request.prompt.clone());
        if request.auto_mode {
            return Reply::AutoApproved;
        }
        self.replies
            .borrow_mut()
            .pop_front()
            .unwrap_or(Reply::AutoApproved)
    }
}
