//! Shared deterministic types for the agent core.
//!
//! These types define stable contracts between the parser, the executors and
//! the turn loop. They must not depend on external state or I/O.

use serde::{Deserialize, Serialize};

/// The single directive a model response is parsed into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// The model declared the goal satisfied.
    Complete,
    /// A shell command line to execute.
    RunCommand { text: String },
    /// Full content to write to `path` (overwrite semantics).
    WriteFile { path: String, content: String },
    /// No directive was found in the response.
    Unrecognized,
}

impl Action {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Complete => "complete",
            Self::RunCommand { .. } => "run_command",
            Self::WriteFile { .. } => "write_file",
            Self::Unrecognized => "unrecognized",
        }
    }
}

/// Speaker of a conversation message, serialized in chat-completion wire form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationMessage {
    pub role: Role,
    pub content: String,
}

impl ConversationMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Outcome of running a command or writing a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    /// Text fed back to the model (stdout, labelled stderr, notices).
    pub output: String,
    pub succeeded: bool,
    /// Process exit code. `None` for timeouts, spawn failures and file writes.
    pub exit_code: Option<i32>,
}

impl ExecutionResult {
    pub fn success(output: impl Into<String>) -> Self {
        Self {
            output: output.into(),
            succeeded: true,
            exit_code: None,
        }
    }

    pub fn failure(output: impl Into<String>) -> Self {
        Self {
            output: output.into(),
            succeeded: false,
            exit_code: None,
        }
    }
}

/// Per-goal bookkeeping. Created fresh for every user goal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnState {
    pub task_complete: bool,
    pub consecutive_errors: u32,
    /// Text sent to the model on the next turn.
    pub current_input: String,
}

impl TurnState {
    pub fn new(goal: impl Into<String>) -> Self {
        Self {
            task_complete: false,
            consecutive_errors: 0,
            current_input: goal.into(),
        }
    }

    /// Update the failure streak from an execution outcome.
    pub fn record_outcome(&mut self, succeeded: bool) {
        if succeeded {
            self.consecutive_errors = 0;
        } else {
            self.consecutive_errors += 1;
        }
    }

    pub fn budget_exhausted(&self, max_errors: u32) -> bool {
        self.consecutive_errors >= max_errors
    }
}

/// Terminal state of a goal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GoalStop {
    /// The model emitted a completion marker.
    Complete,
    /// The user interrupted the goal.
    Cancelled,
    /// `max_errors` consecutive failures were reached.
    ErrorBudgetExhausted,
    /// The model reply carried no recognizable directive.
    NoDirective,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_outcome_resets_on_success() {
        let mut turn = TurnState::new("goal");
        turn.record_outcome(false);
        turn.record_outcome(false);
        assert_eq!(turn.consecutive_errors, 2);
        turn.record_outcome(true);
        assert_eq!(turn.consecutive_errors, 0);
    }

    #[test]
    fn budget_exhausted_at_limit() {
        let mut turn = TurnState::new("goal");
        for _ in 0..9 {
            turn.record_outcome(false);
        }
        assert!(!turn.budget_exhausted(10));
        turn.record_outcome(false);
        assert!(turn.budget_exhausted(10));
    }

    #[test]
    fn roles_serialize_lowercase() {
        let json = serde_json::to_string(&ConversationMessage::assistant("hi")).expect("json");
        assert_eq!(json, r#"{"role":"assistant","content":"hi"}"#);
    }
}
