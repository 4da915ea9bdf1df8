//! The per-goal agent loop.
//!
//! `run_goal` repeatedly asks the model, parses one directive from the reply,
//! executes it and feeds the result back, until the model declares the goal
//! complete, the reply has no directive, the user interrupts, or the error
//! budget runs out.

use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::cancel::CancelFlag;
use crate::core::directive::extract;
use crate::core::feedback::{CANCELLED_FEEDBACK, command_feedback, file_write_feedback};
use crate::core::gate::{denylisted, requires_confirmation};
use crate::core::types::{Action, ExecutionResult, GoalStop, TurnState};
use crate::io::confirm::{ConfirmRequest, Confirmer};
use crate::io::executor::CommandExecutor;
use crate::io::file_writer::write_file;
use crate::io::model::{ChatBackend, ModelError};
use crate::session::Session;

pub const DEFAULT_MAX_ERRORS: u32 = 10;

/// Knobs for one goal.
#[derive(Debug, Clone)]
pub struct GoalConfig {
    /// Consecutive failures tolerated before the goal is abandoned.
    pub max_errors: u32,
    pub auto_mode: bool,
    pub confirm_timeout: Duration,
}

impl Default for GoalConfig {
    fn default() -> Self {
        Self {
            max_errors: DEFAULT_MAX_ERRORS,
            auto_mode: true,
            confirm_timeout: Duration::from_secs(3),
        }
    }
}

/// Summary of a finished goal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoalOutcome {
    pub stop: GoalStop,
    /// Requests issued to the model.
    pub turns: u32,
    pub consecutive_errors: u32,
}

/// Progress notifications for the caller, in order of occurrence.
#[derive(Debug)]
pub enum TurnEvent<'a> {
    /// A request is about to be sent.
    Thinking,
    Fragment(&'a str),
    ReplyFinished,
    CommandStarted(&'a str),
    CommandFinished(&'a ExecutionResult),
    CommandCancelled(&'a str),
    WritingFile(&'a str),
    FileWritten(&'a ExecutionResult),
}

#[derive(Debug, Error)]
pub enum ExecError {
    #[error("cancelled by user")]
    Cancelled,
    /// Ctrl-C arrived before the command started.
    #[error("interrupted")]
    Interrupted,
}

/// Drive one user goal to a terminal state.
///
/// Model errors (network, API) abort the goal and are returned; the session
/// stays usable for the next goal.
#[instrument(skip_all, fields(max_errors = config.max_errors, auto_mode = config.auto_mode))]
pub fn run_goal<B, E, C, F>(
    session: &mut Session<B>,
    executor: &E,
    confirmer: &C,
    config: &GoalConfig,
    goal: &str,
    mut on_event: F,
) -> Result<GoalOutcome, ModelError>
where
    B: ChatBackend,
    E: CommandExecutor,
    C: Confirmer,
    F: FnMut(TurnEvent<'_>),
{
    let mut turn = TurnState::new(goal);
    let mut turns = 0u32;
    let cancel = session.cancel_flag().clone();

    let stop = loop {
        if turn.task_complete {
            break GoalStop::Complete;
        }
        if turn.budget_exhausted(config.max_errors) {
            warn!(errors = turn.consecutive_errors, "error budget exhausted");
            break GoalStop::ErrorBudgetExhausted;
        }
        if cancel.is_set() {
            break GoalStop::Cancelled;
        }

        turns += 1;
        on_event(TurnEvent::Thinking);
        let reply = match session.send(&turn.current_input, |f| on_event(TurnEvent::Fragment(f))) {
            Ok(reply) => reply,
            Err(ModelError::Cancelled) => break GoalStop::Cancelled,
            Err(err) => return Err(err),
        };
        on_event(TurnEvent::ReplyFinished);

        let action = extract(&reply);
        debug!(turn = turns, action = action.kind(), "parsed directive");
        match &action {
            Action::Complete => turn.task_complete = true,
            Action::WriteFile { path, content } => {
                on_event(TurnEvent::WritingFile(path));
                let result = write_file(path, content);
                on_event(TurnEvent::FileWritten(&result));
                turn.current_input = file_write_feedback(&result);
            }
            Action::RunCommand { text } => {
                let step = CommandStep {
                    executor,
                    confirmer,
                    config,
                    cancel: &cancel,
                };
                match step.run(&mut turn, &action, text, &mut on_event) {
                    Ok(result) => turn.current_input = command_feedback(&result),
                    Err(ExecError::Cancelled) => {
                        on_event(TurnEvent::CommandCancelled(text));
                        turn.current_input = CANCELLED_FEEDBACK.to_string();
                    }
                    Err(ExecError::Interrupted) => {
                        on_event(TurnEvent::CommandCancelled(text));
                        break GoalStop::Cancelled;
                    }
                }
            }
            Action::Unrecognized => break GoalStop::NoDirective,
        }
    };

    info!(?stop, turns, errors = turn.consecutive_errors, "goal finished");
    Ok(GoalOutcome {
        stop,
        turns,
        consecutive_errors: turn.consecutive_errors,
    })
}

/// Collaborators needed to gate and run one command.
struct CommandStep<'a, E, C> {
    executor: &'a E,
    confirmer: &'a C,
    config: &'a GoalConfig,
    cancel: &'a CancelFlag,
}

impl<E: CommandExecutor, C: Confirmer> CommandStep<'_, E, C> {
    /// Gate, confirm and run one command.
    ///
    /// This is the only place the failure streak is updated from execution
    /// outcomes: success resets it, failure and a declined confirmation each
    /// add one. An interrupt during confirmation leaves the streak alone and
    /// never reaches the executor.
    fn run<F>(
        &self,
        turn: &mut TurnState,
        action: &Action,
        text: &str,
        on_event: &mut F,
    ) -> Result<ExecutionResult, ExecError>
    where
        F: FnMut(TurnEvent<'_>),
    {
        if let Some(keyword) = denylisted(text) {
            warn!(command = text, keyword, "command matches denylist");
        }
        if requires_confirmation(action, self.config.auto_mode) {
            let reply = self.confirmer.confirm(&ConfirmRequest {
                prompt: format!("run '{text}'? [Y/n]"),
                timeout: self.config.confirm_timeout,
                auto_mode: self.config.auto_mode,
            });
            if self.cancel.is_set() {
                info!(command = text, "interrupted at confirmation");
                return Err(ExecError::Interrupted);
            }
            if !reply.is_approved() {
                turn.record_outcome(false);
                return Err(ExecError::Cancelled);
            }
        }
        if self.cancel.is_set() {
            return Err(ExecError::Interrupted);
        }

        on_event(TurnEvent::CommandStarted(text));
        let result = self.executor.run(text).unwrap_or_else(|err| {
            warn!(err = %format!("{err:#}"), "executor error");
            ExecutionResult::failure(format!("command failed: {err:#}"))
        });
        turn.record_outcome(result.succeeded);
        on_event(TurnEvent::CommandFinished(&result));
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::gate::Reply;
    use crate::core::types::ConversationMessage;
    use crate::session::SessionParams;
    use crate::test_support::{ScriptedBackend, ScriptedConfirmer, ScriptedExecutor};

    fn session(replies: &[&str]) -> Session<ScriptedBackend> {
        let backend = ScriptedBackend::new(
            replies
                .iter()
                .map(|r| ScriptedBackend::reply(&[*r]))
                .collect(),
        );
        Session::new(
            backend,
            "prime",
            SessionParams {
                model: "m".to_string(),
                temperature: 0.7,
                max_tokens: 2048,
            },
            CancelFlag::new(),
        )
    }

    #[test]
    fn command_then_complete() {
        let mut session = session(&["///ls///", "///task_complete///"]);
        let executor = ScriptedExecutor::always(ExecutionResult {
            output: "a.txt\n".to_string(),
            succeeded: true,
            exit_code: Some(0),
        });
        let confirmer = ScriptedConfirmer::new(Vec::new());

        let outcome = run_goal(
            &mut session,
            &executor,
            &confirmer,
            &GoalConfig::default(),
            "list files",
            |_| {},
        )
        .expect("goal");

        assert_eq!(outcome.stop, GoalStop::Complete);
        assert_eq!(outcome.turns, 2);
        assert_eq!(executor.commands(), vec!["ls"]);
        assert!(confirmer.prompts().is_empty());
        assert_eq!(
            session.messages()[3],
            ConversationMessage::user("command result:\na.txt\n")
        );
    }

    #[test]
    fn unrecognized_reply_stops_without_error() {
        let mut session = session(&["I think we should run some commands"]);
        let executor = ScriptedExecutor::new(Vec::new());
        let confirmer = ScriptedConfirmer::new(Vec::new());

        let outcome = run_goal(
            &mut session,
            &executor,
            &confirmer,
            &GoalConfig::default(),
            "goal",
            |_| {},
        )
        .expect("goal");

        assert_eq!(outcome.stop, GoalStop::NoDirective);
        assert_eq!(outcome.consecutive_errors, 0);
        assert_eq!(outcome.turns, 1);
    }

    #[test]
    fn declined_confirmation_feeds_back_and_counts() {
        let mut session = session(&["///ls///", "///任务完成///"]);
        let executor = ScriptedExecutor::new(Vec::new());
        let confirmer = ScriptedConfirmer::new(vec![Reply::Declined]);
        let config = GoalConfig {
            auto_mode: false,
            ..GoalConfig::default()
        };

        let mut cancelled = Vec::new();
        let outcome = run_goal(&mut session, &executor, &confirmer, &config, "goal", |event| {
            if let TurnEvent::CommandCancelled(text) = event {
                cancelled.push(text.to_string());
            }
        })
        .expect("goal");

        assert_eq!(outcome.stop, GoalStop::Complete);
        assert_eq!(cancelled, vec!["ls"]);
        assert_eq!(outcome.consecutive_errors, 1);
        assert!(executor.commands().is_empty());
        assert_eq!(confirmer.prompts(), vec!["run 'ls'? [Y/n]"]);
        assert_eq!(
            session.messages()[3],
            ConversationMessage::user("command error: cancelled by user")
        );
    }

    #[test]
    fn denylisted_command_is_confirmed_in_auto_mode() {
        let mut session = session(&["///rm -rf build///", "///task_complete///"]);
        let executor = ScriptedExecutor::always(ExecutionResult::success(""));
        let confirmer = ScriptedConfirmer::new(Vec::new());

        run_goal(
            &mut session,
            &executor,
            &confirmer,
            &GoalConfig::default(),
            "clean",
            |_| {},
        )
        .expect("goal");

        assert_eq!(confirmer.prompts(), vec!["run 'rm -rf build'? [Y/n]"]);
        assert_eq!(executor.commands(), vec!["rm -rf build"]);
    }

    #[test]
    fn success_resets_failure_streak() {
        let mut session = session(&["///a///", "///b///", "///c///", "///task_complete///"]);
        let executor = ScriptedExecutor::new(vec![
            ExecutionResult::failure("x"),
            ExecutionResult::failure("y"),
            ExecutionResult::success("z"),
        ]);
        let confirmer = ScriptedConfirmer::new(Vec::new());

        let outcome = run_goal(
            &mut session,
            &executor,
            &confirmer,
            &GoalConfig::default(),
            "goal",
            |_| {},
        )
        .expect("goal");
        assert_eq!(outcome.consecutive_errors, 0);
        assert_eq!(outcome.stop, GoalStop::Complete);
    }

    #[test]
    fn cancel_flag_stops_before_next_request() {
        let mut session = session(&["///ls///", "///task_complete///"]);
        let executor = ScriptedExecutor::always(ExecutionResult::success(""));
        let confirmer = ScriptedConfirmer::new(Vec::new());
        let cancel = session.cancel_flag().clone();

        let outcome = run_goal(
            &mut session,
            &executor,
            &confirmer,
            &GoalConfig::default(),
            "goal",
            |event| {
                if matches!(event, TurnEvent::CommandFinished(_)) {
                    cancel.set();
                }
            },
        )
        .expect("goal");

        assert_eq!(outcome.stop, GoalStop::Cancelled);
        assert_eq!(outcome.turns, 1);
    }

    #[test]
    fn interrupt_during_confirmation_skips_command() {
        let mut session = session(&["///rm -rf build///", "///task_complete///"]);
        let executor = ScriptedExecutor::always(ExecutionResult::success(""));
        let confirmer = ScriptedConfirmer::new(vec![Reply::AutoApproved]);
        let config = GoalConfig {
            auto_mode: false,
            ..GoalConfig::default()
        };
        let cancel = session.cancel_flag().clone();

        let mut cancelled = Vec::new();
        let outcome = run_goal(&mut session, &executor, &confirmer, &config, "clean", |event| {
            match event {
                TurnEvent::ReplyFinished => cancel.set(),
                TurnEvent::CommandCancelled(text) => cancelled.push(text.to_string()),
                _ => {}
            }
        })
        .expect("goal");

        assert_eq!(outcome.stop, GoalStop::Cancelled);
        assert_eq!(outcome.turns, 1);
        assert_eq!(outcome.consecutive_errors, 0);
        assert!(executor.commands().is_empty());
        assert_eq!(cancelled, vec!["rm -rf build"]);
    }
}
