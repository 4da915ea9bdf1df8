//! Interactive shell: reads goals and meta-commands, drives the turn loop and
//! renders its progress.

use std::path::PathBuf;

use tracing::{info, warn};

use crate::console::{Console, Tone};
use crate::core::meta::{HELP_TEXT, MetaCommand};
use crate::core::types::GoalStop;
use crate::exit_codes;
use crate::io::config::AgentConfig;
use crate::io::confirm::TerminalConfirmer;
use crate::io::executor::CommandExecutor;
use crate::io::history_store::save_history;
use crate::io::input::LineReader;
use crate::io::model::{ChatBackend, ModelError};
use crate::session::Session;
use crate::turn::{GoalConfig, GoalOutcome, TurnEvent, run_goal};

/// Whether the shell keeps reading input after a meta-command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

pub struct Repl<'a, B, E> {
    session: Session<B>,
    executor: E,
    input: &'a LineReader,
    config: AgentConfig,
    auto_mode: bool,
    history_path: Option<PathBuf>,
    console: Console,
}

impl<'a, B: ChatBackend, E: CommandExecutor> Repl<'a, B, E> {
    pub fn new(
        session: Session<B>,
        executor: E,
        input: &'a LineReader,
        config: AgentConfig,
        history_path: Option<PathBuf>,
        console: Console,
    ) -> Self {
        Self {
            auto_mode: config.auto_mode,
            session,
            executor,
            input,
            config,
            history_path,
            console,
        }
    }

    /// Read and handle lines until `/exit` or end of input.
    pub fn run(&mut self, program_name: &str) {
        self.console.success(&format!("{program_name} ready!"));
        self.console.line(&"-".repeat(60));
        loop {
            self.console.prompt_user();
            let Some(line) = self.input.read_line() else {
                self.console.line("");
                info!("input closed");
                break;
            };
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if let Some(cmd) = MetaCommand::parse(line) {
                if self.handle_meta(cmd) == Flow::Exit {
                    break;
                }
                continue;
            }
            self.run_goal_and_report(line);
        }
    }

    /// Run a single goal non-interactively and map the result to an exit code.
    pub fn run_once(&mut self, goal: &str) -> i32 {
        match self.run_goal_and_report(goal) {
            Some(GoalStop::Complete | GoalStop::NoDirective) => exit_codes::OK,
            Some(GoalStop::Cancelled | GoalStop::ErrorBudgetExhausted) | None => {
                exit_codes::GOAL_FAILED
            }
        }
    }

    pub fn handle_meta(&mut self, cmd: MetaCommand) -> Flow {
        match cmd {
            MetaCommand::Exit => {
                self.console.notice("exiting...");
                return Flow::Exit;
            }
            MetaCommand::Help => self.console.line(HELP_TEXT),
            MetaCommand::ClearHistory => {
                self.session.clear_history();
                self.console.notice("history cleared");
            }
            MetaCommand::SaveSession => self.save_session(),
            MetaCommand::ToggleAutoMode => {
                self.auto_mode = !self.auto_mode;
                let state = if self.auto_mode { "on" } else { "off" };
                self.console.notice(&format!("auto mode {state}"));
            }
            MetaCommand::Unknown(cmd) => {
                warn!(cmd = %cmd, "unknown meta-command");
                self.console.notice("unknown command. type /help for help");
            }
        }
        Flow::Continue
    }

    pub fn auto_mode(&self) -> bool {
        self.auto_mode
    }

    pub fn session(&self) -> &Session<B> {
        &self.session
    }

    fn save_session(&mut self) {
        let Some(path) = self.history_path.as_deref() else {
            self.console.error("save failed: home directory unknown");
            return;
        };
        match save_history(path, self.session.messages()) {
            Ok(()) => self.console.notice(&format!("session saved to {}", path.display())),
            Err(err) => self.console.error(&format!("save failed: {err:#}")),
        }
    }

    /// Returns the terminal state, or `None` when a model error aborted the goal.
    fn run_goal_and_report(&mut self, goal: &str) -> Option<GoalStop> {
        self.session.cancel_flag().reset();
        let config = GoalConfig {
            max_errors: self.config.max_errors,
            auto_mode: self.auto_mode,
            confirm_timeout: self.config.confirm_timeout(),
        };
        let confirmer = TerminalConfirmer::new(self.input, self.session.cancel_flag().clone());
        let console = &mut self.console;

        let result = run_goal(
            &mut self.session,
            &self.executor,
            &confirmer,
            &config,
            goal,
            |event| render_event(console, event),
        );
        match result {
            Ok(outcome) => {
                self.render_outcome(&outcome);
                Some(outcome.stop)
            }
            Err(err) => {
                self.render_model_error(&err);
                None
            }
        }
    }

    fn render_outcome(&mut self, outcome: &GoalOutcome) {
        match outcome.stop {
            GoalStop::Complete => self.console.success("task complete"),
            GoalStop::NoDirective => self
                .console
                .notice("no executable directive, waiting for user input..."),
            GoalStop::ErrorBudgetExhausted => self.console.error("too many errors, task aborted"),
            GoalStop::Cancelled => {
                self.console.line("");
                self.console.notice("interrupted; type /exit to quit");
            }
        }
    }

    fn render_model_error(&mut self, err: &ModelError) {
        warn!(err = %err, "goal aborted by model error");
        self.console.line("");
        self.console.error(&err.to_string());
    }
}

fn render_event(console: &mut Console, event: TurnEvent<'_>) {
    match event {
        TurnEvent::Thinking => console.speaker(Tone::Assistant),
        TurnEvent::Fragment(text) => console.fragment(text),
        TurnEvent::ReplyFinished => console.line(""),
        TurnEvent::CommandStarted(command) => {
            console.speaker(Tone::System);
            console.notice(&format!("running: {command}"));
        }
        TurnEvent::CommandFinished(result) => {
            let output = result.output.trim_end();
            if !output.is_empty() {
                console.line(output);
            }
            if result.succeeded {
                console.success("command succeeded");
            } else {
                match result.exit_code {
                    Some(code) => console.error(&format!("command failed with exit code {code}")),
                    None => console.error("command failed"),
                }
            }
            console.notice("waiting for next instruction...");
        }
        TurnEvent::CommandCancelled(command) => {
            console.speaker(Tone::System);
            console.error(&format!("'{command}' cancelled by user"));
        }
        TurnEvent::WritingFile(path) => {
            console.speaker(Tone::System);
            console.notice(&format!("writing {path}"));
        }
        TurnEvent::FileWritten(result) => {
            if result.succeeded {
                console.success(&result.output);
            } else {
                console.error(&result.output);
            }
            console.notice("waiting for next instruction...");
        }
    }
}
