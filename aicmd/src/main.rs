//! Autonomous terminal agent.
//!
//! Without a goal argument an interactive shell is started; with one, that
//! goal is run once and the exit code reflects its outcome.

use std::env;
use std::io::{self, Write};
use std::path::PathBuf;

use aicmd::cancel::CancelFlag;
use aicmd::console::{Console, SpeakerNames};
use aicmd::exit_codes;
use aicmd::io::config::{default_config_path, load_config, write_config};
use aicmd::io::credentials::{API_KEY_ENV, default_key_path, resolve_api_key};
use aicmd::io::executor::ShellExecutor;
use aicmd::io::history_store::{default_history_path, load_history};
use aicmd::io::input::LineReader;
use aicmd::io::model::HttpChatBackend;
use aicmd::io::prompt::{SystemPromptContext, render_system_prompt};
use aicmd::logging;
use aicmd::repl::Repl;
use aicmd::session::{Session, SessionParams};
use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};

const PROGRAM_NAME: &str = "aicmd";

#[derive(Debug, Parser)]
#[command(
    name = "aicmd",
    version,
    about = "Autonomous terminal agent driven by a chat model"
)]
struct Cli {
    /// Config file (defaults to ~/.aicmd.toml).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Start with auto mode off, confirming every command.
    #[arg(long)]
    manual: bool,
    /// Restore the conversation saved with /save.
    #[arg(long)]
    resume: bool,
    /// Write the effective config to the config path and exit.
    #[arg(long)]
    init_config: bool,
    /// Run this goal once and exit instead of starting the shell.
    #[arg(trailing_var_arg = true, value_name = "GOAL")]
    goal: Vec<String>,
}

fn main() {
    logging::init();
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("{:#}", err);
            std::process::exit(exit_codes::INVALID);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    let config_path = match cli.config {
        Some(path) => path,
        None => default_config_path().context("locate home directory for config")?,
    };
    let mut config = load_config(&config_path)?;
    if cli.init_config {
        write_config(&config_path, &config)?;
        println!("wrote {}", config_path.display());
        return Ok(exit_codes::OK);
    }
    if cli.manual {
        config.auto_mode = false;
    }

    let input = LineReader::stdin();
    let key_path = default_key_path().context("locate home directory for api key")?;
    let api_key = resolve_api_key(env::var(API_KEY_ENV).ok(), &key_path, || {
        prompt_api_key(&input)
    })?;
    let Some(api_key) = api_key else {
        eprintln!(
            "error: no API key; set {API_KEY_ENV} or store it in {}",
            key_path.display()
        );
        return Ok(exit_codes::MISSING_CREDENTIAL);
    };

    let cancel = CancelFlag::new();
    cancel.register_interrupt()?;

    let host = SystemPromptContext::detect(config.system_name.clone());
    let prime = render_system_prompt(&host)?;
    let backend = HttpChatBackend::new(&config.api_url, api_key, config.request_timeout())?;
    let mut session = Session::new(
        backend,
        prime,
        SessionParams {
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        },
        cancel,
    );

    let history_path = default_history_path();
    if cli.resume {
        match history_path.as_deref() {
            Some(path) if path.exists() => {
                let messages = load_history(path)?;
                info!(messages = messages.len(), "resuming saved session");
                session.replace_history(messages);
            }
            _ => warn!("no saved session to resume"),
        }
    }

    let executor = ShellExecutor {
        timeout: config.command_timeout(),
        output_limit_bytes: config.output_limit_bytes,
    };
    let console = Console::new(SpeakerNames {
        program: PROGRAM_NAME.to_string(),
        user: host.user_name.clone(),
        system: config.system_name.clone(),
        assistant: config.model.clone(),
    });
    let mut repl = Repl::new(session, executor, &input, config, history_path, console);

    if cli.goal.is_empty() {
        repl.run(PROGRAM_NAME);
        return Ok(exit_codes::OK);
    }
    Ok(repl.run_once(&cli.goal.join(" ")))
}

fn prompt_api_key(input: &LineReader) -> Option<String> {
    print!("enter API key: ");
    let _ = io::stdout().flush();
    input.read_line()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_interactive_defaults() {
        let cli = Cli::parse_from(["aicmd"]);
        assert!(cli.goal.is_empty());
        assert!(!cli.manual);
        assert!(!cli.resume);
        assert!(cli.config.is_none());
    }

    #[test]
    fn parse_one_shot_goal() {
        let cli = Cli::parse_from(["aicmd", "--manual", "list", "the", "files"]);
        assert!(cli.manual);
        assert_eq!(cli.goal, vec!["list", "the", "files"]);
    }

    #[test]
    fn parse_config_and_resume() {
        let cli = Cli::parse_from(["aicmd", "--config", "/tmp/a.toml", "--resume"]);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/a.toml")));
        assert!(cli.resume);
        assert!(!cli.init_config);
    }
}
