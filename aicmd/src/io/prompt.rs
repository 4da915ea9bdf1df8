//! System prime rendering.

use std::env;

use anyhow::{Context, Result};
use minijinja::{Environment, context};
use serde::Serialize;
use tracing::debug;

const SYSTEM_TEMPLATE: &str = include_str!("prompts/system.md");

/// Host facts interpolated into the system prime.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SystemPromptContext {
    pub system_name: String,
    pub user_name: String,
    pub working_dir: Option<String>,
}

impl SystemPromptContext {
    /// Gather the user name and working directory from the environment.
    pub fn detect(system_name: impl Into<String>) -> Self {
        let user_name = env::var("USER")
            .or_else(|_| env::var("USERNAME"))
            .ok()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| "the user".to_string());
        let working_dir = env::current_dir()
            .ok()
            .map(|p| p.display().to_string());
        Self {
            system_name: system_name.into(),
            user_name,
            working_dir,
        }
    }
}

/// Render the system prime for `ctx`.
pub fn render_system_prompt(ctx: &SystemPromptContext) -> Result<String> {
    let mut env = Environment::new();
    env.add_template("system", SYSTEM_TEMPLATE)
        .context("load system prompt template")?;
    let rendered = env
        .get_template("system")?
        .render(context! {
            system_name => ctx.system_name.trim(),
            user_name => ctx.user_name.trim(),
            working_dir => ctx.working_dir.as_deref(),
        })
        .context("render system prompt")?;
    debug!(bytes = rendered.len(), "system prompt rendered");
    Ok(rendered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::directive::{COMPLETE_MARKERS, extract};
    use crate::core::types::Action;

    fn ctx() -> SystemPromptContext {
        SystemPromptContext {
            system_name: "Termux".to_string(),
            user_name: "alice".to_string(),
            working_dir: Some("/data/home".to_string()),
        }
    }

    #[test]
    fn interpolates_host_facts() {
        let prompt = render_system_prompt(&ctx()).expect("render");
        assert!(prompt.starts_with(
            "You are an assistant operating a Termux terminal on behalf of alice."
        ));
        assert!(prompt.contains("`/data/home`"));
    }

    #[test]
    fn working_dir_line_is_optional() {
        let prompt = render_system_prompt(&SystemPromptContext {
            working_dir: None,
            ..ctx()
        })
        .expect("render");
        assert!(!prompt.contains("working directory"));
    }

    #[test]
    fn advertised_markers_are_understood_by_the_parser() {
        let prompt = render_system_prompt(&ctx()).expect("render");
        assert!(prompt.contains(COMPLETE_MARKERS[1]));
        assert_eq!(extract(COMPLETE_MARKERS[1]), Action::Complete);
        assert_eq!(
            extract("///write_file///\npath/to/file\nfull file content\n///"),
            Action::WriteFile {
                path: "path/to/file".to_string(),
                content: "full file content".to_string(),
            }
        );
    }
}
