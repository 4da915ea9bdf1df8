//! Directive extraction from free-form model replies.
//!
//! A reply is parsed into exactly one [`Action`]. Matchers are independent and
//! evaluated in a fixed precedence; the first one that matches wins and later
//! matchers are not consulted:
//!
//! 1. completion marker (`///任务完成///` or `///task_complete///`)
//! 2. file-write block (`///写入文件///` or `///write_file///`, path line, content, `///`)
//! 3. single-command marker (`///cmd///`)
//! 4. fenced code block tagged `bash`/`sh` or untagged
//! 5. cue phrase heuristic (`执行`, `运行`, `命令`, `run:`, `execute:`, `command:`)

use std::sync::LazyLock;

use regex::Regex;

use crate::core::types::Action;

pub const COMPLETE_MARKERS: [&str; 2] = ["///任务完成///", "///task_complete///"];

static WRITE_LOCALIZED_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"///写入文件///\s*([^\n]+)\n([\s\S]*?)///").expect("write block regex")
});
static WRITE_ASCII_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"///write_file///\s*([^\n]+)\n([\s\S]*?)///").expect("write block regex")
});
static COMMAND_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"///(.*?)///").expect("command marker regex"));
static FENCE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```(?:bash|sh)?\n(.*?)\n```").expect("fenced block regex")
});
static CUE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?i)(?:(?:执行|运行|命令)[:：]?|\b(?:execute|run|command):)",
        r"\s*(`[^`]+`|[^`\n]+)",
    ))
    .expect("cue phrase regex")
});

type Matcher = fn(&str) -> Option<Action>;

/// Matchers in precedence order.
const MATCHERS: [Matcher; 5] = [
    match_complete,
    match_write_file,
    match_command_marker,
    match_fenced_block,
    match_cue_phrase,
];

/// Parse a model reply into a single action.
pub fn extract(text: &str) -> Action {
    MATCHERS
        .iter()
        .find_map(|matcher| matcher(text))
        .unwrap_or(Action::Unrecognized)
}

fn match_complete(text: &str) -> Option<Action> {
    COMPLETE_MARKERS
        .iter()
        .any(|marker| text.contains(marker))
        .then_some(Action::Complete)
}

fn match_write_file(text: &str) -> Option<Action> {
    let caps = WRITE_LOCALIZED_RE
        .captures(text)
        .or_else(|| WRITE_ASCII_RE.captures(text))?;
    let path = caps.get(1)?.as_str().trim();
    if path.is_empty() {
        return None;
    }
    Some(Action::WriteFile {
        path: path.to_string(),
        content: caps.get(2)?.as_str().trim().to_string(),
    })
}

fn match_command_marker(text: &str) -> Option<Action> {
    let caps = COMMAND_RE.captures(text)?;
    command(caps.get(1)?.as_str())
}

fn match_fenced_block(text: &str) -> Option<Action> {
    let caps = FENCE_RE.captures(text)?;
    command(caps.get(1)?.as_str())
}

fn match_cue_phrase(text: &str) -> Option<Action> {
    let caps = CUE_RE.captures(text)?;
    let raw = caps.get(1)?.as_str();
    command(raw.trim_matches(|c: char| c == '`' || c.is_whitespace()))
}

/// Empty commands fall through to the next matcher.
fn command(raw: &str) -> Option<Action> {
    let text = raw.trim();
    if text.is_empty() {
        return None;
    }
    Some(Action::RunCommand {
        text: text.to_string(),
    })
}
