//! Saved conversation history (`~/.aicmd_history`).
//!
//! Stored as a pretty-printed JSON array of `{role, content}` objects,
//! including the system prime at index 0.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::debug;

use crate::core::types::ConversationMessage;

pub const HISTORY_FILE_NAME: &str = ".aicmd_history";

pub fn default_history_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(HISTORY_FILE_NAME))
}

/// Load saved history from disk.
pub fn load_history(path: &Path) -> Result<Vec<ConversationMessage>> {
    debug!(path = %path.display(), "loading history");
    let contents =
        fs::read_to_string(path).with_context(|| format!("read history {}", path.display()))?;
    let messages: Vec<ConversationMessage> = serde_json::from_str(&contents)
        .with_context(|| format!("parse history {}", path.display()))?;
    debug!(messages = messages.len(), "history loaded");
    Ok(messages)
}

/// Atomically write history to disk (temp file + rename).
pub fn save_history(path: &Path, messages: &[ConversationMessage]) -> Result<()> {
    debug!(path = %path.display(), messages = messages.len(), "writing history");
    let mut buf = serde_json::to_string_pretty(messages).context("serialize history")?;
    buf.push('\n');
    super::write_atomic(path, &buf)
}
