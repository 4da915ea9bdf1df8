//! Agent configuration stored in `~/.aicmd.toml`.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const CONFIG_FILE_NAME: &str = ".aicmd.toml";

/// Agent configuration (TOML).
///
/// Every field is optional in the file; missing fields take the defaults
/// below.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AgentConfig {
    /// OpenAI-compatible streaming chat-completion endpoint.
    pub api_url: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,

    /// Per-request transport timeout in seconds.
    pub request_timeout_secs: u64,

    /// Wall-clock limit for a single shell command in seconds.
    pub command_timeout_secs: u64,

    /// How long a confirmation prompt waits before approving.
    pub confirm_timeout_secs: u64,

    /// Consecutive failed actions tolerated per goal.
    pub max_errors: u32,

    /// Start with auto mode on (confirmation only for denylisted commands).
    pub auto_mode: bool,

    /// Truncate each captured command stream beyond this many bytes.
    pub output_limit_bytes: usize,

    /// Host name shown to the model and used as the console label.
    pub system_name: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.deepseek.com/v1/chat/completions".to_string(),
            model: "deepseek-chat".to_string(),
            temperature: 0.7,
            max_tokens: 2048,
            request_timeout_secs: 45,
            command_timeout_secs: 30,
            confirm_timeout_secs: 3,
            max_errors: 10,
            auto_mode: true,
            output_limit_bytes: 100_000,
            system_name: std::env::consts::OS.to_string(),
        }
    }
}

impl AgentConfig {
    pub fn validate(&self) -> Result<()> {
        if self.api_url.trim().is_empty() {
            return Err(anyhow!("api_url must not be empty"));
        }
        if self.model.trim().is_empty() {
            return Err(anyhow!("model must not be empty"));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(anyhow!("temperature must be within 0.0..=2.0"));
        }
        if self.max_tokens == 0 {
            return Err(anyhow!("max_tokens must be > 0"));
        }
        if self.request_timeout_secs == 0 {
            return Err(anyhow!("request_timeout_secs must be > 0"));
        }
        if self.command_timeout_secs == 0 {
            return Err(anyhow!("command_timeout_secs must be > 0"));
        }
        if self.max_errors == 0 {
            return Err(anyhow!("max_errors must be > 0"));
        }
        if self.output_limit_bytes == 0 {
            return Err(anyhow!("output_limit_bytes must be > 0"));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }

    pub fn confirm_timeout(&self) -> Duration {
        Duration::from_secs(self.confirm_timeout_secs)
    }
}

/// `~/.aicmd.toml`, or `None` when the home directory is unknown.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(CONFIG_FILE_NAME))
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `AgentConfig::default()`.
pub fn load_config(path: &Path) -> Result<AgentConfig> {
    if !path.exists() {
        debug!(path = %path.display(), "config missing, using defaults");
        let cfg = AgentConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: AgentConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("invalid config {}", path.display()))?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &AgentConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    super::write_atomic(path, &buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_missing_returns_default() {
        let temp = tempfile::tempdir().expect("tempdir");
        let cfg = load_config(&temp.path().join("missing.toml")).expect("load");
        assert_eq!(cfg, AgentConfig::default());
    }

    #[test]
    fn write_then_load_round_trips() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("nested/config.toml");
        let cfg = AgentConfig {
            model: "deepseek-coder".to_string(),
            auto_mode: false,
            ..AgentConfig::default()
        };
        write_config(&path, &cfg).expect("write");
        assert_eq!(load_config(&path).expect("load"), cfg);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("config.toml");
        fs::write(&path, "max_errors = 3\nsystem_name = \"Termux\"\n").expect("seed");

        let cfg = load_config(&path).expect("load");
        assert_eq!(cfg.max_errors, 3);
        assert_eq!(cfg.system_name, "Termux");
        assert_eq!(cfg.model, "deepseek-chat");
        assert_eq!(cfg.command_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn invalid_values_are_rejected() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("config.toml");
        fs::write(&path, "max_errors = 0\n").expect("seed");
        let err = load_config(&path).unwrap_err();
        assert!(format!("{err:#}").contains("max_errors must be > 0"));

        let cfg = AgentConfig {
            temperature: 3.5,
            ..AgentConfig::default()
        };
        assert!(cfg.validate().is_err());
    }
}
