//! Slash-prefixed meta-commands handled by the interactive shell.
//!
//! These bypass the turn loop entirely.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetaCommand {
    Exit,
    Help,
    ClearHistory,
    SaveSession,
    ToggleAutoMode,
    Unknown(String),
}

impl MetaCommand {
    /// Parse a line of user input. Returns `None` for ordinary goals.
    pub fn parse(input: &str) -> Option<Self> {
        let input = input.trim();
        if !input.starts_with('/') {
            return None;
        }
        let cmd = match input {
            "/exit" | "/quit" | "/退出" => Self::Exit,
            "/help" | "/?" | "/帮助" => Self::Help,
            "/clear" | "/reset" | "/清除" => Self::ClearHistory,
            "/save" | "/backup" | "/保存" => Self::SaveSession,
            "/auto" | "/自动" => Self::ToggleAutoMode,
            other => Self::Unknown(other.to_string()),
        };
        Some(cmd)
    }
}

pub const HELP_TEXT: &str = "\
available commands:
  /exit   quit the program
  /help   show this help
  /clear  clear conversation history
  /save   save the session to ~/.aicmd_history
  /auto   toggle auto mode";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_aliases() {
        assert_eq!(MetaCommand::parse("/quit"), Some(MetaCommand::Exit));
        assert_eq!(MetaCommand::parse("/退出"), Some(MetaCommand::Exit));
        assert_eq!(MetaCommand::parse(" /? "), Some(MetaCommand::Help));
        assert_eq!(MetaCommand::parse("/reset"), Some(MetaCommand::ClearHistory));
        assert_eq!(MetaCommand::parse("/backup"), Some(MetaCommand::SaveSession));
        assert_eq!(MetaCommand::parse("/自动"), Some(MetaCommand::ToggleAutoMode));
    }

    #[test]
    fn unknown_and_plain_input() {
        assert_eq!(
            MetaCommand::parse("/frobnicate"),
            Some(MetaCommand::Unknown("/frobnicate".to_string()))
        );
        assert_eq!(MetaCommand::parse("list files in /tmp"), None);
    }
}
