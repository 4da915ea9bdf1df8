//! Confirmation policy for directives.
//!
//! Deciding *whether* an action needs approval is pure and lives here; the
//! interactive wait itself is in `io::confirm`.

use crate::core::types::Action;

/// Substrings that always force a confirmation step, even in auto mode.
pub const DENYLIST: [&str; 6] = ["rm -rf", "chmod", "dd", "mv", ">", ">>"];

/// Return the first denylisted substring contained in `command`.
pub fn denylisted(command: &str) -> Option<&'static str> {
    DENYLIST.iter().copied().find(|needle| command.contains(needle))
}

/// Whether `action` must be approved before it runs.
///
/// Only shell commands are gated. File writes run without a prompt.
pub fn requires_confirmation(action: &Action, auto_mode: bool) -> bool {
    match action {
        Action::RunCommand { text } => denylisted(text).is_some() || !auto_mode,
        Action::WriteFile { .. } | Action::Complete | Action::Unrecognized => false,
    }
}

/// Interpretation of the answer to a confirmation prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reply {
    Approved,
    /// No answer before the deadline.
    AutoApproved,
    Declined,
}

impl Reply {
    pub fn is_approved(self) -> bool {
        matches!(self, Self::Approved | Self::AutoApproved)
    }
}

/// Classify a typed answer. `None` means the deadline elapsed.
///
/// Empty input and `y` (any case) approve; everything else declines.
pub fn interpret_reply(answer: Option<&str>) -> Reply {
    match answer.map(|s| s.trim().to_lowercase()) {
        None => Reply::AutoApproved,
        Some(s) if s.is_empty() || s == "y" => Reply::Approved,
        Some(_) => Reply::Declined,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cmd(text: &str) -> Action {
        Action::RunCommand {
            text: text.to_string(),
        }
    }

    #[test]
    fn denylisted_commands_need_confirmation_in_auto_mode() {
        let commands = [
            "rm -rf build",
            "chmod +x run.sh",
            "dd if=/dev/zero of=/tmp/img bs=1M count=1",
            "mv a b",
            "echo hi > out.txt",
            "echo hi >> out.txt",
        ];
        for text in commands {
            assert!(requires_confirmation(&cmd(text), true), "{text}");
            assert!(requires_confirmation(&cmd(text), false), "{text}");
        }
    }

    #[test]
    fn plain_commands_follow_auto_mode() {
        assert!(!requires_confirmation(&cmd("ls -la"), true));
        assert!(requires_confirmation(&cmd("ls -la"), false));
    }

    /// Matching is by substring, so words that merely contain a keyword are gated too.
    #[test]
    fn denylist_matches_substrings() {
        assert_eq!(denylisted("git add ."), Some("dd"));
        assert_eq!(denylisted("cat README.md"), None);
    }

    #[test]
    fn non_commands_are_never_gated() {
        let write = Action::WriteFile {
            path: "x".to_string(),
            content: "rm -rf /".to_string(),
        };
        assert!(!requires_confirmation(&write, false));
        assert!(!requires_confirmation(&Action::Complete, false));
        assert!(!requires_confirmation(&Action::Unrecognized, false));
    }

    #[test]
    fn interpret_reply_cases() {
        assert_eq!(interpret_reply(None), Reply::AutoApproved);
        assert_eq!(interpret_reply(Some("")), Reply::Approved);
        assert_eq!(interpret_reply(Some("  \n")), Reply::Approved);
        assert_eq!(interpret_reply(Some("Y")), Reply::Approved);
        assert_eq!(interpret_reply(Some("n")), Reply::Declined);
        assert_eq!(interpret_reply(Some("yes")), Reply::Declined);
        assert!(Reply::AutoApproved.is_approved());
        assert!(!Reply::Declined.is_approved());
    }
}
