//! Interactive approval with a bounded wait.

use std::io::{self, Write};
use std::time::{Duration, Instant};

use tracing::info;

use crate::cancel::CancelFlag;
use crate::console::{Tone, paint};
use crate::core::gate::{Reply, interpret_reply};
use crate::io::input::{LineReader, LineWait};

pub const DEFAULT_CONFIRM_TIMEOUT: Duration = Duration::from_secs(3);

/// Granularity at which a pending confirmation notices an interrupt.
const INTERRUPT_POLL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone)]
pub struct ConfirmRequest {
    pub prompt: String,
    /// How long to wait for an answer before approving.
    pub timeout: Duration,
    /// Approve immediately (the prompt is still shown).
    pub auto_mode: bool,
}

/// Source of approval decisions.
pub trait Confirmer {
    fn confirm(&self, request: &ConfirmRequest) -> Reply;
}

/// Asks on the terminal, reading the answer from the shared [`LineReader`].
///
/// No answer before the deadline counts as approval, with a visible notice.
/// An interrupt while waiting declines.
pub struct TerminalConfirmer<'a> {
    input: &'a LineReader,
    cancel: CancelFlag,
}

impl<'a> TerminalConfirmer<'a> {
    pub fn new(input: &'a LineReader, cancel: CancelFlag) -> Self {
        Self { input, cancel }
    }

    /// Wait for an answer in short slices so an interrupt ends the wait early.
    fn wait_for_answer(&self, timeout: Duration) -> Result<Option<String>, Interrupted> {
        let deadline = Instant::now() + timeout;
        loop {
            if self.cancel.is_set() {
                return Err(Interrupted);
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Ok(None);
            }
            match self.input.read_line_timeout(remaining.min(INTERRUPT_POLL)) {
                LineWait::Line(line) => return Ok(Some(line)),
                LineWait::Closed => return Ok(None),
                LineWait::TimedOut => {}
            }
        }
    }
}

struct Interrupted;

impl Confirmer for TerminalConfirmer<'_> {
    fn confirm(&self, request: &ConfirmRequest) -> Reply {
        info!(prompt = %request.prompt, auto_mode = request.auto_mode, "confirmation requested");
        if request.auto_mode {
            println!("{} {}", request.prompt, paint("(auto-approved)", Tone::System));
            return Reply::AutoApproved;
        }

        print!("{} ", request.prompt);
        let _ = io::stdout().flush();
        let Ok(answer) = self.wait_for_answer(request.timeout) else {
            println!();
            info!("confirmation interrupted");
            return Reply::Declined;
        };
        let reply = interpret_reply(answer.as_deref());
        if reply == Reply::AutoApproved {
            println!("{}", paint("(auto-approved)", Tone::System));
        }
        info!(?reply, "confirmation answered");
        reply
    }
}
