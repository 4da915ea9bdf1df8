//! Line-oriented terminal input owned by a single background reader.
//!
//! All interactive reads (goal prompt, confirmation prompt, API key prompt) go
//! through one [`LineReader`], so a confirmation that times out never leaves a
//! stray blocking read behind that would swallow the next goal.

use std::io::{self, BufRead, BufReader};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use tracing::debug;

/// Result of waiting for a line with a deadline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineWait {
    Line(String),
    TimedOut,
    /// Input reached EOF or failed.
    Closed,
}

pub struct LineReader {
    rx: Receiver<String>,
}

impl LineReader {
    /// Read lines from standard input.
    pub fn stdin() -> Self {
        Self::spawn(BufReader::new(io::stdin()))
    }

    /// Read lines from `reader` on a background thread.
    pub fn spawn<R: BufRead + Send + 'static>(mut reader: R) -> Self {
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            loop {
                let mut buf = Vec::new();
                match reader.read_until(b'\n', &mut buf) {
                    Ok(0) => break,
                    Ok(_) => {
                        let line = String::from_utf8_lossy(&buf)
                            .trim_end_matches(['\r', '\n'])
                            .to_string();
                        if tx.send(line).is_err() {
                            break;
                        }
                    }
                    Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                    Err(err) => {
                        debug!(err = %err, "input reader stopped");
                        break;
                    }
                }
            }
        });
        Self { rx }
    }

    /// Block until a line arrives. `None` once input is closed.
    pub fn read_line(&self) -> Option<String> {
        self.rx.recv().ok()
    }

    /// Wait up to `timeout` for a line.
    pub fn read_line_timeout(&self, timeout: Duration) -> LineWait {
        match self.rx.recv_timeout(timeout) {
            Ok(line) => LineWait::Line(line),
            Err(RecvTimeoutError::Timeout) => LineWait::TimedOut,
            Err(RecvTimeoutError::Disconnected) => LineWait::Closed,
        }
    }
}
