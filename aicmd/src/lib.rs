//! Autonomous terminal agent.
//!
//! A user goal is relayed to a remote chat model; each reply is parsed into a
//! single directive (run a command, write a file, or declare completion), the
//! directive is executed locally and its outcome is fed back, until the model
//! declares the goal complete or an error budget runs out.
//!
//! - **[`core`]**: Pure, deterministic logic (directive parsing, confirmation
//!   policy, feedback text, stream decoding). No I/O.
//! - **[`io`]**: Side-effecting collaborators (shell, filesystem, terminal
//!   input, HTTP, persisted config and state). Behind traits where the loop
//!   needs test doubles.
//!
//! [`session`] owns the conversation, [`turn`] runs one goal to a terminal
//! state and [`repl`] drives goals from the terminal.

pub mod cancel;
pub mod console;
pub mod core;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod repl;
pub mod session;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
pub mod turn;
