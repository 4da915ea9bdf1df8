//! Stable process exit codes.

/// Session ended normally, or a one-shot goal completed (or stopped without a
/// directive).
pub const OK: i32 = 0;
/// Invalid configuration, unreadable state files or other setup errors.
pub const INVALID: i32 = 1;
/// No API key from the environment, the key file or the prompt.
pub const MISSING_CREDENTIAL: i32 = 2;
/// A one-shot goal was abandoned: error budget exhausted, interrupted, or the
/// model endpoint failed.
pub const GOAL_FAILED: i32 = 3;
