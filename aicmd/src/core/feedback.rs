//! Text fed back to the model after each local action.

use crate::core::types::ExecutionResult;

pub const CANCELLED_FEEDBACK: &str = "command error: cancelled by user";

pub fn file_write_feedback(result: &ExecutionResult) -> String {
    format!("file write result: {}", result.output)
}

pub fn command_feedback(result: &ExecutionResult) -> String {
    format!("command result:\n{}", result.output)
}
