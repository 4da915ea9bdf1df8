//! Deterministic, pure logic shared by the agent core.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! data and return deterministic outputs suitable for tests.

pub mod directive;
pub mod feedback;
pub mod gate;
pub mod meta;
pub mod sse;
pub mod types;
