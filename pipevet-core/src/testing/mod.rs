//! Test support: structured JSONL logging for CI debugging.

pub mod log;

pub use log::{TestGuard, TestLogEntry, TestLogger, TestPhase, init_global_test_logging};
