//! Kernel constants.
//!
//! Centralizes hardcoded values for easier configuration and documentation.

/// Top-level directories exposed when no configuration overrides them.
pub const DEFAULT_ALLOWED_ROOTS: &[&str] = &["Tests", "Calibration", "src"];

/// Search stops once more than this many results have been collected.
pub const MAX_SEARCH_RESULTS: usize = 100;

/// Queries shorter than this (in characters) return no results.
pub const MIN_QUERY_LEN: usize = 2;

/// Default test runner program.
pub const DEFAULT_RUNNER_PROGRAM: &str = "python3";

/// Default arguments placed before the target path.
pub const DEFAULT_RUNNER_ARGS: &[&str] = &["src/main.py"];

/// Appended to the output of a run killed by `stop`.
pub const STOP_SENTINEL: &str = "[Test stopped by user]";

/// Appended to the output of a run killed by the configured timeout.
pub const TIMEOUT_SENTINEL: &str = "[Test timed out]";
