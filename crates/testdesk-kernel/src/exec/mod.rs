//! Test execution.
//!
//! [`ExecutionRegistry`] runs the configured test runner against a target
//! inside the workspace and tracks runs by caller-chosen test id so another
//! caller can kill them.
//!
//! # Lifecycle
//!
//! ```text
//!            start(target, id)
//!   Idle ─────────────────────────► Running ──── exits ────► Completed
//!                                      │
//!                                      ├──── stop(id) ─────► Stopped
//!                                      │
//!                                      └──── timeout ──────► TimedOut
//! ```
//!
//! The registry entry for an id exists only while its `start` call is
//! blocked. Natural exit and `stop` race to remove it; whichever removes
//! the entry decides the outcome.

mod error;
mod process;
mod registry;

pub use error::{ExecError, ExecResult};
pub use registry::{ExecutionRegistry, RunOutcome, RunReport};
