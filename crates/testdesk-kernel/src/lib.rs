//! # testdesk-kernel
//!
//! Core crate for testdesk: a sandboxed view of a project workspace and a
//! registry of running test processes.
//!
//! The kernel owns two things:
//! - A [`Workspace`] rooted at one directory. Every path a caller hands in
//!   goes through the [`PathResolver`] first, and only paths at or below the
//!   root are ever touched.
//! - An [`ExecutionRegistry`] that launches the test runner for a target,
//!   blocks until it exits, and lets a different caller kill it by test id.
//!
//! Transport (HTTP, JSON) lives in `testdesk-server`.

pub mod config;
pub mod constants;
pub mod exec;
pub mod vfs;

pub use config::{KernelConfig, RunnerConfig, WorkspaceConfig};
pub use exec::{ExecError, ExecResult, ExecutionRegistry, RunOutcome, RunReport};
pub use vfs::{
    DirectoryEntry, EntryKind, FileRecord, PathResolver, VfsError, VfsResult, Workspace,
};
