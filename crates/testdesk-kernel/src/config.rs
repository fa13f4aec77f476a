//! Kernel configuration.
//!
//! These types deserialize from the `[workspace]` and `[runner]` tables of
//! the server's TOML file. Every field has a default, so an empty file (or
//! no file at all) yields a working configuration.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_ALLOWED_ROOTS, DEFAULT_RUNNER_ARGS, DEFAULT_RUNNER_PROGRAM};

/// Combined kernel configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KernelConfig {
    #[serde(default)]
    pub workspace: WorkspaceConfig,

    #[serde(default)]
    pub runner: RunnerConfig,
}

/// Which directory is sandboxed and which of its children are exposed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceConfig {
    /// Project root. Relative roots are taken against the current directory;
    /// `None` means the current directory itself.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root: Option<PathBuf>,

    /// Top-level directory names listed when no path is given, in order.
    #[serde(default = "default_allowed_roots")]
    pub allowed_roots: Vec<String>,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            root: None,
            allowed_roots: default_allowed_roots(),
        }
    }
}

fn default_allowed_roots() -> Vec<String> {
    DEFAULT_ALLOWED_ROOTS.iter().map(|s| s.to_string()).collect()
}

/// How a test target is executed.
///
/// The command line is `program args... <absolute target path>`, run with
/// the workspace root as working directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerConfig {
    #[serde(default = "default_program")]
    pub program: String,

    #[serde(default = "default_args")]
    pub args: Vec<String>,

    /// Kill runs that take longer than this. Absent or zero means no limit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

impl RunnerConfig {
    /// Create a runner for `program` with no leading arguments.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            timeout_secs: None,
        }
    }

    /// Set the arguments placed before the target path.
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Set the run timeout.
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    /// The effective timeout, if any.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            program: default_program(),
            args: default_args(),
            timeout_secs: None,
        }
    }
}

fn default_program() -> String {
    DEFAULT_RUNNER_PROGRAM.to_string()
}

fn default_args() -> Vec<String> {
    DEFAULT_RUNNER_ARGS.iter().map(|s| s.to_string()).collect()
}
