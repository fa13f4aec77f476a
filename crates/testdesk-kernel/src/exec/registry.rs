//! Registry of running tests.

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::error::{ExecError, ExecResult};
use super::process::{ProcessGroup, capture, collect, deadline, kill, runner_command};
use crate::config::RunnerConfig;
use crate::constants::{STOP_SENTINEL, TIMEOUT_SENTINEL};
use crate::vfs::{VfsError, Workspace};

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RunOutcome {
    /// The process exited on its own. `exit_code` is `None` when it was
    /// ended by a signal.
    Completed { exit_code: Option<i32> },
    /// Killed by [`ExecutionRegistry::stop`].
    Stopped,
    /// Killed after exceeding the runner timeout.
    TimedOut,
}

/// Result of a finished run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    /// Standard output, a newline, then standard error, plus a sentinel
    /// line if the run was killed.
    pub output: String,
    pub outcome: RunOutcome,
}

impl RunReport {
    /// True if the run exited on its own with status 0.
    pub fn passed(&self) -> bool {
        matches!(self.outcome, RunOutcome::Completed { exit_code: Some(0) })
    }
}

/// A registered run, visible to `stop`.
struct TrackedRun {
    /// Distinguishes this run from a later one reusing the id.
    run: u64,
    cancel: CancellationToken,
    started: Instant,
}

/// Runs test targets and tracks them by test id.
///
/// Thread-safe and meant to be shared via `Arc`. The id map is private;
/// each public method is one atomic map operation.
pub struct ExecutionRegistry {
    workspace: Arc<Workspace>,
    runner: RunnerConfig,
    runs: DashMap<String, TrackedRun>,
    next_run: AtomicU64,
}

impl ExecutionRegistry {
    /// Create a registry running `runner` inside `workspace`.
    pub fn new(workspace: Arc<Workspace>, runner: RunnerConfig) -> Self {
        Self {
            workspace,
            runner,
            runs: DashMap::new(),
            next_run: AtomicU64::new(1),
        }
    }

    /// The runner configuration.
    pub fn runner(&self) -> &RunnerConfig {
        &self.runner
    }

    /// Run the test runner on `target` and wait for it to finish.
    ///
    /// With a non-empty `test_id` the run is registered for the duration of
    /// the call and can be killed with [`ExecutionRegistry::stop`]. A second
    /// start with an id that is still active fails with
    /// [`ExecError::AlreadyRunning`].
    ///
    /// Dropping the returned future kills the process group and releases
    /// the id.
    #[tracing::instrument(skip(self), name = "exec.start")]
    pub async fn start(&self, target: &str, test_id: Option<&str>) -> ExecResult<RunReport> {
        let target_path = self.workspace.resolve(target)?;
        if fs::metadata(&target_path).await.is_err() {
            return Err(VfsError::not_found(target).into());
        }

        let cancel = CancellationToken::new();
        let mut registration = match test_id.filter(|id| !id.is_empty()) {
            Some(id) => Some(self.register(id, cancel.clone())?),
            None => None,
        };

        let mut child = runner_command(&self.runner, &target_path, self.workspace.root())
            .spawn()
            .map_err(|e| ExecError::spawn(&self.runner.program, e))?;
        info!(path = target, pid = child.id(), "test started");

        let group = ProcessGroup::of(&child);
        let stdout = capture(child.stdout.take());
        let stderr = capture(child.stderr.take());
        let drained = async {
            let out = collect(stdout).await?;
            let err = collect(stderr).await?;
            Ok::<_, io::Error>(out + "\n" + &err)
        };
        tokio::pin!(drained);
        let timer = deadline(self.runner.timeout());
        tokio::pin!(timer);

        let mut outcome = tokio::select! {
            status = child.wait() => RunOutcome::Completed { exit_code: status?.code() },
            _ = cancel.cancelled() => RunOutcome::Stopped,
            _ = &mut timer => RunOutcome::TimedOut,
        };
        if !matches!(outcome, RunOutcome::Completed { .. }) {
            group.kill();
            kill(&mut child).await;
        }

        // Background processes left by the script can hold the pipes open
        // after it exits. The run stays registered and stoppable until both
        // streams reach EOF.
        let mut output = match outcome {
            RunOutcome::Completed { .. } => {
                let drain_outcome = tokio::select! {
                    res = &mut drained => Ok(res?),
                    _ = cancel.cancelled() => Err(RunOutcome::Stopped),
                    _ = &mut timer => Err(RunOutcome::TimedOut),
                };
                match drain_outcome {
                    Ok(output) => output,
                    Err(killed) => {
                        outcome = killed;
                        group.kill();
                        drained.await?
                    }
                }
            }
            RunOutcome::Stopped | RunOutcome::TimedOut => drained.await?,
        };

        // stop() may have claimed the entry after the run finished but before
        // we got here; it has already reported the run as stopped.
        if let Some(registration) = registration.take() {
            if !registration.release() && matches!(outcome, RunOutcome::Completed { .. }) {
                outcome = RunOutcome::Stopped;
            }
        }
        if matches!(outcome, RunOutcome::Completed { .. }) {
            group.disarm();
        }

        match outcome {
            RunOutcome::Stopped => push_line(&mut output, STOP_SENTINEL),
            RunOutcome::TimedOut => push_line(&mut output, TIMEOUT_SENTINEL),
            RunOutcome::Completed { .. } => {}
        }

        info!(path = target, ?outcome, "test finished");
        Ok(RunReport { output, outcome })
    }

    /// Kill the active run registered under `test_id`.
    ///
    /// Returns the stop sentinel. The blocked `start` for that run returns
    /// shortly after with the output captured so far.
    #[tracing::instrument(skip(self), name = "exec.stop")]
    pub fn stop(&self, test_id: &str) -> ExecResult<String> {
        let Some((_, tracked)) = self.runs.remove(test_id) else {
            return Err(ExecError::not_found(test_id));
        };

        tracked.cancel.cancel();
        info!(
            test_id,
            elapsed_ms = tracked.started.elapsed().as_millis() as u64,
            "test stop requested"
        );
        Ok(STOP_SENTINEL.to_string())
    }

    /// Whether a run with this id is active.
    pub fn is_running(&self, test_id: &str) -> bool {
        self.runs.contains_key(test_id)
    }

    /// Ids of all active runs, sorted.
    pub fn active(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.runs.iter().map(|r| r.key().clone()).collect();
        ids.sort();
        ids
    }

    /// Number of active runs.
    pub fn len(&self) -> usize {
        self.runs.len()
    }

    /// True when nothing is running under an id.
    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    fn register(&self, test_id: &str, cancel: CancellationToken) -> ExecResult<Registration<'_>> {
        let run = self.next_run.fetch_add(1, Ordering::Relaxed);
        match self.runs.entry(test_id.to_string()) {
            Entry::Occupied(_) => Err(ExecError::already_running(test_id)),
            Entry::Vacant(slot) => {
                slot.insert(TrackedRun {
                    run,
                    cancel,
                    started: Instant::now(),
                });
                debug!(test_id, run, "test registered");
                Ok(Registration {
                    runs: &self.runs,
                    test_id: test_id.to_string(),
                    run,
                    armed: true,
                })
            }
        }
    }
}

/// Removes a run's entry when the run ends, however it ends.
struct Registration<'a> {
    runs: &'a DashMap<String, TrackedRun>,
    test_id: String,
    run: u64,
    armed: bool,
}

impl Registration<'_> {
    /// Remove the entry. Returns false if `stop` already removed it.
    fn release(mut self) -> bool {
        self.armed = false;
        self.remove()
    }

    fn remove(&self) -> bool {
        self.runs
            .remove_if(&self.test_id, |_, tracked| tracked.run == self.run)
            .is_some()
    }
}

impl Drop for Registration<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.remove();
        }
    }
}

fn push_line(output: &mut String, line: &str) {
    if !output.ends_with('\n') {
        output.push('\n');
    }
    output.push_str(line);
}
