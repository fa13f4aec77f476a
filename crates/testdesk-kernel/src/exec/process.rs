//! Child process plumbing for test runs.

use std::io;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tracing::warn;

use crate::config::RunnerConfig;

/// Build the runner command for an absolute `target`.
///
/// The child gets its own process group on unix so a kill reaches anything
/// it spawned, and is killed if the owning future is dropped.
pub(crate) fn runner_command(runner: &RunnerConfig, target: &Path, cwd: &Path) -> Command {
    let mut cmd = Command::new(&runner.program);
    cmd.args(&runner.args)
        .arg(target)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    #[cfg(unix)]
    cmd.process_group(0);

    cmd
}

/// Drain a pipe on a background task until EOF.
pub(crate) fn capture<R>(stream: Option<R>) -> JoinHandle<io::Result<Vec<u8>>>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut buf = Vec::new();
        if let Some(mut stream) = stream {
            stream.read_to_end(&mut buf).await?;
        }
        Ok(buf)
    })
}

/// Wait for a capture task and decode what it collected.
pub(crate) async fn collect(task: JoinHandle<io::Result<Vec<u8>>>) -> io::Result<String> {
    let bytes = task.await.map_err(io::Error::other)??;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Kills the child's process group when dropped.
///
/// Covers members that outlive the child itself, including the case where
/// the owning future is dropped mid-run. Disarm once the run has finished
/// cleanly.
pub(crate) struct ProcessGroup {
    #[cfg_attr(not(unix), allow(dead_code))]
    pid: Option<u32>,
}

impl ProcessGroup {
    pub(crate) fn of(child: &Child) -> Self {
        Self { pid: child.id() }
    }

    /// Hard-kill every process in the group.
    pub(crate) fn kill(&self) {
        #[cfg(unix)]
        if let Some(pid) = self.pid {
            kill_process_group(pid);
        }
    }

    pub(crate) fn disarm(mut self) {
        self.pid = None;
    }
}

impl Drop for ProcessGroup {
    fn drop(&mut self) {
        self.kill();
    }
}

/// Hard-kill the child itself and reap it.
pub(crate) async fn kill(child: &mut Child) {
    if let Err(e) = child.kill().await {
        warn!("failed to kill test process: {}", e);
    }
}

#[cfg(unix)]
fn kill_process_group(pid: u32) {
    use rustix::process::{Pid, Signal};

    let Some(pid) = i32::try_from(pid).ok().and_then(Pid::from_raw) else {
        return;
    };
    if let Err(e) = rustix::process::kill_process_group(pid, Signal::Kill) {
        tracing::debug!("process group kill failed: {}", e);
    }
}

/// Resolves after `limit`, or never when there is no limit.
pub(crate) async fn deadline(limit: Option<Duration>) {
    match limit {
        Some(limit) => tokio::time::sleep(limit).await,
        None => std::future::pending().await,
    }
}
