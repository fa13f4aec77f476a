//! Opening workspace files in the desktop's default application.

use std::io;
use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, warn};

/// Hands a resolved path to something outside the server.
#[async_trait]
pub trait ExternalOpener: Send + Sync {
    /// Launch the opener for `path`. Returns once it has started.
    async fn open(&self, path: &Path) -> io::Result<()>;
}

/// Opens files with the platform opener (`xdg-open`, `open`, or `start`).
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemOpener;

#[async_trait]
impl ExternalOpener for SystemOpener {
    async fn open(&self, path: &Path) -> io::Result<()> {
        let mut child = open_command(path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;

        let shown = path.display().to_string();
        tokio::spawn(async move {
            match child.wait().await {
                Ok(status) if status.success() => debug!(path = %shown, "opened externally"),
                Ok(status) => warn!(path = %shown, %status, "file opener failed"),
                Err(e) => warn!(path = %shown, "file opener wait failed: {}", e),
            }
        });
        Ok(())
    }
}

#[cfg(target_os = "macos")]
fn open_command(path: &Path) -> Command {
    let mut cmd = Command::new("open");
    cmd.arg(path);
    cmd
}

#[cfg(windows)]
fn open_command(path: &Path) -> Command {
    let mut cmd = Command::new("cmd");
    // The empty argument is the window title `start` expects first.
    cmd.args(["/C", "start", ""]).arg(path);
    cmd
}

#[cfg(not(any(target_os = "macos", windows)))]
fn open_command(path: &Path) -> Command {
    let mut cmd = Command::new("xdg-open");
    cmd.arg(path);
    cmd
}
