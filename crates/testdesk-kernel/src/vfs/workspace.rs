//! Workspace filesystem operations.
//!
//! Listing and file content access over a real directory tree. Every
//! operation resolves its path through the [`PathResolver`] before doing
//! any I/O.

use std::cmp::Ordering;
use std::fs::Metadata;
use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{debug, warn};

use super::error::{VfsError, VfsResult};
use super::resolver::PathResolver;
use super::types::{DirectoryEntry, EntryKind, FileRecord};
use crate::config::WorkspaceConfig;

/// A project root plus the top-level directories exposed from it.
#[derive(Debug, Clone)]
pub struct Workspace {
    resolver: PathResolver,
    allowed_roots: Vec<String>,
}

impl Workspace {
    /// Create a workspace rooted at `root`.
    pub fn new(root: impl AsRef<Path>, allowed_roots: Vec<String>) -> VfsResult<Self> {
        Ok(Self {
            resolver: PathResolver::new(root)?,
            allowed_roots,
        })
    }

    /// Create a workspace from configuration.
    ///
    /// A missing root means the current working directory.
    pub fn from_config(config: &WorkspaceConfig) -> VfsResult<Self> {
        let root = match &config.root {
            Some(root) => root.clone(),
            None => std::env::current_dir()?,
        };
        Self::new(root, config.allowed_roots.clone())
    }

    /// Get the root path.
    pub fn root(&self) -> &Path {
        self.resolver.root()
    }

    /// Top-level directory names, in configuration order.
    pub fn allowed_roots(&self) -> &[String] {
        &self.allowed_roots
    }

    /// The resolver shared by every operation.
    pub fn resolver(&self) -> &PathResolver {
        &self.resolver
    }

    /// Resolve a caller path to an absolute path within the root.
    pub fn resolve(&self, path: &str) -> VfsResult<PathBuf> {
        self.resolver.resolve(path)
    }

    // ========================================================================
    // Listing
    // ========================================================================

    /// List `path`, or the allowed roots when `path` is empty.
    ///
    /// Rejected and missing paths produce an empty listing. Use
    /// [`Workspace::list_checked`] to tell them apart.
    pub async fn list(&self, path: &str) -> Vec<DirectoryEntry> {
        if path.is_empty() {
            return self.list_roots().await;
        }

        match self.list_checked(path).await {
            Ok(entries) => entries,
            Err(e) if e.is_rejected() => {
                warn!(path, "listing rejected: {}", e);
                Vec::new()
            }
            Err(e) => {
                debug!(path, "listing unavailable: {}", e);
                Vec::new()
            }
        }
    }

    /// The allowed roots that currently exist, in configuration order.
    pub async fn list_roots(&self) -> Vec<DirectoryEntry> {
        let mut entries = Vec::with_capacity(self.allowed_roots.len());
        for name in &self.allowed_roots {
            let Ok(full) = self.resolver.resolve(name) else {
                warn!(root = %name, "allowed root escapes the workspace, ignoring");
                continue;
            };
            if fs::metadata(&full).await.is_ok() {
                entries.push(DirectoryEntry::directory(name.clone(), name.clone()));
            }
        }
        entries
    }

    /// List the immediate children of `path`.
    ///
    /// Directories sort before files, then names compare case-insensitively.
    /// Children whose type cannot be determined are skipped.
    pub async fn list_checked(&self, path: &str) -> VfsResult<Vec<DirectoryEntry>> {
        let full = self.resolver.resolve(path)?;
        let mut dir = fs::read_dir(&full)
            .await
            .map_err(|e| VfsError::from_io(path, e))?;

        let mut entries = Vec::new();
        loop {
            let entry = match dir.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    debug!(path, "directory read interrupted: {}", e);
                    break;
                }
            };

            let entry_path = entry.path();
            let Some(kind) = entry_kind(&entry).await else {
                debug!(path = %entry_path.display(), "skipping entry");
                continue;
            };

            entries.push(DirectoryEntry {
                name: entry.file_name().to_string_lossy().into_owned(),
                path: self.resolver.relative(&entry_path),
                kind,
            });
        }

        entries.sort_by(compare_entries);
        Ok(entries)
    }

    // ========================================================================
    // Content
    // ========================================================================

    /// Read a file as text and report whether it is currently locked.
    ///
    /// Invalid UTF-8 is replaced rather than rejected.
    pub async fn read(&self, path: &str) -> VfsResult<FileRecord> {
        let full = self.resolver.resolve(path)?;
        let meta = fs::metadata(&full)
            .await
            .map_err(|e| VfsError::from_io(path, e))?;
        if meta.is_dir() {
            return Err(VfsError::expected_file(path));
        }

        #[cfg(unix)]
        let locked = !is_writable(&full);
        #[cfg(not(unix))]
        let locked = meta.permissions().readonly();
        let bytes = fs::read(&full)
            .await
            .map_err(|e| VfsError::from_io(path, e))?;

        Ok(FileRecord {
            content: String::from_utf8_lossy(&bytes).into_owned(),
            locked,
        })
    }

    /// Replace the whole content of a file, creating it if needed.
    ///
    /// The parent directory must already exist.
    pub async fn write(&self, path: &str, content: &str) -> VfsResult<()> {
        let full = self.resolver.resolve(path)?;
        fs::write(&full, content)
            .await
            .map_err(|e| VfsError::from_io(path, e))
    }

    /// Remove the read-only restriction from a file.
    pub async fn clear_lock(&self, path: &str) -> VfsResult<()> {
        let full = self.resolver.resolve(path)?;
        let meta = fs::metadata(&full)
            .await
            .map_err(|e| VfsError::from_io(path, e))?;

        let permissions = writable_permissions(&meta);
        fs::set_permissions(&full, permissions)
            .await
            .map_err(|e| VfsError::from_io(path, e))
    }
}

/// Directories first, then case-folded name, then raw name.
fn compare_entries(a: &DirectoryEntry, b: &DirectoryEntry) -> Ordering {
    b.kind
        .is_dir()
        .cmp(&a.kind.is_dir())
        .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
        .then_with(|| a.name.cmp(&b.name))
}

/// Classify a directory entry, following symlinks.
///
/// Returns `None` if the entry (or a link target) cannot be inspected.
pub(crate) async fn entry_kind(entry: &fs::DirEntry) -> Option<EntryKind> {
    let file_type = entry.file_type().await.ok()?;
    let is_dir = if file_type.is_symlink() {
        fs::metadata(entry.path()).await.ok()?.is_dir()
    } else {
        file_type.is_dir()
    };

    Some(if is_dir {
        EntryKind::Dir
    } else {
        EntryKind::File
    })
}

/// Whether this process may write `path`, as the kernel decides it.
#[cfg(unix)]
fn is_writable(path: &Path) -> bool {
    use rustix::fs::{Access, access};
    access(path, Access::WRITE_OK).is_ok()
}

#[cfg(unix)]
fn writable_permissions(meta: &Metadata) -> std::fs::Permissions {
    use std::os::unix::fs::PermissionsExt;
    std::fs::Permissions::from_mode(meta.permissions().mode() | 0o200)
}

#[cfg(not(unix))]
fn writable_permissions(meta: &Metadata) -> std::fs::Permissions {
    let mut permissions = meta.permissions();
    permissions.set_readonly(false);
    permissions
}
