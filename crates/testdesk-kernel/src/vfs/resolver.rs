//! Path confinement.
//!
//! All paths arriving from callers are joined onto the workspace root and
//! normalized lexically. A path whose normalized form is not at or below
//! the root is rejected without any filesystem access.

use std::ffi::OsString;
use std::path::{Component, Path, PathBuf};

use super::error::{VfsError, VfsResult};

/// Resolves caller-supplied paths against a fixed root.
///
/// For example, if the root is `/home/amy/bench`, then `resolve("Tests/a.py")`
/// yields `/home/amy/bench/Tests/a.py`, while `resolve("../secrets")` and
/// `resolve("/etc/passwd")` are both rejected.
#[derive(Debug, Clone)]
pub struct PathResolver {
    root: PathBuf,
}

impl PathResolver {
    /// Create a resolver for `root`.
    ///
    /// The root is canonicalized here, once, so later checks compare
    /// against its real location (e.g. macOS `/tmp` → `/private/tmp`).
    pub fn new(root: impl AsRef<Path>) -> VfsResult<Self> {
        let root = root.as_ref();
        let root = dunce::canonicalize(root)
            .map_err(|e| VfsError::from_io(&root.display().to_string(), e))?;
        if !root.is_dir() {
            return Err(VfsError::RootNotDirectory(root));
        }
        Ok(Self { root })
    }

    /// Get the root path.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve `rel` to an absolute path within the root.
    ///
    /// Does not check existence.
    pub fn resolve(&self, rel: &str) -> VfsResult<PathBuf> {
        // An absolute `rel` replaces the root here; the prefix check below
        // decides whether it still lands inside.
        let candidate = self.root.join(rel);
        let normalized = normalize_path(&candidate);

        if !normalized.starts_with(&self.root) {
            return Err(VfsError::rejected(rel));
        }

        Ok(normalized)
    }

    /// Root-relative, `/`-separated form of a path inside the root.
    ///
    /// Returns an empty string for the root itself.
    pub fn relative(&self, path: &Path) -> String {
        let rel = path.strip_prefix(&self.root).unwrap_or(path);
        rel.components()
            .filter_map(|c| match c {
                Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("/")
    }
}

/// Lexically normalize a path: drop `.`, fold `..` into its parent.
///
/// `..` at the top of an absolute path is discarded (`/..` is `/`); at the
/// top of a relative path it is kept.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut stack: Vec<OsString> = Vec::new();
    let mut prefix: Option<OsString> = None;
    let mut absolute = false;

    for component in path.components() {
        match component {
            Component::Prefix(prefix_component) => {
                prefix = Some(prefix_component.as_os_str().to_os_string());
            }
            Component::RootDir => {
                absolute = true;
                stack.clear();
            }
            Component::CurDir => {}
            Component::ParentDir => {
                let top_is_parent = stack.last().is_some_and(|s| s == "..");
                if !stack.is_empty() && !top_is_parent {
                    stack.pop();
                } else if !absolute {
                    stack.push(OsString::from(".."));
                }
            }
            Component::Normal(part) => stack.push(part.to_os_string()),
        }
    }

    let mut out = PathBuf::new();
    if let Some(prefix) = prefix {
        out.push(prefix);
    }
    if absolute {
        out.push(Component::RootDir.as_os_str());
    }
    for part in stack {
        out.push(part);
    }
    out
}
