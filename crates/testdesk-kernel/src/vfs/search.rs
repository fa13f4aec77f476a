//! Filename search across the allowed roots.

use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::debug;

use super::types::DirectoryEntry;
use super::workspace::{Workspace, entry_kind};
use crate::constants::{MAX_SEARCH_RESULTS, MIN_QUERY_LEN};

impl Workspace {
    /// Find files whose name contains `query`, ignoring case.
    ///
    /// Roots are scanned in configuration order, each depth-first with
    /// entries visited in name order. A directory's own matches are
    /// appended before its subdirectories are entered, and the scan stops
    /// as soon as more than [`MAX_SEARCH_RESULTS`] have been collected, so
    /// truncation always falls on a directory boundary.
    #[tracing::instrument(skip(self), name = "workspace.search")]
    pub async fn search(&self, query: &str) -> Vec<DirectoryEntry> {
        let needle = query.to_lowercase();
        if needle.chars().count() < MIN_QUERY_LEN {
            return Vec::new();
        }

        let mut results = Vec::new();
        for root in self.allowed_roots() {
            let Ok(start) = self.resolver().resolve(root) else {
                continue;
            };

            let mut pending = vec![start];
            while let Some(dir) = pending.pop() {
                let subdirs = self.scan_dir(&dir, &needle, &mut results).await;
                if results.len() > MAX_SEARCH_RESULTS {
                    debug!(count = results.len(), "search cap reached");
                    return results;
                }
                // Reverse so the first subdirectory is popped first.
                pending.extend(subdirs.into_iter().rev());
            }
        }
        results
    }

    /// Append matching files in `dir`; return its subdirectories in name order.
    ///
    /// Symlinked directories are reported by [`entry_kind`] as directories
    /// but are not descended.
    async fn scan_dir(
        &self,
        dir: &Path,
        needle: &str,
        results: &mut Vec<DirectoryEntry>,
    ) -> Vec<PathBuf> {
        let mut read_dir = match fs::read_dir(dir).await {
            Ok(read_dir) => read_dir,
            Err(e) => {
                debug!(dir = %dir.display(), "search skipping directory: {}", e);
                return Vec::new();
            }
        };

        let mut children = Vec::new();
        while let Ok(Some(entry)) = read_dir.next_entry().await {
            children.push(entry);
        }
        children.sort_by_key(|entry| entry.file_name());

        let mut subdirs = Vec::new();
        for entry in children {
            let Ok(file_type) = entry.file_type().await else {
                continue;
            };
            if file_type.is_dir() {
                subdirs.push(entry.path());
                continue;
            }
            if file_type.is_symlink() && entry_kind(&entry).await.is_none_or(|k| k.is_dir()) {
                continue;
            }

            let name = entry.file_name().to_string_lossy().into_owned();
            if name.to_lowercase().contains(needle) {
                let path = self.resolver().relative(&entry.path());
                results.push(DirectoryEntry::file(name, path));
            }
        }
        subdirs
    }
}
