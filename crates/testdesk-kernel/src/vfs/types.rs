//! Listing and content records.
//!
//! Their serde form is the JSON the editor UI consumes.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display};

/// `"dir"` or `"file"` on the wire. Symlinks report their target's kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, AsRefStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum EntryKind {
    Dir,
    File,
}

impl EntryKind {
    pub fn is_dir(self) -> bool {
        self == EntryKind::Dir
    }

    pub fn is_file(self) -> bool {
        self == EntryKind::File
    }
}

/// One row of a listing or search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryEntry {
    /// Final path component.
    pub name: String,
    /// Root-relative path with `/` separators.
    pub path: String,
    /// Directory or file.
    #[serde(rename = "type")]
    pub kind: EntryKind,
}

impl DirectoryEntry {
    pub fn directory(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            kind: EntryKind::Dir,
        }
    }

    pub fn file(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            kind: EntryKind::File,
        }
    }
}

/// File content plus the writability observed when it was read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    pub content: String,
    /// The server process could not write the file at read time.
    pub locked: bool,
}
