//! Sandboxed workspace filesystem.
//!
//! Key components:
//!
//! - [`PathResolver`] - Lexical path confinement to the workspace root
//! - [`Workspace`] - Listing, search, and file content operations
//!
//! ## Design Decisions
//!
//! - **Lexical confinement**: paths are normalized without touching the
//!   filesystem and then checked against the root, so a rejected path never
//!   reaches a syscall.
//! - **Root-relative names out**: every path handed back to callers is
//!   relative to the root and uses `/` separators.
//! - **Fresh on every call**: nothing is cached; each listing or read sees
//!   the filesystem as it is now.

mod error;
mod resolver;
mod search;
mod types;
mod workspace;

pub use error::{VfsError, VfsResult};
pub use resolver::{PathResolver, normalize_path};
pub use types::{DirectoryEntry, EntryKind, FileRecord};
pub use workspace::Workspace;
