//! Classified filesystem events
//!
//! Every event except [`Event::Moved`] concerns a single path. Renames carry
//! both absolute paths so consumers never have to pair the halves themselves.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// A path-level change inside a watched location
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Change {
    /// Absolute path of the affected entry
    pub fullname: PathBuf,
    /// Path relative to the watch root (empty for the root itself)
    pub name: PathBuf,
}

impl Change {
    pub fn new(fullname: impl Into<PathBuf>, name: impl Into<PathBuf>) -> Self {
        Self {
            fullname: fullname.into(),
            name: name.into(),
        }
    }

    /// Whether the event concerns the watch root rather than an entry inside it
    pub fn is_root(&self) -> bool {
        self.name.as_os_str().is_empty()
    }
}

/// A rename whose source and destination were both observed
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rename {
    /// Absolute path before the rename
    pub old_path: PathBuf,
    /// Absolute path after the rename
    pub new_path: PathBuf,
    /// Destination path relative to its watch root
    pub name: PathBuf,
}

/// Represents a classified filesystem event
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Event {
    /// File was read
    Access(Change),
    /// Metadata changed (permissions, timestamps, xattrs, link count)
    Attrib(Change),
    /// File opened for writing was closed
    CloseWrite(Change),
    /// File not opened for writing was closed
    CloseNoWrite(Change),
    /// Entry created in a watched directory
    Create(Change),
    /// Entry deleted from a watched directory
    Delete(Change),
    /// The watched path itself was deleted
    DeleteSelf(Change),
    /// File contents were written
    Modify(Change),
    /// The watched path itself was moved
    MoveSelf(Change),
    /// Entry renamed between (or within) watched directories
    Moved(Rename),
    /// File or directory was opened
    Open(Change),
}

/// Discriminant of [`Event`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Access,
    Attrib,
    CloseWrite,
    CloseNoWrite,
    Create,
    Delete,
    DeleteSelf,
    Modify,
    MoveSelf,
    Moved,
    Open,
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Access(_) => EventKind::Access,
            Self::Attrib(_) => EventKind::Attrib,
            Self::CloseWrite(_) => EventKind::CloseWrite,
            Self::CloseNoWrite(_) => EventKind::CloseNoWrite,
            Self::Create(_) => EventKind::Create,
            Self::Delete(_) => EventKind::Delete,
            Self::DeleteSelf(_) => EventKind::DeleteSelf,
            Self::Modify(_) => EventKind::Modify,
            Self::MoveSelf(_) => EventKind::MoveSelf,
            Self::Moved(_) => EventKind::Moved,
            Self::Open(_) => EventKind::Open,
        }
    }

    /// Get the primary path associated with this event
    ///
    /// For renames this is the destination.
    pub fn path(&self) -> &Path {
        match self {
            Self::Moved(rename) => &rename.new_path,
            other => match other.change() {
                Some(change) => &change.fullname,
                None => Path::new(""),
            },
        }
    }

    /// Path relative to the watch root
    pub fn name(&self) -> &Path {
        match self {
            Self::Moved(rename) => &rename.name,
            other => match other.change() {
                Some(change) => &change.name,
                None => Path::new(""),
            },
        }
    }

    /// Single-path payload, `None` for renames
    pub fn change(&self) -> Option<&Change> {
        match self {
            Self::Access(c)
            | Self::Attrib(c)
            | Self::CloseWrite(c)
            | Self::CloseNoWrite(c)
            | Self::Create(c)
            | Self::Delete(c)
            | Self::DeleteSelf(c)
            | Self::Modify(c)
            | Self::MoveSelf(c)
            | Self::Open(c) => Some(c),
            Self::Moved(_) => None,
        }
    }

    /// Check if this is a structural change (create/delete/rename)
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            Self::Create(_) | Self::Delete(_) | Self::DeleteSelf(_) | Self::Moved(_)
        )
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Moved(rename) => write!(
                f,
                "{:?} {} -> {}",
                self.kind(),
                rename.old_path.display(),
                rename.new_path.display()
            ),
            _ => write!(f, "{:?} {}", self.kind(), self.path().display()),
        }
    }
}
