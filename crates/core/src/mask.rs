//! Kernel event masks, the filter vocabulary, and watch handles
//!
//! Bit values come straight from `libc` so they always match the inotify ABI
//! of the target platform.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::fmt;
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

bitflags! {
    /// Bit set carried in the `mask` field of a kernel event record
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct EventMask: u32 {
        const ACCESS = libc::IN_ACCESS;
        const MODIFY = libc::IN_MODIFY;
        const ATTRIB = libc::IN_ATTRIB;
        const CLOSE_WRITE = libc::IN_CLOSE_WRITE;
        const CLOSE_NOWRITE = libc::IN_CLOSE_NOWRITE;
        const OPEN = libc::IN_OPEN;
        const MOVED_FROM = libc::IN_MOVED_FROM;
        const MOVED_TO = libc::IN_MOVED_TO;
        const CREATE = libc::IN_CREATE;
        const DELETE = libc::IN_DELETE;
        const DELETE_SELF = libc::IN_DELETE_SELF;
        const MOVE_SELF = libc::IN_MOVE_SELF;

        // Only ever set by the kernel on delivered records
        const UNMOUNT = libc::IN_UNMOUNT;
        const Q_OVERFLOW = libc::IN_Q_OVERFLOW;
        const IGNORED = libc::IN_IGNORED;
        const ISDIR = libc::IN_ISDIR;
    }
}

impl EventMask {
    /// Both halves of a rename
    pub const MOVE: Self = Self::MOVED_FROM.union(Self::MOVED_TO);

    /// Every event kind a watch can subscribe to
    pub const ALL_EVENTS: Self = Self::from_bits_retain(libc::IN_ALL_EVENTS);
}

/// Event kinds a caller can subscribe to when adding a watch
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Filter {
    Access,
    Attrib,
    CloseWrite,
    CloseNoWrite,
    Create,
    Delete,
    DeleteSelf,
    Modify,
    MoveSelf,
    /// Both `moved_from` and `moved_to`
    Moved,
    Open,
    /// Every kind above
    All,
}

impl Filter {
    /// Kernel mask bits for this filter
    pub fn mask(self) -> EventMask {
        match self {
            Self::Access => EventMask::ACCESS,
            Self::Attrib => EventMask::ATTRIB,
            Self::CloseWrite => EventMask::CLOSE_WRITE,
            Self::CloseNoWrite => EventMask::CLOSE_NOWRITE,
            Self::Create => EventMask::CREATE,
            Self::Delete => EventMask::DELETE,
            Self::DeleteSelf => EventMask::DELETE_SELF,
            Self::Modify => EventMask::MODIFY,
            Self::MoveSelf => EventMask::MOVE_SELF,
            Self::Moved => EventMask::MOVE,
            Self::Open => EventMask::OPEN,
            Self::All => EventMask::ALL_EVENTS,
        }
    }

    /// OR together the masks of every filter in the set
    pub fn combine(filters: &[Filter]) -> EventMask {
        filters
            .iter()
            .fold(EventMask::empty(), |mask, filter| mask | filter.mask())
    }

    /// Names accepted in configuration files
    pub fn names() -> Vec<String> {
        Self::iter().map(|f| f.to_string()).collect()
    }
}

/// Opaque identifier the kernel returns for a registered watch
///
/// Values may be recycled once a watch is removed, so a handle is only
/// meaningful while its watch is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WatchHandle(i32);

impl WatchHandle {
    /// Wrap a raw watch descriptor
    pub const fn from_raw(raw: i32) -> Self {
        Self(raw)
    }

    /// The raw watch descriptor
    pub const fn as_raw(self) -> i32 {
        self.0
    }
}

impl fmt::Display for WatchHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "wd{}", self.0)
    }
}
