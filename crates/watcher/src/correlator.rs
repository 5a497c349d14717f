//! Pairing of the two halves of a rename within one batch

use dirwatch_core::WatchHandle;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::ffi::OsString;

#[derive(Debug, Clone, PartialEq, Eq)]
struct PendingMove {
    cookie: u32,
    handle: WatchHandle,
    name: OsString,
}

/// Batch-scoped lookup from correlation token to a pending "moved-from"
///
/// Every stashed half gets an arrival number. Tokens map to their arrival
/// numbers oldest first, and unmatched halves drain in arrival order.
#[derive(Debug, Default)]
pub struct MoveCorrelator {
    pending: BTreeMap<u64, PendingMove>,
    by_cookie: HashMap<u32, VecDeque<u64>>,
    next_seq: u64,
}

impl MoveCorrelator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remember the source half of a rename
    pub fn stash(&mut self, cookie: u32, handle: WatchHandle, name: OsString) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.pending.insert(
            seq,
            PendingMove {
                cookie,
                handle,
                name,
            },
        );
        self.by_cookie.entry(cookie).or_default().push_back(seq);
    }

    /// Claim the oldest pending source half carrying `cookie`
    pub fn take(&mut self, cookie: u32) -> Option<(WatchHandle, OsString)> {
        let waiting = self.by_cookie.get_mut(&cookie)?;
        let seq = waiting.pop_front()?;
        if waiting.is_empty() {
            self.by_cookie.remove(&cookie);
        }

        let pending = self.pending.remove(&seq)?;
        debug_assert_eq!(pending.cookie, cookie);
        Some((pending.handle, pending.name))
    }

    /// Empty the correlator, returning every unmatched source half in arrival order
    pub fn drain(&mut self) -> Vec<(WatchHandle, OsString)> {
        self.by_cookie.clear();
        self.next_seq = 0;
        std::mem::take(&mut self.pending)
            .into_values()
            .map(|p| (p.handle, p.name))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
