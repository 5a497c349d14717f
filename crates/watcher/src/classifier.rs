//! Turning raw kernel records into classified events
//!
//! Records are processed in stream order. A "moved-from" is held back until
//! its "moved-to" arrives in the same batch and the pair becomes one
//! [`Event::Moved`]. At the end of the batch any "moved-from" still waiting
//! left the watched locations and becomes a [`Event::Delete`]. A "moved-to"
//! with no waiting partner came from outside and becomes a [`Event::Create`].

use crate::correlator::MoveCorrelator;
use crate::decoder::RawEvent;
use crate::events::{Change, Event, Rename};
use crate::watch_table::WatchTable;
use dirwatch_core::{EventMask, WatchHandle};
use std::ffi::OsString;
use std::path::PathBuf;
use tracing::{debug, trace, warn};

/// First matching bit wins when a record carries more than one kind
const KIND_PRIORITY: [(EventMask, fn(Change) -> Event); 10] = [
    (EventMask::ACCESS, Event::Access),
    (EventMask::ATTRIB, Event::Attrib),
    (EventMask::CLOSE_WRITE, Event::CloseWrite),
    (EventMask::CLOSE_NOWRITE, Event::CloseNoWrite),
    (EventMask::CREATE, Event::Create),
    (EventMask::DELETE, Event::Delete),
    (EventMask::DELETE_SELF, Event::DeleteSelf),
    (EventMask::MODIFY, Event::Modify),
    (EventMask::MOVE_SELF, Event::MoveSelf),
    (EventMask::OPEN, Event::Open),
];

/// Classifies records and correlates renames, one batch at a time
#[derive(Debug, Default)]
pub struct Classifier {
    correlator: MoveCorrelator,
}

impl Classifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Classify one batch of records
    ///
    /// Synthesized deletes for unmatched renames come after every other event.
    /// The correlator is always empty when this returns.
    pub fn classify_batch(&mut self, table: &mut WatchTable, records: Vec<RawEvent>) -> Vec<Event> {
        let mut events = Vec::with_capacity(records.len());
        let mut ignored = Vec::new();

        for record in records {
            trace!(
                "Record {} mask {:#x} cookie {} name {:?}",
                record.handle,
                record.mask.bits(),
                record.cookie,
                record.name
            );
            let mask = record.mask;
            let name = record.name.unwrap_or_default();

            if mask.contains(EventMask::Q_OVERFLOW) {
                warn!("Kernel event queue overflowed, some events were lost");
            } else if mask.contains(EventMask::IGNORED) {
                // Later records in this batch may still refer to the handle
                ignored.push(record.handle);
            } else if mask.contains(EventMask::MOVED_FROM) {
                self.correlator.stash(record.cookie, record.handle, name);
            } else if mask.contains(EventMask::MOVED_TO) {
                events.extend(self.moved_to(table, record.handle, record.cookie, name));
            } else if let Some(event) = classify(table, record.handle, mask, name) {
                events.push(event);
            }
        }

        for (handle, name) in self.correlator.drain() {
            match table.resolve(handle, &name) {
                Some(fullname) => events.push(Event::Delete(Change::new(fullname, name))),
                None => warn!("Dropping moved-from for unknown watch {handle}"),
            }
        }

        for handle in ignored {
            table.forget(handle);
        }

        events
    }

    fn moved_to(
        &mut self,
        table: &WatchTable,
        handle: WatchHandle,
        cookie: u32,
        name: OsString,
    ) -> Option<Event> {
        // A waiting source half stays pending and drains as a trailing delete
        let Some(new_path) = table.resolve(handle, &name) else {
            warn!("Dropping moved-to for unknown watch {handle}");
            return None;
        };

        let Some((from_handle, from_name)) = self.correlator.take(cookie) else {
            // Renamed in from outside every watched location
            return Some(Event::Create(Change::new(new_path, name)));
        };

        match table.resolve(from_handle, &from_name) {
            Some(old_path) => Some(Event::Moved(Rename {
                old_path,
                new_path,
                name: PathBuf::from(name),
            })),
            None => {
                debug!("Moved-from on unknown watch {from_handle}, treating rename as create");
                Some(Event::Create(Change::new(new_path, name)))
            }
        }
    }
}

fn classify(table: &WatchTable, handle: WatchHandle, mask: EventMask, name: OsString) -> Option<Event> {
    let Some(&(_, build)) = KIND_PRIORITY.iter().find(|(bit, _)| mask.contains(*bit)) else {
        trace!("Ignoring record with no event kind (mask {:#x})", mask.bits());
        return None;
    };

    match table.resolve(handle, &name) {
        Some(fullname) => Some(build(Change::new(fullname, name))),
        None => {
            warn!("Dropping event for unknown watch {handle}");
            None
        }
    }
}
