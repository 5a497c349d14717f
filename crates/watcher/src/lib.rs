#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]

//! Filesystem change notification on top of inotify
//!
//! This crate turns the kernel's packed event stream into typed events:
//! - Decoding of variable-length records without reading past a short read
//! - Pairing of split rename records into a single `Moved` event
//! - A readiness-driven read/dispatch loop on the tokio reactor
//! - Ordered fan-out of every batch to registered handlers
//!
//! Directories are not watched recursively; add each one explicitly.
//!
//! # Example
//!
//! ```no_run
//! use dirwatch_watcher::{Filter, Monitor};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let monitor = Monitor::new()?;
//! monitor.add("/tmp", &[Filter::All]).await?;
//!
//! let mut batches = monitor.subscribe()?;
//! monitor.watch()?;
//!
//! while let Some(batch) = batches.recv().await {
//!     for event in batch {
//!         println!("{event}");
//!     }
//! }
//! # Ok(())
//! # }
//! ```

// Private implementation modules
mod classifier;
mod correlator;
mod decoder;
mod events;
mod monitor;
mod source;
mod watch_table;

#[cfg(test)]
mod testing;

// Public exports - minimal API surface
pub use classifier::Classifier;
pub use correlator::MoveCorrelator;
pub use decoder::{DecodedBatch, EventDecoder, RawEvent};
pub use dirwatch_core::{Error, EventMask, Filter, MonitorConfig, Result, WatchHandle};
pub use events::{Change, Event, EventKind, Rename};
pub use monitor::{EventHandler, LoopState, Monitor, MonitorHandle};
pub use source::{EventSource, Inotify};
pub use watch_table::WatchTable;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::events::{Event, EventKind};
    pub use crate::monitor::{EventHandler, Monitor};
    pub use dirwatch_core::Filter;
}
