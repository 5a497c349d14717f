//! Core types for the dirwatch filesystem notification layer
//!
//! This crate provides the foundational pieces shared by the watcher:
//!
//! - **Masks**: kernel event bits, the filter vocabulary, and watch handles
//! - **Configuration**: monitor settings loaded from TOML and the environment
//! - **Error handling**: unified error types
//!

#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]

pub mod config;
pub mod error;
pub mod mask;

// Re-export main types for convenience
pub use config::{Config, MonitorConfig, MonitorConfigBuilder};
pub use error::{Error, Result, ResultExt};
pub use mask::{EventMask, Filter, WatchHandle};

/// Version of the core library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::{Config, MonitorConfig};
    pub use crate::error::{Result, ResultExt};
    pub use crate::mask::{Filter, WatchHandle};
}
