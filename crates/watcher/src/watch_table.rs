//! Mapping from kernel watch handles to the paths they represent

use crate::source::EventSource;
use dirwatch_core::error::{Error, Result};
use dirwatch_core::{EventMask, WatchHandle};
use std::collections::HashMap;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Active watches, owned exclusively by one monitor
#[derive(Debug, Default)]
pub struct WatchTable {
    paths: HashMap<WatchHandle, PathBuf>,
}

impl WatchTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `path` with the kernel and remember the handle
    ///
    /// Relative paths are made absolute against the current directory. The
    /// table is left untouched if the kernel rejects the path.
    pub fn add<S: EventSource + ?Sized>(
        &mut self,
        source: &mut S,
        path: &Path,
        mask: EventMask,
    ) -> Result<WatchHandle> {
        let path = std::path::absolute(path)?;
        let handle = source
            .add_watch(&path, mask)
            .map_err(|e| Error::os_path("add_watch", &path, e))?;

        info!("Watching {} as {handle} (mask {:#x})", path.display(), mask.bits());
        self.paths.insert(handle, path);
        Ok(handle)
    }

    /// Drop a registration with the kernel and forget its path
    pub fn remove<S: EventSource + ?Sized>(
        &mut self,
        source: &mut S,
        handle: WatchHandle,
    ) -> Result<()> {
        source
            .remove_watch(handle)
            .map_err(|e| Error::os("remove_watch", e))?;

        if let Some(path) = self.paths.remove(&handle) {
            info!("Stopped watching {} ({handle})", path.display());
        }
        Ok(())
    }

    /// Forget a handle the kernel has already dropped on its own
    pub fn forget(&mut self, handle: WatchHandle) -> Option<PathBuf> {
        let path = self.paths.remove(&handle);
        if let Some(path) = &path {
            debug!("Kernel removed watch {handle} for {}", path.display());
        }
        path
    }

    /// Absolute path for `name` under the watch, or the watch root for an empty name
    ///
    /// Returns `None` when the handle is unknown, which happens when a record
    /// for a watch arrives after the watch was removed.
    pub fn resolve(&self, handle: WatchHandle, name: &OsStr) -> Option<PathBuf> {
        let root = self.paths.get(&handle)?;
        if name.is_empty() {
            Some(root.clone())
        } else {
            Some(root.join(name))
        }
    }

    /// Root path of a watch
    pub fn path(&self, handle: WatchHandle) -> Option<&Path> {
        self.paths.get(&handle).map(PathBuf::as_path)
    }

    /// Current mappings sorted by handle
    pub fn entries(&self) -> Vec<(WatchHandle, PathBuf)> {
        let mut entries: Vec<_> = self
            .paths
            .iter()
            .map(|(handle, path)| (*handle, path.clone()))
            .collect();
        entries.sort_by_key(|(handle, _)| *handle);
        entries
    }

    pub fn handles(&self) -> Vec<WatchHandle> {
        self.entries().into_iter().map(|(handle, _)| handle).collect()
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}
