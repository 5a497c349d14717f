//! Kernel watch interface and readiness reactor
//!
//! [`EventSource`] is the seam between the monitor and the operating system.
//! [`Inotify`] is the production implementation. Registration goes through
//! the `inotify` crate; reads go through a duplicate of the same descriptor
//! registered with the tokio reactor, so the monitor only reads when the
//! kernel reports data and the decoder sees the kernel's bytes untouched.

use async_trait::async_trait;
use dirwatch_core::{EventMask, WatchHandle};
use inotify::{WatchDescriptor, WatchMask};
use std::collections::HashMap;
use std::fs::File;
use std::io::{self, Read};
use std::os::fd::AsFd;
use std::path::Path;
use tokio::io::unix::AsyncFd;
use tokio::io::Interest;
use tracing::trace;

/// Registration primitives plus a readiness-driven read
#[async_trait]
pub trait EventSource: Send + 'static {
    /// Register `path` for the kinds in `mask`
    fn add_watch(&mut self, path: &Path, mask: EventMask) -> io::Result<WatchHandle>;

    /// Drop a registration
    fn remove_watch(&mut self, handle: WatchHandle) -> io::Result<()>;

    /// Wait until the descriptor is readable, then perform exactly one read
    ///
    /// Must be cancel-safe: dropping the future before it resolves loses no
    /// data.
    async fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;
}

/// An inotify instance registered with the tokio reactor
#[derive(Debug)]
pub struct Inotify {
    inner: inotify::Inotify,
    reader: AsyncFd<File>,
    descriptors: HashMap<WatchHandle, WatchDescriptor>,
}

impl Inotify {
    /// Open a non-blocking inotify descriptor
    ///
    /// Must be called from within a tokio runtime.
    pub fn init() -> io::Result<Self> {
        let inner = inotify::Inotify::init()?;
        // Shares the open file description, including O_NONBLOCK
        let reader = File::from(inner.as_fd().try_clone_to_owned()?);
        let reader = AsyncFd::with_interest(reader, Interest::READABLE)?;
        Ok(Self {
            inner,
            reader,
            descriptors: HashMap::new(),
        })
    }
}

#[async_trait]
impl EventSource for Inotify {
    fn add_watch(&mut self, path: &Path, mask: EventMask) -> io::Result<WatchHandle> {
        let descriptor = self
            .inner
            .watches()
            .add(path, WatchMask::from_bits_truncate(mask.bits()))?;
        let handle = WatchHandle::from_raw(descriptor.get_watch_descriptor_id());
        self.descriptors.insert(handle, descriptor);
        Ok(handle)
    }

    fn remove_watch(&mut self, handle: WatchHandle) -> io::Result<()> {
        let descriptor = self
            .descriptors
            .remove(&handle)
            .ok_or_else(|| io::Error::from_raw_os_error(libc::EINVAL))?;
        self.inner.watches().remove(descriptor)
    }

    async fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        loop {
            let mut guard = self.reader.readable().await?;
            let result = guard.try_io(|inner| {
                let mut file: &File = inner.get_ref();
                file.read(buf)
            });

            match result {
                Ok(read) => return read,
                Err(_would_block) => {
                    trace!("Spurious readiness on inotify descriptor");
                    continue;
                }
            }
        }
    }
}
