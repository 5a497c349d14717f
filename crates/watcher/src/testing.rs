//! Test doubles: a kernel record encoder and a scripted event source

use crate::decoder::RawEvent;
use crate::source::EventSource;
use async_trait::async_trait;
use dirwatch_core::config::EVENT_HEADER_SIZE;
use dirwatch_core::{EventMask, WatchHandle};
use std::collections::{HashMap, HashSet};
use std::ffi::OsString;
use std::io;
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

pub(crate) fn record(wd: i32, mask: EventMask, cookie: u32, name: Option<&str>) -> RawEvent {
    RawEvent {
        handle: WatchHandle::from_raw(wd),
        mask,
        cookie,
        name: name.map(OsString::from),
    }
}

/// Lay records out exactly like the kernel does, padding names to 16 bytes
pub(crate) fn encode(records: &[RawEvent]) -> Vec<u8> {
    let mut buf = Vec::new();
    for record in records {
        let name = record
            .name
            .as_ref()
            .map(|n| n.as_bytes().to_vec())
            .unwrap_or_default();
        let padded = if name.is_empty() {
            0
        } else {
            (name.len() + 1).div_ceil(EVENT_HEADER_SIZE) * EVENT_HEADER_SIZE
        };

        buf.extend_from_slice(&record.handle.as_raw().to_ne_bytes());
        buf.extend_from_slice(&record.mask.bits().to_ne_bytes());
        buf.extend_from_slice(&record.cookie.to_ne_bytes());
        buf.extend_from_slice(&(padded as u32).to_ne_bytes());
        buf.extend_from_slice(&name);
        buf.resize(buf.len() + padded - name.len(), 0);
    }
    buf
}

/// Kernel-side bookkeeping shared between a [`ScriptedSource`] and the test
#[derive(Debug, Default)]
pub(crate) struct ScriptState {
    pub existing: HashSet<PathBuf>,
    pub active: HashMap<WatchHandle, PathBuf>,
    pub removed: Vec<WatchHandle>,
    pub reads: usize,
    next_wd: i32,
}

/// In-memory stand-in for the kernel and reactor
///
/// Each item sent on the script channel is one readiness signal followed by
/// one read. When the script runs dry the source waits forever, like an idle
/// descriptor.
pub(crate) struct ScriptedSource {
    batches: mpsc::UnboundedReceiver<io::Result<Vec<u8>>>,
    state: Arc<Mutex<ScriptState>>,
}

/// Test-side controls for a [`ScriptedSource`]
#[derive(Clone)]
pub(crate) struct Script {
    batches: mpsc::UnboundedSender<io::Result<Vec<u8>>>,
    pub state: Arc<Mutex<ScriptState>>,
}

impl Script {
    pub fn push(&self, records: &[RawEvent]) {
        self.push_bytes(encode(records));
    }

    pub fn push_bytes(&self, bytes: Vec<u8>) {
        let _ = self.batches.send(Ok(bytes));
    }

    pub fn fail(&self, error: io::Error) {
        let _ = self.batches.send(Err(error));
    }

    pub fn reads(&self) -> usize {
        self.state.lock().unwrap().reads
    }
}

impl ScriptedSource {
    /// A source where each path in `existing` can be watched
    pub fn new<P: AsRef<Path>>(existing: &[P]) -> (Self, Script) {
        let (tx, rx) = mpsc::unbounded_channel();
        let state = Arc::new(Mutex::new(ScriptState {
            existing: existing.iter().map(|p| p.as_ref().to_path_buf()).collect(),
            next_wd: 1,
            ..Default::default()
        }));
        (
            Self {
                batches: rx,
                state: Arc::clone(&state),
            },
            Script { batches: tx, state },
        )
    }
}

#[async_trait]
impl EventSource for ScriptedSource {
    fn add_watch(&mut self, path: &Path, _mask: EventMask) -> io::Result<WatchHandle> {
        let mut state = self.state.lock().unwrap();
        if !state.existing.contains(path) {
            return Err(io::Error::from_raw_os_error(libc::ENOENT));
        }
        if let Some((handle, _)) = state.active.iter().find(|(_, p)| p.as_path() == path) {
            return Ok(*handle);
        }
        let handle = WatchHandle::from_raw(state.next_wd);
        state.next_wd += 1;
        state.active.insert(handle, path.to_path_buf());
        Ok(handle)
    }

    fn remove_watch(&mut self, handle: WatchHandle) -> io::Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.active.remove(&handle).is_none() {
            return Err(io::Error::from_raw_os_error(libc::EINVAL));
        }
        state.removed.push(handle);
        Ok(())
    }

    async fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.batches.recv().await {
            Some(Ok(bytes)) => {
                self.state.lock().unwrap().reads += 1;
                let n = bytes.len().min(buf.len());
                buf[..n].copy_from_slice(&bytes[..n]);
                Ok(n)
            }
            Some(Err(e)) => {
                self.state.lock().unwrap().reads += 1;
                Err(e)
            }
            None => std::future::pending().await,
        }
    }
}
