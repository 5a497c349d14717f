//! The monitor and its readiness-driven watch loop
//!
//! A [`Monitor`] spawns one task that owns the event source, the watch table,
//! the classifier, the handler list and the read buffer. Nothing else touches
//! that state; callers reach it through [`MonitorHandle`] commands. The loop
//! is either `Idle` (no read outstanding) or `Awaiting` (waiting on the
//! reactor for one read). After each delivered batch it re-arms unless it has
//! been cancelled.

use crate::classifier::Classifier;
use crate::decoder::EventDecoder;
use crate::events::Event;
use crate::source::{EventSource, Inotify};
use crate::watch_table::WatchTable;
use dirwatch_core::config::MonitorConfig;
use dirwatch_core::error::{Error, Result};
use dirwatch_core::{Filter, WatchHandle};
use std::io;
use std::path::{Path, PathBuf};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Receives every classified batch, in order
///
/// Handlers run inline on the monitor task. A slow handler delays the next
/// read, so long-running work belongs on another task.
pub trait EventHandler: Send + 'static {
    /// Called once per non-empty batch
    fn handle(&mut self, batch: &[Event]);

    /// Called after a batch whose tail could not be decoded
    fn malformed(&mut self, error: &Error) {
        let _ = error;
    }
}

impl<F> EventHandler for F
where
    F: FnMut(&[Event]) + Send + 'static,
{
    fn handle(&mut self, batch: &[Event]) {
        self(batch)
    }
}

/// Forwards batches to a channel returned by [`MonitorHandle::subscribe`]
struct ChannelHandler(mpsc::UnboundedSender<Vec<Event>>);

impl EventHandler for ChannelHandler {
    fn handle(&mut self, batch: &[Event]) {
        if self.0.send(batch.to_vec()).is_err() {
            debug!("Subscriber dropped, discarding batch");
        }
    }
}

/// Observable state of the watch loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    /// No read outstanding
    Idle,
    /// Waiting for the reactor to report the descriptor readable
    Awaiting,
    /// The loop has exited and accepts no further commands
    Stopped,
}

enum Command {
    Add {
        path: PathBuf,
        filters: Option<Vec<Filter>>,
        reply: oneshot::Sender<Result<WatchHandle>>,
    },
    Remove {
        handle: WatchHandle,
        reply: oneshot::Sender<Result<()>>,
    },
    Register(Box<dyn EventHandler>),
    Watch,
    Watches {
        reply: oneshot::Sender<Vec<(WatchHandle, PathBuf)>>,
    },
}

/// Cloneable access to a running monitor
///
/// Safe to use from inside an [`EventHandler`]; commands sent there take
/// effect after the current batch has been delivered.
#[derive(Debug, Clone)]
pub struct MonitorHandle {
    commands: mpsc::UnboundedSender<Command>,
}

impl MonitorHandle {
    fn send(&self, command: Command) -> Result<()> {
        self.commands.send(command).map_err(|_| Error::Stopped)
    }

    async fn request<T>(&self, command: Command, reply: oneshot::Receiver<T>) -> Result<T> {
        self.send(command)?;
        reply.await.map_err(|_| Error::Stopped)
    }

    /// Watch `path` for the given filters
    pub async fn add(&self, path: impl AsRef<Path>, filters: &[Filter]) -> Result<WatchHandle> {
        let (reply, rx) = oneshot::channel();
        let command = Command::Add {
            path: path.as_ref().to_path_buf(),
            filters: Some(filters.to_vec()),
            reply,
        };
        self.request(command, rx).await?
    }

    /// Watch `path` with the configured default filters
    pub async fn add_default(&self, path: impl AsRef<Path>) -> Result<WatchHandle> {
        let (reply, rx) = oneshot::channel();
        let command = Command::Add {
            path: path.as_ref().to_path_buf(),
            filters: None,
            reply,
        };
        self.request(command, rx).await?
    }

    /// Stop watching the path behind `handle`
    pub async fn remove(&self, handle: WatchHandle) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.request(Command::Remove { handle, reply }, rx).await?
    }

    /// Append a handler; it receives batches delivered after registration
    pub fn register(&self, handler: impl EventHandler) -> Result<()> {
        self.send(Command::Register(Box::new(handler)))
    }

    /// Register a handler that forwards every batch to the returned receiver
    pub fn subscribe(&self) -> Result<mpsc::UnboundedReceiver<Vec<Event>>> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.register(ChannelHandler(tx))?;
        Ok(rx)
    }

    /// Start the continuous read/dispatch loop; returns immediately
    pub fn watch(&self) -> Result<()> {
        self.send(Command::Watch)
    }

    /// Currently watched paths, sorted by handle
    pub async fn watches(&self) -> Result<Vec<(WatchHandle, PathBuf)>> {
        let (reply, rx) = oneshot::channel();
        self.request(Command::Watches { reply }, rx).await
    }
}

/// Filesystem change monitor
///
/// Dropping the monitor cancels the loop, even while a read is pending.
#[derive(Debug)]
pub struct Monitor {
    handle: MonitorHandle,
    cancel: CancellationToken,
    state: watch::Receiver<LoopState>,
    task: Option<JoinHandle<Result<()>>>,
}

impl Monitor {
    /// Create a monitor backed by inotify with default configuration
    ///
    /// Must be called from within a tokio runtime.
    pub fn new() -> Result<Self> {
        Self::with_config(MonitorConfig::default())
    }

    /// Create a monitor backed by inotify
    pub fn with_config(config: MonitorConfig) -> Result<Self> {
        config.validate()?;
        let source = Inotify::init().map_err(|e| Error::os("init", e))?;
        Self::from_source(source, config)
    }

    /// Create a monitor over any event source
    pub fn from_source<S: EventSource>(source: S, config: MonitorConfig) -> Result<Self> {
        config.validate()?;

        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(LoopState::Idle);
        let cancel = CancellationToken::new();

        let watch_loop = WatchLoop {
            source,
            table: WatchTable::new(),
            classifier: Classifier::new(),
            handlers: Vec::new(),
            buffer: vec![0u8; config.buffer_size],
            config,
            commands: commands_rx,
            cancel: cancel.clone(),
            state: state_tx,
        };
        let task = tokio::spawn(watch_loop.run());

        Ok(Self {
            handle: MonitorHandle {
                commands: commands_tx,
            },
            cancel,
            state: state_rx,
            task: Some(task),
        })
    }

    /// A cloneable handle for use from other tasks or from handlers
    pub fn handle(&self) -> MonitorHandle {
        self.handle.clone()
    }

    /// Watch `path` for the given filters
    pub async fn add(&self, path: impl AsRef<Path>, filters: &[Filter]) -> Result<WatchHandle> {
        self.handle.add(path, filters).await
    }

    /// Watch `path` with the configured default filters
    pub async fn add_default(&self, path: impl AsRef<Path>) -> Result<WatchHandle> {
        self.handle.add_default(path).await
    }

    /// Stop watching the path behind `handle`
    pub async fn remove(&self, handle: WatchHandle) -> Result<()> {
        self.handle.remove(handle).await
    }

    /// Append a handler; it receives batches delivered after registration
    pub fn register(&self, handler: impl EventHandler) -> Result<()> {
        self.handle.register(handler)
    }

    /// Register a handler that forwards every batch to the returned receiver
    pub fn subscribe(&self) -> Result<mpsc::UnboundedReceiver<Vec<Event>>> {
        self.handle.subscribe()
    }

    /// Start the continuous read/dispatch loop; returns immediately
    pub fn watch(&self) -> Result<()> {
        self.handle.watch()
    }

    /// Currently watched paths, sorted by handle
    pub async fn watches(&self) -> Result<Vec<(WatchHandle, PathBuf)>> {
        self.handle.watches().await
    }

    /// Current loop state
    pub fn state(&self) -> LoopState {
        *self.state.borrow()
    }

    /// Wait for the loop to exit and return how it ended
    ///
    /// A fatal read failure is returned as an OS error. Subsequent calls
    /// return `Ok(())`.
    pub async fn join(&mut self) -> Result<()> {
        match self.task.take() {
            Some(task) => task
                .await
                .map_err(|e| Error::with_context("Monitor task failed", e))?,
            None => Ok(()),
        }
    }

    /// Cancel the loop, remove kernel watches and close the descriptor
    pub async fn shutdown(mut self) -> Result<()> {
        self.cancel.cancel();
        self.join().await
    }
}

impl Drop for Monitor {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

enum Step {
    Cancelled,
    Command(Option<Command>),
    Read(io::Result<usize>),
}

/// State owned by the monitor task
struct WatchLoop<S> {
    source: S,
    table: WatchTable,
    classifier: Classifier,
    handlers: Vec<Box<dyn EventHandler>>,
    buffer: Vec<u8>,
    config: MonitorConfig,
    commands: mpsc::UnboundedReceiver<Command>,
    cancel: CancellationToken,
    state: watch::Sender<LoopState>,
}

impl<S: EventSource> WatchLoop<S> {
    async fn run(mut self) -> Result<()> {
        debug!("Monitor loop started");

        let result = loop {
            let awaiting = *self.state.borrow() == LoopState::Awaiting;

            let step = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => Step::Cancelled,
                command = self.commands.recv() => Step::Command(command),
                read = self.source.read(&mut self.buffer), if awaiting => Step::Read(read),
            };

            match step {
                Step::Cancelled => break Ok(()),
                Step::Command(Some(command)) => self.apply(command),
                Step::Command(None) => break Ok(()),
                Step::Read(Ok(len)) => {
                    self.state.send_replace(LoopState::Idle);
                    self.dispatch(len);
                    if !self.cancel.is_cancelled() {
                        self.state.send_replace(LoopState::Awaiting);
                    }
                }
                Step::Read(Err(e)) => {
                    error!("Reading the watch descriptor failed: {e}");
                    break Err(Error::os("read", e));
                }
            }
        };

        self.state.send_replace(LoopState::Stopped);
        self.teardown();
        info!("Monitor stopped");
        result
    }

    fn apply(&mut self, command: Command) {
        match command {
            Command::Add {
                path,
                filters,
                reply,
            } => {
                let mask = match filters {
                    Some(filters) => Filter::combine(&filters),
                    None => Filter::combine(&self.config.default_filters),
                };
                let _ = reply.send(self.table.add(&mut self.source, &path, mask));
            }
            Command::Remove { handle, reply } => {
                let _ = reply.send(self.table.remove(&mut self.source, handle));
            }
            Command::Register(handler) => {
                self.handlers.push(handler);
                debug!("Registered handler #{}", self.handlers.len());
            }
            Command::Watch => {
                let idle = *self.state.borrow() == LoopState::Idle;
                if idle {
                    debug!("Arming watch loop");
                    self.state.send_replace(LoopState::Awaiting);
                }
            }
            Command::Watches { reply } => {
                let _ = reply.send(self.table.entries());
            }
        }
    }

    fn dispatch(&mut self, len: usize) {
        let decoded = EventDecoder::decode_all(&self.buffer[..len]);
        let records = decoded.records.len();
        let events = self.classifier.classify_batch(&mut self.table, decoded.records);
        debug!(
            "Read {len} bytes: {records} records, {} events",
            events.len()
        );

        if !events.is_empty() {
            for handler in &mut self.handlers {
                handler.handle(&events);
            }
        }

        if let Some(error) = decoded.error {
            warn!("Discarding rest of batch: {error}");
            for handler in &mut self.handlers {
                handler.malformed(&error);
            }
        }
    }

    fn teardown(&mut self) {
        if !self.config.teardown_watches {
            return;
        }
        for handle in self.table.handles() {
            if let Err(e) = self.table.remove(&mut self.source, handle) {
                debug!("Could not remove {handle} during shutdown: {e}");
            }
        }
    }
}
