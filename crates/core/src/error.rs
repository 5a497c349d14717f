use std::path::PathBuf;
use thiserror::Error;

/// Result type for dirwatch operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for dirwatch operations
#[derive(Error, Debug)]
pub enum Error {
    /// I/O errors that did not come from the kernel watch interface
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failure reported by the kernel watch interface (init, add, remove, read)
    #[error("{operation} failed{}: {source}", path_suffix(.path))]
    Os {
        operation: &'static str,
        path: Option<PathBuf>,
        #[source]
        source: std::io::Error,
    },

    /// A record declared more bytes than the read actually returned
    #[error(
        "Malformed event stream at offset {offset}: record needs {declared} bytes, {available} available"
    )]
    MalformedStream {
        offset: usize,
        declared: usize,
        available: usize,
    },

    /// Configuration related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// The watch loop has terminated and no longer accepts commands
    #[error("Monitor is stopped")]
    Stopped,

    /// Generic error with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Any other error
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

fn path_suffix(path: &Option<PathBuf>) -> String {
    match path {
        Some(path) => format!(" for {}", path.display()),
        None => String::new(),
    }
}

impl Error {
    /// Creates an OS-boundary error for an operation without a path
    pub fn os(operation: &'static str, source: std::io::Error) -> Self {
        Self::Os {
            operation,
            path: None,
            source,
        }
    }

    /// Creates an OS-boundary error for an operation on a path
    pub fn os_path(
        operation: &'static str,
        path: impl Into<PathBuf>,
        source: std::io::Error,
    ) -> Self {
        Self::Os {
            operation,
            path: Some(path.into()),
            source,
        }
    }

    /// Creates a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Adds context to any error
    pub fn with_context<E>(context: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::WithContext {
            context: context.into(),
            source: Box::new(source),
        }
    }

    /// Underlying errno for OS-boundary and I/O errors
    pub fn raw_os_error(&self) -> Option<i32> {
        match self {
            Self::Os { source, .. } => source.raw_os_error(),
            Self::Io(e) => e.raw_os_error(),
            _ => None,
        }
    }

    /// Whether this error came from the kernel watch interface
    pub fn is_os(&self) -> bool {
        matches!(self, Self::Os { .. })
    }
}

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| Error::with_context(context, e))
    }
}
