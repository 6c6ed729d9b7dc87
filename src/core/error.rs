use std::fmt;

/// Flat error taxonomy shared by every component (spec.md §7). Kept as one
/// closed enum rather than per-module error types, matching the teacher's
/// `core::error` style.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// File header/version mismatch, checksum failure, reference to a
    /// missing sub-file.
    CorruptIndex,
    /// Underlying directory operation failed.
    Io,
    /// Another writer holds the directory lock.
    LockObtainTimeout,
    /// A reader's referenced files have been deleted.
    StaleReader,
    /// Use-after-close on writer/reader.
    AlreadyClosed,
    /// Out-of-range parameter.
    IllegalArgument,
    /// Mutation attempted on a read-only view.
    UnsupportedOperation,
    /// Merge cancelled by writer close/rollback; never surfaced to the
    /// caller directly, only used internally to unwind a merge thread.
    MergeAborted,
    /// DocId outside `[0, maxDoc)` or bit index outside `[0, size)`.
    OutOfBounds,
    /// Malformed structured input (query string, config value, etc).
    Parse,
    /// Lookup miss where the caller expects the item to exist.
    NotFound,
    /// Unclassified internal invariant violation.
    Internal,
}

#[derive(Debug)]
pub struct Error {
    pub kind: ErrorKind,
    pub context: String,
}

impl Error {
    pub fn new(kind: ErrorKind, context: String) -> Self {
        Error { kind, context }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.context)
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error {
            kind: ErrorKind::Io,
            context: err.to_string(),
        }
    }
}

impl From<bincode::Error> for Error {
    fn from(err: bincode::Error) -> Self {
        Error {
            kind: ErrorKind::Parse,
            context: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
