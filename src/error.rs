//! Error taxonomy shared by cursors, streams, storage providers and units.
//!
//! Stream types implement the `std::io` traits, so their failures travel as
//! [`std::io::Error`]. The crate [`Error`] rides inside those as the payload and
//! can be recovered with `Error::from(io_error)` without losing its [`ErrorKind`].

use std::fmt;
use std::io;

/// Classification of a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A read ran out of data. Not a fault for the caller.
    EndOfData,
    /// A write was rejected because it could not be satisfied in full.
    IoFault,
    /// The operation is not supported by this instance (read-only, fixed length, ...).
    InvalidOperation,
    /// A path that had to exist does not.
    NotFound,
    /// Input text or bytes do not follow the expected format.
    Malformed,
    /// The object is in a state where the call is meaningless.
    InvalidState,
    /// Any other failure reported by the OS layer.
    Io,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::EndOfData => "end of data",
            Self::IoFault => "I/O fault",
            Self::InvalidOperation => "invalid operation",
            Self::NotFound => "not found",
            Self::Malformed => "malformed input",
            Self::InvalidState => "invalid state",
            Self::Io => "I/O error",
        };
        f.write_str(s)
    }
}

#[derive(Debug, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct Error {
    pub kind: ErrorKind,
    pub message: String,
    /// Character or byte position the error refers to, when there is one.
    pub position: Option<usize>,
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            position: None,
        }
    }

    #[must_use]
    pub fn at(mut self, position: usize) -> Self {
        self.position = Some(position);
        self
    }

    pub fn end_of_data(needed: usize, available: usize) -> Self {
        Self::new(
            ErrorKind::EndOfData,
            format!("needed {needed} element(s), {available} available"),
        )
    }

    pub fn io_fault(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::IoFault, message)
    }

    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidOperation, message)
    }

    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidState, message)
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Malformed, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    fn io_kind(&self) -> io::ErrorKind {
        match self.kind {
            ErrorKind::EndOfData => io::ErrorKind::UnexpectedEof,
            ErrorKind::IoFault => io::ErrorKind::WriteZero,
            ErrorKind::InvalidOperation => io::ErrorKind::Unsupported,
            ErrorKind::NotFound => io::ErrorKind::NotFound,
            ErrorKind::Malformed => io::ErrorKind::InvalidData,
            ErrorKind::InvalidState | ErrorKind::Io => io::ErrorKind::Other,
        }
    }
}

impl From<Error> for io::Error {
    fn from(err: Error) -> Self {
        let kind = err.io_kind();
        io::Error::new(kind, err)
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        let kind = err.kind();
        // Our own payload round-trips unchanged.
        let err = match err.into_inner() {
            Some(inner) => match inner.downcast::<Error>() {
                Ok(ours) => return *ours,
                Err(other) => io::Error::new(kind, other),
            },
            None => io::Error::from(kind),
        };
        let mapped = match kind {
            io::ErrorKind::NotFound => ErrorKind::NotFound,
            io::ErrorKind::UnexpectedEof => ErrorKind::EndOfData,
            io::ErrorKind::WriteZero => ErrorKind::IoFault,
            io::ErrorKind::Unsupported => ErrorKind::InvalidOperation,
            io::ErrorKind::InvalidData => ErrorKind::Malformed,
            _ => ErrorKind::Io,
        };
        Error::new(mapped, err.to_string())
    }
}
