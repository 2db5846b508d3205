//! Error types for storage operations.
//!
//! Every fallible operation in tidelog returns [`StorageResult`]. Success is
//! `Ok(..)`; failures carry one of a fixed set of kinds plus an owned,
//! human-readable message.

use std::fmt;
use std::io;
use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// The kind of a [`StorageError`], without its message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusKind {
    /// A file or entry does not exist.
    NotFound,
    /// Stored data failed validation.
    Corruption,
    /// The operation is not implemented by this backend.
    NotSupported,
    /// The caller supplied an invalid argument.
    InvalidArgument,
    /// The operating system reported an I/O failure.
    Io,
}

/// Errors that can occur during storage operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    /// A file or entry does not exist.
    #[error("NotFound: {0}")]
    NotFound(String),

    /// Stored data failed validation. Raised by the decode side only.
    #[error("Corruption: {0}")]
    Corruption(String),

    /// The operation is not implemented.
    #[error("Not implemented: {0}")]
    NotSupported(String),

    /// The caller supplied an invalid argument.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// An I/O error occurred.
    #[error("IO error: {0}")]
    Io(String),
}

impl StorageError {
    /// Creates an error of the given kind from one or two message fragments.
    ///
    /// When both fragments are present the message is `"{msg}: {msg2}"`.
    pub fn new(kind: StatusKind, msg: impl fmt::Display, msg2: Option<&str>) -> Self {
        let message = match msg2 {
            Some(extra) if !extra.is_empty() => format!("{msg}: {extra}"),
            _ => msg.to_string(),
        };
        match kind {
            StatusKind::NotFound => Self::NotFound(message),
            StatusKind::Corruption => Self::Corruption(message),
            StatusKind::NotSupported => Self::NotSupported(message),
            StatusKind::InvalidArgument => Self::InvalidArgument(message),
            StatusKind::Io => Self::Io(message),
        }
    }

    /// Creates a `NotFound` error.
    pub fn not_found(msg: impl fmt::Display) -> Self {
        Self::new(StatusKind::NotFound, msg, None)
    }

    /// Creates a `Corruption` error.
    pub fn corruption(msg: impl fmt::Display) -> Self {
        Self::new(StatusKind::Corruption, msg, None)
    }

    /// Creates a `NotSupported` error.
    pub fn not_supported(msg: impl fmt::Display) -> Self {
        Self::new(StatusKind::NotSupported, msg, None)
    }

    /// Creates an `InvalidArgument` error.
    pub fn invalid_argument(msg: impl fmt::Display) -> Self {
        Self::new(StatusKind::InvalidArgument, msg, None)
    }

    /// Creates an `Io` error.
    pub fn io_error(msg: impl fmt::Display) -> Self {
        Self::new(StatusKind::Io, msg, None)
    }

    /// Converts an OS error into a storage error.
    ///
    /// `context` is usually the path of the file involved. A missing file
    /// maps to `NotFound`; every other failure maps to `Io`.
    pub fn from_io(context: impl fmt::Display, err: &io::Error) -> Self {
        let detail = err.to_string();
        let kind = if err.kind() == io::ErrorKind::NotFound {
            StatusKind::NotFound
        } else {
            StatusKind::Io
        };
        Self::new(kind, context, Some(&detail))
    }

    /// Returns the kind of this error.
    #[must_use]
    pub fn kind(&self) -> StatusKind {
        match self {
            Self::NotFound(_) => StatusKind::NotFound,
            Self::Corruption(_) => StatusKind::Corruption,
            Self::NotSupported(_) => StatusKind::NotSupported,
            Self::InvalidArgument(_) => StatusKind::InvalidArgument,
            Self::Io(_) => StatusKind::Io,
        }
    }

    /// Returns the message without the kind prefix.
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::NotFound(m)
            | Self::Corruption(m)
            | Self::NotSupported(m)
            | Self::InvalidArgument(m)
            | Self::Io(m) => m,
        }
    }

    /// Returns true if this is a `NotFound` error.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.kind() == StatusKind::NotFound
    }

    /// Returns true if this is a `Corruption` error.
    #[must_use]
    pub fn is_corruption(&self) -> bool {
        self.kind() == StatusKind::Corruption
    }

    /// Returns true if this is a `NotSupported` error.
    #[must_use]
    pub fn is_not_supported(&self) -> bool {
        self.kind() == StatusKind::NotSupported
    }

    /// Returns true if this is an `InvalidArgument` error.
    #[must_use]
    pub fn is_invalid_argument(&self) -> bool {
        self.kind() == StatusKind::InvalidArgument
    }

    /// Returns true if this is an `Io` error.
    #[must_use]
    pub fn is_io_error(&self) -> bool {
        self.kind() == StatusKind::Io
    }
}
