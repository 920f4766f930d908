// SPDX-License-Identifier: MIT
//! Error types for stream, codec and conversion operations.

use thiserror::Error;

/// Result type used across the crate
pub type Result<T> = std::result::Result<T, StreamError>;

/// Coarse classification of a [`StreamError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidArgument,
    OutOfRange,
    Disposed,
    EndOfStream,
    Format,
    InvalidOperation,
    Conversion,
    Config,
    Io,
}

/// Errors raised by views, backends, readers and writers
#[derive(Debug, Error)]
pub enum StreamError {
    #[error("Invalid argument '{name}': {message}")]
    InvalidArgument { name: &'static str, message: String },

    #[error("Value out of range for '{name}': {message}")]
    OutOfRange { name: &'static str, message: String },

    #[error("Cannot access a disposed stream")]
    Disposed,

    #[error("End of stream: requested {requested} bytes, {available} available")]
    EndOfStream { requested: u64, available: u64 },

    #[error("Unsupported data type: {0}")]
    UnsupportedType(String),

    #[error("Unsupported endianness: {0}")]
    UnsupportedEndianness(String),

    #[error("Unsupported text encoding: {0}")]
    UnsupportedEncoding(String),

    #[error("Type mismatch: expected {expected}, got {actual}")]
    TypeMismatch { expected: String, actual: String },

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Conversion error: {0}")]
    Conversion(#[from] ConversionError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StreamError {
    pub(crate) fn invalid_argument(name: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            name,
            message: message.into(),
        }
    }

    pub(crate) fn out_of_range(name: &'static str, message: impl Into<String>) -> Self {
        Self::OutOfRange {
            name,
            message: message.into(),
        }
    }

    pub(crate) fn end_of_stream(requested: u64, available: u64) -> Self {
        Self::EndOfStream {
            requested,
            available,
        }
    }

    /// Taxonomy class of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            StreamError::InvalidArgument { .. } => ErrorKind::InvalidArgument,
            StreamError::OutOfRange { .. } => ErrorKind::OutOfRange,
            StreamError::Disposed => ErrorKind::Disposed,
            StreamError::EndOfStream { .. } => ErrorKind::EndOfStream,
            StreamError::UnsupportedType(_)
            | StreamError::UnsupportedEndianness(_)
            | StreamError::UnsupportedEncoding(_)
            | StreamError::TypeMismatch { .. } => ErrorKind::Format,
            StreamError::InvalidOperation(_) => ErrorKind::InvalidOperation,
            StreamError::Conversion(_) => ErrorKind::Conversion,
            StreamError::Config(_) => ErrorKind::Config,
            StreamError::Io(_) => ErrorKind::Io,
        }
    }
}

impl From<StreamError> for std::io::Error {
    fn from(err: StreamError) -> Self {
        use std::io::ErrorKind as IoKind;

        let kind = match &err {
            StreamError::Io(inner) => return std::io::Error::new(inner.kind(), err),
            StreamError::EndOfStream { .. } => IoKind::UnexpectedEof,
            StreamError::InvalidArgument { .. } | StreamError::OutOfRange { .. } => {
                IoKind::InvalidInput
            }
            StreamError::UnsupportedType(_)
            | StreamError::UnsupportedEndianness(_)
            | StreamError::UnsupportedEncoding(_)
            | StreamError::TypeMismatch { .. } => IoKind::InvalidData,
            StreamError::Disposed
            | StreamError::InvalidOperation(_)
            | StreamError::Conversion(_)
            | StreamError::Config(_) => IoKind::Other,
        };
        std::io::Error::new(kind, err)
    }
}

/// Errors raised by the format converter collaborator
#[derive(Debug, Error)]
pub enum ConversionError {
    #[error("No converter registered from {source_type} to {destination_type}")]
    NoImplementation {
        source_type: &'static str,
        destination_type: &'static str,
    },

    #[error("Converter {converter} expected {expected}, got {actual}")]
    TypeMismatch {
        converter: &'static str,
        expected: &'static str,
        actual: &'static str,
    },

    #[error("Failed to construct converter {converter}: {message}")]
    Construction {
        converter: &'static str,
        message: String,
    },

    #[error("Converter {converter} failed: {source}")]
    Failed {
        converter: &'static str,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}
