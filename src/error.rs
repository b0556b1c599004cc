//! Protocol error types.

use thiserror::Error;

/// Errors raised by the transport and codec layers.
///
/// Transport failures (end of stream, frame corruption, varint overflow)
/// leave the byte stream in an unknown position and must surface to the
/// caller, which owns reconnect policy. Type and literal errors are scoped
/// to the current request or statement and do not poison the connection.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("end of stream while reading {context}")]
    EndOfStream { context: &'static str },

    #[error("frame checksum mismatch: expected {expected:#034x}, got {actual:#034x}")]
    ChecksumMismatch { expected: u128, actual: u128 },

    #[error("decompressed size mismatch: frame header says {expected} bytes, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },

    #[error("unknown compression method byte: {0:#04x}")]
    InvalidCompressionMethod(u8),

    #[error("invalid frame header: {0}")]
    InvalidFrameHeader(String),

    #[error("frame too large: {size} bytes (max {max})")]
    FrameTooLarge { size: usize, max: usize },

    #[error("decompression failed: {0}")]
    Decompress(String),

    #[error("malformed varint: no terminator within 10 bytes")]
    VarintOverflow,

    #[error("buffered read of {requested} bytes exceeds capacity {capacity}")]
    ReadTooLarge { requested: usize, capacity: usize },

    #[error("unsupported type name: {0}")]
    UnsupportedType(String),

    #[error("type mismatch: {type_name} cannot encode a {value_kind} value")]
    TypeMismatch {
        type_name: String,
        value_kind: &'static str,
    },

    #[error("value does not fit {type_name}: {reason}")]
    ValueOutOfRange { type_name: String, reason: String },

    #[error("invalid literal for {expected}: {found:?}")]
    LiteralFormat { expected: String, found: String },

    #[error("corrupt column data: {0}")]
    CorruptColumn(String),

    #[error("column {column} has {actual} rows, block has {expected}")]
    ColumnLengthMismatch {
        column: String,
        expected: usize,
        actual: usize,
    },

    #[error("invalid UTF-8 in string payload")]
    InvalidUtf8,
}

impl ProtocolError {
    /// Returns whether the connection must be discarded after this error.
    ///
    /// After a transport failure the stream position no longer lines up with
    /// message boundaries, so no further read can be trusted.
    pub fn is_connection_fatal(&self) -> bool {
        matches!(
            self,
            ProtocolError::Io(_)
                | ProtocolError::EndOfStream { .. }
                | ProtocolError::ChecksumMismatch { .. }
                | ProtocolError::SizeMismatch { .. }
                | ProtocolError::InvalidCompressionMethod(_)
                | ProtocolError::InvalidFrameHeader(_)
                | ProtocolError::FrameTooLarge { .. }
                | ProtocolError::Decompress(_)
                | ProtocolError::VarintOverflow
                | ProtocolError::CorruptColumn(_)
        )
    }
}
