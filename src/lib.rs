//! # tabulon-protocol
//!
//! Client-side core of the Tabulon columnar database's native wire protocol.
//!
//! This crate provides:
//! - Buffered socket reading with exact-read semantics ([`BufferedSource`])
//! - Checksummed compression framing over LZ4 and ZSTD ([`CompressedSource`])
//! - Varint and length-prefixed string primitives ([`ByteSource`] / [`ByteSink`])
//! - A registry of per-type binary codecs with columnar bulk encode/decode
//!   ([`TypeRegistry`], [`DataType`])
//! - The [`Block`]/[`Column`] bulk transfer model ([`read_block`] / [`write_block`])
//!
//! The relational API (connections, statements, result sets) lives above this
//! crate and consumes only the exported read/write primitives. One logical
//! thread of control drives a source at a time; transport errors are fatal to
//! the connection and never retried here.

pub mod block;
pub mod compress;
pub mod error;
pub mod literal;
pub mod sink;
pub mod source;
pub mod types;
pub mod value;
pub mod varint;

pub use block::{read_block, write_block, Block, BlockInfo, Column};
pub use compress::{write_compressed_frame, CompressedSource, CompressionMethod};
pub use error::ProtocolError;
pub use literal::{NumberLiteral, SqlLexer};
pub use sink::ByteSink;
pub use source::{BufferedSource, ByteSource};
pub use types::{DataType, SqlType, TypeRegistry};
pub use value::Value;

/// Maximum encoded length of a varint: ten 7-bit groups cover all of `u64`.
pub const MAX_VARINT_LEN: usize = 10;

/// Size of the frame checksum field in bytes (CityHash128).
pub const CHECKSUM_SIZE: usize = 16;

/// Size of the compression frame header after the checksum:
/// method (1) + compressed size (4) + decompressed size (4).
pub const COMPRESS_HEADER_SIZE: usize = 9;

/// Maximum accepted compressed or decompressed frame size (128 MiB).
pub const MAX_FRAME_SIZE: usize = 128 * 1024 * 1024;

/// Default read buffer capacity (1 MiB, the socket receive buffer size).
pub const DEFAULT_BUFFER_SIZE: usize = 1024 * 1024;
