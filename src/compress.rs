//! Checksummed compression framing.
//!
//! Frame layout (16-byte checksum + 9-byte header + payload):
//!
//! ```text
//! +----------+--------+-----------------+-------------------+---------+
//! | checksum | method | compressed size | decompressed size | payload |
//! | 16 bytes | 1 byte | 4 bytes LE      | 4 bytes LE        | ...     |
//! +----------+--------+-----------------+-------------------+---------+
//! ```
//!
//! The compressed size counts the method byte, both size fields and the
//! payload. The checksum is CityHash128 over everything after the checksum
//! field and is validated before a single payload byte is exposed
//! downstream. A mismatch is fatal: frame boundaries cannot be recovered
//! once the size fields are suspect.

use crate::error::ProtocolError;
use crate::sink::ByteSink;
use crate::source::ByteSource;
use crate::{CHECKSUM_SIZE, COMPRESS_HEADER_SIZE, MAX_FRAME_SIZE};
use bytes::BytesMut;

/// ZSTD compression level for the write path. Level 1 favors throughput,
/// matching the bulk-insert workloads this layer serves.
const ZSTD_LEVEL: i32 = 1;

/// Compression method byte values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CompressionMethod {
    None = 0x02,
    Lz4 = 0x82,
    Zstd = 0x90,
}

impl CompressionMethod {
    pub fn as_byte(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for CompressionMethod {
    type Error = ProtocolError;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        match byte {
            0x02 => Ok(CompressionMethod::None),
            0x82 => Ok(CompressionMethod::Lz4),
            0x90 => Ok(CompressionMethod::Zstd),
            other => Err(ProtocolError::InvalidCompressionMethod(other)),
        }
    }
}

/// Computes the frame checksum over the method byte, size fields and payload.
///
/// CityHash128 with the 64-bit halves swapped before little-endian
/// serialization, per the wire convention.
fn frame_checksum(body: &[u8]) -> u128 {
    cityhash_rs::cityhash_102_128(body).rotate_right(64)
}

/// A [`ByteSource`] that reads checksummed compression frames from an inner
/// source and serves the decompressed bytes.
///
/// Frames are fetched lazily, one at a time; a single logical read may span
/// the tail of one frame and the head of the next.
pub struct CompressedSource<S> {
    inner: S,
    /// Decompressed payload of the current frame.
    frame: Vec<u8>,
    pos: usize,
}

impl<S: ByteSource> CompressedSource<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            frame: Vec::new(),
            pos: 0,
        }
    }

    /// Consumes the wrapper, returning the inner source.
    pub fn into_inner(self) -> S {
        self.inner
    }

    fn remaining(&self) -> usize {
        self.frame.len() - self.pos
    }

    /// Reads, validates and decompresses the next frame.
    fn next_frame(&mut self) -> Result<(), ProtocolError> {
        let mut checksum_bytes = [0u8; CHECKSUM_SIZE];
        self.inner.read_raw(&mut checksum_bytes)?;
        let expected = u128::from_le_bytes(checksum_bytes);

        let mut header = [0u8; COMPRESS_HEADER_SIZE];
        self.inner.read_raw(&mut header)?;
        let compressed_size = u32::from_le_bytes([header[1], header[2], header[3], header[4]]) as usize;
        let decompressed_size = u32::from_le_bytes([header[5], header[6], header[7], header[8]]) as usize;

        if compressed_size < COMPRESS_HEADER_SIZE {
            return Err(ProtocolError::InvalidFrameHeader(format!(
                "compressed size {compressed_size} is smaller than the frame header"
            )));
        }
        if compressed_size > MAX_FRAME_SIZE {
            return Err(ProtocolError::FrameTooLarge {
                size: compressed_size,
                max: MAX_FRAME_SIZE,
            });
        }
        if decompressed_size > MAX_FRAME_SIZE {
            return Err(ProtocolError::FrameTooLarge {
                size: decompressed_size,
                max: MAX_FRAME_SIZE,
            });
        }

        // Checksum covers the header bytes too, so reassemble the full body
        // before touching the payload.
        let mut body = vec![0u8; compressed_size];
        body[..COMPRESS_HEADER_SIZE].copy_from_slice(&header);
        self.inner.read_raw(&mut body[COMPRESS_HEADER_SIZE..])?;

        let actual = frame_checksum(&body);
        if actual != expected {
            return Err(ProtocolError::ChecksumMismatch { expected, actual });
        }

        let method = CompressionMethod::try_from(body[0])?;
        let payload = &body[COMPRESS_HEADER_SIZE..];
        let frame = match method {
            CompressionMethod::None => payload.to_vec(),
            CompressionMethod::Lz4 => lz4_flex::block::decompress(payload, decompressed_size)
                .map_err(|e| ProtocolError::Decompress(e.to_string()))?,
            // Bounded by the advertised size: a frame cannot inflate past
            // what its header claims, no matter the compression ratio.
            CompressionMethod::Zstd => zstd::bulk::decompress(payload, decompressed_size)
                .map_err(|e| ProtocolError::Decompress(e.to_string()))?,
        };
        if frame.len() != decompressed_size {
            return Err(ProtocolError::SizeMismatch {
                expected: decompressed_size,
                actual: frame.len(),
            });
        }

        tracing::trace!(
            ?method,
            compressed = compressed_size,
            decompressed = decompressed_size,
            "read compression frame"
        );
        self.frame = frame;
        self.pos = 0;
        Ok(())
    }
}

impl<S: ByteSource> ByteSource for CompressedSource<S> {
    fn read_byte(&mut self) -> Result<u8, ProtocolError> {
        while self.remaining() == 0 {
            self.next_frame()?;
        }
        let byte = self.frame[self.pos];
        self.pos += 1;
        Ok(byte)
    }

    fn read_raw(&mut self, out: &mut [u8]) -> Result<(), ProtocolError> {
        let mut copied = 0;
        while copied < out.len() {
            while self.remaining() == 0 {
                self.next_frame()?;
            }
            let n = (out.len() - copied).min(self.remaining());
            out[copied..copied + n].copy_from_slice(&self.frame[self.pos..self.pos + n]);
            self.pos += n;
            copied += n;
        }
        Ok(())
    }

    fn skip(&mut self, len: usize) -> Result<(), ProtocolError> {
        let mut remaining = len;
        while remaining > 0 {
            while self.remaining() == 0 {
                self.next_frame()?;
            }
            let n = remaining.min(self.remaining());
            self.pos += n;
            remaining -= n;
        }
        Ok(())
    }
}

/// Encodes one compression frame containing `payload` into `out`.
///
/// This is the insert-side mirror of [`CompressedSource`]: block bytes are
/// framed here before hitting the socket.
pub fn write_compressed_frame(
    method: CompressionMethod,
    payload: &[u8],
    out: &mut BytesMut,
) -> Result<(), ProtocolError> {
    if payload.len() > MAX_FRAME_SIZE {
        return Err(ProtocolError::FrameTooLarge {
            size: payload.len(),
            max: MAX_FRAME_SIZE,
        });
    }

    let compressed = match method {
        CompressionMethod::None => payload.to_vec(),
        CompressionMethod::Lz4 => lz4_flex::block::compress(payload),
        CompressionMethod::Zstd => zstd::stream::encode_all(payload, ZSTD_LEVEL)
            .map_err(|e| ProtocolError::Decompress(e.to_string()))?,
    };

    let compressed_size = COMPRESS_HEADER_SIZE + compressed.len();
    if compressed_size > MAX_FRAME_SIZE {
        return Err(ProtocolError::FrameTooLarge {
            size: compressed_size,
            max: MAX_FRAME_SIZE,
        });
    }

    let mut body = BytesMut::with_capacity(compressed_size);
    body.write_byte(method.as_byte());
    body.write_u32_le(compressed_size as u32);
    body.write_u32_le(payload.len() as u32);
    body.write_raw(&compressed);

    out.write_raw(&frame_checksum(&body).to_le_bytes());
    out.write_raw(&body);
    Ok(())
}
