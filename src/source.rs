//! Byte sources: exact-read primitives over a raw stream.
//!
//! [`ByteSource`] is the read capability every decoder consumes. Each call
//! returns exactly the requested bytes or fails; a short read is never
//! silently returned. [`BufferedSource`] implements it on top of any blocking
//! [`Read`] with a fixed-capacity buffer and a compact-then-refill strategy,
//! so message boundaries need not line up with socket deliveries.

use crate::error::ProtocolError;
use crate::{DEFAULT_BUFFER_SIZE, MAX_VARINT_LEN};
use std::io::{ErrorKind, Read};

/// Minimum accepted buffer capacity; must hold the widest fixed-width read.
pub const MIN_BUFFER_SIZE: usize = 16;

/// Blocking read primitives with exact-or-error semantics.
///
/// One logical thread of control drives a source at a time; a read that
/// cannot be satisfied blocks until enough bytes arrive or the stream ends,
/// in which case it fails with [`ProtocolError::EndOfStream`].
pub trait ByteSource {
    /// Reads a single byte.
    fn read_byte(&mut self) -> Result<u8, ProtocolError>;

    /// Fills `out` completely.
    fn read_raw(&mut self, out: &mut [u8]) -> Result<(), ProtocolError>;

    /// Discards exactly `len` bytes.
    fn skip(&mut self, len: usize) -> Result<(), ProtocolError>;

    fn read_bool(&mut self) -> Result<bool, ProtocolError> {
        Ok(self.read_byte()? != 0)
    }

    fn read_i8(&mut self) -> Result<i8, ProtocolError> {
        Ok(self.read_byte()? as i8)
    }

    fn read_u16_le(&mut self) -> Result<u16, ProtocolError> {
        let mut b = [0u8; 2];
        self.read_raw(&mut b)?;
        Ok(u16::from_le_bytes(b))
    }

    fn read_i16_le(&mut self) -> Result<i16, ProtocolError> {
        let mut b = [0u8; 2];
        self.read_raw(&mut b)?;
        Ok(i16::from_le_bytes(b))
    }

    fn read_u32_le(&mut self) -> Result<u32, ProtocolError> {
        let mut b = [0u8; 4];
        self.read_raw(&mut b)?;
        Ok(u32::from_le_bytes(b))
    }

    fn read_i32_le(&mut self) -> Result<i32, ProtocolError> {
        let mut b = [0u8; 4];
        self.read_raw(&mut b)?;
        Ok(i32::from_le_bytes(b))
    }

    fn read_u64_le(&mut self) -> Result<u64, ProtocolError> {
        let mut b = [0u8; 8];
        self.read_raw(&mut b)?;
        Ok(u64::from_le_bytes(b))
    }

    fn read_i64_le(&mut self) -> Result<i64, ProtocolError> {
        let mut b = [0u8; 8];
        self.read_raw(&mut b)?;
        Ok(i64::from_le_bytes(b))
    }

    fn read_f32_le(&mut self) -> Result<f32, ProtocolError> {
        let mut b = [0u8; 4];
        self.read_raw(&mut b)?;
        Ok(f32::from_le_bytes(b))
    }

    fn read_f64_le(&mut self) -> Result<f64, ProtocolError> {
        let mut b = [0u8; 8];
        self.read_raw(&mut b)?;
        Ok(f64::from_le_bytes(b))
    }

    /// Reads a varint-encoded unsigned integer.
    ///
    /// Fails with [`ProtocolError::VarintOverflow`] if no terminating byte
    /// appears within [`MAX_VARINT_LEN`] bytes.
    fn read_var_uint(&mut self) -> Result<u64, ProtocolError> {
        let mut value = 0u64;
        for group in 0..MAX_VARINT_LEN {
            let byte = self.read_byte()?;
            value |= u64::from(byte & 0x7F) << (7 * group);
            if byte & 0x80 == 0 {
                return Ok(value);
            }
        }
        Err(ProtocolError::VarintOverflow)
    }

    /// Copies `len` bytes into a new independently owned buffer.
    ///
    /// The request may exceed the source's internal capacity; it is served by
    /// draining and refilling in capacity-sized spans.
    fn read_owned(&mut self, len: usize) -> Result<Vec<u8>, ProtocolError> {
        let mut out = vec![0u8; len];
        self.read_raw(&mut out)?;
        Ok(out)
    }

    /// Reads a varint-length-prefixed byte string.
    fn read_bytes_binary(&mut self) -> Result<Vec<u8>, ProtocolError> {
        let len = self.read_var_uint()? as usize;
        self.read_owned(len)
    }

    /// Reads `len` raw bytes as UTF-8 text.
    fn read_utf8(&mut self, len: usize) -> Result<String, ProtocolError> {
        String::from_utf8(self.read_owned(len)?).map_err(|_| ProtocolError::InvalidUtf8)
    }

    /// Reads a varint-length-prefixed UTF-8 string.
    fn read_utf8_binary(&mut self) -> Result<String, ProtocolError> {
        let len = self.read_var_uint()? as usize;
        self.read_utf8(len)
    }
}

/// Buffered reader over a blocking byte stream.
///
/// The buffer capacity is fixed at construction. When a read outruns the
/// buffered bytes, the unread tail is compacted to offset zero and the
/// writable region is filled from the stream until the request is satisfied
/// or the stream reports end-of-input.
pub struct BufferedSource<R> {
    inner: R,
    buf: Vec<u8>,
    pos: usize,
    limit: usize,
    capacity: usize,
}

impl<R: Read> BufferedSource<R> {
    /// Creates a source with the default capacity
    /// ([`DEFAULT_BUFFER_SIZE`]).
    pub fn new(inner: R) -> Self {
        Self::with_capacity(inner, DEFAULT_BUFFER_SIZE)
    }

    /// Creates a source with a fixed buffer of `capacity` bytes,
    /// clamped to at least [`MIN_BUFFER_SIZE`].
    pub fn with_capacity(inner: R, capacity: usize) -> Self {
        let capacity = capacity.max(MIN_BUFFER_SIZE);
        Self {
            inner,
            buf: vec![0u8; capacity],
            pos: 0,
            limit: 0,
            capacity,
        }
    }

    /// Bytes currently buffered and unread.
    fn readable(&self) -> usize {
        self.limit - self.pos
    }

    /// Releases the internal buffer. Further reads fail with end-of-stream.
    /// Idempotent; does not close the underlying stream.
    pub fn close(&mut self) {
        self.buf = Vec::new();
        self.pos = 0;
        self.limit = 0;
    }

    /// Consumes the source, returning the underlying stream.
    pub fn into_inner(self) -> R {
        self.inner
    }

    /// Ensures at least `n` contiguous readable bytes are buffered.
    ///
    /// Compacts the unread tail to offset zero, then blocking-reads into the
    /// writable region. Requests beyond the fixed capacity are a caller
    /// error; large spans go through [`ByteSource::read_raw`], which drains
    /// and refills in a loop instead.
    fn refill(&mut self, n: usize) -> Result<(), ProtocolError> {
        if self.readable() >= n {
            return Ok(());
        }
        if self.buf.is_empty() {
            return Err(ProtocolError::EndOfStream {
                context: "closed source",
            });
        }
        if n > self.capacity {
            return Err(ProtocolError::ReadTooLarge {
                requested: n,
                capacity: self.capacity,
            });
        }

        self.buf.copy_within(self.pos..self.limit, 0);
        self.limit -= self.pos;
        self.pos = 0;

        while self.readable() < n {
            match self.inner.read(&mut self.buf[self.limit..]) {
                Ok(0) => {
                    return Err(ProtocolError::EndOfStream {
                        context: "stream refill",
                    })
                }
                Ok(read) => {
                    tracing::trace!(read, buffered = self.limit + read, "refilled buffer");
                    self.limit += read;
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(ProtocolError::Io(e)),
            }
        }
        Ok(())
    }
}

impl<R: Read> ByteSource for BufferedSource<R> {
    fn read_byte(&mut self) -> Result<u8, ProtocolError> {
        self.refill(1)?;
        let byte = self.buf[self.pos];
        self.pos += 1;
        Ok(byte)
    }

    fn read_raw(&mut self, out: &mut [u8]) -> Result<(), ProtocolError> {
        let mut copied = 0;
        while copied < out.len() {
            if self.readable() == 0 {
                self.refill(1)?;
            }
            let n = (out.len() - copied).min(self.readable());
            out[copied..copied + n].copy_from_slice(&self.buf[self.pos..self.pos + n]);
            self.pos += n;
            copied += n;
        }
        Ok(())
    }

    fn skip(&mut self, len: usize) -> Result<(), ProtocolError> {
        let mut remaining = len;
        while remaining > 0 {
            if self.readable() == 0 {
                self.refill(1)?;
            }
            let n = remaining.min(self.readable());
            self.pos += n;
            remaining -= n;
        }
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::testing::FragmentReader;
    use super::*;
    use crate::sink::ByteSink;
    use bytes::BytesMut;
    use std::io::Cursor;

    #[test]
    fn test_fixed_width_reads() {
        let mut buf = BytesMut::new();
        buf.write_byte(0xAB);
        buf.write_bool(true);
        buf.write_u16_le(0x1234);
        buf.write_i32_le(-7);
        buf.write_u64_le(u64::MAX - 1);
        buf.write_f64_le(2.5);

        let mut source = BufferedSource::with_capacity(Cursor::new(buf.to_vec()), 64);
        assert_eq!(source.read_byte().unwrap(), 0xAB);
        assert!(source.read_bool().unwrap());
        assert_eq!(source.read_u16_le().unwrap(), 0x1234);
        assert_eq!(source.read_i32_le().unwrap(), -7);
        assert_eq!(source.read_u64_le().unwrap(), u64::MAX - 1);
        assert_eq!(source.read_f64_le().unwrap(), 2.5);
    }

    #[test]
    fn test_fragmented_stream_matches_atomic_read() {
        // Total payload is several times the buffer capacity and arrives in
        // 1-3 byte fragments; decoded values must match an atomic read.
        let mut buf = BytesMut::new();
        for i in 0..64u64 {
            buf.write_u64_le(i * 0x0101_0101);
        }
        let data = buf.to_vec();
        assert!(data.len() > 16);

        let mut fragmented = BufferedSource::with_capacity(FragmentReader::new(data.clone()), 16);
        let mut atomic = BufferedSource::new(Cursor::new(data));
        for _ in 0..64 {
            assert_eq!(
                fragmented.read_u64_le().unwrap(),
                atomic.read_u64_le().unwrap()
            );
        }
    }

    #[test]
    fn test_read_owned_larger_than_capacity() {
        let data: Vec<u8> = (0..=255u8).cycle().take(1000).collect();
        let mut source = BufferedSource::with_capacity(Cursor::new(data.clone()), 16);
        assert_eq!(source.read_owned(1000).unwrap(), data);
    }

    #[test]
    fn test_skip_across_refills() {
        let data: Vec<u8> = (0..100u8).collect();
        let mut source = BufferedSource::with_capacity(FragmentReader::new(data), 16);
        source.skip(98).unwrap();
        assert_eq!(source.read_byte().unwrap(), 98);
        assert_eq!(source.read_byte().unwrap(), 99);
    }

    #[test]
    fn test_end_of_stream_mid_read() {
        let mut source = BufferedSource::with_capacity(Cursor::new(vec![1u8, 2, 3]), 16);
        let mut out = [0u8; 8];
        let result = source.read_raw(&mut out);
        assert!(matches!(result, Err(ProtocolError::EndOfStream { .. })));
    }

    #[test]
    fn test_eof_on_exhausted_stream() {
        let mut source = BufferedSource::with_capacity(Cursor::new(Vec::new()), 16);
        assert!(matches!(
            source.read_byte(),
            Err(ProtocolError::EndOfStream { .. })
        ));
    }

    #[test]
    fn test_close_is_idempotent() {
        let mut source = BufferedSource::with_capacity(Cursor::new(vec![1u8, 2, 3]), 16);
        assert_eq!(source.read_byte().unwrap(), 1);
        source.close();
        source.close();
        assert!(matches!(
            source.read_byte(),
            Err(ProtocolError::EndOfStream { .. })
        ));
    }

    #[test]
    fn test_capacity_clamped_to_minimum() {
        let data: Vec<u8> = (0..32u8).collect();
        // A capacity of 1 could never serve an 8-byte fixed read.
        let mut source = BufferedSource::with_capacity(Cursor::new(data), 1);
        assert_eq!(source.read_u64_le().unwrap(), u64::from_le_bytes([0, 1, 2, 3, 4, 5, 6, 7]));
    }

    #[test]
    fn test_length_prefixed_strings() {
        let mut buf = BytesMut::new();
        buf.write_utf8_binary("");
        buf.write_utf8_binary("ab");
        buf.write_utf8_binary("héllo");

        let mut source = BufferedSource::with_capacity(FragmentReader::new(buf.to_vec()), 16);
        assert_eq!(source.read_utf8_binary().unwrap(), "");
        assert_eq!(source.read_utf8_binary().unwrap(), "ab");
        assert_eq!(source.read_utf8_binary().unwrap(), "héllo");
    }

    #[test]
    fn test_invalid_utf8_rejected() {
        let mut buf = BytesMut::new();
        buf.write_bytes_binary(&[0xFF, 0xFE]);
        let mut source = BufferedSource::with_capacity(Cursor::new(buf.to_vec()), 16);
        assert!(matches!(
            source.read_utf8_binary(),
            Err(ProtocolError::InvalidUtf8)
        ));
    }
}
