//! Byte sinks: the write-side mirror of [`ByteSource`](crate::ByteSource).
//!
//! Encoders write through [`ByteSink`] so the same codec serves both an
//! in-memory block buffer and a socket write path. The trait is blanket
//! implemented for every [`BufMut`], so `BytesMut` and `Vec<u8>` are sinks.

use bytes::BufMut;

/// Write primitives for the wire encoding. All multi-byte integers are
/// little-endian; strings are varint-length-prefixed.
pub trait ByteSink {
    fn write_byte(&mut self, byte: u8);

    fn write_raw(&mut self, bytes: &[u8]);

    fn write_bool(&mut self, v: bool) {
        self.write_byte(v as u8);
    }

    fn write_i8(&mut self, v: i8) {
        self.write_byte(v as u8);
    }

    fn write_u16_le(&mut self, v: u16) {
        self.write_raw(&v.to_le_bytes());
    }

    fn write_i16_le(&mut self, v: i16) {
        self.write_raw(&v.to_le_bytes());
    }

    fn write_u32_le(&mut self, v: u32) {
        self.write_raw(&v.to_le_bytes());
    }

    fn write_i32_le(&mut self, v: i32) {
        self.write_raw(&v.to_le_bytes());
    }

    fn write_u64_le(&mut self, v: u64) {
        self.write_raw(&v.to_le_bytes());
    }

    fn write_i64_le(&mut self, v: i64) {
        self.write_raw(&v.to_le_bytes());
    }

    fn write_f32_le(&mut self, v: f32) {
        self.write_raw(&v.to_le_bytes());
    }

    fn write_f64_le(&mut self, v: f64) {
        self.write_raw(&v.to_le_bytes());
    }

    /// Writes `value` as a varint, using the minimum number of bytes.
    fn write_var_uint(&mut self, mut value: u64) {
        loop {
            let byte = (value & 0x7F) as u8;
            value >>= 7;
            if value == 0 {
                self.write_byte(byte);
                return;
            }
            self.write_byte(byte | 0x80);
        }
    }

    /// Writes a varint-length-prefixed byte string.
    fn write_bytes_binary(&mut self, bytes: &[u8]) {
        self.write_var_uint(bytes.len() as u64);
        self.write_raw(bytes);
    }

    /// Writes a varint-length-prefixed UTF-8 string.
    fn write_utf8_binary(&mut self, s: &str) {
        self.write_bytes_binary(s.as_bytes());
    }
}

impl<B: BufMut> ByteSink for B {
    fn write_byte(&mut self, byte: u8) {
        self.put_u8(byte);
    }

    fn write_raw(&mut self, bytes: &[u8]) {
        self.put_slice(bytes);
    }
}
