//! Variable-length unsigned integer encoding.
//!
//! LEB128-style: 7 bits per byte, least-significant group first, the top bit
//! set on every byte except the last. A `u64` never needs more than
//! [`MAX_VARINT_LEN`](crate::MAX_VARINT_LEN) bytes, and decoding rejects any
//! varint that runs longer: an unterminated varint means the stream is
//! corrupt or desynchronized.
//!
//! Encoding lives on [`ByteSink::write_var_uint`](crate::ByteSink) and
//! decoding on [`ByteSource::read_var_uint`](crate::ByteSource); this module
//! holds the shared sizing helper.

/// Returns the encoded length of `value` in bytes (always minimal).
pub fn var_uint_len(mut value: u64) -> usize {
    let mut len = 1;
    while value >= 0x80 {
        value >>= 7;
        len += 1;
    }
    len
}
