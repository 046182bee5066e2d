use protoflat_core::WireType;

use crate::varint::{encode_varint, varint_len};

/// Growable output buffer with protobuf primitive writers.
#[derive(Debug, Clone, Default)]
pub struct Writer {
    buf: Vec<u8>,
}

impl Writer {
    pub fn new() -> Self {
        Self { buf: Vec::new() }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    pub fn write_varint(&mut self, value: u64) {
        encode_varint(value, &mut self.buf);
    }

    pub fn write_tag(&mut self, number: u32, wire_type: WireType) {
        self.write_varint(u64::from((number << 3) | wire_type as u32));
    }

    pub fn write_fixed32(&mut self, value: u32) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_fixed64(&mut self, value: u64) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    /// Writes a length prefix followed by `bytes`.
    pub fn write_len_delimited(&mut self, bytes: &[u8]) {
        self.write_varint(bytes.len() as u64);
        self.buf.extend_from_slice(bytes);
    }

    /// Appends bytes without any framing.
    pub fn write_raw(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }
}

/// Encoded length of a tag for `number`.
pub fn tag_len(number: u32) -> usize {
    varint_len(u64::from(number << 3))
}

/// Encoded length of a length-delimited payload of `len` bytes, prefix included.
pub fn len_delimited_len(len: usize) -> usize {
    varint_len(len as u64) + len
}
