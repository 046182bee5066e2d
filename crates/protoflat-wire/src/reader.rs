//! Bounded cursor over an input buffer.
//!
//! The reader keeps a stack of length limits. Entering a length-delimited
//! submessage pushes `pos + len`; leaving it pops back to the enclosing limit.
//! Every read is checked against the innermost limit, so a value that would
//! cross it fails with [`WireError::Truncated`].

use protoflat_core::WireType;

use crate::error::WireError;
use crate::varint::decode_varint;

/// Highest legal field number (2^29 - 1).
pub const MAX_FIELD_NUMBER: u32 = (1 << 29) - 1;

/// Default nesting bound used when skipping groups.
pub const DEFAULT_GROUP_DEPTH: u32 = 100;

/// A decoded tag: field number plus wire type.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Tag {
    pub number: u32,
    pub wire_type: WireType,
}

impl Tag {
    pub fn new(number: u32, wire_type: WireType) -> Self {
        Self { number, wire_type }
    }

    /// Raw tag value as it appears on the wire.
    pub fn raw(self) -> u32 {
        (self.number << 3) | self.wire_type as u32
    }

    /// Splits a raw tag varint. Wire types 6 and 7 and field number 0 are malformed.
    pub fn from_raw(raw: u64) -> Result<Tag, WireError> {
        if raw > u64::from(u32::MAX) {
            return Err(WireError::VarintOverflow);
        }
        let raw = raw as u32;
        let wire_type = WireType::from_u32(raw & 7).ok_or(WireError::InvalidWireType(raw & 7))?;
        let number = raw >> 3;
        if number == 0 {
            return Err(WireError::ZeroFieldNumber);
        }
        Ok(Tag { number, wire_type })
    }
}

#[derive(Debug, Clone)]
pub struct Reader<'b> {
    buf: &'b [u8],
    pos: usize,
    limit: usize,
    saved_limits: Vec<usize>,
}

impl<'b> Reader<'b> {
    pub fn new(buf: &'b [u8]) -> Self {
        Self {
            buf,
            pos: 0,
            limit: buf.len(),
            saved_limits: Vec::new(),
        }
    }

    #[inline]
    pub fn pos(&self) -> usize {
        self.pos
    }

    /// Bytes left before the active limit.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.limit - self.pos
    }

    /// Whether the cursor sits exactly on the active limit.
    #[inline]
    pub fn is_at_limit(&self) -> bool {
        self.pos == self.limit
    }

    /// Number of limits currently pushed.
    pub fn depth(&self) -> usize {
        self.saved_limits.len()
    }

    /// Restricts reads to the next `len` bytes.
    pub fn push_limit(&mut self, len: usize) -> Result<(), WireError> {
        if len > self.remaining() {
            return Err(WireError::Truncated);
        }
        self.saved_limits.push(self.limit);
        self.limit = self.pos + len;
        Ok(())
    }

    /// Restores the limit that was active before the matching `push_limit`.
    pub fn pop_limit(&mut self) {
        self.limit = self.saved_limits.pop().unwrap_or(self.buf.len());
    }

    pub fn read_varint64(&mut self) -> Result<u64, WireError> {
        let (value, used) = decode_varint(&self.buf[self.pos..self.limit])?;
        self.pos += used;
        Ok(value)
    }

    /// Reads a varint and keeps its low 32 bits.
    pub fn read_varint32(&mut self) -> Result<u32, WireError> {
        self.read_varint64().map(|v| v as u32)
    }

    pub fn read_fixed32(&mut self) -> Result<u32, WireError> {
        let bytes = self.read_bytes(4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    pub fn read_fixed64(&mut self) -> Result<u64, WireError> {
        let bytes = self.read_bytes(8)?;
        let mut raw = [0u8; 8];
        raw.copy_from_slice(bytes);
        Ok(u64::from_le_bytes(raw))
    }

    /// Reads the next tag.
    pub fn read_tag(&mut self) -> Result<Tag, WireError> {
        let raw = self.read_varint64()?;
        Tag::from_raw(raw)
    }

    /// Reads a length prefix, rejecting values that would be negative as
    /// an `int32` and lengths running past the active limit.
    pub fn read_len(&mut self) -> Result<usize, WireError> {
        let len = self.read_varint64()?;
        if len > i32::MAX as u64 {
            return Err(WireError::InvalidLength(len));
        }
        let len = len as usize;
        if len > self.remaining() {
            return Err(WireError::Truncated);
        }
        Ok(len)
    }

    pub fn read_bytes(&mut self, len: usize) -> Result<&'b [u8], WireError> {
        if len > self.remaining() {
            return Err(WireError::Truncated);
        }
        let bytes = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(bytes)
    }

    /// Reads a length prefix and the payload it announces.
    pub fn read_len_delimited(&mut self) -> Result<&'b [u8], WireError> {
        let len = self.read_len()?;
        self.read_bytes(len)
    }

    /// Input consumed since `start`, used to capture raw records verbatim.
    pub fn slice_from(&self, start: usize) -> &'b [u8] {
        &self.buf[start..self.pos]
    }

    /// Skips the value of a field whose tag was just read.
    ///
    /// Groups are skipped up to their matching end tag, nesting at most
    /// `depth_limit` levels.
    pub fn skip_field(&mut self, tag: Tag, depth_limit: u32) -> Result<(), WireError> {
        match tag.wire_type {
            WireType::Varint => self.read_varint64().map(drop),
            WireType::Fixed64 => self.read_bytes(8).map(drop),
            WireType::Fixed32 => self.read_bytes(4).map(drop),
            WireType::Len => self.read_len_delimited().map(drop),
            WireType::StartGroup => self.skip_group(tag.number, depth_limit),
            WireType::EndGroup => Err(WireError::UnexpectedEndGroup(tag.number)),
        }
    }

    /// Skips the body of group `number` including its end tag.
    pub fn skip_group(&mut self, number: u32, depth_limit: u32) -> Result<(), WireError> {
        if depth_limit == 0 {
            return Err(WireError::GroupDepth);
        }
        loop {
            if self.is_at_limit() {
                return Err(WireError::Truncated);
            }
            let tag = self.read_tag()?;
            if tag.wire_type == WireType::EndGroup {
                if tag.number != number {
                    return Err(WireError::GroupMismatch {
                        expected: number,
                        found: tag.number,
                    });
                }
                return Ok(());
            }
            match tag.wire_type {
                WireType::StartGroup => self.skip_group(tag.number, depth_limit - 1)?,
                _ => self.skip_field(tag, depth_limit)?,
            }
        }
    }
}
