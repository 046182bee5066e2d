//! Read access to unknown-field records.

use protoflat_core::WireType;
use protoflat_wire::{DEFAULT_GROUP_DEPTH, Reader, tag_len};

/// Payload of one unknown record.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnknownValue<'m> {
    Varint(u64),
    Fixed64(u64),
    Fixed32(u32),
    LengthDelimited(&'m [u8]),
    /// Encoded body of a group, without its end tag.
    Group(&'m [u8]),
}

impl UnknownValue<'_> {
    pub fn wire_type(&self) -> WireType {
        match self {
            UnknownValue::Varint(_) => WireType::Varint,
            UnknownValue::Fixed64(_) => WireType::Fixed64,
            UnknownValue::Fixed32(_) => WireType::Fixed32,
            UnknownValue::LengthDelimited(_) => WireType::Len,
            UnknownValue::Group(_) => WireType::StartGroup,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UnknownField<'m> {
    pub number: u32,
    pub value: UnknownValue<'m>,
    /// The whole record as it appeared on the wire, tag included.
    pub raw: &'m [u8],
}

/// Iterator over unknown records in wire order.
///
/// Records captured by the decoder are always well formed. Bytes appended
/// by hand are not checked; iteration stops at the first malformed record.
#[derive(Clone, Debug)]
pub struct UnknownFields<'m> {
    reader: Reader<'m>,
    done: bool,
}

impl<'m> UnknownFields<'m> {
    pub(crate) fn new(bytes: &'m [u8]) -> Self {
        Self {
            reader: Reader::new(bytes),
            done: false,
        }
    }

    fn read_one(&mut self) -> Option<UnknownField<'m>> {
        let start = self.reader.pos();
        let tag = self.reader.read_tag().ok()?;
        let value = match tag.wire_type {
            WireType::Varint => UnknownValue::Varint(self.reader.read_varint64().ok()?),
            WireType::Fixed64 => UnknownValue::Fixed64(self.reader.read_fixed64().ok()?),
            WireType::Fixed32 => UnknownValue::Fixed32(self.reader.read_fixed32().ok()?),
            WireType::Len => UnknownValue::LengthDelimited(self.reader.read_len_delimited().ok()?),
            WireType::StartGroup => {
                let body_start = self.reader.pos();
                self.reader.skip_group(tag.number, DEFAULT_GROUP_DEPTH).ok()?;
                let with_end = self.reader.slice_from(body_start);
                UnknownValue::Group(&with_end[..with_end.len() - tag_len(tag.number)])
            }
            WireType::EndGroup => return None,
        };
        Some(UnknownField {
            number: tag.number,
            value,
            raw: self.reader.slice_from(start),
        })
    }
}

impl<'m> Iterator for UnknownFields<'m> {
    type Item = UnknownField<'m>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.reader.is_at_limit() {
            return None;
        }
        let field = self.read_one();
        self.done = field.is_none();
        field
    }
}
