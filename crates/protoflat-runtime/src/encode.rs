//! Wire encoder.
//!
//! Encoding runs in two passes over the message tree. The size pass
//! computes every message's body size bottom-up and caches it in the
//! message header; the write pass then emits length prefixes from the
//! cache, so nested messages are sized once.

use protoflat_core::{FieldType, Syntax, WireType};
use protoflat_schema::{FieldLayout, FieldMode, MessageDef};
use protoflat_wire::varint::{encode_zigzag32, encode_zigzag64, varint_len};
use protoflat_wire::{Writer, len_delimited_len, tag_len};

use crate::error::EncodeError;
use crate::message::Message;
use crate::storage::{RawMessage, Slot};
use crate::value::MapKey;

/// Encoder policies.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EncodeOptions {
    deterministic: bool,
    check_required: bool,
    skip_unknown: bool,
    recursion_limit: u32,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self {
            deterministic: false,
            check_required: false,
            skip_unknown: false,
            recursion_limit: 100,
        }
    }
}

impl EncodeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Emit map entries sorted by key.
    pub fn deterministic(mut self, deterministic: bool) -> Self {
        self.deterministic = deterministic;
        self
    }

    /// Fail with [`EncodeError::MissingRequired`] if a required field is unset.
    pub fn check_required(mut self, check: bool) -> Self {
        self.check_required = check;
        self
    }

    /// Leave unknown records out of the output.
    pub fn skip_unknown(mut self, skip: bool) -> Self {
        self.skip_unknown = skip;
        self
    }

    /// Maximum submessage nesting (default 100).
    pub fn recursion_limit(mut self, limit: u32) -> Self {
        self.recursion_limit = limit;
        self
    }

    pub fn get_deterministic(&self) -> bool {
        self.deterministic
    }

    pub fn get_check_required(&self) -> bool {
        self.check_required
    }

    pub fn get_skip_unknown(&self) -> bool {
        self.skip_unknown
    }

    pub fn get_recursion_limit(&self) -> u32 {
        self.recursion_limit
    }
}

impl Message<'_> {
    /// Encodes the message: known fields in field number order, then the
    /// unknown records verbatim.
    pub fn serialize(&self, options: &EncodeOptions) -> Result<Vec<u8>, EncodeError> {
        if options.check_required {
            let missing = crate::required::check_initialized(self);
            if !missing.is_empty() {
                return Err(EncodeError::MissingRequired(missing));
            }
        }
        let encoder = Encoder { options };
        let size = encoder.message_size(self.def(), self.raw(), 0)?;
        let mut out = Writer::with_capacity(size);
        encoder.write_message(&mut out, self.def(), self.raw());
        debug_assert_eq!(out.len(), size);
        Ok(out.into_bytes())
    }

    /// Size of the encoded message in bytes.
    pub fn encoded_len(&self, options: &EncodeOptions) -> Result<usize, EncodeError> {
        Encoder { options }.message_size(self.def(), self.raw(), 0)
    }
}

/// Largest encodable message body.
const MAX_MESSAGE_SIZE: usize = i32::MAX as usize;

struct Encoder<'o> {
    options: &'o EncodeOptions,
}

impl Encoder<'_> {
    fn message_size(&self, def: MessageDef<'_>, raw: RawMessage, depth: u32) -> Result<usize, EncodeError> {
        if depth > self.options.recursion_limit {
            return Err(EncodeError::RecursionLimit(self.options.recursion_limit));
        }
        let mut size = 0;
        for field in def.layout().fields() {
            size += self.field_size(def, raw, field, depth)?;
        }
        if !self.options.skip_unknown {
            // SAFETY: the message's arena is alive for the call.
            size += unsafe { raw.unknown() }.len();
        }
        if size > MAX_MESSAGE_SIZE {
            return Err(EncodeError::TooLarge(size));
        }
        raw.set_cached_size(size as u32);
        Ok(size)
    }

    fn field_size(
        &self,
        def: MessageDef<'_>,
        raw: RawMessage,
        field: &FieldLayout,
        depth: u32,
    ) -> Result<usize, EncodeError> {
        match field.mode {
            FieldMode::Scalar if raw.is_set(field) => self.slot_size(def, field, raw.slot(field), depth),
            FieldMode::Scalar => Ok(0),
            FieldMode::Repeated => {
                let Some(array) = raw.array(field).filter(|a| a.len() > 0) else {
                    return Ok(0);
                };
                let elements = (0..array.len()).map(|i| array.get(i, field.field_type));
                if field.packed && field.field_type.is_packable() {
                    let payload: usize = elements.map(|slot| scalar_len(field.field_type, slot.bits())).sum();
                    return Ok(tag_len(field.number) + len_delimited_len(payload));
                }
                let mut size = 0;
                for slot in elements {
                    size += self.slot_size(def, field, slot, depth)?;
                }
                Ok(size)
            }
            FieldMode::Map => {
                let Some((key, value)) = entry_layouts(def, field) else {
                    return Ok(0);
                };
                let mut size = 0;
                for (k, v) in map_entries(raw, field, false) {
                    let entry = key_size(key, &k) + self.slot_size(def, value, v, depth)?;
                    size += tag_len(field.number) + len_delimited_len(entry);
                }
                Ok(size)
            }
        }
    }

    /// Encoded size of one value including its tag.
    fn slot_size(&self, def: MessageDef<'_>, field: &FieldLayout, slot: Slot, depth: u32) -> Result<usize, EncodeError> {
        let tag = tag_len(field.number);
        Ok(match slot {
            Slot::Bits(bits) => tag + scalar_len(field.field_type, bits),
            Slot::Str(view) => {
                if field.field_type == FieldType::String && def.syntax() == Syntax::Proto3 {
                    // SAFETY: the view outlives this call.
                    let bytes = unsafe { view.bytes() };
                    if std::str::from_utf8(bytes).is_err() {
                        let name = def.pool().field(field.field).full_name();
                        return Err(EncodeError::InvalidUtf8(name.to_owned()));
                    }
                }
                tag + len_delimited_len(view.len())
            }
            Slot::Message(_) => {
                let inner = match (slot.message(), field.submessage) {
                    (Some(child), Some(index)) => self.message_size(def.pool().message(index), child, depth + 1)?,
                    _ => 0,
                };
                match field.field_type {
                    FieldType::Group => 2 * tag + inner,
                    _ => tag + len_delimited_len(inner),
                }
            }
        })
    }

    fn write_message(&self, out: &mut Writer, def: MessageDef<'_>, raw: RawMessage) {
        for field in def.layout().fields() {
            self.write_field(out, def, raw, field);
        }
        if !self.options.skip_unknown {
            // SAFETY: the message's arena is alive for the call.
            out.write_raw(unsafe { raw.unknown() });
        }
    }

    fn write_field(&self, out: &mut Writer, def: MessageDef<'_>, raw: RawMessage, field: &FieldLayout) {
        match field.mode {
            FieldMode::Scalar => {
                if raw.is_set(field) {
                    self.write_slot(out, def, field, raw.slot(field));
                }
            }
            FieldMode::Repeated => {
                let Some(array) = raw.array(field).filter(|a| a.len() > 0) else {
                    return;
                };
                let elements = (0..array.len()).map(|i| array.get(i, field.field_type));
                if field.packed && field.field_type.is_packable() {
                    let payload: usize = elements
                        .clone()
                        .map(|slot| scalar_len(field.field_type, slot.bits()))
                        .sum();
                    out.write_tag(field.number, WireType::Len);
                    out.write_varint(payload as u64);
                    for slot in elements {
                        write_scalar(out, field.field_type, slot.bits());
                    }
                    return;
                }
                for slot in elements {
                    self.write_slot(out, def, field, slot);
                }
            }
            FieldMode::Map => {
                let Some((key, value)) = entry_layouts(def, field) else {
                    return;
                };
                for (k, v) in map_entries(raw, field, self.options.deterministic) {
                    let entry = key_size(key, &k) + self.cached_slot_size(value, v);
                    out.write_tag(field.number, WireType::Len);
                    out.write_varint(entry as u64);
                    write_key(out, key, &k);
                    self.write_slot(out, def, value, v);
                }
            }
        }
    }

    /// Same as `slot_size`, reading submessage sizes from the cache.
    fn cached_slot_size(&self, field: &FieldLayout, slot: Slot) -> usize {
        let tag = tag_len(field.number);
        match slot {
            Slot::Bits(bits) => tag + scalar_len(field.field_type, bits),
            Slot::Str(view) => tag + len_delimited_len(view.len()),
            Slot::Message(_) => {
                let inner = slot.message().map_or(0, |child| child.cached_size() as usize);
                match field.field_type {
                    FieldType::Group => 2 * tag + inner,
                    _ => tag + len_delimited_len(inner),
                }
            }
        }
    }

    fn write_slot(&self, out: &mut Writer, def: MessageDef<'_>, field: &FieldLayout, slot: Slot) {
        match slot {
            Slot::Bits(bits) => {
                out.write_tag(field.number, field.field_type.wire_type());
                write_scalar(out, field.field_type, bits);
            }
            Slot::Str(view) => {
                out.write_tag(field.number, WireType::Len);
                // SAFETY: the view outlives this call.
                out.write_len_delimited(unsafe { view.bytes() });
            }
            Slot::Message(_) => {
                let child = slot.message();
                let child_def = field.submessage.map(|index| def.pool().message(index));
                if field.field_type == FieldType::Group {
                    out.write_tag(field.number, WireType::StartGroup);
                    if let (Some(child), Some(child_def)) = (child, child_def) {
                        self.write_message(out, child_def, child);
                    }
                    out.write_tag(field.number, WireType::EndGroup);
                    return;
                }
                out.write_tag(field.number, WireType::Len);
                match (child, child_def) {
                    (Some(child), Some(child_def)) => {
                        out.write_varint(u64::from(child.cached_size()));
                        self.write_message(out, child_def, child);
                    }
                    _ => out.write_varint(0),
                }
            }
        }
    }
}

/// Key and value layouts of a map field's entry type.
fn entry_layouts<'p>(def: MessageDef<'p>, field: &FieldLayout) -> Option<(&'p FieldLayout, &'p FieldLayout)> {
    let entry = def.pool().message(field.submessage?);
    Some((entry.map_key()?.layout()?, entry.map_value()?.layout()?))
}

fn map_entries(raw: RawMessage, field: &FieldLayout, sorted: bool) -> Vec<(MapKey, Slot)> {
    let Some(map) = raw.map(field) else {
        return Vec::new();
    };
    // SAFETY: the borrow ends once the snapshot is collected.
    let mut entries: Vec<_> = unsafe { map.entries() }
        .iter()
        .map(|(k, v)| (k.clone(), *v))
        .collect();
    if sorted {
        entries.sort_by(|a, b| a.0.cmp(&b.0));
    }
    entries
}

fn key_size(layout: &FieldLayout, key: &MapKey) -> usize {
    let tag = tag_len(layout.number);
    match key {
        MapKey::String(s) => tag + len_delimited_len(s.len()),
        _ => tag + scalar_len(layout.field_type, key.bits()),
    }
}

fn write_key(out: &mut Writer, layout: &FieldLayout, key: &MapKey) {
    match key {
        MapKey::String(s) => {
            out.write_tag(layout.number, WireType::Len);
            out.write_len_delimited(s);
        }
        _ => {
            out.write_tag(layout.number, layout.field_type.wire_type());
            write_scalar(out, layout.field_type, key.bits());
        }
    }
}

/// Encoded size of a scalar value without its tag.
fn scalar_len(field_type: FieldType, bits: u64) -> usize {
    match field_type {
        FieldType::Int32 | FieldType::Enum => varint_len(bits as u32 as i32 as i64 as u64),
        FieldType::Int64 | FieldType::UInt64 | FieldType::UInt32 => varint_len(bits),
        FieldType::Bool => 1,
        FieldType::SInt32 => varint_len(u64::from(encode_zigzag32(bits as u32 as i32))),
        FieldType::SInt64 => varint_len(encode_zigzag64(bits as i64)),
        FieldType::Fixed32 | FieldType::SFixed32 | FieldType::Float => 4,
        FieldType::Fixed64 | FieldType::SFixed64 | FieldType::Double => 8,
        FieldType::String | FieldType::Bytes | FieldType::Message | FieldType::Group => 0,
    }
}

fn write_scalar(out: &mut Writer, field_type: FieldType, bits: u64) {
    match field_type {
        FieldType::Int32 | FieldType::Enum => out.write_varint(bits as u32 as i32 as i64 as u64),
        FieldType::Int64 | FieldType::UInt64 | FieldType::UInt32 => out.write_varint(bits),
        FieldType::Bool => out.write_varint(u64::from(bits != 0)),
        FieldType::SInt32 => out.write_varint(u64::from(encode_zigzag32(bits as u32 as i32))),
        FieldType::SInt64 => out.write_varint(encode_zigzag64(bits as i64)),
        FieldType::Fixed32 | FieldType::SFixed32 | FieldType::Float => out.write_fixed32(bits as u32),
        FieldType::Fixed64 | FieldType::SFixed64 | FieldType::Double => out.write_fixed64(bits),
        FieldType::String | FieldType::Bytes | FieldType::Message | FieldType::Group => {}
    }
}
