//! Wire decoder driven by message layouts.
//!
//! One loop handles every message type: it reads a tag, finds the field's
//! layout entry by number and dispatches on `(mode, wire type, field type)`.
//! Anything that does not fit a declared field is kept verbatim as an
//! unknown record.

use protoflat_core::{Arena, FieldType, Syntax, WireType};
use protoflat_schema::{FieldLayout, FieldMode, MessageDef};
use protoflat_wire::varint::{decode_zigzag32, decode_zigzag64};
use protoflat_wire::{Reader, Tag, WireError, Writer};
use tracing::warn;

use crate::error::DecodeError;
use crate::message::Message;
use crate::storage::{RawMessage, Slot, StrView};
use crate::value::MapKey;

/// How `string` fields are checked for UTF-8 while decoding.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Utf8Mode {
    /// Accept any bytes.
    Off,
    /// Accept invalid data and log a warning.
    Warn,
    /// Fail with [`DecodeError::InvalidUtf8`].
    Strict,
}

impl Utf8Mode {
    /// Mode applied when none is configured.
    pub fn default_for(syntax: Syntax) -> Self {
        match syntax {
            Syntax::Proto2 => Utf8Mode::Warn,
            Syntax::Proto3 => Utf8Mode::Strict,
        }
    }
}

/// Decoder limits and policies.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DecodeOptions {
    recursion_limit: u32,
    total_bytes_limit: u64,
    utf8_mode: Option<Utf8Mode>,
    discard_unknown: bool,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            recursion_limit: 100,
            total_bytes_limit: 64 << 20,
            utf8_mode: None,
            discard_unknown: false,
        }
    }
}

impl DecodeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Maximum submessage nesting (default 100).
    pub fn recursion_limit(mut self, limit: u32) -> Self {
        self.recursion_limit = limit;
        self
    }

    /// Maximum input size in bytes (default 64 MiB).
    pub fn total_bytes_limit(mut self, limit: u64) -> Self {
        self.total_bytes_limit = limit;
        self
    }

    /// UTF-8 policy for `string` fields. `None` picks the mode from the
    /// message's syntax: strict for proto3, warn for proto2.
    pub fn utf8_mode(mut self, mode: Option<Utf8Mode>) -> Self {
        self.utf8_mode = mode;
        self
    }

    /// Drop unknown records instead of keeping them.
    pub fn discard_unknown(mut self, discard: bool) -> Self {
        self.discard_unknown = discard;
        self
    }

    pub fn get_recursion_limit(&self) -> u32 {
        self.recursion_limit
    }

    pub fn get_total_bytes_limit(&self) -> u64 {
        self.total_bytes_limit
    }

    pub fn get_utf8_mode(&self) -> Option<Utf8Mode> {
        self.utf8_mode
    }

    pub fn get_discard_unknown(&self) -> bool {
        self.discard_unknown
    }
}

impl<'a> Message<'a> {
    /// Decodes `bytes` into a new message of type `def`.
    pub fn parse(
        def: MessageDef<'a>,
        bytes: &[u8],
        arena: &'a Arena,
        options: &DecodeOptions,
    ) -> Result<Self, DecodeError> {
        let mut message = Message::new(def, arena)?;
        message.merge_from_bytes(bytes, options)?;
        Ok(message)
    }

    /// Decodes `bytes` on top of the current contents, with wire merge
    /// semantics.
    ///
    /// On error the message holds whatever was decoded before the failure.
    pub fn merge_from_bytes(&mut self, bytes: &[u8], options: &DecodeOptions) -> Result<(), DecodeError> {
        let size = bytes.len() as u64;
        if size > options.total_bytes_limit {
            return Err(DecodeError::TotalBytesLimit {
                size,
                limit: options.total_bytes_limit,
            });
        }
        let mut decoder = Decoder {
            reader: Reader::new(bytes),
            arena: self.arena(),
            options,
            depth: 0,
        };
        decoder.message(self.def(), self.raw(), End::Top)
    }
}

/// What terminates the message being decoded.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum End {
    /// End of input, or a zero tag.
    Top,
    /// End of the active length limit.
    Limit,
    /// End-group tag with this field number.
    Group(u32),
}

struct Decoder<'b, 'a, 'o> {
    reader: Reader<'b>,
    arena: &'a Arena,
    options: &'o DecodeOptions,
    depth: u32,
}

impl<'b, 'a> Decoder<'b, 'a, '_> {
    fn message(&mut self, def: MessageDef<'a>, raw: RawMessage, end: End) -> Result<(), DecodeError> {
        let layout = def.layout();
        while !self.reader.is_at_limit() {
            let start = self.reader.pos();
            let raw_tag = self.reader.read_varint64()?;
            if raw_tag == 0 {
                if end == End::Top {
                    return Ok(());
                }
                return Err(WireError::ZeroFieldNumber.into());
            }
            let tag = Tag::from_raw(raw_tag)?;
            if tag.wire_type == WireType::EndGroup {
                return match end {
                    End::Group(number) if number == tag.number => Ok(()),
                    End::Group(number) => Err(WireError::GroupMismatch {
                        expected: number,
                        found: tag.number,
                    }
                    .into()),
                    _ => Err(WireError::UnexpectedEndGroup(tag.number).into()),
                };
            }
            let handled = match layout.field_by_number(tag.number) {
                Some(field) => self.field(def, raw, field, tag, start)?,
                None => false,
            };
            if !handled {
                self.unknown(raw, tag, start)?;
            }
        }
        if let End::Group(_) = end {
            return Err(WireError::Truncated.into());
        }
        Ok(())
    }

    /// Decodes one known field. Returns false when the wire type does not
    /// fit the field and the record should be kept as unknown.
    fn field(
        &mut self,
        def: MessageDef<'a>,
        raw: RawMessage,
        field: &'a FieldLayout,
        tag: Tag,
        start: usize,
    ) -> Result<bool, DecodeError> {
        let field_type = field.field_type;
        match field.mode {
            FieldMode::Map if tag.wire_type == WireType::Len => {
                return self.map_entry(def, raw, field, start);
            }
            FieldMode::Map => return Ok(false),
            FieldMode::Repeated if tag.wire_type == WireType::Len && field_type.is_packable() => {
                self.packed(def, raw, field)?;
            }
            _ if tag.wire_type != field_type.wire_type() => return Ok(false),
            FieldMode::Repeated => {
                let slot = match self.value(def, field, tag)? {
                    Some(slot) => slot,
                    None => {
                        self.keep(raw, start)?;
                        return Ok(true);
                    }
                };
                raw.mutable_array(self.arena, field)?
                    .push(self.arena, field_type, slot)?;
            }
            FieldMode::Scalar if field_type.is_message() => {
                let child_def = self.submessage_def(def, field);
                let child = raw.mutable_child(self.arena, field, child_def.layout())?;
                self.nested(child_def, child, tag)?;
            }
            FieldMode::Scalar => match self.value(def, field, tag)? {
                Some(slot) => {
                    raw.set_slot(field, slot);
                    raw.mark_present(field);
                }
                None => self.keep(raw, start)?,
            },
        }
        Ok(true)
    }

    fn submessage_def(&self, def: MessageDef<'a>, field: &FieldLayout) -> MessageDef<'a> {
        let pool = def.pool();
        match field.submessage {
            Some(index) => pool.message(index),
            // Layouts always carry the submessage of message-typed fields.
            None => def,
        }
    }

    /// Reads one non-packed value. Repeated messages are allocated and
    /// decoded here. `None` means a closed enum rejected the number.
    fn value(&mut self, def: MessageDef<'a>, field: &FieldLayout, tag: Tag) -> Result<Option<Slot>, DecodeError> {
        let field_type = field.field_type;
        if field_type.is_message() {
            let child_def = self.submessage_def(def, field);
            let child = RawMessage::alloc(self.arena, child_def.layout())?;
            self.nested(child_def, child, tag)?;
            return Ok(Some(Slot::Message(child.as_ptr())));
        }
        if field_type.is_string_like() {
            let bytes = self.reader.read_len_delimited()?;
            self.check_utf8(def, field, bytes)?;
            return Ok(Some(Slot::Str(StrView::copy_in(self.arena, bytes)?)));
        }
        let bits = self.scalar(field_type)?;
        if self.rejects_enum(def, field, bits) {
            return Ok(None);
        }
        Ok(Some(Slot::Bits(bits)))
    }

    fn scalar(&mut self, field_type: FieldType) -> Result<u64, DecodeError> {
        let r = &mut self.reader;
        Ok(match field_type {
            FieldType::Int32 | FieldType::UInt32 | FieldType::Enum => u64::from(r.read_varint64()? as u32),
            FieldType::Int64 | FieldType::UInt64 => r.read_varint64()?,
            FieldType::Bool => u64::from(r.read_varint64()? != 0),
            FieldType::SInt32 => u64::from(decode_zigzag32(r.read_varint64()? as u32) as u32),
            FieldType::SInt64 => decode_zigzag64(r.read_varint64()?) as u64,
            FieldType::Fixed32 | FieldType::SFixed32 | FieldType::Float => u64::from(r.read_fixed32()?),
            FieldType::Fixed64 | FieldType::SFixed64 | FieldType::Double => r.read_fixed64()?,
            FieldType::String | FieldType::Bytes | FieldType::Message | FieldType::Group => {
                return Err(WireError::InvalidWireType(field_type.wire_type() as u32).into());
            }
        })
    }

    fn rejects_enum(&self, def: MessageDef<'a>, field: &FieldLayout, bits: u64) -> bool {
        field
            .closed_enum
            .is_some_and(|index| !def.pool().enum_def(index).accepts(bits as u32 as i32))
    }

    fn check_utf8(&self, def: MessageDef<'a>, field: &FieldLayout, bytes: &[u8]) -> Result<(), DecodeError> {
        if field.field_type != FieldType::String || std::str::from_utf8(bytes).is_ok() {
            return Ok(());
        }
        let mode = self
            .options
            .utf8_mode
            .unwrap_or_else(|| Utf8Mode::default_for(def.syntax()));
        let name = def.pool().field(field.field).full_name();
        match mode {
            Utf8Mode::Off => Ok(()),
            Utf8Mode::Warn => {
                warn!(field = %name, "invalid UTF-8 in string field");
                Ok(())
            }
            Utf8Mode::Strict => Err(DecodeError::InvalidUtf8(name.to_owned())),
        }
    }

    /// Decodes a length-delimited submessage or a group body into `child`.
    fn nested(&mut self, def: MessageDef<'a>, child: RawMessage, tag: Tag) -> Result<(), DecodeError> {
        if self.depth >= self.options.recursion_limit {
            return Err(DecodeError::RecursionLimit(self.options.recursion_limit));
        }
        self.depth += 1;
        let result = match tag.wire_type {
            WireType::StartGroup => self.message(def, child, End::Group(tag.number)),
            _ => self.limited(|this| this.message(def, child, End::Limit)),
        };
        self.depth -= 1;
        result
    }

    /// Runs `body` inside the length limit announced by the next varint.
    fn limited<T>(&mut self, body: impl FnOnce(&mut Self) -> Result<T, DecodeError>) -> Result<T, DecodeError> {
        let len = self.reader.read_len()?;
        self.reader.push_limit(len)?;
        let result = body(self);
        self.reader.pop_limit();
        result
    }

    fn packed(&mut self, def: MessageDef<'a>, raw: RawMessage, field: &FieldLayout) -> Result<(), DecodeError> {
        let mut rejected = Writer::new();
        self.limited(|this| {
            let array = raw.mutable_array(this.arena, field)?;
            while !this.reader.is_at_limit() {
                let bits = this.scalar(field.field_type)?;
                if this.rejects_enum(def, field, bits) {
                    rejected.write_tag(field.number, WireType::Varint);
                    rejected.write_varint(bits as u32 as i32 as i64 as u64);
                    continue;
                }
                array.push(this.arena, field.field_type, Slot::Bits(bits))?;
            }
            Ok(())
        })?;
        if !rejected.is_empty() && !self.options.discard_unknown {
            raw.append_unknown(self.arena, rejected.as_bytes())?;
        }
        Ok(())
    }

    fn map_entry(
        &mut self,
        def: MessageDef<'a>,
        raw: RawMessage,
        field: &'a FieldLayout,
        start: usize,
    ) -> Result<bool, DecodeError> {
        let entry_def = self.submessage_def(def, field);
        let (Some(key_def), Some(value_def)) = (entry_def.map_key(), entry_def.map_value()) else {
            return Ok(false);
        };
        let (Some(key_layout), Some(value_layout)) = (key_def.layout(), value_def.layout()) else {
            return Ok(false);
        };
        if self.depth >= self.options.recursion_limit {
            return Err(DecodeError::RecursionLimit(self.options.recursion_limit));
        }
        self.depth += 1;
        let entry = self.limited(|this| {
            let mut key = MapKey::zero(key_layout.field_type);
            let mut value: Option<Slot> = None;
            let mut rejected = false;
            while !this.reader.is_at_limit() {
                let tag = this.reader.read_tag()?;
                if tag.number == 1 && tag.wire_type == key_layout.field_type.wire_type() {
                    key = this.map_key(entry_def, key_layout)?;
                } else if tag.number == 2 && tag.wire_type == value_layout.field_type.wire_type() {
                    if value_layout.field_type.is_message() {
                        let child_def = this.submessage_def(entry_def, value_layout);
                        let child = match value.and_then(Slot::message) {
                            Some(existing) => existing,
                            None => RawMessage::alloc(this.arena, child_def.layout())?,
                        };
                        this.nested(child_def, child, tag)?;
                        value = Some(Slot::Message(child.as_ptr()));
                    } else {
                        match this.value(entry_def, value_layout, tag)? {
                            Some(slot) => value = Some(slot),
                            None => rejected = true,
                        }
                    }
                } else {
                    let depth = this.options.recursion_limit.saturating_sub(this.depth);
                    this.reader.skip_field(tag, depth)?;
                }
            }
            Ok((key, value, rejected))
        });
        self.depth -= 1;
        let (key, value, rejected) = entry?;
        if rejected {
            self.keep(raw, start)?;
            return Ok(true);
        }
        let value = match value {
            Some(slot) => slot,
            None => match value_def.message_type() {
                Some(child_def) => Slot::Message(RawMessage::alloc(self.arena, child_def.layout())?.as_ptr()),
                None => Slot::empty(value_layout.field_type),
            },
        };
        let map = raw.mutable_map(self.arena, field)?;
        // SAFETY: no other borrow of this map is live during decoding.
        unsafe { map.entries() }.insert(key, value);
        Ok(true)
    }

    fn map_key(&mut self, entry_def: MessageDef<'a>, key: &FieldLayout) -> Result<MapKey, DecodeError> {
        if key.field_type != FieldType::String {
            return Ok(MapKey::from_bits(key.field_type, self.scalar(key.field_type)?));
        }
        let bytes = self.reader.read_len_delimited()?;
        self.check_utf8(entry_def, key, bytes)?;
        Ok(MapKey::from(bytes))
    }

    /// Skips the record whose tag starts at `start` and keeps it as unknown.
    fn unknown(&mut self, raw: RawMessage, tag: Tag, start: usize) -> Result<(), DecodeError> {
        let depth = self.options.recursion_limit.saturating_sub(self.depth);
        self.reader.skip_field(tag, depth)?;
        self.keep(raw, start)
    }

    /// Keeps the input consumed since `start` as an unknown record.
    fn keep(&mut self, raw: RawMessage, start: usize) -> Result<(), DecodeError> {
        if !self.options.discard_unknown {
            raw.append_unknown(self.arena, self.reader.slice_from(start))?;
        }
        Ok(())
    }
}
