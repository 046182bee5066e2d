//! Reflective message handle.
//!
//! A [`Message`] pairs a [`MessageDef`] with arena storage. Every accessor
//! takes the [`FieldDef`] to operate on and dispatches on its layout entry,
//! so one code path serves every schema.

use std::fmt;

use protoflat_core::{AllocError, Arena, FieldType};
use protoflat_schema::{
    DefaultValue, FieldDef, FieldLayout, FieldMode, Layout, MessageDef, OneofDef, Presence,
};

use crate::array::Array;
use crate::error::AccessError;
use crate::map::Map;
use crate::storage::{RawMessage, Slot, StrView};
use crate::unknown::UnknownFields;
use crate::value::{MapKey, Value, scalar_bits, scalar_value, str_value};

/// Handle to a message stored in an arena.
///
/// Cloning the handle does not copy the message; both handles see the same
/// storage. Use [`crate::deep_copy`] for an independent copy.
#[derive(Clone)]
pub struct Message<'a> {
    def: MessageDef<'a>,
    arena: &'a Arena,
    raw: RawMessage,
}

impl<'a> Message<'a> {
    /// Allocates an empty message of type `def` in `arena`.
    pub fn new(def: MessageDef<'a>, arena: &'a Arena) -> Result<Self, AllocError> {
        let raw = RawMessage::alloc(arena, def.layout())?;
        Ok(Self { def, arena, raw })
    }

    pub(crate) fn from_raw(def: MessageDef<'a>, arena: &'a Arena, raw: RawMessage) -> Self {
        Self { def, arena, raw }
    }

    pub(crate) fn raw(&self) -> RawMessage {
        self.raw
    }

    pub(crate) fn layout(&self) -> &'a Layout {
        self.def.layout()
    }

    pub fn def(&self) -> MessageDef<'a> {
        self.def
    }

    pub fn arena(&self) -> &'a Arena {
        self.arena
    }

    /// Whether both handles point at the same storage.
    pub fn ptr_eq(&self, other: &Message<'_>) -> bool {
        self.raw.as_ptr() == other.raw.as_ptr()
    }

    fn locate(&self, field: &FieldDef<'_>) -> Result<(FieldDef<'a>, &'a FieldLayout), AccessError> {
        let pool = self.def.pool();
        let foreign = || AccessError::ForeignField {
            field: field.full_name().to_owned(),
            message: self.def.full_name().to_owned(),
        };
        if !std::ptr::eq(field.pool(), pool) || field.is_extension() {
            return Err(foreign());
        }
        let local = pool.field(field.index());
        if local.containing_type() != Some(self.def) {
            return Err(foreign());
        }
        let layout = local.layout().ok_or_else(foreign)?;
        Ok((local, layout))
    }

    fn locate_mode(
        &self,
        field: &FieldDef<'_>,
        mode: FieldMode,
    ) -> Result<(FieldDef<'a>, &'a FieldLayout), AccessError> {
        let (local, layout) = self.locate(field)?;
        if layout.mode != mode {
            let expected = match mode {
                FieldMode::Scalar => "singular",
                FieldMode::Repeated => "repeated",
                FieldMode::Map => "map",
            };
            return Err(AccessError::Cardinality {
                field: local.full_name().to_owned(),
                expected,
            });
        }
        Ok((local, layout))
    }

    /// Whether the field is set.
    ///
    /// Fields without explicit presence count as set when non-zero; repeated
    /// and map fields when non-empty.
    pub fn has(&self, field: &FieldDef<'_>) -> Result<bool, AccessError> {
        let (_, layout) = self.locate(field)?;
        Ok(match layout.mode {
            FieldMode::Scalar => self.raw.is_set(layout),
            FieldMode::Repeated => self.raw.array(layout).is_some_and(|a| a.len() > 0),
            FieldMode::Map => self.raw.map(layout).is_some_and(|m| m.len() > 0),
        })
    }

    /// Current value, or the field's default when unset.
    ///
    /// An unset message field reads as an empty message that is not
    /// attached to this one; use [`Message::mutable_message`] to attach.
    /// Such reads share one empty block per type until it is written.
    pub fn get(&self, field: &FieldDef<'_>) -> Result<Value<'a>, AccessError> {
        let (local, layout) = self.locate(field)?;
        match layout.mode {
            FieldMode::Repeated => Ok(Value::Array(Array::new(local, self.arena, self.raw, layout))),
            FieldMode::Map => Ok(Value::Map(Map::new(local, self.arena, self.raw, layout)?)),
            FieldMode::Scalar => {
                let explicit = layout.presence != Presence::None;
                if explicit && !self.raw.has(layout) {
                    return self.default_value(local);
                }
                match slot_value(local, self.arena, self.raw.slot(layout)) {
                    Some(value) => Ok(value),
                    None => self.default_value(local),
                }
            }
        }
    }

    fn default_value(&self, field: FieldDef<'a>) -> Result<Value<'a>, AccessError> {
        Ok(match field.default_value() {
            DefaultValue::None => match field.message_type() {
                Some(def) => {
                    let raw = RawMessage::shared_default(self.arena, def.layout())?;
                    Value::Message(Message::from_raw(def, self.arena, raw))
                }
                None => scalar_value(field.field_type(), 0),
            },
            DefaultValue::Bool(v) => Value::Bool(*v),
            DefaultValue::I32(v) => Value::I32(*v),
            DefaultValue::I64(v) => Value::I64(*v),
            DefaultValue::U32(v) => Value::U32(*v),
            DefaultValue::U64(v) => Value::U64(*v),
            DefaultValue::F32(v) => Value::F32(*v),
            DefaultValue::F64(v) => Value::F64(*v),
            DefaultValue::String(v) => Value::String(v),
            DefaultValue::Bytes(v) => Value::Bytes(v),
            DefaultValue::Enum(v) => Value::Enum(*v),
        })
    }

    /// Sets a singular field. Setting a oneof member switches the oneof to it.
    ///
    /// Strings and bytes are copied into this message's arena. A message
    /// value is stored by reference; its arena is fused with this one.
    pub fn set(&mut self, field: &FieldDef<'_>, value: Value<'_>) -> Result<(), AccessError> {
        let (local, layout) = self.locate_mode(field, FieldMode::Scalar)?;
        let slot = value_slot(self.arena, local, &value)?;
        self.raw.set_slot(layout, slot);
        self.raw.mark_present(layout);
        Ok(())
    }

    /// Resets the field to its default and clears its presence.
    pub fn clear_field(&mut self, field: &FieldDef<'_>) -> Result<(), AccessError> {
        let (_, layout) = self.locate(field)?;
        match layout.mode {
            FieldMode::Scalar => self.raw.clear_field(layout),
            FieldMode::Repeated | FieldMode::Map => self.raw.set_container(layout, std::ptr::null_mut()),
        }
        Ok(())
    }

    /// Submessage of a singular message field, created in this arena if unset.
    pub fn mutable_message(&mut self, field: &FieldDef<'_>) -> Result<Message<'a>, AccessError> {
        let (local, layout) = self.locate_mode(field, FieldMode::Scalar)?;
        let def = local.message_type().ok_or_else(|| AccessError::TypeMismatch {
            field: local.full_name().to_owned(),
            expected: local.field_type().name(),
            found: "message",
        })?;
        let child = self.raw.mutable_child(self.arena, layout, def.layout())?;
        Ok(Message::from_raw(def, self.arena, child))
    }

    /// Elements of a repeated field.
    pub fn get_array(&self, field: &FieldDef<'_>) -> Result<Array<'a>, AccessError> {
        let (local, layout) = self.locate_mode(field, FieldMode::Repeated)?;
        Ok(Array::new(local, self.arena, self.raw, layout))
    }

    /// Appends to a repeated field.
    pub fn add(&mut self, field: &FieldDef<'_>, value: Value<'_>) -> Result<(), AccessError> {
        self.get_array(field)?.push(value)
    }

    /// Appends an empty message to a repeated message field and returns it.
    pub fn add_message(&mut self, field: &FieldDef<'_>) -> Result<Message<'a>, AccessError> {
        self.get_array(field)?.push_message()
    }

    /// Entries of a map field.
    pub fn get_map(&self, field: &FieldDef<'_>) -> Result<Map<'a>, AccessError> {
        let (local, layout) = self.locate_mode(field, FieldMode::Map)?;
        Map::new(local, self.arena, self.raw, layout)
    }

    pub fn map_get(&self, field: &FieldDef<'_>, key: &MapKey) -> Result<Option<Value<'a>>, AccessError> {
        Ok(self.get_map(field)?.get(key))
    }

    /// Inserts or replaces the entry for `key`.
    pub fn map_set(
        &mut self,
        field: &FieldDef<'_>,
        key: impl Into<MapKey>,
        value: Value<'_>,
    ) -> Result<(), AccessError> {
        self.get_map(field)?.insert(key.into(), value)
    }

    /// Removes the entry for `key`, returning whether it existed.
    pub fn map_delete(&mut self, field: &FieldDef<'_>, key: &MapKey) -> Result<bool, AccessError> {
        Ok(self.get_map(field)?.remove(key))
    }

    fn locate_oneof(&self, oneof: &OneofDef<'_>) -> Result<OneofDef<'a>, AccessError> {
        let pool = self.def.pool();
        if std::ptr::eq(oneof.pool(), pool) {
            let local = pool.oneof(oneof.index());
            if local.containing_type() == self.def {
                return Ok(local);
            }
        }
        Err(AccessError::ForeignField {
            field: oneof.full_name().to_owned(),
            message: self.def.full_name().to_owned(),
        })
    }

    /// Member of `oneof` that is currently set.
    pub fn which_oneof(&self, oneof: &OneofDef<'_>) -> Result<Option<FieldDef<'a>>, AccessError> {
        let local = self.locate_oneof(oneof)?;
        let set = match local.layout() {
            Some(slot) => match self.raw.oneof_case(slot.case_offset) {
                0 => None,
                number => self.def.field_by_number(number),
            },
            None => local
                .fields()
                .find(|f| f.layout().is_some_and(|l| self.raw.has(l))),
        };
        Ok(set)
    }

    /// Clears whichever member of `oneof` is set.
    pub fn clear_oneof(&mut self, oneof: &OneofDef<'_>) -> Result<(), AccessError> {
        if let Some(field) = self.which_oneof(oneof)? {
            self.clear_field(&field)?;
        }
        Ok(())
    }

    /// Fields that are set, in field number order.
    pub fn present_fields(&self) -> impl Iterator<Item = FieldDef<'a>> + use<'a> {
        let raw = self.raw;
        let pool = self.def.pool();
        self.layout()
            .fields()
            .iter()
            .filter(move |layout| match layout.mode {
                FieldMode::Scalar => raw.is_set(layout),
                FieldMode::Repeated => raw.array(layout).is_some_and(|a| a.len() > 0),
                FieldMode::Map => raw.map(layout).is_some_and(|m| m.len() > 0),
            })
            .map(move |layout| pool.field(layout.field))
    }

    /// Records that did not match any field when parsed, in wire order.
    pub fn unknown_fields(&self) -> UnknownFields<'_> {
        UnknownFields::new(self.unknown_bytes())
    }

    /// Raw unknown-field bytes, exactly as they appeared on the wire.
    pub fn unknown_bytes(&self) -> &[u8] {
        // SAFETY: the arena outlives `self`.
        unsafe { self.raw.unknown() }
    }

    /// Appends raw, already encoded records to the unknown fields.
    pub fn append_unknown(&mut self, bytes: &[u8]) -> Result<(), AllocError> {
        self.raw.append_unknown(self.arena, bytes)
    }

    /// Drops unknown fields, optionally in every reachable submessage too.
    pub fn discard_unknown(&mut self, recursive: bool) {
        self.raw.clear_unknown();
        if !recursive {
            return;
        }
        for mut child in self.children() {
            child.discard_unknown(true);
        }
    }

    /// Every submessage reachable directly from this message.
    pub(crate) fn children(&self) -> Vec<Message<'a>> {
        let pool = self.def.pool();
        let mut children = Vec::new();
        for layout in self.layout().fields() {
            let field = pool.field(layout.field);
            match layout.mode {
                FieldMode::Scalar => {
                    if let (Some(def), true) = (field.message_type(), self.raw.has(layout))
                        && let Some(raw) = self.raw.slot(layout).message()
                    {
                        children.push(Message::from_raw(def, self.arena, raw));
                    }
                }
                FieldMode::Repeated => {
                    let array = Array::new(field, self.arena, self.raw, layout);
                    children.extend(array.iter().filter_map(Value::into_message));
                }
                FieldMode::Map => {
                    if let Ok(map) = Map::new(field, self.arena, self.raw, layout) {
                        children.extend(map.iter().filter_map(|(_, v)| v.into_message()));
                    }
                }
            }
        }
        children
    }

    /// Resets every field and drops unknown fields.
    pub fn clear(&mut self) {
        self.raw.clear(self.layout());
    }

    /// Exchanges the contents of two messages of the same type.
    ///
    /// Each message keeps its own arena; the arenas are fused so that
    /// exchanged pointers stay valid.
    pub fn swap(&mut self, other: &mut Message<'_>) -> Result<(), AccessError> {
        check_same_type(self.def, other.def)?;
        if !self.arena.is_fused(other.arena) {
            self.arena.fuse(other.arena);
        }
        self.raw.swap(other.raw, self.layout());
        Ok(())
    }
}

impl PartialEq for Message<'_> {
    fn eq(&self, other: &Self) -> bool {
        crate::compare::equal(self, other)
    }
}

impl fmt::Debug for Message<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ", self.def.full_name())?;
        let mut map = f.debug_map();
        for field in self.present_fields() {
            if let Ok(value) = self.get(&field) {
                map.entry(&field.name(), &value);
            }
        }
        map.finish()
    }
}

pub(crate) fn same_type(a: MessageDef<'_>, b: MessageDef<'_>) -> bool {
    std::ptr::eq(a.pool(), b.pool()) && a.index() == b.index()
}

pub(crate) fn check_same_type(expected: MessageDef<'_>, found: MessageDef<'_>) -> Result<(), AccessError> {
    if same_type(expected, found) {
        Ok(())
    } else {
        Err(AccessError::MessageMismatch {
            expected: expected.full_name().to_owned(),
            found: found.full_name().to_owned(),
        })
    }
}

/// Reads a slot as a value. `None` for a null submessage pointer.
pub(crate) fn slot_value<'a>(field: FieldDef<'a>, arena: &'a Arena, slot: Slot) -> Option<Value<'a>> {
    match slot {
        Slot::Bits(bits) => Some(scalar_value(field.field_type(), bits)),
        // SAFETY: the view lives in `arena`, which is borrowed for `'a`.
        Slot::Str(view) => Some(str_value(field.field_type(), unsafe { view.bytes() })),
        Slot::Message(ptr) => {
            let raw = RawMessage::from_ptr(ptr)?;
            Some(Value::Message(Message::from_raw(field.message_type()?, arena, raw)))
        }
    }
}

/// Checks `value` against `field` and converts it to a slot owned by `arena`.
pub(crate) fn value_slot(arena: &Arena, field: FieldDef<'_>, value: &Value<'_>) -> Result<Slot, AccessError> {
    let field_type = field.field_type();
    let mismatch = || AccessError::TypeMismatch {
        field: field.full_name().to_owned(),
        expected: field_type.name(),
        found: value.kind_name(),
    };
    match (field_type, value) {
        (FieldType::String, Value::String(s)) => Ok(Slot::Str(StrView::copy_in(arena, s.as_bytes())?)),
        (FieldType::Bytes, Value::Bytes(b)) => Ok(Slot::Str(StrView::copy_in(arena, b)?)),
        (FieldType::Message | FieldType::Group, Value::Message(m)) => {
            let expected = field.message_type().ok_or_else(mismatch)?;
            check_same_type(expected, m.def())?;
            if !arena.is_fused(m.arena()) {
                arena.fuse(m.arena());
            }
            m.raw().unshare(m.arena(), m.def().layout());
            Ok(Slot::Message(m.raw().as_ptr()))
        }
        (FieldType::Enum, Value::Enum(number)) => {
            if let Some(enum_type) = field.enum_type()
                && !enum_type.accepts(*number)
            {
                return Err(AccessError::UnknownEnumValue {
                    enum_name: enum_type.full_name().to_owned(),
                    number: *number,
                });
            }
            Ok(Slot::Bits(u64::from(*number as u32)))
        }
        _ => scalar_bits(field_type, value).map(Slot::Bits).ok_or_else(mismatch),
    }
}
