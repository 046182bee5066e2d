use std::fmt;

use protoflat_core::Arena;
use protoflat_schema::{FieldDef, FieldLayout};

use crate::error::AccessError;
use crate::message::{Message, slot_value, value_slot};
use crate::storage::{RawArray, RawMessage, Slot};
use crate::value::Value;

/// View of a repeated field.
///
/// The element buffer is created on the first push, so a view of an empty
/// field costs nothing.
#[derive(Clone)]
pub struct Array<'a> {
    field: FieldDef<'a>,
    arena: &'a Arena,
    owner: RawMessage,
    layout: &'a FieldLayout,
}

impl<'a> Array<'a> {
    pub(crate) fn new(
        field: FieldDef<'a>,
        arena: &'a Arena,
        owner: RawMessage,
        layout: &'a FieldLayout,
    ) -> Self {
        Self {
            field,
            arena,
            owner,
            layout,
        }
    }

    pub fn field(&self) -> FieldDef<'a> {
        self.field
    }

    fn raw(&self) -> Option<RawArray> {
        self.owner.array(self.layout)
    }

    pub fn len(&self) -> usize {
        self.raw().map_or(0, RawArray::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, index: usize) -> Option<Value<'a>> {
        let raw = self.raw().filter(|raw| index < raw.len())?;
        slot_value(self.field, self.arena, raw.get(index, self.layout.field_type))
    }

    pub fn iter(&self) -> impl Iterator<Item = Value<'a>> + use<'a> {
        let this = self.clone();
        (0..self.len()).filter_map(move |i| this.get(i))
    }

    pub fn push(&mut self, value: Value<'_>) -> Result<(), AccessError> {
        let slot = value_slot(self.arena, self.field, &value)?;
        self.push_slot(slot)
    }

    pub(crate) fn push_slot(&mut self, slot: Slot) -> Result<(), AccessError> {
        let raw = self.owner.mutable_array(self.arena, self.layout)?;
        raw.push(self.arena, self.layout.field_type, slot)?;
        Ok(())
    }

    /// Appends an empty message and returns it.
    pub fn push_message(&mut self) -> Result<Message<'a>, AccessError> {
        let def = self.field.message_type().ok_or_else(|| AccessError::TypeMismatch {
            field: self.field.full_name().to_owned(),
            expected: self.field.field_type().name(),
            found: "message",
        })?;
        let child = RawMessage::alloc(self.arena, def.layout())?;
        self.push_slot(Slot::Message(child.as_ptr()))?;
        Ok(Message::from_raw(def, self.arena, child))
    }

    pub fn set(&mut self, index: usize, value: Value<'_>) -> Result<(), AccessError> {
        let len = self.len();
        let raw = self
            .raw()
            .filter(|_| index < len)
            .ok_or_else(|| AccessError::OutOfBounds {
                field: self.field.full_name().to_owned(),
                index,
                len,
            })?;
        let slot = value_slot(self.arena, self.field, &value)?;
        raw.set(index, self.layout.field_type, slot);
        Ok(())
    }

    pub fn truncate(&mut self, len: usize) {
        if let Some(raw) = self.raw() {
            raw.truncate(len);
        }
    }

    pub fn clear(&mut self) {
        self.truncate(0);
    }
}

impl PartialEq for Array<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().zip(other.iter()).all(|(a, b)| a == b)
    }
}

impl fmt::Debug for Array<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}
