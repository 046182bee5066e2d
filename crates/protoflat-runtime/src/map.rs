use std::fmt;

use protoflat_core::Arena;
use protoflat_schema::{FieldDef, FieldLayout};

use crate::error::AccessError;
use crate::message::{Message, slot_value, value_slot};
use crate::storage::{RawMap, RawMessage, Slot};
use crate::value::{MapKey, Value};

/// View of a map field.
///
/// Entries iterate in insertion order; replacing a value keeps the key's
/// position.
#[derive(Clone)]
pub struct Map<'a> {
    field: FieldDef<'a>,
    key: FieldDef<'a>,
    value: FieldDef<'a>,
    arena: &'a Arena,
    owner: RawMessage,
    layout: &'a FieldLayout,
}

impl<'a> Map<'a> {
    pub(crate) fn new(
        field: FieldDef<'a>,
        arena: &'a Arena,
        owner: RawMessage,
        layout: &'a FieldLayout,
    ) -> Result<Self, AccessError> {
        let entry = field.message_type();
        let key = entry.and_then(|e| e.map_key());
        let value = entry.and_then(|e| e.map_value());
        let (Some(key), Some(value)) = (key, value) else {
            return Err(AccessError::Cardinality {
                field: field.full_name().to_owned(),
                expected: "map",
            });
        };
        Ok(Self {
            field,
            key,
            value,
            arena,
            owner,
            layout,
        })
    }

    pub fn field(&self) -> FieldDef<'a> {
        self.field
    }

    pub fn key_field(&self) -> FieldDef<'a> {
        self.key
    }

    pub fn value_field(&self) -> FieldDef<'a> {
        self.value
    }

    fn raw(&self) -> Option<RawMap> {
        self.owner.map(self.layout)
    }

    pub fn len(&self) -> usize {
        self.raw().map_or(0, RawMap::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn slot(&self, key: &MapKey) -> Option<Slot> {
        // SAFETY: the borrow ends inside this call.
        self.raw().and_then(|raw| unsafe { raw.entries() }.get(key).copied())
    }

    pub fn get(&self, key: &MapKey) -> Option<Value<'a>> {
        slot_value(self.value, self.arena, self.slot(key)?)
    }

    pub fn contains_key(&self, key: &MapKey) -> bool {
        self.slot(key).is_some()
    }

    fn check_key(&self, key: &MapKey) -> Result<(), AccessError> {
        if key.fits(self.key.field_type()) {
            return Ok(());
        }
        Err(AccessError::TypeMismatch {
            field: self.field.full_name().to_owned(),
            expected: self.key.field_type().name(),
            found: key.kind_name(),
        })
    }

    /// Inserts or replaces the value stored under `key`.
    pub fn insert(&mut self, key: MapKey, value: Value<'_>) -> Result<(), AccessError> {
        self.check_key(&key)?;
        let slot = value_slot(self.arena, self.value, &value)?;
        self.insert_slot(key, slot)
    }

    pub(crate) fn insert_slot(&mut self, key: MapKey, slot: Slot) -> Result<(), AccessError> {
        let raw = self.owner.mutable_map(self.arena, self.layout)?;
        // SAFETY: the borrow ends inside this call.
        unsafe { raw.entries() }.insert(key, slot);
        Ok(())
    }

    /// Message stored under `key`, inserting an empty one if absent.
    pub fn entry_message(&mut self, key: MapKey) -> Result<Message<'a>, AccessError> {
        self.check_key(&key)?;
        let def = self.value.message_type().ok_or_else(|| AccessError::TypeMismatch {
            field: self.field.full_name().to_owned(),
            expected: self.value.field_type().name(),
            found: "message",
        })?;
        if let Some(raw) = self.slot(&key).and_then(Slot::message) {
            return Ok(Message::from_raw(def, self.arena, raw));
        }
        let child = RawMessage::alloc(self.arena, def.layout())?;
        self.insert_slot(key, Slot::Message(child.as_ptr()))?;
        Ok(Message::from_raw(def, self.arena, child))
    }

    /// Removes `key`, returning whether it was present.
    pub fn remove(&mut self, key: &MapKey) -> bool {
        // SAFETY: the borrow ends inside this call.
        self.raw()
            .is_some_and(|raw| unsafe { raw.entries() }.shift_remove(key).is_some())
    }

    pub fn clear(&mut self) {
        if let Some(raw) = self.raw() {
            // SAFETY: the borrow ends inside this call.
            unsafe { raw.entries() }.clear();
        }
    }

    /// Snapshot of the entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (MapKey, Value<'a>)> + use<'a> {
        let entries: Vec<(MapKey, Slot)> = match self.raw() {
            // SAFETY: the borrow ends before the snapshot is returned.
            Some(raw) => unsafe { raw.entries() }
                .iter()
                .map(|(k, v)| (k.clone(), *v))
                .collect(),
            None => Vec::new(),
        };
        let (value, arena) = (self.value, self.arena);
        entries
            .into_iter()
            .filter_map(move |(k, slot)| Some((k, slot_value(value, arena, slot)?)))
    }

    /// Snapshot of the entries sorted by key.
    pub fn sorted(&self) -> Vec<(MapKey, Value<'a>)> {
        let mut entries: Vec<_> = self.iter().collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }
}

impl PartialEq for Map<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .iter()
                .all(|(key, value)| other.get(&key).is_some_and(|v| v == value))
    }
}

impl fmt::Debug for Map<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}
