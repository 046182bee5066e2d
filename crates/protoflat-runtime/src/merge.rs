//! Merge and deep copy.
//!
//! Merging follows wire semantics: set singular scalars overwrite, set
//! singular messages merge recursively, repeated fields append, map entries
//! replace per key, and unknown records append. Everything written into
//! the destination is copied into the destination's arena.

use protoflat_core::{AllocError, Arena};
use protoflat_schema::{FieldLayout, FieldMode, MessageDef};

use crate::error::AccessError;
use crate::message::{Message, check_same_type};
use crate::storage::{RawMessage, Slot, StrView};

/// Merges `src` into `dst`. Both must have the same type.
pub fn merge(dst: &mut Message<'_>, src: &Message<'_>) -> Result<(), AccessError> {
    check_same_type(dst.def(), src.def())?;
    merge_raw(dst.arena(), dst.def(), dst.raw(), src.raw())?;
    Ok(())
}

/// Copies `src` and everything reachable from it into `arena`.
pub fn deep_copy<'a>(src: &Message<'a>, arena: &'a Arena) -> Result<Message<'a>, AllocError> {
    let def = src.def();
    let copy = RawMessage::alloc(arena, def.layout())?;
    merge_raw(arena, def, copy, src.raw())?;
    Ok(Message::from_raw(def, arena, copy))
}

fn merge_raw(arena: &Arena, def: MessageDef<'_>, dst: RawMessage, src: RawMessage) -> Result<(), AllocError> {
    if dst == src {
        // Appending a message to itself would read what it is writing.
        let snapshot = RawMessage::alloc(arena, def.layout())?;
        merge_raw(arena, def, snapshot, src)?;
        return merge_raw(arena, def, dst, snapshot);
    }
    for field in def.layout().fields() {
        match field.mode {
            FieldMode::Scalar if src.is_set(field) => merge_singular(arena, def, dst, src, field)?,
            FieldMode::Scalar => {}
            FieldMode::Repeated => {
                let Some(from) = src.array(field).filter(|a| a.len() > 0) else {
                    continue;
                };
                let to = dst.mutable_array(arena, field)?;
                let len = from.len();
                for i in 0..len {
                    let slot = copy_slot(arena, def, field, from.get(i, field.field_type))?;
                    to.push(arena, field.field_type, slot)?;
                }
            }
            FieldMode::Map => {
                let Some(from) = src.map(field).filter(|m| m.len() > 0) else {
                    continue;
                };
                let Some(value) = field
                    .submessage
                    .and_then(|index| def.pool().message(index).map_value()?.layout())
                else {
                    continue;
                };
                // SAFETY: the borrow ends once the snapshot is collected.
                let entries: Vec<_> = unsafe { from.entries() }
                    .iter()
                    .map(|(k, v)| (k.clone(), *v))
                    .collect();
                let to = dst.mutable_map(arena, field)?;
                for (key, slot) in entries {
                    let slot = copy_slot(arena, def, value, slot)?;
                    // SAFETY: no other borrow of the destination map is live.
                    unsafe { to.entries() }.insert(key, slot);
                }
            }
        }
    }
    // SAFETY: appends never write below the current length, so the slice stays valid
    // even when `src` and `dst` are the same block.
    let unknown = unsafe { src.unknown() };
    dst.append_unknown(arena, unknown)
}

fn merge_singular(
    arena: &Arena,
    def: MessageDef<'_>,
    dst: RawMessage,
    src: RawMessage,
    field: &FieldLayout,
) -> Result<(), AllocError> {
    let slot = src.slot(field);
    if let (Slot::Message(_), Some(index)) = (slot, field.submessage) {
        let sub = def.pool().message(index);
        if let Some(from) = slot.message() {
            let to = dst.mutable_child(arena, field, sub.layout())?;
            merge_raw(arena, sub, to, from)?;
        }
        return Ok(());
    }
    dst.set_slot(field, copy_slot(arena, def, field, slot)?);
    dst.mark_present(field);
    Ok(())
}

/// Copies one value into `arena`. Submessages are copied deeply.
fn copy_slot(arena: &Arena, def: MessageDef<'_>, field: &FieldLayout, slot: Slot) -> Result<Slot, AllocError> {
    Ok(match slot {
        Slot::Bits(_) => slot,
        // SAFETY: the source view outlives this call.
        Slot::Str(view) => Slot::Str(StrView::copy_in(arena, unsafe { view.bytes() })?),
        Slot::Message(_) => match (slot.message(), field.submessage) {
            (Some(from), Some(index)) => {
                let sub = def.pool().message(index);
                let copy = RawMessage::alloc(arena, sub.layout())?;
                merge_raw(arena, sub, copy, from)?;
                Slot::Message(copy.as_ptr())
            }
            _ => slot,
        },
    })
}
