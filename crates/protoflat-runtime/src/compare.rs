//! Field-wise message equality.
//!
//! Two messages are equal when they have the same type, the same set of
//! present fields with equal values, and byte-identical unknown fields.
//! Floating point values compare by bit pattern.

use protoflat_schema::{FieldLayout, FieldMode, MessageDef};

use crate::message::{Message, same_type};
use crate::storage::{RawMessage, Slot};
use crate::value::Value;

pub fn equal(a: &Message<'_>, b: &Message<'_>) -> bool {
    same_type(a.def(), b.def()) && (a.ptr_eq(b) || messages_equal(a.def(), a.raw(), b.raw()))
}

pub(crate) fn value_equal(a: &Value<'_>, b: &Value<'_>) -> bool {
    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::I32(x), Value::I32(y)) | (Value::Enum(x), Value::Enum(y)) => x == y,
        (Value::I64(x), Value::I64(y)) => x == y,
        (Value::U32(x), Value::U32(y)) => x == y,
        (Value::U64(x), Value::U64(y)) => x == y,
        (Value::F32(x), Value::F32(y)) => x.to_bits() == y.to_bits(),
        (Value::F64(x), Value::F64(y)) => x.to_bits() == y.to_bits(),
        (Value::String(x), Value::String(y)) => x == y,
        (Value::Bytes(x), Value::Bytes(y)) => x == y,
        (Value::Message(x), Value::Message(y)) => equal(x, y),
        (Value::Array(x), Value::Array(y)) => x == y,
        (Value::Map(x), Value::Map(y)) => x == y,
        _ => false,
    }
}

fn messages_equal(def: MessageDef<'_>, a: RawMessage, b: RawMessage) -> bool {
    if a == b {
        return true;
    }
    let fields_equal = def.layout().fields().iter().all(|field| match field.mode {
        FieldMode::Scalar => match (a.is_set(field), b.is_set(field)) {
            (true, true) => slots_equal(def, field, a.slot(field), b.slot(field)),
            (x, y) => x == y,
        },
        FieldMode::Repeated => {
            let (x, y) = (a.array(field), b.array(field));
            let len = x.map_or(0, |x| x.len());
            if len != y.map_or(0, |y| y.len()) {
                return false;
            }
            let (Some(x), Some(y)) = (x, y) else {
                return true;
            };
            (0..len).all(|i| {
                slots_equal(def, field, x.get(i, field.field_type), y.get(i, field.field_type))
            })
        }
        FieldMode::Map => maps_equal(def, field, a, b),
    });
    // SAFETY: both arenas are alive for the call.
    fields_equal && unsafe { a.unknown() == b.unknown() }
}

fn maps_equal(def: MessageDef<'_>, field: &FieldLayout, a: RawMessage, b: RawMessage) -> bool {
    let (x, y) = (a.map(field), b.map(field));
    if x.map_or(0, |x| x.len()) != y.map_or(0, |y| y.len()) {
        return false;
    }
    let (Some(x), Some(y)) = (x, y) else {
        return true;
    };
    if x == y {
        return true;
    }
    let Some(value) = field
        .submessage
        .and_then(|index| def.pool().message(index).map_value()?.layout())
    else {
        return false;
    };
    // SAFETY: the maps are distinct and both borrows end before returning.
    let (xs, ys) = unsafe { (&*x.entries(), &*y.entries()) };
    xs.iter()
        .all(|(key, vx)| ys.get(key).is_some_and(|vy| slots_equal(def, value, *vx, *vy)))
}

fn slots_equal(def: MessageDef<'_>, field: &FieldLayout, a: Slot, b: Slot) -> bool {
    match (a, b) {
        (Slot::Bits(x), Slot::Bits(y)) => x == y,
        // SAFETY: the views outlive this call.
        (Slot::Str(x), Slot::Str(y)) => unsafe { x.bytes() == y.bytes() },
        (Slot::Message(_), Slot::Message(_)) => match (a.message(), b.message(), field.submessage) {
            (Some(x), Some(y), Some(index)) => messages_equal(def.pool().message(index), x, y),
            (None, None, _) => true,
            _ => false,
        },
        _ => false,
    }
}
