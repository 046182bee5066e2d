use protoflat_schema::{FieldMode, MessageDef};

use crate::message::Message;
use crate::storage::{RawMessage, Slot};

/// Paths of every unset required field, in field number order.
///
/// Paths name submessages by field, array elements by index and map values
/// by key: `a.b`, `items[2].id`, `by_name["x"].id`. Decoding never fails on
/// missing required fields; call this when completeness matters.
pub fn check_initialized(message: &Message<'_>) -> Vec<String> {
    let mut missing = Vec::new();
    collect(message.def(), message.raw(), "", &mut missing);
    missing
}

impl Message<'_> {
    /// Whether every required field is set, recursively.
    pub fn is_initialized(&self) -> bool {
        check_initialized(self).is_empty()
    }
}

fn collect(def: MessageDef<'_>, raw: RawMessage, prefix: &str, missing: &mut Vec<String>) {
    let pool = def.pool();
    for layout in def.layout().fields() {
        let field = pool.field(layout.field);
        let name = field.name();
        if field.is_required() && !raw.has(layout) {
            missing.push(format!("{prefix}{name}"));
        }
        let Some(sub) = layout.submessage.map(|index| pool.message(index)) else {
            continue;
        };
        match layout.mode {
            FieldMode::Scalar => {
                if raw.has(layout)
                    && let Some(child) = raw.slot(layout).message()
                {
                    collect(sub, child, &format!("{prefix}{name}."), missing);
                }
            }
            FieldMode::Repeated => {
                let Some(array) = raw.array(layout) else {
                    continue;
                };
                for i in 0..array.len() {
                    if let Some(child) = array.get(i, layout.field_type).message() {
                        collect(sub, child, &format!("{prefix}{name}[{i}]."), missing);
                    }
                }
            }
            FieldMode::Map => {
                let (Some(map), Some(value)) = (raw.map(layout), sub.map_value()) else {
                    continue;
                };
                let Some(value_type) = value.message_type() else {
                    continue;
                };
                // SAFETY: the borrow ends once the snapshot is collected.
                let entries: Vec<_> = unsafe { map.entries() }
                    .iter()
                    .filter_map(|(k, v)| Some((k.clone(), Slot::message(*v)?)))
                    .collect();
                for (key, child) in entries {
                    collect(value_type, child, &format!("{prefix}{name}[{key}]."), missing);
                }
            }
        }
    }
}
