//! Flat in-memory layout of a message body.
//!
//! ```text
//! [hasbits][oneof case words][fields by size class, then field number]
//! ```
//!
//! Bit 0 of the hasbit table is never assigned, so an all-zero presence slot
//! means "no presence". Required fields take the lowest bits. Real oneofs get
//! one 32-bit case word each (holding the set field number, 0 = unset) and one
//! shared payload slot sized to their largest member.
//!
//! Map entry messages always use the same fixed shape, so the decoder can
//! handle every entry through a single code path.


use protoflat_core::{FieldType, Label, StorageClass};

use crate::pool::{EnumIndex, FieldIndex, MessageIndex, OneofIndex};

/// Offset of the key slot inside a map entry.
pub const MAP_ENTRY_KEY_OFFSET: u32 = 8;
/// Offset of the value slot inside a map entry.
pub const MAP_ENTRY_VALUE_OFFSET: u32 = 24;
/// Body size of every map entry.
pub const MAP_ENTRY_SIZE: u32 = 40;

/// How presence of a singular field is tracked.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Presence {
    /// Implicit presence (proto3 scalar) or repeated field.
    None,
    /// Bit index into the hasbit table.
    Hasbit(u32),
    /// Member of a real oneof; the case word lives at `case_offset`.
    Oneof { case_offset: u32 },
}

/// Storage shape of a field slot.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum FieldMode {
    Scalar,
    /// Pointer to an array header.
    Repeated,
    /// Pointer to a map.
    Map,
}

/// Everything the decoder and encoder need to know about one field.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct FieldLayout {
    pub number: u32,
    pub offset: u32,
    pub presence: Presence,
    pub field_type: FieldType,
    pub mode: FieldMode,
    /// Repeated values are written packed.
    pub packed: bool,
    /// Message type of message/group fields, entry type of map fields.
    pub submessage: Option<MessageIndex>,
    /// Set for enum fields whose enum rejects unknown numbers.
    pub closed_enum: Option<EnumIndex>,
    pub field: FieldIndex,
}

impl FieldLayout {
    pub fn is_repeated(&self) -> bool {
        self.mode != FieldMode::Scalar
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct OneofLayout {
    pub oneof: OneofIndex,
    pub case_offset: u32,
    pub data_offset: u32,
}

#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct Layout {
    size: u32,
    align: u32,
    hasbit_bytes: u32,
    required_count: u32,
    /// Sorted by field number.
    fields: Vec<FieldLayout>,
    oneofs: Vec<OneofLayout>,
}

impl Layout {
    /// Body size in bytes, a multiple of `align()`.
    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn align(&self) -> u32 {
        self.align
    }

    pub fn hasbit_bytes(&self) -> u32 {
        self.hasbit_bytes
    }

    /// Required fields own hasbits `1..=required_count`.
    pub fn required_count(&self) -> u32 {
        self.required_count
    }

    pub fn fields(&self) -> &[FieldLayout] {
        &self.fields
    }

    pub fn oneofs(&self) -> &[OneofLayout] {
        &self.oneofs
    }

    pub fn field_by_number(&self, number: u32) -> Option<&FieldLayout> {
        self.fields
            .binary_search_by_key(&number, |f| f.number)
            .ok()
            .map(|i| &self.fields[i])
    }
}

/// Per-field input to layout computation.
#[derive(Clone, Copy, Debug)]
pub(crate) struct FieldInput {
    pub index: FieldIndex,
    pub number: u32,
    pub field_type: FieldType,
    pub label: Label,
    pub mode: FieldMode,
    pub packed: bool,
    pub has_presence: bool,
    /// Real (non-synthetic) oneof the field belongs to.
    pub oneof: Option<OneofIndex>,
    pub submessage: Option<MessageIndex>,
    pub closed_enum: Option<EnumIndex>,
}

impl FieldInput {
    fn storage(&self) -> StorageClass {
        match self.mode {
            FieldMode::Scalar => self.field_type.storage(),
            FieldMode::Repeated | FieldMode::Map => StorageClass::Ptr,
        }
    }

    fn layout(&self, offset: u32, presence: Presence) -> FieldLayout {
        FieldLayout {
            number: self.number,
            offset,
            presence,
            field_type: self.field_type,
            mode: self.mode,
            packed: self.packed,
            submessage: self.submessage,
            closed_enum: self.closed_enum,
            field: self.index,
        }
    }
}

enum Item {
    Field(usize),
    Oneof(usize),
}

fn align_up(offset: u32, align: u32) -> u32 {
    offset.div_ceil(align) * align
}

impl Layout {
    /// Computes the layout for a message with the given fields and real oneofs.
    pub(crate) fn build(is_map_entry: bool, fields: &[FieldInput], oneofs: &[OneofIndex]) -> Layout {
        let mut fields: Vec<FieldInput> = fields.to_vec();
        fields.sort_by_key(|f| f.number);

        if is_map_entry
            && let [key, value] = fields.as_slice()
            && key.number == 1
            && value.number == 2
        {
            return Self::map_entry(key, value);
        }

        // Hasbits: required fields first, then other presence-tracked fields.
        let mut hasbits: Vec<Option<u32>> = vec![None; fields.len()];
        let mut next_bit: u32 = 1;
        let mut required_count = 0;
        for pass_required in [true, false] {
            for (i, f) in fields.iter().enumerate() {
                let tracked = f.has_presence && f.oneof.is_none() && f.mode == FieldMode::Scalar;
                if tracked && (f.label == Label::Required) == pass_required {
                    hasbits[i] = Some(next_bit);
                    next_bit += 1;
                    if pass_required {
                        required_count += 1;
                    }
                }
            }
        }
        let hasbit_count = next_bit - 1;
        let hasbit_bytes = if hasbit_count == 0 {
            0
        } else {
            (hasbit_count + 1).div_ceil(8)
        };

        let mut offset = hasbit_bytes;
        let mut max_align = 1;
        let mut oneof_layouts: Vec<OneofLayout> = Vec::with_capacity(oneofs.len());
        if !oneofs.is_empty() {
            offset = align_up(offset, 4);
            max_align = 4;
            for &oneof in oneofs {
                oneof_layouts.push(OneofLayout {
                    oneof,
                    case_offset: offset,
                    data_offset: 0,
                });
                offset += 4;
            }
        }

        // One item per non-oneof field and one per oneof payload.
        let mut items: Vec<(u32, u32, u32, Item)> = Vec::new();
        for (i, f) in fields.iter().enumerate() {
            if f.oneof.is_none() {
                let storage = f.storage();
                items.push((storage.size() as u32, storage.align() as u32, f.number, Item::Field(i)));
            }
        }
        for (o, oneof) in oneofs.iter().enumerate() {
            let members = fields.iter().filter(|f| f.oneof == Some(*oneof));
            let (mut size, mut align, mut first) = (0u32, 1u32, u32::MAX);
            for m in members {
                let storage = m.storage();
                size = size.max(storage.size() as u32);
                align = align.max(storage.align() as u32);
                first = first.min(m.number);
            }
            if first != u32::MAX {
                items.push((size, align, first, Item::Oneof(o)));
            }
        }
        items.sort_by(|a, b| b.0.cmp(&a.0).then(a.2.cmp(&b.2)));

        let mut offsets = vec![0u32; fields.len()];
        for (size, align, _, item) in &items {
            offset = align_up(offset, *align);
            max_align = max_align.max(*align);
            match item {
                Item::Field(i) => offsets[*i] = offset,
                Item::Oneof(o) => oneof_layouts[*o].data_offset = offset,
            }
            offset += size;
        }

        let field_layouts = fields
            .iter()
            .enumerate()
            .map(|(i, f)| match f.oneof {
                Some(oneof) => {
                    let slot = oneof_layouts.iter().find(|o| o.oneof == oneof);
                    let (case_offset, data_offset) =
                        slot.map_or((0, 0), |o| (o.case_offset, o.data_offset));
                    f.layout(data_offset, Presence::Oneof { case_offset })
                }
                None => {
                    let presence = hasbits[i].map_or(Presence::None, Presence::Hasbit);
                    f.layout(offsets[i], presence)
                }
            })
            .collect();

        Layout {
            size: align_up(offset, max_align),
            align: max_align,
            hasbit_bytes,
            required_count,
            fields: field_layouts,
            oneofs: oneof_layouts,
        }
    }

    fn map_entry(key: &FieldInput, value: &FieldInput) -> Layout {
        let presence = |f: &FieldInput, bit| {
            if f.has_presence {
                Presence::Hasbit(bit)
            } else {
                Presence::None
            }
        };
        Layout {
            size: MAP_ENTRY_SIZE,
            align: 8,
            hasbit_bytes: MAP_ENTRY_KEY_OFFSET,
            required_count: 0,
            fields: vec![
                key.layout(MAP_ENTRY_KEY_OFFSET, presence(key, 1)),
                value.layout(MAP_ENTRY_VALUE_OFFSET, presence(value, 2)),
            ],
            oneofs: Vec::new(),
        }
    }
}
