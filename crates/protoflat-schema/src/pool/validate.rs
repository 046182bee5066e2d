//! Checks that need the whole file resolved.

use std::collections::HashMap;

use protoflat_core::{FieldType, Label, Syntax};
use protoflat_wire::MAX_FIELD_NUMBER;

use super::build::{Builder, label_name};
use super::data::*;
use super::store::Store;
use super::text::map_entry_name;
use crate::diagnostics::DiagnosticKind;

/// Field numbers the wire format reserves for the implementation.
const IMPLEMENTATION_RESERVED: std::ops::RangeInclusive<i32> = 19000..=19999;

impl Builder<'_> {
    pub(super) fn validate(&mut self) {
        self.validate_fields();
        for local in 0..self.staged.messages.len() {
            let index = MessageIndex((self.base.messages + local) as u32);
            self.validate_message(index);
            if self.staged.messages[local].is_map_entry {
                self.validate_map_entry(index);
            }
        }
        for local in 0..self.staged.enums.len() {
            self.validate_enum(local);
        }
    }

    fn validate_fields(&mut self) {
        let fields = std::mem::take(&mut self.fields);
        for pending in &fields {
            let f = self.field_data(pending.index).clone();

            match pending.number {
                None => self
                    .diag
                    .report(DiagnosticKind::InvalidFieldNumber, f.full_name.clone())
                    .message(format!("`{}` has no number", f.name))
                    .emit(),
                Some(n) if n <= 0 || n as u32 > MAX_FIELD_NUMBER => self
                    .diag
                    .report(DiagnosticKind::InvalidFieldNumber, f.full_name.clone())
                    .message(format!("{n} is out of range"))
                    .emit(),
                Some(n) if IMPLEMENTATION_RESERVED.contains(&n) => self
                    .diag
                    .report(DiagnosticKind::InvalidFieldNumber, f.full_name.clone())
                    .message(format!("{n} is reserved for the wire format"))
                    .emit(),
                Some(_) => {}
            }

            if f.label == Label::Required {
                if self.syntax == Syntax::Proto3 {
                    self.diag
                        .report(DiagnosticKind::Proto3Required, f.full_name.clone())
                        .emit();
                } else if f.is_extension {
                    self.diag
                        .report(DiagnosticKind::InvalidLabel, f.full_name.clone())
                        .message("extensions cannot be required")
                        .emit();
                }
            }

            if self.syntax == Syntax::Proto3 {
                if f.field_type == FieldType::Group {
                    self.diag
                        .report(DiagnosticKind::InvalidFieldType, f.full_name.clone())
                        .message("groups are not supported in proto3")
                        .emit();
                }
                if !f.is_extension
                    && let Some(e) = f.enum_type
                    && self.enum_data(e).is_closed
                {
                    let enum_name = self.enum_data(e).full_name.clone();
                    self.diag
                        .report(DiagnosticKind::InvalidFieldType, f.full_name.clone())
                        .message(format!(
                            "`{enum_name}` is a proto2 enum and cannot be used in a proto3 message"
                        ))
                        .emit();
                }
            }

            if f.oneof.is_some() && f.label != Label::Optional {
                self.diag
                    .report(DiagnosticKind::InvalidOneofMember, f.full_name.clone())
                    .message(format!("`{}` cannot be {}", f.name, label_name(f.label)))
                    .emit();
            }

            if f.proto3_optional {
                let problem = if self.syntax != Syntax::Proto3 {
                    Some("proto3 optional is only allowed in proto3 files")
                } else if f.label != Label::Optional {
                    Some("proto3 optional fields must be singular")
                } else if f.oneof.is_none() {
                    Some("proto3 optional fields need a synthetic oneof")
                } else {
                    None
                };
                if let Some(problem) = problem {
                    self.diag
                        .report(DiagnosticKind::SyntheticOneofShape, f.full_name.clone())
                        .message(problem)
                        .emit();
                }
            }

            if f.is_extension
                && let Some(extendee) = f.containing
            {
                self.validate_extension(pending.index, &f, extendee);
            }

            if let Some(entry) = f.message_type
                && self.message_data(entry).is_map_entry
            {
                self.validate_map_field(&f, entry);
            }
        }
        self.fields = fields;
    }

    fn validate_extension(&mut self, index: FieldIndex, f: &FieldData, extendee: MessageIndex) {
        let message = self.message_data(extendee);
        let extendee_name = message.full_name.clone();
        let in_range = message
            .extension_ranges
            .iter()
            .any(|&(start, end)| (start..end).contains(&f.number));
        if !in_range {
            self.diag
                .report(DiagnosticKind::ExtensionOutOfRange, f.full_name.clone())
                .message(format!("{} is not an extension number of `{extendee_name}`", f.number))
                .emit();
            return;
        }

        let key = (extendee, f.number);
        let previous = self
            .extensions
            .get(&key)
            .copied()
            .or_else(|| self.pool.lookup_extension(extendee, f.number));
        match previous {
            Some(previous) => {
                let previous_name = self.field_data(previous).full_name.clone();
                self.diag
                    .report(DiagnosticKind::DuplicateFieldNumber, f.full_name.clone())
                    .message(format!(
                        "{} of `{extendee_name}` is already used by `{previous_name}`",
                        f.number
                    ))
                    .emit();
            }
            None => {
                self.extensions.insert(key, index);
            }
        }
    }

    fn validate_map_field(&mut self, f: &FieldData, entry: MessageIndex) {
        let entry_data = self.message_data(entry);
        let entry_name = entry_data.name.clone();
        let entry_parent = entry_data.parent;

        let problem = if f.label != Label::Repeated {
            Some(format!("`{}` must be repeated", f.name))
        } else if f.is_extension || entry_parent != f.containing {
            Some("map entry types must be nested in the message that uses them".to_owned())
        } else if entry_name != map_entry_name(&f.name) {
            Some(format!(
                "entry type should be named `{}`",
                map_entry_name(&f.name)
            ))
        } else {
            None
        };
        if let Some(problem) = problem {
            self.diag
                .report(DiagnosticKind::InvalidMapEntry, f.full_name.clone())
                .message(problem)
                .emit();
        }
    }

    fn validate_map_entry(&mut self, index: MessageIndex) {
        let message = self.own_message(index);
        let full_name = message.full_name.clone();
        let has_extras = !message.nested_messages.is_empty()
            || !message.nested_enums.is_empty()
            || !message.extensions.is_empty()
            || !message.oneofs.is_empty()
            || !message.extension_ranges.is_empty();

        let fields: Vec<&FieldData> = message.fields.iter().map(|&f| self.field_data(f)).collect();
        let shape_ok = match fields.as_slice() {
            [key, value] => {
                key.name == "key"
                    && key.number == 1
                    && key.label == Label::Optional
                    && value.name == "value"
                    && value.number == 2
                    && value.label == Label::Optional
            }
            _ => false,
        };
        let key_type = fields.first().map(|f| f.field_type);
        let value_type = fields.get(1).map(|f| f.field_type);

        if !shape_ok || has_extras {
            self.diag
                .report(DiagnosticKind::InvalidMapEntry, full_name)
                .message("map entries contain exactly `key = 1` and `value = 2`")
                .emit();
            return;
        }
        if let Some(key_type) = key_type
            && matches!(
                key_type,
                FieldType::Float
                    | FieldType::Double
                    | FieldType::Bytes
                    | FieldType::Message
                    | FieldType::Group
                    | FieldType::Enum
            )
        {
            self.diag
                .report(DiagnosticKind::InvalidMapEntry, full_name.clone())
                .message(format!("{} is not a valid map key type", key_type.name()))
                .emit();
        }
        if value_type == Some(FieldType::Group) {
            self.diag
                .report(DiagnosticKind::InvalidMapEntry, full_name)
                .message("map values cannot be groups")
                .emit();
        }
    }

    fn validate_message(&mut self, index: MessageIndex) {
        let message = self.own_message(index).clone();

        let mut numbers: HashMap<u32, &str> = HashMap::new();
        let mut problems = Vec::new();
        for &fi in &message.fields {
            let f = self.field_data(fi);
            if f.number == 0 {
                continue;
            }
            if let Some(previous) = numbers.insert(f.number, &f.name) {
                problems.push((
                    DiagnosticKind::DuplicateFieldNumber,
                    f.full_name.clone(),
                    format!("{} is already used by `{previous}`", f.number),
                ));
            }
            if message
                .reserved_ranges
                .iter()
                .any(|&(start, end)| (start..end).contains(&f.number))
            {
                problems.push((
                    DiagnosticKind::ReservedFieldNumber,
                    f.full_name.clone(),
                    f.number.to_string(),
                ));
            }
            if message.reserved_names.contains(&f.name) {
                problems.push((
                    DiagnosticKind::ReservedFieldName,
                    f.full_name.clone(),
                    f.name.clone(),
                ));
            }
            if message
                .extension_ranges
                .iter()
                .any(|&(start, end)| (start..end).contains(&f.number))
            {
                problems.push((
                    DiagnosticKind::InvalidFieldNumber,
                    f.full_name.clone(),
                    format!("{} overlaps an extension range", f.number),
                ));
            }
        }

        let mut seen_synthetic = false;
        for &oi in &message.oneofs {
            let oneof = self.oneof_data(oi);
            if oneof.fields.is_empty() {
                problems.push((
                    DiagnosticKind::InvalidOneofMember,
                    oneof.full_name.clone(),
                    "oneof has no fields".to_owned(),
                ));
                continue;
            }

            let positions: Vec<usize> = oneof
                .fields
                .iter()
                .filter_map(|f| message.fields.iter().position(|m| m == f))
                .collect();
            let contiguous = positions.windows(2).all(|w| w[1] == w[0] + 1);
            if !contiguous {
                problems.push((
                    DiagnosticKind::InvalidOneofMember,
                    oneof.full_name.clone(),
                    "members must be declared next to each other".to_owned(),
                ));
            }

            let has_optional_member = oneof
                .fields
                .iter()
                .any(|&f| self.field_data(f).proto3_optional);
            if has_optional_member && !oneof.synthetic {
                problems.push((
                    DiagnosticKind::SyntheticOneofShape,
                    oneof.full_name.clone(),
                    "a synthetic oneof holds exactly one proto3 optional field".to_owned(),
                ));
            }
            if oneof.synthetic {
                seen_synthetic = true;
            } else if seen_synthetic {
                problems.push((
                    DiagnosticKind::SyntheticOneofShape,
                    oneof.full_name.clone(),
                    "synthetic oneofs must follow all real oneofs".to_owned(),
                ));
            }
        }

        for (kind, element, detail) in problems {
            self.diag.report(kind, element).message(detail).emit();
        }
    }

    fn validate_enum(&mut self, local: usize) {
        let data = self.staged.enums[local].clone();
        let values: Vec<EnumValueData> = data
            .values
            .iter()
            .map(|&v| self.enum_value_data(v).clone())
            .collect();

        let Some(first) = values.first() else {
            self.diag
                .report(DiagnosticKind::EmptyEnum, data.full_name)
                .emit();
            return;
        };
        if self.syntax == Syntax::Proto3 && first.number != 0 {
            self.diag
                .report(DiagnosticKind::Proto3EnumFirstValue, data.full_name.clone())
                .message(format!("`{}` is {}", first.name, first.number))
                .emit();
        }

        let mut numbers: HashMap<i32, &str> = HashMap::new();
        for value in &values {
            if let Some(previous) = numbers.insert(value.number, &value.name)
                && !data.allow_alias
            {
                self.diag
                    .report(DiagnosticKind::DuplicateEnumNumber, value.full_name.clone())
                    .message(format!("{} is already used by `{previous}`", value.number))
                    .emit();
            }
            if data
                .reserved_ranges
                .iter()
                .any(|&(start, end)| (start..=end).contains(&value.number))
            {
                self.diag
                    .report(DiagnosticKind::ReservedFieldNumber, value.full_name.clone())
                    .message(value.number.to_string())
                    .emit();
            }
            if data.reserved_names.contains(&value.name) {
                self.diag
                    .report(DiagnosticKind::ReservedFieldName, value.full_name.clone())
                    .message(value.name.clone())
                    .emit();
            }
        }
    }
}
