//! Borrowed handles to pool entities.
//!
//! A handle is a pool reference plus an index. Handles are `Copy`, compare
//! by identity, and stay valid for as long as the pool is borrowed.

use std::fmt;
use std::hash::{Hash, Hasher};

use protoflat_core::{FieldType, Label, Syntax};

use super::DescriptorPool;
use super::data::*;
use super::store::Store;
use crate::layout::{FieldLayout, FieldMode, Layout, OneofLayout};

macro_rules! define_handle {
    ($($(#[$meta:meta])* $name:ident($idx:ident, $data:ident, $getter:ident);)*) => {
        $(
            $(#[$meta])*
            #[derive(Clone, Copy)]
            pub struct $name<'p> {
                pool: &'p DescriptorPool,
                index: $idx,
            }

            impl<'p> $name<'p> {
                pub(crate) fn new(pool: &'p DescriptorPool, index: $idx) -> Self {
                    Self { pool, index }
                }

                pub fn index(&self) -> $idx {
                    self.index
                }

                pub fn pool(&self) -> &'p DescriptorPool {
                    self.pool
                }

                fn data(&self) -> &'p $data {
                    self.pool.$getter(self.index)
                }
            }

            impl PartialEq for $name<'_> {
                fn eq(&self, other: &Self) -> bool {
                    std::ptr::eq(self.pool, other.pool) && self.index == other.index
                }
            }

            impl Eq for $name<'_> {}

            impl Hash for $name<'_> {
                fn hash<H: Hasher>(&self, state: &mut H) {
                    std::ptr::hash(self.pool, state);
                    self.index.hash(state);
                }
            }
        )*
    };
}

define_handle! {
    /// A file added to the pool.
    FileDescriptor(FileIndex, FileData, file_data);
    MessageDef(MessageIndex, MessageData, message_data);
    /// A regular field or an extension.
    FieldDef(FieldIndex, FieldData, field_data);
    OneofDef(OneofIndex, OneofData, oneof_data);
    EnumDef(EnumIndex, EnumData, enum_data);
    EnumValueDef(EnumValueIndex, EnumValueData, enum_value_data);
    ServiceDef(ServiceIndex, ServiceData, service_data);
    MethodDef(MethodIndex, MethodData, method_data);
}

impl<'p> FileDescriptor<'p> {
    pub fn name(&self) -> &'p str {
        &self.data().name
    }

    pub fn package(&self) -> &'p str {
        &self.data().package
    }

    pub fn syntax(&self) -> Syntax {
        self.data().syntax
    }

    /// Dependencies that were found in the pool.
    pub fn dependencies(&self) -> impl Iterator<Item = FileDescriptor<'p>> + use<'p> {
        let pool = self.pool;
        self.data()
            .dependencies
            .iter()
            .map(move |&i| FileDescriptor::new(pool, i))
    }

    pub fn public_dependencies(&self) -> impl Iterator<Item = FileDescriptor<'p>> + use<'p> {
        let pool = self.pool;
        self.data()
            .public_dependencies
            .iter()
            .map(move |&i| FileDescriptor::new(pool, i))
    }

    /// Top-level messages.
    pub fn messages(&self) -> impl Iterator<Item = MessageDef<'p>> + use<'p> {
        let pool = self.pool;
        self.data().messages.iter().map(move |&i| MessageDef::new(pool, i))
    }

    /// Top-level enums.
    pub fn enums(&self) -> impl Iterator<Item = EnumDef<'p>> + use<'p> {
        let pool = self.pool;
        self.data().enums.iter().map(move |&i| EnumDef::new(pool, i))
    }

    /// Top-level extensions.
    pub fn extensions(&self) -> impl Iterator<Item = FieldDef<'p>> + use<'p> {
        let pool = self.pool;
        self.data().extensions.iter().map(move |&i| FieldDef::new(pool, i))
    }

    pub fn services(&self) -> impl Iterator<Item = ServiceDef<'p>> + use<'p> {
        let pool = self.pool;
        self.data().services.iter().map(move |&i| ServiceDef::new(pool, i))
    }
}

impl<'p> MessageDef<'p> {
    pub fn name(&self) -> &'p str {
        &self.data().name
    }

    pub fn full_name(&self) -> &'p str {
        &self.data().full_name
    }

    pub fn file(&self) -> FileDescriptor<'p> {
        FileDescriptor::new(self.pool, self.data().file)
    }

    pub fn syntax(&self) -> Syntax {
        self.file().syntax()
    }

    /// Enclosing message of a nested message.
    pub fn containing_type(&self) -> Option<MessageDef<'p>> {
        self.data().parent.map(|i| MessageDef::new(self.pool, i))
    }

    pub fn layout(&self) -> &'p Layout {
        &self.data().layout
    }

    /// Fields in declaration order.
    pub fn fields(&self) -> impl ExactSizeIterator<Item = FieldDef<'p>> + use<'p> {
        let pool = self.pool;
        self.data().fields.iter().map(move |&i| FieldDef::new(pool, i))
    }

    pub fn field_by_number(&self, number: u32) -> Option<FieldDef<'p>> {
        self.layout()
            .field_by_number(number)
            .map(|l| FieldDef::new(self.pool, l.field))
    }

    pub fn field_by_name(&self, name: &str) -> Option<FieldDef<'p>> {
        self.fields().find(|f| f.name() == name)
    }

    /// All oneofs, synthetic ones included.
    pub fn oneofs(&self) -> impl Iterator<Item = OneofDef<'p>> + use<'p> {
        let pool = self.pool;
        self.data().oneofs.iter().map(move |&i| OneofDef::new(pool, i))
    }

    pub fn real_oneofs(&self) -> impl Iterator<Item = OneofDef<'p>> + use<'p> {
        self.oneofs().filter(|o| !o.is_synthetic())
    }

    pub fn nested_messages(&self) -> impl Iterator<Item = MessageDef<'p>> + use<'p> {
        let pool = self.pool;
        self.data()
            .nested_messages
            .iter()
            .map(move |&i| MessageDef::new(pool, i))
    }

    pub fn nested_enums(&self) -> impl Iterator<Item = EnumDef<'p>> + use<'p> {
        let pool = self.pool;
        self.data().nested_enums.iter().map(move |&i| EnumDef::new(pool, i))
    }

    /// Extensions declared inside this message's scope.
    pub fn nested_extensions(&self) -> impl Iterator<Item = FieldDef<'p>> + use<'p> {
        let pool = self.pool;
        self.data().extensions.iter().map(move |&i| FieldDef::new(pool, i))
    }

    /// Half-open extension number ranges.
    pub fn extension_ranges(&self) -> &'p [(u32, u32)] {
        &self.data().extension_ranges
    }

    pub fn is_extension_number(&self, number: u32) -> bool {
        self.extension_ranges()
            .iter()
            .any(|&(start, end)| (start..end).contains(&number))
    }

    pub fn is_map_entry(&self) -> bool {
        self.data().is_map_entry
    }

    pub fn map_key(&self) -> Option<FieldDef<'p>> {
        self.is_map_entry().then(|| self.field_by_number(1)).flatten()
    }

    pub fn map_value(&self) -> Option<FieldDef<'p>> {
        self.is_map_entry().then(|| self.field_by_number(2)).flatten()
    }
}

impl<'p> FieldDef<'p> {
    pub fn name(&self) -> &'p str {
        &self.data().name
    }

    pub fn full_name(&self) -> &'p str {
        &self.data().full_name
    }

    pub fn json_name(&self) -> &'p str {
        &self.data().json_name
    }

    pub fn number(&self) -> u32 {
        self.data().number
    }

    pub fn field_type(&self) -> FieldType {
        self.data().field_type
    }

    pub fn label(&self) -> Label {
        self.data().label
    }

    pub fn file(&self) -> FileDescriptor<'p> {
        FileDescriptor::new(self.pool, self.data().file)
    }

    pub fn is_repeated(&self) -> bool {
        self.label() == Label::Repeated
    }

    pub fn is_required(&self) -> bool {
        self.label() == Label::Required
    }

    /// Repeated field whose element type is a map entry.
    pub fn is_map(&self) -> bool {
        self.is_repeated() && self.message_type().is_some_and(|m| m.is_map_entry())
    }

    pub fn is_packed(&self) -> bool {
        self.data().packed
    }

    /// Whether "set to the default" and "not set" are distinguishable.
    pub fn has_presence(&self) -> bool {
        self.data().has_presence
    }

    pub fn is_extension(&self) -> bool {
        self.data().is_extension
    }

    /// Owning message, or the extendee for extensions.
    pub fn containing_type(&self) -> Option<MessageDef<'p>> {
        self.data().containing.map(|i| MessageDef::new(self.pool, i))
    }

    /// Message an extension is declared in, if any.
    pub fn extension_scope(&self) -> Option<MessageDef<'p>> {
        self.data()
            .extension_scope
            .map(|i| MessageDef::new(self.pool, i))
    }

    /// Oneof the field belongs to, synthetic or not.
    pub fn containing_oneof(&self) -> Option<OneofDef<'p>> {
        self.data().oneof.map(|i| OneofDef::new(self.pool, i))
    }

    pub fn real_containing_oneof(&self) -> Option<OneofDef<'p>> {
        self.containing_oneof().filter(|o| !o.is_synthetic())
    }

    pub fn is_proto3_optional(&self) -> bool {
        self.data().proto3_optional
    }

    pub fn message_type(&self) -> Option<MessageDef<'p>> {
        self.data().message_type.map(|i| MessageDef::new(self.pool, i))
    }

    pub fn enum_type(&self) -> Option<EnumDef<'p>> {
        self.data().enum_type.map(|i| EnumDef::new(self.pool, i))
    }

    pub fn default_value(&self) -> &'p DefaultValue {
        &self.data().default
    }

    pub fn has_explicit_default(&self) -> bool {
        self.data().has_explicit_default
    }

    /// Entry in the owning message's layout. Extensions have none.
    pub fn layout(&self) -> Option<&'p FieldLayout> {
        let data = self.data();
        if data.is_extension {
            return None;
        }
        let message = self.pool.message_data(data.containing?);
        message.layout.fields().get(data.layout_index as usize)
    }

    pub fn mode(&self) -> FieldMode {
        if self.is_map() {
            FieldMode::Map
        } else if self.is_repeated() {
            FieldMode::Repeated
        } else {
            FieldMode::Scalar
        }
    }
}

impl<'p> OneofDef<'p> {
    pub fn name(&self) -> &'p str {
        &self.data().name
    }

    pub fn full_name(&self) -> &'p str {
        &self.data().full_name
    }

    pub fn containing_type(&self) -> MessageDef<'p> {
        MessageDef::new(self.pool, self.data().message)
    }

    pub fn fields(&self) -> impl ExactSizeIterator<Item = FieldDef<'p>> + use<'p> {
        let pool = self.pool;
        self.data().fields.iter().map(move |&i| FieldDef::new(pool, i))
    }

    /// Wraps a single proto3 `optional` field.
    pub fn is_synthetic(&self) -> bool {
        self.data().synthetic
    }

    /// Case word and payload slot. Synthetic oneofs have none.
    pub fn layout(&self) -> Option<&'p OneofLayout> {
        let index = self.index;
        self.containing_type()
            .layout()
            .oneofs()
            .iter()
            .find(|o| o.oneof == index)
    }
}

impl<'p> EnumDef<'p> {
    pub fn name(&self) -> &'p str {
        &self.data().name
    }

    pub fn full_name(&self) -> &'p str {
        &self.data().full_name
    }

    pub fn file(&self) -> FileDescriptor<'p> {
        FileDescriptor::new(self.pool, self.data().file)
    }

    pub fn containing_type(&self) -> Option<MessageDef<'p>> {
        self.data().parent.map(|i| MessageDef::new(self.pool, i))
    }

    pub fn values(&self) -> impl ExactSizeIterator<Item = EnumValueDef<'p>> + use<'p> {
        let pool = self.pool;
        self.data()
            .values
            .iter()
            .map(move |&i| EnumValueDef::new(pool, i))
    }

    /// First declared value with `number`; aliases share a number.
    pub fn value_by_number(&self, number: i32) -> Option<EnumValueDef<'p>> {
        self.values().find(|v| v.number() == number)
    }

    pub fn value_by_name(&self, name: &str) -> Option<EnumValueDef<'p>> {
        self.values().find(|v| v.name() == name)
    }

    /// Closed enums route undeclared numbers to unknown fields.
    pub fn is_closed(&self) -> bool {
        self.data().is_closed
    }

    /// Whether a decoded number is stored in a field of this enum type.
    pub fn accepts(&self, number: i32) -> bool {
        !self.is_closed() || self.value_by_number(number).is_some()
    }

    /// Number of the first declared value.
    pub fn default_number(&self) -> i32 {
        self.values().next().map_or(0, |v| v.number())
    }
}

impl<'p> EnumValueDef<'p> {
    pub fn name(&self) -> &'p str {
        &self.data().name
    }

    pub fn full_name(&self) -> &'p str {
        &self.data().full_name
    }

    pub fn number(&self) -> i32 {
        self.data().number
    }

    pub fn enum_type(&self) -> EnumDef<'p> {
        EnumDef::new(self.pool, self.data().parent)
    }
}

impl<'p> ServiceDef<'p> {
    pub fn name(&self) -> &'p str {
        &self.data().name
    }

    pub fn full_name(&self) -> &'p str {
        &self.data().full_name
    }

    pub fn file(&self) -> FileDescriptor<'p> {
        FileDescriptor::new(self.pool, self.data().file)
    }

    pub fn methods(&self) -> impl ExactSizeIterator<Item = MethodDef<'p>> + use<'p> {
        let pool = self.pool;
        self.data().methods.iter().map(move |&i| MethodDef::new(pool, i))
    }
}

impl<'p> MethodDef<'p> {
    pub fn name(&self) -> &'p str {
        &self.data().name
    }

    pub fn full_name(&self) -> &'p str {
        &self.data().full_name
    }

    pub fn service(&self) -> ServiceDef<'p> {
        ServiceDef::new(self.pool, self.data().service)
    }

    pub fn input_type(&self) -> Option<MessageDef<'p>> {
        self.data().input.map(|i| MessageDef::new(self.pool, i))
    }

    pub fn output_type(&self) -> Option<MessageDef<'p>> {
        self.data().output.map(|i| MessageDef::new(self.pool, i))
    }

    pub fn is_client_streaming(&self) -> bool {
        self.data().client_streaming
    }

    pub fn is_server_streaming(&self) -> bool {
        self.data().server_streaming
    }
}

impl fmt::Debug for FileDescriptor<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FileDescriptor({})", self.name())
    }
}

macro_rules! debug_by_full_name {
    ($($name:ident),*) => {
        $(
            impl fmt::Debug for $name<'_> {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    write!(f, concat!(stringify!($name), "({})"), self.full_name())
                }
            }
        )*
    };
}

debug_by_full_name!(MessageDef, FieldDef, OneofDef, EnumDef, EnumValueDef, ServiceDef, MethodDef);
