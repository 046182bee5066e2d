//! Hand-coded subset of `google/protobuf/descriptor.proto`.
//!
//! These plain structs are the input format of the pool. They carry every
//! field the pool reads; anything else in a serialized descriptor (source
//! info, most options) is skipped on decode. Field presence is kept where
//! it changes meaning, e.g. an explicit `packed = false`.

mod builder;
mod decode;
mod encode;

#[cfg(test)]
mod proto_tests;

pub use decode::DescriptorDecodeError;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct FileDescriptorSet {
    pub file: Vec<FileDescriptorProto>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct FileDescriptorProto {
    pub name: Option<String>,
    pub package: Option<String>,
    pub dependency: Vec<String>,
    pub message_type: Vec<DescriptorProto>,
    pub enum_type: Vec<EnumDescriptorProto>,
    pub service: Vec<ServiceDescriptorProto>,
    pub extension: Vec<FieldDescriptorProto>,
    /// Indices into `dependency`.
    pub public_dependency: Vec<i32>,
    pub weak_dependency: Vec<i32>,
    pub syntax: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct DescriptorProto {
    pub name: Option<String>,
    pub field: Vec<FieldDescriptorProto>,
    pub nested_type: Vec<DescriptorProto>,
    pub enum_type: Vec<EnumDescriptorProto>,
    pub extension_range: Vec<ExtensionRange>,
    pub extension: Vec<FieldDescriptorProto>,
    pub options: Option<MessageOptions>,
    pub oneof_decl: Vec<OneofDescriptorProto>,
    pub reserved_range: Vec<ReservedRange>,
    pub reserved_name: Vec<String>,
}

/// Half-open `[start, end)` range of extension numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExtensionRange {
    pub start: Option<i32>,
    pub end: Option<i32>,
}

/// Half-open `[start, end)` range of reserved field numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReservedRange {
    pub start: Option<i32>,
    pub end: Option<i32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MessageOptions {
    pub map_entry: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct FieldDescriptorProto {
    pub name: Option<String>,
    pub extendee: Option<String>,
    pub number: Option<i32>,
    pub label: Option<i32>,
    pub r#type: Option<i32>,
    pub type_name: Option<String>,
    pub default_value: Option<String>,
    pub options: Option<FieldOptions>,
    pub oneof_index: Option<i32>,
    pub json_name: Option<String>,
    pub proto3_optional: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FieldOptions {
    pub packed: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OneofDescriptorProto {
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct EnumDescriptorProto {
    pub name: Option<String>,
    pub value: Vec<EnumValueDescriptorProto>,
    pub options: Option<EnumOptions>,
    pub reserved_range: Vec<EnumReservedRange>,
    pub reserved_name: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EnumOptions {
    pub allow_alias: Option<bool>,
}

/// Inclusive `[start, end]` range of reserved enum numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EnumReservedRange {
    pub start: Option<i32>,
    pub end: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EnumValueDescriptorProto {
    pub name: Option<String>,
    pub number: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ServiceDescriptorProto {
    pub name: Option<String>,
    pub method: Vec<MethodDescriptorProto>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MethodDescriptorProto {
    pub name: Option<String>,
    pub input_type: Option<String>,
    pub output_type: Option<String>,
    pub client_streaming: Option<bool>,
    pub server_streaming: Option<bool>,
}
