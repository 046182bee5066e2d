//! Entity records stored by the pool, addressed by global indices.
//!
//! Indices are global across a pool and its underlay chain: an underlay's
//! entities occupy `0..base`, the pool's own entities follow. Cross-links
//! between entities are indices, so cycles in the schema graph are plain data.

use protoflat_core::{FieldType, Label, Syntax};

use crate::layout::Layout;

macro_rules! define_index {
    ($($(#[$meta:meta])* $name:ident),* $(,)?) => {
        $(
            $(#[$meta])*
            #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
            pub struct $name(pub(crate) u32);

            impl $name {
                pub fn as_usize(self) -> usize {
                    self.0 as usize
                }
            }
        )*
    };
}

define_index! {
    FileIndex,
    MessageIndex,
    FieldIndex,
    OneofIndex,
    EnumIndex,
    EnumValueIndex,
    ServiceIndex,
    MethodIndex,
}

/// Typed default of a singular field.
#[derive(Debug, Clone, PartialEq)]
pub enum DefaultValue {
    /// Message, group and repeated fields have no scalar default.
    None,
    Bool(bool),
    I32(i32),
    I64(i64),
    U32(u32),
    U64(u64),
    F32(f32),
    F64(f64),
    String(String),
    Bytes(Vec<u8>),
    Enum(i32),
}

impl DefaultValue {
    /// Zero value for a field of `field_type`.
    pub fn zero(field_type: FieldType) -> Self {
        match field_type {
            FieldType::Bool => Self::Bool(false),
            FieldType::Int32 | FieldType::SInt32 | FieldType::SFixed32 => Self::I32(0),
            FieldType::Int64 | FieldType::SInt64 | FieldType::SFixed64 => Self::I64(0),
            FieldType::UInt32 | FieldType::Fixed32 => Self::U32(0),
            FieldType::UInt64 | FieldType::Fixed64 => Self::U64(0),
            FieldType::Float => Self::F32(0.0),
            FieldType::Double => Self::F64(0.0),
            FieldType::String => Self::String(String::new()),
            FieldType::Bytes => Self::Bytes(Vec::new()),
            FieldType::Enum => Self::Enum(0),
            FieldType::Message | FieldType::Group => Self::None,
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct FileData {
    pub name: String,
    pub package: String,
    pub syntax: Syntax,
    pub dependencies: Vec<FileIndex>,
    pub public_dependencies: Vec<FileIndex>,
    pub messages: Vec<MessageIndex>,
    pub enums: Vec<EnumIndex>,
    pub extensions: Vec<FieldIndex>,
    pub services: Vec<ServiceIndex>,
}

#[derive(Debug, Clone)]
pub(crate) struct MessageData {
    pub name: String,
    pub full_name: String,
    pub file: FileIndex,
    pub parent: Option<MessageIndex>,
    /// Declaration order.
    pub fields: Vec<FieldIndex>,
    pub oneofs: Vec<OneofIndex>,
    pub nested_messages: Vec<MessageIndex>,
    pub nested_enums: Vec<EnumIndex>,
    pub extensions: Vec<FieldIndex>,
    /// Half-open extension number ranges.
    pub extension_ranges: Vec<(u32, u32)>,
    /// Half-open reserved number ranges.
    pub reserved_ranges: Vec<(u32, u32)>,
    pub reserved_names: Vec<String>,
    pub is_map_entry: bool,
    pub layout: Layout,
}

#[derive(Debug, Clone)]
pub(crate) struct FieldData {
    pub name: String,
    pub full_name: String,
    pub json_name: String,
    pub number: u32,
    pub label: Label,
    pub field_type: FieldType,
    pub file: FileIndex,
    /// Owning message for regular fields, extendee for extensions.
    pub containing: Option<MessageIndex>,
    pub is_extension: bool,
    /// Message an extension is declared inside, if any.
    pub extension_scope: Option<MessageIndex>,
    pub oneof: Option<OneofIndex>,
    pub proto3_optional: bool,
    pub packed: bool,
    pub has_presence: bool,
    pub message_type: Option<MessageIndex>,
    pub enum_type: Option<EnumIndex>,
    pub default: DefaultValue,
    pub has_explicit_default: bool,
    /// Position in the owning message's layout field table.
    pub layout_index: u32,
}

#[derive(Debug, Clone)]
pub(crate) struct OneofData {
    pub name: String,
    pub full_name: String,
    pub message: MessageIndex,
    pub fields: Vec<FieldIndex>,
    pub synthetic: bool,
}

#[derive(Debug, Clone)]
pub(crate) struct EnumData {
    pub name: String,
    pub full_name: String,
    pub file: FileIndex,
    pub parent: Option<MessageIndex>,
    pub values: Vec<EnumValueIndex>,
    pub is_closed: bool,
    pub allow_alias: bool,
    /// Inclusive reserved number ranges.
    pub reserved_ranges: Vec<(i32, i32)>,
    pub reserved_names: Vec<String>,
}

#[derive(Debug, Clone)]
pub(crate) struct EnumValueData {
    pub name: String,
    pub full_name: String,
    pub number: i32,
    pub parent: EnumIndex,
}

#[derive(Debug, Clone)]
pub(crate) struct ServiceData {
    pub name: String,
    pub full_name: String,
    pub file: FileIndex,
    pub methods: Vec<MethodIndex>,
}

#[derive(Debug, Clone)]
pub(crate) struct MethodData {
    pub name: String,
    pub full_name: String,
    pub service: ServiceIndex,
    pub input: Option<MessageIndex>,
    pub output: Option<MessageIndex>,
    pub client_streaming: bool,
    pub server_streaming: bool,
}

/// What a fully-qualified name refers to.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub(crate) enum Symbol {
    Package(FileIndex),
    Message(MessageIndex),
    Enum(EnumIndex),
    EnumValue(EnumValueIndex),
    Field(FieldIndex),
    Oneof(OneofIndex),
    Service(ServiceIndex),
    Method(MethodIndex),
}

impl Symbol {
    /// Symbols that can contain other named symbols.
    pub fn is_aggregate(self) -> bool {
        matches!(
            self,
            Self::Package(_) | Self::Message(_) | Self::Enum(_) | Self::Service(_)
        )
    }

    pub fn is_type(self) -> bool {
        matches!(self, Self::Message(_) | Self::Enum(_))
    }

    pub fn kind_name(self) -> &'static str {
        match self {
            Self::Package(_) => "package",
            Self::Message(_) => "message",
            Self::Enum(_) => "enum",
            Self::EnumValue(_) => "enum value",
            Self::Field(_) => "field",
            Self::Oneof(_) => "oneof",
            Self::Service(_) => "service",
            Self::Method(_) => "method",
        }
    }
}

/// Per-kind entity counts; used as the index base of a pool over its underlay.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct Counts {
    pub files: usize,
    pub messages: usize,
    pub fields: usize,
    pub oneofs: usize,
    pub enums: usize,
    pub enum_values: usize,
    pub services: usize,
    pub methods: usize,
}

/// Owned entity vectors of one pool (or one staged file).
#[derive(Debug, Clone, Default)]
pub(crate) struct Entities {
    pub files: Vec<FileData>,
    pub messages: Vec<MessageData>,
    pub fields: Vec<FieldData>,
    pub oneofs: Vec<OneofData>,
    pub enums: Vec<EnumData>,
    pub enum_values: Vec<EnumValueData>,
    pub services: Vec<ServiceData>,
    pub methods: Vec<MethodData>,
}

impl Entities {
    pub fn counts(&self) -> Counts {
        Counts {
            files: self.files.len(),
            messages: self.messages.len(),
            fields: self.fields.len(),
            oneofs: self.oneofs.len(),
            enums: self.enums.len(),
            enum_values: self.enum_values.len(),
            services: self.services.len(),
            methods: self.methods.len(),
        }
    }

    /// Moves all of `other` to the end of `self`.
    pub fn append(&mut self, other: Entities) {
        self.files.extend(other.files);
        self.messages.extend(other.messages);
        self.fields.extend(other.fields);
        self.oneofs.extend(other.oneofs);
        self.enums.extend(other.enums);
        self.enum_values.extend(other.enum_values);
        self.services.extend(other.services);
        self.methods.extend(other.methods);
    }
}

impl std::ops::Add for Counts {
    type Output = Counts;

    fn add(self, rhs: Counts) -> Counts {
        Counts {
            files: self.files + rhs.files,
            messages: self.messages + rhs.messages,
            fields: self.fields + rhs.fields,
            oneofs: self.oneofs + rhs.oneofs,
            enums: self.enums + rhs.enums,
            enum_values: self.enum_values + rhs.enum_values,
            services: self.services + rhs.services,
            methods: self.methods + rhs.methods,
        }
    }
}
