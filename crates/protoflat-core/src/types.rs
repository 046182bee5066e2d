//! Field type, label and wire type enumerations shared by every layer.
//!
//! Discriminants match the numbering used by `descriptor.proto` and the
//! wire format, so conversions from raw values are direct.

/// Wire type carried in the low three bits of every tag.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
#[repr(u8)]
pub enum WireType {
    Varint = 0,
    Fixed64 = 1,
    Len = 2,
    StartGroup = 3,
    EndGroup = 4,
    Fixed32 = 5,
}

impl WireType {
    pub fn from_u32(v: u32) -> Option<Self> {
        match v {
            0 => Some(Self::Varint),
            1 => Some(Self::Fixed64),
            2 => Some(Self::Len),
            3 => Some(Self::StartGroup),
            4 => Some(Self::EndGroup),
            5 => Some(Self::Fixed32),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Varint => "varint",
            Self::Fixed64 => "fixed64",
            Self::Len => "len",
            Self::StartGroup => "sgroup",
            Self::EndGroup => "egroup",
            Self::Fixed32 => "fixed32",
        }
    }
}

/// Declared field type, numbered as in `FieldDescriptorProto.Type`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
#[repr(u8)]
pub enum FieldType {
    Double = 1,
    Float = 2,
    Int64 = 3,
    UInt64 = 4,
    Int32 = 5,
    Fixed64 = 6,
    Fixed32 = 7,
    Bool = 8,
    String = 9,
    Group = 10,
    Message = 11,
    Bytes = 12,
    UInt32 = 13,
    Enum = 14,
    SFixed32 = 15,
    SFixed64 = 16,
    SInt32 = 17,
    SInt64 = 18,
}

impl FieldType {
    pub fn from_i32(v: i32) -> Option<Self> {
        Some(match v {
            1 => Self::Double,
            2 => Self::Float,
            3 => Self::Int64,
            4 => Self::UInt64,
            5 => Self::Int32,
            6 => Self::Fixed64,
            7 => Self::Fixed32,
            8 => Self::Bool,
            9 => Self::String,
            10 => Self::Group,
            11 => Self::Message,
            12 => Self::Bytes,
            13 => Self::UInt32,
            14 => Self::Enum,
            15 => Self::SFixed32,
            16 => Self::SFixed64,
            17 => Self::SInt32,
            18 => Self::SInt64,
            _ => return None,
        })
    }

    /// Wire type used for a single, non-packed value of this type.
    pub fn wire_type(self) -> WireType {
        match self {
            Self::Double | Self::Fixed64 | Self::SFixed64 => WireType::Fixed64,
            Self::Float | Self::Fixed32 | Self::SFixed32 => WireType::Fixed32,
            Self::String | Self::Bytes | Self::Message => WireType::Len,
            Self::Group => WireType::StartGroup,
            Self::Int64
            | Self::UInt64
            | Self::Int32
            | Self::Bool
            | Self::UInt32
            | Self::Enum
            | Self::SInt32
            | Self::SInt64 => WireType::Varint,
        }
    }

    /// Whether repeated values of this type may use the packed encoding.
    pub fn is_packable(self) -> bool {
        !matches!(
            self,
            Self::String | Self::Bytes | Self::Message | Self::Group
        )
    }

    /// Message and group fields point at a submessage.
    pub fn is_message(self) -> bool {
        matches!(self, Self::Message | Self::Group)
    }

    pub fn is_string_like(self) -> bool {
        matches!(self, Self::String | Self::Bytes)
    }

    /// In-memory representation of a singular value of this type.
    pub fn storage(self) -> StorageClass {
        match self {
            Self::Bool => StorageClass::Byte,
            Self::Float
            | Self::Int32
            | Self::UInt32
            | Self::SInt32
            | Self::Fixed32
            | Self::SFixed32
            | Self::Enum => StorageClass::Word32,
            Self::Double
            | Self::Int64
            | Self::UInt64
            | Self::SInt64
            | Self::Fixed64
            | Self::SFixed64 => StorageClass::Word64,
            Self::String | Self::Bytes => StorageClass::Str,
            Self::Message | Self::Group => StorageClass::Ptr,
        }
    }

    /// Name as written in `.proto` source.
    pub fn name(self) -> &'static str {
        match self {
            Self::Double => "double",
            Self::Float => "float",
            Self::Int64 => "int64",
            Self::UInt64 => "uint64",
            Self::Int32 => "int32",
            Self::Fixed64 => "fixed64",
            Self::Fixed32 => "fixed32",
            Self::Bool => "bool",
            Self::String => "string",
            Self::Group => "group",
            Self::Message => "message",
            Self::Bytes => "bytes",
            Self::UInt32 => "uint32",
            Self::Enum => "enum",
            Self::SFixed32 => "sfixed32",
            Self::SFixed64 => "sfixed64",
            Self::SInt32 => "sint32",
            Self::SInt64 => "sint64",
        }
    }
}

/// Field cardinality, numbered as in `FieldDescriptorProto.Label`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
#[repr(u8)]
pub enum Label {
    Optional = 1,
    Required = 2,
    Repeated = 3,
}

impl Label {
    pub fn from_i32(v: i32) -> Option<Self> {
        match v {
            1 => Some(Self::Optional),
            2 => Some(Self::Required),
            3 => Some(Self::Repeated),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
pub enum Syntax {
    #[default]
    Proto2,
    Proto3,
}

impl Syntax {
    /// Parses the `syntax` field of a file. Empty means proto2.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "" | "proto2" => Some(Self::Proto2),
            "proto3" => Some(Self::Proto3),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Proto2 => "proto2",
            Self::Proto3 => "proto3",
        }
    }
}

/// Size/alignment bucket of an in-memory field slot.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum StorageClass {
    /// `bool`.
    Byte,
    /// 32-bit scalars and enums.
    Word32,
    /// 64-bit scalars.
    Word64,
    /// Pointer + length view of string or bytes data.
    Str,
    /// Pointer to a submessage, array or map.
    Ptr,
}

impl StorageClass {
    pub fn size(self) -> usize {
        match self {
            Self::Byte => 1,
            Self::Word32 => 4,
            Self::Word64 => 8,
            Self::Str => 2 * size_of::<usize>(),
            Self::Ptr => size_of::<usize>(),
        }
    }

    pub fn align(self) -> usize {
        match self {
            Self::Byte => 1,
            Self::Word32 => 4,
            Self::Word64 => 8,
            Self::Str | Self::Ptr => align_of::<usize>(),
        }
    }
}
