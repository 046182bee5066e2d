//! Protoflat: an arena-backed protocol buffers runtime.
//!
//! Schemas are loaded at runtime into a [`DescriptorPool`]. Messages of any
//! type in the pool are parsed into an [`Arena`], read and written through
//! one [`Message`] handle, and serialized back to the wire format.
//!
//! # Example
//!
//! ```
//! use protoflat::proto::{DescriptorProto, FieldDescriptorProto, FileDescriptorProto};
//! use protoflat::{Arena, DescriptorPool, FieldType, Value};
//!
//! let file = FileDescriptorProto::new("point.proto").with_package("geo").with_message(
//!     DescriptorProto::new("Point")
//!         .with_field(FieldDescriptorProto::new("x", 1, FieldType::Int32))
//!         .with_field(FieldDescriptorProto::new("y", 2, FieldType::Int32)),
//! );
//! let mut pool = DescriptorPool::new();
//! pool.add_file(&file)?;
//! let point = pool.find_message_by_name("geo.Point").unwrap();
//! let y = point.field_by_name("y").unwrap();
//!
//! let arena = Arena::new();
//! let mut msg = protoflat::parse(point, &[0x08, 0x03], &arena)?;
//! msg.set(&y, Value::I32(-1))?;
//! assert_eq!(protoflat::serialize(&msg)?.len(), 13);
//! # Ok::<(), protoflat::Error>(())
//! ```

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

#[cfg(test)]
mod lib_tests;

pub use protoflat_core::{AllocError, Arena, FieldType, Label, Syntax, WireType};
pub use protoflat_runtime::{
    AccessError, Array, DecodeError, DecodeOptions, EncodeError, EncodeOptions, Map, MapKey, Message,
    UnknownField, UnknownFields, UnknownValue, Utf8Mode, Value, check_initialized, equal,
};
pub use protoflat_schema::{
    DefaultValue, DescriptorPool, DiagnosticKind, Diagnostics, EnumDef, EnumValueDef, FieldDef,
    FileDescriptor, MessageDef, MethodDef, OneofDef, PoolOptions, SchemaError, ServiceDef, proto,
};
pub use protoflat_wire::{WireError, dump::decode_raw};

/// Category of an [`Error`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Input ended in the middle of a value.
    Truncated,
    /// Input is not valid wire format, or a message is incomplete.
    Malformed,
    /// Nesting exceeded the recursion limit.
    Recursion,
    /// Input or output exceeded a size limit.
    Limit,
    /// A string field held invalid UTF-8.
    Utf8,
    /// A reflection call did not fit the field.
    Type,
    /// The arena could not allocate.
    Alloc,
    /// A schema was rejected by the pool.
    Schema,
}

/// Any error returned by protoflat.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Encode(#[from] EncodeError),
    #[error(transparent)]
    Access(#[from] AccessError),
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error(transparent)]
    Alloc(#[from] AllocError),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Decode(err) => match err {
                DecodeError::Wire(wire) => wire_kind(wire),
                DecodeError::RecursionLimit(_) => ErrorKind::Recursion,
                DecodeError::TotalBytesLimit { .. } => ErrorKind::Limit,
                DecodeError::InvalidUtf8(_) => ErrorKind::Utf8,
                DecodeError::Alloc(_) => ErrorKind::Alloc,
            },
            Error::Encode(err) => match err {
                EncodeError::RecursionLimit(_) => ErrorKind::Recursion,
                EncodeError::MissingRequired(_) => ErrorKind::Malformed,
                EncodeError::InvalidUtf8(_) => ErrorKind::Utf8,
                EncodeError::TooLarge(_) => ErrorKind::Limit,
            },
            Error::Access(AccessError::Alloc(_)) | Error::Alloc(_) => ErrorKind::Alloc,
            Error::Access(_) => ErrorKind::Type,
            Error::Schema(_) => ErrorKind::Schema,
        }
    }

    /// Diagnostics of a rejected schema.
    pub fn diagnostics(&self) -> Option<&Diagnostics> {
        match self {
            Error::Schema(err) => Some(err.diagnostics()),
            _ => None,
        }
    }
}

fn wire_kind(err: &WireError) -> ErrorKind {
    match err {
        WireError::Truncated => ErrorKind::Truncated,
        WireError::GroupDepth => ErrorKind::Recursion,
        WireError::VarintOverflow
        | WireError::InvalidWireType(_)
        | WireError::ZeroFieldNumber
        | WireError::InvalidLength(_)
        | WireError::GroupMismatch { .. }
        | WireError::UnexpectedEndGroup(_) => ErrorKind::Malformed,
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Parses `bytes` as a message of type `def` with default limits.
pub fn parse<'a>(def: MessageDef<'a>, bytes: &[u8], arena: &'a Arena) -> Result<Message<'a>> {
    parse_with(def, bytes, arena, &DecodeOptions::default())
}

pub fn parse_with<'a>(
    def: MessageDef<'a>,
    bytes: &[u8],
    arena: &'a Arena,
    options: &DecodeOptions,
) -> Result<Message<'a>> {
    Ok(Message::parse(def, bytes, arena, options)?)
}

/// Serializes `message` with fields in number order and unknown fields last.
pub fn serialize(message: &Message<'_>) -> Result<Vec<u8>> {
    serialize_with(message, &EncodeOptions::default())
}

pub fn serialize_with(message: &Message<'_>, options: &EncodeOptions) -> Result<Vec<u8>> {
    Ok(message.serialize(options)?)
}

/// Merges `src` into `dst` with wire-format merge semantics.
pub fn merge(dst: &mut Message<'_>, src: &Message<'_>) -> Result<()> {
    Ok(protoflat_runtime::merge(dst, src)?)
}

/// Copies `src` and every submessage it reaches into `arena`.
pub fn deep_copy<'a>(src: &Message<'a>, arena: &'a Arena) -> Result<Message<'a>> {
    Ok(protoflat_runtime::deep_copy(src, arena)?)
}
