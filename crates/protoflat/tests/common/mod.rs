//! Schema builders shared by the integration tests.

#![allow(dead_code)]

use protoflat::proto::{DescriptorProto, FieldDescriptorProto, FileDescriptorProto};
use protoflat::{DescriptorPool, FieldDef, FieldType, MessageDef};

pub fn field(name: &str, number: i32, field_type: FieldType) -> FieldDescriptorProto {
    FieldDescriptorProto::new(name, number, field_type)
}

/// A pool holding one file named `<package>.proto` with `messages`.
pub fn pool_with(package: &str, messages: Vec<DescriptorProto>) -> DescriptorPool {
    let mut file = FileDescriptorProto::new(format!("{package}.proto")).with_package(package);
    for message in messages {
        file = file.with_message(message);
    }
    let mut pool = DescriptorPool::new();
    if let Err(err) = pool.add_file(&file) {
        panic!("{}", err.diagnostics().render());
    }
    pool
}

pub fn message<'p>(pool: &'p DescriptorPool, name: &str) -> MessageDef<'p> {
    pool.find_message_by_name(name)
        .unwrap_or_else(|| panic!("no message {name}"))
}

pub fn field_of<'p>(def: MessageDef<'p>, name: &str) -> FieldDef<'p> {
    def.field_by_name(name)
        .unwrap_or_else(|| panic!("no field {name} in {}", def.full_name()))
}

/// `message Wide` exercising every scalar type, a submessage, repeated and
/// map fields, and a self reference.
pub fn wide() -> DescriptorProto {
    DescriptorProto::new("Wide")
        .with_field(field("i32", 1, FieldType::Int32))
        .with_field(field("i64", 2, FieldType::Int64))
        .with_field(field("u32", 3, FieldType::UInt32))
        .with_field(field("u64", 4, FieldType::UInt64))
        .with_field(field("s32", 5, FieldType::SInt32))
        .with_field(field("s64", 6, FieldType::SInt64))
        .with_field(field("f32", 7, FieldType::Fixed32))
        .with_field(field("f64", 8, FieldType::Fixed64))
        .with_field(field("sf32", 9, FieldType::SFixed32))
        .with_field(field("sf64", 10, FieldType::SFixed64))
        .with_field(field("fl", 11, FieldType::Float))
        .with_field(field("db", 12, FieldType::Double))
        .with_field(field("b", 13, FieldType::Bool))
        .with_field(field("s", 14, FieldType::String))
        .with_field(field("by", 15, FieldType::Bytes))
        .with_field(field("next", 16, FieldType::Message).with_type_name("Wide"))
        .with_field(field("list", 17, FieldType::Int64).repeated())
        .with_field(field("names", 18, FieldType::String).repeated())
        .with_field(field("kids", 19, FieldType::Message).with_type_name("Wide").repeated())
        .with_map_field(
            "index",
            20,
            FieldDescriptorProto::map_key(FieldType::String),
            FieldDescriptorProto::map_value(FieldType::Message).with_type_name("Wide"),
        )
}

/// `Wide` without fields 2, 14, 16 and 20.
pub fn narrow() -> DescriptorProto {
    DescriptorProto::new("Wide")
        .with_field(field("i32", 1, FieldType::Int32))
        .with_field(field("u32", 3, FieldType::UInt32))
        .with_field(field("list", 17, FieldType::Int64).repeated())
        .with_field(field("kids", 19, FieldType::Message).with_type_name("Wide").repeated())
}

/// Hex dump with spaces.
pub fn hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{b:02X}"))
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn unhex(text: &str) -> Vec<u8> {
    text.split_whitespace()
        .map(|b| u8::from_str_radix(b, 16).expect("hex byte"))
        .collect()
}
