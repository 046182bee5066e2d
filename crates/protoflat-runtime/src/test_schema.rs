//! Schema shared by the runtime unit tests.

use protoflat_core::{FieldType, Syntax};
use protoflat_schema::proto::{DescriptorProto, EnumDescriptorProto, FieldDescriptorProto, FileDescriptorProto};
use protoflat_schema::{DescriptorPool, FieldDef, MessageDef};

fn f(name: &str, number: i32, field_type: FieldType) -> FieldDescriptorProto {
    FieldDescriptorProto::new(name, number, field_type)
}

fn msg(name: &str, number: i32, type_name: &str) -> FieldDescriptorProto {
    f(name, number, FieldType::Message).with_type_name(type_name)
}

/// `test.proto` (proto2) and `test3.proto` (proto3).
pub fn pool() -> DescriptorPool {
    let color = EnumDescriptorProto::new("Color")
        .with_value("RED", 1)
        .with_value("GREEN", 2)
        .with_value("BLUE", 3);

    let scalars = DescriptorProto::new("Scalars")
        .with_field(f("i32", 1, FieldType::Int32))
        .with_field(f("i64", 2, FieldType::Int64))
        .with_field(f("u32", 3, FieldType::UInt32))
        .with_field(f("u64", 4, FieldType::UInt64))
        .with_field(f("s32", 5, FieldType::SInt32))
        .with_field(f("s64", 6, FieldType::SInt64))
        .with_field(f("fx32", 7, FieldType::Fixed32))
        .with_field(f("fx64", 8, FieldType::Fixed64))
        .with_field(f("sfx32", 9, FieldType::SFixed32))
        .with_field(f("sfx64", 10, FieldType::SFixed64))
        .with_field(f("fl", 11, FieldType::Float))
        .with_field(f("db", 12, FieldType::Double))
        .with_field(f("b", 13, FieldType::Bool))
        .with_field(f("s", 14, FieldType::String))
        .with_field(f("by", 15, FieldType::Bytes))
        .with_field(f("color", 16, FieldType::Enum).with_type_name("Color"))
        .with_field(f("answer", 17, FieldType::Int32).with_default("42"))
        .with_field(f("greeting", 18, FieldType::String).with_default("hi"));

    let node = DescriptorProto::new("Node")
        .with_nested(DescriptorProto::new("Item").with_field(f("x", 1, FieldType::Int32)))
        .with_oneof("choice")
        .with_field(f("value", 1, FieldType::Int32))
        .with_field(msg("child", 2, "Node"))
        .with_field(msg("children", 3, "Node").repeated())
        .with_field(f("nums", 4, FieldType::Int32).repeated())
        .with_field(f("packed_nums", 5, FieldType::Int32).repeated().packed(true))
        .with_map_field(
            "counts",
            6,
            FieldDescriptorProto::map_key(FieldType::String),
            FieldDescriptorProto::map_value(FieldType::Int32),
        )
        .with_map_field(
            "nodes",
            7,
            FieldDescriptorProto::map_key(FieldType::Int32),
            FieldDescriptorProto::map_value(FieldType::Message).with_type_name(".test.Node"),
        )
        .with_field(f("a", 8, FieldType::Int32).in_oneof(0))
        .with_field(f("b", 9, FieldType::String).in_oneof(0))
        .with_field(msg("c", 10, "Node").in_oneof(0))
        .with_field(f("colors", 11, FieldType::Enum).with_type_name("Color").repeated())
        .with_field(f("item", 12, FieldType::Group).with_type_name("Item"))
        .with_field(f("color", 13, FieldType::Enum).with_type_name("Color"))
        .with_field(f("name", 14, FieldType::String))
        .with_map_field(
            "shades",
            15,
            FieldDescriptorProto::map_key(FieldType::Int32),
            FieldDescriptorProto::map_value(FieldType::Enum).with_type_name(".test.Color"),
        );

    let required = DescriptorProto::new("Required")
        .with_field(f("id", 1, FieldType::Int32).required())
        .with_field(msg("inner", 2, "Required"))
        .with_field(msg("list", 3, "Required").repeated())
        .with_map_field(
            "by_name",
            4,
            FieldDescriptorProto::map_key(FieldType::String),
            FieldDescriptorProto::map_value(FieldType::Message).with_type_name(".test.Required"),
        );

    let proto2 = FileDescriptorProto::new("test.proto")
        .with_package("test")
        .with_enum(color)
        .with_message(scalars)
        .with_message(node)
        .with_message(required)
        .with_message(DescriptorProto::new("Empty"));

    let p3 = DescriptorProto::new("P3")
        .with_oneof("_opt")
        .with_field(f("x", 1, FieldType::Int32))
        .with_field(f("s", 2, FieldType::String))
        .with_field(f("v", 3, FieldType::Int32).repeated())
        .with_field(f("opt", 4, FieldType::Int32).proto3_optional().in_oneof(0))
        .with_field(f("e", 5, FieldType::Enum).with_type_name("Open"))
        .with_field(msg("sub", 6, "P3"))
        .with_field(f("d", 7, FieldType::Double));

    let proto3 = FileDescriptorProto::new("test3.proto")
        .with_package("test3")
        .with_syntax(Syntax::Proto3)
        .with_enum(EnumDescriptorProto::new("Open").with_value("ZERO", 0).with_value("ONE", 1))
        .with_message(p3);

    let mut pool = DescriptorPool::new();
    pool.add_file(&proto2).expect("test.proto is valid");
    pool.add_file(&proto3).expect("test3.proto is valid");
    pool
}

pub fn message<'p>(pool: &'p DescriptorPool, name: &str) -> MessageDef<'p> {
    pool.find_message_by_name(name)
        .unwrap_or_else(|| panic!("no message {name}"))
}

pub fn field<'p>(def: MessageDef<'p>, name: &str) -> FieldDef<'p> {
    def.field_by_name(name)
        .unwrap_or_else(|| panic!("no field {name} in {}", def.full_name()))
}

/// Hex dump with spaces, for readable byte assertions.
pub fn hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{b:02X}"))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Parses a space-separated hex string.
pub fn unhex(text: &str) -> Vec<u8> {
    text.split_whitespace()
        .map(|b| u8::from_str_radix(b, 16).expect("hex byte"))
        .collect()
}
