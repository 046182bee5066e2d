use protoflat_core::{FieldType, Syntax, WireType};
use protoflat_wire::{WireError, Writer};

use super::*;

fn sample_file() -> FileDescriptorProto {
    FileDescriptorProto::new("shop/order.proto")
        .with_package("shop")
        .with_syntax(Syntax::Proto3)
        .with_public_dependency("shop/common.proto")
        .with_message(
            DescriptorProto::new("Order")
                .with_field(FieldDescriptorProto::new("id", 1, FieldType::Int64))
                .with_field(
                    FieldDescriptorProto::new("lines", 2, FieldType::Message)
                        .with_type_name(".shop.Line")
                        .repeated(),
                )
                .with_field(
                    FieldDescriptorProto::new("note", 3, FieldType::String)
                        .proto3_optional()
                        .in_oneof(0),
                )
                .with_oneof("_note")
                .with_reserved_range(10, 20)
                .with_reserved_name("legacy"),
        )
        .with_enum(
            EnumDescriptorProto::new("State")
                .with_value("STATE_UNSPECIFIED", 0)
                .with_value("STATE_OPEN", 1),
        )
        .with_service(
            ServiceDescriptorProto::new("Orders").with_method(
                MethodDescriptorProto::new("Get", ".shop.Order", ".shop.Order")
                    .streaming(false, true),
            ),
        )
}

#[test]
fn file_survives_encode_decode() {
    let file = sample_file();
    let bytes = file.encode_to_vec();

    assert_eq!(FileDescriptorProto::decode(&bytes).unwrap(), file);
}

#[test]
fn set_holds_files_in_order() {
    let set = FileDescriptorSet {
        file: vec![
            FileDescriptorProto::new("a.proto"),
            FileDescriptorProto::new("b.proto"),
        ],
    };
    let decoded = FileDescriptorSet::decode(&set.encode_to_vec()).unwrap();

    let names: Vec<_> = decoded.file.iter().map(|f| f.name.as_deref()).collect();
    assert_eq!(names, vec![Some("a.proto"), Some("b.proto")]);
}

#[test]
fn unknown_fields_are_skipped() {
    let mut w = Writer::new();
    w.write_tag(1, WireType::Len);
    w.write_len_delimited(b"x.proto");
    // source_code_info
    w.write_tag(9, WireType::Len);
    w.write_len_delimited(&[0x08, 0x01]);
    w.write_tag(99, WireType::Fixed32);
    w.write_fixed32(7);

    let file = FileDescriptorProto::decode(w.as_bytes()).unwrap();
    assert_eq!(file.name.as_deref(), Some("x.proto"));
}

#[test]
fn packed_public_dependency_is_accepted() {
    let mut w = Writer::new();
    w.write_tag(10, WireType::Len);
    w.write_len_delimited(&[0x00, 0x02]);
    w.write_tag(10, WireType::Varint);
    w.write_varint(3);

    let file = FileDescriptorProto::decode(w.as_bytes()).unwrap();
    assert_eq!(file.public_dependency, vec![0, 2, 3]);
}

#[test]
fn explicit_packed_false_is_kept() {
    let field = FieldDescriptorProto::new("v", 1, FieldType::Int32)
        .repeated()
        .packed(false);
    let file = FileDescriptorProto::new("p.proto")
        .with_message(DescriptorProto::new("M").with_field(field));

    let decoded = FileDescriptorProto::decode(&file.encode_to_vec()).unwrap();
    let options = decoded.message_type[0].field[0].options.unwrap();
    assert_eq!(options.packed, Some(false));
}

#[test]
fn negative_numbers_survive() {
    let enum_type = EnumDescriptorProto::new("E").with_value("NEG", -5);
    let file = FileDescriptorProto::new("e.proto").with_enum(enum_type);

    let decoded = FileDescriptorProto::decode(&file.encode_to_vec()).unwrap();
    assert_eq!(decoded.enum_type[0].value[0].number, Some(-5));
}

#[test]
fn invalid_utf8_name() {
    let mut w = Writer::new();
    w.write_tag(1, WireType::Len);
    w.write_len_delimited(&[0xff, 0xfe]);

    let err = FileDescriptorProto::decode(w.as_bytes()).unwrap_err();
    assert_eq!(err, DescriptorDecodeError::Utf8("name"));
    assert_eq!(err.to_string(), "field `name` is not valid UTF-8");
}

#[test]
fn truncated_input() {
    let err = FileDescriptorProto::decode(&[0x0a, 0x05, b'a']).unwrap_err();
    assert_eq!(err, DescriptorDecodeError::Wire(WireError::Truncated));
}

#[test]
fn deeply_nested_types_are_rejected() {
    let mut message = DescriptorProto::new("Leaf");
    for i in 0..80 {
        message = DescriptorProto::new(format!("N{i}")).with_nested(message);
    }
    let file = FileDescriptorProto::new("deep.proto").with_message(message);

    let err = FileDescriptorProto::decode(&file.encode_to_vec()).unwrap_err();
    assert_eq!(err, DescriptorDecodeError::TooDeep);
}

#[test]
fn map_field_builder_lowers_to_entry() {
    let message = DescriptorProto::new("M").with_map_field(
        "tag_counts",
        1,
        FieldDescriptorProto::map_key(FieldType::String),
        FieldDescriptorProto::map_value(FieldType::Int32),
    );

    assert_eq!(message.nested_type[0].name.as_deref(), Some("TagCountsEntry"));
    assert_eq!(
        message.nested_type[0].options.unwrap().map_entry,
        Some(true)
    );
    assert_eq!(message.field[0].type_name.as_deref(), Some("TagCountsEntry"));
}
