use crate::proto::{DescriptorProto, FieldDescriptorProto, FileDescriptorProto};
use crate::{
    AccessError, AllocError, Arena, DecodeError, DescriptorPool, EncodeError, Error, ErrorKind, FieldType,
    Value, WireError,
};

#[test]
fn wire_errors_map_to_kinds() {
    let cases = [
        (WireError::Truncated, ErrorKind::Truncated),
        (WireError::VarintOverflow, ErrorKind::Malformed),
        (WireError::InvalidWireType(7), ErrorKind::Malformed),
        (WireError::ZeroFieldNumber, ErrorKind::Malformed),
        (WireError::InvalidLength(u64::MAX), ErrorKind::Malformed),
        (WireError::GroupMismatch { expected: 1, found: 2 }, ErrorKind::Malformed),
        (WireError::UnexpectedEndGroup(3), ErrorKind::Malformed),
        (WireError::GroupDepth, ErrorKind::Recursion),
    ];
    for (wire, kind) in cases {
        assert_eq!(Error::from(DecodeError::Wire(wire)).kind(), kind, "{wire}");
    }
}

#[test]
fn runtime_errors_map_to_kinds() {
    let alloc = AllocError { size: 8, align: 8 };
    let cases = [
        (Error::from(DecodeError::RecursionLimit(100)), ErrorKind::Recursion),
        (Error::from(DecodeError::TotalBytesLimit { size: 2, limit: 1 }), ErrorKind::Limit),
        (Error::from(DecodeError::InvalidUtf8("a.B.c".into())), ErrorKind::Utf8),
        (Error::from(DecodeError::Alloc(alloc)), ErrorKind::Alloc),
        (Error::from(EncodeError::RecursionLimit(100)), ErrorKind::Recursion),
        (Error::from(EncodeError::MissingRequired(vec!["id".into()])), ErrorKind::Malformed),
        (Error::from(EncodeError::InvalidUtf8("a.B.c".into())), ErrorKind::Utf8),
        (Error::from(EncodeError::TooLarge(usize::MAX)), ErrorKind::Limit),
        (Error::from(AccessError::Alloc(alloc)), ErrorKind::Alloc),
        (Error::from(alloc), ErrorKind::Alloc),
        (
            Error::from(AccessError::UnknownEnumValue {
                enum_name: "a.E".into(),
                number: 9,
            }),
            ErrorKind::Type,
        ),
    ];
    for (err, kind) in cases {
        assert_eq!(err.kind(), kind, "{err}");
    }
}

#[test]
fn schema_errors_carry_diagnostics() {
    let file = FileDescriptorProto::new("bad.proto").with_message(
        DescriptorProto::new("M").with_field(
            FieldDescriptorProto::new("f", 1, FieldType::Message).with_type_name(".nope.Foo"),
        ),
    );
    let mut pool = DescriptorPool::new();
    let err = Error::from(pool.add_file(&file).unwrap_err());
    assert_eq!(err.kind(), ErrorKind::Schema);
    assert!(err.diagnostics().is_some_and(|d| d.has_errors()));
}

#[test]
fn access_errors_surface_through_the_facade() {
    let file = FileDescriptorProto::new("m.proto")
        .with_message(DescriptorProto::new("M").with_field(FieldDescriptorProto::new("x", 1, FieldType::Int32)));
    let mut pool = DescriptorPool::new();
    pool.add_file(&file).unwrap();
    let def = pool.find_message_by_name("M").unwrap();
    let x = def.field_by_name("x").unwrap();

    let arena = Arena::new();
    let mut msg = crate::parse(def, &[], &arena).unwrap();
    let err: Error = msg.set(&x, Value::String("no")).unwrap_err().into();
    assert_eq!(err.kind(), ErrorKind::Type);
    insta::assert_snapshot!(err, @"`M.x` holds int32 values, got string");
}
