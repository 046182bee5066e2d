mod common;

use common::field;
use protoflat::proto::{DescriptorProto, EnumDescriptorProto, FileDescriptorProto, FileDescriptorSet};
use protoflat::{DescriptorPool, DiagnosticKind, Error, ErrorKind, FieldType};

fn base() -> FileDescriptorProto {
    FileDescriptorProto::new("base.proto")
        .with_package("base")
        .with_message(DescriptorProto::new("Foo").with_field(field("id", 1, FieldType::Int64)))
}

#[test]
fn unresolved_reference_leaves_pool_unchanged() {
    let mut pool = DescriptorPool::new();
    pool.add_file(&base()).unwrap();

    let bad = FileDescriptorProto::new("bad.proto").with_package("bad").with_message(
        DescriptorProto::new("Bar")
            .with_field(field("ok", 1, FieldType::Int32))
            .with_field(field("foo", 2, FieldType::Message).with_type_name(".nope.Foo")),
    );
    let err = Error::from(pool.add_serialized_file(&bad.encode_to_vec()).unwrap_err());
    assert_eq!(err.kind(), ErrorKind::Schema);
    assert!(err.diagnostics().unwrap().contains(DiagnosticKind::UnresolvedType));

    assert!(pool.find_message_by_name("base.Foo").is_some());
    assert!(pool.find_message_by_name("bad.Bar").is_none());
    assert!(pool.find_field_by_name("bad.Bar.ok").is_none());
    assert!(pool.find_file_by_name("bad.proto").is_none());
}

#[test]
fn duplicate_full_name_rejects_second_file() {
    let mut pool = DescriptorPool::new();
    pool.add_file(&base()).unwrap();

    let clash = FileDescriptorProto::new("other.proto")
        .with_package("base")
        .with_enum(EnumDescriptorProto::new("Foo").with_value("ZERO", 0));
    let err = Error::from(pool.add_file(&clash).unwrap_err());
    assert_eq!(err.kind(), ErrorKind::Schema);
    assert!(err.diagnostics().unwrap().contains(DiagnosticKind::DuplicateSymbol));

    let foo = pool.find_message_by_name("base.Foo").unwrap();
    assert_eq!(foo.file().name(), "base.proto");
    assert!(pool.find_enum_by_name("base.Foo").is_none());
}

fn dependent(name: &str, package: &str) -> FileDescriptorProto {
    FileDescriptorProto::new(name)
        .with_package(package)
        .with_dependency("base.proto")
        .with_message(
            DescriptorProto::new("Uses")
                .with_field(field("foo", 1, FieldType::Message).with_type_name(".base.Foo")),
        )
}

#[test]
fn lookups_do_not_depend_on_add_order() {
    let files = [base(), dependent("a.proto", "a"), dependent("b.proto", "b")];
    let orders = [[0, 1, 2], [0, 2, 1], [2, 1, 0], [1, 2, 0]];

    let mut snapshots = Vec::new();
    for order in orders {
        let set = FileDescriptorSet {
            file: order.iter().map(|&i| files[i].clone()).collect(),
        };
        let mut pool = DescriptorPool::new();
        assert_eq!(pool.add_file_descriptor_set(&set.encode_to_vec()).unwrap(), 3);

        let mut names: Vec<String> = pool.symbol_names().map(str::to_owned).collect();
        names.sort();
        let resolved: Vec<String> = ["a.Uses", "b.Uses"]
            .iter()
            .map(|name| {
                let uses = pool.find_message_by_name(name).unwrap();
                let foo = uses.field_by_name("foo").unwrap().message_type().unwrap();
                format!("{name}.foo -> {} ({})", foo.full_name(), foo.file().name())
            })
            .collect();
        snapshots.push((names, resolved));
    }
    assert!(snapshots.windows(2).all(|w| w[0] == w[1]));
    insta::assert_snapshot!(snapshots[0].1.join("\n"), @r"
    a.Uses.foo -> base.Foo (base.proto)
    b.Uses.foo -> base.Foo (base.proto)
    ");
}

#[test]
fn missing_dependency_is_a_schema_error() {
    let mut pool = DescriptorPool::new();
    let err = Error::from(pool.add_file(&dependent("a.proto", "a")).unwrap_err());
    assert_eq!(err.kind(), ErrorKind::Schema);
    assert!(err.diagnostics().unwrap().contains(DiagnosticKind::MissingDependency));
}
