use protoflat_core::FieldType;

use super::*;
use crate::proto::{DescriptorProto, EnumDescriptorProto, FieldDescriptorProto, FileDescriptorProto};

fn message_field(name: &str, number: i32, type_name: &str) -> FieldDescriptorProto {
    FieldDescriptorProto::new(name, number, FieldType::Message).with_type_name(type_name)
}

fn target(pool: &DescriptorPool, field: &str) -> String {
    let field = pool.find_field_by_name(field).unwrap();
    field.message_type().unwrap().full_name().to_owned()
}

fn add(pool: &mut DescriptorPool, file: FileDescriptorProto) -> String {
    match pool.add_file(&file) {
        Ok(_) => String::new(),
        Err(err) => err.diagnostics().render(),
    }
}

#[test]
fn innermost_scope_wins() {
    let file = FileDescriptorProto::new("a.proto")
        .with_package("a.b")
        .with_message(DescriptorProto::new("Inner"))
        .with_message(
            DescriptorProto::new("Outer")
                .with_nested(DescriptorProto::new("Inner"))
                .with_field(message_field("near", 1, "Inner"))
                .with_field(message_field("absolute", 2, ".a.b.Inner"))
                .with_field(message_field("via_package", 3, "b.Inner")),
        );
    let mut pool = DescriptorPool::new();
    assert_eq!(add(&mut pool, file), "");

    assert_eq!(target(&pool, "a.b.Outer.near"), "a.b.Outer.Inner");
    assert_eq!(target(&pool, "a.b.Outer.absolute"), "a.b.Inner");
    assert_eq!(target(&pool, "a.b.Outer.via_package"), "a.b.Inner");
}

#[test]
fn fields_do_not_shadow_types() {
    let file = FileDescriptorProto::new("p.proto")
        .with_package("p")
        .with_message(DescriptorProto::new("Thing"))
        .with_message(DescriptorProto::new("M").with_field(message_field("Thing", 1, "Thing")));
    let mut pool = DescriptorPool::new();
    assert_eq!(add(&mut pool, file), "");

    assert_eq!(target(&pool, "p.M.Thing"), "p.Thing");
}

#[test]
fn compound_name_stops_at_first_aggregate() {
    let file = FileDescriptorProto::new("p.proto")
        .with_package("p")
        .with_message(DescriptorProto::new("Sub").with_nested(DescriptorProto::new("Deep")))
        .with_message(
            DescriptorProto::new("M")
                .with_nested(DescriptorProto::new("Sub"))
                .with_field(message_field("f", 1, "Sub.Deep")),
        );
    let mut pool = DescriptorPool::new();

    insta::assert_snapshot!(add(&mut pool, file), @"error[p.M.f]: `Sub.Deep` is not defined");
}

#[test]
fn compound_name_skips_non_aggregates() {
    let file = FileDescriptorProto::new("p.proto")
        .with_package("p")
        .with_message(DescriptorProto::new("Sub").with_nested(DescriptorProto::new("Deep")))
        .with_message(
            DescriptorProto::new("M")
                .with_field(FieldDescriptorProto::new("Sub", 1, FieldType::Int32))
                .with_field(message_field("f", 2, "Sub.Deep")),
        );
    let mut pool = DescriptorPool::new();
    assert_eq!(add(&mut pool, file), "");

    assert_eq!(target(&pool, "p.M.f"), "p.Sub.Deep");
}

#[test]
fn missing_type_is_inferred_from_the_symbol() {
    let untyped = |name: &str, number: i32, type_name: &str| FieldDescriptorProto {
        name: Some(name.into()),
        number: Some(number),
        type_name: Some(type_name.into()),
        ..Default::default()
    };
    let file = FileDescriptorProto::new("p.proto")
        .with_package("p")
        .with_enum(EnumDescriptorProto::new("Kind").with_value("KIND_A", 0))
        .with_message(
            DescriptorProto::new("M")
                .with_field(untyped("kind", 1, "Kind"))
                .with_field(untyped("child", 2, "M")),
        );
    let mut pool = DescriptorPool::new();
    assert_eq!(add(&mut pool, file), "");

    let kind = pool.find_field_by_name("p.M.kind").unwrap();
    assert_eq!(kind.field_type(), FieldType::Enum);
    assert_eq!(kind.enum_type().unwrap().full_name(), "p.Kind");
    let child = pool.find_field_by_name("p.M.child").unwrap();
    assert_eq!(child.field_type(), FieldType::Message);
}

#[test]
fn nested_package_scopes_are_searched_outward() {
    let base = FileDescriptorProto::new("base.proto")
        .with_package("corp")
        .with_message(DescriptorProto::new("Shared"));
    let user = FileDescriptorProto::new("user.proto")
        .with_package("corp.team.svc")
        .with_dependency("base.proto")
        .with_message(DescriptorProto::new("M").with_field(message_field("s", 1, "Shared")));
    let mut pool = DescriptorPool::new();
    assert_eq!(add(&mut pool, base), "");
    assert_eq!(add(&mut pool, user), "");

    assert_eq!(target(&pool, "corp.team.svc.M.s"), "corp.Shared");
}

#[test]
fn absolute_names_ignore_scope() {
    let file = FileDescriptorProto::new("p.proto")
        .with_package("p")
        .with_message(
            DescriptorProto::new("M")
                .with_nested(DescriptorProto::new("M"))
                .with_field(message_field("outer", 1, ".p.M"))
                .with_field(message_field("inner", 2, "M")),
        );
    let mut pool = DescriptorPool::new();
    assert_eq!(add(&mut pool, file), "");

    assert_eq!(target(&pool, "p.M.outer"), "p.M");
    assert_eq!(target(&pool, "p.M.inner"), "p.M.M");
}
