use indoc::indoc;
use protoflat_core::Arena;

use crate::test_schema::{field, message, pool, unhex};
use crate::{DecodeOptions, MapKey, Message, Value, check_initialized};

#[test]
fn missing_required_does_not_fail_parse() {
    let pool = pool();
    let arena = Arena::new();
    let msg = Message::parse(message(&pool, "test.Required"), &[], &arena, &DecodeOptions::new()).unwrap();
    assert!(!msg.is_initialized());
    assert_eq!(check_initialized(&msg), ["id"]);
}

#[test]
fn paths_reach_into_submessages_arrays_and_maps() {
    let pool = pool();
    let arena = Arena::new();
    let def = message(&pool, "test.Required");
    let (id, inner, list, by_name) = (
        field(def, "id"),
        field(def, "inner"),
        field(def, "list"),
        field(def, "by_name"),
    );

    let mut msg = Message::new(def, &arena).unwrap();
    msg.set(&id, Value::I32(1)).unwrap();
    msg.mutable_message(&inner).unwrap().mutable_message(&inner).unwrap();
    msg.add_message(&list).unwrap().set(&id, Value::I32(2)).unwrap();
    msg.add_message(&list).unwrap();
    msg.get_map(&by_name)
        .unwrap()
        .entry_message(MapKey::from("x"))
        .unwrap();

    insta::assert_snapshot!(check_initialized(&msg).join("\n"), @r#"
    inner.id
    inner.inner.id
    list[1].id
    by_name["x"].id
    "#);
}

#[test]
fn complete_message_is_initialized() {
    let pool = pool();
    let arena = Arena::new();
    // id: 1, inner { id: 2 }, list [{ id: 3 }]
    let bytes = unhex(indoc! {"
        08 01
        12 02 08 02
        1A 02 08 03
    "});
    let msg = Message::parse(message(&pool, "test.Required"), &bytes, &arena, &DecodeOptions::new()).unwrap();
    assert!(msg.is_initialized());
}
