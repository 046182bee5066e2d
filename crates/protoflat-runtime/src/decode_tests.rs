use protoflat_core::Arena;
use protoflat_wire::WireError;

use crate::test_schema::{field, hex, message, pool, unhex};
use crate::{DecodeError, DecodeOptions, EncodeOptions, MapKey, Message, Utf8Mode, Value};

fn parse<'a>(
    pool: &'a protoflat_schema::DescriptorPool,
    name: &str,
    bytes: &str,
    arena: &'a Arena,
) -> Result<Message<'a>, DecodeError> {
    Message::parse(message(pool, name), &unhex(bytes), arena, &DecodeOptions::new())
}

#[test]
fn scalar_encodings() {
    let pool = pool();
    let arena = Arena::new();
    let msg = parse(
        &pool,
        "test.Scalars",
        "08 FF FF FF FF FF FF FF FF FF 01 \
         28 03 \
         30 03 \
         3D 07 00 00 00 \
         5D 00 00 C0 3F \
         68 02 \
         72 02 68 69",
        &arena,
    )
    .unwrap();
    let def = msg.def();
    assert_eq!(msg.get(&field(def, "i32")).unwrap(), Value::I32(-1));
    assert_eq!(msg.get(&field(def, "s32")).unwrap(), Value::I32(-2));
    assert_eq!(msg.get(&field(def, "s64")).unwrap(), Value::I64(-2));
    assert_eq!(msg.get(&field(def, "fx32")).unwrap(), Value::U32(7));
    assert_eq!(msg.get(&field(def, "fl")).unwrap(), Value::F32(1.5));
    assert_eq!(msg.get(&field(def, "b")).unwrap(), Value::Bool(true));
    assert_eq!(msg.get(&field(def, "s")).unwrap(), Value::String("hi"));
}

#[test]
fn last_value_wins_for_singular_fields() {
    let pool = pool();
    let arena = Arena::new();
    let msg = parse(&pool, "test.Node", "08 01 08 02", &arena).unwrap();
    assert_eq!(msg.get(&field(msg.def(), "value")).unwrap(), Value::I32(2));
}

#[test]
fn submessages_merge_across_occurrences() {
    let pool = pool();
    let arena = Arena::new();
    // child { value: 1 } then child { name: "x" }
    let msg = parse(&pool, "test.Node", "12 02 08 01 12 03 72 01 78", &arena).unwrap();
    let def = msg.def();
    let child = msg.get(&field(def, "child")).unwrap().into_message().unwrap();
    assert_eq!(child.get(&field(def, "value")).unwrap(), Value::I32(1));
    assert_eq!(child.get(&field(def, "name")).unwrap(), Value::String("x"));
}

#[test]
fn packed_and_unpacked_are_both_accepted() {
    let pool = pool();
    let arena = Arena::new();
    let unpacked_field = parse(&pool, "test.Node", "22 03 01 02 03", &arena).unwrap();
    let packed_field = parse(&pool, "test.Node", "28 01 28 02 28 03", &arena).unwrap();
    let def = unpacked_field.def();

    let values = |m: &Message<'_>, name: &str| -> Vec<i32> {
        m.get_array(&field(def, name))
            .unwrap()
            .iter()
            .filter_map(|v| v.as_i32())
            .collect()
    };
    assert_eq!(values(&unpacked_field, "nums"), [1, 2, 3]);
    assert_eq!(values(&packed_field, "packed_nums"), [1, 2, 3]);
}

#[test]
fn closed_enum_values_go_to_unknown_fields() {
    let pool = pool();
    let arena = Arena::new();
    // color = 9 (unknown), color = 2, colors packed [1, 7, 3]
    let msg = parse(&pool, "test.Node", "68 09 68 02 5A 03 01 07 03", &arena).unwrap();
    let def = msg.def();

    assert_eq!(msg.get(&field(def, "color")).unwrap(), Value::Enum(2));
    let colors: Vec<i32> = msg
        .get_array(&field(def, "colors"))
        .unwrap()
        .iter()
        .filter_map(|v| v.as_i32())
        .collect();
    assert_eq!(colors, [1, 3]);
    assert_eq!(hex(msg.unknown_bytes()), "68 09 58 07");
}

#[test]
fn closed_enum_map_value_keeps_whole_entry_unknown() {
    let pool = pool();
    let arena = Arena::new();
    // shades { key: 1 value: 8 }
    let msg = parse(&pool, "test.Node", "7A 04 08 01 10 08", &arena).unwrap();
    assert!(msg.get_map(&field(msg.def(), "shades")).unwrap().is_empty());
    assert_eq!(hex(msg.unknown_bytes()), "7A 04 08 01 10 08");
}

#[test]
fn open_enum_keeps_unknown_numbers() {
    let pool = pool();
    let arena = Arena::new();
    let msg = parse(&pool, "test3.P3", "28 09", &arena).unwrap();
    assert_eq!(msg.get(&field(msg.def(), "e")).unwrap(), Value::Enum(9));
    assert!(msg.unknown_bytes().is_empty());
}

#[test]
fn wire_type_mismatch_is_unknown() {
    let pool = pool();
    let arena = Arena::new();
    // value declared int32, sent as fixed32
    let msg = parse(&pool, "test.Node", "0D 01 00 00 00", &arena).unwrap();
    assert!(!msg.has(&field(msg.def(), "value")).unwrap());
    assert_eq!(hex(msg.unknown_bytes()), "0D 01 00 00 00");
}

#[test]
fn groups() {
    let pool = pool();
    let arena = Arena::new();
    // item { x: 5 } as group 12, then an unknown group 20 holding a varint
    let msg = parse(&pool, "test.Node", "63 08 05 64 A3 01 08 01 A4 01", &arena).unwrap();
    let def = msg.def();
    let item = msg.get(&field(def, "item")).unwrap().into_message().unwrap();
    assert_eq!(item.get(&field(item.def(), "x")).unwrap(), Value::I32(5));
    assert_eq!(hex(msg.unknown_bytes()), "A3 01 08 01 A4 01");

    let err = parse(&pool, "test.Node", "63 08 05 6C", &arena).unwrap_err();
    assert_eq!(err, DecodeError::Wire(WireError::GroupMismatch { expected: 12, found: 13 }));
    let err = parse(&pool, "test.Node", "63 08 05", &arena).unwrap_err();
    assert_eq!(err, DecodeError::Wire(WireError::Truncated));
    let err = parse(&pool, "test.Node", "64", &arena).unwrap_err();
    assert_eq!(err, DecodeError::Wire(WireError::UnexpectedEndGroup(12)));
}

#[test]
fn maps_last_key_wins_and_missing_parts_default() {
    let pool = pool();
    let arena = Arena::new();
    // counts { key: "a" value: 1 } counts { key: "a" value: 2 } counts { value: 3 }
    let msg = parse(
        &pool,
        "test.Node",
        "32 05 0A 01 61 10 01 32 05 0A 01 61 10 02 32 02 10 03",
        &arena,
    )
    .unwrap();
    let map = msg.get_map(&field(msg.def(), "counts")).unwrap();
    assert_eq!(map.len(), 2);
    assert_eq!(map.get(&MapKey::from("a")), Some(Value::I32(2)));
    assert_eq!(map.get(&MapKey::from("")), Some(Value::I32(3)));
}

#[test]
fn map_entry_unknown_fields_are_dropped() {
    let pool = pool();
    let arena = Arena::new();
    let msg = parse(&pool, "test.Node", "32 07 0A 01 61 18 05 10 04", &arena).unwrap();
    let map = msg.get_map(&field(msg.def(), "counts")).unwrap();
    assert_eq!(map.get(&MapKey::from("a")), Some(Value::I32(4)));
    assert!(msg.unknown_bytes().is_empty());
}

#[test]
fn invalid_utf8_map_keys_keep_their_bytes() {
    let pool = pool();
    let arena = Arena::new();
    // counts { key: "\xFF" value: 1 } counts { key: "\xFE" value: 2 }
    let input = "32 05 0A 01 FF 10 01 32 05 0A 01 FE 10 02";
    let msg = parse(&pool, "test.Node", input, &arena).unwrap();
    let map = msg.get_map(&field(msg.def(), "counts")).unwrap();
    assert_eq!(map.len(), 2);

    let key = MapKey::from(&[0xFF][..]);
    assert_eq!(key.as_str(), None);
    assert_eq!(map.get(&key), Some(Value::I32(1)));
    assert_eq!(map.get(&MapKey::from(&[0xFE][..])), Some(Value::I32(2)));
    assert_eq!(hex(&msg.serialize(&EncodeOptions::new()).unwrap()), input);
}

#[test]
fn zero_tag_ends_top_level_only() {
    let pool = pool();
    let arena = Arena::new();
    let msg = parse(&pool, "test.Node", "08 01 00 08 02", &arena).unwrap();
    assert_eq!(msg.get(&field(msg.def(), "value")).unwrap(), Value::I32(1));

    let err = parse(&pool, "test.Node", "12 02 00 00", &arena).unwrap_err();
    assert_eq!(err, DecodeError::Wire(WireError::ZeroFieldNumber));
}

#[test]
fn malformed_input() {
    let pool = pool();
    let arena = Arena::new();
    let cases = [
        ("08", WireError::Truncated),
        ("12 05 08 01", WireError::Truncated),
        ("08 FF FF FF FF FF FF FF FF FF FF 01", WireError::VarintOverflow),
        ("0E", WireError::InvalidWireType(6)),
        ("12 FF FF FF FF 0F", WireError::InvalidLength(0xFFFF_FFFF)),
    ];
    for (input, expected) in cases {
        let err = parse(&pool, "test.Node", input, &arena).unwrap_err();
        assert_eq!(err, DecodeError::Wire(expected), "{input}");
    }
}

fn nested(depth: usize) -> Vec<u8> {
    let mut bytes = Vec::new();
    for _ in 0..depth {
        let mut outer = vec![0x12];
        let mut len = bytes.len();
        while len >= 0x80 {
            outer.push((len as u8) | 0x80);
            len >>= 7;
        }
        outer.push(len as u8);
        outer.extend_from_slice(&bytes);
        bytes = outer;
    }
    bytes
}

#[test]
fn recursion_limit() {
    let pool = pool();
    let def = message(&pool, "test.Node");
    let arena = Arena::new();
    let options = DecodeOptions::new();

    assert!(Message::parse(def, &nested(100), &arena, &options).is_ok());
    let err = Message::parse(def, &nested(101), &arena, &options).unwrap_err();
    assert_eq!(err, DecodeError::RecursionLimit(100));

    let tight = DecodeOptions::new().recursion_limit(3);
    assert!(Message::parse(def, &nested(3), &arena, &tight).is_ok());
    assert!(Message::parse(def, &nested(4), &arena, &tight).is_err());
}

#[test]
fn total_bytes_limit() {
    let pool = pool();
    let def = message(&pool, "test.Node");
    let arena = Arena::new();
    let options = DecodeOptions::new().total_bytes_limit(4);

    assert!(Message::parse(def, &unhex("08 01 08 02"), &arena, &options).is_ok());
    let err = Message::parse(def, &unhex("08 01 08 02 08"), &arena, &options).unwrap_err();
    insta::assert_snapshot!(err, @"input of 5 bytes exceeds the limit of 4 bytes");
}

#[test]
fn utf8_policy_depends_on_syntax() {
    let pool = pool();
    let arena = Arena::new();

    let err = parse(&pool, "test3.P3", "12 02 C3 28", &arena).unwrap_err();
    insta::assert_snapshot!(err, @"string field `test3.P3.s` contains invalid UTF-8");

    let msg = parse(&pool, "test.Node", "72 02 C3 28", &arena).unwrap();
    assert_eq!(msg.get(&field(msg.def(), "name")).unwrap(), Value::Bytes(&[0xC3, 0x28]));

    let lenient = DecodeOptions::new().utf8_mode(Some(Utf8Mode::Off));
    let p3 = message(&pool, "test3.P3");
    assert!(Message::parse(p3, &unhex("12 02 C3 28"), &arena, &lenient).is_ok());
    let strict = DecodeOptions::new().utf8_mode(Some(Utf8Mode::Strict));
    let node = message(&pool, "test.Node");
    assert!(Message::parse(node, &unhex("72 02 C3 28"), &arena, &strict).is_err());
}

#[test]
fn discard_unknown_option() {
    let pool = pool();
    let def = message(&pool, "test.Empty");
    let arena = Arena::new();
    let options = DecodeOptions::new().discard_unknown(true);
    let msg = Message::parse(def, &unhex("08 2A 12 01 00"), &arena, &options).unwrap();
    assert!(msg.unknown_bytes().is_empty());
}

#[test]
fn merge_from_bytes_appends_to_existing_contents() {
    let pool = pool();
    let arena = Arena::new();
    let mut msg = parse(&pool, "test.Node", "20 01 08 05", &arena).unwrap();
    msg.merge_from_bytes(&unhex("20 02"), &DecodeOptions::new()).unwrap();
    let def = msg.def();
    assert_eq!(msg.get_array(&field(def, "nums")).unwrap().len(), 2);
    assert_eq!(msg.get(&field(def, "value")).unwrap(), Value::I32(5));
    assert_eq!(
        hex(&msg.serialize(&EncodeOptions::new()).unwrap()),
        "08 05 20 01 20 02"
    );
}
