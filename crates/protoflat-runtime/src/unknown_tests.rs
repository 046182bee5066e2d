use protoflat_core::{Arena, WireType};

use crate::test_schema::{hex, message, pool, unhex};
use crate::{DecodeOptions, EncodeOptions, Message, UnknownValue};

#[test]
fn iterates_records_in_wire_order() {
    let pool = pool();
    let arena = Arena::new();
    // 1: varint 150, 2: fixed64 1, 3: "ab", 4: group { 1: 7 }, 5: fixed32 2
    let bytes = unhex("08 96 01 11 01 00 00 00 00 00 00 00 1A 02 61 62 23 08 07 24 2D 02 00 00 00");
    let msg = Message::parse(message(&pool, "test.Empty"), &bytes, &arena, &DecodeOptions::new()).unwrap();

    let records: Vec<_> = msg.unknown_fields().collect();
    assert_eq!(records.len(), 5);
    assert_eq!(records[0].number, 1);
    assert_eq!(records[0].value, UnknownValue::Varint(150));
    assert_eq!(records[1].value, UnknownValue::Fixed64(1));
    assert_eq!(records[2].value, UnknownValue::LengthDelimited(b"ab"));
    assert_eq!(records[3].value, UnknownValue::Group(&[0x08, 0x07]));
    assert_eq!(records[3].value.wire_type(), WireType::StartGroup);
    assert_eq!(hex(records[3].raw), "23 08 07 24");
    assert_eq!(records[4].value, UnknownValue::Fixed32(2));
}

#[test]
fn appended_bytes_are_serialized_verbatim() {
    let pool = pool();
    let arena = Arena::new();
    let mut msg = Message::new(message(&pool, "test.Empty"), &arena).unwrap();
    msg.append_unknown(&unhex("08 01")).unwrap();
    msg.append_unknown(&unhex("10 02")).unwrap();
    assert_eq!(hex(msg.unknown_bytes()), "08 01 10 02");
    assert_eq!(hex(&msg.serialize(&EncodeOptions::new()).unwrap()), "08 01 10 02");
}

#[test]
fn iteration_stops_at_malformed_bytes() {
    let pool = pool();
    let arena = Arena::new();
    let mut msg = Message::new(message(&pool, "test.Empty"), &arena).unwrap();
    msg.append_unknown(&unhex("08 01 12 05 00")).unwrap();
    let numbers: Vec<u32> = msg.unknown_fields().map(|f| f.number).collect();
    assert_eq!(numbers, [1]);
}

#[test]
fn discard_unknown_recurses_into_submessages() {
    let pool = pool();
    let arena = Arena::new();
    // value: 1, child { 99: 1 }, 99: 2
    let bytes = unhex("08 01 12 03 98 06 01 98 06 02");
    let mut msg = Message::parse(message(&pool, "test.Node"), &bytes, &arena, &DecodeOptions::new()).unwrap();

    msg.discard_unknown(false);
    assert_eq!(hex(&msg.serialize(&EncodeOptions::new()).unwrap()), "08 01 12 03 98 06 01");

    msg.discard_unknown(true);
    assert_eq!(hex(&msg.serialize(&EncodeOptions::new()).unwrap()), "08 01 12 00");
}

#[test]
fn read_view_survives_append_through_clone() {
    let pool = pool();
    let arena = Arena::new();
    let a = Message::parse(message(&pool, "test.Empty"), &unhex("08 2A"), &arena, &DecodeOptions::new()).unwrap();
    let mut b = a.clone();

    let view = a.unknown_bytes();
    b.append_unknown(&[0x10; 65536]).unwrap();
    for _ in 0..64 {
        arena.alloc_bytes(&[0xEE; 4096]).unwrap();
    }

    assert_eq!(hex(view), "08 2A");
    assert_eq!(a.unknown_bytes().len(), 2 + 65536);
    assert_eq!(hex(&a.unknown_bytes()[..4]), "08 2A 10 10");
}

#[test]
fn appends_after_discard_leave_old_view_intact() {
    let pool = pool();
    let arena = Arena::new();
    let mut msg = Message::new(message(&pool, "test.Empty"), &arena).unwrap();
    msg.append_unknown(&unhex("08 01")).unwrap();
    let mut other = msg.clone();
    let view = msg.unknown_bytes();

    other.discard_unknown(false);
    other.append_unknown(&unhex("10 02")).unwrap();

    assert_eq!(hex(view), "08 01");
    assert_eq!(hex(msg.unknown_bytes()), "10 02");
}
