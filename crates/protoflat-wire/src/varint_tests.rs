use crate::WireError;
use crate::varint::*;

fn encoded(value: u64) -> Vec<u8> {
    let mut out = Vec::new();
    encode_varint(value, &mut out);
    out
}

#[test]
fn encode_small_values() {
    assert_eq!(encoded(0), vec![0x00]);
    assert_eq!(encoded(1), vec![0x01]);
    assert_eq!(encoded(127), vec![0x7f]);
    assert_eq!(encoded(128), vec![0x80, 0x01]);
    assert_eq!(encoded(150), vec![0x96, 0x01]);
}

#[test]
fn encode_max_is_ten_bytes() {
    let bytes = encoded(u64::MAX);
    assert_eq!(bytes.len(), 10);
    assert_eq!(bytes[9], 0x01);
}

#[test]
fn negative_int32_sign_extends_to_ten_bytes() {
    assert_eq!(encoded(-1i64 as u64).len(), 10);
}

#[test]
fn decode_reports_consumed_length() {
    assert_eq!(decode_varint(&[0x96, 0x01, 0xff]), Ok((150, 2)));
    assert_eq!(decode_varint(&[0x00]), Ok((0, 1)));
}

#[test]
fn decode_rejects_eleven_bytes() {
    let bytes = [0xff; 11];
    assert_eq!(decode_varint(&bytes), Err(WireError::VarintOverflow));
}

#[test]
fn decode_truncated() {
    assert_eq!(decode_varint(&[]), Err(WireError::Truncated));
    assert_eq!(decode_varint(&[0x80, 0x80]), Err(WireError::Truncated));
}

#[test]
fn varint_len_matches_encoding() {
    for value in [0, 1, 127, 128, 16_383, 16_384, u32::MAX as u64, u64::MAX] {
        assert_eq!(varint_len(value), encoded(value).len(), "value {value}");
    }
}

#[test]
fn zigzag_mapping() {
    assert_eq!(encode_zigzag32(0), 0);
    assert_eq!(encode_zigzag32(-1), 1);
    assert_eq!(encode_zigzag32(1), 2);
    assert_eq!(encode_zigzag32(-2), 3);
    assert_eq!(encode_zigzag32(i32::MAX), u32::MAX - 1);
    assert_eq!(encode_zigzag32(i32::MIN), u32::MAX);
    assert_eq!(encode_zigzag64(i64::MIN), u64::MAX);

    for n in [0, 1, -1, 12345, -12345, i32::MAX, i32::MIN] {
        assert_eq!(decode_zigzag32(encode_zigzag32(n)), n);
    }
    for n in [0, -1, i64::MAX, i64::MIN] {
        assert_eq!(decode_zigzag64(encode_zigzag64(n)), n);
    }
}
