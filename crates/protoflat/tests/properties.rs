mod common;

use common::{field, field_of, message, narrow, pool_with, unhex, wide};
use protoflat::proto::DescriptorProto;
use protoflat::{Arena, DecodeOptions, ErrorKind, FieldType, MapKey, Message, MessageDef, Value};

/// Small xorshift generator so the populated messages are reproducible.
struct Rng(u64);

impl Rng {
    fn next_u64(&mut self) -> u64 {
        self.0 ^= self.0 << 13;
        self.0 ^= self.0 >> 7;
        self.0 ^= self.0 << 17;
        self.0
    }

    fn chance(&mut self, percent: u64) -> bool {
        self.next_u64() % 100 < percent
    }
}

fn populate(msg: &mut Message<'_>, rng: &mut Rng, depth: u32) {
    let def = msg.def();
    let f = |name| field_of(def, name);
    let n = rng.next_u64();
    let scalars = [
        ("i32", Value::I32(n as i32)),
        ("i64", Value::I64(n as i64)),
        ("u32", Value::U32(n as u32)),
        ("u64", Value::U64(n)),
        ("s32", Value::I32(-(n as i32 >> 3))),
        ("s64", Value::I64(-(n as i64 >> 5))),
        ("f32", Value::U32(n as u32 >> 7)),
        ("f64", Value::U64(n >> 9)),
        ("sf32", Value::I32(n as i32)),
        ("sf64", Value::I64(n as i64)),
        ("fl", Value::F32(f32::from_bits(n as u32))),
        ("db", Value::F64(f64::from_bits(n))),
        ("b", Value::Bool(n & 1 == 1)),
    ];
    for (name, value) in scalars {
        if rng.chance(70) {
            msg.set(&f(name), value).unwrap();
        }
    }
    if rng.chance(50) {
        let text = format!("s{}", rng.next_u64() % 1000);
        msg.set(&f("s"), Value::String(&text)).unwrap();
    }
    if rng.chance(50) {
        let bytes = rng.next_u64().to_le_bytes();
        msg.set(&f("by"), Value::Bytes(&bytes[..(bytes[0] % 8) as usize])).unwrap();
    }
    for _ in 0..rng.next_u64() % 4 {
        msg.add(&f("list"), Value::I64(rng.next_u64() as i64)).unwrap();
        let name = format!("n{}", rng.next_u64() % 10);
        msg.add(&f("names"), Value::String(&name)).unwrap();
    }
    if depth == 0 {
        return;
    }
    if rng.chance(50) {
        populate(&mut msg.mutable_message(&f("next")).unwrap(), rng, depth - 1);
    }
    for _ in 0..rng.next_u64() % 3 {
        populate(&mut msg.add_message(&f("kids")).unwrap(), rng, depth - 1);
    }
    let mut index = msg.get_map(&f("index")).unwrap();
    for _ in 0..rng.next_u64() % 3 {
        let key = MapKey::from(format!("k{}", rng.next_u64() % 5));
        populate(&mut index.entry_message(key).unwrap(), rng, depth - 1);
    }
}

fn samples<'a>(def: MessageDef<'a>, arena: &'a Arena) -> Vec<Message<'a>> {
    let mut rng = Rng(0x2545_F491_4F6C_DD1D);
    (0..64)
        .map(|_| {
            let mut msg = Message::new(def, arena).unwrap();
            populate(&mut msg, &mut rng, 3);
            msg
        })
        .collect()
}

#[test]
fn roundtrip() {
    let pool = pool_with("p", vec![wide()]);
    let def = message(&pool, "p.Wide");
    let arena = Arena::new();

    for msg in samples(def, &arena) {
        let bytes = protoflat::serialize(&msg).unwrap();
        let back = protoflat::parse(def, &bytes, &arena).unwrap();
        assert!(protoflat::equal(&msg, &back), "{msg:?}\n{back:?}");
        assert_eq!(protoflat::serialize(&back).unwrap(), bytes);
    }
}

#[test]
fn unknown_field_transparency() {
    let full = pool_with("p", vec![wide()]);
    let subset = pool_with("p", vec![narrow()]);
    let (wide_def, narrow_def) = (message(&full, "p.Wide"), message(&subset, "p.Wide"));
    let arena = Arena::new();

    for msg in samples(wide_def, &arena) {
        let bytes = protoflat::serialize(&msg).unwrap();
        let partial = protoflat::parse(narrow_def, &bytes, &arena).unwrap();
        let through = protoflat::serialize(&partial).unwrap();
        let restored = protoflat::parse(wide_def, &through, &arena).unwrap();
        assert!(protoflat::equal(&msg, &restored), "{msg:?}\n{restored:?}");
        assert_eq!(protoflat::serialize(&restored).unwrap(), bytes);
    }
}

#[test]
fn merge_idempotent_for_scalars() {
    let pool = pool_with(
        "p",
        vec![
            DescriptorProto::new("Flat")
                .with_field(field("a", 1, FieldType::Int32))
                .with_field(field("b", 2, FieldType::String))
                .with_field(field("c", 3, FieldType::Double))
                .with_field(field("d", 4, FieldType::Bool)),
        ],
    );
    let def = message(&pool, "p.Flat");
    let arena = Arena::new();

    for input in ["", "08 05", "08 05 12 02 68 69 19 00 00 00 00 00 00 F0 3F 20 01"] {
        let mut a = protoflat::parse(def, &unhex(input), &arena).unwrap();
        let before = protoflat::deep_copy(&a, &arena).unwrap();
        let src = a.clone();
        protoflat::merge(&mut a, &src).unwrap();
        assert!(protoflat::equal(&a, &before), "{input}");
    }
}

#[test]
fn limits_are_enforced_exactly() {
    let pool = pool_with(
        "p",
        vec![DescriptorProto::new("N").with_field(field("child", 1, FieldType::Message).with_type_name("N"))],
    );
    let def = message(&pool, "p.N");
    let arena = Arena::new();

    let nested = |depth: usize| {
        let mut bytes: Vec<u8> = Vec::new();
        for _ in 0..depth {
            let mut outer = vec![0x0A, bytes.len() as u8];
            outer.extend(bytes);
            bytes = outer;
        }
        bytes
    };

    for limit in [1, 5, 20] {
        let options = DecodeOptions::new().recursion_limit(limit);
        let at = nested(limit as usize);
        let over = nested(limit as usize + 1);
        assert!(protoflat::parse_with(def, &at, &arena, &options).is_ok());
        let err = protoflat::parse_with(def, &over, &arena, &options).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Recursion);
    }

    let bytes = nested(10);
    let exact = DecodeOptions::new().total_bytes_limit(bytes.len() as u64);
    assert!(protoflat::parse_with(def, &bytes, &arena, &exact).is_ok());
    let short = DecodeOptions::new().total_bytes_limit(bytes.len() as u64 - 1);
    let err = protoflat::parse_with(def, &bytes, &arena, &short).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Limit);
}

#[test]
fn packed_and_unpacked_parse_equal() {
    let pool = pool_with(
        "p",
        vec![
            DescriptorProto::new("R")
                .with_field(field("i", 1, FieldType::SInt64).repeated())
                .with_field(field("f", 2, FieldType::Float).repeated())
                .with_field(field("b", 3, FieldType::Bool).repeated()),
        ],
    );
    let def = message(&pool, "p.R");
    let arena = Arena::new();

    // i = [-1, 1], f = [1.0], b = [true, false]
    let unpacked = "08 01 08 02 15 00 00 80 3F 18 01 18 00";
    let packed = "0A 02 01 02 12 04 00 00 80 3F 1A 02 01 00";
    let mixed = "08 01 0A 01 02 15 00 00 80 3F 1A 02 01 00";
    let a = protoflat::parse(def, &unhex(unpacked), &arena).unwrap();
    for other in [packed, mixed] {
        let b = protoflat::parse(def, &unhex(other), &arena).unwrap();
        assert!(protoflat::equal(&a, &b), "{other}");
    }
    let i: Vec<_> = a.get_array(&field_of(def, "i")).unwrap().iter().collect();
    assert_eq!(i, [Value::I64(-1), Value::I64(1)]);
}
