//! Schema-less rendering of wire data, in the style of `protoc --decode_raw`.
//!
//! ```text
//! 1: 150
//! 2 {
//!   1: "abc"
//! }
//! 3: 0x3ff0000000000000
//! ```
//!
//! Length-delimited payloads that parse cleanly as a message are shown as a
//! nested block; everything else is shown as a C-escaped string.

use std::fmt::Write as _;

use protoflat_core::WireType;

use crate::error::WireError;
use crate::reader::Reader;

/// Nesting bound for both groups and speculative submessage parsing.
const MAX_DEPTH: u32 = 64;

#[derive(Debug, Clone, PartialEq)]
enum RawValue<'b> {
    Varint(u64),
    Fixed64(u64),
    Fixed32(u32),
    Bytes(&'b [u8]),
    Group(Vec<RawField<'b>>),
}

#[derive(Debug, Clone, PartialEq)]
struct RawField<'b> {
    number: u32,
    value: RawValue<'b>,
}

/// Renders `bytes` as a tree of field numbers and raw values.
pub fn decode_raw(bytes: &[u8]) -> Result<String, WireError> {
    let mut reader = Reader::new(bytes);
    let fields = parse_fields(&mut reader, None, MAX_DEPTH)?;
    let mut out = String::new();
    print_fields(&fields, 0, MAX_DEPTH, &mut out);
    Ok(out)
}

fn parse_fields<'b>(
    reader: &mut Reader<'b>,
    group: Option<u32>,
    depth: u32,
) -> Result<Vec<RawField<'b>>, WireError> {
    let mut fields = Vec::new();
    loop {
        if reader.is_at_limit() {
            return match group {
                Some(_) => Err(WireError::Truncated),
                None => Ok(fields),
            };
        }
        let tag = reader.read_tag()?;
        let value = match tag.wire_type {
            WireType::Varint => RawValue::Varint(reader.read_varint64()?),
            WireType::Fixed64 => RawValue::Fixed64(reader.read_fixed64()?),
            WireType::Fixed32 => RawValue::Fixed32(reader.read_fixed32()?),
            WireType::Len => RawValue::Bytes(reader.read_len_delimited()?),
            WireType::StartGroup => {
                if depth == 0 {
                    return Err(WireError::GroupDepth);
                }
                RawValue::Group(parse_fields(reader, Some(tag.number), depth - 1)?)
            }
            WireType::EndGroup => {
                return match group {
                    Some(expected) if expected == tag.number => Ok(fields),
                    Some(expected) => Err(WireError::GroupMismatch {
                        expected,
                        found: tag.number,
                    }),
                    None => Err(WireError::UnexpectedEndGroup(tag.number)),
                };
            }
        };
        fields.push(RawField {
            number: tag.number,
            value,
        });
    }
}

fn print_fields(fields: &[RawField<'_>], indent: usize, depth: u32, out: &mut String) {
    for field in fields {
        let pad = "  ".repeat(indent);
        match &field.value {
            RawValue::Varint(v) => {
                let _ = writeln!(out, "{pad}{}: {v}", field.number);
            }
            RawValue::Fixed64(v) => {
                let _ = writeln!(out, "{pad}{}: 0x{v:016x}", field.number);
            }
            RawValue::Fixed32(v) => {
                let _ = writeln!(out, "{pad}{}: 0x{v:08x}", field.number);
            }
            RawValue::Group(inner) => {
                print_block(field.number, inner, indent, depth, out);
            }
            RawValue::Bytes(bytes) => {
                let nested = if !bytes.is_empty() && depth > 0 {
                    parse_fields(&mut Reader::new(bytes), None, depth - 1).ok()
                } else {
                    None
                };
                match nested {
                    Some(inner) => print_block(field.number, &inner, indent, depth, out),
                    None => {
                        let _ = writeln!(out, "{pad}{}: \"{}\"", field.number, c_escape(bytes));
                    }
                }
            }
        }
    }
}

fn print_block(number: u32, inner: &[RawField<'_>], indent: usize, depth: u32, out: &mut String) {
    let pad = "  ".repeat(indent);
    let _ = writeln!(out, "{pad}{number} {{");
    print_fields(inner, indent + 1, depth.saturating_sub(1), out);
    let _ = writeln!(out, "{pad}}}");
}

/// Escapes bytes the way C string literals (and `protoc`) do.
pub fn c_escape(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len());
    for &b in bytes {
        match b {
            b'\n' => out.push_str("\\n"),
            b'\r' => out.push_str("\\r"),
            b'\t' => out.push_str("\\t"),
            b'"' => out.push_str("\\\""),
            b'\'' => out.push_str("\\'"),
            b'\\' => out.push_str("\\\\"),
            0x20..=0x7e => out.push(b as char),
            _ => {
                let _ = write!(out, "\\{b:03o}");
            }
        }
    }
    out
}
