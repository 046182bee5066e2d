//! Name checks, JSON names and default-value parsing.

use protoflat_core::FieldType;

use super::data::DefaultValue;

/// `[A-Za-z_][A-Za-z0-9_]*`
pub(crate) fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Dot-separated identifiers; the empty package is allowed.
pub(crate) fn is_package_name(name: &str) -> bool {
    name.is_empty() || name.split('.').all(is_identifier)
}

/// lowerCamelCase JSON name: underscores dropped, the next letter upper-cased.
pub fn to_json_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut capitalize_next = false;
    for c in name.chars() {
        if c == '_' {
            capitalize_next = true;
        } else if capitalize_next {
            out.push(c.to_ascii_uppercase());
            capitalize_next = false;
        } else {
            out.push(c);
        }
    }
    out
}

/// Name of the synthetic entry message behind `map<..> field_name`:
/// UpperCamelCase of the field name plus `Entry`.
pub(crate) fn map_entry_name(field_name: &str) -> String {
    let mut out = String::with_capacity(field_name.len() + 5);
    let mut upper = true;
    for c in field_name.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.push(c.to_ascii_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out.push_str("Entry");
    out
}

/// Parses an integer the way `strtol(s, _, 0)` does: decimal, `0x` hex or
/// leading-zero octal, with an optional sign.
fn parse_int(s: &str) -> Option<i128> {
    let (negative, digits) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s),
    };
    if digits.is_empty() || digits.starts_with(['+', '-']) {
        return None;
    }
    let magnitude = if let Some(hex) = digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
    {
        i128::from_str_radix(hex, 16).ok()?
    } else if digits.len() > 1 && digits.starts_with('0') {
        i128::from_str_radix(&digits[1..], 8).ok()?
    } else {
        digits.parse::<i128>().ok()?
    };
    Some(if negative { -magnitude } else { magnitude })
}

fn parse_float(s: &str) -> Option<f64> {
    match s {
        "inf" => Some(f64::INFINITY),
        "-inf" => Some(f64::NEG_INFINITY),
        "nan" => Some(f64::NAN),
        _ => {
            let trimmed = s.strip_suffix(['f', 'F']).unwrap_or(s);
            trimmed.parse::<f64>().ok()
        }
    }
}

/// Parses a `default_value` string for a scalar field.
///
/// Enum defaults name a value and are resolved by the caller.
pub(crate) fn parse_default(field_type: FieldType, s: &str) -> Option<DefaultValue> {
    use DefaultValue as D;
    Some(match field_type {
        FieldType::Int32 | FieldType::SInt32 | FieldType::SFixed32 => {
            D::I32(i32::try_from(parse_int(s)?).ok()?)
        }
        FieldType::Int64 | FieldType::SInt64 | FieldType::SFixed64 => {
            D::I64(i64::try_from(parse_int(s)?).ok()?)
        }
        FieldType::UInt32 | FieldType::Fixed32 => {
            if s.starts_with('-') {
                return None;
            }
            D::U32(u32::try_from(parse_int(s)?).ok()?)
        }
        FieldType::UInt64 | FieldType::Fixed64 => {
            if s.starts_with('-') {
                return None;
            }
            D::U64(u64::try_from(parse_int(s)?).ok()?)
        }
        FieldType::Float => D::F32(parse_float(s)? as f32),
        FieldType::Double => D::F64(parse_float(s)?),
        FieldType::Bool => match s {
            "true" => D::Bool(true),
            "false" => D::Bool(false),
            _ => return None,
        },
        FieldType::String => D::String(s.to_owned()),
        FieldType::Bytes => D::Bytes(unescape_c(s)?),
        FieldType::Enum | FieldType::Message | FieldType::Group => return None,
    })
}

/// Reverses C-style escaping as used for `bytes` defaults.
pub(crate) fn unescape_c(s: &str) -> Option<Vec<u8>> {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        i += 1;
        if b != b'\\' {
            out.push(b);
            continue;
        }
        let esc = *bytes.get(i)?;
        i += 1;
        match esc {
            b'n' => out.push(b'\n'),
            b'r' => out.push(b'\r'),
            b't' => out.push(b'\t'),
            b'a' => out.push(0x07),
            b'b' => out.push(0x08),
            b'f' => out.push(0x0c),
            b'v' => out.push(0x0b),
            b'\\' | b'\'' | b'"' | b'?' => out.push(esc),
            b'0'..=b'7' => {
                let mut value = u32::from(esc - b'0');
                for _ in 0..2 {
                    match bytes.get(i) {
                        Some(d @ b'0'..=b'7') => {
                            value = value * 8 + u32::from(d - b'0');
                            i += 1;
                        }
                        _ => break,
                    }
                }
                out.push(u8::try_from(value).ok()?);
            }
            b'x' | b'X' => {
                let mut value = 0u32;
                let mut digits = 0;
                while digits < 2 {
                    match bytes.get(i).and_then(|d| (*d as char).to_digit(16)) {
                        Some(d) => {
                            value = value * 16 + d;
                            i += 1;
                            digits += 1;
                        }
                        None => break,
                    }
                }
                if digits == 0 {
                    return None;
                }
                out.push(value as u8);
            }
            _ => return None,
        }
    }
    Some(out)
}
