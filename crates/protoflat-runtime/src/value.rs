use std::fmt;

use protoflat_core::FieldType;

use crate::array::Array;
use crate::map::Map;
use crate::message::Message;

/// A field value read from or written to a message.
///
/// Scalars are copied out; strings, bytes, submessages, arrays and maps
/// borrow arena storage for `'a`.
#[derive(Clone, Debug)]
pub enum Value<'a> {
    Bool(bool),
    I32(i32),
    I64(i64),
    U32(u32),
    U64(u64),
    F32(f32),
    F64(f64),
    String(&'a str),
    Bytes(&'a [u8]),
    Enum(i32),
    Message(Message<'a>),
    Array(Array<'a>),
    Map(Map<'a>),
}

impl<'a> Value<'a> {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Bool(_) => "bool",
            Value::I32(_) => "int32",
            Value::I64(_) => "int64",
            Value::U32(_) => "uint32",
            Value::U64(_) => "uint64",
            Value::F32(_) => "float",
            Value::F64(_) => "double",
            Value::String(_) => "string",
            Value::Bytes(_) => "bytes",
            Value::Enum(_) => "enum",
            Value::Message(_) => "message",
            Value::Array(_) => "array",
            Value::Map(_) => "map",
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match *self {
            Value::Bool(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_i32(&self) -> Option<i32> {
        match *self {
            Value::I32(v) | Value::Enum(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Value::I64(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_u32(&self) -> Option<u32> {
        match *self {
            Value::U32(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match *self {
            Value::U64(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_f32(&self) -> Option<f32> {
        match *self {
            Value::F32(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Value::F64(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&'a str> {
        match *self {
            Value::String(v) => Some(v),
            _ => None,
        }
    }

    /// Bytes of a `bytes` or `string` value.
    pub fn as_bytes(&self) -> Option<&'a [u8]> {
        match *self {
            Value::Bytes(v) => Some(v),
            Value::String(v) => Some(v.as_bytes()),
            _ => None,
        }
    }

    pub fn into_message(self) -> Option<Message<'a>> {
        match self {
            Value::Message(m) => Some(m),
            _ => None,
        }
    }

    pub fn into_array(self) -> Option<Array<'a>> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn into_map(self) -> Option<Map<'a>> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }
}

impl PartialEq for Value<'_> {
    /// Floats compare by bit pattern, so `NaN` equals itself.
    fn eq(&self, other: &Self) -> bool {
        crate::compare::value_equal(self, other)
    }
}

/// Key of a map field.
///
/// String keys hold their raw bytes, so a proto2 key that is not valid
/// UTF-8 survives a round trip unchanged. Keys order by value, strings
/// bytewise.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MapKey {
    Bool(bool),
    I32(i32),
    I64(i64),
    U32(u32),
    U64(u64),
    String(Box<[u8]>),
}

impl MapKey {
    /// Text of a string key, `None` for other keys or invalid UTF-8.
    pub fn as_str(&self) -> Option<&str> {
        std::str::from_utf8(self.as_bytes()?).ok()
    }

    /// Raw bytes of a string key.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            MapKey::String(bytes) => Some(bytes),
            _ => None,
        }
    }

    /// Whether this key can be stored under a key field of `field_type`.
    pub fn fits(&self, field_type: FieldType) -> bool {
        matches!(
            (self, field_type),
            (MapKey::Bool(_), FieldType::Bool)
                | (
                    MapKey::I32(_),
                    FieldType::Int32 | FieldType::SInt32 | FieldType::SFixed32
                )
                | (
                    MapKey::I64(_),
                    FieldType::Int64 | FieldType::SInt64 | FieldType::SFixed64
                )
                | (MapKey::U32(_), FieldType::UInt32 | FieldType::Fixed32)
                | (MapKey::U64(_), FieldType::UInt64 | FieldType::Fixed64)
                | (MapKey::String(_), FieldType::String)
        )
    }

    pub(crate) fn kind_name(&self) -> &'static str {
        match self {
            MapKey::Bool(_) => "bool",
            MapKey::I32(_) => "int32",
            MapKey::I64(_) => "int64",
            MapKey::U32(_) => "uint32",
            MapKey::U64(_) => "uint64",
            MapKey::String(_) => "string",
        }
    }

    /// Key decoded from scalar bits of a non-string key field.
    pub(crate) fn from_bits(field_type: FieldType, bits: u64) -> MapKey {
        match field_type {
            FieldType::Bool => MapKey::Bool(bits != 0),
            FieldType::Int32 | FieldType::SInt32 | FieldType::SFixed32 => {
                MapKey::I32(bits as u32 as i32)
            }
            FieldType::Int64 | FieldType::SInt64 | FieldType::SFixed64 => MapKey::I64(bits as i64),
            FieldType::UInt32 | FieldType::Fixed32 => MapKey::U32(bits as u32),
            _ => MapKey::U64(bits),
        }
    }

    /// Scalar bits of a non-string key.
    pub(crate) fn bits(&self) -> u64 {
        match *self {
            MapKey::Bool(v) => u64::from(v),
            MapKey::I32(v) => u64::from(v as u32),
            MapKey::I64(v) => v as u64,
            MapKey::U32(v) => u64::from(v),
            MapKey::U64(v) => v,
            MapKey::String(_) => 0,
        }
    }

    /// Zero key used when an entry on the wire omits its key.
    pub(crate) fn zero(field_type: FieldType) -> MapKey {
        match field_type {
            FieldType::String => MapKey::String(Box::default()),
            _ => MapKey::from_bits(field_type, 0),
        }
    }
}

impl fmt::Display for MapKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MapKey::Bool(v) => write!(f, "{v}"),
            MapKey::I32(v) => write!(f, "{v}"),
            MapKey::I64(v) => write!(f, "{v}"),
            MapKey::U32(v) => write!(f, "{v}"),
            MapKey::U64(v) => write!(f, "{v}"),
            MapKey::String(v) => write!(f, "{:?}", String::from_utf8_lossy(v)),
        }
    }
}

impl fmt::Debug for MapKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MapKey::Bool(v) => f.debug_tuple("Bool").field(v).finish(),
            MapKey::I32(v) => f.debug_tuple("I32").field(v).finish(),
            MapKey::I64(v) => f.debug_tuple("I64").field(v).finish(),
            MapKey::U32(v) => f.debug_tuple("U32").field(v).finish(),
            MapKey::U64(v) => f.debug_tuple("U64").field(v).finish(),
            MapKey::String(v) => match std::str::from_utf8(v) {
                Ok(text) => f.debug_tuple("String").field(&text).finish(),
                Err(_) => f.debug_tuple("String").field(v).finish(),
            },
        }
    }
}

impl From<bool> for MapKey {
    fn from(v: bool) -> Self {
        MapKey::Bool(v)
    }
}

impl From<i32> for MapKey {
    fn from(v: i32) -> Self {
        MapKey::I32(v)
    }
}

impl From<i64> for MapKey {
    fn from(v: i64) -> Self {
        MapKey::I64(v)
    }
}

impl From<u32> for MapKey {
    fn from(v: u32) -> Self {
        MapKey::U32(v)
    }
}

impl From<u64> for MapKey {
    fn from(v: u64) -> Self {
        MapKey::U64(v)
    }
}

impl From<&str> for MapKey {
    fn from(v: &str) -> Self {
        MapKey::String(v.as_bytes().into())
    }
}

impl From<String> for MapKey {
    fn from(v: String) -> Self {
        MapKey::String(v.into_bytes().into_boxed_slice())
    }
}

/// A string key from raw bytes, which need not be UTF-8.
impl From<&[u8]> for MapKey {
    fn from(v: &[u8]) -> Self {
        MapKey::String(v.into())
    }
}

/// Scalar bits for `value` if it fits a field of `field_type`.
pub(crate) fn scalar_bits(field_type: FieldType, value: &Value<'_>) -> Option<u64> {
    let bits = match (field_type, value) {
        (FieldType::Bool, Value::Bool(v)) => u64::from(*v),
        (FieldType::Int32 | FieldType::SInt32 | FieldType::SFixed32, Value::I32(v))
        | (FieldType::Enum, Value::Enum(v)) => u64::from(*v as u32),
        (FieldType::Int64 | FieldType::SInt64 | FieldType::SFixed64, Value::I64(v)) => *v as u64,
        (FieldType::UInt32 | FieldType::Fixed32, Value::U32(v)) => u64::from(*v),
        (FieldType::UInt64 | FieldType::Fixed64, Value::U64(v)) => *v,
        (FieldType::Float, Value::F32(v)) => u64::from(v.to_bits()),
        (FieldType::Double, Value::F64(v)) => v.to_bits(),
        _ => return None,
    };
    Some(bits)
}

/// Value of scalar bits stored for a field of `field_type`.
pub(crate) fn scalar_value(field_type: FieldType, bits: u64) -> Value<'static> {
    match field_type {
        FieldType::Bool => Value::Bool(bits != 0),
        FieldType::Int32 | FieldType::SInt32 | FieldType::SFixed32 => Value::I32(bits as u32 as i32),
        FieldType::Int64 | FieldType::SInt64 | FieldType::SFixed64 => Value::I64(bits as i64),
        FieldType::UInt32 | FieldType::Fixed32 => Value::U32(bits as u32),
        FieldType::UInt64 | FieldType::Fixed64 => Value::U64(bits),
        FieldType::Float => Value::F32(f32::from_bits(bits as u32)),
        FieldType::Double => Value::F64(f64::from_bits(bits)),
        FieldType::Enum => Value::Enum(bits as u32 as i32),
        FieldType::String | FieldType::Bytes | FieldType::Message | FieldType::Group => {
            Value::U64(bits)
        }
    }
}

/// Value for string or bytes data. Invalid UTF-8 in a string field reads as bytes.
pub(crate) fn str_value(field_type: FieldType, bytes: &[u8]) -> Value<'_> {
    match field_type {
        FieldType::String => std::str::from_utf8(bytes).map_or(Value::Bytes(bytes), Value::String),
        _ => Value::Bytes(bytes),
    }
}
