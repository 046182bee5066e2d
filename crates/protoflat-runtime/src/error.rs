use protoflat_core::AllocError;
use protoflat_wire::WireError;

/// Parsing stopped. The target message keeps whatever was decoded before the
/// failure and should be discarded.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error(transparent)]
    Wire(#[from] WireError),
    #[error("message nesting exceeds the recursion limit of {0}")]
    RecursionLimit(u32),
    #[error("input of {size} bytes exceeds the limit of {limit} bytes")]
    TotalBytesLimit { size: u64, limit: u64 },
    #[error("string field `{0}` contains invalid UTF-8")]
    InvalidUtf8(String),
    #[error(transparent)]
    Alloc(#[from] AllocError),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EncodeError {
    #[error("message nesting exceeds the recursion limit of {0}")]
    RecursionLimit(u32),
    #[error("missing required fields: {}", .0.join(", "))]
    MissingRequired(Vec<String>),
    #[error("string field `{0}` contains invalid UTF-8")]
    InvalidUtf8(String),
    #[error("encoded message of {0} bytes exceeds 2 GiB")]
    TooLarge(usize),
}

/// A reflection call did not fit the field it was given.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AccessError {
    #[error("`{field}` is not a field of `{message}`")]
    ForeignField { field: String, message: String },
    #[error("`{field}` holds {expected} values, got {found}")]
    TypeMismatch {
        field: String,
        expected: &'static str,
        found: &'static str,
    },
    #[error("`{field}` is not a {expected} field")]
    Cardinality {
        field: String,
        expected: &'static str,
    },
    #[error("{number} is not a value of closed enum `{enum_name}`")]
    UnknownEnumValue { enum_name: String, number: i32 },
    #[error("index {index} is out of bounds for `{field}` with {len} elements")]
    OutOfBounds {
        field: String,
        index: usize,
        len: usize,
    },
    #[error("`{found}` cannot be used where `{expected}` is expected")]
    MessageMismatch { expected: String, found: String },
    #[error(transparent)]
    Alloc(#[from] AllocError),
}
