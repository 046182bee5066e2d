/// Low-level wire decoding failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum WireError {
    #[error("unexpected end of input")]
    Truncated,

    #[error("varint longer than 10 bytes")]
    VarintOverflow,

    #[error("invalid wire type {0}")]
    InvalidWireType(u32),

    #[error("field number 0 is not valid")]
    ZeroFieldNumber,

    #[error("length prefix {0} is negative or too large")]
    InvalidLength(u64),

    #[error("end group for field {found} while inside group {expected}")]
    GroupMismatch { expected: u32, found: u32 },

    #[error("end group for field {0} outside of any group")]
    UnexpectedEndGroup(u32),

    #[error("groups nested too deeply")]
    GroupDepth,
}

impl WireError {
    /// Input ended (or a length limit was hit) in the middle of a value.
    pub fn is_truncation(&self) -> bool {
        matches!(self, Self::Truncated)
    }

    pub fn is_recursion(&self) -> bool {
        matches!(self, Self::GroupDepth)
    }
}
