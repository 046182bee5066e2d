pub mod check;
pub mod decode_raw;
pub mod input;
pub mod roundtrip;
pub mod symbols;
