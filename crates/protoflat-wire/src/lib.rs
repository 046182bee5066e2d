//! Protocol buffer wire primitives.
//!
//! - [`varint`]: base-128 varints, zigzag, encoded sizes
//! - [`Reader`]: bounded cursor with a length-limit stack
//! - [`Writer`]: output buffer with tag/varint/fixed writers
//! - [`dump`]: schema-less `--decode_raw` style rendering

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod dump;
mod error;
mod reader;
pub mod varint;
mod writer;

#[cfg(test)]
mod varint_tests;

pub use error::WireError;
pub use reader::{DEFAULT_GROUP_DEPTH, MAX_FIELD_NUMBER, Reader, Tag};
pub use writer::{Writer, len_delimited_len, tag_len};
