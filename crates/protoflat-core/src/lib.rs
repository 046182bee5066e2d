//! Shared leaf types for protoflat: the fusable arena allocator and the
//! field/wire type enumerations used by the schema and runtime crates.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod arena;
pub mod types;

#[cfg(test)]
mod arena_tests;

pub use arena::{AllocError, Arena};
pub use types::{FieldType, Label, StorageClass, Syntax, WireType};
