//! Reflective message runtime for protoflat.
//!
//! Messages live in an [`Arena`](protoflat_core::Arena) as flat blocks laid
//! out by their schema's [`Layout`](protoflat_schema::Layout). A single
//! [`Message`] handle type reads and writes any field through its
//! [`FieldDef`](protoflat_schema::FieldDef):
//!
//! - [`Message::get`], [`Message::set`], [`Message::has`], [`Message::clear_field`]
//! - [`Message::parse`] and [`Message::serialize`] for the wire format
//! - [`equal`], [`merge`], [`deep_copy`], [`Message::swap`]
//! - [`check_initialized`] for proto2 required fields
//!
//! # Example
//!
//! ```
//! use protoflat_core::{Arena, FieldType};
//! use protoflat_runtime::{DecodeOptions, EncodeOptions, Message};
//! use protoflat_schema::DescriptorPool;
//! use protoflat_schema::proto::{DescriptorProto, FieldDescriptorProto, FileDescriptorProto};
//!
//! let file = FileDescriptorProto::new("m.proto")
//!     .with_message(DescriptorProto::new("M").with_field(FieldDescriptorProto::new("x", 1, FieldType::Int32)));
//! let mut pool = DescriptorPool::new();
//! pool.add_file(&file).expect("valid schema");
//! let def = pool.find_message_by_name("M").unwrap();
//!
//! let arena = Arena::new();
//! let msg = Message::parse(def, &[0x08, 0x96, 0x01], &arena, &DecodeOptions::new()).unwrap();
//! let x = def.field_by_name("x").unwrap();
//! assert_eq!(msg.get(&x).unwrap().as_i32(), Some(150));
//! assert_eq!(msg.serialize(&EncodeOptions::new()).unwrap(), [0x08, 0x96, 0x01]);
//! ```

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

mod array;
mod compare;
mod decode;
mod encode;
mod error;
mod map;
mod merge;
mod message;
mod required;
mod storage;
mod unknown;
mod value;

#[cfg(test)]
mod test_schema;

#[cfg(test)]
mod decode_tests;
#[cfg(test)]
mod required_tests;
#[cfg(test)]
mod unknown_tests;

pub use array::Array;
pub use compare::equal;
pub use decode::{DecodeOptions, Utf8Mode};
pub use encode::EncodeOptions;
pub use error::{AccessError, DecodeError, EncodeError};
pub use map::Map;
pub use merge::{deep_copy, merge};
pub use message::Message;
pub use required::check_initialized;
pub use unknown::{UnknownField, UnknownFields, UnknownValue};
pub use value::{MapKey, Value};
