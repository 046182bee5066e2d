//! Descriptor pool for protoflat.
//!
//! Ingests `FileDescriptorProto`s, resolves and validates them, and computes
//! the flat per-message layouts that the runtime decodes into.
//!
//! # Example
//!
//! ```
//! use protoflat_core::FieldType;
//! use protoflat_schema::DescriptorPool;
//! use protoflat_schema::proto::{DescriptorProto, FieldDescriptorProto, FileDescriptorProto};
//!
//! let file = FileDescriptorProto::new("demo.proto")
//!     .with_package("demo")
//!     .with_message(
//!         DescriptorProto::new("Point")
//!             .with_field(FieldDescriptorProto::new("x", 1, FieldType::Int32))
//!             .with_field(FieldDescriptorProto::new("y", 2, FieldType::Int32)),
//!     );
//!
//! let mut pool = DescriptorPool::new();
//! pool.add_file(&file).expect("valid schema");
//! let point = pool.find_message_by_name("demo.Point").unwrap();
//! assert_eq!(point.fields().len(), 2);
//! ```

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod diagnostics;
pub mod layout;
pub mod pool;
pub mod proto;

pub use diagnostics::{DiagnosticKind, DiagnosticMessage, Diagnostics, Severity};
pub use layout::{FieldLayout, FieldMode, Layout, OneofLayout, Presence};
pub use pool::{
    DefaultValue, DescriptorPool, EnumDef, EnumValueDef, FieldDef, FileDescriptor, MessageDef,
    MethodDef, OneofDef, PoolOptions, ServiceDef,
};

/// A file was rejected by the pool.
///
/// Carries every problem found in the file, not just the first.
#[derive(Debug, Clone, thiserror::Error)]
#[error("schema validation failed with {} errors", .0.error_count())]
pub struct SchemaError(Diagnostics);

impl SchemaError {
    pub(crate) fn new(diagnostics: Diagnostics) -> Self {
        Self(diagnostics)
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.0
    }

    pub fn into_diagnostics(self) -> Diagnostics {
        self.0
    }
}
