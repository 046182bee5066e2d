//! Descriptor pool: ingest, resolve, validate and look up schema elements.
//!
//! Files are added one at a time. Each add is staged in a builder, checked,
//! and only then appended to the pool, so a rejected file leaves no trace.
//! A pool may sit on top of an immutable underlay pool: lookups fall through
//! to it, and its entities keep their indices.

mod build;
mod data;
mod defs;
mod store;
mod text;
mod validate;

#[cfg(test)]
mod resolve_tests;

use std::collections::HashMap;
use std::sync::Arc;

use indexmap::IndexMap;
use tracing::debug;

use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::proto::{FileDescriptorProto, FileDescriptorSet};
use crate::SchemaError;

pub use data::{
    DefaultValue, EnumIndex, EnumValueIndex, FieldIndex, FileIndex, MessageIndex, MethodIndex,
    OneofIndex, ServiceIndex,
};
pub use defs::{
    EnumDef, EnumValueDef, FieldDef, FileDescriptor, MessageDef, MethodDef, OneofDef, ServiceDef,
};
pub use text::to_json_name;
pub(crate) use text::map_entry_name;

pub(crate) use data::Symbol;
use data::{Counts, Entities};
use store::{Store, split_store};

/// Pool-wide policy knobs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PoolOptions {
    allow_unresolved_dependencies: bool,
}

impl PoolOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept files whose listed dependencies are not in the pool.
    /// References into such files still fail to resolve.
    pub fn allow_unresolved_dependencies(mut self, allow: bool) -> Self {
        self.allow_unresolved_dependencies = allow;
        self
    }

    pub fn allows_unresolved_dependencies(&self) -> bool {
        self.allow_unresolved_dependencies
    }
}

#[derive(Debug, Default)]
pub struct DescriptorPool {
    underlay: Option<Arc<DescriptorPool>>,
    options: PoolOptions,
    /// Entity counts of the underlay chain: the index base of `own`.
    base: Counts,
    own: Entities,
    symbols: IndexMap<String, Symbol>,
    files_by_name: IndexMap<String, FileIndex>,
    extensions: HashMap<(MessageIndex, u32), FieldIndex>,
    warnings: Diagnostics,
}

split_store!(DescriptorPool, |this| base = this.base, lower = this.underlay.as_deref(), upper = this.own);

impl DescriptorPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pool whose lookups fall back to `underlay`.
    pub fn with_underlay(underlay: Arc<DescriptorPool>) -> Self {
        let base = underlay.total_counts();
        Self {
            underlay: Some(underlay),
            base,
            ..Self::default()
        }
    }

    pub fn with_options(mut self, options: PoolOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> PoolOptions {
        self.options
    }

    pub fn underlay(&self) -> Option<&Arc<DescriptorPool>> {
        self.underlay.as_ref()
    }

    pub(crate) fn total_counts(&self) -> Counts {
        self.base + self.own.counts()
    }

    /// Warnings collected from every file committed so far.
    pub fn warnings(&self) -> &Diagnostics {
        &self.warnings
    }

    /// Parses a serialized `FileDescriptorProto` and adds it.
    pub fn add_serialized_file(&mut self, bytes: &[u8]) -> Result<FileDescriptor<'_>, SchemaError> {
        let proto = FileDescriptorProto::decode(bytes).map_err(|err| {
            let mut diag = Diagnostics::new();
            diag.report(DiagnosticKind::MalformedDescriptor, "<file>")
                .message(err.to_string())
                .emit();
            SchemaError::new(diag)
        })?;
        self.add_file(&proto)
    }

    /// Resolves, validates and commits one file.
    ///
    /// A file already present in the underlay is not added again; its
    /// existing descriptor is returned. A file already present in this pool
    /// is an error.
    pub fn add_file(&mut self, proto: &FileDescriptorProto) -> Result<FileDescriptor<'_>, SchemaError> {
        if let (Some(name), Some(underlay)) = (&proto.name, &self.underlay)
            && let Some(index) = underlay.file_index(name)
        {
            return Ok(FileDescriptor::new(self, index));
        }

        let staged = match build::Builder::build(self, proto) {
            Ok(staged) => staged,
            Err(diagnostics) => {
                debug!(
                    file = proto.name.as_deref().unwrap_or("<unnamed>"),
                    errors = diagnostics.error_count(),
                    "file rejected"
                );
                return Err(SchemaError::new(diagnostics));
            }
        };
        let index = self.commit(staged);
        Ok(FileDescriptor::new(self, index))
    }

    fn commit(&mut self, staged: build::Staged) -> FileIndex {
        let build::Staged {
            file,
            entities,
            symbols,
            extensions,
            warnings,
        } = staged;
        let name = entities.files[0].name.clone();
        debug!(
            file = %name,
            messages = entities.messages.len(),
            enums = entities.enums.len(),
            warnings = warnings.len(),
            "file committed"
        );
        self.own.append(entities);
        self.symbols.extend(symbols);
        self.files_by_name.insert(name, file);
        self.extensions.extend(extensions);
        self.warnings.extend(warnings);
        file
    }

    /// Adds every file of a serialized `FileDescriptorSet`.
    ///
    /// Files are added once all their dependencies are present, regardless of
    /// their order in the set. Returns the number of files added.
    pub fn add_file_descriptor_set(&mut self, bytes: &[u8]) -> Result<usize, SchemaError> {
        let set = FileDescriptorSet::decode(bytes).map_err(|err| {
            let mut diag = Diagnostics::new();
            diag.report(DiagnosticKind::MalformedDescriptor, "<file set>")
                .message(err.to_string())
                .emit();
            SchemaError::new(diag)
        })?;
        self.add_files(set.file)
    }

    /// Adds `files` in dependency order. Each file commits independently, so
    /// files added before a failure stay in the pool.
    pub fn add_files(&mut self, files: Vec<FileDescriptorProto>) -> Result<usize, SchemaError> {
        let mut pending = files;
        let mut added = 0;
        while !pending.is_empty() {
            let ready = pending.iter().position(|file| {
                file.dependency
                    .iter()
                    .all(|dep| self.file_index(dep).is_some())
            });
            let Some(position) = ready else {
                break;
            };
            let file = pending.remove(position);
            self.add_file(&file)?;
            added += 1;
        }
        if pending.is_empty() {
            return Ok(added);
        }

        if self.options.allow_unresolved_dependencies {
            for file in pending {
                self.add_file(&file)?;
                added += 1;
            }
            return Ok(added);
        }

        let mut diag = Diagnostics::new();
        let pending_names: Vec<&str> = pending.iter().filter_map(|f| f.name.as_deref()).collect();
        for file in &pending {
            let element = file.name.as_deref().unwrap_or("<file>");
            for dep in &file.dependency {
                if self.file_index(dep).is_some() {
                    continue;
                }
                let builder = diag.report(DiagnosticKind::MissingDependency, element).message(dep);
                if pending_names.contains(&dep.as_str()) {
                    builder.hint("files in the set depend on each other in a cycle").emit();
                } else {
                    builder.emit();
                }
            }
        }
        Err(SchemaError::new(diag))
    }

    pub(crate) fn file_index(&self, name: &str) -> Option<FileIndex> {
        self.files_by_name
            .get(name)
            .copied()
            .or_else(|| self.underlay.as_ref()?.file_index(name))
    }

    /// Own symbols first, then the underlay chain.
    pub(crate) fn lookup_symbol(&self, full_name: &str) -> Option<Symbol> {
        self.symbols
            .get(full_name)
            .copied()
            .or_else(|| self.underlay.as_ref()?.lookup_symbol(full_name))
    }

    pub(crate) fn lookup_extension(&self, extendee: MessageIndex, number: u32) -> Option<FieldIndex> {
        self.extensions
            .get(&(extendee, number))
            .copied()
            .or_else(|| self.underlay.as_ref()?.lookup_extension(extendee, number))
    }

    pub fn find_file_by_name(&self, name: &str) -> Option<FileDescriptor<'_>> {
        self.file_index(name).map(|i| FileDescriptor::new(self, i))
    }

    pub fn find_message_by_name(&self, full_name: &str) -> Option<MessageDef<'_>> {
        match self.lookup_symbol(full_name)? {
            Symbol::Message(i) => Some(self.message(i)),
            _ => None,
        }
    }

    pub fn find_enum_by_name(&self, full_name: &str) -> Option<EnumDef<'_>> {
        match self.lookup_symbol(full_name)? {
            Symbol::Enum(i) => Some(self.enum_def(i)),
            _ => None,
        }
    }

    pub fn find_enum_value_by_name(&self, full_name: &str) -> Option<EnumValueDef<'_>> {
        match self.lookup_symbol(full_name)? {
            Symbol::EnumValue(i) => Some(EnumValueDef::new(self, i)),
            _ => None,
        }
    }

    /// Regular fields (`pkg.Message.field`) and extensions (`pkg.ext`).
    pub fn find_field_by_name(&self, full_name: &str) -> Option<FieldDef<'_>> {
        match self.lookup_symbol(full_name)? {
            Symbol::Field(i) => Some(self.field(i)),
            _ => None,
        }
    }

    /// Like `find_field_by_name`, restricted to extensions.
    pub fn find_extension_by_name(&self, full_name: &str) -> Option<FieldDef<'_>> {
        self.find_field_by_name(full_name).filter(|f| f.is_extension())
    }

    pub fn find_extension_by_number(&self, extendee: MessageDef<'_>, number: u32) -> Option<FieldDef<'_>> {
        self.lookup_extension(extendee.index(), number)
            .map(|i| self.field(i))
    }

    pub fn find_oneof_by_name(&self, full_name: &str) -> Option<OneofDef<'_>> {
        match self.lookup_symbol(full_name)? {
            Symbol::Oneof(i) => Some(OneofDef::new(self, i)),
            _ => None,
        }
    }

    pub fn find_service_by_name(&self, full_name: &str) -> Option<ServiceDef<'_>> {
        match self.lookup_symbol(full_name)? {
            Symbol::Service(i) => Some(ServiceDef::new(self, i)),
            _ => None,
        }
    }

    pub fn find_method_by_name(&self, full_name: &str) -> Option<MethodDef<'_>> {
        match self.lookup_symbol(full_name)? {
            Symbol::Method(i) => Some(MethodDef::new(self, i)),
            _ => None,
        }
    }

    /// File defining `full_name`. For packages, the first file declaring it.
    pub fn find_file_containing_symbol(&self, full_name: &str) -> Option<FileDescriptor<'_>> {
        let sym = self.lookup_symbol(full_name)?;
        Some(FileDescriptor::new(self, self.symbol_file(sym)))
    }

    /// All files, underlay files first, each in the order it was added.
    pub fn files(&self) -> impl Iterator<Item = FileDescriptor<'_>> + '_ {
        (0..self.total_counts().files).map(|i| FileDescriptor::new(self, FileIndex(i as u32)))
    }

    /// Fully-qualified names defined by this pool's own files, in definition order.
    pub fn symbol_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.symbols.keys().map(String::as_str)
    }

    pub fn message(&self, index: MessageIndex) -> MessageDef<'_> {
        MessageDef::new(self, index)
    }

    pub fn field(&self, index: FieldIndex) -> FieldDef<'_> {
        FieldDef::new(self, index)
    }

    pub fn enum_def(&self, index: EnumIndex) -> EnumDef<'_> {
        EnumDef::new(self, index)
    }

    pub fn oneof(&self, index: OneofIndex) -> OneofDef<'_> {
        OneofDef::new(self, index)
    }
}
