//! Staging of a single file.
//!
//! The builder walks a `FileDescriptorProto`, assigns global indices to every
//! element, registers names, resolves type references and derives per-field
//! properties. Nothing touches the pool until `DescriptorPool::commit` takes
//! the returned `Staged` value.

use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;
use protoflat_core::{FieldType, Label, Syntax};

use super::DescriptorPool;
use super::data::*;
use super::store::{Store, split_store};
use super::text::{self, is_identifier, is_package_name};
use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::layout::{FieldInput, FieldMode, Layout};
use crate::proto::{
    DescriptorProto, EnumDescriptorProto, FieldDescriptorProto, FileDescriptorProto,
    ServiceDescriptorProto,
};

/// A fully checked file, ready to be appended to the pool.
pub(super) struct Staged {
    pub file: FileIndex,
    pub entities: Entities,
    pub symbols: IndexMap<String, Symbol>,
    pub extensions: HashMap<(MessageIndex, u32), FieldIndex>,
    pub warnings: Diagnostics,
}

/// Raw descriptor data kept until references are resolved.
pub(super) struct PendingField {
    pub index: FieldIndex,
    pub number: Option<i32>,
    pub declared_type: Option<i32>,
    pub type_name: Option<String>,
    pub extendee: Option<String>,
    pub default: Option<String>,
    pub packed: Option<bool>,
}

struct PendingMethod {
    index: MethodIndex,
    input: Option<String>,
    output: Option<String>,
}

pub(super) struct Builder<'p> {
    pub pool: &'p DescriptorPool,
    pub base: Counts,
    pub staged: Entities,
    pub symbols: IndexMap<String, Symbol>,
    pub diag: Diagnostics,
    pub file: FileIndex,
    pub syntax: Syntax,
    /// Files whose symbols this file may reference.
    visible: HashSet<FileIndex>,
    /// Each direct dependency with the files it makes visible.
    exports: Vec<(FileIndex, HashSet<FileIndex>)>,
    /// Files that resolved at least one reference.
    used: HashSet<FileIndex>,
    /// Set when the last lookup hit a symbol in a file that is not imported.
    not_imported: Option<FileIndex>,
    pub fields: Vec<PendingField>,
    methods: Vec<PendingMethod>,
    pub extensions: HashMap<(MessageIndex, u32), FieldIndex>,
}

split_store!(Builder<'_>, |this| base = this.base, lower = Some(this.pool), upper = this.staged);

fn join(scope: &str, name: &str) -> String {
    if scope.is_empty() {
        name.to_owned()
    } else {
        format!("{scope}.{name}")
    }
}

fn next_index(base: usize, staged: usize) -> u32 {
    (base + staged) as u32
}

pub(super) fn label_name(label: Label) -> &'static str {
    match label {
        Label::Optional => "optional",
        Label::Required => "required",
        Label::Repeated => "repeated",
    }
}

impl<'p> Builder<'p> {
    pub(super) fn build(
        pool: &'p DescriptorPool,
        proto: &FileDescriptorProto,
    ) -> Result<Staged, Diagnostics> {
        let base = pool.total_counts();
        let mut builder = Builder {
            pool,
            base,
            staged: Entities::default(),
            symbols: IndexMap::new(),
            diag: Diagnostics::new(),
            file: FileIndex(next_index(base.files, 0)),
            syntax: Syntax::Proto2,
            visible: HashSet::new(),
            exports: Vec::new(),
            used: HashSet::new(),
            not_imported: None,
            fields: Vec::new(),
            methods: Vec::new(),
            extensions: HashMap::new(),
        };

        builder.walk_file(proto);
        builder.resolve();
        builder.mark_synthetic_oneofs();
        builder.finish_fields();
        builder.validate();
        builder.check_unused_dependencies(proto);

        let warnings = builder.diag.take_warnings();
        if builder.diag.has_errors() {
            let mut diag = builder.diag;
            diag.extend(warnings);
            return Err(diag);
        }

        builder.compute_layouts();
        Ok(Staged {
            file: builder.file,
            entities: builder.staged,
            symbols: builder.symbols,
            extensions: builder.extensions,
            warnings,
        })
    }

    pub(super) fn own_message(&self, i: MessageIndex) -> &MessageData {
        &self.staged.messages[i.as_usize() - self.base.messages]
    }

    fn own_message_mut(&mut self, i: MessageIndex) -> &mut MessageData {
        &mut self.staged.messages[i.as_usize() - self.base.messages]
    }

    fn own_field_mut(&mut self, i: FieldIndex) -> &mut FieldData {
        &mut self.staged.fields[i.as_usize() - self.base.fields]
    }

    fn own_oneof_mut(&mut self, i: OneofIndex) -> &mut OneofData {
        &mut self.staged.oneofs[i.as_usize() - self.base.oneofs]
    }

    fn own_enum_mut(&mut self, i: EnumIndex) -> &mut EnumData {
        &mut self.staged.enums[i.as_usize() - self.base.enums]
    }

    fn own_file_mut(&mut self) -> &mut FileData {
        &mut self.staged.files[0]
    }

    pub(super) fn file_name(&self) -> &str {
        &self.staged.files[0].name
    }

    /// Element name for diagnostics about something unnamed inside `scope`.
    fn scope_element(&self, scope: &str) -> String {
        if scope.is_empty() {
            self.file_name().to_owned()
        } else {
            scope.to_owned()
        }
    }

    fn checked_name(&mut self, name: Option<&str>, scope: &str, what: &str) -> String {
        match name {
            None | Some("") => {
                let element = self.scope_element(scope);
                self.diag
                    .report(DiagnosticKind::MissingName, element)
                    .message(format!("{what} without a name"))
                    .emit();
                String::new()
            }
            Some(name) => {
                if !is_identifier(name) {
                    self.diag
                        .report(DiagnosticKind::InvalidName, join(scope, name))
                        .message(format!("`{name}` is not a valid identifier"))
                        .emit();
                }
                name.to_owned()
            }
        }
    }

    // ------------------------------------------------------------------
    // Walk

    fn walk_file(&mut self, proto: &FileDescriptorProto) {
        let name = match proto.name.as_deref() {
            Some(name) if !name.is_empty() => name.to_owned(),
            _ => {
                self.diag
                    .report(DiagnosticKind::MissingName, "<file>")
                    .message("file without a name")
                    .emit();
                "<unnamed>".to_owned()
            }
        };
        if self.pool.files_by_name.contains_key(&name) {
            self.diag
                .report(DiagnosticKind::DuplicateFile, name.clone())
                .message(name.clone())
                .emit();
        }

        let syntax_text = proto.syntax.as_deref().unwrap_or("");
        self.syntax = Syntax::parse(syntax_text).unwrap_or_else(|| {
            self.diag
                .report(DiagnosticKind::InvalidSyntax, name.clone())
                .message(format!("`{syntax_text}`"))
                .emit();
            Syntax::Proto2
        });

        let package = proto.package.clone().unwrap_or_default();
        self.staged.files.push(FileData {
            name: name.clone(),
            package: package.clone(),
            syntax: self.syntax,
            dependencies: Vec::new(),
            public_dependencies: Vec::new(),
            messages: Vec::new(),
            enums: Vec::new(),
            extensions: Vec::new(),
            services: Vec::new(),
        });

        if !is_package_name(&package) {
            self.diag
                .report(DiagnosticKind::InvalidName, name.clone())
                .message(format!("`{package}` is not a valid package name"))
                .emit();
        } else if !package.is_empty() {
            self.add_package(&package);
        }

        self.link_dependencies(proto, &name);

        for message in &proto.message_type {
            let index = self.walk_message(message, &package, None);
            self.own_file_mut().messages.push(index);
        }
        for enum_type in &proto.enum_type {
            let index = self.walk_enum(enum_type, &package, None);
            self.own_file_mut().enums.push(index);
        }
        for extension in &proto.extension {
            let index = self.walk_field(extension, &package, None, None);
            self.own_file_mut().extensions.push(index);
        }
        for service in &proto.service {
            let index = self.walk_service(service, &package);
            self.own_file_mut().services.push(index);
        }
    }

    fn link_dependencies(&mut self, proto: &FileDescriptorProto, name: &str) {
        let allow_missing = self.pool.options.allows_unresolved_dependencies();
        let mut resolved = Vec::with_capacity(proto.dependency.len());
        for dep in &proto.dependency {
            let index = self.pool.file_index(dep);
            if index.is_none() && !allow_missing {
                self.diag
                    .report(DiagnosticKind::MissingDependency, name)
                    .message(dep)
                    .emit();
            }
            resolved.push(index);
        }

        let mut public = Vec::new();
        for &i in &proto.public_dependency {
            match usize::try_from(i).ok().and_then(|i| resolved.get(i)) {
                Some(Some(index)) => public.push(*index),
                Some(None) => {}
                None => self
                    .diag
                    .report(DiagnosticKind::MalformedDescriptor, name)
                    .message(format!("public dependency index {i} is out of range"))
                    .emit(),
            }
        }

        self.visible.insert(self.file);
        for index in resolved.iter().flatten().copied() {
            let closure = self.public_closure(index);
            self.visible.extend(closure.iter().copied());
            self.exports.push((index, closure));
        }

        let file = self.own_file_mut();
        file.dependencies = resolved.into_iter().flatten().collect();
        file.public_dependencies = public;
    }

    /// `root` plus everything reachable from it through public imports.
    fn public_closure(&self, root: FileIndex) -> HashSet<FileIndex> {
        let mut seen = HashSet::new();
        let mut stack = vec![root];
        while let Some(file) = stack.pop() {
            if seen.insert(file) {
                stack.extend(self.file_data(file).public_dependencies.iter().copied());
            }
        }
        seen
    }

    fn walk_message(
        &mut self,
        proto: &DescriptorProto,
        scope: &str,
        parent: Option<MessageIndex>,
    ) -> MessageIndex {
        let name = self.checked_name(proto.name.as_deref(), scope, "message");
        let full_name = join(scope, &name);
        let index = MessageIndex(next_index(self.base.messages, self.staged.messages.len()));

        let extension_ranges = self.number_ranges(
            &full_name,
            "extension range",
            proto.extension_range.iter().map(|r| (r.start, r.end)),
        );
        let reserved_ranges = self.number_ranges(
            &full_name,
            "reserved range",
            proto.reserved_range.iter().map(|r| (r.start, r.end)),
        );

        self.staged.messages.push(MessageData {
            name: name.clone(),
            full_name: full_name.clone(),
            file: self.file,
            parent,
            fields: Vec::new(),
            oneofs: Vec::new(),
            nested_messages: Vec::new(),
            nested_enums: Vec::new(),
            extensions: Vec::new(),
            extension_ranges,
            reserved_ranges,
            reserved_names: proto.reserved_name.clone(),
            is_map_entry: proto.options.and_then(|o| o.map_entry).unwrap_or(false),
            layout: Layout::default(),
        });
        self.add_symbol(&name, &full_name, Symbol::Message(index));

        for oneof in &proto.oneof_decl {
            let oneof_name = self.checked_name(oneof.name.as_deref(), &full_name, "oneof");
            let oneof_full = join(&full_name, &oneof_name);
            let oneof_index = OneofIndex(next_index(self.base.oneofs, self.staged.oneofs.len()));
            self.staged.oneofs.push(OneofData {
                name: oneof_name.clone(),
                full_name: oneof_full.clone(),
                message: index,
                fields: Vec::new(),
                synthetic: false,
            });
            self.own_message_mut(index).oneofs.push(oneof_index);
            self.add_symbol(&oneof_name, &oneof_full, Symbol::Oneof(oneof_index));
        }

        for field in &proto.field {
            let field_index = self.walk_field(field, &full_name, Some(index), None);
            self.own_message_mut(index).fields.push(field_index);
        }
        for nested in &proto.nested_type {
            let nested_index = self.walk_message(nested, &full_name, Some(index));
            self.own_message_mut(index).nested_messages.push(nested_index);
        }
        for enum_type in &proto.enum_type {
            let enum_index = self.walk_enum(enum_type, &full_name, Some(index));
            self.own_message_mut(index).nested_enums.push(enum_index);
        }
        for extension in &proto.extension {
            let field_index = self.walk_field(extension, &full_name, None, Some(index));
            self.own_message_mut(index).extensions.push(field_index);
        }
        index
    }

    /// Converts half-open `[start, end)` ranges, dropping invalid ones.
    fn number_ranges(
        &mut self,
        element: &str,
        what: &str,
        ranges: impl Iterator<Item = (Option<i32>, Option<i32>)>,
    ) -> Vec<(u32, u32)> {
        let max_end = protoflat_wire::MAX_FIELD_NUMBER + 1;
        let mut out = Vec::new();
        for (start, end) in ranges {
            let (start, end) = (start.unwrap_or(0), end.unwrap_or(0));
            let valid = start >= 1 && end > start && end as u32 <= max_end;
            if !valid {
                self.diag
                    .report(DiagnosticKind::InvalidFieldNumber, element)
                    .message(format!("{what} {start} to {end} is invalid"))
                    .emit();
                continue;
            }
            out.push((start as u32, end as u32));
        }
        out
    }

    fn walk_field(
        &mut self,
        proto: &FieldDescriptorProto,
        scope: &str,
        message: Option<MessageIndex>,
        extension_scope: Option<MessageIndex>,
    ) -> FieldIndex {
        let name = self.checked_name(proto.name.as_deref(), scope, "field");
        let full_name = join(scope, &name);
        let index = FieldIndex(next_index(self.base.fields, self.staged.fields.len()));
        let is_extension = message.is_none();

        let label = match proto.label {
            None => Label::Optional,
            Some(raw) => Label::from_i32(raw).unwrap_or_else(|| {
                self.diag
                    .report(DiagnosticKind::InvalidLabel, full_name.clone())
                    .message(format!("{raw} is not a label"))
                    .emit();
                Label::Optional
            }),
        };

        let declared = proto.r#type.and_then(FieldType::from_i32);
        if let Some(raw) = proto.r#type
            && declared.is_none()
        {
            self.diag
                .report(DiagnosticKind::InvalidFieldType, full_name.clone())
                .message(format!("{raw} is not a field type"))
                .emit();
        }

        let oneof = match (proto.oneof_index, message) {
            (None, _) => None,
            (Some(raw), Some(message)) => {
                let oneofs = &self.own_message(message).oneofs;
                let found = usize::try_from(raw).ok().and_then(|i| oneofs.get(i)).copied();
                if found.is_none() {
                    self.diag
                        .report(DiagnosticKind::InvalidOneofIndex, full_name.clone())
                        .message(format!("{raw} has no matching oneof declaration"))
                        .emit();
                }
                found
            }
            (Some(_), None) => {
                self.diag
                    .report(DiagnosticKind::InvalidOneofIndex, full_name.clone())
                    .message("extensions cannot belong to a oneof")
                    .emit();
                None
            }
        };

        self.staged.fields.push(FieldData {
            json_name: proto
                .json_name
                .clone()
                .unwrap_or_else(|| text::to_json_name(&name)),
            name: name.clone(),
            full_name: full_name.clone(),
            number: proto.number.unwrap_or(0).max(0) as u32,
            label,
            field_type: declared.unwrap_or(FieldType::Message),
            file: self.file,
            containing: message,
            is_extension,
            extension_scope,
            oneof,
            proto3_optional: proto.proto3_optional.unwrap_or(false),
            packed: false,
            has_presence: false,
            message_type: None,
            enum_type: None,
            default: DefaultValue::None,
            has_explicit_default: proto.default_value.is_some(),
            layout_index: 0,
        });
        if let Some(oneof) = oneof {
            self.own_oneof_mut(oneof).fields.push(index);
        }
        self.add_symbol(&name, &full_name, Symbol::Field(index));

        self.fields.push(PendingField {
            index,
            number: proto.number,
            declared_type: proto.r#type,
            type_name: proto.type_name.clone(),
            extendee: proto.extendee.clone(),
            default: proto.default_value.clone(),
            packed: proto.options.and_then(|o| o.packed),
        });
        index
    }

    fn walk_enum(
        &mut self,
        proto: &EnumDescriptorProto,
        scope: &str,
        parent: Option<MessageIndex>,
    ) -> EnumIndex {
        let name = self.checked_name(proto.name.as_deref(), scope, "enum");
        let full_name = join(scope, &name);
        let index = EnumIndex(next_index(self.base.enums, self.staged.enums.len()));
        self.staged.enums.push(EnumData {
            name: name.clone(),
            full_name: full_name.clone(),
            file: self.file,
            parent,
            values: Vec::new(),
            is_closed: self.syntax == Syntax::Proto2,
            allow_alias: proto.options.and_then(|o| o.allow_alias).unwrap_or(false),
            reserved_ranges: proto
                .reserved_range
                .iter()
                .map(|r| (r.start.unwrap_or(0), r.end.unwrap_or(0)))
                .collect(),
            reserved_names: proto.reserved_name.clone(),
        });
        self.add_symbol(&name, &full_name, Symbol::Enum(index));

        // Enum values are scoped as siblings of their enum.
        for value in &proto.value {
            let value_name = self.checked_name(value.name.as_deref(), &full_name, "enum value");
            let value_full = join(scope, &value_name);
            let value_index =
                EnumValueIndex(next_index(self.base.enum_values, self.staged.enum_values.len()));
            self.staged.enum_values.push(EnumValueData {
                name: value_name.clone(),
                full_name: value_full.clone(),
                number: value.number.unwrap_or(0),
                parent: index,
            });
            self.own_enum_mut(index).values.push(value_index);
            self.add_symbol(&value_name, &value_full, Symbol::EnumValue(value_index));
        }
        index
    }

    fn walk_service(&mut self, proto: &ServiceDescriptorProto, scope: &str) -> ServiceIndex {
        let name = self.checked_name(proto.name.as_deref(), scope, "service");
        let full_name = join(scope, &name);
        let index = ServiceIndex(next_index(self.base.services, self.staged.services.len()));
        self.staged.services.push(ServiceData {
            name: name.clone(),
            full_name: full_name.clone(),
            file: self.file,
            methods: Vec::new(),
        });
        self.add_symbol(&name, &full_name, Symbol::Service(index));

        for method in &proto.method {
            let method_name = self.checked_name(method.name.as_deref(), &full_name, "method");
            let method_full = join(&full_name, &method_name);
            let method_index =
                MethodIndex(next_index(self.base.methods, self.staged.methods.len()));
            self.staged.methods.push(MethodData {
                name: method_name.clone(),
                full_name: method_full.clone(),
                service: index,
                input: None,
                output: None,
                client_streaming: method.client_streaming.unwrap_or(false),
                server_streaming: method.server_streaming.unwrap_or(false),
            });
            self.staged.services[index.as_usize() - self.base.services]
                .methods
                .push(method_index);
            self.add_symbol(&method_name, &method_full, Symbol::Method(method_index));
            self.methods.push(PendingMethod {
                index: method_index,
                input: method.input_type.clone(),
                output: method.output_type.clone(),
            });
        }
        index
    }

    // ------------------------------------------------------------------
    // Symbols

    fn existing_symbol(&self, full_name: &str) -> Option<Symbol> {
        self.symbols
            .get(full_name)
            .copied()
            .or_else(|| self.pool.lookup_symbol(full_name))
    }

    fn add_symbol(&mut self, name: &str, full_name: &str, sym: Symbol) {
        if name.is_empty() {
            return;
        }
        match self.existing_symbol(full_name) {
            None => {
                self.symbols.insert(full_name.to_owned(), sym);
            }
            Some(prev) => self.report_conflict(full_name, prev, sym),
        }
    }

    /// Registers every prefix of a package. Packages may be shared by files.
    fn add_package(&mut self, package: &str) {
        let mut end = 0;
        for part in package.split('.') {
            end += part.len();
            let prefix = &package[..end];
            match self.existing_symbol(prefix) {
                None => {
                    self.symbols.insert(prefix.to_owned(), Symbol::Package(self.file));
                }
                Some(Symbol::Package(_)) => {}
                Some(prev) => self.report_conflict(prefix, prev, Symbol::Package(self.file)),
            }
            end += 1;
        }
    }

    fn report_conflict(&mut self, full_name: &str, prev: Symbol, sym: Symbol) {
        if let (Symbol::Field(a), Symbol::Field(b)) = (prev, sym) {
            let (a, b) = (self.field_data(a), self.field_data(b));
            if !a.is_extension && !b.is_extension && a.containing == b.containing {
                let name = b.name.clone();
                self.diag
                    .report(DiagnosticKind::DuplicateFieldName, full_name)
                    .message(name)
                    .emit();
                return;
            }
        }
        let prev_file = self.symbol_file(prev);
        let hint = if prev_file == self.file {
            format!("previously defined as a {}", prev.kind_name())
        } else {
            format!(
                "previously defined as a {} in `{}`",
                prev.kind_name(),
                self.file_data(prev_file).name
            )
        };
        self.diag
            .report(DiagnosticKind::DuplicateSymbol, full_name)
            .message(full_name)
            .hint(hint)
            .emit();
    }

    /// Exact lookup restricted to symbols this file can see.
    fn find_visible(&mut self, full_name: &str) -> Option<Symbol> {
        if let Some(sym) = self.symbols.get(full_name) {
            return Some(*sym);
        }
        let sym = self.pool.lookup_symbol(full_name)?;
        let visible = match sym {
            Symbol::Package(_) => self.visible.iter().any(|&f| {
                let package = &self.file_data(f).package;
                package == full_name
                    || package
                        .strip_prefix(full_name)
                        .is_some_and(|rest| rest.starts_with('.'))
            }),
            _ => self.visible.contains(&self.symbol_file(sym)),
        };
        if visible {
            Some(sym)
        } else {
            if !matches!(sym, Symbol::Package(_)) {
                self.not_imported = Some(self.symbol_file(sym));
            }
            None
        }
    }

    /// Resolves `name` as seen from the element `relative_to`.
    ///
    /// A leading dot makes the name absolute. Otherwise the enclosing scopes
    /// of `relative_to` are tried innermost first. For compound names only
    /// the first component is searched this way; once it hits an aggregate,
    /// the remainder must be found inside it.
    pub(super) fn lookup(&mut self, name: &str, relative_to: &str, types_only: bool) -> Option<Symbol> {
        self.not_imported = None;
        if let Some(absolute) = name.strip_prefix('.') {
            return self.find_visible(absolute);
        }

        let first = name.split_once('.').map_or(name, |(first, _)| first);
        let mut scope = relative_to.to_owned();
        loop {
            let Some(dot) = scope.rfind('.') else {
                return self.find_visible(name);
            };
            scope.truncate(dot);
            let scope_len = scope.len();
            scope.push('.');
            scope.push_str(first);

            if let Some(sym) = self.find_visible(&scope) {
                if first.len() < name.len() {
                    if sym.is_aggregate() {
                        scope.push_str(&name[first.len()..]);
                        return self.find_visible(&scope);
                    }
                } else if !types_only || sym.is_type() {
                    return Some(sym);
                }
            }
            scope.truncate(scope_len);
        }
    }

    fn mark_used(&mut self, sym: Symbol) {
        let file = self.symbol_file(sym);
        if file != self.file {
            self.used.insert(file);
        }
    }

    fn report_unresolved(&mut self, element: &str, name: &str) {
        let hint = self.not_imported.map(|f| {
            format!(
                "`{name}` is defined in `{}`, which is not imported",
                self.file_data(f).name
            )
        });
        let builder = self
            .diag
            .report(DiagnosticKind::UnresolvedType, element)
            .message(name);
        match hint {
            Some(hint) => builder.hint(hint).emit(),
            None => builder.emit(),
        }
    }

    // ------------------------------------------------------------------
    // Resolution

    fn resolve(&mut self) {
        let fields = std::mem::take(&mut self.fields);
        for pending in &fields {
            self.resolve_field(pending);
        }
        self.fields = fields;

        let methods = std::mem::take(&mut self.methods);
        for pending in &methods {
            self.resolve_method(pending);
        }
        self.methods = methods;
    }

    fn resolve_field(&mut self, pending: &PendingField) {
        let (full_name, is_extension) = {
            let f = self.field_data(pending.index);
            (f.full_name.clone(), f.is_extension)
        };

        match (&pending.extendee, is_extension) {
            (Some(extendee), true) => match self.lookup(extendee, &full_name, false) {
                Some(Symbol::Message(m)) => {
                    self.mark_used(Symbol::Message(m));
                    self.own_field_mut(pending.index).containing = Some(m);
                }
                Some(_) => self
                    .diag
                    .report(DiagnosticKind::InvalidExtendee, full_name.clone())
                    .message(format!("`{extendee}` is not a message type"))
                    .emit(),
                None => self.report_unresolved(&full_name, extendee),
            },
            (None, true) => self
                .diag
                .report(DiagnosticKind::InvalidExtendee, full_name.clone())
                .message("extension has no extendee")
                .emit(),
            (Some(_), false) => self
                .diag
                .report(DiagnosticKind::InvalidExtendee, full_name.clone())
                .message("only extensions may name an extendee")
                .emit(),
            (None, false) => {}
        }

        let declared = pending.declared_type.and_then(FieldType::from_i32);
        let needs_type_name = declared.is_none_or(|t| t.is_message() || t == FieldType::Enum);
        let Some(type_name) = &pending.type_name else {
            if needs_type_name && (declared.is_some() || pending.declared_type.is_none()) {
                let detail = match declared {
                    Some(t) => format!("{} field has no type name", t.name()),
                    None => "field has no type".to_owned(),
                };
                self.diag
                    .report(DiagnosticKind::InvalidFieldType, full_name)
                    .message(detail)
                    .emit();
            }
            return;
        };
        if let Some(declared) = declared
            && !needs_type_name
        {
            self.diag
                .report(DiagnosticKind::InvalidFieldType, full_name)
                .message(format!("{} field cannot name type `{type_name}`", declared.name()))
                .emit();
            return;
        }

        let Some(sym) = self.lookup(type_name, &full_name, true) else {
            self.report_unresolved(&full_name, type_name);
            return;
        };
        self.mark_used(sym);
        match (sym, declared) {
            (Symbol::Message(m), None | Some(FieldType::Message | FieldType::Group)) => {
                let f = self.own_field_mut(pending.index);
                f.message_type = Some(m);
                f.field_type = declared.unwrap_or(FieldType::Message);
            }
            (Symbol::Enum(e), None | Some(FieldType::Enum)) => {
                let f = self.own_field_mut(pending.index);
                f.enum_type = Some(e);
                f.field_type = FieldType::Enum;
            }
            _ => {
                let expected = match declared {
                    Some(FieldType::Enum) => "an enum type",
                    Some(_) => "a message type",
                    None => "a type",
                };
                self.diag
                    .report(DiagnosticKind::TypeKindMismatch, full_name)
                    .message(format!("`{type_name}` is not {expected}"))
                    .emit();
            }
        }
    }

    fn resolve_method(&mut self, pending: &PendingMethod) {
        let full_name = self.method_data(pending.index).full_name.clone();
        let resolve = |this: &mut Self, name: &Option<String>| -> Option<MessageIndex> {
            let name = name.as_deref()?;
            match this.lookup(name, &full_name, false) {
                Some(Symbol::Message(m)) => {
                    this.mark_used(Symbol::Message(m));
                    Some(m)
                }
                Some(_) => {
                    this.diag
                        .report(DiagnosticKind::TypeKindMismatch, full_name.clone())
                        .message(format!("`{name}` is not a message type"))
                        .emit();
                    None
                }
                None => {
                    this.report_unresolved(&full_name, name);
                    None
                }
            }
        };
        let input = resolve(self, &pending.input);
        let output = resolve(self, &pending.output);
        let method = &mut self.staged.methods[pending.index.as_usize() - self.base.methods];
        method.input = input;
        method.output = output;
    }

    // ------------------------------------------------------------------
    // Derived properties

    /// A oneof is synthetic when its only member is a proto3 `optional` field.
    fn mark_synthetic_oneofs(&mut self) {
        for local in 0..self.staged.oneofs.len() {
            let synthetic = match self.staged.oneofs[local].fields.as_slice() {
                [only] => self.field_data(*only).proto3_optional,
                _ => false,
            };
            self.staged.oneofs[local].synthetic = synthetic;
        }
    }

    fn finish_fields(&mut self) {
        let fields = std::mem::take(&mut self.fields);
        for pending in &fields {
            let f = self.field_data(pending.index);
            let full_name = f.full_name.clone();
            let name = f.name.clone();
            let field_type = f.field_type;
            let repeated = f.label == Label::Repeated;
            let has_presence = !repeated
                && (f.is_extension
                    || field_type.is_message()
                    || f.oneof.is_some()
                    || self.syntax == Syntax::Proto2);
            let enum_type = f.enum_type;

            let packable = repeated && field_type.is_packable();
            let packed = match pending.packed {
                Some(true) => {
                    if !packable {
                        self.diag
                            .report(DiagnosticKind::InvalidPacked, full_name.clone())
                            .message(format!("`{name}` is not a repeated scalar field"))
                            .emit();
                    }
                    packable
                }
                Some(false) => false,
                None => packable && self.syntax == Syntax::Proto3,
            };

            let default = self.field_default(pending, &full_name, field_type, repeated, enum_type);

            let f = self.own_field_mut(pending.index);
            f.has_presence = has_presence;
            f.packed = packed;
            f.default = default;
        }
        self.fields = fields;
    }

    fn field_default(
        &mut self,
        pending: &PendingField,
        full_name: &str,
        field_type: FieldType,
        repeated: bool,
        enum_type: Option<EnumIndex>,
    ) -> DefaultValue {
        let implicit = if repeated || field_type.is_message() {
            DefaultValue::None
        } else if field_type == FieldType::Enum {
            let first = enum_type.and_then(|e| self.enum_data(e).values.first().copied());
            DefaultValue::Enum(first.map_or(0, |v| self.enum_value_data(v).number))
        } else {
            DefaultValue::zero(field_type)
        };

        let Some(literal) = &pending.default else {
            return implicit;
        };
        if self.syntax == Syntax::Proto3 {
            self.diag
                .report(DiagnosticKind::InvalidDefault, full_name)
                .message("explicit defaults are not allowed in proto3")
                .emit();
            return implicit;
        }
        if repeated || field_type.is_message() {
            let what = if repeated { "repeated" } else { "message" };
            self.diag
                .report(DiagnosticKind::InvalidDefault, full_name)
                .message(format!("{what} fields cannot have a default"))
                .emit();
            return implicit;
        }

        if field_type == FieldType::Enum {
            let Some(enum_type) = enum_type else {
                return implicit;
            };
            let number = self
                .enum_data(enum_type)
                .values
                .iter()
                .map(|&v| self.enum_value_data(v))
                .find(|v| v.name == *literal)
                .map(|v| v.number);
            return match number {
                Some(number) => DefaultValue::Enum(number),
                None => {
                    self.diag
                        .report(DiagnosticKind::InvalidDefault, full_name)
                        .message(format!("`{literal}` is not a value of the enum"))
                        .emit();
                    implicit
                }
            };
        }

        text::parse_default(field_type, literal).unwrap_or_else(|| {
            self.diag
                .report(DiagnosticKind::InvalidDefault, full_name)
                .message(format!("`{literal}` is not a valid {}", field_type.name()))
                .emit();
            implicit
        })
    }

    fn check_unused_dependencies(&mut self, proto: &FileDescriptorProto) {
        let public = self.staged.files[0].public_dependencies.clone();
        let weak: Vec<FileIndex> = proto
            .weak_dependency
            .iter()
            .filter_map(|&i| proto.dependency.get(usize::try_from(i).ok()?))
            .filter_map(|name| self.pool.file_index(name))
            .collect();
        let mut unused = Vec::new();
        for (dep, closure) in &self.exports {
            if public.contains(dep) || weak.contains(dep) {
                continue;
            }
            if closure.is_disjoint(&self.used) {
                unused.push(self.file_data(*dep).name.clone());
            }
        }
        let element = self.file_name().to_owned();
        for name in unused {
            self.diag
                .report(DiagnosticKind::UnusedDependency, element.clone())
                .message(name)
                .emit();
        }
    }

    // ------------------------------------------------------------------
    // Layout

    fn field_input(&self, index: FieldIndex) -> FieldInput {
        let f = self.field_data(index);
        let repeated = f.label == Label::Repeated;
        let is_map = repeated && f.message_type.is_some_and(|m| self.message_data(m).is_map_entry);
        let mode = if is_map {
            FieldMode::Map
        } else if repeated {
            FieldMode::Repeated
        } else {
            FieldMode::Scalar
        };
        FieldInput {
            index,
            number: f.number,
            field_type: f.field_type,
            label: f.label,
            mode,
            packed: f.packed,
            has_presence: f.has_presence,
            oneof: f.oneof.filter(|&o| !self.oneof_data(o).synthetic),
            submessage: f.message_type,
            closed_enum: f.enum_type.filter(|&e| self.enum_data(e).is_closed),
        }
    }

    fn compute_layouts(&mut self) {
        for local in 0..self.staged.messages.len() {
            let message = &self.staged.messages[local];
            let is_map_entry = message.is_map_entry;
            let oneofs: Vec<OneofIndex> = message
                .oneofs
                .iter()
                .copied()
                .filter(|&o| !self.oneof_data(o).synthetic)
                .collect();
            let inputs: Vec<FieldInput> = message
                .fields
                .iter()
                .map(|&f| self.field_input(f))
                .collect();

            let layout = Layout::build(is_map_entry, &inputs, &oneofs);
            for (position, field) in layout.fields().iter().enumerate() {
                self.own_field_mut(field.field).layout_index = position as u32;
            }
            self.staged.messages[local].layout = layout;
        }
    }
}
