/// Schema problem kinds ordered by priority (highest priority first).
///
/// Rendering sorts by kind, so structural problems with the descriptor
/// itself come before naming problems, which come before semantic ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DiagnosticKind {
    // The input could not be read as a descriptor at all
    MalformedDescriptor,
    InvalidSyntax,
    DuplicateFile,
    MissingDependency,

    // Names
    MissingName,
    InvalidName,
    DuplicateSymbol,
    DuplicateFieldName,

    // Field shape
    InvalidFieldNumber,
    DuplicateFieldNumber,
    ReservedFieldNumber,
    ReservedFieldName,
    InvalidLabel,
    InvalidFieldType,
    Proto3Required,

    // References
    UnresolvedType,
    TypeKindMismatch,
    InvalidExtendee,
    ExtensionOutOfRange,

    // Oneofs
    InvalidOneofIndex,
    InvalidOneofMember,
    SyntheticOneofShape,

    // Derived shapes and values
    InvalidMapEntry,
    InvalidPacked,
    InvalidDefault,

    // Enums
    EmptyEnum,
    Proto3EnumFirstValue,
    DuplicateEnumNumber,

    // Hygiene
    UnusedDependency,
}

impl DiagnosticKind {
    pub fn default_severity(&self) -> Severity {
        match self {
            Self::UnusedDependency => Severity::Warning,
            _ => Severity::Error,
        }
    }

    /// Default hint for this kind, automatically included in diagnostics.
    pub fn default_hint(&self) -> Option<&'static str> {
        match self {
            Self::InvalidFieldNumber => {
                Some("field numbers range from 1 to 536870911, excluding 19000 to 19999")
            }
            Self::Proto3Required => Some("use `optional` or a plain singular field instead"),
            Self::Proto3EnumFirstValue => Some("add an `_UNSPECIFIED = 0` value first"),
            Self::DuplicateEnumNumber => Some("set `option allow_alias = true;` to permit aliases"),
            Self::InvalidPacked => Some("only repeated scalar numeric fields can be packed"),
            _ => None,
        }
    }

    /// Base message for this diagnostic kind, used when no custom message is provided.
    pub fn fallback_message(&self) -> &'static str {
        match self {
            Self::MalformedDescriptor => "descriptor could not be decoded",
            Self::InvalidSyntax => "unsupported syntax",
            Self::DuplicateFile => "file is already in the pool",
            Self::MissingDependency => "dependency not found",

            Self::MissingName => "missing name",
            Self::InvalidName => "invalid name",
            Self::DuplicateSymbol => "symbol is already defined",
            Self::DuplicateFieldName => "duplicate field name",

            Self::InvalidFieldNumber => "invalid field number",
            Self::DuplicateFieldNumber => "duplicate field number",
            Self::ReservedFieldNumber => "field number is reserved",
            Self::ReservedFieldName => "field name is reserved",
            Self::InvalidLabel => "invalid label",
            Self::InvalidFieldType => "invalid field type",
            Self::Proto3Required => "required fields are not allowed in proto3",

            Self::UnresolvedType => "type not found",
            Self::TypeKindMismatch => "wrong kind of type",
            Self::InvalidExtendee => "invalid extendee",
            Self::ExtensionOutOfRange => "extension number outside extension ranges",

            Self::InvalidOneofIndex => "oneof index out of range",
            Self::InvalidOneofMember => "invalid oneof member",
            Self::SyntheticOneofShape => "malformed synthetic oneof",

            Self::InvalidMapEntry => "invalid map entry",
            Self::InvalidPacked => "packed is not allowed here",
            Self::InvalidDefault => "invalid default value",

            Self::EmptyEnum => "enums must contain at least one value",
            Self::Proto3EnumFirstValue => "the first enum value must be zero in proto3",
            Self::DuplicateEnumNumber => "duplicate enum value number",

            Self::UnusedDependency => "unused import",
        }
    }

    /// Template for custom messages. Contains `{}` placeholder for caller-provided detail.
    pub fn custom_message(&self) -> String {
        match self {
            Self::DuplicateFile => "`{}` is already in the pool".to_string(),
            Self::MissingDependency => "dependency `{}` not found".to_string(),
            Self::DuplicateSymbol => "`{}` is already defined".to_string(),
            Self::DuplicateFieldName => "duplicate field name `{}`".to_string(),
            Self::UnresolvedType => "`{}` is not defined".to_string(),
            Self::ReservedFieldName => "field name `{}` is reserved".to_string(),
            Self::UnusedDependency => "import `{}` is not used".to_string(),
            Self::MalformedDescriptor | Self::TypeKindMismatch => "{}".to_string(),

            // Standard pattern: fallback + context
            _ => format!("{}: {{}}", self.fallback_message()),
        }
    }

    /// Render the final message.
    ///
    /// - `None` → returns `fallback_message()`
    /// - `Some(detail)` → returns `custom_message()` with `{}` replaced by detail
    pub fn message(&self, msg: Option<&str>) -> String {
        match msg {
            None => self.fallback_message().to_string(),
            Some(detail) => self.custom_message().replace("{}", detail),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Severity {
    #[default]
    Error,
    Warning,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

/// One reported problem, attached to the full name of the offending element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosticMessage {
    pub(crate) kind: DiagnosticKind,
    pub(crate) element: String,
    pub(crate) message: String,
    pub(crate) hints: Vec<String>,
}

impl DiagnosticMessage {
    pub(crate) fn new(kind: DiagnosticKind, element: String) -> Self {
        let hints = kind.default_hint().map(str::to_owned).into_iter().collect();
        Self {
            kind,
            element,
            message: kind.fallback_message().to_owned(),
            hints,
        }
    }

    pub fn kind(&self) -> DiagnosticKind {
        self.kind
    }

    /// Full name (or file name) of the element the problem is about.
    pub fn element(&self) -> &str {
        &self.element
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn hints(&self) -> &[String] {
        &self.hints
    }

    pub fn severity(&self) -> Severity {
        self.kind.default_severity()
    }

    pub fn is_error(&self) -> bool {
        self.severity() == Severity::Error
    }

    pub fn is_warning(&self) -> bool {
        self.severity() == Severity::Warning
    }
}

impl std::fmt::Display for DiagnosticMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}[{}]: {}", self.severity(), self.element, self.message)?;
        for hint in &self.hints {
            write!(f, "\n  hint: {hint}")?;
        }
        Ok(())
    }
}
