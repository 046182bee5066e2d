//! Chainable constructors for assembling descriptors in code.

use protoflat_core::{FieldType, Label, Syntax};

use super::*;
use crate::pool::map_entry_name;

impl FileDescriptorProto {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Default::default()
        }
    }

    pub fn with_package(mut self, package: impl Into<String>) -> Self {
        self.package = Some(package.into());
        self
    }

    pub fn with_syntax(mut self, syntax: Syntax) -> Self {
        self.syntax = Some(syntax.as_str().to_owned());
        self
    }

    pub fn with_dependency(mut self, file: impl Into<String>) -> Self {
        self.dependency.push(file.into());
        self
    }

    /// Adds a dependency that is re-exported to importers of this file.
    pub fn with_public_dependency(mut self, file: impl Into<String>) -> Self {
        self.public_dependency.push(self.dependency.len() as i32);
        self.dependency.push(file.into());
        self
    }

    pub fn with_message(mut self, message: DescriptorProto) -> Self {
        self.message_type.push(message);
        self
    }

    pub fn with_enum(mut self, enum_type: EnumDescriptorProto) -> Self {
        self.enum_type.push(enum_type);
        self
    }

    pub fn with_extension(mut self, field: FieldDescriptorProto) -> Self {
        self.extension.push(field);
        self
    }

    pub fn with_service(mut self, service: ServiceDescriptorProto) -> Self {
        self.service.push(service);
        self
    }
}

impl DescriptorProto {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Default::default()
        }
    }

    pub fn with_field(mut self, field: FieldDescriptorProto) -> Self {
        self.field.push(field);
        self
    }

    pub fn with_nested(mut self, message: DescriptorProto) -> Self {
        self.nested_type.push(message);
        self
    }

    pub fn with_enum(mut self, enum_type: EnumDescriptorProto) -> Self {
        self.enum_type.push(enum_type);
        self
    }

    pub fn with_extension(mut self, field: FieldDescriptorProto) -> Self {
        self.extension.push(field);
        self
    }

    pub fn with_oneof(mut self, name: impl Into<String>) -> Self {
        self.oneof_decl.push(OneofDescriptorProto {
            name: Some(name.into()),
        });
        self
    }

    /// Declares extension numbers `[start, end)`.
    pub fn with_extension_range(mut self, start: i32, end: i32) -> Self {
        self.extension_range.push(ExtensionRange {
            start: Some(start),
            end: Some(end),
        });
        self
    }

    /// Reserves field numbers `[start, end)`.
    pub fn with_reserved_range(mut self, start: i32, end: i32) -> Self {
        self.reserved_range.push(ReservedRange {
            start: Some(start),
            end: Some(end),
        });
        self
    }

    pub fn with_reserved_name(mut self, name: impl Into<String>) -> Self {
        self.reserved_name.push(name.into());
        self
    }

    pub fn map_entry(mut self) -> Self {
        self.options = Some(MessageOptions {
            map_entry: Some(true),
        });
        self
    }

    /// Synthetic `<Name>Entry` message plus the repeated field that uses it,
    /// the way `map<K, V> name = number;` is lowered.
    pub fn with_map_field(
        self,
        name: &str,
        number: i32,
        key: FieldDescriptorProto,
        value: FieldDescriptorProto,
    ) -> Self {
        let entry_name = map_entry_name(name);
        let entry = DescriptorProto::new(entry_name.clone())
            .with_field(key)
            .with_field(value)
            .map_entry();
        self.with_nested(entry).with_field(
            FieldDescriptorProto::new(name, number, FieldType::Message)
                .with_type_name(entry_name)
                .repeated(),
        )
    }
}

impl FieldDescriptorProto {
    /// Optional field of the given type.
    pub fn new(name: impl Into<String>, number: i32, field_type: FieldType) -> Self {
        Self {
            name: Some(name.into()),
            number: Some(number),
            label: Some(Label::Optional as i32),
            r#type: Some(field_type as i32),
            ..Default::default()
        }
    }

    /// Map key field (`key = 1`) of a map entry.
    pub fn map_key(field_type: FieldType) -> Self {
        Self::new("key", 1, field_type)
    }

    /// Map value field (`value = 2`) of a map entry.
    pub fn map_value(field_type: FieldType) -> Self {
        Self::new("value", 2, field_type)
    }

    pub fn repeated(mut self) -> Self {
        self.label = Some(Label::Repeated as i32);
        self
    }

    pub fn required(mut self) -> Self {
        self.label = Some(Label::Required as i32);
        self
    }

    pub fn with_type_name(mut self, type_name: impl Into<String>) -> Self {
        self.type_name = Some(type_name.into());
        self
    }

    pub fn with_extendee(mut self, extendee: impl Into<String>) -> Self {
        self.extendee = Some(extendee.into());
        self
    }

    pub fn with_default(mut self, value: impl Into<String>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    pub fn with_json_name(mut self, json_name: impl Into<String>) -> Self {
        self.json_name = Some(json_name.into());
        self
    }

    pub fn in_oneof(mut self, index: i32) -> Self {
        self.oneof_index = Some(index);
        self
    }

    pub fn packed(mut self, packed: bool) -> Self {
        self.options = Some(FieldOptions {
            packed: Some(packed),
        });
        self
    }

    /// proto3 `optional`; the caller still declares the synthetic oneof.
    pub fn proto3_optional(mut self) -> Self {
        self.proto3_optional = Some(true);
        self
    }
}

impl EnumDescriptorProto {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Default::default()
        }
    }

    pub fn with_value(mut self, name: impl Into<String>, number: i32) -> Self {
        self.value.push(EnumValueDescriptorProto {
            name: Some(name.into()),
            number: Some(number),
        });
        self
    }

    pub fn allow_alias(mut self) -> Self {
        self.options = Some(EnumOptions {
            allow_alias: Some(true),
        });
        self
    }
}

impl ServiceDescriptorProto {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Default::default()
        }
    }

    pub fn with_method(mut self, method: MethodDescriptorProto) -> Self {
        self.method.push(method);
        self
    }
}

impl MethodDescriptorProto {
    pub fn new(
        name: impl Into<String>,
        input_type: impl Into<String>,
        output_type: impl Into<String>,
    ) -> Self {
        Self {
            name: Some(name.into()),
            input_type: Some(input_type.into()),
            output_type: Some(output_type.into()),
            ..Default::default()
        }
    }

    pub fn streaming(mut self, client: bool, server: bool) -> Self {
        self.client_streaming = Some(client);
        self.server_streaming = Some(server);
        self
    }
}
