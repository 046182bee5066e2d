use protoflat_core::WireType;
use protoflat_wire::Writer;

use super::*;

/// Fields are written in ascending number order, matching `protoc` output.
trait EncodeFields {
    fn encode_fields(&self, w: &mut Writer);

    fn encode_to_vec(&self) -> Vec<u8> {
        let mut w = Writer::new();
        self.encode_fields(&mut w);
        w.into_bytes()
    }
}

fn string(w: &mut Writer, number: u32, value: &Option<String>) {
    if let Some(s) = value {
        w.write_tag(number, WireType::Len);
        w.write_len_delimited(s.as_bytes());
    }
}

fn strings(w: &mut Writer, number: u32, values: &[String]) {
    for s in values {
        w.write_tag(number, WireType::Len);
        w.write_len_delimited(s.as_bytes());
    }
}

fn int32(w: &mut Writer, number: u32, value: Option<i32>) {
    if let Some(v) = value {
        w.write_tag(number, WireType::Varint);
        w.write_varint(i64::from(v) as u64);
    }
}

fn boolean(w: &mut Writer, number: u32, value: Option<bool>) {
    if let Some(v) = value {
        w.write_tag(number, WireType::Varint);
        w.write_varint(u64::from(v));
    }
}

fn message<M: EncodeFields>(w: &mut Writer, number: u32, value: &M) {
    w.write_tag(number, WireType::Len);
    w.write_len_delimited(&value.encode_to_vec());
}

fn messages<M: EncodeFields>(w: &mut Writer, number: u32, values: &[M]) {
    for v in values {
        message(w, number, v);
    }
}

impl FileDescriptorSet {
    pub fn encode_to_vec(&self) -> Vec<u8> {
        EncodeFields::encode_to_vec(self)
    }
}

impl EncodeFields for FileDescriptorSet {
    fn encode_fields(&self, w: &mut Writer) {
        messages(w, 1, &self.file);
    }
}

impl FileDescriptorProto {
    pub fn encode_to_vec(&self) -> Vec<u8> {
        EncodeFields::encode_to_vec(self)
    }
}

impl EncodeFields for FileDescriptorProto {
    fn encode_fields(&self, w: &mut Writer) {
        string(w, 1, &self.name);
        string(w, 2, &self.package);
        strings(w, 3, &self.dependency);
        messages(w, 4, &self.message_type);
        messages(w, 5, &self.enum_type);
        messages(w, 6, &self.service);
        messages(w, 7, &self.extension);
        for &i in &self.public_dependency {
            int32(w, 10, Some(i));
        }
        for &i in &self.weak_dependency {
            int32(w, 11, Some(i));
        }
        string(w, 12, &self.syntax);
    }
}

impl EncodeFields for DescriptorProto {
    fn encode_fields(&self, w: &mut Writer) {
        string(w, 1, &self.name);
        messages(w, 2, &self.field);
        messages(w, 3, &self.nested_type);
        messages(w, 4, &self.enum_type);
        messages(w, 5, &self.extension_range);
        messages(w, 6, &self.extension);
        if let Some(opts) = &self.options {
            message(w, 7, opts);
        }
        messages(w, 8, &self.oneof_decl);
        messages(w, 9, &self.reserved_range);
        strings(w, 10, &self.reserved_name);
    }
}

impl EncodeFields for ExtensionRange {
    fn encode_fields(&self, w: &mut Writer) {
        int32(w, 1, self.start);
        int32(w, 2, self.end);
    }
}

impl EncodeFields for ReservedRange {
    fn encode_fields(&self, w: &mut Writer) {
        int32(w, 1, self.start);
        int32(w, 2, self.end);
    }
}

impl EncodeFields for MessageOptions {
    fn encode_fields(&self, w: &mut Writer) {
        boolean(w, 7, self.map_entry);
    }
}

impl EncodeFields for FieldDescriptorProto {
    fn encode_fields(&self, w: &mut Writer) {
        string(w, 1, &self.name);
        string(w, 2, &self.extendee);
        int32(w, 3, self.number);
        int32(w, 4, self.label);
        int32(w, 5, self.r#type);
        string(w, 6, &self.type_name);
        string(w, 7, &self.default_value);
        if let Some(opts) = &self.options {
            message(w, 8, opts);
        }
        int32(w, 9, self.oneof_index);
        string(w, 10, &self.json_name);
        boolean(w, 17, self.proto3_optional);
    }
}

impl EncodeFields for FieldOptions {
    fn encode_fields(&self, w: &mut Writer) {
        boolean(w, 2, self.packed);
    }
}

impl EncodeFields for OneofDescriptorProto {
    fn encode_fields(&self, w: &mut Writer) {
        string(w, 1, &self.name);
    }
}

impl EncodeFields for EnumDescriptorProto {
    fn encode_fields(&self, w: &mut Writer) {
        string(w, 1, &self.name);
        messages(w, 2, &self.value);
        if let Some(opts) = &self.options {
            message(w, 3, opts);
        }
        messages(w, 4, &self.reserved_range);
        strings(w, 5, &self.reserved_name);
    }
}

impl EncodeFields for EnumOptions {
    fn encode_fields(&self, w: &mut Writer) {
        boolean(w, 2, self.allow_alias);
    }
}

impl EncodeFields for EnumReservedRange {
    fn encode_fields(&self, w: &mut Writer) {
        int32(w, 1, self.start);
        int32(w, 2, self.end);
    }
}

impl EncodeFields for EnumValueDescriptorProto {
    fn encode_fields(&self, w: &mut Writer) {
        string(w, 1, &self.name);
        int32(w, 2, self.number);
    }
}

impl EncodeFields for ServiceDescriptorProto {
    fn encode_fields(&self, w: &mut Writer) {
        string(w, 1, &self.name);
        messages(w, 2, &self.method);
    }
}

impl EncodeFields for MethodDescriptorProto {
    fn encode_fields(&self, w: &mut Writer) {
        string(w, 1, &self.name);
        string(w, 2, &self.input_type);
        string(w, 3, &self.output_type);
        boolean(w, 5, self.client_streaming);
        boolean(w, 6, self.server_streaming);
    }
}
