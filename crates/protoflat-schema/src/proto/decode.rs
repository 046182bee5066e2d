use protoflat_core::WireType;
use protoflat_wire::{Reader, Tag, WireError};

use super::*;

/// Nesting bound for descriptor messages (nested types, options).
const MAX_DEPTH: u32 = 64;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DescriptorDecodeError {
    #[error(transparent)]
    Wire(#[from] WireError),

    #[error("field `{0}` is not valid UTF-8")]
    Utf8(&'static str),

    #[error("descriptor nested too deeply")]
    TooDeep,
}

type Result<T> = std::result::Result<T, DescriptorDecodeError>;

trait DecodeFields: Default {
    fn decode_field(&mut self, tag: Tag, r: &mut Reader<'_>, depth: u32) -> Result<()>;
}

fn decode_message<M: DecodeFields>(bytes: &[u8], depth: u32) -> Result<M> {
    if depth == 0 {
        return Err(DescriptorDecodeError::TooDeep);
    }
    let mut msg = M::default();
    let mut r = Reader::new(bytes);
    while !r.is_at_limit() {
        let tag = r.read_tag()?;
        msg.decode_field(tag, &mut r, depth)?;
    }
    Ok(msg)
}

fn nested<M: DecodeFields>(r: &mut Reader<'_>, depth: u32) -> Result<M> {
    let bytes = r.read_len_delimited()?;
    decode_message(bytes, depth - 1)
}

fn string(r: &mut Reader<'_>, field: &'static str) -> Result<String> {
    let bytes = r.read_len_delimited()?;
    String::from_utf8(bytes.to_vec()).map_err(|_| DescriptorDecodeError::Utf8(field))
}

fn int32(r: &mut Reader<'_>) -> Result<i32> {
    Ok(r.read_varint64()? as i32)
}

fn boolean(r: &mut Reader<'_>) -> Result<bool> {
    Ok(r.read_varint64()? != 0)
}

/// Repeated `int32`, accepting both packed and unpacked records.
fn int32s(r: &mut Reader<'_>, wire_type: WireType, out: &mut Vec<i32>) -> Result<()> {
    if wire_type == WireType::Len {
        let len = r.read_len()?;
        r.push_limit(len)?;
        while !r.is_at_limit() {
            out.push(int32(r)?);
        }
        r.pop_limit();
    } else {
        out.push(int32(r)?);
    }
    Ok(())
}

fn skip(r: &mut Reader<'_>, tag: Tag) -> Result<()> {
    r.skip_field(tag, MAX_DEPTH)?;
    Ok(())
}

/// Dispatches on `(number, wire type)`; a known number with an unexpected
/// wire type is skipped like an unknown field.
macro_rules! fields {
    ($tag:ident, $r:ident, { $($num:literal, $wt:ident => $body:expr,)* }) => {
        match ($tag.number, $tag.wire_type) {
            $(($num, WireType::$wt) => { $body; })*
            _ => skip($r, $tag)?,
        }
    };
}

impl FileDescriptorSet {
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        decode_message(bytes, MAX_DEPTH)
    }
}

impl DecodeFields for FileDescriptorSet {
    fn decode_field(&mut self, tag: Tag, r: &mut Reader<'_>, depth: u32) -> Result<()> {
        fields!(tag, r, {
            1, Len => self.file.push(nested(r, depth)?),
        });
        Ok(())
    }
}

impl FileDescriptorProto {
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        decode_message(bytes, MAX_DEPTH)
    }
}

impl DecodeFields for FileDescriptorProto {
    fn decode_field(&mut self, tag: Tag, r: &mut Reader<'_>, depth: u32) -> Result<()> {
        match (tag.number, tag.wire_type) {
            (10, wt @ (WireType::Varint | WireType::Len)) => {
                int32s(r, wt, &mut self.public_dependency)?
            }
            (11, wt @ (WireType::Varint | WireType::Len)) => {
                int32s(r, wt, &mut self.weak_dependency)?
            }
            _ => fields!(tag, r, {
                1, Len => self.name = Some(string(r, "name")?),
                2, Len => self.package = Some(string(r, "package")?),
                3, Len => self.dependency.push(string(r, "dependency")?),
                4, Len => self.message_type.push(nested(r, depth)?),
                5, Len => self.enum_type.push(nested(r, depth)?),
                6, Len => self.service.push(nested(r, depth)?),
                7, Len => self.extension.push(nested(r, depth)?),
                12, Len => self.syntax = Some(string(r, "syntax")?),
            }),
        }
        Ok(())
    }
}

impl DecodeFields for DescriptorProto {
    fn decode_field(&mut self, tag: Tag, r: &mut Reader<'_>, depth: u32) -> Result<()> {
        fields!(tag, r, {
            1, Len => self.name = Some(string(r, "name")?),
            2, Len => self.field.push(nested(r, depth)?),
            3, Len => self.nested_type.push(nested(r, depth)?),
            4, Len => self.enum_type.push(nested(r, depth)?),
            5, Len => self.extension_range.push(nested(r, depth)?),
            6, Len => self.extension.push(nested(r, depth)?),
            7, Len => {
                let opts: MessageOptions = nested(r, depth)?;
                let merged = self.options.get_or_insert_with(Default::default);
                merged.map_entry = opts.map_entry.or(merged.map_entry);
            },
            8, Len => self.oneof_decl.push(nested(r, depth)?),
            9, Len => self.reserved_range.push(nested(r, depth)?),
            10, Len => self.reserved_name.push(string(r, "reserved_name")?),
        });
        Ok(())
    }
}

impl DecodeFields for ExtensionRange {
    fn decode_field(&mut self, tag: Tag, r: &mut Reader<'_>, _depth: u32) -> Result<()> {
        fields!(tag, r, {
            1, Varint => self.start = Some(int32(r)?),
            2, Varint => self.end = Some(int32(r)?),
        });
        Ok(())
    }
}

impl DecodeFields for ReservedRange {
    fn decode_field(&mut self, tag: Tag, r: &mut Reader<'_>, _depth: u32) -> Result<()> {
        fields!(tag, r, {
            1, Varint => self.start = Some(int32(r)?),
            2, Varint => self.end = Some(int32(r)?),
        });
        Ok(())
    }
}

impl DecodeFields for MessageOptions {
    fn decode_field(&mut self, tag: Tag, r: &mut Reader<'_>, _depth: u32) -> Result<()> {
        fields!(tag, r, {
            7, Varint => self.map_entry = Some(boolean(r)?),
        });
        Ok(())
    }
}

impl DecodeFields for FieldDescriptorProto {
    fn decode_field(&mut self, tag: Tag, r: &mut Reader<'_>, depth: u32) -> Result<()> {
        fields!(tag, r, {
            1, Len => self.name = Some(string(r, "name")?),
            2, Len => self.extendee = Some(string(r, "extendee")?),
            3, Varint => self.number = Some(int32(r)?),
            4, Varint => self.label = Some(int32(r)?),
            5, Varint => self.r#type = Some(int32(r)?),
            6, Len => self.type_name = Some(string(r, "type_name")?),
            7, Len => self.default_value = Some(string(r, "default_value")?),
            8, Len => {
                let opts: FieldOptions = nested(r, depth)?;
                let merged = self.options.get_or_insert_with(Default::default);
                merged.packed = opts.packed.or(merged.packed);
            },
            9, Varint => self.oneof_index = Some(int32(r)?),
            10, Len => self.json_name = Some(string(r, "json_name")?),
            17, Varint => self.proto3_optional = Some(boolean(r)?),
        });
        Ok(())
    }
}

impl DecodeFields for FieldOptions {
    fn decode_field(&mut self, tag: Tag, r: &mut Reader<'_>, _depth: u32) -> Result<()> {
        fields!(tag, r, {
            2, Varint => self.packed = Some(boolean(r)?),
        });
        Ok(())
    }
}

impl DecodeFields for OneofDescriptorProto {
    fn decode_field(&mut self, tag: Tag, r: &mut Reader<'_>, _depth: u32) -> Result<()> {
        fields!(tag, r, {
            1, Len => self.name = Some(string(r, "name")?),
        });
        Ok(())
    }
}

impl DecodeFields for EnumDescriptorProto {
    fn decode_field(&mut self, tag: Tag, r: &mut Reader<'_>, depth: u32) -> Result<()> {
        fields!(tag, r, {
            1, Len => self.name = Some(string(r, "name")?),
            2, Len => self.value.push(nested(r, depth)?),
            3, Len => {
                let opts: EnumOptions = nested(r, depth)?;
                let merged = self.options.get_or_insert_with(Default::default);
                merged.allow_alias = opts.allow_alias.or(merged.allow_alias);
            },
            4, Len => self.reserved_range.push(nested(r, depth)?),
            5, Len => self.reserved_name.push(string(r, "reserved_name")?),
        });
        Ok(())
    }
}

impl DecodeFields for EnumOptions {
    fn decode_field(&mut self, tag: Tag, r: &mut Reader<'_>, _depth: u32) -> Result<()> {
        fields!(tag, r, {
            2, Varint => self.allow_alias = Some(boolean(r)?),
        });
        Ok(())
    }
}

impl DecodeFields for EnumReservedRange {
    fn decode_field(&mut self, tag: Tag, r: &mut Reader<'_>, _depth: u32) -> Result<()> {
        fields!(tag, r, {
            1, Varint => self.start = Some(int32(r)?),
            2, Varint => self.end = Some(int32(r)?),
        });
        Ok(())
    }
}

impl DecodeFields for EnumValueDescriptorProto {
    fn decode_field(&mut self, tag: Tag, r: &mut Reader<'_>, _depth: u32) -> Result<()> {
        fields!(tag, r, {
            1, Len => self.name = Some(string(r, "name")?),
            2, Varint => self.number = Some(int32(r)?),
        });
        Ok(())
    }
}

impl DecodeFields for ServiceDescriptorProto {
    fn decode_field(&mut self, tag: Tag, r: &mut Reader<'_>, depth: u32) -> Result<()> {
        fields!(tag, r, {
            1, Len => self.name = Some(string(r, "name")?),
            2, Len => self.method.push(nested(r, depth)?),
        });
        Ok(())
    }
}

impl DecodeFields for MethodDescriptorProto {
    fn decode_field(&mut self, tag: Tag, r: &mut Reader<'_>, _depth: u32) -> Result<()> {
        fields!(tag, r, {
            1, Len => self.name = Some(string(r, "name")?),
            2, Len => self.input_type = Some(string(r, "input_type")?),
            3, Len => self.output_type = Some(string(r, "output_type")?),
            5, Varint => self.client_streaming = Some(boolean(r)?),
            6, Varint => self.server_streaming = Some(boolean(r)?),
        });
        Ok(())
    }
}
