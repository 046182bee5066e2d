use super::data::*;

/// Read access to entity records by global index.
///
/// Implemented by the pool (own entities plus underlay chain) and by the
/// file builder (pool entities plus the staged file).
pub(crate) trait Store {
    fn file_data(&self, i: FileIndex) -> &FileData;
    fn message_data(&self, i: MessageIndex) -> &MessageData;
    fn field_data(&self, i: FieldIndex) -> &FieldData;
    fn oneof_data(&self, i: OneofIndex) -> &OneofData;
    fn enum_data(&self, i: EnumIndex) -> &EnumData;
    fn enum_value_data(&self, i: EnumValueIndex) -> &EnumValueData;
    fn service_data(&self, i: ServiceIndex) -> &ServiceData;
    fn method_data(&self, i: MethodIndex) -> &MethodData;

    /// File that defines `sym` (first defining file for packages).
    fn symbol_file(&self, sym: Symbol) -> FileIndex {
        match sym {
            Symbol::Package(f) => f,
            Symbol::Message(m) => self.message_data(m).file,
            Symbol::Enum(e) => self.enum_data(e).file,
            Symbol::EnumValue(v) => self.enum_data(self.enum_value_data(v).parent).file,
            Symbol::Field(f) => self.field_data(f).file,
            Symbol::Oneof(o) => self.message_data(self.oneof_data(o).message).file,
            Symbol::Service(s) => self.service_data(s).file,
            Symbol::Method(m) => self.service_data(self.method_data(m).service).file,
        }
    }
}

/// Implements `Store` by splitting each index space at `$base`: lower
/// indices go to `$lower`, the rest index into `$upper`.
macro_rules! split_store {
    ($ty:ty, |$this:ident| base = $base:expr, lower = $lower:expr, upper = $upper:expr) => {
        split_store!(@impl $ty, $this, $base, $lower, $upper,
            file_data FileIndex FileData files,
            message_data MessageIndex MessageData messages,
            field_data FieldIndex FieldData fields,
            oneof_data OneofIndex OneofData oneofs,
            enum_data EnumIndex EnumData enums,
            enum_value_data EnumValueIndex EnumValueData enum_values,
            service_data ServiceIndex ServiceData services,
            method_data MethodIndex MethodData methods);
    };
    (@impl $ty:ty, $this:ident, $base:expr, $lower:expr, $upper:expr,
        $($method:ident $idx:ident $data:ident $vec:ident),*) => {
        impl crate::pool::store::Store for $ty {
            $(
                fn $method(&self, i: crate::pool::data::$idx) -> &crate::pool::data::$data {
                    let $this = self;
                    let base = $base.$vec;
                    let i = i.as_usize();
                    match $lower {
                        Some(lower) if i < base => crate::pool::store::Store::$method(
                            lower,
                            crate::pool::data::$idx(i as u32),
                        ),
                        _ => &$upper.$vec[i - base],
                    }
                }
            )*
        }
    };
}

pub(crate) use split_store;
