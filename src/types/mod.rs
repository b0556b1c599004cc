//! Data type registry and the per-type codec capability.
//!
//! Every wire type is a [`DataType`] behind one capability interface:
//! single-value and bulk (columnar) encode/decode, a default value, and SQL
//! literal parsing. Composite types (`Nullable(T)`, `Array(T)`) wrap an
//! inner descriptor by composition. [`TypeRegistry`] parses the type names
//! the server advertises and hands out shared descriptors.

pub mod composite;
pub mod datetime;
pub mod numeric;
pub mod string;

use crate::error::ProtocolError;
use crate::literal::SqlLexer;
use crate::sink::ByteSink;
use crate::source::ByteSource;
use crate::value::Value;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// SQL classification of a wire type, for metadata consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlType {
    TinyInt,
    SmallInt,
    Integer,
    BigInt,
    Float,
    Double,
    Varchar,
    Date,
    Timestamp,
    Array,
}

/// The per-wire-type behavior bundle.
///
/// Laws every implementation upholds: `decode(encode(v)) == v` for all `v`
/// in the type's domain, and bulk decode of `n` values consumes exactly the
/// bytes bulk encode produced for them.
pub trait DataType: Send + Sync {
    /// Canonical wire name, e.g. `Nullable(Int32)`.
    fn name(&self) -> &str;

    fn sql_type(&self) -> SqlType;

    /// The zero-equivalent value for the type.
    fn default_value(&self) -> Value;

    fn nullable(&self) -> bool {
        false
    }

    /// Decimal precision for metadata purposes. Descriptive only; never
    /// affects the wire encoding.
    fn precision(&self) -> usize {
        0
    }

    fn scale(&self) -> usize {
        0
    }

    /// Writes exactly the type's wire representation of `value`.
    fn encode(&self, value: &Value, sink: &mut dyn ByteSink) -> Result<(), ProtocolError>;

    /// Inverse of [`encode`](DataType::encode); consumes exactly the bytes
    /// encode would have produced for the returned value.
    fn decode(&self, source: &mut dyn ByteSource) -> Result<Value, ProtocolError>;

    /// Encodes `values` as one column. Primitive types are plain repetition;
    /// wrapper types prepend their null-mask or offsets layout.
    fn encode_bulk(&self, values: &[Value], sink: &mut dyn ByteSink) -> Result<(), ProtocolError> {
        for value in values {
            self.encode(value, sink)?;
        }
        Ok(())
    }

    /// Decodes `rows` consecutive values of one column.
    fn decode_bulk(
        &self,
        rows: usize,
        source: &mut dyn ByteSource,
    ) -> Result<Vec<Value>, ProtocolError> {
        let mut values = Vec::with_capacity(rows);
        for _ in 0..rows {
            values.push(self.decode(source)?);
        }
        Ok(values)
    }

    /// Parses one SQL literal token into the type's value domain.
    fn parse_literal(&self, lexer: &mut SqlLexer<'_>) -> Result<Value, ProtocolError>;
}

/// Builds the error for an encode call handed a foreign [`Value`] variant.
pub(crate) fn mismatch(type_name: &str, value: &Value) -> ProtocolError {
    ProtocolError::TypeMismatch {
        type_name: type_name.to_string(),
        value_kind: value.kind(),
    }
}

/// Resolves server-advertised type names into shared [`DataType`]
/// descriptors.
///
/// Resolution parses parameterized names (`Nullable(T)`, `Array(T)`,
/// `FixedString(N)`) recursively and caches the result; it never touches the
/// byte stream, so an unknown name fails before any payload is consumed.
pub struct TypeRegistry {
    cache: Mutex<HashMap<String, Arc<dyn DataType>>>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self {
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Resolves `name` into a type descriptor.
    ///
    /// Unknown or malformed names fail with
    /// [`ProtocolError::UnsupportedType`] naming the offending token.
    pub fn resolve(&self, name: &str) -> Result<Arc<dyn DataType>, ProtocolError> {
        if let Some(ty) = self.cache.lock().get(name) {
            return Ok(ty.clone());
        }
        let mut parser = TypeNameParser::new(name);
        let ty = self.parse_type(&mut parser)?;
        parser.expect_end()?;
        self.cache.lock().insert(name.to_string(), ty.clone());
        Ok(ty)
    }

    fn parse_type(&self, parser: &mut TypeNameParser<'_>) -> Result<Arc<dyn DataType>, ProtocolError> {
        let ident = parser.identifier()?;
        match canonical_name(ident) {
            "Int8" => Ok(Arc::new(numeric::Int8Type)),
            "Int16" => Ok(Arc::new(numeric::Int16Type)),
            "Int32" => Ok(Arc::new(numeric::Int32Type)),
            "Int64" => Ok(Arc::new(numeric::Int64Type)),
            "UInt8" => Ok(Arc::new(numeric::UInt8Type)),
            "UInt16" => Ok(Arc::new(numeric::UInt16Type)),
            "UInt32" => Ok(Arc::new(numeric::UInt32Type)),
            "UInt64" => Ok(Arc::new(numeric::UInt64Type)),
            "Float32" => Ok(Arc::new(numeric::Float32Type)),
            "Float64" => Ok(Arc::new(numeric::Float64Type)),
            "String" => Ok(Arc::new(string::StringType)),
            "Date" => Ok(Arc::new(datetime::DateType)),
            "DateTime" => Ok(Arc::new(datetime::DateTimeType)),
            "FixedString" => {
                parser.expect('(')?;
                let width = parser.integer()?;
                parser.expect(')')?;
                Ok(Arc::new(string::FixedStringType::new(width)))
            }
            "Nullable" => {
                parser.expect('(')?;
                let inner = self.parse_type(parser)?;
                parser.expect(')')?;
                Ok(Arc::new(composite::NullableType::new(inner)))
            }
            "Array" => {
                parser.expect('(')?;
                let inner = self.parse_type(parser)?;
                parser.expect(')')?;
                Ok(Arc::new(composite::ArrayType::new(inner)))
            }
            _ => Err(ProtocolError::UnsupportedType(ident.to_string())),
        }
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// SQL alias spellings accepted in addition to canonical wire names.
fn canonical_name(ident: &str) -> &str {
    match ident {
        "CHAR" | "VARCHAR" | "TEXT" | "TINYTEXT" | "MEDIUMTEXT" | "LONGTEXT" | "BLOB"
        | "TINYBLOB" | "MEDIUMBLOB" | "LONGBLOB" => "String",
        "BOOL" | "BOOLEAN" => "UInt8",
        "TIMESTAMP" => "DateTime",
        other => other,
    }
}

/// Cursor over a type name string.
struct TypeNameParser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> TypeNameParser<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn skip_whitespace(&mut self) {
        self.pos += self
            .rest()
            .len()
            .saturating_sub(self.rest().trim_start().len());
    }

    fn identifier(&mut self) -> Result<&'a str, ProtocolError> {
        self.skip_whitespace();
        let end = self
            .rest()
            .find(|c: char| !c.is_ascii_alphanumeric() && c != '_')
            .unwrap_or(self.rest().len());
        if end == 0 {
            return Err(ProtocolError::UnsupportedType(self.input.to_string()));
        }
        let ident = &self.rest()[..end];
        self.pos += end;
        Ok(ident)
    }

    fn integer(&mut self) -> Result<usize, ProtocolError> {
        self.identifier()?
            .parse()
            .map_err(|_| ProtocolError::UnsupportedType(self.input.to_string()))
    }

    fn expect(&mut self, symbol: char) -> Result<(), ProtocolError> {
        self.skip_whitespace();
        if self.rest().starts_with(symbol) {
            self.pos += symbol.len_utf8();
            Ok(())
        } else {
            Err(ProtocolError::UnsupportedType(self.input.to_string()))
        }
    }

    fn expect_end(&mut self) -> Result<(), ProtocolError> {
        self.skip_whitespace();
        if self.pos == self.input.len() {
            Ok(())
        } else {
            Err(ProtocolError::UnsupportedType(self.input.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::BufferedSource;
    use std::io::Cursor;

    #[test]
    fn test_resolve_base_types() {
        let registry = TypeRegistry::new();
        for name in [
            "Int8", "Int16", "Int32", "Int64", "UInt8", "UInt16", "UInt32", "UInt64", "Float32",
            "Float64", "String", "Date", "DateTime",
        ] {
            let ty = registry.resolve(name).unwrap();
            assert_eq!(ty.name(), name);
        }
    }

    #[test]
    fn test_resolve_nested_composites() {
        let registry = TypeRegistry::new();
        let ty = registry.resolve("Nullable(Array(String))").unwrap();
        assert_eq!(ty.name(), "Nullable(Array(String))");
        assert!(ty.nullable());

        let ty = registry.resolve("Array(Nullable(Int32))").unwrap();
        assert_eq!(ty.name(), "Array(Nullable(Int32))");
        assert_eq!(ty.sql_type(), SqlType::Array);

        let ty = registry.resolve("FixedString(16)").unwrap();
        assert_eq!(ty.name(), "FixedString(16)");
    }

    #[test]
    fn test_aliases_resolve_to_canonical_types() {
        let registry = TypeRegistry::new();
        assert_eq!(registry.resolve("VARCHAR").unwrap().name(), "String");
        assert_eq!(registry.resolve("BOOLEAN").unwrap().name(), "UInt8");
        assert_eq!(registry.resolve("TIMESTAMP").unwrap().name(), "DateTime");
    }

    #[test]
    fn test_unknown_type_names_offending_token() {
        let registry = TypeRegistry::new();
        match registry.resolve("NotAType") {
            Err(ProtocolError::UnsupportedType(token)) => assert_eq!(token, "NotAType"),
            other => panic!("expected UnsupportedType, got {:?}", other.err()),
        }
        // The offending token inside a composite is named, not the composite.
        match registry.resolve("Array(Bogus)") {
            Err(ProtocolError::UnsupportedType(token)) => assert_eq!(token, "Bogus"),
            other => panic!("expected UnsupportedType, got {:?}", other.err()),
        }
    }

    #[test]
    fn test_malformed_names_rejected() {
        let registry = TypeRegistry::new();
        assert!(registry.resolve("Array(").is_err());
        assert!(registry.resolve("Nullable(Int32))").is_err());
        assert!(registry.resolve("FixedString(abc)").is_err());
        assert!(registry.resolve("").is_err());
    }

    #[test]
    fn test_resolution_never_touches_the_source() {
        let registry = TypeRegistry::new();
        let mut source = BufferedSource::with_capacity(Cursor::new(vec![1u8, 2, 3]), 16);
        assert!(registry.resolve("NotAType").is_err());
        // The source is still pristine.
        assert_eq!(source.read_owned(3).unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn test_resolution_is_cached() {
        let registry = TypeRegistry::new();
        let a = registry.resolve("Nullable(Int32)").unwrap();
        let b = registry.resolve("Nullable(Int32)").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }
}
