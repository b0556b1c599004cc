//! Variable-length and fixed-width string types.

use crate::error::ProtocolError;
use crate::literal::SqlLexer;
use crate::sink::ByteSink;
use crate::source::ByteSource;
use crate::types::{mismatch, DataType, SqlType};
use crate::value::Value;

/// Variable-length string: varint byte count followed by UTF-8 bytes.
/// The length prefix counts bytes, not characters.
pub struct StringType;

impl DataType for StringType {
    fn name(&self) -> &str {
        "String"
    }

    fn sql_type(&self) -> SqlType {
        SqlType::Varchar
    }

    fn default_value(&self) -> Value {
        Value::String(String::new())
    }

    fn encode(&self, value: &Value, sink: &mut dyn ByteSink) -> Result<(), ProtocolError> {
        match value {
            Value::String(s) => {
                sink.write_utf8_binary(s);
                Ok(())
            }
            other => Err(mismatch("String", other)),
        }
    }

    fn decode(&self, source: &mut dyn ByteSource) -> Result<Value, ProtocolError> {
        Ok(Value::String(source.read_utf8_binary()?))
    }

    fn parse_literal(&self, lexer: &mut SqlLexer<'_>) -> Result<Value, ProtocolError> {
        Ok(Value::String(lexer.string_literal()?))
    }
}

/// Fixed-width string: exactly `width` bytes on the wire, zero-padded.
///
/// Decode trims trailing NUL padding so shorter logical values round-trip;
/// values longer than the width are rejected at encode time.
pub struct FixedStringType {
    name: String,
    width: usize,
}

impl FixedStringType {
    pub fn new(width: usize) -> Self {
        Self {
            name: format!("FixedString({width})"),
            width,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }
}

impl DataType for FixedStringType {
    fn name(&self) -> &str {
        &self.name
    }

    fn sql_type(&self) -> SqlType {
        SqlType::Varchar
    }

    fn default_value(&self) -> Value {
        Value::String(String::new())
    }

    fn precision(&self) -> usize {
        self.width
    }

    fn encode(&self, value: &Value, sink: &mut dyn ByteSink) -> Result<(), ProtocolError> {
        let s = match value {
            Value::String(s) => s,
            other => return Err(mismatch(&self.name, other)),
        };
        let bytes = s.as_bytes();
        if bytes.len() > self.width {
            return Err(ProtocolError::ValueOutOfRange {
                type_name: self.name.clone(),
                reason: format!("{} bytes exceed width {}", bytes.len(), self.width),
            });
        }
        sink.write_raw(bytes);
        for _ in bytes.len()..self.width {
            sink.write_byte(0);
        }
        Ok(())
    }

    fn decode(&self, source: &mut dyn ByteSource) -> Result<Value, ProtocolError> {
        let mut bytes = source.read_owned(self.width)?;
        while bytes.last() == Some(&0) {
            bytes.pop();
        }
        String::from_utf8(bytes)
            .map(Value::String)
            .map_err(|_| ProtocolError::InvalidUtf8)
    }

    fn parse_literal(&self, lexer: &mut SqlLexer<'_>) -> Result<Value, ProtocolError> {
        let s = lexer.string_literal()?;
        if s.len() > self.width {
            return Err(ProtocolError::LiteralFormat {
                expected: self.name.clone(),
                found: s,
            });
        }
        Ok(Value::String(s))
    }
}
