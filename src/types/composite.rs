//! Composite wrapper types: `Nullable(T)` and `Array(T)`.
//!
//! Wrappers compose an inner [`DataType`] rather than subclassing it. Their
//! bulk layouts prepend column-wide metadata (a null mask or an offsets
//! array), so bulk operations are not plain loops over the scalar codec.

use crate::error::ProtocolError;
use crate::literal::SqlLexer;
use crate::sink::ByteSink;
use crate::source::ByteSource;
use crate::types::{mismatch, DataType, SqlType};
use crate::value::Value;
use std::sync::Arc;

/// Nullable wrapper.
///
/// Single-value form: a flag byte (1 = null) followed by the element bytes;
/// null rows carry the element default so the payload width stays uniform.
/// Bulk form: one flag byte per row (the null mask), then the full element
/// column.
pub struct NullableType {
    name: String,
    inner: Arc<dyn DataType>,
}

impl NullableType {
    pub fn new(inner: Arc<dyn DataType>) -> Self {
        Self {
            name: format!("Nullable({})", inner.name()),
            inner,
        }
    }
}

impl DataType for NullableType {
    fn name(&self) -> &str {
        &self.name
    }

    fn sql_type(&self) -> SqlType {
        self.inner.sql_type()
    }

    fn default_value(&self) -> Value {
        Value::Null
    }

    fn nullable(&self) -> bool {
        true
    }

    fn precision(&self) -> usize {
        self.inner.precision()
    }

    fn scale(&self) -> usize {
        self.inner.scale()
    }

    fn encode(&self, value: &Value, sink: &mut dyn ByteSink) -> Result<(), ProtocolError> {
        if value.is_null() {
            sink.write_byte(1);
            self.inner.encode(&self.inner.default_value(), sink)
        } else {
            sink.write_byte(0);
            self.inner.encode(value, sink)
        }
    }

    fn decode(&self, source: &mut dyn ByteSource) -> Result<Value, ProtocolError> {
        let is_null = source.read_bool()?;
        let value = self.inner.decode(source)?;
        Ok(if is_null { Value::Null } else { value })
    }

    fn encode_bulk(&self, values: &[Value], sink: &mut dyn ByteSink) -> Result<(), ProtocolError> {
        for value in values {
            sink.write_bool(value.is_null());
        }
        // Null slots encode the element default to keep the column dense.
        let dense: Vec<Value> = values
            .iter()
            .map(|v| {
                if v.is_null() {
                    self.inner.default_value()
                } else {
                    v.clone()
                }
            })
            .collect();
        self.inner.encode_bulk(&dense, sink)
    }

    fn decode_bulk(
        &self,
        rows: usize,
        source: &mut dyn ByteSource,
    ) -> Result<Vec<Value>, ProtocolError> {
        let mut mask = Vec::with_capacity(rows);
        for _ in 0..rows {
            mask.push(source.read_bool()?);
        }
        let dense = self.inner.decode_bulk(rows, source)?;
        Ok(mask
            .into_iter()
            .zip(dense)
            .map(|(is_null, value)| if is_null { Value::Null } else { value })
            .collect())
    }

    fn parse_literal(&self, lexer: &mut SqlLexer<'_>) -> Result<Value, ProtocolError> {
        if lexer.eat_keyword("NULL") {
            Ok(Value::Null)
        } else {
            self.inner.parse_literal(lexer)
        }
    }
}

/// Variable-length array of one element type.
///
/// Single-value form: varint element count followed by the elements. Bulk
/// form: one cumulative u64 end offset per row, then the flattened element
/// column (which itself uses the element type's bulk layout).
pub struct ArrayType {
    name: String,
    inner: Arc<dyn DataType>,
}

impl ArrayType {
    pub fn new(inner: Arc<dyn DataType>) -> Self {
        Self {
            name: format!("Array({})", inner.name()),
            inner,
        }
    }

    fn items<'v>(&self, value: &'v Value) -> Result<&'v [Value], ProtocolError> {
        match value {
            Value::Array(items) => Ok(items),
            other => Err(mismatch(&self.name, other)),
        }
    }
}

impl DataType for ArrayType {
    fn name(&self) -> &str {
        &self.name
    }

    fn sql_type(&self) -> SqlType {
        SqlType::Array
    }

    fn default_value(&self) -> Value {
        Value::Array(Vec::new())
    }

    fn encode(&self, value: &Value, sink: &mut dyn ByteSink) -> Result<(), ProtocolError> {
        let items = self.items(value)?;
        sink.write_var_uint(items.len() as u64);
        for item in items {
            self.inner.encode(item, sink)?;
        }
        Ok(())
    }

    fn decode(&self, source: &mut dyn ByteSource) -> Result<Value, ProtocolError> {
        let len = source.read_var_uint()? as usize;
        let mut items = Vec::with_capacity(len);
        for _ in 0..len {
            items.push(self.inner.decode(source)?);
        }
        Ok(Value::Array(items))
    }

    fn encode_bulk(&self, values: &[Value], sink: &mut dyn ByteSink) -> Result<(), ProtocolError> {
        let mut flat = Vec::new();
        let mut total = 0u64;
        let mut offsets = Vec::with_capacity(values.len());
        for value in values {
            let items = self.items(value)?;
            total += items.len() as u64;
            offsets.push(total);
            flat.extend_from_slice(items);
        }
        for offset in offsets {
            sink.write_u64_le(offset);
        }
        self.inner.encode_bulk(&flat, sink)
    }

    fn decode_bulk(
        &self,
        rows: usize,
        source: &mut dyn ByteSource,
    ) -> Result<Vec<Value>, ProtocolError> {
        let mut offsets = Vec::with_capacity(rows);
        let mut prev = 0u64;
        for row in 0..rows {
            let offset = source.read_u64_le()?;
            if offset < prev {
                return Err(ProtocolError::CorruptColumn(format!(
                    "array offset {offset} at row {row} is below the previous offset {prev}"
                )));
            }
            offsets.push(offset);
            prev = offset;
        }

        let flat = self.inner.decode_bulk(prev as usize, source)?;
        let mut iter = flat.into_iter();
        let mut out = Vec::with_capacity(rows);
        let mut start = 0u64;
        for end in offsets {
            out.push(Value::Array(iter.by_ref().take((end - start) as usize).collect()));
            start = end;
        }
        Ok(out)
    }

    fn parse_literal(&self, lexer: &mut SqlLexer<'_>) -> Result<Value, ProtocolError> {
        if !lexer.eat_symbol('[') {
            return Err(ProtocolError::LiteralFormat {
                expected: self.name.clone(),
                found: "missing '['".to_string(),
            });
        }
        let mut items = Vec::new();
        if !lexer.eat_symbol(']') {
            loop {
                items.push(self.inner.parse_literal(lexer)?);
                if lexer.eat_symbol(']') {
                    break;
                }
                if !lexer.eat_symbol(',') {
                    return Err(ProtocolError::LiteralFormat {
                        expected: self.name.clone(),
                        found: "missing ',' or ']'".to_string(),
                    });
                }
            }
        }
        Ok(Value::Array(items))
    }
}
