//! Block and column model: the protocol's bulk transfer granule.
//!
//! Wire layout of a block:
//!
//! ```text
//! +------------+--------------+-----------+
//! | block info | column count | row count |
//! | field enc. | varint       | varint    |
//! +------------+--------------+-----------+
//! then, per column:
//! | name            | type name       | values        |
//! | varint string   | varint string   | bulk encoding |
//! +-----------------+-----------------+---------------+
//! ```
//!
//! Column order is significant: result blocks arrive in the order the server
//! advertises, insert blocks go out in the order the client requested. A
//! zero-column, zero-row block is used as an end-of-stream marker.

use crate::error::ProtocolError;
use crate::sink::ByteSink;
use crate::source::ByteSource;
use crate::types::{DataType, TypeRegistry};
use crate::value::Value;
use std::fmt;
use std::sync::Arc;

/// Out-of-band block metadata, encoded as (field number, value) pairs
/// terminated by field 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockInfo {
    /// Set on blocks carrying GROUP BY overflow rows.
    pub is_overflows: bool,
    /// Two-level aggregation bucket, -1 when not applicable.
    pub bucket_num: i32,
}

impl Default for BlockInfo {
    fn default() -> Self {
        Self {
            is_overflows: false,
            bucket_num: -1,
        }
    }
}

impl BlockInfo {
    fn encode(&self, sink: &mut dyn ByteSink) {
        sink.write_var_uint(1);
        sink.write_bool(self.is_overflows);
        sink.write_var_uint(2);
        sink.write_i32_le(self.bucket_num);
        sink.write_var_uint(0);
    }

    fn decode(source: &mut dyn ByteSource) -> Result<Self, ProtocolError> {
        let mut info = Self::default();
        loop {
            match source.read_var_uint()? {
                0 => return Ok(info),
                1 => info.is_overflows = source.read_bool()?,
                2 => info.bucket_num = source.read_i32_le()?,
                field => {
                    return Err(ProtocolError::CorruptColumn(format!(
                        "unknown block info field {field}"
                    )))
                }
            }
        }
    }
}

/// A named, typed, fixed-length sequence of values.
#[derive(Clone)]
pub struct Column {
    pub name: String,
    pub data_type: Arc<dyn DataType>,
    pub values: Vec<Value>,
}

impl Column {
    pub fn new(
        name: impl Into<String>,
        data_type: Arc<dyn DataType>,
        values: Vec<Value>,
    ) -> Self {
        Self {
            name: name.into(),
            data_type,
            values,
        }
    }
}

impl fmt::Debug for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Column")
            .field("name", &self.name)
            .field("type", &self.data_type.name())
            .field("rows", &self.values.len())
            .finish()
    }
}

/// An ordered set of equal-length columns: the protocol's unit of bulk
/// transfer.
#[derive(Debug, Clone)]
pub struct Block {
    pub info: BlockInfo,
    columns: Vec<Column>,
    rows: usize,
}

impl Block {
    /// Builds a block, enforcing that every column has the same length.
    pub fn new(columns: Vec<Column>) -> Result<Self, ProtocolError> {
        let rows = columns.first().map_or(0, |c| c.values.len());
        for column in &columns {
            if column.values.len() != rows {
                return Err(ProtocolError::ColumnLengthMismatch {
                    column: column.name.clone(),
                    expected: rows,
                    actual: column.values.len(),
                });
            }
        }
        Ok(Self {
            info: BlockInfo::default(),
            columns,
            rows,
        })
    }

    /// The zero-column, zero-row end-of-stream marker.
    pub fn empty() -> Self {
        Self {
            info: BlockInfo::default(),
            columns: Vec::new(),
            rows: 0,
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty() && self.rows == 0
    }

    pub fn into_columns(self) -> Vec<Column> {
        self.columns
    }
}

/// Writes `block` in wire order: info, counts, then each column's name,
/// type name and bulk-encoded values.
pub fn write_block(block: &Block, sink: &mut dyn ByteSink) -> Result<(), ProtocolError> {
    block.info.encode(sink);
    sink.write_var_uint(block.columns.len() as u64);
    sink.write_var_uint(block.rows as u64);
    for column in &block.columns {
        sink.write_utf8_binary(&column.name);
        sink.write_utf8_binary(column.data_type.name());
        column.data_type.encode_bulk(&column.values, sink)?;
    }
    Ok(())
}

/// Reads one block, resolving each column's advertised type name through
/// `registry`.
pub fn read_block(
    source: &mut dyn ByteSource,
    registry: &TypeRegistry,
) -> Result<Block, ProtocolError> {
    let info = BlockInfo::decode(source)?;
    let column_count = source.read_var_uint()? as usize;
    let rows = source.read_var_uint()? as usize;

    let mut columns = Vec::with_capacity(column_count);
    for _ in 0..column_count {
        let name = source.read_utf8_binary()?;
        let type_name = source.read_utf8_binary()?;
        let data_type = registry.resolve(&type_name)?;
        tracing::trace!(column = %name, ty = %type_name, rows, "decoding column");
        let values = data_type.decode_bulk(rows, source)?;
        columns.push(Column {
            name,
            data_type,
            values,
        });
    }
    Ok(Block {
        info,
        columns,
        rows,
    })
}
