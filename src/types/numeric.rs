//! Fixed-width numeric types: little-endian on the wire, plain repetition in
//! bulk form.

use crate::error::ProtocolError;
use crate::literal::{NumberLiteral, SqlLexer};
use crate::sink::ByteSink;
use crate::source::ByteSource;
use crate::types::{mismatch, DataType, SqlType};
use crate::value::Value;

macro_rules! int_type {
    ($type_struct:ident, $name:literal, $rust:ty, $variant:ident, $sql:ident,
     $precision:expr, $read:ident, $write:ident) => {
        pub struct $type_struct;

        impl DataType for $type_struct {
            fn name(&self) -> &str {
                $name
            }

            fn sql_type(&self) -> SqlType {
                SqlType::$sql
            }

            fn default_value(&self) -> Value {
                Value::$variant(0)
            }

            fn precision(&self) -> usize {
                $precision
            }

            fn encode(&self, value: &Value, sink: &mut dyn ByteSink) -> Result<(), ProtocolError> {
                match value {
                    Value::$variant(v) => {
                        sink.$write(*v);
                        Ok(())
                    }
                    other => Err(mismatch($name, other)),
                }
            }

            fn decode(&self, source: &mut dyn ByteSource) -> Result<Value, ProtocolError> {
                Ok(Value::$variant(source.$read()?))
            }

            fn parse_literal(&self, lexer: &mut SqlLexer<'_>) -> Result<Value, ProtocolError> {
                match lexer.number_literal()? {
                    NumberLiteral::Int(v) => {
                        <$rust>::try_from(v).map(Value::$variant).map_err(|_| {
                            ProtocolError::LiteralFormat {
                                expected: $name.to_string(),
                                found: v.to_string(),
                            }
                        })
                    }
                    NumberLiteral::Float(v) => Err(ProtocolError::LiteralFormat {
                        expected: $name.to_string(),
                        found: v.to_string(),
                    }),
                }
            }
        }
    };
}

macro_rules! float_type {
    ($type_struct:ident, $name:literal, $rust:ty, $variant:ident, $sql:ident,
     $precision:expr, $read:ident, $write:ident) => {
        pub struct $type_struct;

        impl DataType for $type_struct {
            fn name(&self) -> &str {
                $name
            }

            fn sql_type(&self) -> SqlType {
                SqlType::$sql
            }

            fn default_value(&self) -> Value {
                Value::$variant(0.0)
            }

            fn precision(&self) -> usize {
                $precision
            }

            fn scale(&self) -> usize {
                $precision
            }

            fn encode(&self, value: &Value, sink: &mut dyn ByteSink) -> Result<(), ProtocolError> {
                match value {
                    Value::$variant(v) => {
                        sink.$write(*v);
                        Ok(())
                    }
                    other => Err(mismatch($name, other)),
                }
            }

            fn decode(&self, source: &mut dyn ByteSource) -> Result<Value, ProtocolError> {
                Ok(Value::$variant(source.$read()?))
            }

            fn parse_literal(&self, lexer: &mut SqlLexer<'_>) -> Result<Value, ProtocolError> {
                let n = lexer.number_literal()?;
                Ok(Value::$variant(n.as_f64() as $rust))
            }
        }
    };
}

int_type!(Int8Type, "Int8", i8, Int8, TinyInt, 3, read_i8, write_i8);
int_type!(Int16Type, "Int16", i16, Int16, SmallInt, 5, read_i16_le, write_i16_le);
int_type!(Int32Type, "Int32", i32, Int32, Integer, 10, read_i32_le, write_i32_le);
int_type!(Int64Type, "Int64", i64, Int64, BigInt, 19, read_i64_le, write_i64_le);
int_type!(UInt8Type, "UInt8", u8, UInt8, TinyInt, 3, read_byte, write_byte);
int_type!(UInt16Type, "UInt16", u16, UInt16, SmallInt, 5, read_u16_le, write_u16_le);
int_type!(UInt32Type, "UInt32", u32, UInt32, Integer, 10, read_u32_le, write_u32_le);
int_type!(UInt64Type, "UInt64", u64, UInt64, BigInt, 20, read_u64_le, write_u64_le);
float_type!(Float32Type, "Float32", f32, Float32, Float, 8, read_f32_le, write_f32_le);
float_type!(Float64Type, "Float64", f64, Float64, Double, 17, read_f64_le, write_f64_le);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::BufferedSource;
    use bytes::BytesMut;
    use proptest::prelude::*;
    use std::io::Cursor;

    fn roundtrip(ty: &dyn DataType, value: Value) -> Value {
        let mut buf = BytesMut::new();
        ty.encode(&value, &mut buf).unwrap();
        let mut source = BufferedSource::with_capacity(Cursor::new(buf.to_vec()), 16);
        ty.decode(&mut source).unwrap()
    }

    #[test]
    fn test_single_value_roundtrips() {
        assert_eq!(roundtrip(&Int8Type, Value::Int8(-128)), Value::Int8(-128));
        assert_eq!(
            roundtrip(&Int64Type, Value::Int64(i64::MIN)),
            Value::Int64(i64::MIN)
        );
        assert_eq!(
            roundtrip(&UInt32Type, Value::UInt32(u32::MAX)),
            Value::UInt32(u32::MAX)
        );
        assert_eq!(
            roundtrip(&Float64Type, Value::Float64(-2.5e17)),
            Value::Float64(-2.5e17)
        );
    }

    #[test]
    fn test_wire_layout_is_little_endian() {
        let mut buf = BytesMut::new();
        Int32Type.encode(&Value::Int32(1), &mut buf).unwrap();
        assert_eq!(buf.as_ref(), &[0x01, 0x00, 0x00, 0x00]);
    }

    #[test]
    fn test_bulk_matches_sequential_encodes() {
        let values: Vec<Value> = (0..10i16).map(Value::Int16).collect();
        let mut bulk = BytesMut::new();
        Int16Type.encode_bulk(&values, &mut bulk).unwrap();

        let mut sequential = BytesMut::new();
        for v in &values {
            Int16Type.encode(v, &mut sequential).unwrap();
        }
        assert_eq!(bulk, sequential);

        let mut source = BufferedSource::with_capacity(Cursor::new(bulk.to_vec()), 16);
        assert_eq!(Int16Type.decode_bulk(10, &mut source).unwrap(), values);
    }

    #[test]
    fn test_encode_rejects_foreign_variant() {
        let mut buf = BytesMut::new();
        let result = Int32Type.encode(&Value::String("5".into()), &mut buf);
        assert!(matches!(result, Err(ProtocolError::TypeMismatch { .. })));
    }

    #[test]
    fn test_defaults_are_zero() {
        assert_eq!(Int32Type.default_value(), Value::Int32(0));
        assert_eq!(Float64Type.default_value(), Value::Float64(0.0));
        assert_eq!(UInt8Type.default_value(), Value::UInt8(0));
    }

    #[test]
    fn test_metadata_precision() {
        assert_eq!(Float64Type.precision(), 17);
        assert_eq!(Float64Type.scale(), 17);
        assert_eq!(Int64Type.precision(), 19);
        assert_eq!(UInt64Type.precision(), 20);
    }

    #[test]
    fn test_literal_parsing() {
        assert_eq!(
            Int32Type.parse_literal(&mut SqlLexer::new("-42")).unwrap(),
            Value::Int32(-42)
        );
        assert_eq!(
            Float64Type.parse_literal(&mut SqlLexer::new("2.5")).unwrap(),
            Value::Float64(2.5)
        );
        // Integer tokens are fine for floats.
        assert_eq!(
            Float32Type.parse_literal(&mut SqlLexer::new("3")).unwrap(),
            Value::Float32(3.0)
        );
    }

    #[test]
    fn test_literal_out_of_range() {
        assert!(matches!(
            Int8Type.parse_literal(&mut SqlLexer::new("300")),
            Err(ProtocolError::LiteralFormat { .. })
        ));
        assert!(matches!(
            UInt16Type.parse_literal(&mut SqlLexer::new("-1")),
            Err(ProtocolError::LiteralFormat { .. })
        ));
        // Fractional tokens don't fit integer types.
        assert!(matches!(
            Int32Type.parse_literal(&mut SqlLexer::new("1.5")),
            Err(ProtocolError::LiteralFormat { .. })
        ));
    }

    proptest! {
        #[test]
        fn prop_int64_roundtrip(v: i64) {
            prop_assert_eq!(roundtrip(&Int64Type, Value::Int64(v)), Value::Int64(v));
        }

        #[test]
        fn prop_float64_roundtrip(v: f64) {
            // Bit-exact comparison, NaN payloads included.
            let mut buf = BytesMut::new();
            Float64Type.encode(&Value::Float64(v), &mut buf).unwrap();
            let mut source = BufferedSource::with_capacity(Cursor::new(buf.to_vec()), 16);
            match Float64Type.decode(&mut source).unwrap() {
                Value::Float64(back) => prop_assert_eq!(back.to_bits(), v.to_bits()),
                other => prop_assert!(false, "unexpected variant {:?}", other),
            }
        }
    }
}
