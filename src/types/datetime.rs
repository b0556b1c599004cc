//! Date and time types.
//!
//! `Date` travels as a u16 count of days since 1970-01-01; `DateTime` as a
//! u32 count of Unix seconds, interpreted as UTC. Both are little-endian
//! like every other fixed-width field.

use crate::error::ProtocolError;
use crate::literal::SqlLexer;
use crate::sink::ByteSink;
use crate::source::ByteSource;
use crate::types::{mismatch, DataType, SqlType};
use crate::value::Value;
use chrono::{DateTime, Days, NaiveDate, NaiveDateTime, Utc};

const DATE_FORMAT: &str = "%Y-%m-%d";
const DATE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub struct DateType;

impl DataType for DateType {
    fn name(&self) -> &str {
        "Date"
    }

    fn sql_type(&self) -> SqlType {
        SqlType::Date
    }

    fn default_value(&self) -> Value {
        // NaiveDate::default() is the Unix epoch.
        Value::Date(NaiveDate::default())
    }

    fn encode(&self, value: &Value, sink: &mut dyn ByteSink) -> Result<(), ProtocolError> {
        let date = match value {
            Value::Date(d) => d,
            other => return Err(mismatch("Date", other)),
        };
        let days = (*date - NaiveDate::default()).num_days();
        if !(0..=i64::from(u16::MAX)).contains(&days) {
            return Err(ProtocolError::ValueOutOfRange {
                type_name: "Date".to_string(),
                reason: format!("{date} is outside the u16 day range"),
            });
        }
        sink.write_u16_le(days as u16);
        Ok(())
    }

    fn decode(&self, source: &mut dyn ByteSource) -> Result<Value, ProtocolError> {
        let days = source.read_u16_le()?;
        let date = NaiveDate::default()
            .checked_add_days(Days::new(u64::from(days)))
            .ok_or_else(|| ProtocolError::CorruptColumn("day count overflows Date".to_string()))?;
        Ok(Value::Date(date))
    }

    fn parse_literal(&self, lexer: &mut SqlLexer<'_>) -> Result<Value, ProtocolError> {
        let text = lexer.string_literal()?;
        NaiveDate::parse_from_str(&text, DATE_FORMAT)
            .map(Value::Date)
            .map_err(|_| ProtocolError::LiteralFormat {
                expected: "Date".to_string(),
                found: text,
            })
    }
}

pub struct DateTimeType;

impl DataType for DateTimeType {
    fn name(&self) -> &str {
        "DateTime"
    }

    fn sql_type(&self) -> SqlType {
        SqlType::Timestamp
    }

    fn default_value(&self) -> Value {
        Value::DateTime(DateTime::<Utc>::default())
    }

    fn encode(&self, value: &Value, sink: &mut dyn ByteSink) -> Result<(), ProtocolError> {
        let dt = match value {
            Value::DateTime(dt) => dt,
            other => return Err(mismatch("DateTime", other)),
        };
        let seconds = dt.timestamp();
        if !(0..=i64::from(u32::MAX)).contains(&seconds) {
            return Err(ProtocolError::ValueOutOfRange {
                type_name: "DateTime".to_string(),
                reason: format!("{dt} is outside the u32 second range"),
            });
        }
        sink.write_u32_le(seconds as u32);
        Ok(())
    }

    fn decode(&self, source: &mut dyn ByteSource) -> Result<Value, ProtocolError> {
        let seconds = source.read_u32_le()?;
        let dt = DateTime::<Utc>::from_timestamp(i64::from(seconds), 0).ok_or_else(|| {
            ProtocolError::CorruptColumn("second count overflows DateTime".to_string())
        })?;
        Ok(Value::DateTime(dt))
    }

    fn parse_literal(&self, lexer: &mut SqlLexer<'_>) -> Result<Value, ProtocolError> {
        let text = lexer.string_literal()?;
        NaiveDateTime::parse_from_str(&text, DATE_TIME_FORMAT)
            .map(|naive| Value::DateTime(naive.and_utc()))
            .map_err(|_| ProtocolError::LiteralFormat {
                expected: "DateTime".to_string(),
                found: text,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::BufferedSource;
    use bytes::BytesMut;
    use std::io::Cursor;

    fn roundtrip(ty: &dyn DataType, value: Value) -> Value {
        let mut buf = BytesMut::new();
        ty.encode(&value, &mut buf).unwrap();
        let mut source = BufferedSource::with_capacity(Cursor::new(buf.to_vec()), 16);
        ty.decode(&mut source).unwrap()
    }

    #[test]
    fn test_date_roundtrip_and_width() {
        let date = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        assert_eq!(roundtrip(&DateType, Value::Date(date)), Value::Date(date));

        let mut buf = BytesMut::new();
        DateType.encode(&Value::Date(date), &mut buf).unwrap();
        assert_eq!(buf.len(), 2);
    }

    #[test]
    fn test_epoch_is_day_zero() {
        let mut buf = BytesMut::new();
        DateType
            .encode(&Value::Date(NaiveDate::default()), &mut buf)
            .unwrap();
        assert_eq!(buf.as_ref(), &[0x00, 0x00]);
    }

    #[test]
    fn test_date_before_epoch_rejected() {
        let date = NaiveDate::from_ymd_opt(1969, 12, 31).unwrap();
        let mut buf = BytesMut::new();
        assert!(matches!(
            DateType.encode(&Value::Date(date), &mut buf),
            Err(ProtocolError::ValueOutOfRange { .. })
        ));
    }

    #[test]
    fn test_datetime_roundtrip_and_width() {
        let dt = DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap();
        assert_eq!(
            roundtrip(&DateTimeType, Value::DateTime(dt)),
            Value::DateTime(dt)
        );

        let mut buf = BytesMut::new();
        DateTimeType.encode(&Value::DateTime(dt), &mut buf).unwrap();
        assert_eq!(buf.len(), 4);
    }

    #[test]
    fn test_datetime_drops_subsecond_on_encode() {
        let dt = DateTime::<Utc>::from_timestamp(100, 999_000_000).unwrap();
        let back = roundtrip(&DateTimeType, Value::DateTime(dt));
        assert_eq!(
            back,
            Value::DateTime(DateTime::<Utc>::from_timestamp(100, 0).unwrap())
        );
    }

    #[test]
    fn test_literal_parsing() {
        assert_eq!(
            DateType
                .parse_literal(&mut SqlLexer::new("'2023-06-15'"))
                .unwrap(),
            Value::Date(NaiveDate::from_ymd_opt(2023, 6, 15).unwrap())
        );
        assert_eq!(
            DateTimeType
                .parse_literal(&mut SqlLexer::new("'2023-06-15 12:30:00'"))
                .unwrap(),
            Value::DateTime(
                NaiveDate::from_ymd_opt(2023, 6, 15)
                    .unwrap()
                    .and_hms_opt(12, 30, 0)
                    .unwrap()
                    .and_utc()
            )
        );
        assert!(matches!(
            DateType.parse_literal(&mut SqlLexer::new("'junk'")),
            Err(ProtocolError::LiteralFormat { .. })
        ));
    }
}
