//! Bidirectional conversion between wire-level cells and native values.
//!
//! The text protocol transmits every cell as exact-length raw bytes. The
//! registry decodes them into [`Value`]s keyed on the column's wire type
//! code, and encodes [`Value`]s back into wire text. Both directions are
//! exhaustive matches, so adding a type or a variant without handling it
//! is a compile error.

use asyncmaria_core::{ConvertError, Error, Result, Value};
use chrono::{NaiveDate, TimeDelta};
use rust_decimal::Decimal;

use crate::engine::Field;

/// Wire type codes, the `MYSQL_TYPE_*` constants of the C API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum FieldType {
    /// DECIMAL (MYSQL_TYPE_DECIMAL)
    Decimal = 0x00,
    /// TINYINT (MYSQL_TYPE_TINY)
    Tiny = 0x01,
    /// SMALLINT (MYSQL_TYPE_SHORT)
    Short = 0x02,
    /// INT (MYSQL_TYPE_LONG)
    Long = 0x03,
    /// FLOAT (MYSQL_TYPE_FLOAT)
    Float = 0x04,
    /// DOUBLE (MYSQL_TYPE_DOUBLE)
    Double = 0x05,
    /// NULL (MYSQL_TYPE_NULL)
    Null = 0x06,
    /// TIMESTAMP (MYSQL_TYPE_TIMESTAMP)
    Timestamp = 0x07,
    /// BIGINT (MYSQL_TYPE_LONGLONG)
    LongLong = 0x08,
    /// MEDIUMINT (MYSQL_TYPE_INT24)
    Int24 = 0x09,
    /// DATE (MYSQL_TYPE_DATE)
    Date = 0x0A,
    /// TIME (MYSQL_TYPE_TIME)
    Time = 0x0B,
    /// DATETIME (MYSQL_TYPE_DATETIME)
    DateTime = 0x0C,
    /// YEAR (MYSQL_TYPE_YEAR)
    Year = 0x0D,
    /// NEWDATE (MYSQL_TYPE_NEWDATE) - internal use
    NewDate = 0x0E,
    /// VARCHAR (MYSQL_TYPE_VARCHAR)
    VarChar = 0x0F,
    /// BIT (MYSQL_TYPE_BIT)
    Bit = 0x10,
    /// TIMESTAMP2 (MYSQL_TYPE_TIMESTAMP2)
    Timestamp2 = 0x11,
    /// DATETIME2 (MYSQL_TYPE_DATETIME2)
    DateTime2 = 0x12,
    /// TIME2 (MYSQL_TYPE_TIME2)
    Time2 = 0x13,
    /// JSON (MYSQL_TYPE_JSON)
    Json = 0xF5,
    /// NEWDECIMAL (MYSQL_TYPE_NEWDECIMAL)
    NewDecimal = 0xF6,
    /// ENUM (MYSQL_TYPE_ENUM)
    Enum = 0xF7,
    /// SET (MYSQL_TYPE_SET)
    Set = 0xF8,
    /// TINYBLOB (MYSQL_TYPE_TINY_BLOB)
    TinyBlob = 0xF9,
    /// MEDIUMBLOB (MYSQL_TYPE_MEDIUM_BLOB)
    MediumBlob = 0xFA,
    /// LONGBLOB (MYSQL_TYPE_LONG_BLOB)
    LongBlob = 0xFB,
    /// BLOB (MYSQL_TYPE_BLOB)
    Blob = 0xFC,
    /// VARCHAR (MYSQL_TYPE_VAR_STRING)
    VarString = 0xFD,
    /// CHAR (MYSQL_TYPE_STRING)
    String = 0xFE,
    /// GEOMETRY (MYSQL_TYPE_GEOMETRY)
    Geometry = 0xFF,
}

impl FieldType {
    /// Parse a wire type code. Unknown codes are `None`; the caller
    /// turns that into a typed error rather than guessing a decoder.
    #[must_use]
    pub fn from_code(value: u8) -> Option<Self> {
        Some(match value {
            0x00 => FieldType::Decimal,
            0x01 => FieldType::Tiny,
            0x02 => FieldType::Short,
            0x03 => FieldType::Long,
            0x04 => FieldType::Float,
            0x05 => FieldType::Double,
            0x06 => FieldType::Null,
            0x07 => FieldType::Timestamp,
            0x08 => FieldType::LongLong,
            0x09 => FieldType::Int24,
            0x0A => FieldType::Date,
            0x0B => FieldType::Time,
            0x0C => FieldType::DateTime,
            0x0D => FieldType::Year,
            0x0E => FieldType::NewDate,
            0x0F => FieldType::VarChar,
            0x10 => FieldType::Bit,
            0x11 => FieldType::Timestamp2,
            0x12 => FieldType::DateTime2,
            0x13 => FieldType::Time2,
            0xF5 => FieldType::Json,
            0xF6 => FieldType::NewDecimal,
            0xF7 => FieldType::Enum,
            0xF8 => FieldType::Set,
            0xF9 => FieldType::TinyBlob,
            0xFA => FieldType::MediumBlob,
            0xFB => FieldType::LongBlob,
            0xFC => FieldType::Blob,
            0xFD => FieldType::VarString,
            0xFE => FieldType::String,
            0xFF => FieldType::Geometry,
            _ => return None,
        })
    }

    /// The raw wire code.
    #[must_use]
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Check if this is an integer type.
    #[must_use]
    pub const fn is_integer(self) -> bool {
        matches!(
            self,
            FieldType::Tiny
                | FieldType::Short
                | FieldType::Long
                | FieldType::LongLong
                | FieldType::Int24
                | FieldType::Year
        )
    }

    /// Check if this is a date/time type.
    #[must_use]
    pub const fn is_temporal(self) -> bool {
        matches!(
            self,
            FieldType::Date
                | FieldType::NewDate
                | FieldType::Time
                | FieldType::Time2
                | FieldType::DateTime
                | FieldType::DateTime2
                | FieldType::Timestamp
                | FieldType::Timestamp2
        )
    }

    /// Get the type name as a string.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            FieldType::Decimal | FieldType::NewDecimal => "DECIMAL",
            FieldType::Tiny => "TINYINT",
            FieldType::Short => "SMALLINT",
            FieldType::Long => "INT",
            FieldType::Float => "FLOAT",
            FieldType::Double => "DOUBLE",
            FieldType::Null => "NULL",
            FieldType::Timestamp | FieldType::Timestamp2 => "TIMESTAMP",
            FieldType::LongLong => "BIGINT",
            FieldType::Int24 => "MEDIUMINT",
            FieldType::Date | FieldType::NewDate => "DATE",
            FieldType::Time | FieldType::Time2 => "TIME",
            FieldType::DateTime | FieldType::DateTime2 => "DATETIME",
            FieldType::Year => "YEAR",
            FieldType::VarChar | FieldType::VarString => "VARCHAR",
            FieldType::Bit => "BIT",
            FieldType::Json => "JSON",
            FieldType::Enum => "ENUM",
            FieldType::Set => "SET",
            FieldType::TinyBlob => "TINYBLOB",
            FieldType::MediumBlob => "MEDIUMBLOB",
            FieldType::LongBlob => "LONGBLOB",
            FieldType::Blob => "BLOB",
            FieldType::String => "CHAR",
            FieldType::Geometry => "GEOMETRY",
        }
    }
}

/// The bidirectional conversion table.
///
/// An explicit value, shared by `Arc` from the connection to its
/// cursors. There is no process-global registry; two connections can
/// carry different registries without observing each other.
#[derive(Debug, Clone, Default)]
pub struct ConvertRegistry {
    _private: (),
}

impl ConvertRegistry {
    /// Create the standard registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode one cell into a native value.
    ///
    /// A `None` cell is SQL NULL and takes precedence over every
    /// type-specific rule.
    pub fn decode(&self, field: &Field, cell: Option<&[u8]>) -> Result<Value> {
        let Some(raw) = cell else {
            return Ok(Value::Null);
        };
        let ty = FieldType::from_code(field.type_code).ok_or_else(|| {
            convert_err(field, format!("unsupported wire type 0x{:02X}", field.type_code))
        })?;

        match ty {
            FieldType::Null => Ok(Value::Null),

            FieldType::Tiny
            | FieldType::Short
            | FieldType::Long
            | FieldType::LongLong
            | FieldType::Int24
            | FieldType::Year => decode_int(field, cell_str(field, raw)?),

            FieldType::Bit => decode_bit(field, raw),

            FieldType::Decimal | FieldType::NewDecimal => {
                let text = cell_str(field, raw)?;
                Decimal::from_str_exact(text)
                    .map(Value::Decimal)
                    .map_err(|e| convert_err(field, format!("invalid decimal '{text}': {e}")))
            }

            FieldType::Float | FieldType::Double => {
                let text = cell_str(field, raw)?;
                text.parse::<f64>()
                    .map(Value::Double)
                    .map_err(|_| convert_err(field, format!("invalid float '{text}'")))
            }

            FieldType::Date | FieldType::NewDate => {
                decode_date(field, cell_str(field, raw)?).map(Value::Date)
            }

            FieldType::Time | FieldType::Time2 => decode_time(field, cell_str(field, raw)?),

            FieldType::DateTime
            | FieldType::DateTime2
            | FieldType::Timestamp
            | FieldType::Timestamp2 => decode_datetime(field, cell_str(field, raw)?),

            FieldType::Set => decode_set(field, cell_str(field, raw)?),

            // Text cells that are not valid UTF-8 keep their exact bytes
            // so they survive a round trip unchanged.
            FieldType::VarChar
            | FieldType::VarString
            | FieldType::String
            | FieldType::Enum
            | FieldType::Json => Ok(match std::str::from_utf8(raw) {
                Ok(s) => Value::Text(s.to_string()),
                Err(_) => Value::Bytes(raw.to_vec()),
            }),

            FieldType::TinyBlob
            | FieldType::MediumBlob
            | FieldType::LongBlob
            | FieldType::Blob
            | FieldType::Geometry => Ok(Value::Bytes(raw.to_vec())),
        }
    }

    /// Encode a native value into wire text.
    ///
    /// `decode(encode(v))` yields `v` back for every variant;
    /// `encode(decode(b))` yields `b` for canonical literals.
    pub fn encode(&self, value: &Value) -> Vec<u8> {
        match value {
            Value::Null => b"NULL".to_vec(),
            Value::Int(v) => v.to_string().into_bytes(),
            Value::UInt(v) => v.to_string().into_bytes(),
            Value::Double(v) => v.to_string().into_bytes(),
            Value::Decimal(v) => v.to_string().into_bytes(),
            Value::Text(v) => v.clone().into_bytes(),
            Value::Bytes(v) => v.clone(),
            Value::Date(v) => v.format("%Y-%m-%d").to_string().into_bytes(),
            Value::DateTime(v) => v.format("%Y-%m-%d %H:%M:%S%.6f").to_string().into_bytes(),
            Value::Duration(v) => format_duration(*v).into_bytes(),
            Value::Set(members) => members.join(",").into_bytes(),
        }
    }

    /// Render a value as a quoted, escaped SQL literal for embedding
    /// into query text.
    pub fn sql_literal(&self, value: &Value) -> String {
        match value {
            Value::Null => "NULL".to_string(),
            Value::Int(v) => v.to_string(),
            Value::UInt(v) => v.to_string(),
            Value::Double(v) => {
                if v.is_nan() {
                    "NULL".to_string()
                } else if v.is_infinite() {
                    if v.is_sign_positive() {
                        "1e308".to_string()
                    } else {
                        "-1e308".to_string()
                    }
                } else {
                    v.to_string()
                }
            }
            Value::Decimal(v) => v.to_string(),
            Value::Text(v) => escape_string(v),
            Value::Bytes(v) => escape_bytes(v),
            Value::Date(v) => format!("'{}'", v.format("%Y-%m-%d")),
            Value::DateTime(v) => format!("'{}'", v.format("%Y-%m-%d %H:%M:%S%.6f")),
            Value::Duration(v) => format!("'{}'", format_duration(*v)),
            Value::Set(members) => escape_string(&members.join(",")),
        }
    }
}

fn convert_err(field: &Field, message: String) -> Error {
    Error::Convert(ConvertError {
        message,
        column: Some(field.name.clone()),
        type_code: Some(field.type_code),
    })
}

fn cell_str<'a>(field: &Field, raw: &'a [u8]) -> Result<&'a str> {
    std::str::from_utf8(raw).map_err(|_| convert_err(field, "cell is not valid UTF-8".to_string()))
}

fn decode_int(field: &Field, text: &str) -> Result<Value> {
    if let Ok(v) = text.parse::<i64>() {
        return Ok(Value::Int(v));
    }
    text.parse::<u64>()
        .map(Value::UInt)
        .map_err(|_| convert_err(field, format!("invalid integer '{text}'")))
}

/// BIT cells arrive as raw big-endian bytes, not decimal text.
fn decode_bit(field: &Field, raw: &[u8]) -> Result<Value> {
    if raw.len() > 8 {
        return Err(convert_err(
            field,
            format!("BIT value of {} bytes exceeds 64 bits", raw.len()),
        ));
    }
    let mut v: u64 = 0;
    for b in raw {
        v = (v << 8) | u64::from(*b);
    }
    Ok(Value::UInt(v))
}

/// `YYYY-MM-DD` at fixed offsets; anything after offset 10 is ignored.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn decode_date(field: &Field, text: &str) -> Result<NaiveDate> {
    let year = fixed_field(field, text, 0..4)?;
    let month = fixed_field(field, text, 5..7)?;
    let day = fixed_field(field, text, 8..10)?;
    NaiveDate::from_ymd_opt(year as i32, month as u32, day as u32)
        .ok_or_else(|| convert_err(field, format!("invalid calendar date '{text}'")))
}

/// `[-]HH:MM:SS[.ffffff]`; the sign belongs to the whole duration and
/// the fraction digits are taken verbatim as a microsecond count.
fn decode_time(field: &Field, text: &str) -> Result<Value> {
    let (clock, frac) = match text.split_once('.') {
        Some((c, f)) => (c, Some(f)),
        None => (text, None),
    };
    let mut parts = clock.splitn(3, ':');
    let (Some(h), Some(m), Some(s)) = (parts.next(), parts.next(), parts.next()) else {
        return Err(convert_err(field, format!("invalid time '{text}'")));
    };
    let negative = h.starts_with('-');
    let hours = h
        .trim_start_matches('-')
        .parse::<i64>()
        .map_err(|_| convert_err(field, format!("invalid time '{text}'")))?;
    let minutes = m
        .parse::<i64>()
        .map_err(|_| convert_err(field, format!("invalid time '{text}'")))?;
    let seconds = s
        .parse::<i64>()
        .map_err(|_| convert_err(field, format!("invalid time '{text}'")))?;
    let micros = frac.map_or(Ok(0), |f| parse_fraction(field, f))?;

    let magnitude = ((hours * 60 + minutes) * 60 + seconds)
        .checked_mul(1_000_000)
        .and_then(|us| us.checked_add(micros))
        .ok_or_else(|| convert_err(field, format!("time '{text}' out of range")))?;
    let total = if negative { -magnitude } else { magnitude };
    Ok(Value::Duration(TimeDelta::microseconds(total)))
}

/// `YYYY-MM-DD HH:MM:SS[.ffffff]`, fixed offsets. Cells shorter than 11
/// bytes carry only a date.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn decode_datetime(field: &Field, text: &str) -> Result<Value> {
    if text.len() < 11 {
        return decode_date(field, text).map(Value::Date);
    }
    let (main, frac) = match text.split_once('.') {
        Some((m, f)) => (m, Some(f)),
        None => (text, None),
    };
    let date = decode_date(field, main)?;
    let hour = fixed_field(field, main, 11..13)?;
    let minute = fixed_field(field, main, 14..16)?;
    let second = fixed_field(field, main, 17..19)?;
    let micros = frac.map_or(Ok(0), |f| parse_fraction(field, f))?;
    #[allow(clippy::cast_possible_truncation)]
    let micros = u32::try_from(micros)
        .ok()
        .filter(|m| *m < 1_000_000)
        .ok_or_else(|| convert_err(field, format!("fraction out of range in '{text}'")))?;
    date.and_hms_micro_opt(hour as u32, minute as u32, second as u32, micros)
        .map(Value::DateTime)
        .ok_or_else(|| convert_err(field, format!("invalid time of day in '{text}'")))
}

/// The text protocol transmits a SET cell as its comma-joined member
/// names; an empty cell is the empty set.
fn decode_set(field: &Field, text: &str) -> Result<Value> {
    let _ = field;
    if text.is_empty() {
        return Ok(Value::Set(Vec::new()));
    }
    Ok(Value::Set(text.split(',').map(str::to_string).collect()))
}

fn fixed_field(field: &Field, text: &str, range: std::ops::Range<usize>) -> Result<i64> {
    text.get(range)
        .and_then(|s| s.parse::<i64>().ok())
        .ok_or_else(|| convert_err(field, format!("malformed temporal literal '{text}'")))
}

/// Fraction digits verbatim: `.5` is five microseconds, `.000123` is 123.
fn parse_fraction(field: &Field, frac: &str) -> Result<i64> {
    if frac.is_empty() {
        return Ok(0);
    }
    if !frac.bytes().all(|b| b.is_ascii_digit()) {
        return Err(convert_err(field, format!("invalid fraction '{frac}'")));
    }
    frac.parse::<i64>()
        .map_err(|_| convert_err(field, format!("invalid fraction '{frac}'")))
}

fn format_duration(d: TimeDelta) -> String {
    let micros = d
        .num_microseconds()
        .unwrap_or_else(|| d.num_milliseconds().saturating_mul(1000));
    let sign = if micros < 0 { "-" } else { "" };
    let magnitude = micros.unsigned_abs();
    let frac = magnitude % 1_000_000;
    let total_seconds = magnitude / 1_000_000;
    let (hours, minutes, seconds) = (
        total_seconds / 3600,
        total_seconds % 3600 / 60,
        total_seconds % 60,
    );
    format!("{sign}{hours:02}:{minutes:02}:{seconds:02}.{frac:06}")
}

fn escape_string(s: &str) -> String {
    let mut result = String::with_capacity(s.len() + 2);
    result.push('\'');
    for ch in s.chars() {
        match ch {
            '\'' => result.push_str("''"),
            '\\' => result.push_str("\\\\"),
            '\0' => result.push_str("\\0"),
            '\n' => result.push_str("\\n"),
            '\r' => result.push_str("\\r"),
            '\x1a' => result.push_str("\\Z"),
            _ => result.push(ch),
        }
    }
    result.push('\'');
    result
}

fn escape_bytes(data: &[u8]) -> String {
    let mut result = String::with_capacity(data.len() * 2 + 3);
    result.push_str("X'");
    for byte in data {
        result.push_str(&format!("{byte:02X}"));
    }
    result.push('\'');
    result
}
