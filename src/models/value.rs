//! Typed cell values for tabular datasets

use chrono::{NaiveDate, NaiveDateTime};
use std::fmt;

/// Date format used for date cells in CSV text
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Timestamp format used when rendering timestamp cells
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// Accepted timestamp layouts when parsing CSV text
const TIMESTAMP_LAYOUTS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

/// A single cell in a [`TabularDataset`](super::TabularDataset)
///
/// Cells read from delimited text stay [`Value::Raw`] so they are written
/// back byte for byte; [`Value::parse`] types them on demand. Database
/// queries produce the typed variants directly.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Missing value (empty field or SQL NULL)
    Null,
    /// Boolean value
    Bool(bool),
    /// 64-bit signed integer
    Int(i64),
    /// Finite double precision float
    Float(f64),
    /// Calendar date
    Date(NaiveDate),
    /// Date and time without time zone
    Timestamp(NaiveDateTime),
    /// Anything else
    Text(String),
    /// Untyped field text exactly as read from delimited input
    Raw(String),
}

impl Value {
    /// Keep a delimited-text field untouched; only the empty field is `Null`
    pub fn raw(field: &str) -> Self {
        if field.is_empty() {
            Value::Null
        } else {
            Value::Raw(field.to_string())
        }
    }

    /// Parse a delimited-text field into the narrowest matching value
    ///
    /// Empty fields become [`Value::Null`]. Non-finite float spellings such
    /// as `NaN` or `inf` stay text so they never widen a numeric column.
    pub fn parse(field: &str) -> Self {
        let trimmed = field.trim();
        if trimmed.is_empty() {
            return Value::Null;
        }

        match trimmed {
            "true" | "True" | "TRUE" => return Value::Bool(true),
            "false" | "False" | "FALSE" => return Value::Bool(false),
            _ => {}
        }

        if let Ok(i) = trimmed.parse::<i64>() {
            return Value::Int(i);
        }

        if trimmed.bytes().any(|b| b.is_ascii_digit())
            && let Ok(f) = trimmed.parse::<f64>()
            && f.is_finite()
        {
            return Value::Float(f);
        }

        if let Ok(d) = NaiveDate::parse_from_str(trimmed, DATE_FORMAT) {
            return Value::Date(d);
        }

        for layout in TIMESTAMP_LAYOUTS {
            if let Ok(ts) = NaiveDateTime::parse_from_str(trimmed, layout) {
                return Value::Timestamp(ts);
            }
        }

        Value::Text(field.to_string())
    }

    /// Whether this is [`Value::Null`]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Interpret the value as an integer identifier
    ///
    /// Integral floats are accepted because numeric id columns with nulls
    /// are sometimes stored as floating point upstream.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::Float(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => Some(*f as i64),
            Value::Text(s) | Value::Raw(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Render the value as a CSV field (`Null` renders as an empty field)
    pub fn to_field(&self) -> String {
        match self {
            Value::Null => String::new(),
            other => other.to_string(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            // Debug keeps the trailing ".0" so integral floats stay floats on re-read
            Value::Float(x) => write!(f, "{:?}", x),
            Value::Date(d) => write!(f, "{}", d.format(DATE_FORMAT)),
            Value::Timestamp(ts) => write!(f, "{}", ts.format(TIMESTAMP_FORMAT)),
            Value::Text(s) | Value::Raw(s) => write!(f, "{}", s),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}
