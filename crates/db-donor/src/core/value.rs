//! Donor values and patient literals.
//!
//! A [`SqlValue`] is what the donor database handed us; a [`Literal`] is the
//! text that goes into the patient INSERT statement.

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;

/// Value read from a donor row.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    /// SQL NULL.
    Null,

    /// Signed integer of any width.
    Int(i64),

    /// Unsigned integer that does not fit in `i64`.
    UInt(u64),

    /// FLOAT / DOUBLE.
    Float(f64),

    /// DECIMAL / NUMERIC.
    Decimal(Decimal),

    /// Character data.
    Text(String),

    /// Binary data.
    Bytes(Vec<u8>),

    /// DATE.
    Date(NaiveDate),

    /// TIME.
    Time(NaiveTime),

    /// DATETIME / TIMESTAMP.
    DateTime(NaiveDateTime),
}

impl SqlValue {
    /// Check if this value is NULL.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }

    /// Render the value as text, the way it would appear in a text column.
    ///
    /// Returns `None` for NULL.
    pub fn as_text(&self) -> Option<Cow<'_, str>> {
        let text = match self {
            SqlValue::Null => return None,
            SqlValue::Text(s) => Cow::Borrowed(s.as_str()),
            SqlValue::Int(v) => Cow::Owned(v.to_string()),
            SqlValue::UInt(v) => Cow::Owned(v.to_string()),
            SqlValue::Float(v) => Cow::Owned(v.to_string()),
            SqlValue::Decimal(v) => Cow::Owned(v.to_string()),
            SqlValue::Bytes(b) => String::from_utf8_lossy(b),
            SqlValue::Date(d) => Cow::Owned(d.format("%Y-%m-%d").to_string()),
            SqlValue::Time(t) => Cow::Owned(t.format("%H:%M:%S").to_string()),
            SqlValue::DateTime(dt) => Cow::Owned(dt.format("%Y-%m-%d %H:%M:%S").to_string()),
        };
        Some(text)
    }

    /// Interpret the value as an exact decimal number.
    ///
    /// Text is accepted when it is a plain or scientific-notation number with
    /// optional surrounding whitespace. Floats that are not finite or exceed
    /// the decimal range yield `None`; use [`SqlValue::as_f64`] to tell those
    /// apart from non-numeric input.
    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            SqlValue::Int(v) => Some(Decimal::from(*v)),
            SqlValue::UInt(v) => Some(Decimal::from(*v)),
            SqlValue::Decimal(v) => Some(*v),
            SqlValue::Float(v) => Decimal::from_f64(*v),
            SqlValue::Text(s) => parse_decimal(s),
            _ => None,
        }
    }

    /// Interpret the value as a float, for numbers beyond the decimal range.
    pub fn as_f64(&self) -> Option<f64> {
        let v = match self {
            SqlValue::Int(v) => *v as f64,
            SqlValue::UInt(v) => *v as f64,
            SqlValue::Float(v) => *v,
            SqlValue::Decimal(v) => return rust_decimal::prelude::ToPrimitive::to_f64(v),
            SqlValue::Text(s) => s.trim().parse::<f64>().ok()?,
            _ => return None,
        };
        v.is_finite().then_some(v)
    }
}

fn parse_decimal(text: &str) -> Option<Decimal> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    Decimal::from_str(text)
        .ok()
        .or_else(|| Decimal::from_scientific(text).ok())
}

impl fmt::Display for SqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.as_text() {
            Some(text) => f.write_str(&text),
            None => f.write_str("NULL"),
        }
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        SqlValue::Text(v.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        SqlValue::Text(v)
    }
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        SqlValue::Int(v)
    }
}

impl From<f64> for SqlValue {
    fn from(v: f64) -> Self {
        SqlValue::Float(v)
    }
}

impl From<Decimal> for SqlValue {
    fn from(v: Decimal) -> Self {
        SqlValue::Decimal(v)
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(SqlValue::Null, Into::into)
    }
}

/// A donor row: column name to value, in select order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    values: Vec<(String, SqlValue)>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a column value.
    pub fn push(&mut self, column: impl Into<String>, value: SqlValue) {
        self.values.push((column.into(), value));
    }

    /// Builder-style [`Row::push`].
    pub fn with(mut self, column: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        self.push(column, value.into());
        self
    }

    /// Look up a value by column name, exact match first, then ignoring case.
    pub fn get(&self, column: &str) -> Option<&SqlValue> {
        self.values
            .iter()
            .find(|(name, _)| name == column)
            .or_else(|| {
                self.values
                    .iter()
                    .find(|(name, _)| name.eq_ignore_ascii_case(column))
            })
            .map(|(_, value)| value)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SqlValue)> {
        self.values.iter().map(|(name, value)| (name.as_str(), value))
    }
}

impl<K: Into<String>> FromIterator<(K, SqlValue)> for Row {
    fn from_iter<I: IntoIterator<Item = (K, SqlValue)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

/// A value formatted for the patient INSERT statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Literal {
    /// `NULL`.
    Null,

    /// Text, rendered inside single quotes with quotes and backslashes escaped.
    Quoted(String),

    /// Numeric text, rendered as is.
    Bare(String),
}

impl Literal {
    pub fn quoted(text: impl Into<String>) -> Self {
        Literal::Quoted(text.into())
    }

    pub fn bare(text: impl ToString) -> Self {
        Literal::Bare(text.to_string())
    }

    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Literal::Null)
    }

    /// Unquoted content of the literal (`None` for NULL).
    pub fn content(&self) -> Option<&str> {
        match self {
            Literal::Null => None,
            Literal::Quoted(s) | Literal::Bare(s) => Some(s),
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Null => f.write_str("NULL"),
            Literal::Bare(s) => f.write_str(s),
            Literal::Quoted(s) => {
                write!(f, "'{}'", s.replace('\\', "\\\\").replace('\'', "''"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_text_is_decimal() {
        assert_eq!(
            SqlValue::from(" 123.45678 ").as_decimal(),
            Some(Decimal::from_str("123.45678").unwrap())
        );
        assert_eq!(
            SqlValue::from("1.5e3").as_decimal(),
            Some(Decimal::from(1500))
        );
        assert_eq!(SqlValue::from("12abc").as_decimal(), None);
        assert_eq!(SqlValue::from("").as_decimal(), None);
        assert_eq!(SqlValue::Null.as_decimal(), None);
    }

    #[test]
    fn test_huge_float_only_as_f64() {
        let v = SqlValue::Float(1e300);
        assert_eq!(v.as_decimal(), None);
        assert_eq!(v.as_f64(), Some(1e300));
        assert_eq!(SqlValue::Float(f64::NAN).as_f64(), None);
    }

    #[test]
    fn test_as_text_formats_temporal_values() {
        let dt = NaiveDate::from_ymd_opt(2024, 3, 9)
            .unwrap()
            .and_hms_opt(7, 5, 0)
            .unwrap();
        assert_eq!(
            SqlValue::DateTime(dt).as_text().unwrap(),
            "2024-03-09 07:05:00"
        );
        assert_eq!(SqlValue::Int(-4).to_string(), "-4");
        assert_eq!(SqlValue::Null.to_string(), "NULL");
    }

    #[test]
    fn test_row_lookup_ignores_case() {
        let row = Row::new().with("F_POHT", "1.5").with("name", SqlValue::Null);
        assert_eq!(row.get("f_poht"), Some(&SqlValue::from("1.5")));
        assert_eq!(row.get("name"), Some(&SqlValue::Null));
        assert_eq!(row.get("missing"), None);
        assert_eq!(row.len(), 2);
    }

    #[test]
    fn test_literal_rendering_escapes_quotes() {
        assert_eq!(Literal::Null.to_string(), "NULL");
        assert_eq!(Literal::bare(42).to_string(), "42");
        assert_eq!(Literal::quoted("O'Hara").to_string(), "'O''Hara'");
        assert_eq!(Literal::quoted(r"C:\tmp").to_string(), r"'C:\\tmp'");
        assert_eq!(Literal::quoted("x").content(), Some("x"));
    }
}
