//! Casting policy and the table of fallback values.

use std::collections::HashMap;
use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::typemap::{strip_brackets, type_keyword, SemanticSubtype};

/// A configured fallback value: a number or a piece of text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DefaultValue {
    Int(i64),
    Float(f64),
    Text(String),
}

impl fmt::Display for DefaultValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefaultValue::Int(v) => write!(f, "{}", v),
            DefaultValue::Float(v) => write!(f, "{}", v),
            DefaultValue::Text(v) => f.write_str(v),
        }
    }
}

impl From<i64> for DefaultValue {
    fn from(v: i64) -> Self {
        DefaultValue::Int(v)
    }
}

impl From<f64> for DefaultValue {
    fn from(v: f64) -> Self {
        DefaultValue::Float(v)
    }
}

impl From<&str> for DefaultValue {
    fn from(v: &str) -> Self {
        DefaultValue::Text(v.to_string())
    }
}

/// Fallback values keyed by uppercase type name or subtype name.
///
/// `reference_time` is the instant the configuration was loaded. Date
/// columns without a configured fallback use it, so casting never reads the
/// clock and two runs over the same input produce the same literals.
#[derive(Debug, Clone, PartialEq)]
pub struct DefaultValueTable {
    values: HashMap<String, DefaultValue>,
    reference_time: NaiveDateTime,
}

impl DefaultValueTable {
    pub fn new(reference_time: NaiveDateTime) -> Self {
        Self {
            values: HashMap::new(),
            reference_time,
        }
    }

    /// Build from configured entries; keys are normalized to uppercase.
    pub fn from_entries<I, K>(entries: I, reference_time: NaiveDateTime) -> Self
    where
        I: IntoIterator<Item = (K, DefaultValue)>,
        K: AsRef<str>,
    {
        let mut table = Self::new(reference_time);
        for (key, value) in entries {
            table.insert(key.as_ref(), value);
        }
        table
    }

    pub fn insert(&mut self, key: &str, value: DefaultValue) {
        self.values.insert(key.trim().to_uppercase(), value);
    }

    /// Builder-style [`DefaultValueTable::insert`].
    pub fn with(mut self, key: &str, value: impl Into<DefaultValue>) -> Self {
        self.insert(key, value.into());
        self
    }

    pub fn reference_time(&self) -> NaiveDateTime {
        self.reference_time
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Find the fallback for a column type.
    ///
    /// Tried in order: bracket-stripped type (`INT UNSIGNED`), the full raw
    /// type (`INT(10) UNSIGNED`), the first keyword (`INT`), then the
    /// subtype name (`NUMERIC`).
    pub fn lookup(&self, raw_type: &str, subtype: SemanticSubtype) -> Option<&DefaultValue> {
        let keys = [
            strip_brackets(raw_type),
            raw_type.trim().to_uppercase(),
            type_keyword(raw_type),
            subtype.as_str().to_string(),
        ];
        keys.iter()
            .filter(|key| !key.is_empty())
            .find_map(|key| self.values.get(key))
    }
}

/// Flags that decide how far the engine may go to make a value fit.
#[derive(Debug, Clone, PartialEq)]
pub struct CastPolicy {
    /// Abort the whole run on the first value or insert failure.
    pub stop_on_failure: bool,

    /// Allow columns whose types differ at all (`transform_types`).
    pub allow_type_transform: bool,

    /// Allow lossy fixes: truncation, clamping, integer/fraction and
    /// TIME/YEAR casts, date fallbacks (`transform_all`).
    pub allow_lossy_transform: bool,

    /// Replace donor NULLs headed for NOT NULL columns with defaults
    /// (`default_null_values`).
    pub default_on_null: bool,

    /// Leave AUTO_INCREMENT patient columns out of the INSERT (`auto_increment`).
    pub skip_auto_increment: bool,

    /// Fallback values.
    pub defaults: DefaultValueTable,
}

impl CastPolicy {
    /// Policy with the stock settings: keep going on failure, skip
    /// auto-increment columns, transform types, no lossy casts, default NULLs.
    pub fn new(defaults: DefaultValueTable) -> Self {
        Self {
            stop_on_failure: false,
            allow_type_transform: true,
            allow_lossy_transform: false,
            default_on_null: true,
            skip_auto_increment: true,
            defaults,
        }
    }

    /// Same policy with lossy transforms switched on or off.
    pub fn with_lossy(mut self, allow: bool) -> Self {
        self.allow_lossy_transform = allow;
        self
    }
}
