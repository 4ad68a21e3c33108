//! Classification of MySQL column type strings.
//!
//! A raw type such as `decimal(7,4) unsigned` is reduced to a
//! [`SemanticSubtype`] plus the structural parameters the caster needs:
//! maximum length, integer range, decimal precision or date format.

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Coarse family a column type belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SemanticSubtype {
    String,
    Numeric,
    Float,
    Date,
    Unknown,
}

impl SemanticSubtype {
    /// Uppercase name, also used as the last-resort key of the defaults table.
    pub fn as_str(&self) -> &'static str {
        match self {
            SemanticSubtype::String => "STRING",
            SemanticSubtype::Numeric => "NUMERIC",
            SemanticSubtype::Float => "FLOAT",
            SemanticSubtype::Date => "DATE",
            SemanticSubtype::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for SemanticSubtype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered keyword table. The scan is a substring match and the first hit
/// wins, so `DATETIME` lands on `DATE` and `TINYTEXT` on `TEXT`, which is
/// harmless because both resolve to the same subtype.
const MYSQL_TYPES: &[(&str, SemanticSubtype)] = &[
    ("CHAR", SemanticSubtype::String),
    ("VARCHAR", SemanticSubtype::String),
    ("TEXT", SemanticSubtype::String),
    ("TINYTEXT", SemanticSubtype::String),
    ("MEDIUMTEXT", SemanticSubtype::String),
    ("LONGTEXT", SemanticSubtype::String),
    ("DATE", SemanticSubtype::Date),
    ("TIME", SemanticSubtype::Date),
    ("DATETIME", SemanticSubtype::Date),
    ("TIMESTAMP", SemanticSubtype::Date),
    ("YEAR", SemanticSubtype::Date),
    ("TINYINT", SemanticSubtype::Numeric),
    ("SMALLINT", SemanticSubtype::Numeric),
    ("MEDIUMINT", SemanticSubtype::Numeric),
    ("INT", SemanticSubtype::Numeric),
    ("BIGINT", SemanticSubtype::Numeric),
    ("DECIMAL", SemanticSubtype::Float),
    ("FLOAT", SemanticSubtype::Float),
    ("DOUBLE", SemanticSubtype::Float),
    ("NUMERIC", SemanticSubtype::Float),
];

/// Maps raw type strings to subtypes and type parameters.
///
/// The catalog is an explicit value rather than global state so callers can
/// hold several (or swap the table) without interfering with each other.
#[derive(Debug, Clone, Copy)]
pub struct TypeCatalog {
    entries: &'static [(&'static str, SemanticSubtype)],
}

impl Default for TypeCatalog {
    fn default() -> Self {
        Self::mysql()
    }
}

impl TypeCatalog {
    /// Catalog for MySQL/MariaDB type names.
    pub fn mysql() -> Self {
        Self {
            entries: MYSQL_TYPES,
        }
    }

    /// Classify a raw type string. Case-insensitive; unmatched types are
    /// [`SemanticSubtype::Unknown`].
    pub fn classify(&self, raw_type: &str) -> SemanticSubtype {
        let upper = raw_type.to_uppercase();
        self.entries
            .iter()
            .find(|(keyword, _)| upper.contains(keyword))
            .map(|(_, subtype)| *subtype)
            .unwrap_or(SemanticSubtype::Unknown)
    }

    /// Check whether two raw types fall into the same subtype.
    pub fn same_subtype(&self, a: &str, b: &str) -> bool {
        self.classify(a) == self.classify(b)
    }

    /// Derive the structural parameters of a raw type.
    pub fn parameters(&self, raw_type: &str) -> TypeParameters {
        match self.classify(raw_type) {
            SemanticSubtype::String => TypeParameters::String {
                max_chars: string_params(raw_type),
            },
            SemanticSubtype::Numeric => match numeric_params(raw_type) {
                Some(range) => TypeParameters::Numeric(range),
                None => TypeParameters::Unknown,
            },
            SemanticSubtype::Float => TypeParameters::Float(decimal_params(raw_type)),
            SemanticSubtype::Date => TypeParameters::Date(date_kind(raw_type)),
            SemanticSubtype::Unknown => TypeParameters::Unknown,
        }
    }
}

/// Parameters derived from a raw type, per subtype.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeParameters {
    String { max_chars: u64 },
    Numeric(IntegerRange),
    Float(DecimalSpec),
    Date(DateKind),
    Unknown,
}

/// Raw type with every parenthesized group removed, trimmed and uppercased:
/// `decimal(7,4) unsigned` becomes `DECIMAL UNSIGNED`.
pub fn strip_brackets(raw_type: &str) -> String {
    let mut out = String::with_capacity(raw_type.len());
    let mut depth = 0usize;
    for c in raw_type.chars() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            _ if depth == 0 => out.push(c),
            _ => {}
        }
    }
    out.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_uppercase()
}

/// First keyword of the bracket-stripped type: `int unsigned` → `INT`.
pub fn type_keyword(raw_type: &str) -> String {
    strip_brackets(raw_type)
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .to_string()
}

/// Text between the first `(` and the following `)`, if any.
fn parenthesized(raw_type: &str) -> Option<&str> {
    let start = raw_type.find('(')? + 1;
    let len = raw_type[start..].find(')')?;
    Some(&raw_type[start..start + len])
}

/// Maximum number of characters a string column holds.
///
/// CHAR/VARCHAR read the declared length (0 when none is declared); each TEXT
/// keyword maps to its own MySQL limit.
pub fn string_params(raw_type: &str) -> u64 {
    let upper = raw_type.to_uppercase();
    if upper.contains("CHAR") {
        return parenthesized(raw_type)
            .and_then(|len| len.trim().parse().ok())
            .unwrap_or(0);
    }

    if upper.contains("TINYTEXT") {
        255
    } else if upper.contains("MEDIUMTEXT") {
        16_777_215
    } else if upper.contains("LONGTEXT") {
        // 2^32 - 1 characters, the real LONGTEXT limit
        4_294_967_295
    } else if upper.contains("TEXT") {
        65_535
    } else {
        0
    }
}

/// MySQL integer storage kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntegerKind {
    TinyInt,
    SmallInt,
    MediumInt,
    Int,
    BigInt,
}

impl IntegerKind {
    /// Detection order. BIGINT is tested before INT, which it contains.
    const DETECTION_ORDER: [(&'static str, IntegerKind); 5] = [
        ("TINYINT", IntegerKind::TinyInt),
        ("SMALLINT", IntegerKind::SmallInt),
        ("MEDIUMINT", IntegerKind::MediumInt),
        ("BIGINT", IntegerKind::BigInt),
        ("INT", IntegerKind::Int),
    ];

    /// Find the integer kind named in a raw type.
    pub fn detect(raw_type: &str) -> Option<Self> {
        let upper = raw_type.to_uppercase();
        Self::DETECTION_ORDER
            .iter()
            .find(|(keyword, _)| upper.contains(keyword))
            .map(|(_, kind)| *kind)
    }

    fn signed_bounds(&self) -> (i64, i64) {
        match self {
            IntegerKind::TinyInt => (-128, 127),
            IntegerKind::SmallInt => (-32_768, 32_767),
            IntegerKind::MediumInt => (-8_388_608, 8_388_607),
            IntegerKind::Int => (-2_147_483_648, 2_147_483_647),
            IntegerKind::BigInt => (i64::MIN, i64::MAX),
        }
    }
}

/// Accepted range of an integer column.
///
/// Unsigned columns carry only a maximum, which is the signed maximum of the
/// storage kind; the lower bound is zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntegerRange {
    Signed { min: i64, max: i64 },
    Unsigned { max: i64 },
}

impl IntegerRange {
    pub fn min(&self) -> i64 {
        match self {
            IntegerRange::Signed { min, .. } => *min,
            IntegerRange::Unsigned { .. } => 0,
        }
    }

    pub fn max(&self) -> i64 {
        match self {
            IntegerRange::Signed { max, .. } | IntegerRange::Unsigned { max } => *max,
        }
    }

    pub fn contains(&self, value: Decimal) -> bool {
        Decimal::from(self.min()) <= value && value <= Decimal::from(self.max())
    }
}

/// Range of an integer column, or `None` when the type names no integer kind.
pub fn numeric_params(raw_type: &str) -> Option<IntegerRange> {
    let kind = IntegerKind::detect(raw_type)?;
    let (min, max) = kind.signed_bounds();
    if raw_type.to_uppercase().contains("UNSIGNED") {
        Some(IntegerRange::Unsigned { max })
    } else {
        Some(IntegerRange::Signed { min, max })
    }
}

/// Storage kind of a fractional column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecimalKind {
    Double,
    Float,
    Decimal,
}

/// Declared `(total, scale)` precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Precision {
    pub total: u32,
    pub scale: u32,
}

/// MySQL's limits for DECIMAL(M,D); wider declarations are capped.
const MAX_PRECISION: u32 = 65;
const MAX_SCALE: u32 = 30;

/// Scale used for rounding when a fractional type declares no precision.
pub const DEFAULT_SCALE: u32 = 10;

/// Most integer digits a DECIMAL without declared precision holds.
const DEFAULT_DECIMAL_DIGITS: usize = 10;

/// Parameters of a DECIMAL / NUMERIC / FLOAT / DOUBLE column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecimalSpec {
    pub kind: DecimalKind,
    pub unsigned: bool,
    pub precision: Option<Precision>,
}

impl DecimalSpec {
    /// Number of fractional digits values are rounded to.
    pub fn scale(&self) -> u32 {
        self.precision.map_or(DEFAULT_SCALE, |p| p.scale)
    }

    /// Largest representable value as digit text: `(7,4)` gives `999.9999`.
    fn bound_text(&self) -> Option<String> {
        let (integer_digits, scale) = match self.precision {
            Some(p) => (p.total.saturating_sub(p.scale) as usize, p.scale as usize),
            None if self.kind == DecimalKind::Decimal => (DEFAULT_DECIMAL_DIGITS, 0),
            None => return None,
        };
        let integer = if integer_digits == 0 {
            "0".to_string()
        } else {
            "9".repeat(integer_digits)
        };
        if scale == 0 {
            Some(integer)
        } else {
            Some(format!("{}.{}", integer, "9".repeat(scale)))
        }
    }

    /// Exact upper bound, when it fits in a [`Decimal`].
    ///
    /// `None` means either "no declared limit" (FLOAT/DOUBLE without
    /// precision) or a precision wider than `Decimal` can hold; use
    /// [`DecimalSpec::float_bound`] then.
    pub fn bound(&self) -> Option<Decimal> {
        let text = self.bound_text()?;
        if text.replace('.', "").len() > 28 {
            return None;
        }
        Decimal::from_str(&text).ok()
    }

    /// Upper bound as a float; the natural limit of the storage kind when no
    /// precision is declared.
    pub fn float_bound(&self) -> f64 {
        match self.bound_text() {
            Some(text) => text.parse().unwrap_or(f64::MAX),
            None if self.kind == DecimalKind::Float => f32::MAX as f64,
            None => f64::MAX,
        }
    }

    /// Lower bound as a float: zero for unsigned, the negated bound otherwise.
    pub fn float_lower_bound(&self) -> f64 {
        if self.unsigned {
            0.0
        } else {
            -self.float_bound()
        }
    }
}

/// Parse the kind, signedness and precision of a fractional type.
pub fn decimal_params(raw_type: &str) -> DecimalSpec {
    let upper = raw_type.to_uppercase();
    let kind = if upper.contains("DOUBLE") {
        DecimalKind::Double
    } else if upper.contains("FLOAT") {
        DecimalKind::Float
    } else {
        DecimalKind::Decimal
    };

    let precision = parenthesized(raw_type).and_then(|inner| {
        let mut parts = inner.split(',').map(str::trim);
        let total: u32 = parts.next()?.parse().ok()?;
        let scale: u32 = match parts.next() {
            Some(scale) => scale.parse().ok()?,
            None => 0,
        };
        Some(Precision {
            total: total.min(MAX_PRECISION),
            scale: scale.min(MAX_SCALE),
        })
    });

    DecimalSpec {
        kind,
        unsigned: upper.contains("UNSIGNED"),
        precision,
    }
}

/// Output shape of a temporal column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateKind {
    Date,
    Time,
    Year,
    DateTime,
}

impl DateKind {
    /// chrono format string for literals of this kind.
    pub fn format(&self) -> &'static str {
        match self {
            DateKind::Date => "%Y-%m-%d",
            DateKind::Time => "%H:%M:%S",
            DateKind::Year => "%Y",
            DateKind::DateTime => "%Y-%m-%d %H:%M:%S",
        }
    }
}

/// Date format selector: DATE, TIME and YEAR by name, everything else
/// (DATETIME, TIMESTAMP) as a full datetime.
pub fn date_kind(raw_type: &str) -> DateKind {
    match type_keyword(raw_type).as_str() {
        "DATE" => DateKind::Date,
        "TIME" => DateKind::Time,
        "YEAR" => DateKind::Year,
        _ => DateKind::DateTime,
    }
}
