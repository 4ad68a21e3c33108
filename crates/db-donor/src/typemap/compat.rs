//! Type compatibility between a patient column and the donor column feeding it.

use super::catalog::{strip_brackets, SemanticSubtype, TypeCatalog};

/// Decides whether values of one column type may be cast into another.
///
/// Pure: the decision depends only on the two type strings and the lossy
/// flag, never on data.
#[derive(Debug, Clone, Copy, Default)]
pub struct CompatibilityChecker {
    catalog: TypeCatalog,
}

impl CompatibilityChecker {
    pub fn new(catalog: TypeCatalog) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> TypeCatalog {
        self.catalog
    }

    /// Check whether a `source_type` value can be cast into `target_type`.
    ///
    /// `allow_lossy` unlocks the pairs that always lose information
    /// (integer ⇄ fractional, TIME ⇄ YEAR).
    pub fn check(&self, target_type: &str, source_type: &str, allow_lossy: bool) -> bool {
        if target_type.eq_ignore_ascii_case(source_type) {
            return true;
        }

        let target = self.catalog.classify(target_type);
        let source = self.catalog.classify(source_type);

        if target != source {
            return match (target, source) {
                // anything can be written as text
                (SemanticSubtype::String, _) => true,
                (SemanticSubtype::Numeric, SemanticSubtype::Float)
                | (SemanticSubtype::Float, SemanticSubtype::Numeric) => allow_lossy,
                (SemanticSubtype::Unknown, _) | (_, SemanticSubtype::Unknown) => false,
                _ => true,
            };
        }

        if target == SemanticSubtype::Unknown {
            return false;
        }

        if is_datetime_pair(target_type, source_type) {
            return true;
        }

        if is_time_year_pair(target_type, source_type) {
            return allow_lossy;
        }

        true
    }
}

/// DATETIME and TIMESTAMP hold the same values and are treated as identical.
pub fn is_datetime_pair(a: &str, b: &str) -> bool {
    let (a, b) = (strip_brackets(a), strip_brackets(b));
    matches!(
        (a.as_str(), b.as_str()),
        ("DATETIME", "TIMESTAMP") | ("TIMESTAMP", "DATETIME")
    )
}

fn is_time_year_pair(a: &str, b: &str) -> bool {
    let (a, b) = (strip_brackets(a), strip_brackets(b));
    matches!((a.as_str(), b.as_str()), ("TIME", "YEAR") | ("YEAR", "TIME"))
}
