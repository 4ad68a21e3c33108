//! Patient-to-donor column relations.

use serde::{Deserialize, Serialize};

/// Patient column name → donor column name.
///
/// Several patient columns may be fed by the same donor column. Entries keep
/// their configured order; lookups are exact first, then ASCII
/// case-insensitive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnRelationMap {
    entries: Vec<(String, String)>,
}

impl ColumnRelationMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Relate `target` to `source`, replacing an existing relation for `target`.
    pub fn insert(&mut self, target: impl Into<String>, source: impl Into<String>) {
        let (target, source) = (target.into(), source.into());
        match self.entries.iter_mut().find(|(t, _)| *t == target) {
            Some(entry) => entry.1 = source,
            None => self.entries.push((target, source)),
        }
    }

    /// Builder-style [`ColumnRelationMap::insert`].
    pub fn with(mut self, target: impl Into<String>, source: impl Into<String>) -> Self {
        self.insert(target, source);
        self
    }

    /// Donor column feeding `target`, if any.
    pub fn source_for(&self, target: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(t, _)| t == target)
            .or_else(|| self.entries.iter().find(|(t, _)| t.eq_ignore_ascii_case(target)))
            .map(|(_, s)| s.as_str())
    }

    /// Patient columns fed by `source`.
    pub fn targets_for<'a>(&'a self, source: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.entries
            .iter()
            .filter(move |(_, s)| s.eq_ignore_ascii_case(source))
            .map(|(t, _)| t.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(t, s)| (t.as_str(), s.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ColumnRelationMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (target, source) in iter {
            map.insert(target, source);
        }
        map
    }
}
