//! Enumerations: named, user-facing configuration choices.

use serde::Serialize;

/// A configuration choice with a fixed, ordered set of legal values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Enumeration {
    /// Identifier, unique within the visible scope chain.
    pub id: String,
    /// Human-readable title.
    pub title: String,
    /// Declared default value, if any. Always one of `values`.
    pub default: Option<String>,
    /// Legal values with their labels, in declaration order.
    pub values: Vec<(String, String)>,
}

impl Enumeration {
    /// Returns `true` if `value` is one of the declared values.
    pub fn contains(&self, value: &str) -> bool {
        self.values.iter().any(|(v, _)| v == value)
    }

    /// Returns the label for `value`.
    pub fn label(&self, value: &str) -> Option<&str> {
        self.values
            .iter()
            .find(|(v, _)| v == value)
            .map(|(_, label)| label.as_str())
    }

    /// The value used when neither an override nor a persisted choice applies:
    /// the declared default, else the first declared value.
    pub fn fallback_value(&self) -> Option<&str> {
        self.default
            .as_deref()
            .or_else(|| self.values.first().map(|(v, _)| v.as_str()))
    }
}

/// Returns `true` if `s` is non-empty and consists only of ASCII letters,
/// digits, `_` and `-`.
///
/// Target names, enumeration ids and enumeration values share this alphabet.
pub fn is_identifier(s: &str) -> bool {
    !s.is_empty()
        && s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}
