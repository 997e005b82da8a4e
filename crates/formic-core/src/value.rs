//! Form Values
//!
//! Dynamically shaped value tree. Fields are untyped at the engine level
//! (any path can hold any value); compile-time typing is a consumer concern
//! layered on top.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::path::{Path, Segment};

/// A form value: a scalar, a list, or a record of named values.
///
/// Compared by value, never by identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FormValue {
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
    List(Vec<FormValue>),
    Record(BTreeMap<String, FormValue>),
}

impl FormValue {
    /// Empty record
    pub fn record() -> Self {
        FormValue::Record(BTreeMap::new())
    }

    /// Empty in the `required`-rule sense: null, empty text, or an empty
    /// collection. `false` and `0` are present values.
    pub fn is_empty(&self) -> bool {
        match self {
            FormValue::Null => true,
            FormValue::Text(t) => t.is_empty(),
            FormValue::List(items) => items.is_empty(),
            FormValue::Record(fields) => fields.is_empty(),
            FormValue::Bool(_) | FormValue::Number(_) => false,
        }
    }

    /// True for values that carry no children
    pub fn is_leaf(&self) -> bool {
        !matches!(self, FormValue::List(_) | FormValue::Record(_))
    }

    #[inline]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FormValue::Text(t) => Some(t),
            _ => None,
        }
    }

    #[inline]
    pub fn as_number(&self) -> Option<f64> {
        match self {
            FormValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    #[inline]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FormValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Navigate to the value at `path`, if present
    pub fn get_path(&self, path: &Path) -> Option<&FormValue> {
        let mut current = self;
        for segment in path.segments() {
            current = match (segment, current) {
                (Segment::Key(k), FormValue::Record(fields)) => fields.get(k.as_ref())?,
                (Segment::Index(i), FormValue::List(items)) => items.get(*i as usize)?,
                _ => return None,
            };
        }
        Some(current)
    }

    /// Write `value` at `path`, creating intermediate records and lists as
    /// the segment kinds dictate. List slots below the target index are
    /// padded with `Null`.
    pub fn set_path(&mut self, path: &Path, value: FormValue) {
        let segments = path.segments();
        if segments.is_empty() {
            // Empty path: replace self
            *self = value;
            return;
        }
        let mut current = self;
        for (pos, segment) in segments.iter().enumerate() {
            let last = pos + 1 == segments.len();
            match segment {
                Segment::Key(k) => {
                    if !matches!(current, FormValue::Record(_)) {
                        *current = FormValue::record();
                    }
                    let FormValue::Record(fields) = current else {
                        unreachable!()
                    };
                    let slot = fields.entry(k.to_string()).or_insert(FormValue::Null);
                    if last {
                        *slot = value;
                        return;
                    }
                    current = slot;
                }
                Segment::Index(i) => {
                    if !matches!(current, FormValue::List(_)) {
                        *current = FormValue::List(Vec::new());
                    }
                    let FormValue::List(items) = current else {
                        unreachable!()
                    };
                    let i = *i as usize;
                    while items.len() <= i {
                        items.push(FormValue::Null);
                    }
                    if last {
                        items[i] = value;
                        return;
                    }
                    current = &mut items[i];
                }
            }
        }
        unreachable!("loop over non-empty segments always returns")
    }

    /// Enumerate the leaf paths and values of this tree, rooted at `base`.
    /// Empty lists and records are themselves reported as leaves so their
    /// presence survives a round-trip.
    pub fn leaves(&self, base: &Path) -> Vec<(Path, FormValue)> {
        let mut out = Vec::new();
        collect_leaves(self, base.clone(), &mut out);
        out
    }

    /// Leaves of a whole-form record, each top-level key its own root
    pub fn top_level_leaves(&self) -> Vec<(Path, FormValue)> {
        let mut out = Vec::new();
        match self {
            FormValue::Record(fields) => {
                for (name, value) in fields {
                    collect_leaves(value, Path::key(name), &mut out);
                }
            }
            other => {
                // A scalar whole-form default is meaningless; report nothing
                debug_assert!(
                    matches!(other, FormValue::Null),
                    "whole-form defaults must be a record"
                );
            }
        }
        out
    }
}

fn collect_leaves(value: &FormValue, base: Path, out: &mut Vec<(Path, FormValue)>) {
    match value {
        FormValue::Record(fields) if !fields.is_empty() => {
            for (name, child) in fields {
                collect_leaves(child, base.join(name), out);
            }
        }
        FormValue::List(items) if !items.is_empty() => {
            for (i, child) in items.iter().enumerate() {
                collect_leaves(child, base.index(i as u32), out);
            }
        }
        leaf => out.push((base, leaf.clone())),
    }
}

impl Default for FormValue {
    fn default() -> Self {
        FormValue::Null
    }
}

impl From<&str> for FormValue {
    fn from(value: &str) -> Self {
        FormValue::Text(value.to_string())
    }
}

impl From<String> for FormValue {
    fn from(value: String) -> Self {
        FormValue::Text(value)
    }
}

impl From<f64> for FormValue {
    fn from(value: f64) -> Self {
        FormValue::Number(value)
    }
}

impl From<i64> for FormValue {
    fn from(value: i64) -> Self {
        FormValue::Number(value as f64)
    }
}

impl From<bool> for FormValue {
    fn from(value: bool) -> Self {
        FormValue::Bool(value)
    }
}

impl From<Vec<FormValue>> for FormValue {
    fn from(items: Vec<FormValue>) -> Self {
        FormValue::List(items)
    }
}

impl<const N: usize> From<[(&str, FormValue); N]> for FormValue {
    fn from(entries: [(&str, FormValue); N]) -> Self {
        FormValue::Record(
            entries
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> FormValue {
        FormValue::from([
            ("username", FormValue::from("Batman")),
            (
                "social",
                FormValue::from([
                    ("twitter", FormValue::from("")),
                    ("facebook", FormValue::from("")),
                ]),
            ),
            (
                "phNumbers",
                FormValue::List(vec![FormValue::from([(
                    "number",
                    FormValue::from("555"),
                )])]),
            ),
        ])
    }

    #[test]
    fn test_get_path() {
        let value = sample();
        let path = Path::parse("phNumbers.0.number").unwrap();
        assert_eq!(value.get_path(&path), Some(&FormValue::from("555")));
        assert_eq!(value.get_path(&Path::parse("phNumbers.1").unwrap()), None);
        assert_eq!(value.get_path(&Path::parse("username.nested").unwrap()), None);
    }

    #[test]
    fn test_set_path_creates_intermediates() {
        let mut value = FormValue::record();
        value.set_path(&Path::parse("social.twitter").unwrap(), "handle".into());
        value.set_path(&Path::parse("phNumbers.1.number").unwrap(), "555".into());

        assert_eq!(
            value.get_path(&Path::parse("social.twitter").unwrap()),
            Some(&FormValue::from("handle"))
        );
        // Index 0 padded with Null
        assert_eq!(
            value.get_path(&Path::parse("phNumbers.0").unwrap()),
            Some(&FormValue::Null)
        );
        assert_eq!(
            value.get_path(&Path::parse("phNumbers.1.number").unwrap()),
            Some(&FormValue::from("555"))
        );
    }

    #[test]
    fn test_is_empty() {
        assert!(FormValue::Null.is_empty());
        assert!(FormValue::from("").is_empty());
        assert!(FormValue::List(Vec::new()).is_empty());
        assert!(!FormValue::from("x").is_empty());
        assert!(!FormValue::Number(0.0).is_empty());
        assert!(!FormValue::Bool(false).is_empty());
    }

    #[test]
    fn test_leaves() {
        let value = sample();
        let leaves = value.top_level_leaves();
        let paths: Vec<String> = leaves.iter().map(|(p, _)| p.to_string()).collect();
        assert!(paths.contains(&"username".to_string()));
        assert!(paths.contains(&"social.twitter".to_string()));
        assert!(paths.contains(&"phNumbers.0.number".to_string()));
        assert_eq!(leaves.len(), 4);
    }

    #[test]
    fn test_value_equality_not_identity() {
        let a = sample();
        let b = sample();
        assert_eq!(a, b);
    }

    #[test]
    fn test_serde_json_shape() {
        let value = FormValue::from([("age", FormValue::Number(30.0))]);
        let json = serde_json::to_string(&value).unwrap();
        assert_eq!(json, r#"{"age":30.0}"#);
        let back: FormValue = serde_json::from_str(&json).unwrap();
        assert_eq!(back, value);
    }
}
