//! Field Paths
//!
//! Dot/bracket addressed identifiers into a nested form value.
//! `social.twitter` names a field inside a sub-record, `phNumbers.1.number`
//! (or `phNumbers[1].number`) the `number` field of the second element of a
//! list. Paths form a prefix tree: a path is an ancestor of another iff its
//! segments are a strict prefix.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// One step of a path: a record key or a list index.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Segment {
    /// Named field of a record
    Key(Box<str>),
    /// Position in a list
    Index(u32),
}

impl Segment {
    /// Get the index if this segment is one
    #[inline]
    pub fn as_index(&self) -> Option<u32> {
        match self {
            Segment::Index(i) => Some(*i),
            Segment::Key(_) => None,
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Key(k) => f.write_str(k),
            Segment::Index(i) => write!(f, "{i}"),
        }
    }
}

/// Immutable field identifier: an ordered, non-empty sequence of segments.
///
/// Two paths are equal iff their segment sequences are equal. The canonical
/// textual form is dotted (`phNumbers.1.number`); bracket syntax is accepted
/// on parse.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Path {
    segments: Vec<Segment>,
}

/// Malformed path text
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    #[error("path is empty")]
    Empty,

    #[error("empty segment in path {path:?}")]
    EmptySegment { path: String },

    #[error("unbalanced bracket in path {path:?}")]
    UnbalancedBracket { path: String },

    #[error("bracket index {index:?} in path {path:?} is not a non-negative integer")]
    BadIndex { path: String, index: String },
}

impl Path {
    /// Single-key path
    pub fn key(name: &str) -> Self {
        Self {
            segments: vec![Segment::Key(name.into())],
        }
    }

    /// Parse from dot or bracket syntax
    pub fn parse(text: &str) -> Result<Self, PathError> {
        if text.is_empty() {
            return Err(PathError::Empty);
        }

        let mut segments = Vec::new();
        let mut rest = text;
        while !rest.is_empty() {
            if let Some(inner) = rest.strip_prefix('[') {
                let end = inner.find(']').ok_or_else(|| PathError::UnbalancedBracket {
                    path: text.to_string(),
                })?;
                let index = &inner[..end];
                let parsed = index.parse::<u32>().map_err(|_| PathError::BadIndex {
                    path: text.to_string(),
                    index: index.to_string(),
                })?;
                segments.push(Segment::Index(parsed));
                rest = &inner[end + 1..];
                // A dot directly after a closing bracket is a separator
                if let Some(after_dot) = rest.strip_prefix('.') {
                    if after_dot.is_empty() {
                        return Err(PathError::EmptySegment {
                            path: text.to_string(),
                        });
                    }
                    rest = after_dot;
                }
            } else {
                let end = rest
                    .find(['.', '['])
                    .unwrap_or(rest.len());
                let word = &rest[..end];
                if word.is_empty() {
                    return Err(PathError::EmptySegment {
                        path: text.to_string(),
                    });
                }
                if word.chars().all(|c| c.is_ascii_digit()) {
                    let parsed = word.parse::<u32>().map_err(|_| PathError::BadIndex {
                        path: text.to_string(),
                        index: word.to_string(),
                    })?;
                    segments.push(Segment::Index(parsed));
                } else {
                    segments.push(Segment::Key(word.into()));
                }
                rest = &rest[end..];
                if let Some(after_dot) = rest.strip_prefix('.') {
                    if after_dot.is_empty() {
                        return Err(PathError::EmptySegment {
                            path: text.to_string(),
                        });
                    }
                    rest = after_dot;
                }
            }
        }

        if segments.is_empty() {
            return Err(PathError::Empty);
        }
        Ok(Self { segments })
    }

    /// Append a segment
    pub fn child(&self, segment: Segment) -> Self {
        let mut segments = self.segments.clone();
        segments.push(segment);
        Self { segments }
    }

    /// Append a key segment
    pub fn join(&self, name: &str) -> Self {
        self.child(Segment::Key(name.into()))
    }

    /// Append an index segment
    pub fn index(&self, index: u32) -> Self {
        self.child(Segment::Index(index))
    }

    /// The containing path, if any
    pub fn parent(&self) -> Option<Self> {
        if self.segments.len() <= 1 {
            return None;
        }
        Some(Self {
            segments: self.segments[..self.segments.len() - 1].to_vec(),
        })
    }

    /// Segments in order
    #[inline]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Number of segments
    #[inline]
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// True if `prefix`'s segments are a (non-strict) prefix of this path's
    pub fn starts_with(&self, prefix: &Path) -> bool {
        self.segments.len() >= prefix.segments.len()
            && self.segments[..prefix.segments.len()] == prefix.segments[..]
    }

    /// True if this path is a strict prefix of `other`
    pub fn is_ancestor_of(&self, other: &Path) -> bool {
        other.segments.len() > self.segments.len() && other.starts_with(self)
    }

    /// Strict ancestors, nearest first (`a.b.c` yields `a.b`, then `a`)
    pub fn ancestors(&self) -> impl Iterator<Item = Path> + '_ {
        (1..self.segments.len()).rev().map(|n| Path {
            segments: self.segments[..n].to_vec(),
        })
    }

    /// The index segment directly under `prefix`, if this path descends
    /// through one (`phNumbers.1.number` under `phNumbers` gives 1)
    pub fn index_under(&self, prefix: &Path) -> Option<u32> {
        if !prefix.is_ancestor_of(self) {
            return None;
        }
        self.segments[prefix.segments.len()].as_index()
    }

    /// Copy of this path with the index segment directly under `prefix`
    /// replaced. Used when array elements shift position.
    pub fn reindexed_under(&self, prefix: &Path, new_index: u32) -> Option<Path> {
        self.index_under(prefix)?;
        let mut segments = self.segments.clone();
        segments[prefix.segments.len()] = Segment::Index(new_index);
        Some(Path { segments })
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            write!(f, "{segment}")?;
        }
        Ok(())
    }
}

impl FromStr for Path {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Path::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_dotted() {
        let path = Path::parse("social.twitter").unwrap();
        assert_eq!(path.len(), 2);
        assert_eq!(path.to_string(), "social.twitter");
    }

    #[test]
    fn test_parse_numeric_segment_is_index() {
        let path = Path::parse("phNumbers.1.number").unwrap();
        assert_eq!(path.segments()[1], Segment::Index(1));
    }

    #[test]
    fn test_parse_bracket_syntax() {
        let bracket = Path::parse("phNumbers[1].number").unwrap();
        let dotted = Path::parse("phNumbers.1.number").unwrap();
        assert_eq!(bracket, dotted);
        // Canonical display is the dotted form
        assert_eq!(bracket.to_string(), "phNumbers.1.number");
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(Path::parse(""), Err(PathError::Empty));
        assert!(matches!(
            Path::parse("a..b"),
            Err(PathError::EmptySegment { .. })
        ));
        assert!(matches!(
            Path::parse("a."),
            Err(PathError::EmptySegment { .. })
        ));
        assert!(matches!(
            Path::parse("a[1"),
            Err(PathError::UnbalancedBracket { .. })
        ));
        assert!(matches!(
            Path::parse("a[x]"),
            Err(PathError::BadIndex { .. })
        ));
    }

    #[test]
    fn test_ancestry() {
        let group = Path::parse("phNumbers").unwrap();
        let leaf = Path::parse("phNumbers.0.number").unwrap();

        assert!(group.is_ancestor_of(&leaf));
        assert!(!leaf.is_ancestor_of(&group));
        // Not an ancestor of itself
        assert!(!group.is_ancestor_of(&group));
        assert!(leaf.starts_with(&group));
        assert!(leaf.starts_with(&leaf));
    }

    #[test]
    fn test_ancestors_nearest_first() {
        let leaf = Path::parse("a.b.c").unwrap();
        let chain: Vec<String> = leaf.ancestors().map(|p| p.to_string()).collect();
        assert_eq!(chain, vec!["a.b".to_string(), "a".to_string()]);
    }

    #[test]
    fn test_parent() {
        let leaf = Path::parse("social.twitter").unwrap();
        assert_eq!(leaf.parent(), Some(Path::key("social")));
        assert_eq!(Path::key("social").parent(), None);
    }

    #[test]
    fn test_reindex_under_group() {
        let group = Path::parse("phNumbers").unwrap();
        let leaf = Path::parse("phNumbers.2.number").unwrap();

        assert_eq!(leaf.index_under(&group), Some(2));
        let shifted = leaf.reindexed_under(&group, 1).unwrap();
        assert_eq!(shifted.to_string(), "phNumbers.1.number");

        // Key segment under the prefix means no index to rewrite
        let other = Path::parse("social.twitter").unwrap();
        assert_eq!(other.index_under(&Path::key("social")), None);
        assert!(other.reindexed_under(&Path::key("social"), 0).is_none());
    }
}
