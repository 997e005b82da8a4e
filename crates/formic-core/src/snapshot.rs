//! Form Snapshots
//!
//! Immutable materialization of every live field value into one nested
//! structure. Produced on demand, never mutated in place.

use serde::Serialize;

use crate::path::Path;
use crate::value::FormValue;

/// Point-in-time copy of the whole form, shaped by the paths that were live
/// when it was taken.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct FormSnapshot {
    root: FormValue,
}

impl FormSnapshot {
    /// Build from leaf paths and their values
    pub fn from_leaves<'a, I>(leaves: I) -> Self
    where
        I: IntoIterator<Item = (&'a Path, &'a FormValue)>,
    {
        let mut root = FormValue::record();
        for (path, value) in leaves {
            root.set_path(path, value.clone());
        }
        Self { root }
    }

    /// Value at `path`, if the snapshot contains it
    pub fn get(&self, path: &Path) -> Option<&FormValue> {
        self.root.get_path(path)
    }

    /// The whole nested structure
    #[inline]
    pub fn as_value(&self) -> &FormValue {
        &self.root
    }

    /// Consume into the nested structure
    pub fn into_value(self) -> FormValue {
        self.root
    }
}
