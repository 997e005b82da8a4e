//! Value Store
//!
//! Authoritative mapping from every live leaf path to its current value,
//! seeded from defaults, mutated by writes, queryable by path or as a whole
//! snapshot. Writes on an ancestor path fan out to the leaves of the
//! assigned value.

use std::collections::{HashMap, HashSet};

use formic_core::{FormSnapshot, FormValue, Path};

/// Leaf values plus captured defaults for one form instance
#[derive(Debug, Default)]
pub(crate) struct ValueStore {
    /// Current value per leaf path
    values: HashMap<Path, FormValue>,
    /// Default captured at seeding or registration
    defaults: HashMap<Path, FormValue>,
    /// Paths whose defaults were pre-seeded before any registration; their
    /// values survive unregistration so a later re-registration is not
    /// silently reset
    seeded: HashSet<Path>,
}

impl ValueStore {
    /// Seed from the whole-form defaults record
    pub(crate) fn seed(&mut self, defaults: &FormValue) {
        for (path, value) in defaults.top_level_leaves() {
            tracing::trace!(path = %path, "seeding default");
            self.defaults.insert(path.clone(), value.clone());
            self.values.insert(path.clone(), value);
            self.seeded.insert(path);
        }
    }

    /// Capture a registration-time default. An existing current value (from
    /// seeding or an earlier registration) is left untouched.
    pub(crate) fn capture_default(&mut self, path: &Path, default: FormValue) {
        self.values
            .entry(path.clone())
            .or_insert_with(|| default.clone());
        self.defaults.insert(path.clone(), default);
    }

    pub(crate) fn get(&self, path: &Path) -> Option<&FormValue> {
        self.values.get(path)
    }

    pub(crate) fn default_of(&self, path: &Path) -> Option<&FormValue> {
        self.defaults.get(path)
    }

    /// Write `value` at `path`. A leaf value targets that path directly; a
    /// record or list fans out to each of its leaves. Returns the leaf paths
    /// whose stored value actually changed (value equality, not identity).
    pub(crate) fn set(&mut self, path: &Path, value: FormValue) -> Vec<Path> {
        let mut changed = Vec::new();
        if value.is_leaf() {
            self.set_leaf(path, value, &mut changed);
        } else {
            for (leaf_path, leaf_value) in value.leaves(path) {
                self.set_leaf(&leaf_path, leaf_value, &mut changed);
            }
        }
        changed
    }

    fn set_leaf(&mut self, path: &Path, value: FormValue, changed: &mut Vec<Path>) {
        if self.values.get(path) == Some(&value) {
            return;
        }
        tracing::debug!(path = %path, "value changed");
        self.values.insert(path.clone(), value);
        changed.push(path.clone());
    }

    /// Whether the current value diverges from the captured default
    pub(crate) fn is_dirty(&self, path: &Path) -> bool {
        match (self.values.get(path), self.defaults.get(path)) {
            (Some(value), Some(default)) => value != default,
            (Some(value), None) => !matches!(value, FormValue::Null),
            (None, _) => false,
        }
    }

    /// Restore `path` to its captured default, if one exists. Returns true
    /// when the stored value changed.
    pub(crate) fn restore_default(&mut self, path: &Path) -> bool {
        match self.defaults.get(path) {
            Some(default) if self.values.get(path) != Some(default) => {
                let default = default.clone();
                self.values.insert(path.clone(), default);
                true
            }
            _ => false,
        }
    }

    /// Drop the value on unregistration. Pre-seeded paths keep their value.
    pub(crate) fn clear_on_unregister(&mut self, path: &Path) {
        if !self.seeded.contains(path) {
            self.values.remove(path);
            self.defaults.remove(path);
        }
    }

    /// Leaf paths currently stored at or under `prefix`
    pub(crate) fn leaf_paths_under(&self, prefix: &Path) -> Vec<Path> {
        self.values
            .keys()
            .filter(|p| p.starts_with(prefix))
            .cloned()
            .collect()
    }

    /// Remove and return every value and default at or under `prefix`
    pub(crate) fn take_subtree(&mut self, prefix: &Path) -> SubtreeValues {
        let paths: Vec<Path> = self
            .values
            .keys()
            .filter(|p| p.starts_with(prefix))
            .cloned()
            .collect();
        let mut taken = SubtreeValues::default();
        for path in paths {
            if let Some(value) = self.values.remove(&path) {
                taken.values.push((path.clone(), value));
            }
            if let Some(default) = self.defaults.remove(&path) {
                taken.defaults.push((path.clone(), default));
            }
            self.seeded.remove(&path);
        }
        // Defaults can exist for paths with no current value
        let orphan_defaults: Vec<Path> = self
            .defaults
            .keys()
            .filter(|p| p.starts_with(prefix))
            .cloned()
            .collect();
        for path in orphan_defaults {
            if let Some(default) = self.defaults.remove(&path) {
                taken.defaults.push((path, default));
            }
        }
        taken
    }

    /// Reinsert a subtree taken with [`take_subtree`], rewriting each path
    /// through `rekey`
    pub(crate) fn put_subtree<F>(&mut self, taken: SubtreeValues, rekey: F)
    where
        F: Fn(&Path) -> Path,
    {
        for (path, value) in taken.values {
            self.values.insert(rekey(&path), value);
        }
        for (path, default) in taken.defaults {
            self.defaults.insert(rekey(&path), default);
        }
    }

    /// Materialize every current leaf into one nested structure
    pub(crate) fn snapshot(&self) -> FormSnapshot {
        FormSnapshot::from_leaves(self.values.iter())
    }
}

/// Subtree contents removed by [`ValueStore::take_subtree`]
#[derive(Debug, Default)]
pub(crate) struct SubtreeValues {
    values: Vec<(Path, FormValue)>,
    defaults: Vec<(Path, FormValue)>,
}
