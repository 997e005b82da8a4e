//! Field Registry
//!
//! Tracks which paths are live, their compiled rule chains, interaction
//! state (touched/dirty), cached validity, and the per-path validation pass
//! counter that orders async outcomes.

use std::collections::HashMap;
use std::rc::Rc;

use formic_core::{FormValue, Path};

use crate::rules::{Outcome, RuleChain};

/// Registry record for one live path
#[derive(Debug)]
pub(crate) struct FieldEntry {
    pub(crate) rules: Rc<RuleChain>,
    pub(crate) default: FormValue,
    pub(crate) touched: bool,
    pub(crate) dirty: bool,
    /// Most recent validation outcome; `None` until first evaluated
    pub(crate) validity: Option<Outcome>,
    /// Monotonic id of the newest issued validation pass
    issued_pass: u64,
    /// Pass id whose outcome is currently cached
    applied_pass: u64,
    pub(crate) retain_on_unregister: bool,
}

impl FieldEntry {
    pub(crate) fn new(rules: RuleChain, default: FormValue, retain_on_unregister: bool) -> Self {
        Self {
            rules: Rc::new(rules),
            default,
            touched: false,
            dirty: false,
            validity: None,
            issued_pass: 0,
            applied_pass: 0,
            retain_on_unregister,
        }
    }

    /// Issue a new validation pass id for this field
    pub(crate) fn issue_pass(&mut self) -> u64 {
        self.issued_pass += 1;
        self.issued_pass
    }

    /// Apply a resolved outcome unless a newer pass has been issued since.
    /// Returns whether the outcome was applied.
    pub(crate) fn apply_outcome(&mut self, pass: u64, outcome: Outcome) -> bool {
        if pass != self.issued_pass {
            tracing::trace!(pass, latest = self.issued_pass, "discarding stale outcome");
            return false;
        }
        self.applied_pass = pass;
        self.validity = Some(outcome);
        true
    }

    /// Return to the just-registered state. Bumps the issued pass id so an
    /// in-flight validation from before the reset lands stale.
    pub(crate) fn reset(&mut self) {
        self.touched = false;
        self.dirty = false;
        self.validity = None;
        self.issued_pass += 1;
    }

    /// Valid in the aggregate sense: unevaluated fields count as valid
    pub(crate) fn counts_valid(&self) -> bool {
        !matches!(self.validity, Some(Outcome::Invalid { .. }))
    }
}

/// All live field entries, keyed by path
#[derive(Debug, Default)]
pub(crate) struct FieldRegistry {
    entries: HashMap<Path, FieldEntry>,
}

impl FieldRegistry {
    /// Create or re-associate the entry at `path`. Re-registration replaces
    /// rules and default but keeps interaction state and cached validity.
    pub(crate) fn register(&mut self, path: Path, entry: FieldEntry) {
        match self.entries.get_mut(&path) {
            Some(existing) => {
                tracing::debug!(path = %path, "re-associating field");
                existing.rules = entry.rules;
                existing.default = entry.default;
                existing.retain_on_unregister = entry.retain_on_unregister;
            }
            None => {
                tracing::debug!(path = %path, "registering field");
                self.entries.insert(path, entry);
            }
        }
    }

    pub(crate) fn unregister(&mut self, path: &Path) -> Option<FieldEntry> {
        tracing::debug!(path = %path, "unregistering field");
        self.entries.remove(path)
    }

    pub(crate) fn get(&self, path: &Path) -> Option<&FieldEntry> {
        self.entries.get(path)
    }

    pub(crate) fn get_mut(&mut self, path: &Path) -> Option<&mut FieldEntry> {
        self.entries.get_mut(path)
    }

    pub(crate) fn contains(&self, path: &Path) -> bool {
        self.entries.contains_key(path)
    }

    /// Every registered path
    pub(crate) fn paths(&self) -> Vec<Path> {
        self.entries.keys().cloned().collect()
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (&Path, &FieldEntry)> {
        self.entries.iter()
    }

    /// Aggregate validity: no entry currently invalid
    pub(crate) fn all_valid(&self) -> bool {
        self.entries.values().all(FieldEntry::counts_valid)
    }

    /// Aggregate dirtiness
    pub(crate) fn any_dirty(&self) -> bool {
        self.entries.values().any(|e| e.dirty)
    }

    /// Remove and return every entry at or under `prefix`
    pub(crate) fn take_subtree(&mut self, prefix: &Path) -> Vec<(Path, FieldEntry)> {
        let paths: Vec<Path> = self
            .entries
            .keys()
            .filter(|p| p.starts_with(prefix))
            .cloned()
            .collect();
        paths
            .into_iter()
            .filter_map(|p| self.entries.remove(&p).map(|e| (p, e)))
            .collect()
    }

    /// Reinsert entries taken with [`take_subtree`], rewriting each path
    pub(crate) fn put_subtree<F>(&mut self, taken: Vec<(Path, FieldEntry)>, rekey: F)
    where
        F: Fn(&Path) -> Path,
    {
        for (path, entry) in taken {
            self.entries.insert(rekey(&path), entry);
        }
    }
}
