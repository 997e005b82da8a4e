//! Array Fields
//!
//! Ordered collections of structurally identical sub-records under one
//! group path. Each element carries an identity token that never changes;
//! only the ordering decides which index appears in child paths. On every
//! structural change the shifted elements' value and registry subtrees are
//! re-keyed to their new indices while tokens and values are preserved.
//!
//! Consumers must key rendered elements by token, never by index, since
//! indices are reassigned on insert/remove/reorder.

use std::collections::HashMap;
use std::fmt;

use formic_core::{FormValue, Path};

use crate::error::FormError;
use crate::form::EngineState;
use crate::registry::{FieldEntry, FieldRegistry};
use crate::rules::RuleChain;
use crate::store::ValueStore;

/// Position-independent identity of one array element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElementId(u64);

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "el-{}", self.0)
    }
}

/// One declared array group: element tokens in order
#[derive(Debug, Default)]
pub(crate) struct ArrayFieldGroup {
    order: Vec<ElementId>,
    next_token: u64,
}

impl ArrayFieldGroup {
    fn mint(&mut self) -> ElementId {
        let id = ElementId(self.next_token);
        self.next_token += 1;
        id
    }

    pub(crate) fn len(&self) -> usize {
        self.order.len()
    }
}

/// All declared array groups of a form
#[derive(Debug, Default)]
pub(crate) struct ArrayFields {
    groups: HashMap<Path, ArrayFieldGroup>,
}

impl ArrayFields {
    fn get_mut(&mut self, group: &Path) -> Result<&mut ArrayFieldGroup, FormError> {
        self.groups
            .get_mut(group)
            .ok_or_else(|| FormError::NotAnArrayField(group.clone()))
    }

    pub(crate) fn get(&self, group: &Path) -> Result<&ArrayFieldGroup, FormError> {
        self.groups
            .get(group)
            .ok_or_else(|| FormError::NotAnArrayField(group.clone()))
    }
}

/// Declare `group` as an array field. Elements already present in the
/// seeded defaults (leaves at `group.N...`) are adopted with fresh tokens.
pub(crate) fn declare(state: &mut EngineState, group: &Path) -> Result<(), FormError> {
    if state.arrays.groups.contains_key(group) {
        return Err(FormError::ArrayAlreadyDeclared {
            path: group.clone(),
        });
    }
    let mut entry = ArrayFieldGroup::default();
    let seeded_len = state
        .store
        .leaf_paths_under(group)
        .iter()
        .filter_map(|p| p.index_under(group))
        .max()
        .map(|max| max as usize + 1)
        .unwrap_or(0);
    for _ in 0..seeded_len {
        let token = entry.mint();
        entry.order.push(token);
    }
    tracing::debug!(group = %group, elements = seeded_len, "declared array field");
    state.arrays.groups.insert(group.clone(), entry);
    Ok(())
}

/// Tokens with their current indices, in order
pub(crate) fn elements(
    state: &EngineState,
    group: &Path,
) -> Result<Vec<(ElementId, u32)>, FormError> {
    Ok(state
        .arrays
        .get(group)?
        .order
        .iter()
        .enumerate()
        .map(|(i, id)| (*id, i as u32))
        .collect())
}

/// Append a new element at the end of the sequence
pub(crate) fn append(
    state: &mut EngineState,
    group: &Path,
    value: FormValue,
) -> Result<(ElementId, u32), FormError> {
    let index = state.arrays.get(group)?.len();
    insert(state, group, index, value)
}

/// Insert a new element before the current first one
pub(crate) fn prepend(
    state: &mut EngineState,
    group: &Path,
    value: FormValue,
) -> Result<(ElementId, u32), FormError> {
    insert(state, group, 0, value)
}

/// Insert a new element at `index`, shifting later elements up by one
pub(crate) fn insert(
    state: &mut EngineState,
    group: &Path,
    index: usize,
    value: FormValue,
) -> Result<(ElementId, u32), FormError> {
    let len = state.arrays.get(group)?.len();
    if index > len {
        return Err(FormError::IndexOutOfBounds {
            path: group.clone(),
            index,
            len,
        });
    }

    let EngineState {
        store,
        registry,
        arrays,
        ..
    } = state;

    // Shift from the back so targets are vacant
    for i in (index..len).rev() {
        rekey_element(store, registry, group, i as u32, i as u32 + 1);
    }

    let base = group.index(index as u32);
    for (leaf_path, leaf_value) in value.leaves(&base) {
        store.capture_default(&leaf_path, leaf_value.clone());
        registry.register(
            leaf_path,
            FieldEntry::new(RuleChain::default(), leaf_value, false),
        );
    }

    let entry = arrays.get_mut(group)?;
    let token = entry.mint();
    entry.order.insert(index, token);
    tracing::debug!(group = %group, index, token = %token, "inserted array element");
    Ok((token, index as u32))
}

/// Remove the element at `index`, unregistering its subtree and shifting
/// later elements down by one. Returns the removed element's token.
pub(crate) fn remove(
    state: &mut EngineState,
    group: &Path,
    index: usize,
) -> Result<ElementId, FormError> {
    let len = state.arrays.get(group)?.len();
    if index >= len {
        return Err(FormError::IndexOutOfBounds {
            path: group.clone(),
            index,
            len,
        });
    }

    let EngineState {
        store,
        registry,
        arrays,
        ..
    } = state;

    let base = group.index(index as u32);
    store.take_subtree(&base);
    registry.take_subtree(&base);

    for i in index + 1..len {
        rekey_element(store, registry, group, i as u32, i as u32 - 1);
    }

    let entry = arrays.get_mut(group)?;
    let token = entry.order.remove(index);
    tracing::debug!(group = %group, index, token = %token, "removed array element");
    Ok(token)
}

/// Swap the elements at `a` and `b`
pub(crate) fn swap(
    state: &mut EngineState,
    group: &Path,
    a: usize,
    b: usize,
) -> Result<(), FormError> {
    let len = state.arrays.get(group)?.len();
    for index in [a, b] {
        if index >= len {
            return Err(FormError::IndexOutOfBounds {
                path: group.clone(),
                index,
                len,
            });
        }
    }
    if a == b {
        return Ok(());
    }

    let EngineState {
        store,
        registry,
        arrays,
        ..
    } = state;

    let values_a = store.take_subtree(&group.index(a as u32));
    let values_b = store.take_subtree(&group.index(b as u32));
    store.put_subtree(values_a, rekeyed(group, b as u32));
    store.put_subtree(values_b, rekeyed(group, a as u32));

    let entries_a = registry.take_subtree(&group.index(a as u32));
    let entries_b = registry.take_subtree(&group.index(b as u32));
    registry.put_subtree(entries_a, rekeyed(group, b as u32));
    registry.put_subtree(entries_b, rekeyed(group, a as u32));

    arrays.get_mut(group)?.order.swap(a, b);
    Ok(())
}

/// Move the element at `from` to position `to`, shifting the range between
pub(crate) fn move_item(
    state: &mut EngineState,
    group: &Path,
    from: usize,
    to: usize,
) -> Result<(), FormError> {
    let len = state.arrays.get(group)?.len();
    for index in [from, to] {
        if index >= len {
            return Err(FormError::IndexOutOfBounds {
                path: group.clone(),
                index,
                len,
            });
        }
    }
    if from == to {
        return Ok(());
    }

    let EngineState {
        store,
        registry,
        arrays,
        ..
    } = state;

    let moved_values = store.take_subtree(&group.index(from as u32));
    let moved_entries = registry.take_subtree(&group.index(from as u32));

    if from < to {
        for i in from + 1..=to {
            rekey_element(store, registry, group, i as u32, i as u32 - 1);
        }
    } else {
        for i in (to..from).rev() {
            rekey_element(store, registry, group, i as u32, i as u32 + 1);
        }
    }

    store.put_subtree(moved_values, rekeyed(group, to as u32));
    registry.put_subtree(moved_entries, rekeyed(group, to as u32));

    let entry = arrays.get_mut(group)?;
    let token = entry.order.remove(from);
    entry.order.insert(to, token);
    Ok(())
}

fn rekey_element(
    store: &mut ValueStore,
    registry: &mut FieldRegistry,
    group: &Path,
    from: u32,
    to: u32,
) {
    let base = group.index(from);
    let values = store.take_subtree(&base);
    store.put_subtree(values, rekeyed(group, to));
    let entries = registry.take_subtree(&base);
    registry.put_subtree(entries, rekeyed(group, to));
}

/// Subtrees taken under `group.<index>` always reindex cleanly; a path
/// outside the group is left untouched.
fn rekeyed(group: &Path, to: u32) -> impl Fn(&Path) -> Path + '_ {
    move |p| p.reindexed_under(group, to).unwrap_or_else(|| p.clone())
}
