//! Form Facade
//!
//! The public surface a rendering layer consumes: field registration with
//! change/blur bindings, reads (`get_values`, `watch`), imperative writes
//! (`set_value`), the `formState` projection, array-field bindings, and
//! submission. One `Form` value is a cheap handle; clones share the same
//! engine instance. The engine is single-threaded by contract.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use formic_core::{FormSnapshot, FormValue, Path};

use crate::array::{self, ArrayFields, ElementId};
use crate::error::FormError;
use crate::registry::{FieldEntry, FieldRegistry};
use crate::rules::{FieldConfig, Outcome};
use crate::store::ValueStore;
use crate::submit::{run_submit, SubmitOutcome};
use crate::subscribe::{Change, ChangeKind, Scope, Subscription, SubscriptionHub};
use crate::validate::validate_path;

/// When rule evaluation runs relative to interaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValidationMode {
    /// Validate on every value change (the default)
    #[default]
    OnChange,
    /// Validate when a field loses focus
    OnBlur,
    /// Validate only on submission
    OnSubmit,
}

pub(crate) struct EngineState {
    pub(crate) store: ValueStore,
    pub(crate) registry: FieldRegistry,
    pub(crate) arrays: ArrayFields,
    pub(crate) submitting: bool,
    pub(crate) submit_count: u32,
}

pub(crate) struct FormShared {
    pub(crate) state: RefCell<EngineState>,
    pub(crate) hub: Rc<SubscriptionHub>,
    pub(crate) mode: ValidationMode,
}

/// Builder for a form instance
#[derive(Debug, Default)]
pub struct FormBuilder {
    defaults: FormValue,
    mode: ValidationMode,
}

impl FormBuilder {
    /// Whole-form default values, a record; leaves are pre-seeded into the
    /// value store and survive registration churn
    pub fn defaults(mut self, defaults: FormValue) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn mode(mut self, mode: ValidationMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn build(self) -> Form {
        let mut store = ValueStore::default();
        store.seed(&self.defaults);
        Form {
            shared: Rc::new(FormShared {
                state: RefCell::new(EngineState {
                    store,
                    registry: FieldRegistry::default(),
                    arrays: ArrayFields::default(),
                    submitting: false,
                    submit_count: 0,
                }),
                hub: Rc::new(SubscriptionHub::default()),
                mode: self.mode,
            }),
        }
    }
}

/// Handle to one logical form instance
#[derive(Clone)]
pub struct Form {
    shared: Rc<FormShared>,
}

impl Form {
    /// Form with the given defaults and on-change validation
    pub fn new(defaults: FormValue) -> Self {
        Self::builder().defaults(defaults).build()
    }

    pub fn builder() -> FormBuilder {
        FormBuilder::default()
    }

    /// Register a field at `path`, creating (or re-associating) its entry
    /// with the configured rules and captured default. The returned binding
    /// carries the change/blur surface a UI control wires to.
    ///
    /// Fails fast on a malformed path or rule configuration.
    pub fn register(&self, path: &str, config: FieldConfig) -> Result<FieldBinding, FormError> {
        let path = Path::parse(path)?;
        let chain = config.compile().map_err(|reason| FormError::InvalidRule {
            path: path.clone(),
            reason,
        })?;

        let mut state = self.shared.state.borrow_mut();
        let state = &mut *state;
        let default = config
            .default
            .clone()
            .or_else(|| state.store.default_of(&path).cloned())
            .unwrap_or(FormValue::Null);
        state.store.capture_default(&path, default.clone());
        state.registry.register(
            path.clone(),
            FieldEntry::new(chain, default, config.retain_on_unregister),
        );
        // A pre-existing value may already diverge from the new default
        let dirty = state.store.is_dirty(&path);
        if let Some(entry) = state.registry.get_mut(&path) {
            entry.dirty = dirty;
        }

        Ok(FieldBinding {
            name: path.to_string(),
            path,
            form: self.clone(),
        })
    }

    /// Remove the entry at `path`. The stored value is cleared unless the
    /// field was registered with retention or its default was pre-seeded.
    pub fn unregister(&self, path: &str) -> Result<(), FormError> {
        let path = Path::parse(path)?;
        {
            let mut state = self.shared.state.borrow_mut();
            let entry = state
                .registry
                .unregister(&path)
                .ok_or_else(|| FormError::UnknownField(path.clone()))?;
            if !entry.retain_on_unregister {
                state.store.clear_on_unregister(&path);
            }
        }
        self.shared.hub.notify(&path, ChangeKind::Structure);
        Ok(())
    }

    /// Imperative write. Triggers the same notification and validation path
    /// as a user-driven change; a record or list value fans out to leaves.
    pub async fn set_value(
        &self,
        path: &str,
        value: impl Into<FormValue>,
    ) -> Result<(), FormError> {
        let path = Path::parse(path)?;
        self.write(&path, value.into()).await;
        Ok(())
    }

    /// Non-subscribing point read: the value at `path` (leaf or subtree)
    pub fn get_value(&self, path: &str) -> Result<Option<FormValue>, FormError> {
        let path = Path::parse(path)?;
        let state = self.shared.state.borrow();
        Ok(state
            .store
            .get(&path)
            .cloned()
            .or_else(|| state.store.snapshot().get(&path).cloned()))
    }

    /// Non-subscribing read of the whole form
    pub fn get_values(&self) -> FormSnapshot {
        self.shared.state.borrow().store.snapshot()
    }

    /// Observe changes within `scope`. The subscription ends when the
    /// returned guard is dropped.
    pub fn watch<F>(&self, scope: Scope, callback: F) -> Subscription
    where
        F: FnMut(&Change) + 'static,
    {
        self.shared.hub.subscribe(scope, callback)
    }

    /// Re-run validation for `path` on demand
    pub async fn trigger(&self, path: &str) -> Result<Outcome, FormError> {
        let path = Path::parse(path)?;
        validate_path(&self.shared, &path)
            .await
            .ok_or(FormError::UnknownField(path))
    }

    /// Read-only projection of interaction and validity state
    pub fn state(&self) -> FormStateView {
        let state = self.shared.state.borrow();
        let fields = state
            .registry
            .iter()
            .map(|(path, entry)| {
                (
                    path.clone(),
                    FieldState {
                        touched: entry.touched,
                        dirty: entry.dirty,
                        error: entry
                            .validity
                            .as_ref()
                            .and_then(|o| o.message().map(str::to_string)),
                    },
                )
            })
            .collect();
        FormStateView {
            fields,
            is_valid: state.registry.all_valid(),
            is_dirty: state.registry.any_dirty(),
            is_submitting: state.submitting,
            submit_count: state.submit_count,
        }
    }

    /// Declare `group` as an array field and get its binding. Elements
    /// present in the seeded defaults are adopted with fresh identity
    /// tokens. Declaring twice is a caller defect.
    pub fn declare_array(&self, group: &str) -> Result<ArrayBinding, FormError> {
        let group = Path::parse(group)?;
        array::declare(&mut self.shared.state.borrow_mut(), &group)?;
        Ok(ArrayBinding {
            group,
            form: self.clone(),
        })
    }

    /// Binding for an already-declared array field
    pub fn array(&self, group: &str) -> Result<ArrayBinding, FormError> {
        let group = Path::parse(group)?;
        self.shared.state.borrow().arrays.get(&group)?;
        Ok(ArrayBinding {
            group,
            form: self.clone(),
        })
    }

    /// Restore every registered field to its captured default and clear
    /// interaction and validity state. In-flight validation passes land
    /// stale. Array structure is left as-is.
    pub fn reset(&self) {
        let (restored, cleared): (Vec<Path>, Vec<Path>) = {
            let mut state = self.shared.state.borrow_mut();
            let state = &mut *state;
            let mut restored = Vec::new();
            let mut cleared = Vec::new();
            for path in state.registry.paths() {
                if state.store.restore_default(&path) {
                    restored.push(path.clone());
                }
                if let Some(entry) = state.registry.get_mut(&path) {
                    if entry.validity.is_some() {
                        cleared.push(path.clone());
                    }
                    entry.reset();
                }
            }
            (restored, cleared)
        };
        tracing::debug!(
            restored = restored.len(),
            cleared = cleared.len(),
            "form reset"
        );
        for path in &restored {
            for ancestor in path.ancestors() {
                self.shared.hub.enqueue(Change {
                    path: ancestor,
                    kind: ChangeKind::Value,
                });
            }
            self.shared.hub.enqueue(Change {
                path: path.clone(),
                kind: ChangeKind::Value,
            });
        }
        // A cleared cached error is observable even when no value moved
        for path in &cleared {
            for ancestor in path.ancestors() {
                self.shared.hub.enqueue(Change {
                    path: ancestor,
                    kind: ChangeKind::Validity,
                });
            }
            self.shared.hub.enqueue(Change {
                path: path.clone(),
                kind: ChangeKind::Validity,
            });
        }
        self.shared.hub.flush();
    }

    /// Full-form validation pass gating the caller's action; see
    /// [`SubmitOutcome`]
    pub async fn submit(&self) -> SubmitOutcome {
        run_submit(&self.shared).await
    }

    /// Callback form of [`submit`](Form::submit): `on_valid` runs exactly
    /// once with the snapshot iff every field passes, otherwise
    /// `on_invalid` runs with the per-path messages. Never both.
    pub async fn handle_submit<V, I>(&self, on_valid: V, on_invalid: I)
    where
        V: FnOnce(FormSnapshot),
        I: FnOnce(&BTreeMap<Path, String>),
    {
        match self.submit().await {
            SubmitOutcome::Valid(snapshot) => on_valid(snapshot),
            SubmitOutcome::Invalid(errors) => on_invalid(&errors),
        }
    }

    /// Shared write path for `set_value` and field bindings
    pub(crate) async fn write(&self, path: &Path, value: FormValue) {
        let changed: Vec<Path> = {
            let mut state = self.shared.state.borrow_mut();
            let state = &mut *state;
            let changed = state.store.set(path, value);
            for leaf in &changed {
                if let Some(entry) = state.registry.get_mut(leaf) {
                    entry.dirty = state.store.is_dirty(leaf);
                }
            }
            changed
        };
        for leaf in &changed {
            self.shared.hub.notify(leaf, ChangeKind::Value);
        }
        if self.shared.mode == ValidationMode::OnChange {
            for leaf in &changed {
                validate_path(&self.shared, leaf).await;
            }
        }
    }

    pub(crate) async fn blur(&self, path: &Path) {
        let newly_touched = {
            let mut state = self.shared.state.borrow_mut();
            match state.registry.get_mut(path) {
                Some(entry) if !entry.touched => {
                    entry.touched = true;
                    true
                }
                _ => false,
            }
        };
        if newly_touched {
            self.shared.hub.notify(path, ChangeKind::Interaction);
        }
        if self.shared.mode == ValidationMode::OnBlur {
            validate_path(&self.shared, path).await;
        }
    }
}

impl std::fmt::Debug for Form {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.shared.state.borrow();
        f.debug_struct("Form")
            .field("fields", &state.registry.paths().len())
            .field("mode", &self.shared.mode)
            .finish()
    }
}

/// What `register` hands a UI control: the field's canonical name plus the
/// change and blur entry points. (A DOM-style ref sink has no analogue
/// here; binding to a concrete widget is the rendering layer's business.)
#[derive(Debug, Clone)]
pub struct FieldBinding {
    name: String,
    path: Path,
    form: Form,
}

impl FieldBinding {
    /// Canonical field name (dotted path)
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The control's value changed
    pub async fn change(&self, value: impl Into<FormValue>) {
        self.form.write(&self.path, value.into()).await;
    }

    /// The control lost focus
    pub async fn blur(&self) {
        self.form.blur(&self.path).await;
    }
}

/// Per-field slice of the `formState` projection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldState {
    pub touched: bool,
    pub dirty: bool,
    pub error: Option<String>,
}

/// Read-only snapshot of interaction and validity state
#[derive(Debug, Clone)]
pub struct FormStateView {
    fields: BTreeMap<Path, FieldState>,
    pub is_valid: bool,
    pub is_dirty: bool,
    pub is_submitting: bool,
    pub submit_count: u32,
}

impl FormStateView {
    pub fn field(&self, path: &str) -> Option<&FieldState> {
        let path = Path::parse(path).ok()?;
        self.fields.get(&path)
    }

    /// Current error message for `path`, if any
    pub fn error(&self, path: &str) -> Option<&str> {
        self.field(path)?.error.as_deref()
    }

    pub fn fields(&self) -> impl Iterator<Item = (&Path, &FieldState)> {
        self.fields.iter()
    }
}

/// Binding for one declared array field. Iteration yields identity tokens
/// with current indices; consumers must key rendered elements by token.
#[derive(Debug, Clone)]
pub struct ArrayBinding {
    group: Path,
    form: Form,
}

impl ArrayBinding {
    pub fn group(&self) -> &Path {
        &self.group
    }

    /// Tokens in order with their current indices
    pub fn elements(&self) -> Result<Vec<(ElementId, u32)>, FormError> {
        array::elements(&self.form.shared.state.borrow(), &self.group)
    }

    pub fn len(&self) -> Result<usize, FormError> {
        Ok(self.elements()?.len())
    }

    pub fn is_empty(&self) -> Result<bool, FormError> {
        Ok(self.len()? == 0)
    }

    /// New element at the end, its subtree registered with `value` as
    /// defaults
    pub fn append(&self, value: impl Into<FormValue>) -> Result<ElementId, FormError> {
        let (token, _) = {
            let mut state = self.form.shared.state.borrow_mut();
            array::append(&mut state, &self.group, value.into())?
        };
        self.notify_structure();
        Ok(token)
    }

    /// New element at the front; every existing element shifts up
    pub fn prepend(&self, value: impl Into<FormValue>) -> Result<ElementId, FormError> {
        let (token, _) = {
            let mut state = self.form.shared.state.borrow_mut();
            array::prepend(&mut state, &self.group, value.into())?
        };
        self.notify_structure();
        Ok(token)
    }

    pub fn insert(&self, index: usize, value: impl Into<FormValue>) -> Result<ElementId, FormError> {
        let (token, _) = {
            let mut state = self.form.shared.state.borrow_mut();
            array::insert(&mut state, &self.group, index, value.into())?
        };
        self.notify_structure();
        Ok(token)
    }

    /// Remove the element at `index`; later elements shift down, keeping
    /// their tokens and values
    pub fn remove(&self, index: usize) -> Result<ElementId, FormError> {
        let token = {
            let mut state = self.form.shared.state.borrow_mut();
            array::remove(&mut state, &self.group, index)?
        };
        self.notify_structure();
        Ok(token)
    }

    pub fn swap(&self, a: usize, b: usize) -> Result<(), FormError> {
        {
            let mut state = self.form.shared.state.borrow_mut();
            array::swap(&mut state, &self.group, a, b)?;
        }
        self.notify_structure();
        Ok(())
    }

    pub fn move_item(&self, from: usize, to: usize) -> Result<(), FormError> {
        {
            let mut state = self.form.shared.state.borrow_mut();
            array::move_item(&mut state, &self.group, from, to)?;
        }
        self.notify_structure();
        Ok(())
    }

    fn notify_structure(&self) {
        self.form.shared.hub.notify(&self.group, ChangeKind::Structure);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_rejects_malformed_rule() {
        let form = Form::new(FormValue::record());
        let err = form
            .register("email", FieldConfig::new().pattern("(", "broken"))
            .unwrap_err();
        assert!(matches!(err, FormError::InvalidRule { .. }));
    }

    #[test]
    fn test_register_rejects_malformed_path() {
        let form = Form::new(FormValue::record());
        let err = form.register("a..b", FieldConfig::new()).unwrap_err();
        assert!(matches!(err, FormError::Path(_)));
    }

    #[test]
    fn test_unregister_unknown_field_fails() {
        let form = Form::new(FormValue::record());
        let err = form.unregister("ghost").unwrap_err();
        assert!(matches!(err, FormError::UnknownField(_)));
    }

    #[test]
    fn test_array_ops_require_declaration() {
        let form = Form::new(FormValue::record());
        let err = form.array("phNumbers").unwrap_err();
        assert!(matches!(err, FormError::NotAnArrayField(_)));
    }

    #[test]
    fn test_seeded_default_survives_to_late_registration() {
        let form = Form::new(FormValue::from([("email", FormValue::from("a@b.com"))]));

        // Registered much later; the seeded value must not be reset
        form.register("email", FieldConfig::new()).unwrap();
        assert_eq!(
            form.get_value("email").unwrap(),
            Some(FormValue::from("a@b.com"))
        );
    }

    #[test]
    fn test_unregister_clears_unless_retained() {
        smol::block_on(async {
            let form = Form::new(FormValue::record());

            form.register("kept", FieldConfig::new().retain_on_unregister())
                .unwrap();
            form.register("dropped", FieldConfig::new()).unwrap();
            form.set_value("kept", "a").await.unwrap();
            form.set_value("dropped", "b").await.unwrap();

            form.unregister("kept").unwrap();
            form.unregister("dropped").unwrap();

            assert_eq!(form.get_value("kept").unwrap(), Some(FormValue::from("a")));
            assert_eq!(form.get_value("dropped").unwrap(), None);
        });
    }
}
