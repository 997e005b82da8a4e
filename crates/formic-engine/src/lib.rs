//! formic-engine - Form-state engine
//!
//! Tracks the values, validation status, and structural shape of a
//! multi-field data-entry form, decoupled from any rendering technology.
//! A consumer registers fields by path, wires the returned bindings to its
//! own input controls, and submits; the engine owns the value store, the
//! rule evaluation (sync and async, stale results discarded in issuance
//! order), dynamically growable array fields with stable element identity,
//! and scoped change notifications.
//!
//! Single-threaded by contract: one logical form instance, `Form` handles
//! are cheap clones sharing it, and suspension happens only inside async
//! validation rules and submission.

mod array;
mod error;
mod form;
mod registry;
mod rules;
mod store;
mod submit;
mod subscribe;
mod validate;

pub use array::ElementId;
pub use error::FormError;
pub use form::{
    ArrayBinding, FieldBinding, FieldState, Form, FormBuilder, FormStateView, ValidationMode,
};
pub use rules::{AsyncValidator, FieldConfig, Outcome, RuleVerdict, SyncValidator};
pub use submit::SubmitOutcome;
pub use subscribe::{Change, ChangeKind, Scope, Subscription};

pub use formic_core::{FormSnapshot, FormValue, Path, PathError, Segment};
