//! Submission
//!
//! The terminal operation: a full-form validation pass over every
//! registered path (rule-less fields simply always pass) gating a
//! caller action on aggregate validity. Completion is signaled only once
//! every outstanding pass for the attempt has resolved. Submission is
//! idempotent under retry; nothing blocks a resubmit after an invalid pass.

use std::collections::BTreeMap;

use formic_core::{FormSnapshot, Path};

use crate::form::FormShared;
use crate::rules::Outcome;
use crate::validate::validate_path;

/// Result of one submission attempt
#[derive(Debug, Clone)]
pub enum SubmitOutcome {
    /// Every field passed; carries the value snapshot taken after the pass
    Valid(FormSnapshot),
    /// At least one field failed; first-failure message per invalid path
    Invalid(BTreeMap<Path, String>),
}

impl SubmitOutcome {
    #[inline]
    pub fn is_valid(&self) -> bool {
        matches!(self, SubmitOutcome::Valid(_))
    }

    /// The error map, if invalid
    pub fn errors(&self) -> Option<&BTreeMap<Path, String>> {
        match self {
            SubmitOutcome::Valid(_) => None,
            SubmitOutcome::Invalid(errors) => Some(errors),
        }
    }
}

pub(crate) async fn run_submit(shared: &FormShared) -> SubmitOutcome {
    let paths: Vec<Path> = {
        let mut state = shared.state.borrow_mut();
        state.submitting = true;
        let mut paths = state.registry.paths();
        paths.sort();
        paths
    };
    tracing::debug!(fields = paths.len(), "submission pass");

    let mut errors = BTreeMap::new();
    for path in paths {
        // A field unregistered mid-pass is no longer the form's concern
        if let Some(Outcome::Invalid { message }) = validate_path(shared, &path).await {
            errors.insert(path, message);
        }
    }

    let mut state = shared.state.borrow_mut();
    state.submitting = false;
    state.submit_count += 1;
    if errors.is_empty() {
        SubmitOutcome::Valid(state.store.snapshot())
    } else {
        tracing::debug!(invalid = errors.len(), "submission rejected");
        SubmitOutcome::Invalid(errors)
    }
}
