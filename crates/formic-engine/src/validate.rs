//! Validation Engine
//!
//! Runs a field's compiled rule chain against its current value. The first
//! failing rule short-circuits the pass and its message is the one reported.
//! Async rules suspend the pass; outcomes are applied in issuance order.
//! A resolution whose pass id is no longer the newest issued for the path
//! is discarded, so a later-issued pass always wins even when an earlier
//! one resolves after it.

use formic_core::{FormValue, Path};

use crate::form::FormShared;
use crate::rules::{Outcome, Rule, RuleChain, RuleVerdict};
use crate::subscribe::ChangeKind;

/// Evaluate one rule chain against a value
pub(crate) async fn run_chain(chain: &RuleChain, value: &FormValue) -> Outcome {
    for rule in &chain.rules {
        let verdict = match rule {
            Rule::Required { message } => RuleVerdict::require(!value.is_empty(), message),
            // Built-in shape rules do not apply to a blank optional field
            Rule::Pattern { regex, message } => {
                if value.is_empty() {
                    RuleVerdict::Pass
                } else {
                    match value.as_text() {
                        Some(text) => RuleVerdict::require(regex.is_match(text), message),
                        None => RuleVerdict::Fail(message.clone()),
                    }
                }
            }
            Rule::MinLength { min, message } => match value.as_text() {
                Some(text) if !text.is_empty() => {
                    RuleVerdict::require(text.chars().count() >= *min, message)
                }
                _ => RuleVerdict::Pass,
            },
            Rule::MaxLength { max, message } => match value.as_text() {
                Some(text) => RuleVerdict::require(text.chars().count() <= *max, message),
                None => RuleVerdict::Pass,
            },
            Rule::Custom { check, .. } => check(value),
            Rule::CustomAsync { name, check } => match check(value.clone()).await {
                Ok(verdict) => verdict,
                Err(error) => {
                    // A misbehaving validator fails its rule, nothing more
                    tracing::warn!(rule = %name, %error, "async rule raised an error");
                    RuleVerdict::Fail("validation failed".to_string())
                }
            },
        };
        if let RuleVerdict::Fail(message) = verdict {
            return Outcome::Invalid { message };
        }
    }
    Outcome::Valid
}

/// Run a full validation pass for `path` and cache the outcome.
///
/// Returns the field's current validity after the pass: if this pass was
/// superseded while suspended, that is the superseding pass's outcome.
/// `None` when no field is registered at `path`.
pub(crate) async fn validate_path(shared: &FormShared, path: &Path) -> Option<Outcome> {
    let (pass, chain, value) = {
        let mut state = shared.state.borrow_mut();
        let state = &mut *state;
        let entry = state.registry.get_mut(path)?;
        let pass = entry.issue_pass();
        let chain = entry.rules.clone();
        let value = state.store.get(path).cloned().unwrap_or(FormValue::Null);
        (pass, chain, value)
    };
    tracing::trace!(path = %path, pass, "validation pass started");

    let outcome = run_chain(&chain, &value).await;

    let (current, changed) = {
        let mut state = shared.state.borrow_mut();
        let entry = state.registry.get_mut(path)?;
        let before = entry.validity.clone();
        entry.apply_outcome(pass, outcome);
        (entry.validity.clone(), entry.validity != before)
    };
    if changed {
        shared.hub.notify(path, ChangeKind::Validity);
    }
    current
}
