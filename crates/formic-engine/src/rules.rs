//! Validation Rules
//!
//! Per-field rule configuration and the compiled, ordered chain the
//! validation pass walks. Order is fixed: `required` first, then `pattern`,
//! then length bounds, then each named custom rule in declaration order.
//! Pattern and length rules are skipped for empty values (an optional field
//! left blank passes them); custom rules always run.

use std::future::Future;
use std::rc::Rc;

use formic_core::FormValue;
use futures_lite::FutureExt;
use regex::Regex;

/// What a single rule says about a value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleVerdict {
    Pass,
    Fail(String),
}

impl RuleVerdict {
    /// Pass when `ok`, otherwise fail with `message`
    pub fn require(ok: bool, message: &str) -> Self {
        if ok {
            RuleVerdict::Pass
        } else {
            RuleVerdict::Fail(message.to_string())
        }
    }
}

/// Result of a full validation pass for one field
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Valid,
    Invalid { message: String },
}

impl Outcome {
    #[inline]
    pub fn is_valid(&self) -> bool {
        matches!(self, Outcome::Valid)
    }

    /// Failure message, if invalid
    pub fn message(&self) -> Option<&str> {
        match self {
            Outcome::Valid => None,
            Outcome::Invalid { message } => Some(message),
        }
    }
}

/// Synchronous custom validator
pub type SyncValidator = Rc<dyn Fn(&FormValue) -> RuleVerdict>;

/// Asynchronous custom validator. An `Err` counts as the rule failing with
/// a generic message, not as an engine failure.
pub type AsyncValidator =
    Rc<dyn Fn(FormValue) -> futures_lite::future::BoxedLocal<anyhow::Result<RuleVerdict>>>;

/// One compiled rule in a field's chain
#[derive(Clone)]
pub(crate) enum Rule {
    Required {
        message: String,
    },
    Pattern {
        regex: Regex,
        message: String,
    },
    MinLength {
        min: usize,
        message: String,
    },
    MaxLength {
        max: usize,
        message: String,
    },
    Custom {
        name: String,
        check: SyncValidator,
    },
    CustomAsync {
        name: String,
        check: AsyncValidator,
    },
}

impl std::fmt::Debug for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Rule::Required { .. } => f.write_str("Required"),
            Rule::Pattern { regex, .. } => write!(f, "Pattern({})", regex.as_str()),
            Rule::MinLength { min, .. } => write!(f, "MinLength({min})"),
            Rule::MaxLength { max, .. } => write!(f, "MaxLength({max})"),
            Rule::Custom { name, .. } => write!(f, "Custom({name})"),
            Rule::CustomAsync { name, .. } => write!(f, "CustomAsync({name})"),
        }
    }
}

/// Compiled, ordered rule chain for one field
#[derive(Debug, Default, Clone)]
pub(crate) struct RuleChain {
    pub(crate) rules: Vec<Rule>,
}

impl RuleChain {
    pub(crate) fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

#[derive(Clone)]
enum CustomCheck {
    Sync(SyncValidator),
    Async(AsyncValidator),
}

/// Field registration options: captured default, rules, lifecycle flags.
///
/// Rules are declared here as configuration; the regex in `pattern` is
/// compiled at registration time so a malformed pattern fails fast with the
/// offending path in the error.
#[derive(Clone, Default)]
pub struct FieldConfig {
    pub(crate) default: Option<FormValue>,
    pub(crate) retain_on_unregister: bool,
    required: Option<String>,
    pattern: Option<(String, String)>,
    min_length: Option<(usize, String)>,
    max_length: Option<(usize, String)>,
    customs: Vec<(String, CustomCheck)>,
}

impl FieldConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Default value captured at registration
    pub fn default_value(mut self, value: impl Into<FormValue>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Keep the stored value when the field is unregistered
    pub fn retain_on_unregister(mut self) -> Self {
        self.retain_on_unregister = true;
        self
    }

    /// Fail with `message` when the value is empty
    pub fn required(mut self, message: &str) -> Self {
        self.required = Some(message.to_string());
        self
    }

    /// Fail with `message` when a non-empty text value does not match
    pub fn pattern(mut self, pattern: &str, message: &str) -> Self {
        self.pattern = Some((pattern.to_string(), message.to_string()));
        self
    }

    /// Minimum character count for non-empty text values
    pub fn min_length(mut self, min: usize, message: &str) -> Self {
        self.min_length = Some((min, message.to_string()));
        self
    }

    /// Maximum character count for text values
    pub fn max_length(mut self, max: usize, message: &str) -> Self {
        self.max_length = Some((max, message.to_string()));
        self
    }

    /// Named custom rule, run in declaration order after the built-ins
    pub fn validate<F>(mut self, name: &str, check: F) -> Self
    where
        F: Fn(&FormValue) -> RuleVerdict + 'static,
    {
        self.customs
            .push((name.to_string(), CustomCheck::Sync(Rc::new(check))));
        self
    }

    /// Named async custom rule
    pub fn validate_async<F, Fut>(mut self, name: &str, check: F) -> Self
    where
        F: Fn(FormValue) -> Fut + 'static,
        Fut: Future<Output = anyhow::Result<RuleVerdict>> + 'static,
    {
        let wrapped: AsyncValidator = Rc::new(move |value| check(value).boxed_local());
        self.customs
            .push((name.to_string(), CustomCheck::Async(wrapped)));
        self
    }

    /// Compile into the ordered chain. Returns the reason on a malformed
    /// pattern; the caller attaches the path.
    pub(crate) fn compile(&self) -> Result<RuleChain, String> {
        let mut rules = Vec::new();
        if let Some(message) = &self.required {
            rules.push(Rule::Required {
                message: message.clone(),
            });
        }
        if let Some((pattern, message)) = &self.pattern {
            let regex = Regex::new(pattern).map_err(|e| format!("bad pattern: {e}"))?;
            rules.push(Rule::Pattern {
                regex,
                message: message.clone(),
            });
        }
        if let Some((min, message)) = &self.min_length {
            rules.push(Rule::MinLength {
                min: *min,
                message: message.clone(),
            });
        }
        if let Some((max, message)) = &self.max_length {
            rules.push(Rule::MaxLength {
                max: *max,
                message: message.clone(),
            });
        }
        for (name, check) in &self.customs {
            rules.push(match check {
                CustomCheck::Sync(f) => Rule::Custom {
                    name: name.clone(),
                    check: f.clone(),
                },
                CustomCheck::Async(f) => Rule::CustomAsync {
                    name: name.clone(),
                    check: f.clone(),
                },
            });
        }
        Ok(RuleChain { rules })
    }
}

impl std::fmt::Debug for FieldConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldConfig")
            .field("default", &self.default)
            .field("required", &self.required.is_some())
            .field("pattern", &self.pattern.as_ref().map(|(p, _)| p))
            .field("customs", &self.customs.len())
            .finish()
    }
}
