//! Structured error types shared across the analysis crates.

use std::collections::BTreeMap;
use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Code, message and context carried by every [`LadderError`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Stable kebab-case code, e.g. `grid-mismatch`.
    pub code: String,
    /// Diagnostic message.
    pub message: String,
    /// Offending paths and parameter values.
    #[serde(default)]
    pub context: BTreeMap<String, String>,
    /// How to recover, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl ErrorInfo {
    /// Payload without context.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            context: BTreeMap::new(),
            hint: None,
        }
    }

    /// Records one context entry.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Attaches a recovery hint.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

/// Canonical error type for the analysis pipeline.
///
/// Missing raw data and groups too small to fit are not errors: evaluators
/// report them as absent results so a later run can retry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(tag = "family", content = "detail")]
pub enum LadderError {
    /// Cache directory and cache file errors, including malformed entries.
    #[error("cache store: {0}")]
    Store(ErrorInfo),
    /// Inconsistent inputs that indicate a logic or configuration bug.
    #[error("inconsistent input: {0}")]
    Structure(ErrorInfo),
    /// Numerical failures inside a regression.
    #[error("regression failed: {0}")]
    Fit(ErrorInfo),
    /// The raw simulation archive loader is unavailable or failed.
    #[error("raw archive: {0}")]
    Collaborator(ErrorInfo),
    /// Configuration and sweep plan errors.
    #[error("configuration: {0}")]
    Config(ErrorInfo),
}

impl Display for ErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)?;
        let context: Vec<String> = self.context.iter().map(|(k, v)| format!("{k}={v}")).collect();
        if !context.is_empty() {
            write!(f, " ({})", context.join(", "))?;
        }
        match &self.hint {
            Some(hint) => write!(f, "; hint: {hint}"),
            None => Ok(()),
        }
    }
}

impl LadderError {
    /// Returns a reference to the payload describing the error.
    pub fn info(&self) -> &ErrorInfo {
        match self {
            LadderError::Store(info)
            | LadderError::Structure(info)
            | LadderError::Fit(info)
            | LadderError::Collaborator(info)
            | LadderError::Config(info) => info,
        }
    }

    /// Shorthand for a structural inconsistency error.
    pub fn structure(code: &str, message: impl Into<String>) -> Self {
        LadderError::Structure(ErrorInfo::new(code, message))
    }
}
