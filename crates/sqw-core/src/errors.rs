//! Error values raised by every sqw crate.
//!
//! All failures carry an [`ErrorInfo`] with a stable kebab-case `code`, so
//! callers and tests can match on the code rather than on message wording.
//! The enclosing [`SqwError`] variant names the subsystem that failed.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Code, message and diagnostics of a single failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Stable kebab-case identifier, e.g. `nyquist-violation`.
    pub code: String,
    /// Diagnostic sentence.
    pub message: String,
    /// Offending values keyed by parameter name.
    #[serde(default)]
    pub context: BTreeMap<String, String>,
    /// Suggested remedy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl ErrorInfo {
    /// Payload with no context and no hint.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            context: BTreeMap::new(),
            hint: None,
        }
    }

    /// Records `key = value`, replacing an earlier value for `key`.
    pub fn with_context(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.context.insert(key.into(), value.to_string());
        self
    }

    /// Attaches a remedy.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    /// Value recorded under `key`, if any.
    pub fn context_value(&self, key: &str) -> Option<&str> {
        self.context.get(key).map(String::as_str)
    }
}

impl fmt::Display for ErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)?;
        let mut entries = self.context.iter();
        if let Some((key, value)) = entries.next() {
            write!(f, " ({key}={value}")?;
            for (key, value) in entries {
                write!(f, ", {key}={value}")?;
            }
            write!(f, ")")?;
        }
        match &self.hint {
            Some(hint) => write!(f, "; hint: {hint}"),
            None => Ok(()),
        }
    }
}

/// Failure raised by the structure-factor engine, tagged by subsystem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(tag = "family", content = "detail")]
pub enum SqwError {
    /// Rejected construction options: modes, observables, frequency range.
    #[error("config: {0}")]
    Config(ErrorInfo),
    /// Malformed request against accumulated correlations.
    #[error("query: {0}")]
    Query(ErrorInfo),
    /// Inconsistent crystal or lattice description.
    #[error("lattice: {0}")]
    Lattice(ErrorInfo),
    /// Integrator or sampler failure.
    #[error("dynamics: {0}")]
    Dynamics(ErrorInfo),
    /// Snapshot encoding, decoding or integrity failure.
    #[error("serde: {0}")]
    Serde(ErrorInfo),
}

impl SqwError {
    /// Payload shared by every variant.
    pub fn info(&self) -> &ErrorInfo {
        match self {
            Self::Config(info)
            | Self::Query(info)
            | Self::Lattice(info)
            | Self::Dynamics(info)
            | Self::Serde(info) => info,
        }
    }

    /// Stable error code.
    pub fn code(&self) -> &str {
        &self.info().code
    }

    /// Subsystem name, matching the serialized `family` tag.
    pub fn family(&self) -> &'static str {
        match self {
            Self::Config(_) => "Config",
            Self::Query(_) => "Query",
            Self::Lattice(_) => "Lattice",
            Self::Dynamics(_) => "Dynamics",
            Self::Serde(_) => "Serde",
        }
    }
}
