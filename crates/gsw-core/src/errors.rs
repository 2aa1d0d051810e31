//! Structured error types shared across gridsweep crates.

use std::collections::BTreeMap;
use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Stable code attached to provisioning errors raised for an existing job directory.
pub const ALREADY_EXISTS_CODE: &str = "gsw_work.already_exists";

/// Structured payload attached to every [`GswError`] variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Stable machine readable error code.
    pub code: String,
    /// Human readable diagnostic message.
    pub message: String,
    /// Contextual key value pairs (identifiers, paths, etc.).
    #[serde(default)]
    pub context: BTreeMap<String, String>,
    /// Optional hint that may help the caller resolve the issue.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl ErrorInfo {
    /// Creates a new error payload with the provided code and message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            context: BTreeMap::new(),
            hint: None,
        }
    }

    /// Adds a context entry to the payload.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Sets a human readable hint for remediation.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

/// Canonical error type for gridsweep campaigns.
///
/// `Configuration` errors are fatal and raised before any job is dispatched.
/// `Provisioning` and `Stage` errors are scoped to a single job and are folded
/// into that job's outcome by the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(tag = "family", content = "detail")]
pub enum GswError {
    /// Invalid grid schema, identifier collision or malformed plan.
    #[error("configuration error: {0}")]
    Configuration(ErrorInfo),
    /// Job directory creation, template copy or manifest failures.
    #[error("provisioning error: {0}")]
    Provisioning(ErrorInfo),
    /// Non-zero exit or spawn failure of an external process.
    #[error("stage failure: {0}")]
    Stage(ErrorInfo),
    /// Operator cancellation.
    #[error("interrupted: {0}")]
    Interrupted(ErrorInfo),
    /// Serialization, schema and report IO errors.
    #[error("serde error: {0}")]
    Serde(ErrorInfo),
}

impl Display for ErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code: {})", self.message, self.code)?;
        if !self.context.is_empty() {
            write!(f, " | context: [")?;
            for (idx, (key, value)) in self.context.iter().enumerate() {
                if idx > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{key}={value}")?;
            }
            write!(f, "]")?;
        }
        if let Some(hint) = &self.hint {
            write!(f, " | hint: {hint}")?;
        }
        Ok(())
    }
}

impl GswError {
    /// Shorthand for a configuration error.
    pub fn config(code: impl Into<String>, message: impl Into<String>) -> Self {
        GswError::Configuration(ErrorInfo::new(code, message))
    }

    /// Shorthand for a provisioning error.
    pub fn provisioning(code: impl Into<String>, message: impl Into<String>) -> Self {
        GswError::Provisioning(ErrorInfo::new(code, message))
    }

    /// Shorthand for a serde/IO error.
    pub fn serde(code: impl Into<String>, message: impl Into<String>) -> Self {
        GswError::Serde(ErrorInfo::new(code, message))
    }

    /// Returns a reference to the payload describing the error.
    pub fn info(&self) -> &ErrorInfo {
        match self {
            GswError::Configuration(info)
            | GswError::Provisioning(info)
            | GswError::Stage(info)
            | GswError::Interrupted(info)
            | GswError::Serde(info) => info,
        }
    }

    /// True when the error reports a job directory that already exists.
    pub fn is_already_exists(&self) -> bool {
        matches!(self, GswError::Provisioning(info) if info.code == ALREADY_EXISTS_CODE)
    }

    /// True for errors that abort the whole campaign before dispatch.
    pub fn is_fatal(&self) -> bool {
        matches!(self, GswError::Configuration(_) | GswError::Interrupted(_))
    }
}
