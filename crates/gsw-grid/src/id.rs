use std::fmt::{self, Display};

use gsw_core::errors::{ErrorInfo, GswError};
use serde::{Deserialize, Serialize};

/// Stable identifier of a job, also used as its directory name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    /// Wraps a string after checking it is usable as a single path component.
    pub fn new(raw: impl Into<String>) -> Result<Self, GswError> {
        let raw = raw.into();
        validate_component(&raw, "job identifier")?;
        Ok(Self(raw))
    }

    /// The identifier text, also the job's directory name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for JobId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Rejects names that would escape or alias a directory.
pub(crate) fn validate_component(raw: &str, what: &str) -> Result<(), GswError> {
    let bad = raw.is_empty()
        || raw == "."
        || raw == ".."
        || raw.contains(['/', '\\', '\0'])
        || raw.trim() != raw;
    if bad {
        return Err(GswError::Configuration(
            ErrorInfo::new("gsw_grid.bad_name", format!("{what} is not a valid path component"))
                .with_context("value", raw.to_string()),
        ));
    }
    Ok(())
}
