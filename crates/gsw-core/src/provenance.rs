//! Provenance descriptor attached to campaign reports.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Provenance information attached to every persisted report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct RunProvenance {
    /// Hash of the campaign plan that produced the run.
    pub plan_hash: String,
    /// ISO-8601 timestamp recording when the report was generated.
    pub created_at: String,
    /// Version map for all tools involved in the run.
    pub tool_versions: BTreeMap<String, String>,
}
