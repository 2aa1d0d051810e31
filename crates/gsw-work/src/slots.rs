use serde::{Deserialize, Serialize};

/// Naming scheme for the replicate directories inside a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotLayout {
    #[serde(default = "SlotLayout::default_prefix")]
    /// Slot name prefix; `sim` by default.
    pub prefix: String,
    #[serde(default = "SlotLayout::default_count")]
    /// Number of sub-slots per job; 3 by default.
    pub count: usize,
}

impl SlotLayout {
    fn default_prefix() -> String {
        "sim".to_string()
    }

    const fn default_count() -> usize {
        3
    }

    /// Layout of `count` slots named `<prefix>1..`.
    pub fn new(prefix: impl Into<String>, count: usize) -> Self {
        Self {
            prefix: prefix.into(),
            count,
        }
    }

    /// Slot names in execution order, numbered from one.
    pub fn names(&self) -> Vec<String> {
        (1..=self.count)
            .map(|idx| format!("{}{}", self.prefix, idx))
            .collect()
    }
}

impl Default for SlotLayout {
    fn default() -> Self {
        Self {
            prefix: Self::default_prefix(),
            count: Self::default_count(),
        }
    }
}
