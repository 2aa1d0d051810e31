use std::fmt::{self, Display};

use gsw_core::errors::{ErrorInfo, GswError};
use gsw_grid::JobId;
use serde::{Deserialize, Serialize};

/// Lifecycle of a job: `Pending -> Provisioning -> Running -> {Succeeded, Failed}`.
///
/// Provisioning may also go straight to `Failed`. Terminal states are final.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum JobState {
    /// Not dispatched yet.
    Pending,
    /// Job directory and sub-slots are being created.
    Provisioning,
    /// Generator and stages are executing.
    Running,
    /// Every invocation exited successfully.
    Succeeded,
    /// Provisioning failed or at least one invocation did not succeed.
    Failed,
}

impl JobState {
    /// True for states a job never leaves.
    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Succeeded | JobState::Failed)
    }

    /// Whether `next` is a legal successor of `self`.
    pub fn can_advance_to(self, next: JobState) -> bool {
        use JobState::*;
        matches!(
            (self, next),
            (Pending, Provisioning)
                | (Provisioning, Running)
                | (Provisioning, Failed)
                | (Running, Succeeded)
                | (Running, Failed)
        )
    }
}

impl Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            JobState::Pending => "pending",
            JobState::Provisioning => "provisioning",
            JobState::Running => "running",
            JobState::Succeeded => "succeeded",
            JobState::Failed => "failed",
        };
        f.write_str(label)
    }
}

/// Tracks and logs the state of one job as a worker drives it.
#[derive(Debug)]
pub struct JobTracker {
    id: JobId,
    state: JobState,
}

impl JobTracker {
    /// Tracker for a job that has not started.
    pub fn new(id: JobId) -> Self {
        Self {
            id,
            state: JobState::Pending,
        }
    }

    /// Current state.
    pub fn state(&self) -> JobState {
        self.state
    }

    /// Moves to `next`, rejecting transitions the lifecycle does not allow.
    pub fn advance(&mut self, next: JobState) -> Result<(), GswError> {
        if !self.state.can_advance_to(next) {
            return Err(GswError::Configuration(
                ErrorInfo::new("gsw_orch.bad_transition", "illegal job state transition")
                    .with_context("job", self.id.to_string())
                    .with_context("from", self.state.to_string())
                    .with_context("to", next.to_string()),
            ));
        }
        match next {
            JobState::Failed => {
                tracing::warn!(job = %self.id, from = %self.state, to = %next, "job transition")
            }
            _ => tracing::info!(job = %self.id, from = %self.state, to = %next, "job transition"),
        }
        self.state = next;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker() -> JobTracker {
        JobTracker::new(JobId::new("n50_b0.5").unwrap())
    }

    #[test]
    fn happy_path_is_accepted() {
        let mut t = tracker();
        for next in [JobState::Provisioning, JobState::Running, JobState::Succeeded] {
            t.advance(next).unwrap();
        }
        assert!(t.state().is_terminal());
    }

    #[test]
    fn provisioning_failure_is_terminal() {
        let mut t = tracker();
        t.advance(JobState::Provisioning).unwrap();
        t.advance(JobState::Failed).unwrap();
        assert!(t.advance(JobState::Running).is_err());
        assert!(t.advance(JobState::Succeeded).is_err());
    }

    #[test]
    fn running_cannot_be_skipped() {
        let mut t = tracker();
        let err = t.advance(JobState::Running).unwrap_err();
        assert_eq!(err.info().code, "gsw_orch.bad_transition");
        assert_eq!(t.state(), JobState::Pending);
    }
}
