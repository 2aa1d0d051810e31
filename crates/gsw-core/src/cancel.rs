use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared flag raised when the operator interrupts a campaign.
///
/// Clones observe the same flag, so one handle can be given to a signal
/// handler while workers poll the others.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    /// Creates a token that has not been cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Returns true once cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}
