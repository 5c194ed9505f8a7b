//! Cooperative cancellation and progress reporting.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Shared flag checked by the solver before each step.
///
/// Clones observe the same flag, so one clone can be handed to a signal
/// handler or another thread while the run holds the other.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Emitted after every completed step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolveProgress {
    pub step: u64,
    pub total_steps: u64,
    pub time_s: f64,
    /// Completed fraction in `[0, 1]`.
    pub fraction: f64,
}
