//! The single piece of state shared between the watchdog and the
//! generator.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A one-way cancellation flag.  Cloning gives another handle to the
/// same flag; a fresh run should start from `StopSignal::new()`.
/// Once set it stays set.
#[derive(Clone, Debug, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    /// A new, clear signal.
    pub fn new() -> Self {
        StopSignal(Arc::new(AtomicBool::new(false)))
    }

    /// Raise the signal.  Returns true if this call was the one that
    /// raised it.
    pub fn set(&self) -> bool {
        !self.0.swap(true, Ordering::AcqRel)
    }

    /// Has anyone raised the signal yet?
    #[inline]
    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}
