use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// A cloneable flag requesting that a running workflow stop.
///
/// Workflows poll it between iterations and the process runner polls it while the engine is
/// running, killing the child as soon as cancellation is observed.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}
