//! Single-flight guard for debt calculations
//!
//! At most one calculation runs per guard. A second caller does not wait; it
//! is told the guard is busy and returns. The flag is released when the
//! returned permit is dropped, so errors and panics cannot wedge the guard.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
pub struct RunGuard {
    running: Arc<AtomicBool>,
}

/// Proof of exclusive access; releases the guard on drop
#[derive(Debug)]
pub struct RunPermit {
    running: Arc<AtomicBool>,
}

impl RunGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the guard, or `None` if a run is already in flight
    pub fn try_acquire(&self) -> Option<RunPermit> {
        self.running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| RunPermit {
                running: self.running.clone(),
            })
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }
}

impl Drop for RunPermit {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Release);
    }
}
