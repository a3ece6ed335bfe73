//! Request epochs: discard resolutions that a newer request has superseded.

use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonic counter for one request slot (a store's list, its current item,
/// the session's credential exchange).
///
/// Each issued request takes a fresh epoch. When it resolves, its result is
/// applied only if no later request was issued in the meantime.
#[derive(Debug, Default)]
pub struct RequestEpoch {
    latest: AtomicU64,
}

impl RequestEpoch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issues a new epoch, superseding all earlier ones.
    pub fn begin(&self) -> u64 {
        self.latest.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn is_current(&self, epoch: u64) -> bool {
        self.latest.load(Ordering::SeqCst) == epoch
    }

    /// Supersedes every in-flight request without issuing a new one.
    pub fn invalidate(&self) {
        self.latest.fetch_add(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latest_epoch_is_current() {
        let epoch = RequestEpoch::new();
        let first = epoch.begin();
        assert!(epoch.is_current(first));

        let second = epoch.begin();
        assert!(!epoch.is_current(first));
        assert!(epoch.is_current(second));
    }

    #[test]
    fn test_invalidate_supersedes_in_flight() {
        let epoch = RequestEpoch::new();
        let issued = epoch.begin();
        epoch.invalidate();
        assert!(!epoch.is_current(issued));
    }
}
