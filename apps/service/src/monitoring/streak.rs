use std::sync::atomic::{AtomicU32, Ordering};

use super::types::Variant;

/// Result of recording one outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreakUpdate {
    /// Streak before this outcome was applied
    pub previous: u32,
    /// Streak after this outcome was applied
    pub current: u32,
}

/// Consecutive-failure counters for one check, one per network variant.
///
/// Counters are only ever touched through atomic operations so overlapping
/// attempts for the same variant never lose an increment or a reset.
#[derive(Debug, Default)]
pub struct FailureStreaks {
    counters: [AtomicU32; 3],
}

impl FailureStreaks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Increment on failure, reset to zero on success
    pub fn record(&self, variant: Variant, success: bool) -> StreakUpdate {
        let counter = &self.counters[variant.index()];
        if success {
            let previous = counter.swap(0, Ordering::AcqRel);
            StreakUpdate { previous, current: 0 }
        } else {
            let previous = counter
                .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| Some(n.saturating_add(1)))
                .unwrap_or_else(|n| n);
            StreakUpdate { previous, current: previous.saturating_add(1) }
        }
    }

    pub fn current(&self, variant: Variant) -> u32 {
        self.counters[variant.index()].load(Ordering::Acquire)
    }
}
