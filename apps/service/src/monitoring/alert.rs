//! Alert hysteresis over failure streaks.
//!
//! Each (check, variant) pair is either quiet or alerting. An alert fires once
//! when a failure pushes the streak to the threshold, and a recovery fires once
//! on the first success after that. Everything in between is silent.

use std::sync::atomic::{AtomicBool, Ordering};

use super::types::Variant;

/// A state change that must be announced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Alert,
    Recovery,
}

#[derive(Debug, Default)]
pub struct AlertState {
    alerting: [AtomicBool; 3],
}

impl AlertState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_alerting(&self, variant: Variant) -> bool {
        self.alerting[variant.index()].load(Ordering::Acquire)
    }

    /// Apply one outcome given the streak it produced.
    ///
    /// The flag is flipped with a compare-exchange, so of several overlapping
    /// attempts only one can win a given transition.
    pub fn observe(
        &self,
        variant: Variant,
        success: bool,
        streak: u32,
        threshold: u32,
    ) -> Option<Transition> {
        let flag = &self.alerting[variant.index()];
        if success {
            flag.compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire)
                .ok()
                .map(|_| Transition::Recovery)
        } else if streak >= threshold {
            flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                .ok()
                .map(|_| Transition::Alert)
        } else {
            None
        }
    }
}
