//! Runtime diagnostics for field debugging.
//!
//! Keeps the most recent refused transitions in a fixed ring so a service
//! tool can see which illegal requests were made and when, plus a lifetime
//! count that does not wrap with the ring.

use heapless::Deque;
use serde::Serialize;

use crate::error::TransitionError;
use crate::fsm::StateId;

/// Ring depth for refused transitions.
pub const REJECTION_RING_SLOTS: usize = 8;

/// One refused transition request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RejectedTransition {
    pub at_ms: u64,
    pub from: StateId,
    pub to: StateId,
}

/// Fixed-capacity log of illegal transition requests.
#[derive(Debug, Default)]
pub struct TransitionLog {
    recent: Deque<RejectedTransition, REJECTION_RING_SLOTS>,
    total: u32,
}

impl TransitionLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a refusal.  Same-state requests are routine and not logged.
    /// Returns `true` if the error was recorded.
    pub fn record(&mut self, err: &TransitionError, at_ms: u64) -> bool {
        let TransitionError::Illegal { from, to } = *err else {
            return false;
        };
        if self.recent.is_full() {
            self.recent.pop_front();
        }
        // Cannot fail: a slot was freed above.
        let _ = self.recent.push_back(RejectedTransition { at_ms, from, to });
        self.total = self.total.saturating_add(1);
        true
    }

    /// Lifetime number of illegal requests.
    pub fn total(&self) -> u32 {
        self.total
    }

    /// Most recent refusals, oldest first.
    pub fn recent(&self) -> impl Iterator<Item = &RejectedTransition> {
        self.recent.iter()
    }

    pub fn last(&self) -> Option<&RejectedTransition> {
        self.recent.back()
    }

    pub fn clear(&mut self) {
        self.recent.clear();
        self.total = 0;
    }
}
