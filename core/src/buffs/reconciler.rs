//! Reconciliation passes
//!
//! Any number of content-change signals within one tick collapse into a
//! single pass at end of tick. A pass compares the buffs the stash totals call
//! for against the engine-owned set and queues the difference; the queue is
//! drained one action per tick so the host never sees a burst.

use std::collections::{BTreeSet, VecDeque};

use stashbuff_types::BuffId;

use super::conflicts;
use crate::config::BuffConfig;
use crate::tracking::AggregatedCounts;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuffAction {
    Add(BuffId),
    Remove(BuffId),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PassState {
    #[default]
    Idle,
    PassScheduled,
}

/// What one pass decided
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassSummary {
    pub desired: BTreeSet<BuffId>,
    pub adds: usize,
    pub removes: usize,
}

#[derive(Debug, Default)]
pub struct BuffReconciler {
    state: PassState,
    queue: VecDeque<BuffAction>,

    // Counters
    passes_run: u64,
    requests_coalesced: u64,
}

impl BuffReconciler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule a pass for end of tick. False when one is already scheduled.
    pub fn request_pass(&mut self) -> bool {
        match self.state {
            PassState::Idle => {
                self.state = PassState::PassScheduled;
                true
            }
            PassState::PassScheduled => {
                self.requests_coalesced += 1;
                false
            }
        }
    }

    /// Consume the scheduled flag, returning to `Idle`
    pub fn take_scheduled(&mut self) -> bool {
        let scheduled = self.state == PassState::PassScheduled;
        self.state = PassState::Idle;
        scheduled
    }

    /// Replace the queue with the actions that move `active` to what `counts`
    /// call for. Adds go out in priority order, removes in reverse priority.
    pub fn run_pass(
        &mut self,
        counts: &AggregatedCounts,
        config: &BuffConfig,
        active: &BTreeSet<BuffId>,
    ) -> PassSummary {
        self.queue.clear();
        self.passes_run += 1;

        let desired = derive_desired(counts, config);

        let adds = conflicts::priority_order(desired.difference(active).copied());
        let mut removes = conflicts::priority_order(active.difference(&desired).copied());
        removes.reverse();

        self.queue.extend(adds.iter().copied().map(BuffAction::Add));
        self.queue.extend(removes.iter().copied().map(BuffAction::Remove));

        tracing::debug!(
            pass = self.passes_run,
            ?desired,
            adds = adds.len(),
            removes = removes.len(),
            "Reconciliation pass"
        );

        PassSummary {
            desired,
            adds: adds.len(),
            removes: removes.len(),
        }
    }

    pub fn next_action(&mut self) -> Option<BuffAction> {
        self.queue.pop_front()
    }

    pub fn pending(&self) -> impl Iterator<Item = &BuffAction> {
        self.queue.iter()
    }

    pub fn pending_len(&self) -> usize {
        self.queue.len()
    }

    /// Drop queued work and any scheduled pass
    pub fn clear(&mut self) {
        self.queue.clear();
        self.state = PassState::Idle;
    }

    pub fn state(&self) -> PassState {
        self.state
    }

    pub fn passes_run(&self) -> u64 {
        self.passes_run
    }

    pub fn requests_coalesced(&self) -> u64 {
        self.requests_coalesced
    }
}

/// Buffs granted by every mapped item type whose stash total meets the
/// configured threshold
pub fn derive_desired(counts: &AggregatedCounts, config: &BuffConfig) -> BTreeSet<BuffId> {
    let required = config.settings.required_item_count;
    counts
        .iter()
        .filter(|(_, total)| **total >= required)
        .filter_map(|(item_type, _)| config.buffs_for(*item_type))
        .flatten()
        .copied()
        .collect()
}
