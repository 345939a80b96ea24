//! Buff bookkeeping
//!
//! - **reconciler**: coalesces change signals into passes and queues actions
//! - **manager**: applies and removes buffs on the host, conflict-aware
//! - **conflicts**: static superior/inferior pairs and priority ordering
//! - **usage**: last consumption, to tell player use from stash withdrawal

pub mod conflicts;
mod manager;
mod reconciler;
mod usage;

#[cfg(test)]
mod manager_tests;
#[cfg(test)]
mod reconciler_tests;

pub use manager::{BuffHost, BuffManager, BuffState, RemovalCause};
pub use reconciler::{BuffAction, BuffReconciler, PassState, PassSummary, derive_desired};
pub use usage::{CONSUMPTION_WINDOW, RecentUsage};
