//! Container tracking
//!
//! This module provides:
//! - **Discovery**: which containers of the target type the player carries
//! - **Monitor**: per-container item counts and the subscriptions behind them
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │        Roots: player inventory · pet inventory · extra slots     │
//! └─────────────────────────────────────────────────────────────────┘
//!                              │
//!              owner change / full rescan (ContainerDiscovery)
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │         Tracked containers (container -> ParentOwner)            │
//! └─────────────────────────────────────────────────────────────────┘
//!                              │
//!           slot / stack / tree signals (ContainerMonitor)
//!                              │
//!                              ▼
//!             snapshot differs by value → "content changed"
//! ```

mod discovery;
mod monitor;

#[cfg(test)]
mod monitor_tests;

pub use discovery::{ContainerDiscovery, ParentOwner, TrackedDelta};
pub use monitor::{AggregatedCounts, ContainerMonitor, ItemCountSnapshot};
