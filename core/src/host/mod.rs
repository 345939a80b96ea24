//! Host boundary
//!
//! The engine never owns game objects. It sees the host through a handful of
//! narrow traits and refers to objects by opaque handles:
//!
//! ```text
//! ┌───────────────┐  World (read-only graph)   ┌──────────────────────────┐
//! │               │ ─────────────────────────▶ │                          │
//! │     host      │  ChangeFeed, FrameLoop     │          engine          │
//! │ (game / sim)  │ ─────────────────────────▶ │  discovery ─▶ monitor    │
//! │               │  StatusEffects +           │      reconciler ─▶ mgr   │
//! │               │ ◀───────────────────────── │                          │
//! └───────────────┘  DurationOverride          └──────────────────────────┘
//! ```
//!
//! `DurationOverride` is the one privileged back-door into otherwise private
//! host state; nothing else in the engine mutates buff fields.

mod error;
pub mod sandbox;
mod signal;

use std::time::Duration;

use stashbuff_types::{BuffId, ItemTypeId};

pub use error::HostError;
pub use sandbox::Sandbox;
pub use signal::{AreaInfo, HostSignal};

/// Lifetime written by the persistent override
pub const PERSISTENT_LIFETIME: f32 = 999_999.0;

/// Any unlimited instance with a total lifetime above this is the override
pub const PERSISTENT_THRESHOLD: f32 = 900_000.0;

// ─────────────────────────────────────────────────────────────────────────────
// Handles
// ─────────────────────────────────────────────────────────────────────────────

/// Identity of an item instance (not its type)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InventoryId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotId(pub u64);

/// Token returned by `ChangeFeed::subscribe`, echoed on every notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(pub u64);

// ─────────────────────────────────────────────────────────────────────────────
// Buffs
// ─────────────────────────────────────────────────────────────────────────────

/// Host buff prefab, carrying the template duration fields
#[derive(Debug, Clone, PartialEq)]
pub struct BuffTemplate {
    pub id: BuffId,
    pub name: String,
    pub limited_lifetime: bool,
    /// Seconds
    pub total_lifetime: f32,
}

impl BuffTemplate {
    /// Used when a template is missing at duration-reset time
    pub fn fallback(id: BuffId) -> Self {
        Self {
            id,
            name: String::new(),
            limited_lifetime: true,
            total_lifetime: 60.0,
        }
    }
}

/// A live buff on the player
#[derive(Debug, Clone, PartialEq)]
pub struct BuffInstance {
    pub id: BuffId,
    pub limited_lifetime: bool,
    pub total_lifetime: f32,
    /// Seconds since the buff was applied or last refreshed
    pub current_lifetime: f32,
}

impl BuffInstance {
    /// True when this instance carries the engine's persistent override
    pub fn is_persistent_override(&self) -> bool {
        !self.limited_lifetime && self.total_lifetime > PERSISTENT_THRESHOLD
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Change notifications
// ─────────────────────────────────────────────────────────────────────────────

/// Something the engine can subscribe to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignalSource {
    /// Any slot of an inventory changed content
    Inventory(InventoryId),
    /// A slot's content was replaced
    Slot(SlotId),
    /// An item's stack count changed
    StackCount(ItemId),
    /// Anything below an item changed
    ItemTree(ItemId),
}

/// What fired
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    InventoryContent { index: usize },
    SlotContent,
    StackCount,
    ItemTree,
}

/// A fired subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Notification {
    pub subscription: SubscriptionId,
    pub kind: ChangeKind,
}

// ─────────────────────────────────────────────────────────────────────────────
// Traits
// ─────────────────────────────────────────────────────────────────────────────

/// Read-only view of the host object graph.
///
/// Every accessor answers `None` for objects that are not loaded yet or no
/// longer exist; the engine treats that as absence, never as an error.
pub trait World {
    /// The player's root inventory
    fn player_inventory(&self) -> Option<InventoryId>;

    /// The pet's inventory
    fn pet_inventory(&self) -> Option<InventoryId>;

    /// Named equipment slots on the player, `None` until they are loaded
    fn player_slots(&self) -> Option<Vec<(String, SlotId)>>;

    fn inventory_capacity(&self, inventory: InventoryId) -> Option<usize>;

    fn inventory_item(&self, inventory: InventoryId, index: usize) -> Option<ItemId>;

    fn slot_content(&self, slot: SlotId) -> Option<ItemId>;

    fn item_type(&self, item: ItemId) -> Option<ItemTypeId>;

    fn stack_count(&self, item: ItemId) -> u32;

    /// Direct child slots of an item (empty for plain items)
    fn item_slots(&self, item: ItemId) -> Vec<SlotId>;

    /// Buffs the host's own usage behaviour grants when this item is used
    fn usage_buffs(&self, item: ItemId) -> Vec<BuffId>;
}

/// Change signal registration
pub trait ChangeFeed {
    fn subscribe(&mut self, source: SignalSource) -> Result<SubscriptionId, HostError>;

    /// Unknown ids are ignored
    fn unsubscribe(&mut self, subscription: SubscriptionId);
}

/// The host's status-effect system on the player
pub trait StatusEffects {
    fn add_buff(&mut self, template: &BuffTemplate) -> Result<(), HostError>;

    fn remove_buff(&mut self, id: BuffId, silent: bool) -> Result<(), HostError>;

    fn has_buff(&self, id: BuffId) -> bool;

    fn active_buffs(&self) -> Vec<BuffInstance>;

    fn find_buff(&self, id: BuffId) -> Option<BuffInstance> {
        self.active_buffs().into_iter().find(|b| b.id == id)
    }
}

/// Privileged mutation of a live buff's duration fields
pub trait DurationOverride {
    /// Mark the live instance unlimited with `PERSISTENT_LIFETIME`
    fn override_duration(&mut self, id: BuffId) -> Result<(), HostError>;

    /// Restore both duration fields from the template
    fn reset_duration(&mut self, id: BuffId, template: &BuffTemplate) -> Result<(), HostError>;
}

/// Source of buff prefabs for the prefab cache
pub trait BuffCatalog {
    fn buff_templates(&self) -> Vec<BuffTemplate>;
}

/// Game time
pub trait Clock {
    fn now(&self) -> Duration;
}

/// Host side of the frame loop
pub trait FrameLoop {
    /// Signals queued since the last drain, in delivery order
    fn drain_signals(&mut self) -> Vec<HostSignal>;

    /// Close the frame: advance game time and expire timed buffs
    fn finish_frame(&mut self);
}

/// Everything the engine needs from its host
pub trait Host: World + ChangeFeed + StatusEffects + DurationOverride + BuffCatalog + Clock {}

impl<T> Host for T where T: World + ChangeFeed + StatusEffects + DurationOverride + BuffCatalog + Clock {}

#[cfg(test)]
mod tests {
    use super::*;

    fn instance(limited: bool, total: f32) -> BuffInstance {
        BuffInstance {
            id: 1011,
            limited_lifetime: limited,
            total_lifetime: total,
            current_lifetime: 0.0,
        }
    }

    #[test]
    fn test_persistent_override_detection() {
        assert!(instance(false, PERSISTENT_LIFETIME).is_persistent_override());
        assert!(!instance(true, PERSISTENT_LIFETIME).is_persistent_override());
        assert!(!instance(false, 120.0).is_persistent_override());
    }
}
