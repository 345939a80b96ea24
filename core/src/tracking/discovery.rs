//! Container discovery
//!
//! Finds every container of the target type sitting directly in one of the
//! roots: the player's inventory, the pet's inventory, and the named extra
//! equipment slots. Each tracked container remembers the position it was
//! found at so an owner change can be rescanned in isolation.

use hashbrown::{HashMap, HashSet};
use stashbuff_types::ItemTypeId;

use super::ContainerMonitor;
use crate::host::{
    ChangeFeed, ChangeKind, InventoryId, ItemId, Notification, SignalSource, SlotId,
    SubscriptionId, World,
};

/// Structural position a container was discovered at. Never owning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParentOwner {
    Inventory { inventory: InventoryId, index: usize },
    Slot(SlotId),
}

impl ParentOwner {
    fn is_within(&self, root: RootSource) -> bool {
        match (*self, root) {
            (ParentOwner::Inventory { inventory, .. }, RootSource::Inventory(root)) => {
                inventory == root
            }
            (ParentOwner::Slot(slot), RootSource::Slot(root)) => slot == root,
            _ => false,
        }
    }
}

/// A root we listen on for container arrivals and departures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum RootSource {
    Inventory(InventoryId),
    Slot(SlotId),
}

impl RootSource {
    fn signal_source(self) -> SignalSource {
        match self {
            RootSource::Inventory(id) => SignalSource::Inventory(id),
            RootSource::Slot(id) => SignalSource::Slot(id),
        }
    }
}

/// Membership change produced by a scan
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackedDelta {
    pub added: Vec<ItemId>,
    pub removed: Vec<ItemId>,
}

impl TrackedDelta {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct ContainerDiscovery {
    /// Set by the first full scan; owner changes before that are ignored
    target_id: Option<ItemTypeId>,

    /// The tracked set
    tracked: HashMap<ItemId, ParentOwner>,

    root_subscriptions: HashMap<SubscriptionId, RootSource>,
    subscribed_roots: HashSet<RootSource>,
}

impl ContainerDiscovery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Full scan of every available root. Subscribes to roots that became
    /// available and registers/unregisters containers with the monitor.
    pub fn rescan_all<H: World + ChangeFeed>(
        &mut self,
        host: &mut H,
        monitor: &mut ContainerMonitor,
        target_id: ItemTypeId,
        extra_slot_names: &[String],
    ) -> TrackedDelta {
        self.target_id = Some(target_id);

        let roots = available_roots(host, extra_slot_names);
        for &root in &roots {
            self.subscribe_root(host, root);
        }

        let mut found: HashMap<ItemId, ParentOwner> = HashMap::new();
        for &root in &roots {
            for (container, owner) in scan_root(host, root, target_id) {
                found.entry(container).or_insert(owner);
            }
        }

        let mut delta = TrackedDelta::default();
        let gone: Vec<ItemId> = self
            .tracked
            .keys()
            .filter(|c| !found.contains_key(*c))
            .copied()
            .collect();
        for container in gone {
            self.untrack(host, monitor, container);
            delta.removed.push(container);
        }
        for (container, owner) in found {
            if self.track(host, monitor, container, owner) {
                delta.added.push(container);
            }
        }

        tracing::debug!(
            roots = roots.len(),
            tracked = self.tracked.len(),
            added = delta.added.len(),
            removed = delta.removed.len(),
            "Rescanned containers"
        );
        delta
    }

    /// Recompute membership under one root after its contents changed.
    /// `None` if the notification does not belong to a root subscription.
    pub fn on_owner_changed<H: World + ChangeFeed>(
        &mut self,
        host: &mut H,
        monitor: &mut ContainerMonitor,
        notification: &Notification,
    ) -> Option<TrackedDelta> {
        let root = *self.root_subscriptions.get(&notification.subscription)?;
        let Some(target_id) = self.target_id else {
            return Some(TrackedDelta::default());
        };

        if let RootSource::Inventory(inventory) = root
            && host.inventory_capacity(inventory).is_none()
        {
            tracing::warn!(inventory = inventory.0, "Owner inventory vanished, skipping");
            return Some(TrackedDelta::default());
        }

        let found: HashMap<ItemId, ParentOwner> =
            scan_root(host, root, target_id).into_iter().collect();

        let mut delta = TrackedDelta::default();
        let gone: Vec<ItemId> = self
            .tracked
            .iter()
            .filter(|(c, owner)| owner.is_within(root) && !found.contains_key(*c))
            .map(|(c, _)| *c)
            .collect();
        for container in gone {
            self.untrack(host, monitor, container);
            delta.removed.push(container);
        }
        for (container, owner) in found {
            if self.track(host, monitor, container, owner) {
                delta.added.push(container);
            }
        }

        if !delta.is_empty() {
            let index = match notification.kind {
                ChangeKind::InventoryContent { index } => Some(index),
                _ => None,
            };
            tracing::debug!(
                ?root,
                ?index,
                added = delta.added.len(),
                removed = delta.removed.len(),
                "Owner change altered tracked containers"
            );
        }
        Some(delta)
    }

    /// Untrack everything and drop root subscriptions
    pub fn reset<H: ChangeFeed>(&mut self, host: &mut H, monitor: &mut ContainerMonitor) {
        let containers: Vec<ItemId> = self.tracked.keys().copied().collect();
        for container in containers {
            self.untrack(host, monitor, container);
        }
        for (subscription, _) in self.root_subscriptions.drain() {
            host.unsubscribe(subscription);
        }
        self.subscribed_roots.clear();
        self.target_id = None;
    }

    pub fn owns(&self, subscription: SubscriptionId) -> bool {
        self.root_subscriptions.contains_key(&subscription)
    }

    pub fn tracked(&self) -> impl Iterator<Item = (ItemId, ParentOwner)> + '_ {
        self.tracked.iter().map(|(c, o)| (*c, *o))
    }

    pub fn owner_of(&self, container: ItemId) -> Option<ParentOwner> {
        self.tracked.get(&container).copied()
    }

    pub fn is_tracked(&self, container: ItemId) -> bool {
        self.tracked.contains_key(&container)
    }

    pub fn len(&self) -> usize {
        self.tracked.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracked.is_empty()
    }

    /// Returns true when the container is new to the tracked set
    fn track<H: World + ChangeFeed>(
        &mut self,
        host: &mut H,
        monitor: &mut ContainerMonitor,
        container: ItemId,
        owner: ParentOwner,
    ) -> bool {
        if let Some(existing) = self.tracked.get_mut(&container) {
            // Moved between roots or positions
            *existing = owner;
            return false;
        }
        monitor.add_container(host, container);
        self.tracked.insert(container, owner);
        tracing::debug!(container = container.0, ?owner, "Tracking container");
        true
    }

    fn untrack<H: ChangeFeed>(
        &mut self,
        host: &mut H,
        monitor: &mut ContainerMonitor,
        container: ItemId,
    ) {
        // Unsubscribe before leaving the tracked set
        monitor.remove_container(host, container);
        if self.tracked.remove(&container).is_some() {
            tracing::debug!(container = container.0, "Stopped tracking container");
        }
    }

    fn subscribe_root<H: ChangeFeed>(&mut self, host: &mut H, root: RootSource) {
        if self.subscribed_roots.contains(&root) {
            return;
        }
        match host.subscribe(root.signal_source()) {
            Ok(subscription) => {
                self.root_subscriptions.insert(subscription, root);
                self.subscribed_roots.insert(root);
            }
            Err(e) => tracing::warn!(?root, error = %e, "Failed to subscribe to root"),
        }
    }
}

/// Roots that exist right now; absent sources contribute nothing
fn available_roots(world: &impl World, extra_slot_names: &[String]) -> Vec<RootSource> {
    let mut roots = Vec::new();
    if let Some(inventory) = world.player_inventory() {
        roots.push(RootSource::Inventory(inventory));
    }
    if let Some(inventory) = world.pet_inventory() {
        roots.push(RootSource::Inventory(inventory));
    }
    if let Some(slots) = world.player_slots() {
        for name in extra_slot_names {
            match resolve_slot(&slots, name) {
                Some(slot) => roots.push(RootSource::Slot(slot)),
                None => tracing::debug!(slot = %name, "Extra slot not present on player"),
            }
        }
    }
    roots
}

/// Exact key match first, then case-insensitive
pub(crate) fn resolve_slot(slots: &[(String, SlotId)], name: &str) -> Option<SlotId> {
    slots
        .iter()
        .find(|(key, _)| key == name)
        .or_else(|| slots.iter().find(|(key, _)| key.eq_ignore_ascii_case(name)))
        .map(|(_, id)| *id)
}

/// Direct children of a root whose type is the target
fn scan_root(
    world: &impl World,
    root: RootSource,
    target_id: ItemTypeId,
) -> Vec<(ItemId, ParentOwner)> {
    let is_target = |item: ItemId| world.item_type(item) == Some(target_id);
    match root {
        RootSource::Inventory(inventory) => {
            let capacity = world.inventory_capacity(inventory).unwrap_or(0);
            (0..capacity)
                .filter_map(|index| {
                    world
                        .inventory_item(inventory, index)
                        .filter(|item| is_target(*item))
                        .map(|item| (item, ParentOwner::Inventory { inventory, index }))
                })
                .collect()
        }
        RootSource::Slot(slot) => world
            .slot_content(slot)
            .filter(|item| is_target(*item))
            .map(|item| vec![(item, ParentOwner::Slot(slot))])
            .unwrap_or_default(),
    }
}
