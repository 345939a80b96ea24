//! Container content monitoring
//!
//! For every tracked container the monitor subscribes to each direct child
//! slot, and to the stack-count and subtree signals of every slot item whose
//! type appears in the buff mapping. Subscriptions are kept in a registry
//! keyed by `(container, child)` so teardown is exhaustive.
//!
//! A signal only counts as a change when the recomputed item-count snapshot
//! differs by value from the stored one.

use hashbrown::{HashMap, HashSet};
use stashbuff_types::ItemTypeId;

use crate::host::{ChangeFeed, ItemId, Notification, SignalSource, SlotId, SubscriptionId, World};

/// Last observed `item type -> quantity` for one container
pub type ItemCountSnapshot = HashMap<ItemTypeId, u32>;

/// `item type -> quantity` summed over every tracked container
pub type AggregatedCounts = HashMap<ItemTypeId, u32>;

/// A child of a container we hold a subscription on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum ChildKey {
    Slot(SlotId),
    StackCount(ItemId),
    ItemTree(ItemId),
}

impl ChildKey {
    fn source(self) -> SignalSource {
        match self {
            ChildKey::Slot(slot) => SignalSource::Slot(slot),
            ChildKey::StackCount(item) => SignalSource::StackCount(item),
            ChildKey::ItemTree(item) => SignalSource::ItemTree(item),
        }
    }
}

#[derive(Debug, Default)]
struct TrackedContainer {
    snapshot: ItemCountSnapshot,
    subscriptions: HashMap<ChildKey, SubscriptionId>,
}

#[derive(Debug, Default)]
pub struct ContainerMonitor {
    /// Item types that participate in the buff mapping
    relevant_types: HashSet<ItemTypeId>,

    containers: HashMap<ItemId, TrackedContainer>,

    /// Reverse index: subscription -> owning container and child
    routes: HashMap<SubscriptionId, (ItemId, ChildKey)>,
}

impl ContainerMonitor {
    pub fn new(relevant_types: impl IntoIterator<Item = ItemTypeId>) -> Self {
        Self {
            relevant_types: relevant_types.into_iter().collect(),
            ..Self::default()
        }
    }

    /// Start monitoring a container. Returns false if it was already tracked.
    pub fn add_container<H: World + ChangeFeed>(&mut self, host: &mut H, container: ItemId) -> bool {
        if self.containers.contains_key(&container) {
            return false;
        }
        let snapshot = count_items(host, container);
        self.containers.insert(
            container,
            TrackedContainer {
                snapshot,
                subscriptions: HashMap::new(),
            },
        );
        self.update_child_subscriptions(host, container);
        true
    }

    /// Drop every subscription of a container, then forget it
    pub fn remove_container<H: ChangeFeed>(&mut self, host: &mut H, container: ItemId) -> bool {
        let Some(tracked) = self.containers.remove(&container) else {
            return false;
        };
        for (_, subscription) in tracked.subscriptions {
            host.unsubscribe(subscription);
            self.routes.remove(&subscription);
        }
        true
    }

    /// Forget all containers with full unsubscription
    pub fn reset<H: ChangeFeed>(&mut self, host: &mut H) {
        let containers: Vec<ItemId> = self.containers.keys().copied().collect();
        for container in containers {
            self.remove_container(host, container);
        }
        self.routes.clear();
    }

    /// Resubscribe and re-snapshot everything. True if any snapshot changed.
    pub fn refresh_all<H: World + ChangeFeed>(&mut self, host: &mut H) -> bool {
        let containers: Vec<ItemId> = self.containers.keys().copied().collect();
        let mut changed = false;
        for container in containers {
            self.update_child_subscriptions(host, container);
            changed |= self.check_and_update_snapshot(host, container);
        }
        changed
    }

    /// Route a notification. `None` if the subscription is not ours,
    /// otherwise whether the owning container's contents really changed.
    pub fn handle_notification<H: World + ChangeFeed>(
        &mut self,
        host: &mut H,
        notification: &Notification,
    ) -> Option<bool> {
        let &(container, key) = self.routes.get(&notification.subscription)?;

        // A slot swap means the item under it changed identity
        if matches!(key, ChildKey::Slot(_)) {
            self.update_child_subscriptions(host, container);
        }
        let changed = self.check_and_update_snapshot(host, container);
        if changed {
            tracing::debug!(container = container.0, ?key, "Container contents changed");
        }
        Some(changed)
    }

    pub fn owns(&self, subscription: SubscriptionId) -> bool {
        self.routes.contains_key(&subscription)
    }

    /// Recount every tracked container from live host state
    pub fn total_item_counts(&self, world: &impl World) -> AggregatedCounts {
        let mut totals = AggregatedCounts::new();
        for &container in self.containers.keys() {
            for (item_type, count) in count_items(world, container) {
                *totals.entry(item_type).or_insert(0) += count;
            }
        }
        totals
    }

    pub fn snapshot(&self, container: ItemId) -> Option<&ItemCountSnapshot> {
        self.containers.get(&container).map(|c| &c.snapshot)
    }

    pub fn contains(&self, container: ItemId) -> bool {
        self.containers.contains_key(&container)
    }

    pub fn len(&self) -> usize {
        self.containers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.containers.is_empty()
    }

    /// Live subscriptions held for containers
    pub fn subscription_count(&self) -> usize {
        self.routes.len()
    }

    fn check_and_update_snapshot(&mut self, world: &impl World, container: ItemId) -> bool {
        let Some(tracked) = self.containers.get_mut(&container) else {
            return false;
        };
        let counts = count_items(world, container);
        if counts == tracked.snapshot {
            return false;
        }
        tracked.snapshot = counts;
        true
    }

    /// Bring a container's child subscriptions in line with its current slots
    fn update_child_subscriptions<H: World + ChangeFeed>(&mut self, host: &mut H, container: ItemId) {
        let Some(tracked) = self.containers.get_mut(&container) else {
            return;
        };

        let mut wanted: HashSet<ChildKey> = HashSet::new();
        for slot in host.item_slots(container) {
            wanted.insert(ChildKey::Slot(slot));
            let Some(item) = host.slot_content(slot) else {
                continue;
            };
            if host
                .item_type(item)
                .is_some_and(|t| self.relevant_types.contains(&t))
            {
                wanted.insert(ChildKey::StackCount(item));
                wanted.insert(ChildKey::ItemTree(item));
            }
        }

        let stale: Vec<ChildKey> = tracked
            .subscriptions
            .keys()
            .filter(|key| !wanted.contains(*key))
            .copied()
            .collect();
        for key in stale {
            if let Some(subscription) = tracked.subscriptions.remove(&key) {
                host.unsubscribe(subscription);
                self.routes.remove(&subscription);
            }
        }

        for key in wanted {
            if tracked.subscriptions.contains_key(&key) {
                continue;
            }
            match host.subscribe(key.source()) {
                Ok(subscription) => {
                    tracked.subscriptions.insert(key, subscription);
                    self.routes.insert(subscription, (container, key));
                }
                Err(e) => {
                    tracing::warn!(container = container.0, ?key, error = %e, "Subscribe failed");
                }
            }
        }
    }
}

/// Sum stack counts of a container's direct slot contents
fn count_items(world: &impl World, container: ItemId) -> ItemCountSnapshot {
    let mut counts = ItemCountSnapshot::new();
    for slot in world.item_slots(container) {
        let Some(item) = world.slot_content(slot) else {
            continue;
        };
        let Some(item_type) = world.item_type(item) else {
            continue;
        };
        *counts.entry(item_type).or_insert(0) += world.stack_count(item);
    }
    counts
}
