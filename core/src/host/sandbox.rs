//! In-memory host
//!
//! `Sandbox` implements every host trait over plain maps so the engine can be
//! driven without a game: the tests use it for end-to-end scenarios and the
//! CLI exposes it as an interactive playground.
//!
//! Mutations emit notifications to whoever subscribed to the touched source,
//! queued until the engine's frame loop drains them. Item records are never deleted,
//! only detached, so late introspection of a consumed item still works.

use std::collections::{BTreeMap, VecDeque};
use std::time::Duration;

use hashbrown::{HashMap, HashSet};

use stashbuff_types::{BuffId, ItemTypeId};

use super::{
    BuffCatalog, BuffInstance, BuffTemplate, ChangeFeed, ChangeKind, Clock, DurationOverride,
    FrameLoop, HostError, HostSignal, InventoryId, ItemId, Notification, PERSISTENT_LIFETIME,
    SignalSource, SlotId, StatusEffects, SubscriptionId, World,
};

/// Game time advanced by one frame
pub const FRAME_TIME: Duration = Duration::from_micros(16_667);

/// Where an item currently sits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Parent {
    Inventory { inventory: InventoryId, index: usize },
    Slot(SlotId),
}

#[derive(Debug, Clone)]
struct SandboxItem {
    type_id: ItemTypeId,
    stack: u32,
    /// Child slots (containers only)
    slots: Vec<SlotId>,
    parent: Option<Parent>,
}

#[derive(Debug, Clone)]
struct SandboxSlot {
    key: String,
    content: Option<ItemId>,
}

#[derive(Debug, Clone)]
struct SandboxPlayer {
    inventory: InventoryId,
    /// `None` until `load_player_slots`
    slots: Option<Vec<(String, SlotId)>>,
}

/// Call counters for assertions
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SandboxStats {
    pub add_calls: usize,
    pub remove_calls: usize,
}

/// In-memory host world
#[derive(Debug, Default)]
pub struct Sandbox {
    next_id: u64,
    items: HashMap<ItemId, SandboxItem>,
    inventories: HashMap<InventoryId, Vec<Option<ItemId>>>,
    slots: HashMap<SlotId, SandboxSlot>,
    player: Option<SandboxPlayer>,
    pet_inventory: Option<InventoryId>,

    buffs: Vec<BuffInstance>,
    templates: Vec<BuffTemplate>,
    usage_grants: HashMap<ItemTypeId, Vec<BuffId>>,
    rejected_buffs: HashSet<BuffId>,
    locked_buffs: HashSet<BuffId>,
    duration_fields_missing: bool,

    /// Ordered so delivery is deterministic
    subscriptions: BTreeMap<SubscriptionId, SignalSource>,
    pending: VecDeque<HostSignal>,

    clock: Duration,
    stats: SandboxStats,
}

impl Sandbox {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    // ─── World construction ─────────────────────────────────────────────────

    /// Spawn the player with an empty root inventory
    pub fn spawn_player(&mut self, capacity: usize) -> InventoryId {
        let inventory = self.create_inventory(capacity);
        self.player = Some(SandboxPlayer {
            inventory,
            slots: None,
        });
        inventory
    }

    /// Finish loading the player's named equipment slots
    pub fn load_player_slots(&mut self, names: &[&str]) -> Result<Vec<SlotId>, HostError> {
        let ids: Vec<SlotId> = names.iter().map(|name| self.create_slot(name)).collect();
        let player = self.player.as_mut().ok_or(HostError::NoPlayer)?;
        player.slots = Some(
            names
                .iter()
                .map(|n| n.to_string())
                .zip(ids.iter().copied())
                .collect(),
        );
        Ok(ids)
    }

    pub fn spawn_pet(&mut self, capacity: usize) -> InventoryId {
        let inventory = self.create_inventory(capacity);
        self.pet_inventory = Some(inventory);
        inventory
    }

    pub fn create_inventory(&mut self, capacity: usize) -> InventoryId {
        let id = InventoryId(self.next_id());
        self.inventories.insert(id, vec![None; capacity]);
        id
    }

    fn create_slot(&mut self, key: &str) -> SlotId {
        let id = SlotId(self.next_id());
        self.slots.insert(
            id,
            SandboxSlot {
                key: key.to_string(),
                content: None,
            },
        );
        id
    }

    /// Create a loose item stack
    pub fn create_item(&mut self, type_id: ItemTypeId, stack: u32) -> ItemId {
        let id = ItemId(self.next_id());
        self.items.insert(
            id,
            SandboxItem {
                type_id,
                stack,
                slots: Vec::new(),
                parent: None,
            },
        );
        id
    }

    /// Create an item that holds `slot_count` child slots
    pub fn create_container(&mut self, type_id: ItemTypeId, slot_count: usize) -> ItemId {
        let id = self.create_item(type_id, 1);
        let slots: Vec<SlotId> = (0..slot_count)
            .map(|i| self.create_slot(&format!("slot{i}")))
            .collect();
        if let Some(item) = self.items.get_mut(&id) {
            item.slots = slots;
        }
        id
    }

    /// Child slot `index` of a container
    pub fn container_slot(&self, container: ItemId, index: usize) -> Option<SlotId> {
        self.items.get(&container)?.slots.get(index).copied()
    }

    /// Scene unload: every object and subscription disappears
    pub fn unload_area(&mut self) {
        self.items.clear();
        self.inventories.clear();
        self.slots.clear();
        self.player = None;
        self.pet_inventory = None;
        self.buffs.clear();
        self.subscriptions.clear();
        self.pending.clear();
    }

    // ─── Buff configuration ─────────────────────────────────────────────────

    pub fn register_template(&mut self, template: BuffTemplate) {
        self.templates.push(template);
    }

    /// Buffs the host's own usage behaviour grants for an item type
    pub fn set_usage_grants(&mut self, type_id: ItemTypeId, buffs: Vec<BuffId>) {
        self.usage_grants.insert(type_id, buffs);
    }

    /// Make `add_buff` fail for this id
    pub fn reject_buff(&mut self, id: BuffId) {
        self.rejected_buffs.insert(id);
    }

    /// Make the host refuse to remove a buff
    pub fn lock_buff(&mut self, id: BuffId) {
        self.locked_buffs.insert(id);
    }

    /// Simulate a host build where the duration fields cannot be reached
    pub fn set_duration_fields_missing(&mut self, missing: bool) {
        self.duration_fields_missing = missing;
    }

    // ─── Mutations (emit notifications) ─────────────────────────────────────

    /// Move an item into an inventory position, displacing whatever was there
    pub fn place_in_inventory(
        &mut self,
        inventory: InventoryId,
        index: usize,
        item: ItemId,
    ) -> Result<(), HostError> {
        let capacity = self
            .inventories
            .get(&inventory)
            .map(Vec::len)
            .ok_or(HostError::UnknownHandle {
                kind: "inventory",
                id: inventory.0,
            })?;
        if index >= capacity {
            return Err(HostError::UnknownHandle {
                kind: "inventory index",
                id: index as u64,
            });
        }
        self.require_item(item)?;
        self.detach(item)?;

        let displaced = self.inventories.get_mut(&inventory).and_then(|inv| {
            let old = inv[index].take();
            inv[index] = Some(item);
            old
        });
        if let Some(old) = displaced
            && let Some(old_item) = self.items.get_mut(&old)
        {
            old_item.parent = None;
        }
        if let Some(entry) = self.items.get_mut(&item) {
            entry.parent = Some(Parent::Inventory { inventory, index });
        }
        self.emit(
            SignalSource::Inventory(inventory),
            ChangeKind::InventoryContent { index },
        );
        Ok(())
    }

    /// Move an item into a slot, displacing whatever was there
    pub fn place_in_slot(&mut self, slot: SlotId, item: ItemId) -> Result<(), HostError> {
        if !self.slots.contains_key(&slot) {
            return Err(HostError::UnknownHandle {
                kind: "slot",
                id: slot.0,
            });
        }
        self.require_item(item)?;
        self.detach(item)?;

        let displaced = self
            .slots
            .get_mut(&slot)
            .and_then(|s| s.content.replace(item));
        if let Some(old) = displaced
            && let Some(old_item) = self.items.get_mut(&old)
        {
            old_item.parent = None;
        }
        if let Some(entry) = self.items.get_mut(&item) {
            entry.parent = Some(Parent::Slot(slot));
        }
        self.emit(SignalSource::Slot(slot), ChangeKind::SlotContent);
        Ok(())
    }

    /// Take an item out of wherever it sits
    pub fn detach(&mut self, item: ItemId) -> Result<(), HostError> {
        let parent = self.require_item(item)?.parent;
        match parent {
            None => {}
            Some(Parent::Inventory { inventory, index }) => {
                if let Some(cell) = self
                    .inventories
                    .get_mut(&inventory)
                    .and_then(|inv| inv.get_mut(index))
                {
                    *cell = None;
                }
                self.emit(
                    SignalSource::Inventory(inventory),
                    ChangeKind::InventoryContent { index },
                );
            }
            Some(Parent::Slot(slot)) => {
                if let Some(s) = self.slots.get_mut(&slot) {
                    s.content = None;
                }
                self.emit(SignalSource::Slot(slot), ChangeKind::SlotContent);
            }
        }
        if let Some(entry) = self.items.get_mut(&item) {
            entry.parent = None;
        }
        Ok(())
    }

    /// Change a stack size; fires both stack and tree signals like the game does
    pub fn set_stack(&mut self, item: ItemId, count: u32) -> Result<(), HostError> {
        let entry = self.items.get_mut(&item).ok_or(HostError::UnknownHandle {
            kind: "item",
            id: item.0,
        })?;
        entry.stack = count;
        self.emit(SignalSource::StackCount(item), ChangeKind::StackCount);
        self.emit(SignalSource::ItemTree(item), ChangeKind::ItemTree);
        Ok(())
    }

    /// Use one unit of an item: announce it, apply the vanilla grants, then
    /// shrink the stack (detaching it when empty).
    pub fn use_item(&mut self, item: ItemId) -> Result<(), HostError> {
        let (type_id, stack) = {
            let entry = self.require_item(item)?;
            (entry.type_id, entry.stack)
        };
        self.pending.push_back(HostSignal::ItemUsed { item });

        let granted = self.usage_grants.get(&type_id).cloned().unwrap_or_default();
        for id in granted {
            if let Some(template) = self.templates.iter().find(|t| t.id == id).cloned() {
                self.add_buff(&template)?;
            }
        }

        if stack <= 1 {
            self.set_stack(item, 0)?;
            self.detach(item)
        } else {
            self.set_stack(item, stack - 1)
        }
    }

    /// Advance game time and let limited buffs run out
    pub fn advance(&mut self, dt: Duration) {
        self.clock += dt;
        let secs = dt.as_secs_f32();
        for buff in &mut self.buffs {
            buff.current_lifetime += secs;
        }
        self.buffs
            .retain(|b| !b.limited_lifetime || b.current_lifetime < b.total_lifetime);
    }

    // ─── Signal delivery ────────────────────────────────────────────────────

    pub fn push_signal(&mut self, signal: HostSignal) {
        self.pending.push_back(signal);
    }

    // ─── Inspection ─────────────────────────────────────────────────────────

    pub fn stats(&self) -> SandboxStats {
        self.stats
    }

    pub fn subscription_count(&self) -> usize {
        self.subscriptions.len()
    }

    pub fn is_subscribed(&self, source: SignalSource) -> bool {
        self.subscriptions.values().any(|s| *s == source)
    }

    pub fn slot_key(&self, slot: SlotId) -> Option<&str> {
        self.slots.get(&slot).map(|s| s.key.as_str())
    }

    fn require_item(&self, item: ItemId) -> Result<&SandboxItem, HostError> {
        self.items.get(&item).ok_or(HostError::UnknownHandle {
            kind: "item",
            id: item.0,
        })
    }

    fn emit(&mut self, source: SignalSource, kind: ChangeKind) {
        for (&subscription, _) in self.subscriptions.iter().filter(|(_, s)| **s == source) {
            self.pending
                .push_back(HostSignal::Changed(Notification { subscription, kind }));
        }
    }

    fn source_exists(&self, source: SignalSource) -> bool {
        match source {
            SignalSource::Inventory(id) => self.inventories.contains_key(&id),
            SignalSource::Slot(id) => self.slots.contains_key(&id),
            SignalSource::StackCount(id) | SignalSource::ItemTree(id) => {
                self.items.contains_key(&id)
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Host trait implementations
// ─────────────────────────────────────────────────────────────────────────────

impl World for Sandbox {
    fn player_inventory(&self) -> Option<InventoryId> {
        self.player.as_ref().map(|p| p.inventory)
    }

    fn pet_inventory(&self) -> Option<InventoryId> {
        self.pet_inventory
    }

    fn player_slots(&self) -> Option<Vec<(String, SlotId)>> {
        self.player.as_ref().and_then(|p| p.slots.clone())
    }

    fn inventory_capacity(&self, inventory: InventoryId) -> Option<usize> {
        self.inventories.get(&inventory).map(Vec::len)
    }

    fn inventory_item(&self, inventory: InventoryId, index: usize) -> Option<ItemId> {
        self.inventories.get(&inventory)?.get(index).copied().flatten()
    }

    fn slot_content(&self, slot: SlotId) -> Option<ItemId> {
        self.slots.get(&slot)?.content
    }

    fn item_type(&self, item: ItemId) -> Option<ItemTypeId> {
        self.items.get(&item).map(|i| i.type_id)
    }

    fn stack_count(&self, item: ItemId) -> u32 {
        self.items.get(&item).map(|i| i.stack).unwrap_or(0)
    }

    fn item_slots(&self, item: ItemId) -> Vec<SlotId> {
        self.items
            .get(&item)
            .map(|i| i.slots.clone())
            .unwrap_or_default()
    }

    fn usage_buffs(&self, item: ItemId) -> Vec<BuffId> {
        self.item_type(item)
            .and_then(|t| self.usage_grants.get(&t).cloned())
            .unwrap_or_default()
    }
}

impl ChangeFeed for Sandbox {
    fn subscribe(&mut self, source: SignalSource) -> Result<SubscriptionId, HostError> {
        if !self.source_exists(source) {
            return Err(HostError::StaleSource(source));
        }
        let id = SubscriptionId(self.next_id());
        self.subscriptions.insert(id, source);
        Ok(id)
    }

    fn unsubscribe(&mut self, subscription: SubscriptionId) {
        self.subscriptions.remove(&subscription);
    }
}

impl StatusEffects for Sandbox {
    fn add_buff(&mut self, template: &BuffTemplate) -> Result<(), HostError> {
        self.stats.add_calls += 1;
        if self.player.is_none() {
            return Err(HostError::NoPlayer);
        }
        if self.rejected_buffs.contains(&template.id) {
            return Err(HostError::Rejected {
                id: template.id,
                reason: "rejected by sandbox".to_string(),
            });
        }
        match self.buffs.iter_mut().find(|b| b.id == template.id) {
            // Reapplication refreshes the timer, keeps the fields
            Some(existing) => existing.current_lifetime = 0.0,
            None => self.buffs.push(BuffInstance {
                id: template.id,
                limited_lifetime: template.limited_lifetime,
                total_lifetime: template.total_lifetime,
                current_lifetime: 0.0,
            }),
        }
        Ok(())
    }

    fn remove_buff(&mut self, id: BuffId, _silent: bool) -> Result<(), HostError> {
        self.stats.remove_calls += 1;
        if self.locked_buffs.contains(&id) {
            return Err(HostError::Rejected {
                id,
                reason: "removal refused by sandbox".to_string(),
            });
        }
        let index = self
            .buffs
            .iter()
            .position(|b| b.id == id)
            .ok_or(HostError::BuffNotApplied(id))?;
        self.buffs.remove(index);
        Ok(())
    }

    fn has_buff(&self, id: BuffId) -> bool {
        self.buffs.iter().any(|b| b.id == id)
    }

    fn active_buffs(&self) -> Vec<BuffInstance> {
        self.buffs.clone()
    }
}

impl DurationOverride for Sandbox {
    fn override_duration(&mut self, id: BuffId) -> Result<(), HostError> {
        if self.duration_fields_missing {
            return Err(HostError::DurationFieldsMissing(id));
        }
        let buff = self
            .buffs
            .iter_mut()
            .find(|b| b.id == id)
            .ok_or(HostError::BuffNotApplied(id))?;
        buff.limited_lifetime = false;
        buff.total_lifetime = PERSISTENT_LIFETIME;
        Ok(())
    }

    fn reset_duration(&mut self, id: BuffId, template: &BuffTemplate) -> Result<(), HostError> {
        if self.duration_fields_missing {
            return Err(HostError::DurationFieldsMissing(id));
        }
        let buff = self
            .buffs
            .iter_mut()
            .find(|b| b.id == id)
            .ok_or(HostError::BuffNotApplied(id))?;
        buff.limited_lifetime = template.limited_lifetime;
        buff.total_lifetime = template.total_lifetime;
        Ok(())
    }
}

impl BuffCatalog for Sandbox {
    fn buff_templates(&self) -> Vec<BuffTemplate> {
        self.templates.clone()
    }
}

impl Clock for Sandbox {
    fn now(&self) -> Duration {
        self.clock
    }
}

impl FrameLoop for Sandbox {
    fn drain_signals(&mut self) -> Vec<HostSignal> {
        self.pending.drain(..).collect()
    }

    fn finish_frame(&mut self) {
        self.advance(FRAME_TIME);
    }
}
