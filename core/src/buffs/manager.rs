//! Buff manager
//!
//! Owns the set of buffs this engine is responsible for and performs every
//! host-side add and remove. Two rules make it more than a thin wrapper:
//!
//! - **Conflict pairs**: a superior and its inferior are never both visible.
//!   The inferior is kept as `Suppressed` while the superior holds.
//! - **Consumption fall-through**: when a sustained buff is no longer backed
//!   by items, but the player just drank a potion that grants it, the buff is
//!   handed back to the host's normal timer instead of being cut off.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;

use stashbuff_types::{BuffId, ItemTypeId};

use super::conflicts;
use super::reconciler::BuffAction;
use super::usage::RecentUsage;
use crate::config::{BuffConfig, BuffPrefabCache};
use crate::host::{BuffCatalog, BuffTemplate, Clock, DurationOverride, StatusEffects};

/// Host capabilities the manager drives
pub trait BuffHost: StatusEffects + DurationOverride + BuffCatalog + Clock {}
impl<T: StatusEffects + DurationOverride + BuffCatalog + Clock> BuffHost for T {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuffState {
    /// Present on the host with the persistent override
    Applied,
    /// Wanted, but held back by its applied superior
    Suppressed,
}

/// Why a sustained buff is going away
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovalCause {
    /// The player consumed an item that grants it; keep it on a normal timer
    Consumed,
    /// Backing items left the containers
    Withdrawn,
}

#[derive(Debug)]
pub struct BuffManager {
    config: Arc<BuffConfig>,
    prefabs: BuffPrefabCache,
    active: BTreeMap<BuffId, BuffState>,
    recent_usage: Option<RecentUsage>,
}

impl BuffManager {
    pub fn new(config: Arc<BuffConfig>) -> Self {
        Self {
            config,
            prefabs: BuffPrefabCache::new(),
            active: BTreeMap::new(),
            recent_usage: None,
        }
    }

    /// Populate the prefab cache if the catalog has not been read yet
    pub fn ensure_prefabs(&mut self, catalog: &impl BuffCatalog) {
        if !self.prefabs.is_ready() {
            self.prefabs.populate(catalog);
        }
    }

    pub fn execute<H: BuffHost>(&mut self, host: &mut H, action: BuffAction) {
        match action {
            BuffAction::Add(id) => self.add_buff(host, id),
            BuffAction::Remove(id) => self.remove_buff(host, id),
        }
    }

    // ─── Add ────────────────────────────────────────────────────────────────

    pub fn add_buff<H: BuffHost>(&mut self, host: &mut H, id: BuffId) {
        if self.active.contains_key(&id) {
            return;
        }

        if let Some(superior) = conflicts::superior_of(id)
            && self.is_applied(superior)
        {
            self.active.insert(id, BuffState::Suppressed);
            tracing::debug!(buff = id, superior, "Buff suppressed by superior");
            return;
        }

        // Superior arriving over an applied inferior: take the inferior down
        // first. If it cannot go, the superior waits for a later pass.
        let demoted = conflicts::inferior_of(id).filter(|inferior| self.is_applied(*inferior));
        if let Some(inferior) = demoted {
            if let Some(instance) = host.find_buff(inferior) {
                if !instance.is_persistent_override() {
                    tracing::debug!(
                        buff = id,
                        inferior,
                        "Inferior on host timer, superior deferred"
                    );
                    return;
                }
                if !self.hard_remove(host, inferior) {
                    tracing::warn!(
                        buff = id,
                        inferior,
                        "Inferior could not be demoted, superior deferred"
                    );
                    return;
                }
            }
            self.active.insert(inferior, BuffState::Suppressed);
            tracing::debug!(buff = inferior, superior = id, "Inferior buff demoted");
        }

        if self.apply(host, id) {
            self.active.insert(id, BuffState::Applied);
            tracing::info!(buff = id, "Added buff");
        } else if let Some(inferior) = demoted {
            self.reveal(host, inferior);
        }
    }

    // ─── Remove ─────────────────────────────────────────────────────────────

    pub fn remove_buff<H: BuffHost>(&mut self, host: &mut H, id: BuffId) {
        let Some(state) = self.active.remove(&id) else {
            return;
        };
        if state == BuffState::Suppressed {
            tracing::debug!(buff = id, "Dropped suppressed buff");
            return;
        }

        let Some(instance) = host.find_buff(id) else {
            tracing::debug!(buff = id, "Buff already gone from host");
            self.reveal_inferior_of(host, id);
            return;
        };
        if !instance.is_persistent_override() {
            // The host's own timer owns it now
            tracing::debug!(buff = id, "Leaving non-persistent buff untouched");
            self.reveal_inferior_of(host, id);
            return;
        }

        let cause = self.removal_cause(id, host.now());
        let waiting_inferior =
            conflicts::inferior_of(id).filter(|inferior| self.is_suppressed(*inferior));

        match (cause, waiting_inferior) {
            (RemovalCause::Consumed, None) => {
                let template = self.template_or_fallback(&*host, id);
                match host.reset_duration(id, &template) {
                    Ok(()) => tracing::info!(
                        buff = id,
                        lifetime = template.total_lifetime,
                        "Buff handed back to host timer"
                    ),
                    Err(e) => {
                        tracing::warn!(buff = id, error = %e, "Duration reset failed");
                        // Still persistent on the host, keep owning it
                        self.active.insert(id, BuffState::Applied);
                    }
                }
            }
            (_, inferior) => {
                if !self.hard_remove(host, id) {
                    self.active.insert(id, BuffState::Applied);
                    return;
                }
                tracing::info!(buff = id, ?cause, "Removed buff");
                if let Some(inferior) = inferior {
                    self.reveal(host, inferior);
                }
            }
        }
    }

    // ─── Lifecycle ──────────────────────────────────────────────────────────

    /// Remember the last item the player consumed
    pub fn record_usage(
        &mut self,
        item_type: ItemTypeId,
        host_granted: impl IntoIterator<Item = BuffId>,
        at: Duration,
    ) {
        let usage = RecentUsage {
            item_type,
            at,
            host_granted: host_granted.into_iter().collect(),
        };
        tracing::debug!(item_type, granted = ?usage.host_granted, "Recorded item usage");
        self.recent_usage = Some(usage);
    }

    /// Forget applied buffs the host no longer carries (expired, cleared by
    /// gameplay). A pruned superior reveals its suppressed inferior. Returns
    /// what was dropped.
    pub fn prune_expired<H: BuffHost>(&mut self, host: &mut H) -> Vec<BuffId> {
        let gone: Vec<BuffId> = self
            .active
            .iter()
            .filter(|(id, state)| **state == BuffState::Applied && !host.has_buff(**id))
            .map(|(id, _)| *id)
            .collect();
        for id in &gone {
            self.active.remove(id);
        }
        if !gone.is_empty() {
            tracing::debug!(buffs = ?gone, "Pruned buffs missing from host");
        }
        for id in &gone {
            self.reveal_inferior_of(host, *id);
        }
        gone
    }

    /// Take down every persistent buff this manager applied, then forget them
    pub fn release_all<H: BuffHost>(&mut self, host: &mut H) {
        let applied: Vec<BuffId> = self
            .active
            .iter()
            .filter(|(_, state)| **state == BuffState::Applied)
            .map(|(id, _)| *id)
            .collect();
        for id in applied {
            if host
                .find_buff(id)
                .is_some_and(|instance| instance.is_persistent_override())
            {
                self.hard_remove(host, id);
            }
        }
        if !self.active.is_empty() {
            tracing::info!(count = self.active.len(), "Released engine buffs");
        }
        self.reset();
    }

    /// Clear bookkeeping without touching the host
    pub fn reset(&mut self) {
        self.active.clear();
        self.recent_usage = None;
    }

    // ─── Queries ────────────────────────────────────────────────────────────

    /// Ids owned by the engine, applied or suppressed
    pub fn active_buffs(&self) -> BTreeSet<BuffId> {
        self.active.keys().copied().collect()
    }

    pub fn state(&self, id: BuffId) -> Option<BuffState> {
        self.active.get(&id).copied()
    }

    pub fn recent_usage(&self) -> Option<&RecentUsage> {
        self.recent_usage.as_ref()
    }

    pub fn prefabs(&self) -> &BuffPrefabCache {
        &self.prefabs
    }

    fn is_applied(&self, id: BuffId) -> bool {
        self.state(id) == Some(BuffState::Applied)
    }

    fn is_suppressed(&self, id: BuffId) -> bool {
        self.state(id) == Some(BuffState::Suppressed)
    }

    fn removal_cause(&self, id: BuffId, now: Duration) -> RemovalCause {
        let consumed = self
            .recent_usage
            .as_ref()
            .is_some_and(|usage| usage.corroborates(id, &self.config, now));
        if consumed {
            RemovalCause::Consumed
        } else {
            RemovalCause::Withdrawn
        }
    }

    // ─── Host operations ────────────────────────────────────────────────────

    /// Add with the persistent override. All or nothing: a failed override
    /// rolls back an add we introduced.
    fn apply<H: BuffHost>(&mut self, host: &mut H, id: BuffId) -> bool {
        let Some(template) = self.prefabs.get(id, &*host).cloned() else {
            tracing::warn!(buff = id, "No template for buff, skipping");
            return false;
        };

        let already_present = host.has_buff(id);
        if let Err(e) = host.add_buff(&template) {
            tracing::warn!(buff = id, error = %e, "Host rejected buff");
            return false;
        }
        if let Err(e) = host.override_duration(id) {
            tracing::warn!(buff = id, error = %e, "Duration override failed");
            if !already_present && let Err(e) = host.remove_buff(id, true) {
                tracing::warn!(buff = id, error = %e, "Rollback failed");
            }
            return false;
        }
        true
    }

    /// Silent host removal. False only when the host still holds the buff.
    fn hard_remove<H: BuffHost>(&mut self, host: &mut H, id: BuffId) -> bool {
        match host.remove_buff(id, true) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(buff = id, error = %e, "Buff removal failed");
                !host.has_buff(id)
            }
        }
    }

    /// Apply a suppressed inferior now that its superior is gone
    fn reveal<H: BuffHost>(&mut self, host: &mut H, inferior: BuffId) {
        if self.apply(host, inferior) {
            self.active.insert(inferior, BuffState::Applied);
            tracing::debug!(buff = inferior, "Inferior buff revealed");
        } else {
            self.active.remove(&inferior);
        }
    }

    fn reveal_inferior_of<H: BuffHost>(&mut self, host: &mut H, superior: BuffId) {
        if let Some(inferior) = conflicts::inferior_of(superior)
            && self.is_suppressed(inferior)
        {
            self.reveal(host, inferior);
        }
    }

    fn template_or_fallback(&mut self, catalog: &impl BuffCatalog, id: BuffId) -> BuffTemplate {
        self.prefabs
            .get(id, catalog)
            .cloned()
            .unwrap_or_else(|| BuffTemplate::fallback(id))
    }
}
