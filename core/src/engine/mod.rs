//! Engine entry point
//!
//! The host drives the engine from its main thread, once per frame:
//!
//! ```text
//!   tick()                 bootstrap polls, then at most one buff action
//!      │
//!   handle_signal()*       owner changes ─▶ discovery
//!      │                   content changes ─▶ monitor
//!      │                   item use ─▶ recent usage
//!      │                        (any real change schedules a pass)
//!      ▼
//!   end_of_tick()          one reconciliation pass if scheduled
//! ```
//!
//! All engine state is owned here and mutated only through `&mut self`.

mod bootstrap;
mod handler;


use std::collections::BTreeSet;
use std::sync::Arc;

use stashbuff_types::BuffId;

pub use bootstrap::{
    Bootstrap, BootstrapEvent, PET_WAIT_TICKS, PLAYER_WAIT_TICKS, PolledSource, SLOT_WAIT_TICKS,
};
pub use handler::SignalHandler;
pub use crate::host::{AreaInfo, HostSignal};

use crate::buffs::{BuffAction, BuffManager, BuffReconciler, BuffState, PassState};
use crate::config::BuffConfig;
use crate::host::{FrameLoop, Host, ItemId, Notification};
use crate::tracking::{ContainerDiscovery, ContainerMonitor, ParentOwner};

/// Whether the current area runs the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AreaState {
    /// No area initialized yet, or shut down
    #[default]
    Unloaded,
    /// Excluded base area with tracking disabled
    Disabled,
    Tracking,
}

#[derive(Debug)]
pub struct Engine {
    config: Arc<BuffConfig>,

    discovery: ContainerDiscovery,
    monitor: ContainerMonitor,
    reconciler: BuffReconciler,
    manager: BuffManager,

    area: AreaState,
    bootstrap: Option<Bootstrap>,

    ticks: u64,
}

impl Engine {
    pub fn new(config: BuffConfig) -> Self {
        let config = Arc::new(config);
        Self {
            monitor: ContainerMonitor::new(config.item_types()),
            discovery: ContainerDiscovery::new(),
            reconciler: BuffReconciler::new(),
            manager: BuffManager::new(Arc::clone(&config)),
            area: AreaState::Unloaded,
            bootstrap: None,
            ticks: 0,
            config,
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Lifecycle
    // ─────────────────────────────────────────────────────────────────────────

    /// A new area finished loading. Everything from the previous area is torn
    /// down; tracking restarts through the bootstrap polls unless disabled.
    pub fn on_area_initialized<H: Host>(&mut self, host: &mut H, area: AreaInfo) {
        self.manager.ensure_prefabs(&*host);
        self.teardown(host);

        // Buffs still persistent on the host from an earlier area
        self.manager.release_all(host);

        if !self.config.settings.tracking_enabled_in(area.excluded) {
            self.area = AreaState::Disabled;
            tracing::info!("Area excluded, stash buffs disabled");
            return;
        }

        self.area = AreaState::Tracking;
        self.bootstrap = Some(Bootstrap::new());
        tracing::info!(
            target_container = self.config.settings.target_container_id,
            required = self.config.settings.required_item_count,
            "Area initialized, waiting for player"
        );
    }

    /// Host is unloading the engine. Subscriptions are released; buffs on
    /// the player are left as they are.
    pub fn shutdown<H: Host>(&mut self, host: &mut H) {
        self.teardown(host);
        self.manager.reset();
        self.area = AreaState::Unloaded;
        tracing::info!(ticks = self.ticks, "Engine shut down");
    }

    fn teardown<H: Host>(&mut self, host: &mut H) {
        self.discovery.reset(host, &mut self.monitor);
        self.monitor.reset(host);
        self.reconciler.clear();
        self.bootstrap = None;
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Per-frame entry points
    // ─────────────────────────────────────────────────────────────────────────

    /// Start of frame: advance bootstrap polls, then execute at most one
    /// queued buff action.
    pub fn tick<H: Host>(&mut self, host: &mut H) {
        self.ticks += 1;
        if self.area != AreaState::Tracking {
            return;
        }

        self.advance_bootstrap(host);

        if let Some(action) = self.reconciler.next_action() {
            tracing::debug!(?action, remaining = self.reconciler.pending_len(), "Executing");
            self.manager.execute(host, action);
        }
    }

    /// End of frame: run the reconciliation pass if one was scheduled
    pub fn end_of_tick<H: Host>(&mut self, host: &mut H) {
        if !self.reconciler.take_scheduled() {
            return;
        }
        if self.area != AreaState::Tracking {
            return;
        }

        self.manager.prune_expired(host);
        let counts = self.monitor.total_item_counts(&*host);
        self.reconciler
            .run_pass(&counts, &self.config, &self.manager.active_buffs());
    }

    /// One full host frame: tick, deliver queued signals, end of tick.
    /// Delivery may queue more signals, so draining repeats until quiet.
    pub fn run_frame<H: Host + FrameLoop>(&mut self, host: &mut H) {
        self.tick(host);
        loop {
            let signals = host.drain_signals();
            if signals.is_empty() {
                break;
            }
            self.handle_signals(&signals, host);
        }
        self.end_of_tick(host);
        host.finish_frame();
    }

    pub fn run_frames<H: Host + FrameLoop>(&mut self, host: &mut H, frames: usize) {
        for _ in 0..frames {
            self.run_frame(host);
        }
    }

    /// Route a fired subscription to discovery or the monitor
    pub fn handle_notification<H: Host>(&mut self, host: &mut H, notification: &Notification) {
        if self.area != AreaState::Tracking {
            return;
        }

        if let Some(delta) =
            self.discovery
                .on_owner_changed(host, &mut self.monitor, notification)
        {
            if !delta.is_empty() {
                self.reconciler.request_pass();
            }
            return;
        }

        match self.monitor.handle_notification(host, notification) {
            Some(true) => {
                self.reconciler.request_pass();
            }
            Some(false) => {}
            None => tracing::trace!(
                subscription = notification.subscription.0,
                "Notification for released subscription"
            ),
        }
    }

    /// The player used an item; remember it for the next removal decision
    pub fn on_item_used<H: Host>(&mut self, host: &mut H, item: ItemId) {
        let Some(item_type) = host.item_type(item) else {
            tracing::debug!(item = item.0, "Used item has no type");
            return;
        };
        let granted = host.usage_buffs(item);
        self.manager.record_usage(item_type, granted, host.now());
    }

    /// Full rescan of every root. Schedules a pass when membership changed.
    pub fn rescan<H: Host>(&mut self, host: &mut H) {
        let settings = &self.config.settings;
        let delta = self.discovery.rescan_all(
            host,
            &mut self.monitor,
            settings.target_container_id,
            &settings.extra_slot_names,
        );
        let refreshed = self.monitor.refresh_all(host);
        if !delta.is_empty() || refreshed {
            self.reconciler.request_pass();
        }
    }

    fn advance_bootstrap<H: Host>(&mut self, host: &mut H) {
        let Some(bootstrap) = self.bootstrap.as_mut() else {
            return;
        };
        let events = bootstrap.poll(&*host);
        if bootstrap.is_finished() {
            self.bootstrap = None;
        }

        let mut rescan = false;
        for event in events {
            match event {
                BootstrapEvent::PlayerReady => {
                    tracing::info!(ticks = self.ticks, "Player ready, scanning containers");
                    rescan = true;
                }
                BootstrapEvent::SourceReady(source) => {
                    tracing::debug!(?source, "Late source loaded");
                    rescan = true;
                }
                BootstrapEvent::Expired(PolledSource::Player) => {
                    tracing::warn!(
                        ticks = PLAYER_WAIT_TICKS,
                        "Player never appeared, tracking inactive for this area"
                    );
                }
                BootstrapEvent::Expired(source) => {
                    tracing::debug!(?source, "Gave up waiting for source");
                }
            }
        }

        if rescan {
            self.rescan(host);
            // Initial pass even when nothing is carried
            self.reconciler.request_pass();
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Queries
    // ─────────────────────────────────────────────────────────────────────────

    pub fn config(&self) -> &BuffConfig {
        &self.config
    }

    pub fn area_state(&self) -> AreaState {
        self.area
    }

    pub fn is_bootstrapping(&self) -> bool {
        self.bootstrap.is_some()
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Tracked containers, ordered by handle
    pub fn tracked_containers(&self) -> Vec<(ItemId, ParentOwner)> {
        let mut tracked: Vec<_> = self.discovery.tracked().collect();
        tracked.sort_by_key(|(item, _)| *item);
        tracked
    }

    pub fn active_buffs(&self) -> BTreeSet<BuffId> {
        self.manager.active_buffs()
    }

    pub fn buff_state(&self, id: BuffId) -> Option<BuffState> {
        self.manager.state(id)
    }

    pub fn pending_actions(&self) -> Vec<BuffAction> {
        self.reconciler.pending().copied().collect()
    }

    pub fn pass_state(&self) -> PassState {
        self.reconciler.state()
    }

    pub fn passes_run(&self) -> u64 {
        self.reconciler.passes_run()
    }

    pub fn monitor(&self) -> &ContainerMonitor {
        &self.monitor
    }

    pub fn manager(&self) -> &BuffManager {
        &self.manager
    }
}

impl<H: Host> SignalHandler<H> for Engine {
    fn handle_signal(&mut self, signal: &HostSignal, host: &mut H) {
        match signal {
            HostSignal::AreaInitialized(area) => self.on_area_initialized(host, *area),
            HostSignal::Changed(notification) => self.handle_notification(host, notification),
            HostSignal::ItemUsed { item } => self.on_item_used(host, *item),
        }
    }
}
