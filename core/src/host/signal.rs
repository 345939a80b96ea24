use super::{ItemId, Notification};

/// Scene facts the host reports when an area finishes loading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AreaInfo {
    /// The area is on the base-area exclusion list
    pub excluded: bool,
}

/// Events the host pushes into the engine.
/// Delivered in order during the frame, between `tick` and `end_of_tick`.
#[derive(Debug, Clone, PartialEq)]
pub enum HostSignal {
    /// A new area finished loading; all prior handles are stale
    AreaInitialized(AreaInfo),

    /// A subscribed source fired
    Changed(Notification),

    /// The player used an item. Sent before the host applies its effects.
    ItemUsed { item: ItemId },
}
