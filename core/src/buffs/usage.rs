//! Last item consumption, used to tell a player's own potion apart from the
//! engine's bookkeeping when a sustained buff loses its backing items.

use std::collections::BTreeSet;
use std::time::Duration;

use stashbuff_types::{BuffId, ItemTypeId};

use crate::config::BuffConfig;

/// How long a consumption record stays meaningful
pub const CONSUMPTION_WINDOW: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecentUsage {
    pub item_type: ItemTypeId,
    /// Game time of the consumption
    pub at: Duration,
    /// Buffs the host's own usage logic grants for this item
    pub host_granted: BTreeSet<BuffId>,
}

impl RecentUsage {
    pub fn is_fresh(&self, now: Duration) -> bool {
        now.saturating_sub(self.at) < CONSUMPTION_WINDOW
    }

    /// Fresh, mapped to `buff` by config, and granted by the host itself
    pub fn corroborates(&self, buff: BuffId, config: &BuffConfig, now: Duration) -> bool {
        self.is_fresh(now)
            && config.maps_to(self.item_type, buff)
            && self.host_granted.contains(&buff)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn usage_at(secs: f32) -> RecentUsage {
        RecentUsage {
            item_type: 398,
            at: Duration::from_secs_f32(secs),
            host_granted: BTreeSet::from([1012]),
        }
    }

    #[test]
    fn test_window_is_exclusive_at_one_second() {
        let usage = usage_at(10.0);
        assert!(usage.is_fresh(Duration::from_secs_f32(10.999)));
        assert!(!usage.is_fresh(Duration::from_secs_f32(11.0)));
    }

    #[test]
    fn test_corroboration_needs_mapping_and_host_grant() {
        let config = BuffConfig::defaults();
        let now = Duration::from_secs_f32(10.5);
        let usage = usage_at(10.0);

        assert!(usage.corroborates(1012, &config, now));
        // Mapped elsewhere
        assert!(!usage.corroborates(1011, &config, now));

        let ungranted = RecentUsage {
            host_granted: BTreeSet::new(),
            ..usage
        };
        assert!(!ungranted.corroborates(1012, &config, now));
    }
}
