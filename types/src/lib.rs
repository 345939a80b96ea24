//! Shared configuration types for stashbuff
//!
//! This crate contains the serializable configuration types that are shared
//! between the engine (stashbuff-core) and its front ends (the CLI).
//!
//! Both the current snake_case field names and the legacy camelCase names of
//! `BuffMapping.json` are accepted on input.

use serde::{Deserialize, Serialize};

/// Game item type identifier (the host's `TypeID`)
pub type ItemTypeId = i32;

/// Status effect identifier (the host's buff `ID`)
pub type BuffId = i32;

// ─────────────────────────────────────────────────────────────────────────────
// Settings
// ─────────────────────────────────────────────────────────────────────────────

/// Runtime settings read once per area load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Item type of the containers whose contents grant buffs
    #[serde(alias = "targetContainerId")]
    pub target_container_id: ItemTypeId,

    /// Minimum total stack count of an item type before its buffs are desired
    #[serde(alias = "requiredItemCount")]
    pub required_item_count: u32,

    /// Keep tracking in the base area (normally excluded)
    #[serde(alias = "enableInBaseLevel", alias = "enable_in_base_level")]
    pub enable_in_base_area: bool,

    /// Extra equipment slots on the player that may hold a container
    #[serde(alias = "additionalSlots", alias = "additional_slots")]
    pub extra_slot_names: Vec<String>,

    /// Verbose logging for the stashbuff crates
    #[serde(alias = "debugMode")]
    pub debug_mode: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            target_container_id: 882,
            required_item_count: 3,
            enable_in_base_area: false,
            extra_slot_names: vec!["Medic".to_string()],
            debug_mode: false,
        }
    }
}

impl Settings {
    /// Whether tracking runs in an area with the given exclusion flag
    pub fn tracking_enabled_in(&self, excluded_area: bool) -> bool {
        !excluded_area || self.enable_in_base_area
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Mapping file
// ─────────────────────────────────────────────────────────────────────────────

/// One `item type -> buff` row of the mapping file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuffMappingEntry {
    #[serde(alias = "itemId")]
    pub item_id: ItemTypeId,
    #[serde(alias = "buffId")]
    pub buff_id: BuffId,
}

/// On-disk layout of the mapping file (TOML or legacy JSON).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BuffMappingFile {
    /// Absent in malformed files; the loader rejects those
    #[serde(default)]
    pub mappings: Option<Vec<BuffMappingEntry>>,

    #[serde(default)]
    pub settings: Option<Settings>,
}
