//! Configuration collaborators: the buff mapping file and the prefab cache.

mod error;
mod loader;
mod prefab_cache;

pub use error::ConfigError;
pub use loader::{BuffConfig, CONFIG_FILE_NAME, DEFAULT_MAPPINGS, default_config_path};
pub use prefab_cache::BuffPrefabCache;
pub use stashbuff_types::{BuffId, BuffMappingEntry, BuffMappingFile, ItemTypeId, Settings};
