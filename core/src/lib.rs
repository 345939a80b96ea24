pub mod buffs;
pub mod config;
pub mod engine;
pub mod host;
pub mod tracking;

// Re-exports for convenience
pub use buffs::{BuffAction, BuffManager, BuffReconciler, BuffState, PassState};
pub use config::{BuffConfig, BuffPrefabCache, ConfigError, DEFAULT_MAPPINGS};
pub use engine::{AreaState, Engine, SignalHandler};
pub use host::{AreaInfo, FrameLoop, Host, HostError, HostSignal, Sandbox};
pub use stashbuff_types::{BuffId, BuffMappingEntry, BuffMappingFile, ItemTypeId, Settings};
pub use tracking::{ContainerDiscovery, ContainerMonitor, ParentOwner};
