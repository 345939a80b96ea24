use std::path::{Path, PathBuf};

use stashbuff_core::host::BuffTemplate;
use stashbuff_core::{AreaInfo, BuffConfig, Engine, HostSignal, Sandbox};

/// Lifetime given to every sandbox buff template
const SANDBOX_BUFF_SECONDS: f32 = 30.0;

const PLAYER_INVENTORY_SIZE: usize = 20;
const PET_INVENTORY_SIZE: usize = 10;

/// Holds the engine and the sandbox world it runs against.
pub struct CliContext {
    pub config_path: Option<PathBuf>,
    pub engine: Engine,
    pub sandbox: Sandbox,
}

impl CliContext {
    /// Load config from `path` (falling back to defaults) and build a world
    pub fn new(config_path: Option<PathBuf>) -> Self {
        let config = match &config_path {
            Some(path) => BuffConfig::load_or_default(path, None),
            None => BuffConfig::defaults(),
        };
        Self::with_config(config_path, config)
    }

    fn with_config(config_path: Option<PathBuf>, config: BuffConfig) -> Self {
        let sandbox = seeded_sandbox(&config);
        Self {
            config_path,
            engine: Engine::new(config),
            sandbox,
        }
    }

    pub fn config(&self) -> &BuffConfig {
        self.engine.config()
    }

    /// Replace config, engine and world. The old engine is shut down first.
    pub fn reload(&mut self, path: &Path, template: Option<&Path>) -> Result<(), String> {
        let config = BuffConfig::load(path, template).map_err(|e| e.to_string())?;
        self.engine.shutdown(&mut self.sandbox);
        *self = Self::with_config(Some(path.to_path_buf()), config);
        Ok(())
    }

    /// Unload the current area and load a fresh one with a player, a pet
    /// and the configured extra slots, then run one frame.
    pub fn enter_area(&mut self, excluded: bool) -> Result<(), String> {
        self.sandbox.unload_area();
        self.sandbox.spawn_player(PLAYER_INVENTORY_SIZE);
        self.sandbox.spawn_pet(PET_INVENTORY_SIZE);

        let slot_names = self.config().settings.extra_slot_names.clone();
        let names: Vec<&str> = slot_names.iter().map(String::as_str).collect();
        self.sandbox
            .load_player_slots(&names)
            .map_err(|e| e.to_string())?;

        self.sandbox
            .push_signal(HostSignal::AreaInitialized(AreaInfo { excluded }));
        self.engine.run_frame(&mut self.sandbox);
        Ok(())
    }
}

/// Mapping file to load. An explicit path is always kept so a missing file
/// gets reported; the default location is used only when it exists.
pub fn resolve_config_path(
    explicit: Option<PathBuf>,
    default: Option<PathBuf>,
) -> Option<PathBuf> {
    explicit.or_else(|| default.filter(|path| path.exists()))
}

/// Sandbox whose catalog and usage grants mirror the mapping
fn seeded_sandbox(config: &BuffConfig) -> Sandbox {
    let mut sandbox = Sandbox::new();
    for id in config.all_buffs() {
        sandbox.register_template(BuffTemplate {
            id,
            name: format!("buff {id}"),
            limited_lifetime: true,
            total_lifetime: SANDBOX_BUFF_SECONDS,
        });
    }
    for item in config.item_types() {
        if let Some(buffs) = config.buffs_for(item) {
            sandbox.set_usage_grants(item, buffs.iter().copied().collect());
        }
    }
    sandbox
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_missing_path_is_kept() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("BuffMapping.toml");

        let resolved = resolve_config_path(Some(missing.clone()), None);
        assert_eq!(resolved, Some(missing));
    }

    #[test]
    fn test_default_path_used_only_when_present() {
        let dir = tempfile::tempdir().unwrap();
        let default = dir.path().join("BuffMapping.toml");
        assert_eq!(resolve_config_path(None, Some(default.clone())), None);

        std::fs::write(&default, "[mappings]\n").unwrap();
        assert_eq!(
            resolve_config_path(None, Some(default.clone())),
            Some(default)
        );
    }

    #[test]
    fn test_missing_explicit_config_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("BuffMapping.toml");

        let ctx = CliContext::new(Some(missing.clone()));
        assert_eq!(ctx.config_path, Some(missing));
        assert_eq!(
            ctx.config().all_buffs(),
            BuffConfig::defaults().all_buffs()
        );
    }
}
