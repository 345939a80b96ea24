//! Buff mapping loader
//!
//! The mapping file is TOML by default; files ending in `.json` are read as
//! the legacy `BuffMapping.json` layout. A missing file is bootstrapped from a
//! template when one is shipped next to it. Built-in defaults fill in every
//! item type the file does not mention, and stand in completely when the
//! file cannot be used.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use stashbuff_types::{BuffId, BuffMappingFile, ItemTypeId, Settings};

use super::ConfigError;

/// Built-in `item type -> buff` mapping
pub const DEFAULT_MAPPINGS: &[(ItemTypeId, BuffId)] = &[
    (0, 1201),    // night vision
    (137, 1011),  // speed
    (398, 1012),  // carry weight
    (408, 1072),  // electric resistance
    (409, 1084),  // pain resistance
    (438, 1092),  // adrenaline
    (797, 1013),  // armor
    (798, 1014),  // stamina
    (800, 1015),  // melee damage
    (872, 1017),  // recoil control
    (875, 1018),  // regeneration
    (856, 1113),  // storm protection
    (1070, 1074), // fire resistance
    (1071, 1075), // poison resistance
    (1072, 1076), // space resistance
    (1247, 1019), // bleed resistance
    (1400, 1206),
    (1401, 1207),
];

/// File name of the mapping inside the config directory
pub const CONFIG_FILE_NAME: &str = "BuffMapping.toml";

/// `<platform config dir>/stashbuff/BuffMapping.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("stashbuff").join(CONFIG_FILE_NAME))
}

/// Settings plus the item→buffs mapping, read-only to the engine
#[derive(Debug, Clone, PartialEq)]
pub struct BuffConfig {
    pub settings: Settings,
    item_buffs: BTreeMap<ItemTypeId, BTreeSet<BuffId>>,
}

impl Default for BuffConfig {
    fn default() -> Self {
        Self::defaults()
    }
}

impl BuffConfig {
    /// Default settings and the built-in mapping
    pub fn defaults() -> Self {
        let mut config = Self::empty(Settings::default());
        config.merge_defaults();
        config
    }

    /// No mappings at all
    pub fn empty(settings: Settings) -> Self {
        Self {
            settings,
            item_buffs: BTreeMap::new(),
        }
    }

    /// Load from `path`, copying `template` into place first if the file is
    /// missing. Defaults are merged for unmapped item types.
    pub fn load(path: &Path, template: Option<&Path>) -> Result<Self, ConfigError> {
        if !path.exists() {
            match template {
                Some(template) if template.exists() => copy_template(template, path)?,
                _ => {
                    return Err(ConfigError::NotFound {
                        path: path.to_path_buf(),
                    });
                }
            }
        }

        let content = fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;
        let file = parse_file(path, &content)?;

        let mut config = Self::from_file(file).ok_or_else(|| ConfigError::MissingMappings {
            path: path.to_path_buf(),
        })?;
        config.merge_defaults();

        tracing::debug!(
            path = %path.display(),
            item_types = config.item_buffs.len(),
            "Loaded buff mapping"
        );
        Ok(config)
    }

    /// `load`, falling back to `defaults()` on any error
    pub fn load_or_default(path: &Path, template: Option<&Path>) -> Self {
        match Self::load(path, template) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(error = %e, "Buff mapping unavailable, using built-in defaults");
                Self::defaults()
            }
        }
    }

    /// Build from a parsed file; `None` when the mappings table is absent
    pub fn from_file(file: BuffMappingFile) -> Option<Self> {
        let mappings = file.mappings?;
        let mut config = Self::empty(file.settings.unwrap_or_default());
        for entry in mappings {
            if entry.buff_id > 0 {
                config.insert_mapping(entry.item_id, entry.buff_id);
            }
        }
        Some(config)
    }

    pub fn insert_mapping(&mut self, item: ItemTypeId, buff: BuffId) {
        self.item_buffs.entry(item).or_default().insert(buff);
    }

    /// Add built-in rows for item types that have no mapping yet
    fn merge_defaults(&mut self) {
        for &(item, buff) in DEFAULT_MAPPINGS {
            self.item_buffs
                .entry(item)
                .or_insert_with(|| BTreeSet::from([buff]));
        }
    }

    pub fn buffs_for(&self, item: ItemTypeId) -> Option<&BTreeSet<BuffId>> {
        self.item_buffs.get(&item)
    }

    /// Does consuming `item` feed `buff` under this mapping?
    pub fn maps_to(&self, item: ItemTypeId, buff: BuffId) -> bool {
        self.item_buffs
            .get(&item)
            .is_some_and(|buffs| buffs.contains(&buff))
    }

    pub fn is_mapped(&self, item: ItemTypeId) -> bool {
        self.item_buffs.contains_key(&item)
    }

    pub fn item_types(&self) -> impl Iterator<Item = ItemTypeId> + '_ {
        self.item_buffs.keys().copied()
    }

    /// Every buff any item can grant
    pub fn all_buffs(&self) -> BTreeSet<BuffId> {
        self.item_buffs.values().flatten().copied().collect()
    }
}

fn parse_file(path: &Path, content: &str) -> Result<BuffMappingFile, ConfigError> {
    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    if is_json {
        serde_json::from_str(content).map_err(|source| ConfigError::ParseJson {
            path: path.to_path_buf(),
            source,
        })
    } else {
        toml::from_str(content).map_err(|source| ConfigError::ParseToml {
            path: path.to_path_buf(),
            source,
        })
    }
}

fn copy_template(template: &Path, path: &Path) -> Result<(), ConfigError> {
    let copy_err = |source| ConfigError::CopyTemplate {
        template: template.to_path_buf(),
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(copy_err)?;
    }
    fs::copy(template, path).map_err(copy_err)?;
    tracing::info!(
        template = %template.display(),
        path = %path.display(),
        "Copied config template"
    );
    Ok(())
}
