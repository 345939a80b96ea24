//! Buff prefab cache
//!
//! Templates are read from the host catalog once per session. Lookups made
//! before the cache was filled populate it on demand.

use hashbrown::HashMap;

use stashbuff_types::BuffId;

use crate::host::{BuffCatalog, BuffTemplate};

#[derive(Debug, Default)]
pub struct BuffPrefabCache {
    templates: HashMap<BuffId, BuffTemplate>,
    ready: bool,
}

impl BuffPrefabCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fill the cache from the catalog. No-op once populated.
    pub fn populate(&mut self, catalog: &impl BuffCatalog) {
        if self.ready {
            return;
        }
        self.templates.clear();
        for template in catalog.buff_templates() {
            if template.id <= 0 {
                continue;
            }
            // First prefab with a given id wins
            self.templates.entry(template.id).or_insert(template);
        }
        self.ready = true;
        tracing::debug!(count = self.templates.len(), "Buff prefab cache populated");
    }

    /// Template for a buff, populating from `catalog` if never filled
    pub fn get(&mut self, id: BuffId, catalog: &impl BuffCatalog) -> Option<&BuffTemplate> {
        if !self.ready {
            self.populate(catalog);
        }
        self.templates.get(&id)
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Catalog(Vec<BuffTemplate>);

    impl BuffCatalog for Catalog {
        fn buff_templates(&self) -> Vec<BuffTemplate> {
            self.0.clone()
        }
    }

    fn template(id: BuffId, name: &str) -> BuffTemplate {
        BuffTemplate {
            id,
            name: name.to_string(),
            limited_lifetime: true,
            total_lifetime: 30.0,
        }
    }

    #[test]
    fn test_skips_invalid_ids_and_keeps_first_duplicate() {
        let catalog = Catalog(vec![
            template(0, "invalid"),
            template(1011, "first"),
            template(1011, "second"),
            template(1012, "other"),
        ]);
        let mut cache = BuffPrefabCache::new();
        cache.populate(&catalog);

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get(1011, &catalog).unwrap().name, "first");
        assert!(cache.get(0, &catalog).is_none());
    }

    #[test]
    fn test_get_populates_lazily_once() {
        let mut cache = BuffPrefabCache::new();
        assert!(!cache.is_ready());

        let catalog = Catalog(vec![template(1011, "speed")]);
        assert!(cache.get(1011, &catalog).is_some());
        assert!(cache.is_ready());

        // Later catalog changes are not picked up within the session
        let grown = Catalog(vec![template(1011, "speed"), template(1012, "weight")]);
        assert!(cache.get(1012, &grown).is_none());
    }
}
