//! Skeleton Definition Registry
//!
//! A name-keyed cache of shared [`SkeletonDef`]s, grouped like resource
//! groups. Instances use it to merge clips from other skeletons with the same
//! hierarchy.

use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use sinew_core::errors::{Result, SinewError};

use crate::skeleton::SkeletonDef;

/// Group used when callers do not organise skeletons into groups.
pub const DEFAULT_GROUP: &str = "General";

#[derive(Debug, Default)]
pub struct SkeletonDefRegistry {
    defs: RwLock<FxHashMap<(String, String), Arc<SkeletonDef>>>,
}

impl SkeletonDefRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `def` under its own name in `group`, replacing any previous
    /// entry, and returns the shared handle.
    pub fn insert(&self, group: &str, def: SkeletonDef) -> Arc<SkeletonDef> {
        let def = Arc::new(def);
        self.insert_shared(group, Arc::clone(&def));
        def
    }

    pub fn insert_shared(&self, group: &str, def: Arc<SkeletonDef>) {
        let key = (group.to_string(), def.name().to_string());
        if self.defs.write().insert(key, def).is_some() {
            log::debug!("SkeletonDefRegistry: replaced an entry in group '{group}'");
        }
    }

    pub fn get(&self, name: &str, group: &str) -> Result<Arc<SkeletonDef>> {
        self.defs
            .read()
            .get(&(group.to_string(), name.to_string()))
            .cloned()
            .ok_or_else(|| SinewError::SkeletonNotFound {
                name: name.to_string(),
                group: group.to_string(),
            })
    }

    #[must_use]
    pub fn contains(&self, name: &str, group: &str) -> bool {
        self.defs
            .read()
            .contains_key(&(group.to_string(), name.to_string()))
    }

    pub fn remove(&self, name: &str, group: &str) -> Option<Arc<SkeletonDef>> {
        self.defs
            .write()
            .remove(&(group.to_string(), name.to_string()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.defs.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.defs.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{SourceBone, SourceSkeleton};

    fn def(name: &str) -> SkeletonDef {
        let mut source = SourceSkeleton::new();
        source.add_bone(SourceBone::new("root", None));
        SkeletonDef::build(name, &source, 30.0).unwrap()
    }

    #[test]
    fn lookup_by_name_and_group() {
        let _ = env_logger::builder().is_test(true).try_init();
        let registry = SkeletonDefRegistry::new();
        registry.insert(DEFAULT_GROUP, def("hero"));
        registry.insert("Npc", def("hero"));

        assert_eq!(registry.len(), 2);
        assert!(registry.get("hero", DEFAULT_GROUP).is_ok());
        assert!(registry.contains("hero", "Npc"));
        assert_eq!(
            registry.get("villain", DEFAULT_GROUP).unwrap_err(),
            SinewError::SkeletonNotFound {
                name: "villain".to_string(),
                group: DEFAULT_GROUP.to_string(),
            }
        );

        assert!(registry.remove("hero", "Npc").is_some());
        assert!(!registry.contains("hero", "Npc"));
    }
}
