//! Registry of the clusters provisioned by Nimbus.
//!
//! Every operation loads the whole collection from the [RegistryStore],
//! and mutations write the whole collection back. Nothing is cached between
//! operations, and there is no locking: two processes mutating the same
//! store concurrently end up with last-write-wins.

mod file_store;
mod memory_store;

pub use file_store::FileStore;
pub use memory_store::MemoryStore;

use ::tracing::{debug, info};

use crate::cluster::{ClusterCollection, ClusterRecord};
use crate::error::{NimbusError, Result};

/// Backend holding the persisted [ClusterCollection].
pub trait RegistryStore {
    /// Read the full collection.
    fn load(&self) -> Result<ClusterCollection>;

    /// Replace the full collection.
    fn save(&self, collection: &ClusterCollection) -> Result<()>;
}

/// Cluster records keyed by cluster name.
pub struct ClusterRegistry<S: RegistryStore> {
    store: S,
}

impl<S: RegistryStore> ClusterRegistry<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn get_store(&self) -> &S {
        &self.store
    }

    /// Insert `record`, silently replacing any cluster with the same name.
    pub fn store(&self, record: ClusterRecord) -> Result<()> {
        let mut collection = self.store.load()?;
        let name = record.name.clone();
        let replaced = collection.insert(record);
        self.store.save(&collection)?;
        if replaced.is_some() {
            info!("Cluster {} overwritten", name);
        } else {
            info!("Cluster {} stored", name);
        }
        Ok(())
    }

    /// Insert `record` only when no cluster with the same name exists.
    pub fn store_if_absent(&self, record: ClusterRecord) -> Result<()> {
        let mut collection = self.store.load()?;
        if collection.contains(&record.name) {
            return Err(NimbusError::cluster_already_exists(&record.name));
        }
        let name = record.name.clone();
        collection.insert(record);
        self.store.save(&collection)?;
        info!("Cluster {} stored", name);
        Ok(())
    }

    pub fn lookup(&self, name: &str) -> Result<ClusterRecord> {
        debug!("Look up cluster {}", name);
        let collection = self.store.load()?;
        collection
            .get(name)
            .cloned()
            .ok_or_else(|| NimbusError::cluster_not_found(name))
    }

    /// Remove the cluster and persist the change. Return the removed record.
    pub fn delete(&self, name: &str) -> Result<ClusterRecord> {
        let mut collection = self.store.load()?;
        let removed = collection
            .remove(name)
            .ok_or_else(|| NimbusError::cluster_not_found(name))?;
        self.store.save(&collection)?;
        info!("Cluster {} deleted", name);
        Ok(removed)
    }

    /// Replace the whole registry by an empty one.
    pub fn reset(&self) -> Result<()> {
        self.store.save(&ClusterCollection::new())?;
        info!("Cluster registry reset");
        Ok(())
    }

    /// Sorted names of all stored clusters.
    pub fn list(&self) -> Result<Vec<String>> {
        Ok(self.store.load()?.names())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::{MasterNode, SlaveNode};
    use crate::error::NimbusErrorType;
    use ::anyhow::Result;

    fn record(name: &str, flavor: &str) -> ClusterRecord {
        ClusterRecord {
            name: name.to_owned(),
            slave_count: 2,
            master_count: 1,
            flavor: flavor.to_owned(),
            internal_network: "n1".to_owned(),
            external_network: "e1".to_owned(),
            security_group: "sg1".to_owned(),
            image: "i1".to_owned(),
            slaves: vec![SlaveNode {
                name: "s1".to_owned(),
                internal_ip: "10.0.0.1".to_owned(),
            }],
            masters: vec![MasterNode {
                name: "m1".to_owned(),
                ip: "10.0.0.2".to_owned(),
            }],
        }
    }

    fn registry() -> ClusterRegistry<MemoryStore> {
        ClusterRegistry::new(MemoryStore::default())
    }

    #[test]
    fn store_then_lookup() -> Result<()> {
        let registry = registry();
        registry.store(record("c1", "f1"))?;
        assert_eq!(registry.lookup("c1")?, record("c1", "f1"));
        let err = registry.lookup("c2").unwrap_err();
        assert_eq!(err.get_error_type(), NimbusErrorType::NotFound);
        assert_eq!(err.to_string(), "Not found: Cluster c2 not found");
        Ok(())
    }

    #[test]
    fn storing_another_cluster_keeps_the_first() -> Result<()> {
        let registry = registry();
        registry.store(record("c1", "f1"))?;
        registry.store(record("c2", "f2"))?;
        assert_eq!(registry.lookup("c1")?, record("c1", "f1"));
        assert_eq!(registry.lookup("c2")?, record("c2", "f2"));
        Ok(())
    }

    #[test]
    fn store_overwrites_existing_name() -> Result<()> {
        let registry = registry();
        registry.store(record("c1", "f1"))?;
        registry.store(record("c1", "f2"))?;
        assert_eq!(registry.lookup("c1")?.flavor, "f2");
        assert_eq!(registry.list()?, vec!["c1".to_owned()]);
        Ok(())
    }

    #[test]
    fn store_if_absent_rejects_taken_name() -> Result<()> {
        let registry = registry();
        registry.store_if_absent(record("c1", "f1"))?;
        let err = registry.store_if_absent(record("c1", "f2")).unwrap_err();
        assert_eq!(err.get_error_type(), NimbusErrorType::AlreadyExists);
        assert_eq!(registry.lookup("c1")?.flavor, "f1");
        Ok(())
    }

    #[test]
    fn delete_removes_cluster() -> Result<()> {
        let registry = registry();
        registry.store(record("c1", "f1"))?;
        registry.store(record("c2", "f2"))?;
        let removed = registry.delete("c1")?;
        assert_eq!(removed, record("c1", "f1"));
        assert_eq!(
            registry.lookup("c1").unwrap_err().get_error_type(),
            NimbusErrorType::NotFound
        );
        assert_eq!(registry.list()?, vec!["c2".to_owned()]);
        Ok(())
    }

    #[test]
    fn delete_unknown_cluster() {
        let registry = registry();
        let err = registry.delete("nope").unwrap_err();
        assert_eq!(err.get_error_type(), NimbusErrorType::NotFound);
    }

    #[test]
    fn reset_forgets_everything() -> Result<()> {
        let registry = registry();
        registry.store(record("c1", "f1"))?;
        registry.store(record("c2", "f2"))?;
        registry.reset()?;
        assert!(registry.lookup("c1").is_err());
        assert!(registry.lookup("c2").is_err());
        assert!(registry.list()?.is_empty());
        Ok(())
    }
}
