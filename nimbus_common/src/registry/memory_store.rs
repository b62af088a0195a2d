use ::std::sync::Mutex;

use super::RegistryStore;
use crate::cluster::ClusterCollection;
use crate::error::Result;

/// Keeps the collection in process memory. Useful for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    collection: Mutex<ClusterCollection>,
}

impl MemoryStore {
    pub fn new(collection: ClusterCollection) -> Self {
        Self {
            collection: Mutex::new(collection),
        }
    }
}

impl RegistryStore for MemoryStore {
    fn load(&self) -> Result<ClusterCollection> {
        // a poisoned lock still holds a complete collection since `save` swaps it in one step
        let guard = self.collection.lock().unwrap_or_else(|e| e.into_inner());
        Ok(guard.clone())
    }

    fn save(&self, collection: &ClusterCollection) -> Result<()> {
        let mut guard = self.collection.lock().unwrap_or_else(|e| e.into_inner());
        *guard = collection.clone();
        Ok(())
    }
}
