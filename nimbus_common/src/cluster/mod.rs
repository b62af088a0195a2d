use ::serde::{Deserialize, Serialize};
use ::std::collections::BTreeMap;

mod cluster_record;
mod store_cluster_request;

pub use cluster_record::ClusterRecord;
pub use store_cluster_request::{MasterArgs, SlaveArgs, StoreClusterRequest};

/// A slave instance of a cluster.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SlaveNode {
    #[serde(rename = "slave_name")]
    pub name: String,
    #[serde(rename = "slave_internal_IP")]
    pub internal_ip: String,
}

/// A master instance of a cluster.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MasterNode {
    #[serde(rename = "master_name")]
    pub name: String,
    #[serde(rename = "master_IP")]
    pub ip: String,
}

/// All clusters known to the registry, keyed by cluster name.
/// Wrapped in a `{"clusters": ...}` envelope when persisted.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClusterCollection {
    pub clusters: BTreeMap<String, ClusterRecord>,
}

impl ClusterCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&ClusterRecord> {
        self.clusters.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.clusters.contains_key(name)
    }

    /// Insert `record` under its own name, returning the record it replaced.
    pub fn insert(&mut self, record: ClusterRecord) -> Option<ClusterRecord> {
        self.clusters.insert(record.name.clone(), record)
    }

    pub fn remove(&mut self, name: &str) -> Option<ClusterRecord> {
        self.clusters.remove(name)
    }

    /// Cluster names in sorted order.
    pub fn names(&self) -> Vec<String> {
        self.clusters.keys().cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }

    pub fn len(&self) -> usize {
        self.clusters.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ::anyhow::Result;
    use ::serde_json::{from_value, json, to_value};

    fn record(name: &str) -> ClusterRecord {
        ClusterRecord {
            name: name.to_owned(),
            slave_count: 2,
            master_count: 1,
            flavor: "m1.large".to_owned(),
            internal_network: "private".to_owned(),
            external_network: "public".to_owned(),
            security_group: "default".to_owned(),
            image: "CentOS7".to_owned(),
            slaves: vec![
                SlaveNode {
                    name: "s2".to_owned(),
                    internal_ip: "10.0.0.3".to_owned(),
                },
                SlaveNode {
                    name: "s1".to_owned(),
                    internal_ip: "10.0.0.2".to_owned(),
                },
            ],
            masters: vec![MasterNode {
                name: "m1".to_owned(),
                ip: "10.0.0.1".to_owned(),
            }],
        }
    }

    #[test]
    fn empty_collection_is_an_explicit_envelope() -> Result<()> {
        assert_eq!(to_value(ClusterCollection::new())?, json!({"clusters": {}}));
        Ok(())
    }

    #[test]
    fn collection_survives_serialization() -> Result<()> {
        let mut collection = ClusterCollection::new();
        collection.insert(record("c1"));
        collection.insert(record("c2"));
        let text = serde_json::to_string(&collection)?;
        let back: ClusterCollection = serde_json::from_str(&text)?;
        assert_eq!(back, collection);
        // node order is kept as given, not sorted
        assert_eq!(back.get("c1").unwrap().slaves[0].name, "s2");
        Ok(())
    }

    #[test]
    fn node_field_names_on_the_wire() -> Result<()> {
        let slave = SlaveNode {
            name: "s1".to_owned(),
            internal_ip: "10.0.0.1".to_owned(),
        };
        let master = MasterNode {
            name: "m1".to_owned(),
            ip: "10.0.0.2".to_owned(),
        };
        assert_eq!(
            to_value(slave)?,
            json!({"slave_name": "s1", "slave_internal_IP": "10.0.0.1"})
        );
        assert_eq!(
            to_value(master)?,
            json!({"master_name": "m1", "master_IP": "10.0.0.2"})
        );
        Ok(())
    }

    #[test]
    fn insert_overwrites_and_returns_previous() {
        let mut collection = ClusterCollection::new();
        assert!(collection.insert(record("c1")).is_none());
        let mut updated = record("c1");
        updated.flavor = "m1.small".to_owned();
        let previous = collection.insert(updated);
        assert_eq!(previous.map(|r| r.flavor), Some("m1.large".to_owned()));
        assert_eq!(collection.len(), 1);
        assert_eq!(collection.get("c1").unwrap().flavor, "m1.small");
    }

    #[test]
    fn names_are_sorted() -> Result<()> {
        let collection: ClusterCollection = from_value(json!({"clusters": {}}))?;
        assert!(collection.is_empty());
        let mut collection = collection;
        collection.insert(record("b"));
        collection.insert(record("a"));
        assert_eq!(collection.names(), vec!["a".to_owned(), "b".to_owned()]);
        Ok(())
    }
}
