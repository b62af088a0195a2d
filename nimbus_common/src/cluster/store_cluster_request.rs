use ::serde::{Deserialize, Serialize};

/// Request body describing a cluster to store.
/// Every field is optional on the wire so that an absent one is reported
/// as a missing field when converting into a [super::ClusterRecord].
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct StoreClusterRequest {
    pub name: Option<String>,
    pub numslaves: Option<u32>,
    pub nummasters: Option<u32>,
    pub flavor: Option<String>,
    pub internal_network: Option<String>,
    pub external_network: Option<String>,
    /// Name of the security group.
    pub security: Option<String>,
    pub image: Option<String>,
    pub slaves: Option<Vec<SlaveArgs>>,
    pub masters: Option<Vec<MasterArgs>>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct SlaveArgs {
    pub slave_name: Option<String>,
    pub slave_ip: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct MasterArgs {
    pub master_name: Option<String>,
    pub master_ip: Option<String>,
}
