use ::serde::{Deserialize, Serialize};

use super::{MasterNode, SlaveNode, StoreClusterRequest};
use crate::error::{NimbusError, Result};

/// Whole description of a provisioned cluster, as kept in the registry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClusterRecord {
    #[serde(rename = "cluster_name")]
    pub name: String,
    #[serde(rename = "slaves_number")]
    pub slave_count: u32,
    #[serde(rename = "masters_number")]
    pub master_count: u32,
    pub flavor: String,
    pub internal_network: String,
    pub external_network: String,
    pub security_group: String,
    pub image: String,
    pub slaves: Vec<SlaveNode>,
    pub masters: Vec<MasterNode>,
}

/// Take a required field out of a request, or report which one is missing.
fn required<T>(value: Option<T>, field: &str) -> Result<T> {
    value.ok_or_else(|| NimbusError::field_missing(field))
}

impl TryFrom<StoreClusterRequest> for ClusterRecord {
    type Error = NimbusError;

    fn try_from(value: StoreClusterRequest) -> Result<Self> {
        let slaves = required(value.slaves, "slaves")?
            .into_iter()
            .map(|slave| -> Result<SlaveNode> {
                Ok(SlaveNode {
                    name: required(slave.slave_name, "slave_name")?,
                    internal_ip: required(slave.slave_ip, "slave_ip")?,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        let masters = required(value.masters, "masters")?
            .into_iter()
            .map(|master| -> Result<MasterNode> {
                Ok(MasterNode {
                    name: required(master.master_name, "master_name")?,
                    ip: required(master.master_ip, "master_ip")?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            name: required(value.name, "name")?,
            slave_count: required(value.numslaves, "numslaves")?,
            master_count: required(value.nummasters, "nummasters")?,
            flavor: required(value.flavor, "flavor")?,
            internal_network: required(value.internal_network, "internal_network")?,
            external_network: required(value.external_network, "external_network")?,
            security_group: required(value.security, "security")?,
            image: required(value.image, "image")?,
            slaves,
            masters,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NimbusErrorType;
    use ::anyhow::Result;
    use ::serde_json::{from_value, json, to_value};

    fn request_json() -> serde_json::Value {
        json!({
            "name": "cluster_2",
            "numslaves": 2,
            "nummasters": 1,
            "flavor": "flavor_1",
            "internal_network": "rshad_network",
            "external_network": "external",
            "security": "default",
            "image": "CentOS7",
            "slaves": [
                {"slave_name": "instance_1", "slave_ip": "0.0.0.0"},
                {"slave_name": "instance_2", "slave_ip": "1.1.1.1"}
            ],
            "masters": [
                {"master_name": "instance_3", "master_ip": "2.2.2.2"}
            ]
        })
    }

    #[test]
    fn convert_request_to_record() -> Result<()> {
        let request: StoreClusterRequest = from_value(request_json())?;
        let record = ClusterRecord::try_from(request)?;
        assert_eq!(record.name, "cluster_2");
        assert_eq!(record.slave_count, 2);
        assert_eq!(record.master_count, 1);
        assert_eq!(record.security_group, "default");
        assert_eq!(
            record.slaves,
            vec![
                SlaveNode {
                    name: "instance_1".to_owned(),
                    internal_ip: "0.0.0.0".to_owned()
                },
                SlaveNode {
                    name: "instance_2".to_owned(),
                    internal_ip: "1.1.1.1".to_owned()
                },
            ]
        );
        assert_eq!(record.masters[0].ip, "2.2.2.2");
        Ok(())
    }

    #[test]
    fn missing_top_level_field() -> Result<()> {
        let mut value = request_json();
        value.as_object_mut().unwrap().remove("flavor");
        let request: StoreClusterRequest = from_value(value)?;
        let err = ClusterRecord::try_from(request).unwrap_err();
        assert_eq!(err.get_error_type(), NimbusErrorType::MissingField);
        assert_eq!(err.to_string(), "Missing field: Field `flavor` is required");
        Ok(())
    }

    #[test]
    fn missing_node_field() -> Result<()> {
        let mut value = request_json();
        value["masters"] = json!([{"master_name": "m"}]);
        let request: StoreClusterRequest = from_value(value)?;
        let err = ClusterRecord::try_from(request).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Missing field: Field `master_ip` is required"
        );
        Ok(())
    }

    #[test]
    fn record_uses_registry_field_names() -> Result<()> {
        let request: StoreClusterRequest = from_value(request_json())?;
        let record = ClusterRecord::try_from(request)?;
        assert_eq!(
            to_value(&record)?,
            json!({
                "cluster_name": "cluster_2",
                "slaves_number": 2,
                "masters_number": 1,
                "flavor": "flavor_1",
                "internal_network": "rshad_network",
                "external_network": "external",
                "security_group": "default",
                "image": "CentOS7",
                "slaves": [
                    {"slave_name": "instance_1", "slave_internal_IP": "0.0.0.0"},
                    {"slave_name": "instance_2", "slave_internal_IP": "1.1.1.1"}
                ],
                "masters": [
                    {"master_name": "instance_3", "master_IP": "2.2.2.2"}
                ]
            })
        );
        Ok(())
    }
}
