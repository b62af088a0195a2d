//! Build and tear down master/slave clusters on top of a [ComputeClient].

use ::std::time::Duration;

use ::nimbus_common::{
    anyhow::anyhow,
    cluster::{ClusterRecord, MasterNode, SlaveNode},
    error::{NimbusError, NimbusErrorType, Result},
    tracing::{error, info, warn},
};
use ::serde::{Deserialize, Serialize};

use crate::compute::{wait_for_server_active, ComputeClient, CreateServerRequest, Server};

/// Description of a cluster to provision.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ClusterSpec {
    pub name: String,
    pub masters: u32,
    pub slaves: u32,
    pub flavor: String,
    pub image: String,
    pub internal_network: String,
    pub external_network: String,
    pub security_group: String,
    pub keypair: String,
    /// cloud-init script passed to every instance
    #[serde(default)]
    pub user_data: Option<String>,
}

impl ClusterSpec {
    pub fn master_name(&self, index: u32) -> String {
        format!("{}-master-{}", self.name, index)
    }

    pub fn slave_name(&self, index: u32) -> String {
        format!("{}-slave-{}", self.name, index)
    }
}

/// How to wait for new servers to become active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitOptions {
    pub interval: Duration,
    pub timeout: Duration,
}

/// Create the masters and slaves of `spec` and wait until all of them are active.
/// Servers created before a failure are left in place.
/// # Return
/// The [ClusterRecord] describing the new cluster, nodes in creation order.
pub async fn provision_cluster<C: ComputeClient>(
    client: &C,
    spec: &ClusterSpec,
    wait: WaitOptions,
) -> Result<ClusterRecord> {
    info!(
        "Provisioning cluster {} with {} masters and {} slaves",
        spec.name, spec.masters, spec.slaves
    );
    let image = client.find_image(&spec.image).await?;
    let flavor = client.find_flavor(&spec.flavor).await?;
    let network = client.find_network(&spec.internal_network).await?;
    let keypair = client.get_keypair(&spec.keypair).await?;

    let template = CreateServerRequest {
        name: String::new(),
        image_id: image.id,
        flavor_id: flavor.id,
        network_ids: vec![network.id],
        key_name: Some(keypair.name),
        security_groups: vec![spec.security_group.clone()],
        user_data: spec.user_data.clone(),
    };

    let names: Vec<String> = (0..spec.masters)
        .map(|i| spec.master_name(i))
        .chain((0..spec.slaves).map(|i| spec.slave_name(i)))
        .collect();
    let mut created = Vec::with_capacity(names.len());
    for name in names {
        let request = CreateServerRequest {
            name,
            ..template.clone()
        };
        let server = client
            .create_server(request)
            .await
            .inspect_err(|e| error!("Failed to create server for cluster {}: {}", spec.name, e))?;
        created.push(server);
    }

    let mut nodes = Vec::with_capacity(created.len());
    for server in created {
        let active = wait_for_server_active(client, &server.id, wait.interval, wait.timeout)
            .await
            .inspect_err(|e| error!("Cluster {} is incomplete: {}", spec.name, e))?;
        let ip = node_ip(&active, &server.name, &spec.internal_network)?;
        nodes.push((server.name, ip));
    }

    let mut nodes = nodes.into_iter();
    let masters = nodes
        .by_ref()
        .take(spec.masters as usize)
        .map(|(name, ip)| MasterNode { name, ip })
        .collect();
    let slaves = nodes
        .map(|(name, internal_ip)| SlaveNode { name, internal_ip })
        .collect();

    info!("Cluster {} is ready", spec.name);
    Ok(ClusterRecord {
        name: spec.name.clone(),
        slave_count: spec.slaves,
        master_count: spec.masters,
        flavor: spec.flavor.clone(),
        internal_network: spec.internal_network.clone(),
        external_network: spec.external_network.clone(),
        security_group: spec.security_group.clone(),
        image: spec.image.clone(),
        slaves,
        masters,
    })
}

fn node_ip(server: &Server, name: &str, network: &str) -> Result<String> {
    server
        .internal_ip(network)
        .map(str::to_owned)
        .ok_or_else(|| {
            NimbusError::fail_to_provision(anyhow!(
                "Server {} has no address on network {}",
                name,
                network
            ))
        })
}

/// Delete every master and slave server of the cluster.
/// Servers that no longer exist are skipped.
pub async fn teardown_cluster<C: ComputeClient>(client: &C, record: &ClusterRecord) -> Result<()> {
    info!("Tearing down cluster {}", record.name);
    let names = record
        .masters
        .iter()
        .map(|m| m.name.as_str())
        .chain(record.slaves.iter().map(|s| s.name.as_str()));
    for name in names {
        match client.find_server(name).await {
            Ok(server) => client.delete_server(&server.id).await?,
            Err(e) if e.get_error_type() == NimbusErrorType::NotFound => {
                warn!("Server {} of cluster {} is already gone", name, record.name);
            }
            Err(e) => return Err(e),
        }
    }
    Ok(())
}
