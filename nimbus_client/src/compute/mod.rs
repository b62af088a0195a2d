pub mod keystone;
pub mod openstack_client;

use ::core::future::Future;
use ::std::{collections::BTreeMap, time::Duration};

use ::nimbus_common::{
    anyhow::anyhow,
    error::{NimbusError, Result},
    tokio::time::{sleep, Instant},
    tracing::{debug, info},
};
use ::serde::{Deserialize, Serialize};

pub use keystone::PasswordAuth;
pub use openstack_client::OpenStackClient;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Image {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Flavor {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Network {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Keypair {
    pub name: String,
    #[serde(default)]
    pub fingerprint: Option<String>,
}

/// Server status reported by the compute service.
/// Transitional statuses other than `BUILD` are folded into `Other`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServerStatus {
    Active,
    Build,
    Error,
    Shutoff,
    Deleted,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServerAddress {
    pub addr: String,
    #[serde(default)]
    pub version: u8,
    /// `fixed` or `floating`
    #[serde(rename = "OS-EXT-IPS:type", default)]
    pub ip_type: Option<String>,
}

/// A compute instance. Responses to create and search requests only carry
/// part of the fields, the rest stay at their defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Server {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub status: Option<ServerStatus>,
    /// Addresses grouped by network name.
    #[serde(default)]
    pub addresses: BTreeMap<String, Vec<ServerAddress>>,
    #[serde(rename = "accessIPv4", default)]
    pub access_ipv4: String,
}

impl Server {
    /// The fixed address of the server on `network`, IPv4 preferred.
    /// Floating addresses are never returned.
    pub fn internal_ip(&self, network: &str) -> Option<&str> {
        let mut fixed = self
            .addresses
            .get(network)?
            .iter()
            .filter(|a| a.ip_type.as_deref() != Some("floating"));
        let first = fixed.clone().next();
        fixed
            .find(|a| a.version == 4)
            .or(first)
            .map(|a| a.addr.as_str())
    }
}

/// Parameters of a new server, referring to resources by id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateServerRequest {
    pub name: String,
    pub image_id: String,
    pub flavor_id: String,
    pub network_ids: Vec<String>,
    pub key_name: Option<String>,
    pub security_groups: Vec<String>,
    /// Plain text user data (cloud-init script); encoded by the client.
    pub user_data: Option<String>,
}

/// Operations on the cloud that Nimbus needs to build and tear down clusters.
/// Lookups by name fail with a `NotFound` error when nothing matches.
pub trait ComputeClient: Send + Sync {
    fn find_image(&self, name: &str) -> impl Future<Output = Result<Image>> + Send;

    fn find_flavor(&self, name: &str) -> impl Future<Output = Result<Flavor>> + Send;

    fn find_network(&self, name: &str) -> impl Future<Output = Result<Network>> + Send;

    fn get_keypair(&self, name: &str) -> impl Future<Output = Result<Keypair>> + Send;

    /// Request a new server. The server is usually still building when this returns.
    fn create_server(
        &self,
        request: CreateServerRequest,
    ) -> impl Future<Output = Result<Server>> + Send;

    fn get_server(&self, id: &str) -> impl Future<Output = Result<Server>> + Send;

    fn find_server(&self, name: &str) -> impl Future<Output = Result<Server>> + Send;

    fn delete_server(&self, id: &str) -> impl Future<Output = Result<()>> + Send;
}

/// Poll the server until it is `ACTIVE`.
/// # Return
/// - `Ok(Server)` with the details of the active server.
/// - `Err(_)` with type `FailToProvision` if the server goes into `ERROR`.
/// - `Err(_)` with type `Timeout` if the server is not active after `timeout`.
pub async fn wait_for_server_active<C: ComputeClient>(
    client: &C,
    id: &str,
    interval: Duration,
    timeout: Duration,
) -> Result<Server> {
    let deadline = Instant::now() + timeout;
    loop {
        let server = client.get_server(id).await?;
        match server.status {
            Some(ServerStatus::Active) => {
                info!("Server {} ({}) is active", server.name, id);
                return Ok(server);
            }
            Some(ServerStatus::Error) => {
                return Err(NimbusError::fail_to_provision(anyhow!(
                    "Server {} ({}) is in ERROR state",
                    server.name,
                    id
                )));
            }
            status => debug!("Server {} is {:?}, waiting", id, status),
        }
        if Instant::now() >= deadline {
            return Err(NimbusError::timeout(anyhow!(
                "Server {} is not active after {:?}",
                id,
                timeout
            )));
        }
        sleep(interval).await;
    }
}
