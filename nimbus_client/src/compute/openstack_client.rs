use ::base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use ::nimbus_common::{
    anyhow::anyhow,
    config::OpenStackConfig,
    error::{NimbusError, Result},
    serde_json::{json, Value},
    tracing::{debug, info},
};
use ::reqwest::{Method, RequestBuilder, Response, StatusCode};
use ::serde::{de::DeserializeOwned, Deserialize};

use super::{
    keystone::{issue_token, PasswordAuth},
    ComputeClient, CreateServerRequest, Flavor, Image, Keypair, Network, Server,
};

#[derive(Deserialize)]
struct Images {
    images: Vec<Image>,
}

#[derive(Deserialize)]
struct Flavors {
    flavors: Vec<Flavor>,
}

#[derive(Deserialize)]
struct Networks {
    networks: Vec<Network>,
}

#[derive(Deserialize)]
struct KeypairBody {
    keypair: Keypair,
}

#[derive(Deserialize)]
struct ServerBody {
    server: Server,
}

#[derive(Deserialize)]
struct Servers {
    servers: Vec<Server>,
}

/// Client of the OpenStack compute, network and image REST APIs,
/// authenticated with a pre-issued token or one obtained by `login`.
#[derive(Clone)]
pub struct OpenStackClient {
    compute_url: String,
    network_url: String,
    image_url: String,
    token: String,
    client: reqwest::Client,
}

impl OpenStackClient {
    const AUTH_HEADER: &'static str = "X-Auth-Token";

    pub fn new(config: &OpenStackConfig, token: String) -> Self {
        Self::with_client(config, token, reqwest::Client::new())
    }

    /// Log in to Keystone with a password and build the client with the issued token.
    pub async fn login(config: &OpenStackConfig, auth: &PasswordAuth) -> Result<Self> {
        let client = reqwest::Client::new();
        let token = issue_token(&client, auth).await?;
        Ok(Self::with_client(config, token, client))
    }

    fn with_client(config: &OpenStackConfig, token: String, client: reqwest::Client) -> Self {
        Self {
            compute_url: config.compute_url.trim_end_matches('/').to_owned(),
            network_url: config.network_url.trim_end_matches('/').to_owned(),
            image_url: config.image_url.trim_end_matches('/').to_owned(),
            token,
            client,
        }
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        self.client
            .request(method, url)
            .header(Self::AUTH_HEADER, &self.token)
    }

    /// Send the request; a 404 response becomes the error built by `not_found`.
    async fn send(
        builder: RequestBuilder,
        not_found: impl FnOnce() -> NimbusError,
    ) -> Result<Response> {
        let response = builder.send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(not_found());
        }
        Ok(response.error_for_status()?)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
        not_found: impl FnOnce() -> NimbusError,
    ) -> Result<T> {
        let response = Self::send(builder, not_found).await?;
        Ok(response.json().await?)
    }

    fn resource_not_found(kind: &str, name: &str) -> NimbusError {
        NimbusError::not_found(anyhow!("{} {} not found", kind, name))
    }
}

impl ComputeClient for OpenStackClient {
    async fn find_image(&self, name: &str) -> Result<Image> {
        let url = format!("{}/v2/images", self.image_url);
        let builder = self.request(Method::GET, &url).query(&[("name", name)]);
        let Images { images } = self
            .get_json(builder, || Self::resource_not_found("Image", name))
            .await?;
        images
            .into_iter()
            .find(|i| i.name == name || i.id == name)
            .ok_or_else(|| Self::resource_not_found("Image", name))
    }

    async fn find_flavor(&self, name: &str) -> Result<Flavor> {
        // flavors cannot be filtered by name on the server side
        let url = format!("{}/flavors", self.compute_url);
        let builder = self.request(Method::GET, &url);
        let Flavors { flavors } = self
            .get_json(builder, || Self::resource_not_found("Flavor", name))
            .await?;
        flavors
            .into_iter()
            .find(|f| f.name == name || f.id == name)
            .ok_or_else(|| Self::resource_not_found("Flavor", name))
    }

    async fn find_network(&self, name: &str) -> Result<Network> {
        let url = format!("{}/v2.0/networks", self.network_url);
        let builder = self.request(Method::GET, &url).query(&[("name", name)]);
        let Networks { networks } = self
            .get_json(builder, || Self::resource_not_found("Network", name))
            .await?;
        networks
            .into_iter()
            .find(|n| n.name == name || n.id == name)
            .ok_or_else(|| Self::resource_not_found("Network", name))
    }

    async fn get_keypair(&self, name: &str) -> Result<Keypair> {
        let url = format!("{}/os-keypairs/{}", self.compute_url, name);
        let builder = self.request(Method::GET, &url);
        let KeypairBody { keypair } = self
            .get_json(builder, || Self::resource_not_found("Keypair", name))
            .await?;
        Ok(keypair)
    }

    async fn create_server(&self, request: CreateServerRequest) -> Result<Server> {
        let url = format!("{}/servers", self.compute_url);
        let networks: Vec<Value> = request
            .network_ids
            .iter()
            .map(|id| json!({ "uuid": id }))
            .collect();
        let mut server = json!({
            "name": request.name,
            "imageRef": request.image_id,
            "flavorRef": request.flavor_id,
            "networks": networks,
        });
        if let Some(key_name) = &request.key_name {
            server["key_name"] = json!(key_name);
        }
        if !request.security_groups.is_empty() {
            let groups: Vec<Value> = request
                .security_groups
                .iter()
                .map(|name| json!({ "name": name }))
                .collect();
            server["security_groups"] = json!(groups);
        }
        if let Some(user_data) = &request.user_data {
            server["user_data"] = json!(BASE64.encode(user_data));
        }

        let builder = self
            .request(Method::POST, &url)
            .json(&json!({ "server": server }));
        let ServerBody { server: mut created } = self
            .get_json(builder, || Self::resource_not_found("Endpoint", &url))
            .await?;
        // the create response only carries the id
        if created.name.is_empty() {
            created.name = request.name;
        }
        info!("Requested server {} ({})", created.name, created.id);
        Ok(created)
    }

    async fn get_server(&self, id: &str) -> Result<Server> {
        let url = format!("{}/servers/{}", self.compute_url, id);
        let builder = self.request(Method::GET, &url);
        let ServerBody { server } = self
            .get_json(builder, || Self::resource_not_found("Server", id))
            .await?;
        debug!("Server {} status {:?}", id, server.status);
        Ok(server)
    }

    async fn find_server(&self, name: &str) -> Result<Server> {
        // the name filter of the compute API is a regular expression, so keep exact matches only
        let url = format!("{}/servers", self.compute_url);
        let builder = self.request(Method::GET, &url).query(&[("name", name)]);
        let Servers { servers } = self
            .get_json(builder, || Self::resource_not_found("Server", name))
            .await?;
        servers
            .into_iter()
            .find(|s| s.name == name || s.id == name)
            .ok_or_else(|| Self::resource_not_found("Server", name))
    }

    async fn delete_server(&self, id: &str) -> Result<()> {
        let url = format!("{}/servers/{}", self.compute_url, id);
        let builder = self.request(Method::DELETE, &url);
        Self::send(builder, || Self::resource_not_found("Server", id)).await?;
        info!("Deleted server {}", id);
        Ok(())
    }
}
