//! Configuration shared by the Nimbus tools.

use ::std::{fs::File, io::BufReader, path::Path, time::Duration};

use ::serde::{de::DeserializeOwned, Deserialize};
use ::serde_json::from_reader;

use crate::error::{NimbusError, Result};

/// Connection settings for the OpenStack services used to provision clusters.
#[derive(Debug, Deserialize, PartialEq, Eq, Clone)]
#[serde(deny_unknown_fields)]
pub struct OpenStackConfig {
    /// Base URL of the compute (Nova) endpoint, including the version path.
    pub compute_url: String,
    /// Base URL of the network (Neutron) endpoint.
    pub network_url: String,
    /// Base URL of the image (Glance) endpoint.
    pub image_url: String,
    /// Credential key under which the auth token is looked up.
    #[serde(default = "default_token_key")]
    pub token_key: String,
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    /// How long to wait for a new server to become `ACTIVE`.
    #[serde(default = "default_active_timeout_secs")]
    pub active_timeout_secs: u64,
}

impl OpenStackConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn active_timeout(&self) -> Duration {
        Duration::from_secs(self.active_timeout_secs)
    }
}

/// Settings of the remote session service.
#[derive(Debug, Deserialize, PartialEq, Eq, Clone)]
#[serde(deny_unknown_fields)]
pub struct SessionConfig {
    pub base_url: String,
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,
    #[serde(default)]
    pub auth: Option<SessionAuth>,
}

/// Authentication of the session requests. Secrets are not written in the
/// config, only the credential keys under which they are looked up.
#[derive(Debug, Deserialize, PartialEq, Eq, Clone)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SessionAuth {
    Basic {
        username: String,
        #[serde(default)]
        password_key: Option<String>,
    },
    Bearer {
        token_key: String,
    },
}

impl SessionAuth {
    /// Credential key of the secret, if the scheme needs one.
    pub fn secret_key(&self) -> Option<&str> {
        match self {
            Self::Basic { password_key, .. } => password_key.as_deref(),
            Self::Bearer { token_key } => Some(token_key),
        }
    }
}

impl SessionConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }
}

fn default_token_key() -> String {
    "OS_AUTH_TOKEN".to_owned()
}

fn default_poll_interval_secs() -> u64 {
    2
}

fn default_active_timeout_secs() -> u64 {
    300
}

fn default_idle_timeout_secs() -> u64 {
    120
}

/// Read a JSON config file into `T`.
pub fn load_config<T, P>(path: P) -> Result<T>
where
    T: DeserializeOwned,
    P: AsRef<Path>,
{
    let file = File::open(path.as_ref()).map_err(NimbusError::fail_to_load_config)?;
    let reader = BufReader::new(file);
    from_reader(reader).map_err(NimbusError::fail_to_load_config)
}
