//! Configuration for the nimbus command line

use ::std::path::PathBuf;

use ::nimbus_common::{
    config::{OpenStackConfig, SessionConfig},
    credentials::CredentialChain,
    error::Result,
};
use ::serde::Deserialize;

#[derive(Debug, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct CliConfig {
    /// JSON file holding the cluster registry
    pub registry_path: PathBuf,
    /// required by `cluster provision` and `cluster teardown`
    #[serde(default)]
    pub openstack: Option<OpenStackConfig>,
    /// required by the `session` commands
    #[serde(default)]
    pub session: Option<SessionConfig>,
    /// JSON credentials file, `~/.credentials.json` if not set
    #[serde(default)]
    pub credentials_path: Option<PathBuf>,
}

impl CliConfig {
    /// Environment first, then the credentials file.
    pub fn credential_chain(&self) -> Result<CredentialChain> {
        CredentialChain::default_chain(self.credentials_path.as_deref())
    }
}
