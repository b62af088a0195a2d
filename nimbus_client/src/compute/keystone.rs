//! Keystone v3 password login, used when no pre-issued token is configured.

use ::nimbus_common::{
    anyhow::anyhow,
    credentials::CredentialChain,
    error::{NimbusError, Result},
    serde_json::{json, Value},
    tracing::info,
};

/// Password credentials of an OpenStack user, scoped to one project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordAuth {
    /// Identity endpoint including the version, e.g. `http://keystone:5000/v3`.
    pub auth_url: String,
    pub username: String,
    pub password: String,
    pub user_domain_id: String,
    pub project_id: Option<String>,
    pub project_name: Option<String>,
}

impl PasswordAuth {
    /// Credential keys that must all resolve for a password login.
    pub const REQUIRED_KEYS: [&'static str; 4] =
        ["auth_url", "username", "password", "user_domain_id"];

    /// Resolve the login parameters through the credential chain.
    /// The project is given by `project_id` or, failing that, `project_name`.
    pub fn from_chain(chain: &CredentialChain) -> Result<Self> {
        let mut values = chain.require(&Self::REQUIRED_KEYS)?;
        let project_id = chain.load("project_id").ok();
        let project_name = chain.load("project_name").ok();
        if project_id.is_none() && project_name.is_none() {
            return Err(NimbusError::not_found(anyhow!(
                "Could not load credential 'project_id' or 'project_name'"
            )));
        }
        let mut take = |key: &str| values.remove(key).unwrap_or_default();
        Ok(Self {
            auth_url: take("auth_url"),
            username: take("username"),
            password: take("password"),
            user_domain_id: take("user_domain_id"),
            project_id,
            project_name,
        })
    }

    fn body(&self) -> Value {
        let project = match &self.project_id {
            Some(id) => json!({ "id": id }),
            None => json!({
                "name": self.project_name,
                "domain": { "id": self.user_domain_id },
            }),
        };
        json!({
            "auth": {
                "identity": {
                    "methods": ["password"],
                    "password": {
                        "user": {
                            "name": self.username,
                            "domain": { "id": self.user_domain_id },
                            "password": self.password,
                        }
                    }
                },
                "scope": { "project": project }
            }
        })
    }
}

const SUBJECT_TOKEN_HEADER: &str = "X-Subject-Token";

/// Log in with `auth` and return the issued token.
pub async fn issue_token(client: &reqwest::Client, auth: &PasswordAuth) -> Result<String> {
    let url = format!("{}/auth/tokens", auth.auth_url.trim_end_matches('/'));
    let response = client
        .post(&url)
        .json(&auth.body())
        .send()
        .await?
        .error_for_status()?;
    let token = response
        .headers()
        .get(SUBJECT_TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned)
        .ok_or_else(|| {
            NimbusError::http_error(
                Some(response.status().as_u16()),
                anyhow!("Identity response has no {} header", SUBJECT_TOKEN_HEADER),
            )
        })?;
    info!("Issued token for user {} at {}", auth.username, auth.auth_url);
    Ok(token)
}
