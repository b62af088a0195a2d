//! Clients used by Nimbus to provision clusters on OpenStack
//! and to open sessions on the remote session service.

pub mod compute;
pub mod provision;
pub mod session;

pub enum Credentials<'a> {
    Basic {
        username: &'a str,
        password: Option<&'a str>,
    },
    Bearer {
        token: &'a str,
    },
}

impl Credentials<'_> {
    /// Enable authentication for a request builder.
    pub(crate) fn apply(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self {
            Self::Basic { username, password } => builder.basic_auth(username, *password),
            Self::Bearer { token } => builder.bearer_auth(token),
        }
    }
}
