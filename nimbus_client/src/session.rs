//! Client of the remote session service (Livy REST API) used to run
//! interactive Spark sessions on a provisioned cluster.

use ::std::time::Duration;

use ::nimbus_common::{
    anyhow::anyhow,
    error::{NimbusError, Result},
    tokio::time::{sleep, Instant},
    tracing::{debug, info},
};
use ::reqwest::header::LOCATION;
use ::serde::{Deserialize, Serialize};

use crate::Credentials;

/// Interpreter kind of a session.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SessionKind {
    #[default]
    Spark,
    Pyspark,
    Sparkr,
    Sql,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    NotStarted,
    Starting,
    Idle,
    Busy,
    ShuttingDown,
    Error,
    Dead,
    Killed,
    Success,
}

impl SessionState {
    /// The session will never become idle again.
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Error | Self::Dead | Self::Killed)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Session {
    pub id: u64,
    pub state: SessionState,
    pub kind: SessionKind,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CreateSessionRequest {
    pub kind: SessionKind,
}

/// A new session together with the URL path where its status can be polled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedSession {
    pub session: Session,
    pub location: String,
}

/// Client for managing sessions.
pub struct SessionClient<'a> {
    /// Base URL of the session service.
    base_url: &'a str,
    credentials: Option<Credentials<'a>>,
    client: reqwest::Client,
}

impl<'a> SessionClient<'a> {
    pub fn new(base_url: &'a str, credentials: Option<Credentials<'a>>) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/'),
            credentials,
            client: reqwest::Client::new(),
        }
    }

    pub async fn create_session(&self, kind: SessionKind) -> Result<CreatedSession> {
        let url = self.build_url("/sessions");
        let builder = self
            .client
            .post(url)
            .json(&CreateSessionRequest { kind });
        let builder = self.enable_auth_for_request(builder);
        let response = builder.send().await?.error_for_status()?;
        let location = response
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned)
            .ok_or_else(|| {
                NimbusError::http_error(
                    Some(response.status().as_u16()),
                    anyhow!("Session response has no Location header"),
                )
            })?;
        let session: Session = response.json().await?;
        info!("Session {} created at {}", session.id, location);
        Ok(CreatedSession { session, location })
    }

    /// `location` is either a path relative to the base URL or an absolute URL.
    pub async fn get_session(&self, location: &str) -> Result<Session> {
        let url = self.build_url(location);
        let builder = self.client.get(url);
        let builder = self.enable_auth_for_request(builder);
        let session: Session = builder.send().await?.error_for_status()?.json().await?;
        debug!("Session {} is {:?}", session.id, session.state);
        Ok(session)
    }

    /// Poll the session until it is idle.
    pub async fn wait_until_idle(
        &self,
        location: &str,
        interval: Duration,
        timeout: Duration,
    ) -> Result<Session> {
        let deadline = Instant::now() + timeout;
        loop {
            let session = self.get_session(location).await?;
            if session.state == SessionState::Idle {
                info!("Session {} is idle", session.id);
                return Ok(session);
            }
            if session.state.is_failed() {
                return Err(NimbusError::fail_to_start_session(anyhow!(
                    "Session {} ended in state {:?}",
                    session.id,
                    session.state
                )));
            }
            if Instant::now() >= deadline {
                return Err(NimbusError::timeout(anyhow!(
                    "Session {} is still {:?} after {:?}",
                    session.id,
                    session.state,
                    timeout
                )));
            }
            sleep(interval).await;
        }
    }

    /// Build a full URL from a path.
    fn build_url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_owned()
        } else {
            self.base_url.to_owned() + path
        }
    }

    fn enable_auth_for_request(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.credentials {
            Some(credentials) => credentials.apply(builder),
            None => builder,
        }
    }
}
