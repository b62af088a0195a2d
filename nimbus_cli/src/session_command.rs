//! `nimbus session ...`

use ::std::io::Write;

use ::nimbus_client::{
    session::{Session, SessionClient},
    Credentials,
};
use ::nimbus_common::{
    anyhow::anyhow,
    config::{SessionAuth, SessionConfig},
    error::{NimbusError, Result},
    serde_json::{self, json},
};

use crate::{config::CliConfig, SessionCommand};

pub async fn run<W: Write>(config: &CliConfig, command: SessionCommand, out: &mut W) -> Result<()> {
    let session_config = session_config(config)?;
    let secret = match session_config.auth.as_ref().and_then(SessionAuth::secret_key) {
        Some(key) => Some(config.credential_chain()?.load(key)?),
        None => None,
    };
    let credentials = session_config.auth.as_ref().map(|auth| match auth {
        SessionAuth::Basic { username, .. } => Credentials::Basic {
            username: username.as_str(),
            password: secret.as_deref(),
        },
        SessionAuth::Bearer { .. } => Credentials::Bearer {
            token: secret.as_deref().unwrap_or_default(),
        },
    });
    let client = SessionClient::new(&session_config.base_url, credentials);
    match command {
        SessionCommand::Create { kind, wait } => {
            let created = client.create_session(kind.into()).await?;
            let session = if wait {
                client
                    .wait_until_idle(
                        &created.location,
                        session_config.poll_interval(),
                        session_config.idle_timeout(),
                    )
                    .await?
            } else {
                created.session
            };
            write_session(&session, Some(&created.location), out)
        }
        SessionCommand::Status { location } => {
            let session = client.get_session(&location).await?;
            write_session(&session, None, out)
        }
    }
}

fn session_config(config: &CliConfig) -> Result<&SessionConfig> {
    config.session.as_ref().ok_or_else(|| {
        NimbusError::fail_to_load_config(anyhow!("Missing `session` section in config"))
    })
}

fn write_session<W: Write>(session: &Session, location: Option<&str>, out: &mut W) -> Result<()> {
    let mut value = serde_json::to_value(session)?;
    if let Some(location) = location {
        value["location"] = json!(location);
    }
    serde_json::to_writer_pretty(&mut *out, &value)?;
    writeln!(out)?;
    Ok(())
}
