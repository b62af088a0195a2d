//! `nimbus cluster ...`

use ::std::io::Write;

use ::nimbus_client::{
    compute::{OpenStackClient, PasswordAuth},
    provision::{provision_cluster, teardown_cluster, ClusterSpec, WaitOptions},
};
use ::nimbus_common::{
    anyhow::anyhow,
    cluster::{ClusterRecord, StoreClusterRequest},
    config::OpenStackConfig,
    error::{NimbusError, NimbusErrorType, Result},
    registry::{ClusterRegistry, FileStore},
    serde_json,
    tracing::{debug, info},
};

use crate::{config::CliConfig, read_json, ClusterCommand};

pub async fn run<W: Write>(config: &CliConfig, command: ClusterCommand, out: &mut W) -> Result<()> {
    match command {
        ClusterCommand::Store { request } => {
            let request: StoreClusterRequest = read_json(&request)?;
            create_registry(config)?.store(ClusterRecord::try_from(request)?)
        }
        ClusterCommand::Add { request } => {
            let request: StoreClusterRequest = read_json(&request)?;
            create_registry(config)?.store_if_absent(ClusterRecord::try_from(request)?)
        }
        ClusterCommand::Show { name } => {
            let record = open_registry(config).lookup(&name)?;
            write_record(&record, out)
        }
        ClusterCommand::List => {
            for name in open_registry(config).list()? {
                writeln!(out, "{}", name)?;
            }
            Ok(())
        }
        ClusterCommand::Delete { name } => {
            open_registry(config).delete(&name)?;
            Ok(())
        }
        ClusterCommand::Reset => create_registry(config)?.reset(),
        ClusterCommand::Provision { spec, no_store } => {
            let spec: ClusterSpec = read_json(&spec)?;
            let openstack = openstack_config(config)?;
            // refuse a taken name before any server is created
            let registry = if no_store {
                None
            } else {
                let registry = create_registry(config)?;
                ensure_absent(&registry, &spec.name)?;
                Some(registry)
            };
            let client = connect(config, openstack).await?;
            let wait = WaitOptions {
                interval: openstack.poll_interval(),
                timeout: openstack.active_timeout(),
            };
            let record = provision_cluster(&client, &spec, wait).await?;
            match &registry {
                Some(registry) => registry.store_if_absent(record.clone())?,
                None => info!("Cluster {} is not recorded in the registry", record.name),
            }
            write_record(&record, out)
        }
        ClusterCommand::Teardown { name } => {
            let registry = open_registry(config);
            let record = registry.lookup(&name)?;
            let client = connect(config, openstack_config(config)?).await?;
            teardown_cluster(&client, &record).await?;
            registry.delete(&name)?;
            Ok(())
        }
    }
}

/// Registry for commands that only change existing clusters or read them;
/// a missing registry file is an error and is not created.
fn open_registry(config: &CliConfig) -> ClusterRegistry<FileStore> {
    ClusterRegistry::new(FileStore::new(&config.registry_path))
}

/// Registry for commands that add clusters, creating the file if needed.
fn create_registry(config: &CliConfig) -> Result<ClusterRegistry<FileStore>> {
    Ok(ClusterRegistry::new(FileStore::init(&config.registry_path)?))
}

fn ensure_absent(registry: &ClusterRegistry<FileStore>, name: &str) -> Result<()> {
    match registry.lookup(name) {
        Ok(_) => Err(NimbusError::cluster_already_exists(name)),
        Err(e) if e.get_error_type() == NimbusErrorType::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

fn openstack_config(config: &CliConfig) -> Result<&OpenStackConfig> {
    config.openstack.as_ref().ok_or_else(|| {
        NimbusError::fail_to_load_config(anyhow!("Missing `openstack` section in config"))
    })
}

/// Log in to Keystone with the password credentials of the credential chain,
/// or use the pre-issued token stored under `token_key` when there are none.
async fn connect(config: &CliConfig, openstack: &OpenStackConfig) -> Result<OpenStackClient> {
    let chain = config.credential_chain()?;
    match PasswordAuth::from_chain(&chain) {
        Ok(auth) => OpenStackClient::login(openstack, &auth).await,
        Err(e) if e.get_error_type() == NimbusErrorType::NotFound => {
            debug!("No password credentials ({}), using {}", e, openstack.token_key);
            let token = chain.load(&openstack.token_key)?;
            Ok(OpenStackClient::new(openstack, token))
        }
        Err(e) => Err(e),
    }
}

fn write_record<W: Write>(record: &ClusterRecord, out: &mut W) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, record)?;
    writeln!(out)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ::httpmock::prelude::*;
    use ::nimbus_common::{serde_json::json, tokio};
    use ::std::{fs, path::Path, path::PathBuf};
    use ::tempfile::TempDir;

    fn get_config(dir: &TempDir) -> CliConfig {
        CliConfig {
            registry_path: dir.path().join("clusters.json"),
            openstack: None,
            session: None,
            credentials_path: None,
        }
    }

    fn write_spec(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(format!("{}-spec.json", name));
        let spec = json!({
            "name": name,
            "masters": 1,
            "slaves": 0,
            "flavor": "m1.high",
            "image": "Fedora27",
            "internal_network": "provider",
            "external_network": "public",
            "security_group": "default",
            "keypair": "key-one"
        });
        fs::write(&path, spec.to_string()).unwrap();
        path
    }

    fn write_request(dir: &Path, name: &str, flavor: &str) -> PathBuf {
        let path = dir.join(format!("{}-{}.json", name, flavor));
        let request = json!({
            "name": name,
            "numslaves": 1,
            "nummasters": 1,
            "flavor": flavor,
            "internal_network": "rshad_network",
            "external_network": "external",
            "security": "default",
            "image": "CentOS7",
            "slaves": [{"slave_name": "instance_1", "slave_ip": "0.0.0.0"}],
            "masters": [{"master_name": "instance_2", "master_ip": "1.1.1.1"}]
        });
        fs::write(&path, request.to_string()).unwrap();
        path
    }

    async fn run_to_string(config: &CliConfig, command: ClusterCommand) -> Result<String> {
        let mut out = Vec::new();
        run(config, command, &mut out).await?;
        Ok(String::from_utf8(out).unwrap())
    }

    #[tokio::test]
    async fn store_then_show() {
        let dir = TempDir::new().unwrap();
        let config = get_config(&dir);
        let request = write_request(dir.path(), "c1", "f1");
        run_to_string(&config, ClusterCommand::Store { request })
            .await
            .unwrap();

        let output = run_to_string(&config, ClusterCommand::Show { name: "c1".to_owned() })
            .await
            .unwrap();
        let shown: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(shown["cluster_name"], "c1");
        assert_eq!(shown["security_group"], "default");
        assert_eq!(shown["slaves"][0]["slave_internal_IP"], "0.0.0.0");
        assert_eq!(shown["masters"][0]["master_IP"], "1.1.1.1");
    }

    #[tokio::test]
    async fn add_refuses_existing_cluster() {
        let dir = TempDir::new().unwrap();
        let config = get_config(&dir);
        let first = write_request(dir.path(), "c1", "f1");
        let second = write_request(dir.path(), "c1", "f2");
        run_to_string(&config, ClusterCommand::Add { request: first })
            .await
            .unwrap();
        let err = run_to_string(&config, ClusterCommand::Add { request: second })
            .await
            .unwrap_err();
        assert_eq!(err.get_error_type(), NimbusErrorType::AlreadyExists);
    }

    #[tokio::test]
    async fn store_incomplete_request() {
        let dir = TempDir::new().unwrap();
        let config = get_config(&dir);
        let request = dir.path().join("partial.json");
        fs::write(&request, r#"{"name": "c1", "numslaves": 1}"#).unwrap();
        let err = run_to_string(&config, ClusterCommand::Store { request })
            .await
            .unwrap_err();
        assert_eq!(err.get_error_type(), NimbusErrorType::MissingField);
    }

    #[tokio::test]
    async fn delete_is_persisted() {
        let dir = TempDir::new().unwrap();
        let config = get_config(&dir);
        for name in ["c1", "c2"] {
            let request = write_request(dir.path(), name, "f1");
            run_to_string(&config, ClusterCommand::Store { request })
                .await
                .unwrap();
        }
        run_to_string(&config, ClusterCommand::Delete { name: "c1".to_owned() })
            .await
            .unwrap();

        let on_disk: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&config.registry_path).unwrap()).unwrap();
        assert!(on_disk["clusters"].get("c1").is_none());
        assert!(on_disk["clusters"].get("c2").is_some());
        let output = run_to_string(&config, ClusterCommand::List).await.unwrap();
        assert_eq!(output, "c2\n");
    }

    #[tokio::test]
    async fn show_unknown_cluster() {
        let dir = TempDir::new().unwrap();
        let config = get_config(&dir);
        let request = write_request(dir.path(), "c1", "f1");
        run_to_string(&config, ClusterCommand::Store { request })
            .await
            .unwrap();
        let err = run_to_string(&config, ClusterCommand::Show { name: "c9".to_owned() })
            .await
            .unwrap_err();
        assert_eq!(err.get_error_type(), NimbusErrorType::NotFound);
    }

    #[tokio::test]
    async fn read_commands_do_not_create_registry() {
        let dir = TempDir::new().unwrap();
        let mut config = get_config(&dir);
        config.registry_path = dir.path().join("state").join("clusters.json");

        let err = run_to_string(&config, ClusterCommand::Show { name: "c1".to_owned() })
            .await
            .unwrap_err();
        assert_eq!(err.get_error_type(), NimbusErrorType::IOError);
        let err = run_to_string(&config, ClusterCommand::List).await.unwrap_err();
        assert_eq!(err.get_error_type(), NimbusErrorType::IOError);
        assert!(!config.registry_path.exists());
        assert!(!dir.path().join("state").exists());
    }

    #[tokio::test]
    async fn reset_empties_registry() {
        let dir = TempDir::new().unwrap();
        let config = get_config(&dir);
        let request = write_request(dir.path(), "c1", "f1");
        run_to_string(&config, ClusterCommand::Store { request })
            .await
            .unwrap();
        run_to_string(&config, ClusterCommand::Reset).await.unwrap();

        assert_eq!(run_to_string(&config, ClusterCommand::List).await.unwrap(), "");
        assert_eq!(
            fs::read_to_string(&config.registry_path).unwrap(),
            "{\n    \"clusters\": {}\n}\n"
        );
    }

    #[tokio::test]
    async fn provision_requires_openstack_config() {
        let dir = TempDir::new().unwrap();
        let config = get_config(&dir);
        let spec = write_spec(dir.path(), "c1");
        let err = run_to_string(&config, ClusterCommand::Provision { spec, no_store: false })
            .await
            .unwrap_err();
        assert_eq!(err.get_error_type(), NimbusErrorType::FailToLoadConfig);
    }

    #[tokio::test]
    async fn provision_refuses_recorded_cluster() {
        let server = MockServer::start();
        let create = server.mock(|when, then| {
            when.method(POST).path("/compute/servers");
            then.status(202).json_body(json!({"server": {"id": "srv-1"}}));
        });
        let dir = TempDir::new().unwrap();
        let mut config = get_config(&dir);
        config.openstack = Some(OpenStackConfig {
            compute_url: server.url("/compute"),
            network_url: server.url("/network"),
            image_url: server.url("/image"),
            token_key: "OS_AUTH_TOKEN".to_owned(),
            poll_interval_secs: 0,
            active_timeout_secs: 1,
        });
        let request = write_request(dir.path(), "c1", "old");
        run_to_string(&config, ClusterCommand::Store { request })
            .await
            .unwrap();

        let spec = write_spec(dir.path(), "c1");
        let err = run_to_string(&config, ClusterCommand::Provision { spec, no_store: false })
            .await
            .unwrap_err();
        assert_eq!(err.get_error_type(), NimbusErrorType::AlreadyExists);
        create.assert_hits(0);

        let output = run_to_string(&config, ClusterCommand::Show { name: "c1".to_owned() })
            .await
            .unwrap();
        let shown: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(shown["flavor"], "old");
        assert_eq!(shown["masters"][0]["master_IP"], "1.1.1.1");
    }

    #[tokio::test]
    async fn teardown_unknown_cluster() {
        let dir = TempDir::new().unwrap();
        let config = get_config(&dir);
        let request = write_request(dir.path(), "c2", "f1");
        run_to_string(&config, ClusterCommand::Store { request })
            .await
            .unwrap();
        let err = run_to_string(&config, ClusterCommand::Teardown { name: "c1".to_owned() })
            .await
            .unwrap_err();
        assert_eq!(err.get_error_type(), NimbusErrorType::NotFound);
    }
}
