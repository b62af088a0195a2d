//! Resolve secrets such as the OpenStack auth token from an ordered chain of backends.

use ::std::{
    collections::BTreeMap,
    ffi::OsString,
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
};

use ::anyhow::anyhow;
use ::serde_json::Value;
use ::tracing::debug;

use crate::error::{NimbusError, Result};

/// A source of credential values.
pub trait CredentialBackend: Send + Sync {
    /// Return `None` if the backend has no value for `key`.
    fn load(&self, key: &str) -> Option<String>;
}

/// Values from the process environment.
#[derive(Debug, Default, Clone, Copy)]
pub struct EnvBackend;

impl CredentialBackend for EnvBackend {
    fn load(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

/// String values of a flat JSON object stored in a file.
/// An unreadable or malformed file behaves as an empty one.
#[derive(Debug, Clone)]
pub struct JsonFileBackend {
    path: PathBuf,
}

impl JsonFileBackend {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    pub fn get_path(&self) -> &Path {
        &self.path
    }
}

impl CredentialBackend for JsonFileBackend {
    fn load(&self, key: &str) -> Option<String> {
        let file = File::open(&self.path).ok()?;
        let document: Value = serde_json::from_reader(BufReader::new(file)).ok()?;
        match document.get(key)? {
            Value::String(s) => Some(s.clone()),
            Value::Null => None,
            other => Some(other.to_string()),
        }
    }
}

/// Ask each backend in order; the first non-empty value wins.
#[derive(Default)]
pub struct CredentialChain {
    backends: Vec<Box<dyn CredentialBackend>>,
}

impl CredentialChain {
    pub fn new(backends: Vec<Box<dyn CredentialBackend>>) -> Self {
        Self { backends }
    }

    /// Environment first, then the JSON file at `path`.
    pub fn with_env_and_file<P: Into<PathBuf>>(path: P) -> Self {
        Self::new(vec![
            Box::new(EnvBackend),
            Box::new(JsonFileBackend::new(path)),
        ])
    }

    /// Environment first, then the JSON file at `path`, or `~/.credentials.json`
    /// when no path is given.
    pub fn default_chain(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => home_credentials_path(std::env::var_os("HOME"))?,
        };
        Ok(Self::with_env_and_file(path))
    }

    pub fn add_backend(&mut self, backend: Box<dyn CredentialBackend>) {
        self.backends.push(backend);
    }

    pub fn load(&self, key: &str) -> Result<String> {
        self.backends
            .iter()
            .enumerate()
            .find_map(|(i, backend)| {
                backend
                    .load(key)
                    .filter(|value| !value.is_empty())
                    .inspect(|_| debug!("Credential {} resolved by backend #{}", key, i))
            })
            .ok_or_else(|| NimbusError::not_found(anyhow!("Could not load credential '{}'", key)))
    }

    /// Resolve every key in `keys`, failing on the first one no backend can provide.
    pub fn require(&self, keys: &[&str]) -> Result<BTreeMap<String, String>> {
        keys.iter()
            .map(|key| -> Result<(String, String)> {
                Ok(((*key).to_owned(), self.load(key)?))
            })
            .collect()
    }
}

fn home_credentials_path(home: Option<OsString>) -> Result<PathBuf> {
    match home {
        Some(home) if !home.is_empty() => Ok(PathBuf::from(home).join(".credentials.json")),
        _ => Err(NimbusError::fail_to_load_config(anyhow!(
            "HOME is not set, cannot locate ~/.credentials.json"
        ))),
    }
}
