use ::std::{
    fs::{self, File},
    io::BufReader,
    path::{Path, PathBuf},
};

use ::anyhow::anyhow;
use ::serde::Serialize;
use ::serde_json::ser::{PrettyFormatter, Serializer};
use ::tracing::{debug, error, info};

use super::RegistryStore;
use crate::cluster::ClusterCollection;
use crate::error::{NimbusError, Result};

/// Stores the collection as an indented JSON document in a single file.
/// The whole file is rewritten on every save.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    const INDENT: &'static [u8] = b"    ";

    /// Use the file at `path`, which must already hold a collection.
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    /// Use the file at `path`, creating it with an empty collection when it does not exist.
    pub fn init<P: Into<PathBuf>>(path: P) -> Result<Self> {
        let store = Self::new(path);
        if !store.path.exists() {
            if let Some(parent) = store.path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
            store.save(&ClusterCollection::new())?;
            info!("Created cluster registry at {}", store.path.display());
        }
        Ok(store)
    }

    pub fn get_path(&self) -> &Path {
        &self.path
    }

    fn encode(collection: &ClusterCollection) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        let formatter = PrettyFormatter::with_indent(Self::INDENT);
        let mut serializer = Serializer::with_formatter(&mut buffer, formatter);
        collection
            .serialize(&mut serializer)
            .map_err(NimbusError::io_error)?;
        buffer.push(b'\n');
        Ok(buffer)
    }
}

impl RegistryStore for FileStore {
    fn load(&self) -> Result<ClusterCollection> {
        debug!("Read cluster registry {}", self.path.display());
        let file = File::open(&self.path)
            .map_err(|e| {
                NimbusError::io_error(anyhow!(
                    "Cannot read registry {}: {}",
                    self.path.display(),
                    e
                ))
            })
            .inspect_err(|e| error!("{}", e))?;
        serde_json::from_reader(BufReader::new(file))
            .map_err(|e| {
                NimbusError::deserialize_error(anyhow!(
                    "Malformed registry {}: {}",
                    self.path.display(),
                    e
                ))
            })
            .inspect_err(|e| error!("{}", e))
    }

    fn save(&self, collection: &ClusterCollection) -> Result<()> {
        let content = Self::encode(collection)?;
        fs::write(&self.path, content)
            .map_err(|e| {
                NimbusError::io_error(anyhow!(
                    "Cannot write registry {}: {}",
                    self.path.display(),
                    e
                ))
            })
            .inspect_err(|e| error!("{}", e))
    }
}
