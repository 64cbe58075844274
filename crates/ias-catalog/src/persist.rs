use std::fs;
use std::path::PathBuf;

use tracing::debug;

use crate::error::{CatalogError, CatalogResult};
use crate::model::Catalog;

/// Serializes the catalog for storage. Transient display state
/// (readiness, in-flight downloads) is skipped by the codec and comes
/// back zeroed on decode.
pub fn encode_catalog(catalog: &Catalog) -> CatalogResult<String> {
    serde_json::to_string(catalog).map_err(|e| CatalogError::Encode(e.to_string()))
}

pub fn decode_catalog(blob: &str) -> CatalogResult<Catalog> {
    serde_json::from_str(blob).map_err(|e| CatalogError::Decode(e.to_string()))
}

/// Key/value blob storage for the persisted catalog.
pub trait StateStore: Send + Sync {
    fn load(&self, key: &str) -> CatalogResult<Option<String>>;
    fn save(&self, key: &str, blob: &str) -> CatalogResult<()>;
}

/// Stores each key as a file under a directory, writing through a
/// temporary file so a crash mid-save never leaves a torn blob.
#[derive(Debug, Clone)]
pub struct FileStateStore {
    dir: PathBuf,
}

impl FileStateStore {
    pub fn new(dir: impl Into<PathBuf>) -> CatalogResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl StateStore for FileStateStore {
    fn load(&self, key: &str) -> CatalogResult<Option<String>> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(blob) => Ok(Some(blob)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, key: &str, blob: &str) -> CatalogResult<()> {
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, blob)?;
        fs::rename(&tmp, &path)?;
        debug!(key, bytes = blob.len(), "ias-catalog: state saved");
        Ok(())
    }
}
