use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use ias_net::Net;
use parking_lot::RwLock;
use tracing::{debug, warn};
use url::Url;

use crate::error::AssetsResult;
use crate::image_data::{AdImage, ImageHandle};

/// Immutable snapshot of one candidate's cache state, taken under the
/// catalog lock before any I/O starts.
#[derive(Debug, Clone)]
pub struct ResolveRequest {
    pub file_name: String,
    pub image_url: Url,
    /// What the catalog believes: true means the file should already
    /// be on disk from an earlier session.
    pub presumed_cached: bool,
}

/// Durable flags to write back into the catalog once the resolve is
/// done. Applied by the caller, never by the cache itself.
#[derive(Debug, Clone)]
pub struct ResolveOutcome {
    pub file_name: String,
    pub cached: bool,
    pub ready: bool,
    /// The presumed cache entry was missing or corrupt and a network
    /// re-fetch repaired it.
    pub healed: bool,
}

/// Disk + in-memory image cache rooted at one directory. All advert
/// files share the `ias_` prefix so orphan cleanup can tell them apart
/// from anything else living in the cache dir.
pub struct AssetCache {
    root: PathBuf,
    images: RwLock<HashMap<String, ImageHandle>>,
}

impl AssetCache {
    pub fn new(root: impl Into<PathBuf>) -> AssetsResult<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self { root, images: RwLock::new(HashMap::new()) })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn image(&self, file_name: &str) -> Option<ImageHandle> {
        self.images.read().get(file_name).cloned()
    }

    pub fn is_ready(&self, file_name: &str) -> bool {
        self.images.read().contains_key(file_name)
    }

    /// Makes the requested image available, preferring disk over
    /// network. A missing or undecodable cache file triggers exactly
    /// one re-fetch within the same call; it never loops.
    pub async fn resolve<N>(&self, request: &ResolveRequest, net: &N) -> AssetsResult<ResolveOutcome>
    where
        N: Net + ?Sized,
    {
        // Already decoded this session, nothing to do.
        if self.is_ready(&request.file_name) {
            return Ok(ResolveOutcome {
                file_name: request.file_name.clone(),
                cached: true,
                ready: true,
                healed: false,
            });
        }

        let path = self.root.join(&request.file_name);
        let mut healed = false;

        if request.presumed_cached {
            match tokio::fs::read(&path).await {
                Ok(bytes) => match AdImage::decode(&request.file_name, &bytes) {
                    Ok(image) => {
                        debug!(file = %request.file_name, "ias-assets: cache hit");
                        self.insert(image);
                        return Ok(ResolveOutcome {
                            file_name: request.file_name.clone(),
                            cached: true,
                            ready: true,
                            healed: false,
                        });
                    }
                    Err(e) => {
                        warn!(file = %request.file_name, error = %e, "ias-assets: cached file corrupt, re-fetching");
                        healed = true;
                    }
                },
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    warn!(file = %request.file_name, "ias-assets: cached file missing, re-fetching");
                    healed = true;
                }
                Err(e) => return Err(e.into()),
            }
        }

        let bytes = net.get_bytes(request.image_url.clone(), None).await?;
        let image = AdImage::decode(&request.file_name, &bytes)?;
        self.insert(image);

        // Decode succeeded, so the advert can display even when the
        // disk write fails; it just will not survive a restart.
        let cached = match tokio::fs::write(&path, &bytes).await {
            Ok(()) => true,
            Err(e) => {
                warn!(file = %request.file_name, error = %e, "ias-assets: cache write failed");
                false
            }
        };

        debug!(file = %request.file_name, cached, healed, "ias-assets: image fetched");
        Ok(ResolveOutcome { file_name: request.file_name.clone(), cached, ready: true, healed })
    }

    fn insert(&self, image: AdImage) {
        self.images
            .write()
            .insert(image.file_name().to_string(), Arc::new(image));
    }

    /// Deletes `ias_*` files no longer referenced by the catalog and
    /// drops their in-memory handles. Returns how many files went.
    pub fn remove_unreferenced(&self, keep: &HashSet<String>) -> AssetsResult<usize> {
        let mut removed = 0;
        for entry in std::fs::read_dir(&self.root)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if !name.starts_with("ias_") || keep.contains(&name) {
                continue;
            }
            match std::fs::remove_file(entry.path()) {
                Ok(()) => {
                    self.images.write().remove(&name);
                    removed += 1;
                    debug!(file = %name, "ias-assets: removed orphaned image");
                }
                Err(e) => warn!(file = %name, error = %e, "ias-assets: orphan removal failed"),
            }
        }
        Ok(removed)
    }
}
