//! Image bundle storage implementation.

use crate::error::{Result, StoreError};
use crate::types::{AssetId, ImageData};
use lru::LruCache;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io::{Read, Write};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

/// Magic bytes for image bundle files.
const BUNDLE_MAGIC: &[u8; 4] = b"IMB\0";

/// Current bundle format version.
const BUNDLE_VERSION: u8 = 1;

/// On-disk payload: the owning asset id plus its ordered image list.
#[derive(Serialize, Deserialize)]
struct ImageBundle {
    asset_id: AssetId,
    images: Vec<ImageData>,
}

/// Durable storage for per-asset image lists.
///
/// One bundle file per asset, replace-or-clear semantics: `save_images`
/// rewrites the whole ordered list, `delete_images` removes it. Asset ids are
/// arbitrary strings, so files are named by the SHA-256 of the id and sharded
/// by the first hash byte; the id itself is recoverable from the payload.
pub struct ImageStorage {
    /// Base directory for bundles.
    path: PathBuf,

    /// LRU cache for recently accessed bundles.
    cache: Mutex<LruCache<AssetId, Vec<ImageData>>>,
}

impl ImageStorage {
    /// Create image storage at the given path.
    pub fn new(path: impl AsRef<Path>, cache_size: usize) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        fs::create_dir_all(&path)?;

        let cache_size = NonZeroUsize::new(cache_size.max(1)).unwrap();

        Ok(Self {
            path,
            cache: Mutex::new(LruCache::new(cache_size)),
        })
    }

    /// Upsert the full ordered image list for an asset.
    pub fn save_images(&self, asset_id: &AssetId, images: &[ImageData]) -> Result<()> {
        let bundle = ImageBundle {
            asset_id: asset_id.clone(),
            images: images.to_vec(),
        };
        let payload = rmp_serde::to_vec(&bundle)?;

        let shard_dir = self.shard_path(asset_id);
        fs::create_dir_all(&shard_dir)?;

        let bundle_path = self.bundle_path(asset_id);
        let mut file = File::create(&bundle_path)?;

        // Header
        file.write_all(BUNDLE_MAGIC)?;
        file.write_all(&[BUNDLE_VERSION])?;

        // Payload
        let payload_len = payload.len() as u64;
        file.write_all(&payload_len.to_le_bytes())?;
        file.write_all(&payload)?;

        // Checksum
        let checksum = crc32fast::hash(&payload);
        file.write_all(&checksum.to_le_bytes())?;

        file.sync_all()?;

        self.cache.lock().put(asset_id.clone(), images.to_vec());

        Ok(())
    }

    /// Get the image list for an asset. Empty if none stored.
    pub fn get_images(&self, asset_id: &AssetId) -> Result<Vec<ImageData>> {
        if let Some(cached) = self.cache.lock().get(asset_id).cloned() {
            return Ok(cached);
        }

        let bundle_path = self.bundle_path(asset_id);
        if !bundle_path.exists() {
            return Ok(Vec::new());
        }

        let mut file = File::open(&bundle_path)?;

        // Read and verify magic
        let mut magic = [0u8; 4];
        file.read_exact(&mut magic)?;
        if &magic != BUNDLE_MAGIC {
            return Err(StoreError::InvalidFormat("Invalid bundle magic".into()));
        }

        // Read version
        let mut version = [0u8; 1];
        file.read_exact(&mut version)?;
        if version[0] != BUNDLE_VERSION {
            return Err(StoreError::InvalidFormat(format!(
                "Unsupported bundle version: {}",
                version[0]
            )));
        }

        // Read payload
        let mut payload_len_bytes = [0u8; 8];
        file.read_exact(&mut payload_len_bytes)?;
        let payload_len = u64::from_le_bytes(payload_len_bytes) as usize;

        let mut payload = vec![0u8; payload_len];
        file.read_exact(&mut payload)?;

        // Read and verify checksum
        let mut checksum_bytes = [0u8; 4];
        file.read_exact(&mut checksum_bytes)?;
        let stored_checksum = u32::from_le_bytes(checksum_bytes);
        let computed_checksum = crc32fast::hash(&payload);

        if stored_checksum != computed_checksum {
            return Err(StoreError::ChecksumMismatch {
                expected: stored_checksum,
                got: computed_checksum,
            });
        }

        let bundle: ImageBundle = rmp_serde::from_slice(&payload)?;

        self.cache
            .lock()
            .put(asset_id.clone(), bundle.images.clone());

        Ok(bundle.images)
    }

    /// Check if a bundle exists for an asset.
    pub fn exists(&self, asset_id: &AssetId) -> bool {
        if self.cache.lock().contains(asset_id) {
            return true;
        }
        self.bundle_path(asset_id).exists()
    }

    /// Remove all images for an asset. Returns false if none were stored.
    pub fn delete_images(&self, asset_id: &AssetId) -> Result<bool> {
        self.cache.lock().pop(asset_id);

        let bundle_path = self.bundle_path(asset_id);
        if bundle_path.exists() {
            fs::remove_file(&bundle_path)?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// List the asset ids of all stored bundles.
    pub fn list(&self) -> Result<Vec<AssetId>> {
        let mut ids = Vec::new();

        for entry in fs::read_dir(&self.path)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                for bundle_entry in fs::read_dir(entry.path())? {
                    let bundle_entry = bundle_entry?;
                    if let Ok(id) = self.read_bundle_id(&bundle_entry.path()) {
                        ids.push(id);
                    }
                }
            }
        }

        Ok(ids)
    }

    /// Get total size of all bundles.
    pub fn total_size(&self) -> Result<u64> {
        let mut total = 0u64;

        for entry in fs::read_dir(&self.path)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                for bundle_entry in fs::read_dir(entry.path())? {
                    let bundle_entry = bundle_entry?;
                    total += bundle_entry.metadata()?.len();
                }
            }
        }

        Ok(total)
    }

    /// Read the owning asset id out of a bundle file's payload.
    fn read_bundle_id(&self, path: &Path) -> Result<AssetId> {
        let mut file = File::open(path)?;

        let mut magic = [0u8; 4];
        file.read_exact(&mut magic)?;
        if &magic != BUNDLE_MAGIC {
            return Err(StoreError::InvalidFormat("Invalid bundle magic".into()));
        }

        let mut version = [0u8; 1];
        file.read_exact(&mut version)?;

        let mut payload_len_bytes = [0u8; 8];
        file.read_exact(&mut payload_len_bytes)?;
        let payload_len = u64::from_le_bytes(payload_len_bytes) as usize;

        let mut payload = vec![0u8; payload_len];
        file.read_exact(&mut payload)?;

        let bundle: ImageBundle = rmp_serde::from_slice(&payload)?;
        Ok(bundle.asset_id)
    }

    /// Hex SHA-256 of the asset id, used as the bundle file name.
    fn id_digest(asset_id: &AssetId) -> String {
        let mut hasher = Sha256::new();
        hasher.update(asset_id.0.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Get the shard directory for an asset id.
    fn shard_path(&self, asset_id: &AssetId) -> PathBuf {
        let digest = Self::id_digest(asset_id);
        self.path.join(&digest[0..2])
    }

    /// Get the full path for a bundle.
    fn bundle_path(&self, asset_id: &AssetId) -> PathBuf {
        self.shard_path(asset_id).join(Self::id_digest(asset_id))
    }
}
