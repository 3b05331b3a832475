//! Main Store struct tying all components together.

use crate::error::{Result, StoreError};
use crate::images::ImageStorage;
use crate::meta::{MetaKey, MetadataStorage};
use crate::migrate;
use crate::subscriptions::{SubscriptionConfig, SubscriptionHandle, SubscriptionId, SubscriptionManager};
use crate::types::{
    Asset, AssetId, AssetInput, AssetStatus, AuditLog, AuditLogId, ImportSummary, LogAction,
    LogEntry, StoreStats, VerificationStatus, VerificationStep,
};
use chrono::Utc;
use fs2::FileExt;
use parking_lot::{Mutex, RwLock};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::warn;

/// Store configuration.
#[derive(Clone, Debug)]
pub struct StoreConfig {
    /// Base path for the store.
    pub path: PathBuf,

    /// Image bundle cache size (number of assets).
    pub image_cache_size: usize,

    /// Whether to create the store if it doesn't exist.
    pub create_if_missing: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./inventory"),
            image_cache_size: 256,
            create_if_missing: true,
        }
    }
}

/// Magic bytes for store manifest.
const STORE_MAGIC: &[u8; 4] = b"INV\0";

/// Current store format version.
const STORE_VERSION: u8 = 1;

/// The inventory store: single source of truth for assets, activity-log
/// entries, and audit records during a session.
///
/// All mutations are serialized through one write lock, so concurrent
/// callers cannot race each other into a lost update. Collections are held
/// as `Arc` snapshots replaced wholesale on every mutation; readers keep
/// working from the snapshot they grabbed.
///
/// Persistence is optimistic: the in-memory commit always lands, image
/// bundles are written before metadata, and a failed write surfaces as an
/// error without rolling memory back. The caller decides whether to repeat
/// the action.
pub struct Store {
    /// Store configuration.
    config: StoreConfig,

    /// Lock file for exclusive access.
    _lock_file: File,

    /// Metadata persistence (assets sans images, logs, audit records).
    meta: MetadataStorage,

    /// Image bundle storage.
    images: ImageStorage,

    /// In-memory collections, replaced wholesale on mutation.
    assets: RwLock<Arc<Vec<Asset>>>,
    logs: RwLock<Arc<Vec<LogEntry>>>,
    audit_logs: RwLock<Arc<Vec<AuditLog>>>,

    /// Subscription manager.
    subscriptions: SubscriptionManager,

    /// Lock serializing all mutating operations.
    write_lock: Mutex<()>,
}

impl Store {
    /// Open an existing store or create a new one.
    pub fn open_or_create(config: StoreConfig) -> Result<Self> {
        if config.path.exists() {
            Self::open(config)
        } else if config.create_if_missing {
            Self::create(config)
        } else {
            Err(StoreError::NotInitialized)
        }
    }

    /// Create a new store.
    pub fn create(config: StoreConfig) -> Result<Self> {
        fs::create_dir_all(&config.path)?;

        Self::write_manifest(&config.path)?;

        let lock_file = Self::acquire_lock(&config.path)?;

        let meta = MetadataStorage::new(config.path.join("meta"))?;
        let images = ImageStorage::new(config.path.join("images"), config.image_cache_size)?;

        Ok(Self {
            config,
            _lock_file: lock_file,
            meta,
            images,
            assets: RwLock::new(Arc::new(Vec::new())),
            logs: RwLock::new(Arc::new(Vec::new())),
            audit_logs: RwLock::new(Arc::new(Vec::new())),
            subscriptions: SubscriptionManager::new(),
            write_lock: Mutex::new(()),
        })
    }

    /// Open an existing store.
    ///
    /// Loads all collections up front: raw asset JSON goes through the
    /// legacy-spelling migration before typed decoding, then image bundles
    /// are merged back onto their assets.
    pub fn open(config: StoreConfig) -> Result<Self> {
        Self::verify_manifest(&config.path)?;

        let lock_file = Self::acquire_lock(&config.path)?;

        let meta = MetadataStorage::new(config.path.join("meta"))?;
        let images = ImageStorage::new(config.path.join("images"), config.image_cache_size)?;

        let assets = Self::load_assets(&meta, &images);
        let logs: Vec<LogEntry> = meta.load(MetaKey::ActivityLog).unwrap_or_default();
        let audit_logs: Vec<AuditLog> = meta.load(MetaKey::AuditLogs).unwrap_or_default();

        Ok(Self {
            config,
            _lock_file: lock_file,
            meta,
            images,
            assets: RwLock::new(Arc::new(assets)),
            logs: RwLock::new(Arc::new(logs)),
            audit_logs: RwLock::new(Arc::new(audit_logs)),
            subscriptions: SubscriptionManager::new(),
            write_lock: Mutex::new(()),
        })
    }

    /// Load, migrate, and image-merge the persisted asset collection.
    fn load_assets(meta: &MetadataStorage, images: &ImageStorage) -> Vec<Asset> {
        let Some(mut raw) = meta.load_raw(MetaKey::Assets) else {
            return Vec::new();
        };

        let changed = migrate::normalize_assets(&mut raw);

        let mut assets: Vec<Asset> = match serde_json::from_value(raw) {
            Ok(assets) => assets,
            Err(e) => {
                warn!(error = %e, "discarding unreadable asset snapshot");
                return Vec::new();
            }
        };

        if changed > 0 {
            // The corrected list is used for the session either way; the
            // re-save just brings disk in line with it.
            if let Err(e) = meta.save(MetaKey::Assets, &assets) {
                warn!(error = %e, "failed to re-persist migrated assets");
            }
        }

        for asset in &mut assets {
            match images.get_images(&asset.id) {
                Ok(list) => asset.images = list,
                Err(e) => {
                    warn!(asset = %asset.id, error = %e, "failed to load image bundle");
                }
            }
        }

        assets
    }

    // --- Asset Operations ---

    /// Register a new asset.
    ///
    /// Appends the asset, writes its images (if any) to the image store,
    /// records an `Add` log entry, and persists metadata. Returns the asset
    /// as stored, with its assigned id.
    pub fn add_asset(&self, input: AssetInput, actor: &str) -> Result<Asset> {
        let _guard = self.write_lock.lock();
        let now = Utc::now();

        let asset = input.into_asset(AssetId::generate(), actor, now);
        let entry = LogEntry::record(&asset, LogAction::Add, "Initial stock in", actor, now);

        {
            let mut assets = self.assets.write();
            let mut next = (**assets).clone();
            next.push(asset.clone());
            *assets = Arc::new(next);
        }
        self.prepend_logs(std::slice::from_ref(&entry));

        let persisted = (|| {
            if !asset.images.is_empty() {
                self.images.save_images(&asset.id, &asset.images)?;
            }
            self.persist_assets()?;
            self.persist_logs()
        })();

        self.subscriptions.broadcast_asset_upserted(&asset);
        self.subscriptions.broadcast_log_appended(&entry);

        persisted.map(|_| asset)
    }

    /// Bulk import with upsert-by-partial-key matching.
    ///
    /// Each incoming record is matched against the first existing asset
    /// sharing either business key; a match is overwritten in place keeping
    /// its original id, anything else is appended as new. The whole batch's
    /// log entries are prepended together once it completes. The batch is
    /// not atomic: an image-write failure stops processing and leaves the
    /// records handled so far committed.
    pub fn import_assets(&self, inputs: Vec<AssetInput>, actor: &str) -> Result<ImportSummary> {
        let _guard = self.write_lock.lock();
        let now = Utc::now();

        let mut next = (**self.assets.read()).clone();
        let mut entries = Vec::new();
        let mut summary = ImportSummary::default();
        let mut first_error = None;

        for input in inputs {
            let existing = next
                .iter()
                .position(|a| a.computer_no == input.computer_no || a.serial_no == input.serial_no);

            let (asset, entry) = match existing {
                Some(pos) => {
                    let id = next[pos].id.clone();
                    let replacement = input.into_asset(id, actor, now);
                    let entry = LogEntry::record(
                        &replacement,
                        LogAction::Update,
                        "Batch import overwrite",
                        actor,
                        now,
                    );
                    next[pos] = replacement.clone();
                    summary.updated += 1;
                    (replacement, entry)
                }
                None => {
                    let asset = input.into_asset(AssetId::generate(), actor, now);
                    let entry =
                        LogEntry::record(&asset, LogAction::Add, "Batch import", actor, now);
                    next.push(asset.clone());
                    summary.added += 1;
                    (asset, entry)
                }
            };
            entries.push(entry);

            if !asset.images.is_empty() {
                if let Err(e) = self.images.save_images(&asset.id, &asset.images) {
                    first_error = Some(e);
                    break;
                }
            }
        }

        *self.assets.write() = Arc::new(next);
        self.prepend_logs(&entries);

        let persisted = match first_error {
            Some(e) => Err(e),
            None => self.persist_assets().and_then(|_| self.persist_logs()),
        };

        self.subscriptions.broadcast_assets_imported(summary);
        for entry in &entries {
            self.subscriptions.broadcast_log_appended(entry);
        }

        persisted.map(|_| summary)
    }

    /// Replace the asset with a matching id.
    ///
    /// The caller supplies the action (`Check-in`, `Check-out`, `Update`,
    /// `Dispose`, `Audit`) and the log details; the store does not infer the
    /// action or guard status transitions. Image reconciliation is
    /// whole-list: a non-empty incoming list overwrites the stored bundle,
    /// an empty one clears it if the prior version had images.
    ///
    /// Returns `Ok(false)` without logging anything when the id is unknown.
    pub fn update_asset(
        &self,
        updated: Asset,
        actor: &str,
        action: LogAction,
        details: &str,
    ) -> Result<bool> {
        let _guard = self.write_lock.lock();
        let now = Utc::now();

        let prior = {
            let assets = self.assets.read();
            match assets.iter().find(|a| a.id == updated.id) {
                Some(asset) => asset.clone(),
                None => return Ok(false),
            }
        };

        let mut asset = updated;
        asset.last_updated = now;
        asset.updated_by = actor.to_string();

        let mut details = details.to_string();
        if action == LogAction::CheckIn {
            // Keep the provenance of how long the asset was out.
            if let Some(date) = prior.distribution_date {
                details.push_str(&format!(" (distributed {})", date.format("%d %b %Y")));
            }
        }

        let entry = LogEntry::record(&asset, action, details, actor, now);

        {
            let mut assets = self.assets.write();
            let mut next = (**assets).clone();
            if let Some(slot) = next.iter_mut().find(|a| a.id == asset.id) {
                *slot = asset.clone();
            }
            *assets = Arc::new(next);
        }
        self.prepend_logs(std::slice::from_ref(&entry));

        let persisted = (|| {
            if !asset.images.is_empty() {
                self.images.save_images(&asset.id, &asset.images)?;
            } else if !prior.images.is_empty() {
                self.images.delete_images(&asset.id)?;
            }
            self.persist_assets()?;
            self.persist_logs()
        })();

        self.subscriptions.broadcast_asset_upserted(&asset);
        self.subscriptions.broadcast_log_appended(&entry);

        persisted.map(|_| true)
    }

    /// Remove a single asset. Returns `Ok(false)` when the id is unknown.
    pub fn delete_asset(&self, asset_id: &AssetId, actor: &str) -> Result<bool> {
        self.delete_assets(std::slice::from_ref(asset_id), actor)
            .map(|removed| removed > 0)
    }

    /// Remove matching assets, their image bundles, and write one `Delete`
    /// log entry per removed asset. Unknown ids are skipped silently.
    /// Returns the number of assets actually removed.
    pub fn delete_assets(&self, asset_ids: &[AssetId], actor: &str) -> Result<usize> {
        let _guard = self.write_lock.lock();
        let now = Utc::now();

        let mut removed = Vec::new();
        let next: Vec<Asset> = self
            .assets
            .read()
            .iter()
            .filter(|a| {
                if asset_ids.contains(&a.id) {
                    removed.push((*a).clone());
                    false
                } else {
                    true
                }
            })
            .cloned()
            .collect();

        if removed.is_empty() {
            return Ok(0);
        }

        // Business keys are denormalized into each entry so the history
        // stays readable after the asset record is gone.
        let entries: Vec<LogEntry> = removed
            .iter()
            .map(|asset| LogEntry::record(asset, LogAction::Delete, "Asset deleted", actor, now))
            .collect();

        *self.assets.write() = Arc::new(next);
        self.prepend_logs(&entries);

        let persisted = (|| {
            for asset in &removed {
                self.images.delete_images(&asset.id)?;
            }
            self.persist_assets()?;
            self.persist_logs()
        })();

        self.subscriptions
            .broadcast_assets_removed(removed.iter().map(|a| a.id.clone()).collect());
        for entry in &entries {
            self.subscriptions.broadcast_log_appended(entry);
        }

        persisted.map(|_| removed.len())
    }

    // --- Audit Operations ---

    /// Prepend a completed audit snapshot and persist it verbatim.
    ///
    /// The caller computes the scanned/missing partitions; the store does
    /// not recompute them.
    pub fn save_audit_log(&self, log: AuditLog) -> Result<()> {
        let _guard = self.write_lock.lock();

        {
            let mut audit_logs = self.audit_logs.write();
            let mut next = vec![log.clone()];
            next.extend((**audit_logs).iter().cloned());
            *audit_logs = Arc::new(next);
        }

        let persisted = self.persist_audit_logs();

        self.subscriptions.broadcast_audit_saved(&log.id);

        persisted
    }

    /// Apply a one-way verification step to the matching audit record.
    ///
    /// Step 1 fills the supervisor-1 fields; step 2 fills the supervisor-2
    /// fields, mirrors them into the legacy single-verifier fields, and
    /// marks the record `Verified`. Invoking steps out of order is not
    /// rejected here; callers gate ordering via role checks.
    ///
    /// Returns `Ok(false)` when the id is unknown.
    pub fn verify_audit_log(
        &self,
        id: &AuditLogId,
        verifier: &str,
        step: VerificationStep,
    ) -> Result<bool> {
        let _guard = self.write_lock.lock();
        let now = Utc::now();

        let mut next = (**self.audit_logs.read()).clone();
        let Some(log) = next.iter_mut().find(|l| l.id == *id) else {
            return Ok(false);
        };

        match step {
            VerificationStep::Supervisor1 => {
                log.supervisor1_verified_by = Some(verifier.to_string());
                log.supervisor1_verified_at = Some(now);
                log.verification_status = VerificationStatus::Supervisor1Verified;
            }
            VerificationStep::Supervisor2 => {
                log.supervisor2_verified_by = Some(verifier.to_string());
                log.supervisor2_verified_at = Some(now);
                log.verified_by = Some(verifier.to_string());
                log.verified_at = Some(now);
                log.verification_status = VerificationStatus::Verified;
            }
        }
        let status = log.verification_status;

        *self.audit_logs.write() = Arc::new(next);

        let persisted = self.persist_audit_logs();

        self.subscriptions.broadcast_audit_verified(id, status);

        persisted.map(|_| true)
    }

    // --- Read Accessors ---

    /// Snapshot of the asset collection.
    pub fn assets(&self) -> Arc<Vec<Asset>> {
        Arc::clone(&self.assets.read())
    }

    /// Snapshot of the activity log, newest first.
    pub fn logs(&self) -> Arc<Vec<LogEntry>> {
        Arc::clone(&self.logs.read())
    }

    /// Snapshot of the audit records, newest first.
    pub fn audit_logs(&self) -> Arc<Vec<AuditLog>> {
        Arc::clone(&self.audit_logs.read())
    }

    /// Base path of the store directory.
    pub fn path(&self) -> &Path {
        &self.config.path
    }

    /// Look up an asset by id.
    pub fn get_asset(&self, id: &AssetId) -> Option<Asset> {
        self.assets.read().iter().find(|a| a.id == *id).cloned()
    }

    /// Find the first asset matching either business key (the same partial
    /// matching the import upsert uses).
    pub fn find_by_business_key(&self, computer_no: &str, serial_no: &str) -> Option<Asset> {
        self.assets
            .read()
            .iter()
            .find(|a| a.computer_no == computer_no || a.serial_no == serial_no)
            .cloned()
    }

    /// Get store statistics.
    pub fn stats(&self) -> Result<StoreStats> {
        let assets = self.assets.read();
        let count_status =
            |status: AssetStatus| assets.iter().filter(|a| a.status == status).count() as u64;

        Ok(StoreStats {
            asset_count: assets.len() as u64,
            in_stock_count: count_status(AssetStatus::InStock),
            in_use_count: count_status(AssetStatus::InUse),
            disposed_count: count_status(AssetStatus::Disposed),
            log_count: self.logs.read().len() as u64,
            audit_log_count: self.audit_logs.read().len() as u64,
            image_bundle_count: self.images.list()?.len() as u64,
            image_size_bytes: self.images.total_size()?,
            metadata_size_bytes: self.meta.file_size(MetaKey::Assets)
                + self.meta.file_size(MetaKey::ActivityLog)
                + self.meta.file_size(MetaKey::AuditLogs),
        })
    }

    // --- Subscriptions ---

    /// Subscribe to store events.
    pub fn subscribe(&self, config: SubscriptionConfig) -> SubscriptionHandle {
        self.subscriptions.subscribe(config)
    }

    /// Unsubscribe and clean up.
    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.subscriptions.unsubscribe(id)
    }

    // --- Internal Helpers ---

    /// Prepend entries to the in-memory log, newest first (the batch's last
    /// entry lands in front).
    fn prepend_logs(&self, entries: &[LogEntry]) {
        let mut logs = self.logs.write();
        let mut next: Vec<LogEntry> = entries.iter().rev().cloned().collect();
        next.extend((**logs).iter().cloned());
        *logs = Arc::new(next);
    }

    fn persist_assets(&self) -> Result<()> {
        let snapshot = self.assets.read();
        self.meta.save(MetaKey::Assets, &**snapshot)
    }

    fn persist_logs(&self) -> Result<()> {
        let snapshot = self.logs.read();
        self.meta.save(MetaKey::ActivityLog, &**snapshot)
    }

    fn persist_audit_logs(&self) -> Result<()> {
        let snapshot = self.audit_logs.read();
        self.meta.save(MetaKey::AuditLogs, &**snapshot)
    }

    fn write_manifest(path: &Path) -> Result<()> {
        use std::io::Write;

        let manifest_path = path.join("MANIFEST");
        let mut file = File::create(manifest_path)?;

        file.write_all(STORE_MAGIC)?;
        file.write_all(&[STORE_VERSION])?;
        file.sync_all()?;

        Ok(())
    }

    fn verify_manifest(path: &Path) -> Result<()> {
        use std::io::Read;

        let manifest_path = path.join("MANIFEST");
        let mut file = File::open(manifest_path)?;

        let mut magic = [0u8; 4];
        file.read_exact(&mut magic)?;
        if &magic != STORE_MAGIC {
            return Err(StoreError::InvalidFormat("Invalid store magic".into()));
        }

        let mut version = [0u8; 1];
        file.read_exact(&mut version)?;
        if version[0] != STORE_VERSION {
            return Err(StoreError::InvalidFormat(format!(
                "Unsupported store version: {}",
                version[0]
            )));
        }

        Ok(())
    }

    fn acquire_lock(path: &Path) -> Result<File> {
        let lock_path = path.join("LOCK");
        let lock_file = File::create(lock_path)?;

        lock_file
            .try_lock_exclusive()
            .map_err(|_| StoreError::Locked)?;

        Ok(lock_file)
    }
}
