//! Core types for the inventory store.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Process-local counter folded into generated ids so that two ids minted in
/// the same microsecond still differ.
static ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Mint an opaque, unique identifier string.
///
/// Layout: 8 bytes of microseconds since epoch + 2 counter bytes, hex-encoded.
fn opaque_id() -> String {
    let micros = Utc::now().timestamp_micros() as u64;
    let count = ID_COUNTER.fetch_add(1, Ordering::Relaxed) as u16;

    let mut bytes = [0u8; 10];
    bytes[..8].copy_from_slice(&micros.to_be_bytes());
    bytes[8..].copy_from_slice(&count.to_be_bytes());
    hex::encode(bytes)
}

/// Unique identifier for an asset.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssetId(pub String);

impl AssetId {
    /// Generate a fresh id (assigned once, at creation).
    pub fn generate() -> Self {
        AssetId(opaque_id())
    }
}

impl fmt::Debug for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AssetId({})", self.0)
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for AssetId {
    fn from(s: &str) -> Self {
        AssetId(s.to_string())
    }
}

/// Unique identifier for an activity-log entry.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LogEntryId(pub String);

impl LogEntryId {
    pub fn generate() -> Self {
        LogEntryId(opaque_id())
    }
}

impl fmt::Debug for LogEntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LogEntryId({})", self.0)
    }
}

impl fmt::Display for LogEntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a stock-take audit record.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AuditLogId(pub String);

impl AuditLogId {
    pub fn generate() -> Self {
        AuditLogId(opaque_id())
    }
}

impl fmt::Debug for AuditLogId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AuditLogId({})", self.0)
    }
}

impl fmt::Display for AuditLogId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle status of an asset.
///
/// Legacy spellings ("Assigned", "Maintenance") are rewritten by the
/// migration pass before records are decoded into this enum.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssetStatus {
    #[serde(rename = "In Stock")]
    InStock,
    #[serde(rename = "In Use")]
    InUse,
    Resign,
    Missing,
    Broken,
    Disposed,
}

impl AssetStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetStatus::InStock => "In Stock",
            AssetStatus::InUse => "In Use",
            AssetStatus::Resign => "Resign",
            AssetStatus::Missing => "Missing",
            AssetStatus::Broken => "Broken",
            AssetStatus::Disposed => "Disposed",
        }
    }
}

impl Default for AssetStatus {
    fn default() -> Self {
        AssetStatus::InStock
    }
}

impl fmt::Display for AssetStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Department codes assets can be assigned under.
///
/// Legacy codes ("OMD", "PUR") are rewritten by the migration pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Department {
    #[serde(rename = "IT")]
    It,
    #[serde(rename = "HR")]
    Hr,
    #[serde(rename = "ACC")]
    Acc,
    #[serde(rename = "ADM")]
    Adm,
    #[serde(rename = "OD")]
    Od,
    #[serde(rename = "PU")]
    Pu,
}

impl Department {
    pub fn as_str(&self) -> &'static str {
        match self {
            Department::It => "IT",
            Department::Hr => "HR",
            Department::Acc => "ACC",
            Department::Adm => "ADM",
            Department::Od => "OD",
            Department::Pu => "PU",
        }
    }
}

impl fmt::Display for Department {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Physical condition of an asset.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Condition {
    Working,
    #[serde(rename = "Not Working")]
    NotWorking,
}

impl Default for Condition {
    fn default() -> Self {
        Condition::Working
    }
}

/// Kind of mutation recorded in the activity log.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LogAction {
    Add,
    Update,
    Delete,
    #[serde(rename = "Check-in")]
    CheckIn,
    #[serde(rename = "Check-out")]
    CheckOut,
    Dispose,
    Audit,
    Import,
}

impl LogAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogAction::Add => "Add",
            LogAction::Update => "Update",
            LogAction::Delete => "Delete",
            LogAction::CheckIn => "Check-in",
            LogAction::CheckOut => "Check-out",
            LogAction::Dispose => "Dispose",
            LogAction::Audit => "Audit",
            LogAction::Import => "Import",
        }
    }
}

impl fmt::Display for LogAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Supervisor sign-off progress on an audit record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum VerificationStatus {
    Pending,
    #[serde(rename = "Supervisor 1 Verified")]
    Supervisor1Verified,
    Verified,
}

/// Which supervisor slot a verification call fills.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VerificationStep {
    Supervisor1,
    Supervisor2,
}

/// Completion status of an audit session. Only completed sessions are saved.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuditStatus {
    Completed,
}

/// One image attached to an asset.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageData {
    pub content_type: String,
    pub data: Vec<u8>,
}

impl ImageData {
    pub fn new(content_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            content_type: content_type.into(),
            data,
        }
    }
}

impl fmt::Debug for ImageData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ImageData({}, {} bytes)", self.content_type, self.data.len())
    }
}

/// A tracked physical item.
///
/// `images` never reaches the metadata files: the field is skipped during
/// serialization and merged back from the image store at load time.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Asset {
    pub id: AssetId,
    pub computer_no: String,
    pub serial_no: String,
    pub status: AssetStatus,

    /// Assignment fields, populated only while status is In Use.
    pub owner: Option<String>,
    pub emp_id: Option<String>,
    pub department: Option<Department>,

    pub brand: Option<String>,
    pub model: Option<String>,
    pub purchase_date: Option<NaiveDate>,
    pub warranty_expiry: Option<NaiveDate>,
    /// When the asset was last handed out (set at check-out).
    pub distribution_date: Option<NaiveDate>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub remarks: Option<String>,
    pub condition: Condition,
    /// Free text, meaningful only when condition is Not Working.
    pub issues: Option<String>,

    pub hdd: Option<String>,
    pub ram: Option<String>,
    pub cpu: Option<String>,

    #[serde(skip)]
    pub images: Vec<ImageData>,

    pub last_updated: DateTime<Utc>,
    pub updated_by: String,
}

/// Input for creating an asset (before id and audit fields are assigned).
#[derive(Clone, Debug, Default)]
pub struct AssetInput {
    pub computer_no: String,
    pub serial_no: String,
    pub status: AssetStatus,
    pub owner: Option<String>,
    pub emp_id: Option<String>,
    pub department: Option<Department>,
    pub brand: Option<String>,
    pub model: Option<String>,
    pub purchase_date: Option<NaiveDate>,
    pub warranty_expiry: Option<NaiveDate>,
    pub distribution_date: Option<NaiveDate>,
    pub tags: Vec<String>,
    pub remarks: Option<String>,
    pub condition: Condition,
    pub issues: Option<String>,
    pub hdd: Option<String>,
    pub ram: Option<String>,
    pub cpu: Option<String>,
    pub images: Vec<ImageData>,
}

impl AssetInput {
    /// Create an input with the two business keys set.
    pub fn new(computer_no: impl Into<String>, serial_no: impl Into<String>) -> Self {
        Self {
            computer_no: computer_no.into(),
            serial_no: serial_no.into(),
            ..Default::default()
        }
    }

    /// Attach images (ordered; the store persists them to the image store).
    pub fn with_images(mut self, images: Vec<ImageData>) -> Self {
        self.images = images;
        self
    }

    /// Materialize into an [`Asset`] under the given identity.
    pub(crate) fn into_asset(self, id: AssetId, actor: &str, now: DateTime<Utc>) -> Asset {
        Asset {
            id,
            computer_no: self.computer_no,
            serial_no: self.serial_no,
            status: self.status,
            owner: self.owner,
            emp_id: self.emp_id,
            department: self.department,
            brand: self.brand,
            model: self.model,
            purchase_date: self.purchase_date,
            warranty_expiry: self.warranty_expiry,
            distribution_date: self.distribution_date,
            tags: self.tags,
            remarks: self.remarks,
            condition: self.condition,
            issues: self.issues,
            hdd: self.hdd,
            ram: self.ram,
            cpu: self.cpu,
            images: self.images,
            last_updated: now,
            updated_by: actor.to_string(),
        }
    }
}

/// One immutable activity-log row describing a single mutation.
///
/// `asset_id` is a weak reference: the asset may be deleted later while the
/// entry persists, which is why the business keys are denormalized here.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub id: LogEntryId,
    pub asset_id: AssetId,
    pub computer_no: String,
    pub serial_no: String,
    pub action: LogAction,
    pub timestamp: DateTime<Utc>,
    pub admin_user: String,
    pub details: String,
}

impl LogEntry {
    /// Build an entry snapshotting the asset's business keys.
    pub(crate) fn record(
        asset: &Asset,
        action: LogAction,
        details: impl Into<String>,
        actor: &str,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: LogEntryId::generate(),
            asset_id: asset.id.clone(),
            computer_no: asset.computer_no.clone(),
            serial_no: asset.serial_no.clone(),
            action,
            timestamp: now,
            admin_user: actor.to_string(),
            details: details.into(),
        }
    }
}

/// Immutable snapshot of one stock-take session.
///
/// `scanned_ids` and `missing_ids` partition the audited population at the
/// moment the audit completed; later asset edits do not touch the snapshot.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditLog {
    pub id: AuditLogId,
    pub date: DateTime<Utc>,
    pub total_assets: u64,
    pub scanned_count: u64,
    pub missing_count: u64,
    pub scanned_ids: Vec<AssetId>,
    pub missing_ids: Vec<AssetId>,
    pub status: AuditStatus,
    pub audited_by: String,

    pub supervisor1_verified_by: Option<String>,
    pub supervisor1_verified_at: Option<DateTime<Utc>>,
    pub supervisor2_verified_by: Option<String>,
    pub supervisor2_verified_at: Option<DateTime<Utc>>,

    /// Legacy single-verifier mirror, filled at the final verification step.
    pub verified_by: Option<String>,
    pub verified_at: Option<DateTime<Utc>>,

    pub verification_status: VerificationStatus,
}

impl AuditLog {
    /// Build a completed audit snapshot from the scan result partitions.
    ///
    /// Counts are derived from the partitions, so `scanned_count +
    /// missing_count == total_assets` holds by construction.
    pub fn new(
        audited_by: impl Into<String>,
        scanned_ids: Vec<AssetId>,
        missing_ids: Vec<AssetId>,
    ) -> Self {
        let scanned_count = scanned_ids.len() as u64;
        let missing_count = missing_ids.len() as u64;
        Self {
            id: AuditLogId::generate(),
            date: Utc::now(),
            total_assets: scanned_count + missing_count,
            scanned_count,
            missing_count,
            scanned_ids,
            missing_ids,
            status: AuditStatus::Completed,
            audited_by: audited_by.into(),
            supervisor1_verified_by: None,
            supervisor1_verified_at: None,
            supervisor2_verified_by: None,
            supervisor2_verified_at: None,
            verified_by: None,
            verified_at: None,
            verification_status: VerificationStatus::Pending,
        }
    }
}

/// Outcome of a bulk import.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ImportSummary {
    /// Records appended as new assets.
    pub added: usize,
    /// Records that overwrote an existing asset in place.
    pub updated: usize,
}

/// Store statistics.
#[derive(Clone, Debug, Default)]
pub struct StoreStats {
    pub asset_count: u64,
    pub in_stock_count: u64,
    pub in_use_count: u64,
    pub disposed_count: u64,
    pub log_count: u64,
    pub audit_log_count: u64,
    pub image_bundle_count: u64,
    pub image_size_bytes: u64,
    pub metadata_size_bytes: u64,
}
