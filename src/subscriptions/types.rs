//! Subscription types for live store updates.

use crate::types::{
    Asset, AssetId, AssetStatus, AuditLogId, LogAction, LogEntry, VerificationStatus,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Configuration for a subscription.
#[derive(Clone, Debug)]
pub struct SubscriptionConfig {
    /// Max buffered events before dropping subscriber.
    /// Default: 1000
    pub buffer_size: usize,

    /// Filter criteria.
    pub filter: SubscriptionFilter,
}

impl Default for SubscriptionConfig {
    fn default() -> Self {
        Self {
            buffer_size: 1000,
            filter: SubscriptionFilter::default(),
        }
    }
}

/// Filter criteria for subscriptions.
#[derive(Clone, Debug, Default)]
pub struct SubscriptionFilter {
    /// Include asset collection changes (adds, updates, removals, imports).
    pub include_assets: bool,

    /// Include activity-log appends.
    pub include_logs: bool,

    /// Include audit-record events (saves and verifications).
    pub include_audits: bool,

    /// Restrict log appends to these actions (None = all actions).
    pub actions: Option<Vec<LogAction>>,
}

impl SubscriptionFilter {
    /// Subscribe to asset collection changes.
    pub fn assets() -> Self {
        Self {
            include_assets: true,
            ..Default::default()
        }
    }

    /// Subscribe to all activity-log appends.
    pub fn logs() -> Self {
        Self {
            include_logs: true,
            ..Default::default()
        }
    }

    /// Subscribe to log appends for specific actions.
    pub fn log_actions(actions: Vec<LogAction>) -> Self {
        Self {
            include_logs: true,
            actions: Some(actions),
            ..Default::default()
        }
    }

    /// Subscribe to audit-record events.
    pub fn audits() -> Self {
        Self {
            include_audits: true,
            ..Default::default()
        }
    }

    /// Subscribe to everything.
    pub fn all() -> Self {
        Self {
            include_assets: true,
            include_logs: true,
            include_audits: true,
            ..Default::default()
        }
    }
}

/// Events emitted by subscriptions.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StoreEvent {
    // --- Asset Events ---
    /// An asset was added or replaced.
    AssetUpserted { asset: AssetSummary },

    /// Assets were removed.
    AssetsRemoved { ids: Vec<AssetId> },

    /// A bulk import finished.
    AssetsImported { added: usize, updated: usize },

    // --- Log Events ---
    /// An activity-log entry was appended.
    LogAppended { entry: LogEntry },

    // --- Audit Events ---
    /// A completed audit session was saved.
    AuditLogSaved { id: AuditLogId },

    /// An audit record passed a verification step.
    AuditLogVerified {
        id: AuditLogId,
        status: VerificationStatus,
    },

    // --- Lifecycle Events ---
    /// Subscription was dropped.
    Dropped { reason: DropReason },
}

/// Why a subscription was dropped.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DropReason {
    /// Send buffer overflowed (slow consumer).
    BufferOverflow,
    /// Receiver was dropped.
    Disconnected,
    /// Explicitly unsubscribed.
    Unsubscribed,
}

/// Summary of an asset (for events; keeps image payloads out of the channel).
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetSummary {
    pub id: AssetId,
    pub computer_no: String,
    pub serial_no: String,
    pub status: AssetStatus,
    pub owner: Option<String>,
    pub last_updated: DateTime<Utc>,
}

impl AssetSummary {
    /// Create summary from a full asset.
    pub fn from_asset(asset: &Asset) -> Self {
        Self {
            id: asset.id.clone(),
            computer_no: asset.computer_no.clone(),
            serial_no: asset.serial_no.clone(),
            status: asset.status,
            owner: asset.owner.clone(),
            last_updated: asset.last_updated,
        }
    }
}

/// Unique identifier for a subscription.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

/// Handle to manage a subscription.
pub struct SubscriptionHandle {
    pub id: SubscriptionId,
    /// Channel to receive events.
    pub receiver: crossbeam_channel::Receiver<StoreEvent>,
}

impl SubscriptionHandle {
    /// Receive the next event (blocking).
    pub fn recv(&self) -> Result<StoreEvent, crossbeam_channel::RecvError> {
        self.receiver.recv()
    }

    /// Try to receive an event (non-blocking).
    pub fn try_recv(&self) -> Result<StoreEvent, crossbeam_channel::TryRecvError> {
        self.receiver.try_recv()
    }

    /// Receive with timeout.
    pub fn recv_timeout(
        &self,
        timeout: std::time::Duration,
    ) -> Result<StoreEvent, crossbeam_channel::RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }
}
