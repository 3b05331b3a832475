//! Subscription manager for broadcasting store events.

use crate::types::{Asset, AssetId, AuditLogId, ImportSummary, LogEntry, VerificationStatus};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use crossbeam_channel::{bounded, Sender};

use super::types::{
    AssetSummary, DropReason, StoreEvent, SubscriptionConfig, SubscriptionHandle, SubscriptionId,
};

/// Internal subscription state.
struct Subscription {
    config: SubscriptionConfig,
    sender: Sender<StoreEvent>,
}

impl Subscription {
    /// Try to send an event. Returns false if buffer is full (subscriber will be dropped).
    fn try_send(&self, event: StoreEvent) -> bool {
        match self.sender.try_send(event) {
            Ok(()) => true,
            Err(crossbeam_channel::TrySendError::Full(_)) => false,
            Err(crossbeam_channel::TrySendError::Disconnected(_)) => false,
        }
    }

    /// Check if this subscription wants asset collection events.
    fn wants_assets(&self) -> bool {
        self.config.filter.include_assets
    }

    /// Check if this subscription matches a log append.
    fn matches_log(&self, entry: &LogEntry) -> bool {
        if !self.config.filter.include_logs {
            return false;
        }

        if let Some(ref actions) = self.config.filter.actions {
            if !actions.contains(&entry.action) {
                return false;
            }
        }

        true
    }

    /// Check if this subscription wants audit-record events.
    fn wants_audits(&self) -> bool {
        self.config.filter.include_audits
    }
}

/// Manages subscriptions and broadcasts events.
pub struct SubscriptionManager {
    /// Active subscriptions by ID.
    subscriptions: RwLock<HashMap<SubscriptionId, Subscription>>,
    /// Counter for generating subscription IDs.
    next_id: AtomicU64,
}

impl SubscriptionManager {
    /// Create a new subscription manager.
    pub fn new() -> Self {
        Self {
            subscriptions: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Create a new subscription.
    ///
    /// Returns a handle for receiving events.
    pub fn subscribe(&self, config: SubscriptionConfig) -> SubscriptionHandle {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::SeqCst));
        let (sender, receiver) = bounded(config.buffer_size);

        let subscription = Subscription { config, sender };

        self.subscriptions.write().insert(id, subscription);

        SubscriptionHandle { id, receiver }
    }

    /// Unsubscribe and clean up.
    pub fn unsubscribe(&self, id: SubscriptionId) {
        let mut subs = self.subscriptions.write();
        if let Some(sub) = subs.remove(&id) {
            // Send dropped event (best effort)
            let _ = sub.sender.try_send(StoreEvent::Dropped {
                reason: DropReason::Unsubscribed,
            });
        }
    }

    /// Get subscription count.
    pub fn subscription_count(&self) -> usize {
        self.subscriptions.read().len()
    }

    // --- Broadcasting ---

    /// Broadcast an asset add/replace to matching subscriptions.
    pub fn broadcast_asset_upserted(&self, asset: &Asset) {
        let event = StoreEvent::AssetUpserted {
            asset: AssetSummary::from_asset(asset),
        };

        self.broadcast(|sub| sub.wants_assets(), event);
    }

    /// Broadcast asset removals to matching subscriptions.
    pub fn broadcast_assets_removed(&self, ids: Vec<AssetId>) {
        let event = StoreEvent::AssetsRemoved { ids };

        self.broadcast(|sub| sub.wants_assets(), event);
    }

    /// Broadcast an import outcome to matching subscriptions.
    pub fn broadcast_assets_imported(&self, summary: ImportSummary) {
        let event = StoreEvent::AssetsImported {
            added: summary.added,
            updated: summary.updated,
        };

        self.broadcast(|sub| sub.wants_assets(), event);
    }

    /// Broadcast an activity-log append to matching subscriptions.
    pub fn broadcast_log_appended(&self, entry: &LogEntry) {
        let event = StoreEvent::LogAppended {
            entry: entry.clone(),
        };

        self.broadcast(|sub| sub.matches_log(entry), event);
    }

    /// Broadcast an audit-record save to matching subscriptions.
    pub fn broadcast_audit_saved(&self, id: &AuditLogId) {
        let event = StoreEvent::AuditLogSaved { id: id.clone() };

        self.broadcast(|sub| sub.wants_audits(), event);
    }

    /// Broadcast an audit verification step to matching subscriptions.
    pub fn broadcast_audit_verified(&self, id: &AuditLogId, status: VerificationStatus) {
        let event = StoreEvent::AuditLogVerified {
            id: id.clone(),
            status,
        };

        self.broadcast(|sub| sub.wants_audits(), event);
    }

    /// Internal broadcast helper. Drops subscribers that fail to receive.
    fn broadcast<F>(&self, filter: F, event: StoreEvent)
    where
        F: Fn(&Subscription) -> bool,
    {
        let mut to_remove = Vec::new();

        {
            let subs = self.subscriptions.read();
            for (id, sub) in subs.iter() {
                if filter(sub) && !sub.try_send(event.clone()) {
                    to_remove.push(*id);
                }
            }
        }

        // Remove dropped subscriptions
        if !to_remove.is_empty() {
            let mut subs = self.subscriptions.write();
            for id in to_remove {
                if let Some(sub) = subs.remove(&id) {
                    // Try to notify about the drop (might fail, that's ok)
                    let _ = sub.sender.try_send(StoreEvent::Dropped {
                        reason: DropReason::BufferOverflow,
                    });
                }
            }
        }
    }
}

impl Default for SubscriptionManager {
    fn default() -> Self {
        Self::new()
    }
}
