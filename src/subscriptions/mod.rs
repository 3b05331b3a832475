//! Live update notifications.
//!
//! Consumers (tables, export views) subscribe to the store and receive an
//! event for every committed mutation, re-reading the snapshot accessors to
//! refresh. Slow consumers are dropped rather than allowed to stall writers.

mod manager;
mod types;

pub use manager::SubscriptionManager;
pub use types::{
    AssetSummary, DropReason, StoreEvent, SubscriptionConfig, SubscriptionFilter,
    SubscriptionHandle, SubscriptionId,
};
