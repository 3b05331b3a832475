//! Metadata persistence.
//!
//! JSON snapshots of assets (images stripped), activity-log entries, and
//! audit records, one file per fixed key.

mod storage;

pub use storage::{MetaKey, MetadataStorage};
