//! # Stockroom
//!
//! An embedded inventory store for physical IT equipment: register assets,
//! assign and return them, audit physical stock against records, and keep an
//! append-only trail of every mutation.
//!
//! ## Core Concepts
//!
//! - **Assets**: tracked items with business keys, status, and attachments
//! - **Activity log**: immutable, newest-first record of every mutation
//! - **Audit records**: frozen snapshots of stock-take sessions
//! - **Images**: per-asset bundles kept out of the JSON metadata files
//!
//! ## Example
//!
//! ```ignore
//! use stockroom::{AssetInput, Store, StoreConfig};
//!
//! let store = Store::open_or_create(StoreConfig {
//!     path: "./my-inventory".into(),
//!     ..Default::default()
//! })?;
//!
//! // Register an asset
//! let asset = store.add_asset(AssetInput::new("JTAPNB-000001", "PF00001"), "Alice")?;
//!
//! // Assign it
//! let mut checked_out = asset.clone();
//! checked_out.status = stockroom::AssetStatus::InUse;
//! checked_out.owner = Some("Bob".into());
//! store.update_asset(checked_out, "Alice", stockroom::LogAction::CheckOut,
//!     "Assigned to Bob (ID: E1, Dept: IT)")?;
//! ```

pub mod error;
pub mod images;
pub mod meta;
pub mod migrate;
pub mod store;
pub mod subscriptions;
pub mod types;

// Re-exports
pub use error::{Result, StoreError};
pub use images::ImageStorage;
pub use meta::{MetaKey, MetadataStorage};
pub use store::{Store, StoreConfig};
pub use subscriptions::{
    AssetSummary, DropReason, StoreEvent, SubscriptionConfig, SubscriptionFilter,
    SubscriptionHandle, SubscriptionId, SubscriptionManager,
};
pub use types::*;
