//! Image storage.
//!
//! Binary image payloads live here, keyed by asset id, decoupled from the
//! JSON metadata files which are unsuited to large payloads.

mod storage;

pub use storage::ImageStorage;
