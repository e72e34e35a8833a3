//! Per-executable analysis cache.
//!
//! - `CacheLayout`: computed paths for the cache, content dir, and archive.
//! - `CacheState` / `probe`: state derived from the directory tree on demand.
//! - `CacheManager`: reset and clean-for-extraction on top of the probe.
//! - `CacheManifest`: hash/timestamp bookkeeping used for staleness checks.
//! - `CacheLock`: advisory single-writer lock.

pub mod archive;
mod layout;
mod lock;
mod manager;
mod manifest;
mod state;

pub use layout::CacheLayout;
pub use lock::CacheLock;
pub use manager::CacheManager;
pub use manifest::CacheManifest;
pub use state::{probe, CacheSnapshot, CacheState};
