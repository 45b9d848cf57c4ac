//! Per-customer JSON snapshot cache.

pub mod cache;
pub mod source;

pub use cache::{CacheError, Snapshot, UserCache, UserCacheConfig};
pub use source::{SourceError, UserDataSource};
