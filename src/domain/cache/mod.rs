//! Cache domain - Generic caching abstraction and the response cache

mod entry;
mod fingerprint;
mod repository;
mod response;

pub use entry::CacheEntry;
pub use fingerprint::Fingerprint;
pub use repository::{Cache, CacheExt};
pub use response::{CacheLookup, ResponseCache};

#[cfg(test)]
pub use repository::mock::MockCache;
