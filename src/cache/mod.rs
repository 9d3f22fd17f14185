//! Cache Module
//!
//! Key encoding, the process-local key registry, the gateway contract with
//! its in-process implementation, and the caller-facing facade.

mod entry;
mod facade;
mod gateway;
mod key;
mod lru;
mod memory;
mod registry;
mod stats;


// Re-export public types
pub use entry::CacheEntry;
pub use facade::CacheFacade;
pub use gateway::{CacheGateway, VersionToken, Versioned};
pub use key::{encode_key, is_forbidden, sanitize};
pub use lru::LruTracker;
pub use memory::MemoryGateway;
pub use registry::KeyRegistry;
pub use stats::GatewayStats;

// == Public Constants ==
/// Longest physical key kept verbatim, in characters
pub const CACHE_KEY_MAX_LEN: usize = 230;

/// Widest decimal hash suffix appended to truncated keys (`u64::MAX` digits)
pub const HASH_SUFFIX_MAX_WIDTH: usize = 20;
