//! Cache Gateway Module
//!
//! The minimal key-value contract the facade and the session store need
//! from a backing cache.

use std::fmt;
use std::time::Duration;

use crate::error::Result;

// == Version Token ==
/// Opaque revision of a stored value, returned by a versioned read and
/// consumed by a guarded write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VersionToken(pub u64);

impl VersionToken {
    /// Raw token value.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for VersionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// == Versioned Value ==
/// A value read together with its version token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Versioned {
    pub value: Vec<u8>,
    pub version: VersionToken,
}

// == Cache Gateway ==
/// Blocking key-value operations against the backing cache.
///
/// A zero `ttl` means the entry does not expire. Implementations report
/// an unreachable cache as [`crate::error::CacheError::Connectivity`];
/// every other outcome is expressed through the return value.
pub trait CacheGateway: Send + Sync {
    /// Reads a value.
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Reads a value together with its current version token.
    fn get_with_version(&self, key: &str) -> Result<Option<Versioned>>;

    /// Unconditionally overwrites a value.
    fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<bool>;

    /// Writes a value only if its stored version still equals `expected`.
    ///
    /// Returns `false` when the value changed or no longer exists.
    fn compare_and_swap(
        &self,
        key: &str,
        value: &[u8],
        ttl: Duration,
        expected: VersionToken,
    ) -> Result<bool>;

    /// Deletes a value. Returns `false` if there was nothing to delete.
    fn remove(&self, key: &str) -> Result<bool>;
}
