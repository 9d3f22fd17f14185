//! Session Store Module
//!
//! Optimistic locking protocol over the cache gateway.
//!
//! Per session id the stored state is `Absent`, `Unlocked` or
//! `Locked(lock_id, lock_time)`. Every transition reads the header with its
//! version token and writes it back with compare-and-swap, so concurrent
//! writers on different processes are serialized by the cache alone.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::cache::{CacheGateway, VersionToken};
use crate::error::{CacheError, Result};
use crate::session::{
    LockId, LockInfo, SessionFlag, SessionHeader, SessionKeys, SessionRecord, SessionState,
};

// == Retry Policy ==
/// Bounds the CAS loop of an exclusive acquire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// CAS rounds before giving up, at least one
    pub max_attempts: u32,
    /// Sleep after the first lost round, doubled after each further one
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 50,
            initial_backoff: Duration::from_millis(5),
            max_backoff: Duration::from_millis(200),
        }
    }
}

impl RetryPolicy {
    /// Sleep after losing round `attempt` (1-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }
}

// == Outcomes ==
/// Result of a read-only load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SharedRead {
    NotFound,
    Found {
        state: SessionState,
        /// Set when another caller currently holds the session
        lock: Option<LockInfo>,
    },
}

/// Result of an exclusive acquire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExclusiveAcquire {
    NotFound,
    /// Somebody else holds the lock
    Held(LockInfo),
    Acquired {
        lock_id: LockId,
        /// Flag the header carried before this acquire cleared it
        actions: SessionFlag,
        state: SessionState,
    },
}

impl ExclusiveAcquire {
    pub fn is_acquired(&self) -> bool {
        matches!(self, ExclusiveAcquire::Acquired { .. })
    }

    /// Lock id of whoever holds the session now, if anyone.
    pub fn lock_id(&self) -> Option<LockId> {
        match self {
            ExclusiveAcquire::NotFound => None,
            ExclusiveAcquire::Held(info) => Some(info.lock_id),
            ExclusiveAcquire::Acquired { lock_id, .. } => Some(*lock_id),
        }
    }
}

/// Result of [`SessionStore::release`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReleaseOutcome {
    Released,
    LockMismatch,
    NotFound,
    /// The header changed between read and write
    Conflict,
}

impl ReleaseOutcome {
    /// Whether the lock was actually dropped.
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Released)
    }
}

/// Result of [`SessionStore::commit_and_release`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CommitOutcome {
    Committed,
    LockMismatch,
    NotFound,
    /// A guarded write lost; see the log for which half
    Conflict,
}

impl CommitOutcome {
    /// Whether the new data and the unlocked header were both written.
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Committed)
    }
}

/// Result of [`SessionStore::remove`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RemoveOutcome {
    Removed,
    LockMismatch,
    NotFound,
}

impl RemoveOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Removed)
    }
}

/// Result of [`SessionStore::touch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TouchOutcome {
    Touched,
    NotFound,
}

impl TouchOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Touched)
    }
}

/// Result of [`SessionStore::repair`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RepairOutcome {
    Consistent,
    Absent,
    /// Header without data: an empty data entry was written
    RestoredData,
    /// Data without header: the data entry was deleted
    RemovedOrphanData,
}

// == Session Store ==
/// Session persistence and locking.
///
/// Only gateway failures are errors, plus [`CacheError::LockContention`]
/// when an exclusive acquire runs out of rounds. Stale lock ids, missing
/// records and lost CAS races come back as outcome variants; callers that
/// want the old fire-and-forget behavior can ignore them.
///
/// Header and data are separate cache entries and are never written
/// atomically. Writes go data first, header last, so a header is only ever
/// published after its payload. A failure in between leaves a split record
/// that [`SessionStore::repair`] can reconcile.
pub struct SessionStore {
    gateway: Arc<dyn CacheGateway>,
    keys: SessionKeys,
    retry: RetryPolicy,
}

impl SessionStore {
    // == Constructor ==
    pub fn new(gateway: Arc<dyn CacheGateway>, keys: SessionKeys, retry: RetryPolicy) -> Self {
        Self {
            gateway,
            keys,
            retry,
        }
    }

    /// Empty state for a session about to be created by its caller.
    pub fn new_state(&self, timeout_minutes: u32) -> SessionState {
        SessionState::new(timeout_minutes)
    }

    // == Create Uninitialized ==
    /// Writes an empty, unlocked session flagged for initialization,
    /// overwriting whatever was stored under `id`.
    pub fn create_uninitialized(&self, id: &str, timeout_minutes: u32) -> Result<()> {
        let header = SessionHeader {
            flag: SessionFlag::InitializeItem,
            ..SessionHeader::unlocked(timeout_minutes)
        };
        let ttl = header.ttl();
        self.write(&self.keys.data_key(id), &[], ttl, None)?;
        self.write(&self.keys.header_key(id), &header.encode()?, ttl, None)?;

        info!(session_id = id, timeout_minutes, "created uninitialized session");
        Ok(())
    }

    // == Acquire Shared ==
    /// Reads a session without locking it.
    pub fn acquire_shared(&self, id: &str) -> Result<SharedRead> {
        let Some(record) = self.load(id)? else {
            return Ok(SharedRead::NotFound);
        };

        Ok(SharedRead::Found {
            state: record.state(),
            lock: record.header.lock_info(Utc::now()),
        })
    }

    // == Acquire Exclusive ==
    /// Locks a session for the caller.
    ///
    /// Loads the record, and if it is unlocked tries to install a new lock
    /// id with compare-and-swap against the header version just read.
    /// Losing that race means another writer got in between, so the record
    /// is read again. Data is always written before its header, so a
    /// payload read ahead of a winning CAS is the current one. Exactly one of several concurrent acquirers wins a round; the
    /// others then observe its lock and report [`ExclusiveAcquire::Held`].
    ///
    /// Gives up with [`CacheError::LockContention`] after
    /// `RetryPolicy::max_attempts` lost rounds.
    pub fn acquire_exclusive(&self, id: &str) -> Result<ExclusiveAcquire> {
        let max_attempts = self.retry.max_attempts.max(1);

        for attempt in 1..=max_attempts {
            let Some(record) = self.load(id)? else {
                return Ok(ExclusiveAcquire::NotFound);
            };
            let SessionRecord {
                mut header,
                header_version,
                items,
                ..
            } = record;

            if let Some(held) = header.lock_info(Utc::now()) {
                debug!(session_id = id, lock_id = %held.lock_id, "session already locked");
                return Ok(ExclusiveAcquire::Held(held));
            }

            let actions = header.flag;
            let lock_id = LockId::from_version(header_version);
            header.lock_id = lock_id;
            header.lock_time = Utc::now();
            header.flag = SessionFlag::None;

            let key = self.keys.header_key(id);
            if self.write(&key, &header.encode()?, header.ttl(), Some(header_version))? {
                debug!(session_id = id, %lock_id, attempt, "acquired session lock");
                return Ok(ExclusiveAcquire::Acquired {
                    lock_id,
                    actions,
                    state: SessionState {
                        items,
                        timeout_minutes: header.timeout_minutes,
                    },
                });
            }

            debug!(session_id = id, attempt, "lost lock race, reloading header");
            if attempt < max_attempts {
                thread::sleep(self.retry.backoff(attempt));
            }
        }

        warn!(session_id = id, attempts = max_attempts, "gave up acquiring session lock");
        Err(CacheError::LockContention {
            session_id: id.to_string(),
            attempts: max_attempts,
        })
    }

    // == Release ==
    /// Unlocks a session held under `lock_id`.
    pub fn release(&self, id: &str, lock_id: LockId) -> Result<ReleaseOutcome> {
        let Some((mut header, version)) = self.load_header(id)? else {
            return Ok(ReleaseOutcome::NotFound);
        };
        if !lock_id.is_locked() || header.lock_id != lock_id {
            debug!(session_id = id, %lock_id, stored = %header.lock_id, "release with foreign lock id");
            return Ok(ReleaseOutcome::LockMismatch);
        }

        header.release();
        let key = self.keys.header_key(id);
        if self.write(&key, &header.encode()?, header.ttl(), Some(version))? {
            debug!(session_id = id, %lock_id, "released session lock");
            Ok(ReleaseOutcome::Released)
        } else {
            Ok(ReleaseOutcome::Conflict)
        }
    }

    // == Commit And Release ==
    /// Stores new session data and unlocks the session in one call.
    ///
    /// For an existing item the caller must hold the lock: the record is
    /// loaded, checked against `lock_id`, and both halves are written back
    /// with compare-and-swap against the versions just read. A new item is
    /// written unconditionally, replacing anything stored under `id`.
    pub fn commit_and_release(
        &self,
        id: &str,
        lock_id: LockId,
        items: &[u8],
        timeout_minutes: u32,
        is_new_item: bool,
    ) -> Result<CommitOutcome> {
        let (header_guard, data_guard) = if is_new_item {
            (None, None)
        } else {
            if !lock_id.is_locked() {
                return Ok(CommitOutcome::LockMismatch);
            }
            let Some((current, header_version)) = self.load_header(id)? else {
                return Ok(CommitOutcome::NotFound);
            };
            if current.lock_id != lock_id {
                debug!(session_id = id, %lock_id, stored = %current.lock_id, "commit with foreign lock id");
                return Ok(CommitOutcome::LockMismatch);
            }
            // A missing data entry is rewritten unguarded.
            let data_version = self.load_data(id)?.map(|(_, version)| version);
            (Some(header_version), data_version)
        };

        let header = SessionHeader::unlocked(timeout_minutes);
        let ttl = header.ttl();

        if !self.write(&self.keys.data_key(id), items, ttl, data_guard)? {
            debug!(session_id = id, "session data changed under the lock, commit dropped");
            return Ok(CommitOutcome::Conflict);
        }
        if !self.write(&self.keys.header_key(id), &header.encode()?, ttl, header_guard)? {
            warn!(session_id = id, "session header changed after data was written, record may be split");
            return Ok(CommitOutcome::Conflict);
        }

        debug!(session_id = id, bytes = items.len(), is_new_item, "committed session");
        Ok(CommitOutcome::Committed)
    }

    // == Remove ==
    /// Deletes a session held under `lock_id`.
    ///
    /// The lock check and the deletes are separate round trips.
    pub fn remove(&self, id: &str, lock_id: LockId) -> Result<RemoveOutcome> {
        let Some((header, _)) = self.load_header(id)? else {
            return Ok(RemoveOutcome::NotFound);
        };
        if !lock_id.is_locked() || header.lock_id != lock_id {
            return Ok(RemoveOutcome::LockMismatch);
        }

        self.gateway.remove(&self.keys.data_key(id))?;
        self.gateway.remove(&self.keys.header_key(id))?;
        info!(session_id = id, "removed session");
        Ok(RemoveOutcome::Removed)
    }

    // == Touch ==
    /// Restarts the expiry clock of a session without changing it.
    ///
    /// Both entries are rewritten with compare-and-swap. Losing that race is
    /// fine: whoever won just wrote the entry and refreshed its TTL. A split
    /// record is left alone for [`SessionStore::repair`].
    pub fn touch(&self, id: &str) -> Result<TouchOutcome> {
        let Some(record) = self.load(id)? else {
            return Ok(TouchOutcome::NotFound);
        };
        let ttl = record.header.ttl();

        self.write(&self.keys.data_key(id), &record.items, ttl, Some(record.data_version))?;
        self.write(
            &self.keys.header_key(id),
            &record.header.encode()?,
            ttl,
            Some(record.header_version),
        )?;

        debug!(session_id = id, "touched session");
        Ok(TouchOutcome::Touched)
    }

    // == Repair ==
    /// Reconciles a session whose header and data disagree about existence.
    ///
    /// Meant for records left split by a failed write; running it against a
    /// session that is being committed right now can undo that commit.
    pub fn repair(&self, id: &str) -> Result<RepairOutcome> {
        let header = self.load_header(id)?;
        let data_key = self.keys.data_key(id);
        let has_data = self.gateway.get(&data_key)?.is_some();

        let outcome = match (header, has_data) {
            (Some(_), true) => RepairOutcome::Consistent,
            (None, false) => RepairOutcome::Absent,
            (Some((header, _)), false) => {
                self.gateway.set(&data_key, &[], header.ttl())?;
                RepairOutcome::RestoredData
            }
            (None, true) => {
                self.gateway.remove(&data_key)?;
                RepairOutcome::RemovedOrphanData
            }
        };

        if !matches!(outcome, RepairOutcome::Consistent | RepairOutcome::Absent) {
            info!(session_id = id, ?outcome, "repaired split session record");
        }
        Ok(outcome)
    }

    // == Loading ==
    /// Loads header and data.
    ///
    /// A header whose data entry is missing reads as absent: the record was
    /// split by a failed write and only [`SessionStore::repair`] touches it.
    pub fn load(&self, id: &str) -> Result<Option<SessionRecord>> {
        let Some((header, header_version)) = self.load_header(id)? else {
            return Ok(None);
        };

        let Some((items, data_version)) = self.load_data(id)? else {
            warn!(session_id = id, "session header has no data entry, treating as absent");
            return Ok(None);
        };

        Ok(Some(SessionRecord {
            header,
            header_version,
            items,
            data_version,
        }))
    }

    /// Loads the header with its version. Undecodable headers read as absent.
    fn load_header(&self, id: &str) -> Result<Option<(SessionHeader, VersionToken)>> {
        let Some(found) = self.gateway.get_with_version(&self.keys.header_key(id))? else {
            return Ok(None);
        };

        match SessionHeader::decode(&found.value) {
            Ok(header) => Ok(Some((header, found.version))),
            Err(e) => {
                warn!(session_id = id, error = %e, "ignoring malformed session header");
                Ok(None)
            }
        }
    }

    fn load_data(&self, id: &str) -> Result<Option<(Vec<u8>, VersionToken)>> {
        Ok(self
            .gateway
            .get_with_version(&self.keys.data_key(id))?
            .map(|found| (found.value, found.version)))
    }

    /// Writes guarded by `guard` when given, unconditionally otherwise.
    fn write(
        &self,
        key: &str,
        value: &[u8],
        ttl: Duration,
        guard: Option<VersionToken>,
    ) -> Result<bool> {
        match guard {
            Some(expected) => self.gateway.compare_and_swap(key, value, ttl, expected),
            None => self.gateway.set(key, value, ttl),
        }
    }
}
