//! Session Module
//!
//! Session records and the optimistic locking protocol that guards them.

mod record;
mod store;

pub use record::{
    LockId, LockInfo, SessionFlag, SessionHeader, SessionKeys, SessionRecord, SessionState,
    HEADER_FORMAT_VERSION,
};
pub use store::{
    CommitOutcome, ExclusiveAcquire, ReleaseOutcome, RemoveOutcome, RepairOutcome, RetryPolicy,
    SessionStore, SharedRead, TouchOutcome,
};
