//! Session Cache - session state and cached values over a versioned key-value store
//!
//! Provides pessimistic per-session locking built on compare-and-swap, plus a
//! cache facade with prefix-based group invalidation.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod session;
pub mod tasks;

pub use api::AppState;
pub use config::Config;
pub use tasks::spawn_cleanup_task;
