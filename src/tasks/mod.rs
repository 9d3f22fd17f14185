//! Background Tasks Module
//!
//! # Tasks
//! - TTL Cleanup: drops expired gateway entries at configured intervals

mod cleanup;

pub use cleanup::spawn_cleanup_task;
