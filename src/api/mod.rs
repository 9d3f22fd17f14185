//! API Module
//!
//! HTTP handlers and routing for the session cache REST API.
//!
//! # Endpoints
//! - `/cache` - Cached values under logical keys, with prefix removal
//! - `/sessions/:id` - The session locking protocol
//! - `GET /stats` - Gateway statistics
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
