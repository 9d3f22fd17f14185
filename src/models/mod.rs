//! Request and Response models for the session cache API
//!
//! DTOs used for serializing/deserializing HTTP request and response bodies.

pub mod requests;
pub mod responses;

pub use requests::{CommitRequest, CreateSessionRequest, LockQuery, StoreRequest};
pub use responses::{
    HealthResponse, OutcomeResponse, RemoveAllResponse, RemoveResponse, SessionResponse,
    StatsResponse, StoreResponse, ValueResponse,
};
