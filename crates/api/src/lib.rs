//! HTTP API layer for ballotbox.
//!
//! This crate provides the JSON API:
//!
//! - **Endpoints**: election setup, candidacy, voting and results
//! - **Extractors**: the authenticated voter
//! - **Middleware**: bearer token resolution
//!
//! Every endpoint is a `POST` taking a JSON body and answering with
//! `{ "data": ... }` or `{ "error": { "code", "message" } }`.

pub mod endpoints;
pub mod extractors;
pub mod middleware;
pub mod response;

pub use endpoints::router;
pub use middleware::{AppState, auth_middleware};
