//! HTTP API layer for geonote.
//!
//! This crate provides the REST surface:
//!
//! - **Endpoints**: projects, categories, data groupings, contributions
//! - **Extractors**: principal resolution from the auth middleware
//! - **Middleware**: bearer-token authentication, application state
//!
//! Built on Axum 0.8 with Tower middleware stack.

// Allow dead_code for wire-compatibility fields in request structs
#![allow(dead_code)]

pub mod endpoints;
pub mod extractors;
pub mod middleware;

pub use endpoints::router;
pub use middleware::{AppState, auth_middleware, handle_middleware_error};
