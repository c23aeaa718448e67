//! Core business logic for geonote.

pub mod cache;
pub mod fields;
pub mod filter;
pub mod lifecycle;
pub mod policy;
pub mod roles;
pub mod services;
pub mod validate;

pub use services::*;
