//! REST API client module for the notekeep service.
//!
//! This module provides the `ApiClient` used by every screen to talk to the
//! API with the current session's bearer token, and the `Envelope` type that
//! models the optional `data` wrapper around response payloads.

pub mod client;
pub mod envelope;
pub mod error;

pub use client::{ApiClient, DEFAULT_BASE_URL};
pub use envelope::Envelope;
pub use error::ApiError;
