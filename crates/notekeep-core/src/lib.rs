//! Session core for the notekeep note and task client.
//!
//! - `auth`: credential storage and the session state machine
//! - `api`: authenticated JSON client for the REST API
//! - `qr`: scan-to-authenticate login flow
//! - `route`: redirect rules between the auth area and the app
//! - `context`: the explicitly owned application context tying them together

pub mod api;
pub mod auth;
pub mod config;
pub mod context;
pub mod models;
pub mod qr;
pub mod route;

pub use api::{ApiClient, ApiError, Envelope};
pub use auth::{AuthError, AuthState, Session, SessionManager};
pub use config::{Config, StorageBackend};
pub use context::AppContext;
pub use models::{User, UserPayload};
pub use qr::{QrError, QrLogin, QrState, ScanOutcome};
pub use route::{Location, Navigator, RouteGuard};
