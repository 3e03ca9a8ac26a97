//! Data models shared by the session core.
//!
//! - `User`: a validated account, also the persisted user record
//! - `UserPayload`: the unvalidated shape received from the server or storage
//! - `AuthPayload`: the login response carrying `access_token` and `user`

pub mod user;

pub use user::{AuthPayload, InvalidUser, User, UserPayload};
