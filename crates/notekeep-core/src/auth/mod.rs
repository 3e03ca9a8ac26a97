//! Authentication module for managing the user session and its credentials.
//!
//! This module provides:
//! - `SessionManager`: restore / sign-in / sign-out, published over a watch channel
//! - `CredentialStore`: the persisted token and user record
//! - `SecretStore` backends: OS keychain, encrypted file, in-memory
//!
//! The persisted record survives restarts; a corrupted record is cleared and
//! treated as signed out.

pub mod credentials;
pub mod error;
pub mod file_store;
pub mod session;
pub mod storage;

pub use credentials::{CredentialStore, StoredCredentials};
pub use error::{AuthError, StorageError};
pub use file_store::EncryptedFileStore;
pub use session::{AuthState, Session, SessionManager};
pub use storage::{KeyringStore, MemoryStore, SecretStore};
