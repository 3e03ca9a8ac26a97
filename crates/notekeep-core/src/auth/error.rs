use thiserror::Error;

use crate::models::InvalidUser;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Invalid credentials: {0}")]
    InvalidCredential(String),

    #[error("Credential storage failed: {0}")]
    Storage(#[from] StorageError),
}

impl From<InvalidUser> for AuthError {
    fn from(err: InvalidUser) -> Self {
        AuthError::InvalidCredential(err.to_string())
    }
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Secure storage backend error: {0}")]
    Backend(String),

    #[error("Stored record is corrupted: {0}")]
    Corrupted(String),

    #[error("Encryption error: {0}")]
    Crypto(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl From<keyring::Error> for StorageError {
    fn from(err: keyring::Error) -> Self {
        StorageError::Backend(err.to_string())
    }
}
