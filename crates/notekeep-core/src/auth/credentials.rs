use tracing::{debug, warn};

use crate::models::{User, UserPayload};

use super::{SecretStore, StorageError};

/// Storage key for the bearer token
pub const TOKEN_KEY: &str = "secure_user_token";

/// Storage key for the JSON-encoded user record
pub const USER_DATA_KEY: &str = "secure_user_data";

/// Whatever the store held at load time. Either field may be absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoredCredentials {
    pub token: Option<String>,
    pub user: Option<User>,
}

pub struct CredentialStore {
    backend: Box<dyn SecretStore>,
}

impl CredentialStore {
    pub fn new(backend: impl SecretStore + 'static) -> Self {
        Self {
            backend: Box::new(backend),
        }
    }

    pub fn from_boxed(backend: Box<dyn SecretStore>) -> Self {
        Self { backend }
    }

    /// Persist the token, then the user record.
    ///
    /// If the user record can't be written the previous token is put back, so
    /// storage keeps whatever session was there before the call.
    pub fn save(&self, token: &str, user: &User) -> Result<(), StorageError> {
        let user_json = serde_json::to_string(user)?;
        let previous_token = match self.backend.get(TOKEN_KEY) {
            Ok(previous) => previous,
            Err(e) => {
                warn!(error = %e, "Failed to read previous token before saving");
                None
            }
        };

        self.backend.set(TOKEN_KEY, token)?;
        if let Err(e) = self.backend.set(USER_DATA_KEY, &user_json) {
            if let Err(restore_err) = self.restore_token(previous_token.as_deref()) {
                warn!(error = %restore_err, "Failed to roll back partial credential write");
            }
            return Err(e);
        }

        debug!(user_id = user.id, "Credentials saved");
        Ok(())
    }

    /// Load stored credentials.
    ///
    /// A user record that can't be parsed, or lacks id/email, is treated as
    /// corruption: storage is cleared and nothing is returned.
    pub fn load(&self) -> Result<StoredCredentials, StorageError> {
        let token = self.backend.get(TOKEN_KEY)?.filter(|t| !t.is_empty());
        let user_json = self.backend.get(USER_DATA_KEY)?;

        let user = match user_json {
            None => None,
            Some(json) => match parse_user(&json) {
                Ok(user) => Some(user),
                Err(e) => {
                    warn!(error = %e, "Discarding corrupted stored user record");
                    if let Err(clear_err) = self.clear() {
                        warn!(error = %clear_err, "Failed to clear corrupted credentials");
                    }
                    return Ok(StoredCredentials::default());
                }
            },
        };

        Ok(StoredCredentials { token, user })
    }

    fn restore_token(&self, previous: Option<&str>) -> Result<(), StorageError> {
        match previous {
            Some(token) => self.backend.set(TOKEN_KEY, token),
            None => self.backend.delete(TOKEN_KEY),
        }
    }

    /// Delete both records. Both deletes are attempted; the first failure is returned.
    pub fn clear(&self) -> Result<(), StorageError> {
        let token_result = self.backend.delete(TOKEN_KEY);
        let user_result = self.backend.delete(USER_DATA_KEY);
        token_result.and(user_result)
    }
}

fn parse_user(json: &str) -> Result<User, StorageError> {
    let payload: UserPayload =
        serde_json::from_str(json).map_err(|e| StorageError::Corrupted(e.to_string()))?;
    User::try_from(payload).map_err(|e| StorageError::Corrupted(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::MemoryStore;

    /// Backend that refuses to write the user record
    struct FailingUserWrites(MemoryStore);

    impl SecretStore for FailingUserWrites {
        fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
            self.0.get(key)
        }

        fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
            if key == USER_DATA_KEY {
                return Err(StorageError::Backend("disk full".to_string()));
            }
            self.0.set(key, value)
        }

        fn delete(&self, key: &str) -> Result<(), StorageError> {
            self.0.delete(key)
        }
    }

    fn sample_user() -> User {
        User {
            id: 7,
            name: "A".to_string(),
            email: "a@x.com".to_string(),
        }
    }

    #[test]
    fn test_save_then_load_round_trip() {
        let store = CredentialStore::new(MemoryStore::new());
        store.save("tok1", &sample_user()).unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(loaded.token.as_deref(), Some("tok1"));
        assert_eq!(loaded.user, Some(sample_user()));
    }

    #[test]
    fn test_truncated_user_json_is_cleared() {
        let backend = MemoryStore::new();
        backend.set(TOKEN_KEY, "tok1").unwrap();
        backend.set(USER_DATA_KEY, r#"{"id":7,"name":"A","em"#).unwrap();

        let store = CredentialStore::new(backend.clone());
        let loaded = store.load().unwrap();

        assert_eq!(loaded, StoredCredentials::default());
        assert!(backend.is_empty());
    }

    #[test]
    fn test_user_missing_email_is_cleared() {
        let backend = MemoryStore::new();
        backend.set(TOKEN_KEY, "tok1").unwrap();
        backend.set(USER_DATA_KEY, r#"{"id":7,"name":"A"}"#).unwrap();

        let store = CredentialStore::new(backend.clone());
        assert_eq!(store.load().unwrap(), StoredCredentials::default());
        assert!(backend.is_empty());
    }

    #[test]
    fn test_load_empty_store() {
        let store = CredentialStore::new(MemoryStore::new());
        assert_eq!(store.load().unwrap(), StoredCredentials::default());
    }

    #[test]
    fn test_clear_removes_both_records() {
        let backend = MemoryStore::new();
        let store = CredentialStore::new(backend.clone());
        store.save("tok1", &sample_user()).unwrap();
        assert_eq!(backend.len(), 2);

        store.clear().unwrap();
        assert!(backend.is_empty());

        // Clearing again is fine
        store.clear().unwrap();
    }

    #[test]
    fn test_failed_user_write_keeps_previous_record() {
        let backend = MemoryStore::new();
        CredentialStore::new(backend.clone())
            .save("old", &sample_user())
            .unwrap();

        let store = CredentialStore::new(FailingUserWrites(backend.clone()));
        let other = User {
            id: 8,
            name: "B".to_string(),
            email: "b@x.com".to_string(),
        };
        assert!(store.save("new", &other).is_err());

        let loaded = store.load().unwrap();
        assert_eq!(loaded.token.as_deref(), Some("old"));
        assert_eq!(loaded.user, Some(sample_user()));
    }

    #[test]
    fn test_failed_first_write_leaves_store_empty() {
        let backend = MemoryStore::new();
        let store = CredentialStore::new(FailingUserWrites(backend.clone()));

        assert!(store.save("tok1", &sample_user()).is_err());
        assert!(backend.is_empty());
    }
}
