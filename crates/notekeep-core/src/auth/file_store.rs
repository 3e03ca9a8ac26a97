//! Passphrase-encrypted credential file for hosts without a usable keychain.
//!
//! Each value is sealed with ChaCha20-Poly1305 under a key derived from the
//! passphrase with Argon2id. The record key is bound as associated data so
//! sealed values cannot be swapped between records.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use argon2::Argon2;
use chacha20poly1305::aead::{Aead, KeyInit, Payload};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{SecretStore, StorageError};

const FILE_VERSION: u8 = 1;
const KEY_LEN: usize = 32;
const SALT_LEN: usize = 16;
const NONCE_LEN: usize = 12;

#[derive(Debug, Serialize, Deserialize)]
struct VaultFile {
    version: u8,
    salt: Vec<u8>,
    #[serde(default)]
    entries: BTreeMap<String, SealedEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
struct SealedEntry {
    nonce: Vec<u8>,
    ciphertext: Vec<u8>,
}

pub struct EncryptedFileStore {
    path: PathBuf,
    salt: Vec<u8>,
    key: [u8; KEY_LEN],
    // Serializes read-modify-write cycles on the file
    lock: Mutex<()>,
}

impl EncryptedFileStore {
    /// Open (or prepare to create) the credential file at `path`.
    /// An existing file keeps its salt; a new one gets a random salt.
    pub fn open(path: impl Into<PathBuf>, passphrase: &str) -> Result<Self, StorageError> {
        let path = path.into();
        let salt = match read_file(&path)? {
            Some(file) => {
                if file.version != FILE_VERSION {
                    return Err(StorageError::Corrupted(format!(
                        "unsupported credential file version {}",
                        file.version
                    )));
                }
                file.salt
            }
            None => {
                let mut salt = vec![0u8; SALT_LEN];
                rand::thread_rng().fill_bytes(&mut salt);
                salt
            }
        };

        let key = derive_key(passphrase, &salt)?;
        debug!(path = %path.display(), "Opened encrypted credential file");

        Ok(Self {
            path,
            salt,
            key,
            lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn cipher(&self) -> ChaCha20Poly1305 {
        ChaCha20Poly1305::new(Key::from_slice(&self.key))
    }

    fn seal(&self, key: &str, value: &str) -> Result<SealedEntry, StorageError> {
        let mut nonce = [0u8; NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut nonce);

        let ciphertext = self
            .cipher()
            .encrypt(
                Nonce::from_slice(&nonce),
                Payload {
                    msg: value.as_bytes(),
                    aad: key.as_bytes(),
                },
            )
            .map_err(|_| StorageError::Crypto("failed to encrypt value".to_string()))?;

        Ok(SealedEntry {
            nonce: nonce.to_vec(),
            ciphertext,
        })
    }

    fn unseal(&self, key: &str, entry: &SealedEntry) -> Result<String, StorageError> {
        if entry.nonce.len() != NONCE_LEN {
            return Err(StorageError::Corrupted(format!("bad nonce length for {}", key)));
        }

        let plaintext = self
            .cipher()
            .decrypt(
                Nonce::from_slice(&entry.nonce),
                Payload {
                    msg: &entry.ciphertext,
                    aad: key.as_bytes(),
                },
            )
            .map_err(|_| {
                StorageError::Crypto("failed to decrypt value - wrong passphrase?".to_string())
            })?;

        String::from_utf8(plaintext)
            .map_err(|_| StorageError::Corrupted(format!("value for {} is not UTF-8", key)))
    }

    fn load(&self) -> Result<VaultFile, StorageError> {
        Ok(read_file(&self.path)?.unwrap_or_else(|| VaultFile {
            version: FILE_VERSION,
            salt: self.salt.clone(),
            entries: BTreeMap::new(),
        }))
    }

    fn save(&self, file: &VaultFile) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(file)?;
        std::fs::write(&self.path, contents)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&self.path, std::fs::Permissions::from_mode(0o600))?;
        }

        Ok(())
    }

    fn guard(&self) -> Result<std::sync::MutexGuard<'_, ()>, StorageError> {
        self.lock
            .lock()
            .map_err(|_| StorageError::Backend("credential file lock poisoned".to_string()))
    }
}

impl SecretStore for EncryptedFileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let _guard = self.guard()?;
        let file = self.load()?;
        file.entries
            .get(key)
            .map(|entry| self.unseal(key, entry))
            .transpose()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let _guard = self.guard()?;
        let mut file = self.load()?;
        let sealed = self.seal(key, value)?;
        file.entries.insert(key.to_string(), sealed);
        self.save(&file)
    }

    fn delete(&self, key: &str) -> Result<(), StorageError> {
        let _guard = self.guard()?;
        let mut file = match read_file(&self.path)? {
            Some(file) => file,
            None => return Ok(()),
        };
        if file.entries.remove(key).is_some() {
            self.save(&file)?;
        }
        Ok(())
    }
}

fn read_file(path: &Path) -> Result<Option<VaultFile>, StorageError> {
    if !path.exists() {
        return Ok(None);
    }
    let contents = std::fs::read_to_string(path)?;
    let file = serde_json::from_str(&contents)
        .map_err(|e| StorageError::Corrupted(format!("credential file: {}", e)))?;
    Ok(Some(file))
}

fn derive_key(passphrase: &str, salt: &[u8]) -> Result<[u8; KEY_LEN], StorageError> {
    let mut key = [0u8; KEY_LEN];
    Argon2::default()
        .hash_password_into(passphrase.as_bytes(), salt, &mut key)
        .map_err(|e| StorageError::Crypto(format!("key derivation failed: {}", e)))?;
    Ok(key)
}
