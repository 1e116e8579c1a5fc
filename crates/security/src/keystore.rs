// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Encrypted key-value vault.
//!
//! The whole store is one JSON map encrypted with AES-256-GCM under a
//! caller-supplied 32-byte key, persisted as a small envelope (base64
//! nonce + ciphertext) through a temp-file-and-rename write.

use aes_gcm::aead::{Aead, OsRng};
use aes_gcm::{AeadCore, Aes256Gcm, Key, KeyInit, Nonce};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum KeyStoreError {
    #[error("encryption key must be 32 bytes, got {0}")]
    InvalidKeyLength(usize),
    #[error("decryption failed (wrong key or corrupt store)")]
    Decrypt,
    #[error("encryption failed")]
    Encrypt,
    #[error("key not found: {0}")]
    NotFound(String),
    #[error("key expired: {0}")]
    Expired(String),
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("serialize error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// One stored secret with its bookkeeping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyEntry {
    pub value: String,
    pub created: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_used: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<DateTime<Utc>>,
    #[serde(default)]
    pub access_mask: u32,
}

/// On-disk envelope around the encrypted map.
#[derive(Debug, Serialize, Deserialize)]
struct Envelope {
    nonce: String,
    ciphertext: String,
}

/// AES-256-GCM-encrypted map of named secrets.
pub struct KeyStore {
    path: PathBuf,
    cipher: Aes256Gcm,
    entries: Mutex<BTreeMap<String, KeyEntry>>,
}

impl std::fmt::Debug for KeyStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyStore").field("path", &self.path).finish()
    }
}

impl KeyStore {
    /// Open (or initialize) the store at `path` with a 32-byte key.
    pub fn open(path: &Path, key: &[u8]) -> Result<Self, KeyStoreError> {
        if key.len() != 32 {
            return Err(KeyStoreError::InvalidKeyLength(key.len()));
        }
        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));
        let entries = match std::fs::read_to_string(path) {
            Ok(raw) => decrypt_entries(&cipher, &raw)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(source) => {
                return Err(KeyStoreError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        Ok(Self {
            path: path.to_path_buf(),
            cipher,
            entries: Mutex::new(entries),
        })
    }

    /// Store a secret and persist.
    pub fn set(&self, name: &str, value: &str) -> Result<(), KeyStoreError> {
        self.set_entry(
            name,
            KeyEntry {
                value: value.to_string(),
                created: Utc::now(),
                last_used: None,
                expiry: None,
                access_mask: 0,
            },
        )
    }

    /// Store a full entry (expiry, access mask) and persist.
    pub fn set_entry(&self, name: &str, entry: KeyEntry) -> Result<(), KeyStoreError> {
        let snapshot = {
            let mut entries = self.entries.lock();
            entries.insert(name.to_string(), entry);
            entries.clone()
        };
        self.persist(&snapshot)
    }

    /// Fetch a secret, stamping `last_used`. Expired keys report
    /// [`KeyStoreError::Expired`].
    pub fn get(&self, name: &str) -> Result<String, KeyStoreError> {
        let snapshot = {
            let mut entries = self.entries.lock();
            let entry = entries
                .get_mut(name)
                .ok_or_else(|| KeyStoreError::NotFound(name.to_string()))?;
            if let Some(expiry) = entry.expiry {
                if expiry <= Utc::now() {
                    return Err(KeyStoreError::Expired(name.to_string()));
                }
            }
            entry.last_used = Some(Utc::now());
            entries.clone()
        };
        self.persist(&snapshot)?;
        let entries = self.entries.lock();
        entries
            .get(name)
            .map(|e| e.value.clone())
            .ok_or_else(|| KeyStoreError::NotFound(name.to_string()))
    }

    /// Remove a secret and persist. Unknown names report `NotFound`.
    pub fn delete(&self, name: &str) -> Result<(), KeyStoreError> {
        let snapshot = {
            let mut entries = self.entries.lock();
            if entries.remove(name).is_none() {
                return Err(KeyStoreError::NotFound(name.to_string()));
            }
            entries.clone()
        };
        self.persist(&snapshot)
    }

    /// Names of stored secrets.
    pub fn list(&self) -> Vec<String> {
        self.entries.lock().keys().cloned().collect()
    }

    /// Bookkeeping for one entry, without stamping `last_used`.
    pub fn entry(&self, name: &str) -> Option<KeyEntry> {
        self.entries.lock().get(name).cloned()
    }

    fn persist(&self, entries: &BTreeMap<String, KeyEntry>) -> Result<(), KeyStoreError> {
        let plaintext = serde_json::to_vec(entries)?;
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher
            .encrypt(&nonce, plaintext.as_slice())
            .map_err(|_| KeyStoreError::Encrypt)?;
        let envelope = Envelope {
            nonce: BASE64.encode(nonce),
            ciphertext: BASE64.encode(ciphertext),
        };
        let raw = serde_json::to_string_pretty(&envelope)?;

        let tmp = self.path.with_extension("tmp");
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| KeyStoreError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        std::fs::write(&tmp, raw).map_err(|source| KeyStoreError::Io {
            path: tmp.clone(),
            source,
        })?;
        set_mode(&tmp, 0o600);
        std::fs::rename(&tmp, &self.path).map_err(|source| KeyStoreError::Io {
            path: self.path.clone(),
            source,
        })
    }
}

fn decrypt_entries(
    cipher: &Aes256Gcm,
    raw: &str,
) -> Result<BTreeMap<String, KeyEntry>, KeyStoreError> {
    let envelope: Envelope = serde_json::from_str(raw)?;
    let nonce_bytes = BASE64
        .decode(envelope.nonce)
        .map_err(|_| KeyStoreError::Decrypt)?;
    let ciphertext = BASE64
        .decode(envelope.ciphertext)
        .map_err(|_| KeyStoreError::Decrypt)?;
    let plaintext = cipher
        .decrypt(Nonce::from_slice(&nonce_bytes), ciphertext.as_slice())
        .map_err(|_| KeyStoreError::Decrypt)?;
    Ok(serde_json::from_slice(&plaintext)?)
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) {
    use std::os::unix::fs::PermissionsExt;
    let _ = std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode));
}

#[cfg(not(unix))]
fn set_mode(_path: &Path, _mode: u32) {}

#[cfg(test)]
#[path = "keystore_tests.rs"]
mod tests;
