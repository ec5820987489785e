//! Secure storage for the session credential.
//!
//! Exactly one opaque token lives under a fixed key. The production store is
//! the OS keychain via the `keyring` crate; `MemoryStore` serves tests and
//! embedders that have no keychain.
//!
//! `store` and `delete` never fail loudly. They log and hand back a
//! [`StoreOutcome`] so the caller decides what a lost write means. `get` after
//! a successful `delete` returns `None`.

use std::sync::Mutex;

use keyring::Entry;
use thiserror::Error;
use zeroize::Zeroizing;

/// Keychain service name used when the configuration does not override it.
pub const DEFAULT_SERVICE_NAME: &str = "com.recipebox.mobile";

/// Fixed key the credential is stored under.
pub const CREDENTIAL_KEY: &str = "token";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CredentialError {
    #[error("credential storage unavailable: {0}")]
    Unavailable(String),
}

impl From<keyring::Error> for CredentialError {
    fn from(err: keyring::Error) -> Self {
        CredentialError::Unavailable(err.to_string())
    }
}

/// Result of a write to credential storage.
#[must_use]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreOutcome {
    Persisted,
    /// The write did not take effect. Re-read with `get` before relying on
    /// the stored state.
    NotPersisted { reason: String },
}

impl StoreOutcome {
    pub fn is_persisted(&self) -> bool {
        matches!(self, StoreOutcome::Persisted)
    }
}

/// Durable storage of a single session credential.
pub trait CredentialStore: Send + Sync {
    fn store(&self, token: &str) -> StoreOutcome;

    /// `Ok(None)` when no credential is stored.
    fn get(&self) -> Result<Option<String>, CredentialError>;

    /// Idempotent: deleting an absent credential is `Persisted`.
    fn delete(&self) -> StoreOutcome;
}

/// OS keychain backed store.
///
/// Each call opens its own `Entry`, which is released when the call returns.
#[derive(Debug, Clone)]
pub struct KeychainStore {
    service: String,
    key: String,
}

impl KeychainStore {
    pub fn new(service: &str) -> Self {
        Self::with_key(service, CREDENTIAL_KEY)
    }

    pub fn with_key(service: &str, key: &str) -> Self {
        Self {
            service: service.to_string(),
            key: key.to_string(),
        }
    }

    fn entry(&self) -> Result<Entry, CredentialError> {
        Ok(Entry::new(&self.service, &self.key)?)
    }
}

impl Default for KeychainStore {
    fn default() -> Self {
        Self::new(DEFAULT_SERVICE_NAME)
    }
}

impl CredentialStore for KeychainStore {
    fn store(&self, token: &str) -> StoreOutcome {
        if token.trim().is_empty() {
            return refuse_empty();
        }
        let result = self
            .entry()
            .and_then(|entry| entry.set_password(token).map_err(CredentialError::from));
        match result {
            Ok(()) => StoreOutcome::Persisted,
            Err(e) => {
                log::error!("Keychain store failed for {}: {}", self.service, e);
                StoreOutcome::NotPersisted {
                    reason: e.to_string(),
                }
            }
        }
    }

    fn get(&self) -> Result<Option<String>, CredentialError> {
        let entry = self.entry()?;
        match entry.get_password() {
            Ok(token) => Ok(Some(token)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => {
                log::warn!("Keychain read failed for {}: {}", self.service, e);
                Err(CredentialError::from(e))
            }
        }
    }

    fn delete(&self) -> StoreOutcome {
        let entry = match self.entry() {
            Ok(entry) => entry,
            Err(e) => {
                log::error!("Keychain delete failed for {}: {}", self.service, e);
                return StoreOutcome::NotPersisted {
                    reason: e.to_string(),
                };
            }
        };
        match entry.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => StoreOutcome::Persisted,
            Err(e) => {
                log::error!("Keychain delete failed for {}: {}", self.service, e);
                StoreOutcome::NotPersisted {
                    reason: e.to_string(),
                }
            }
        }
    }
}

/// In-process store. The previous token is wiped from memory whenever it is
/// replaced or deleted.
#[derive(Default)]
pub struct MemoryStore {
    slot: Mutex<Option<Zeroizing<String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: &str) -> Self {
        Self {
            slot: Mutex::new(Some(Zeroizing::new(token.to_string()))),
        }
    }
}

impl CredentialStore for MemoryStore {
    fn store(&self, token: &str) -> StoreOutcome {
        if token.trim().is_empty() {
            return refuse_empty();
        }
        match self.slot.lock() {
            Ok(mut slot) => {
                *slot = Some(Zeroizing::new(token.to_string()));
                StoreOutcome::Persisted
            }
            Err(e) => {
                log::error!("Memory credential store poisoned: {}", e);
                StoreOutcome::NotPersisted {
                    reason: e.to_string(),
                }
            }
        }
    }

    fn get(&self) -> Result<Option<String>, CredentialError> {
        let slot = self
            .slot
            .lock()
            .map_err(|e| CredentialError::Unavailable(e.to_string()))?;
        Ok(slot.as_ref().map(|t| t.to_string()))
    }

    fn delete(&self) -> StoreOutcome {
        match self.slot.lock() {
            Ok(mut slot) => {
                *slot = None;
                StoreOutcome::Persisted
            }
            Err(e) => {
                log::error!("Memory credential store poisoned: {}", e);
                StoreOutcome::NotPersisted {
                    reason: e.to_string(),
                }
            }
        }
    }
}

fn refuse_empty() -> StoreOutcome {
    log::warn!("Refusing to store an empty credential");
    StoreOutcome::NotPersisted {
        reason: "empty credential".to_string(),
    }
}
