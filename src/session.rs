//! The signed-in state, derived from credential storage.
//!
//! There is no separate "is authenticated" flag anywhere in the crate. Every
//! question about the session is answered by reading the `CredentialStore`,
//! so UI state cannot drift from what is actually stored.

use std::fmt;
use std::sync::Arc;

use base64::Engine;
use serde::Deserialize;
use zeroize::Zeroizing;

use crate::api::credentials::{CredentialError, CredentialStore, StoreOutcome};

/// Handle to the session, cheap to clone and share between components.
#[derive(Clone)]
pub struct Session {
    store: Arc<dyn CredentialStore>,
}

/// The session as seen at one point in time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CurrentSession {
    Authenticated(SessionToken),
    Anonymous,
}

impl CurrentSession {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, CurrentSession::Authenticated(_))
    }

    pub fn token(&self) -> Option<&SessionToken> {
        match self {
            CurrentSession::Authenticated(token) => Some(token),
            CurrentSession::Anonymous => None,
        }
    }
}

/// Outcome of ending the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogoutOutcome {
    /// The credential was deleted and a follow-up read confirmed it is gone.
    LoggedOut,
    /// The follow-up read still found a credential.
    CredentialLingers,
    /// The delete or the follow-up read failed.
    Unconfirmed { reason: String },
}

impl Session {
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn CredentialStore> {
        &self.store
    }

    /// Re-read the stored credential.
    pub fn current(&self) -> Result<CurrentSession, CredentialError> {
        Ok(match self.store.get()? {
            Some(token) if !token.trim().is_empty() => {
                CurrentSession::Authenticated(SessionToken::new(token))
            }
            _ => CurrentSession::Anonymous,
        })
    }

    /// Persist a freshly issued credential.
    pub fn establish(&self, token: &str) -> StoreOutcome {
        let outcome = self.store.store(token);
        match &outcome {
            StoreOutcome::Persisted => {
                let who = SessionToken::new(token.to_string())
                    .claims()
                    .and_then(|c| c.subject().map(str::to_string))
                    .unwrap_or_else(|| "unknown user".to_string());
                log::info!("Session established for {}", who);
            }
            StoreOutcome::NotPersisted { reason } => {
                log::warn!("Session credential not persisted: {}", reason);
            }
        }
        outcome
    }

    /// Delete the credential and confirm with a fresh read that it is gone.
    pub fn end(&self) -> LogoutOutcome {
        if let StoreOutcome::NotPersisted { reason } = self.store.delete() {
            log::warn!("Credential delete failed: {}", reason);
        }
        match self.store.get() {
            Ok(None) => {
                log::info!("Logout complete");
                LogoutOutcome::LoggedOut
            }
            Ok(Some(_)) => {
                log::error!("Credential still present after delete");
                LogoutOutcome::CredentialLingers
            }
            Err(e) => {
                log::warn!("Could not confirm logout: {}", e);
                LogoutOutcome::Unconfirmed {
                    reason: e.to_string(),
                }
            }
        }
    }

    /// End the session only if `rejected` is still the stored credential.
    ///
    /// Returns `None` when a different credential (or none) is stored, or
    /// when the store cannot be read; the stored state is left alone then.
    pub fn end_if_current(&self, rejected: &SessionToken) -> Option<LogoutOutcome> {
        match self.current() {
            Ok(CurrentSession::Authenticated(stored)) if stored == *rejected => Some(self.end()),
            Ok(_) => None,
            Err(e) => {
                log::warn!("Could not compare rejected credential with the stored one: {}", e);
                None
            }
        }
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session").finish_non_exhaustive()
    }
}

/// An opaque bearer credential. Wiped from memory on drop and never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionToken(Zeroizing<String>);

impl SessionToken {
    pub fn new(token: String) -> Self {
        Self(Zeroizing::new(token))
    }

    pub fn expose(&self) -> &str {
        self.0.as_str()
    }

    /// Best-effort decode of the JWT payload. Informational only: the server
    /// is the authority on whether the token is valid.
    pub fn claims(&self) -> Option<TokenClaims> {
        decode_claims(self.expose())
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionToken(<redacted>)")
    }
}

/// Claims commonly found in the backend's tokens.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct TokenClaims {
    pub sub: Option<String>,
    #[serde(rename = "_id")]
    pub object_id: Option<String>,
    pub id: Option<String>,
    pub username: Option<String>,
    pub exp: Option<u64>,
}

impl TokenClaims {
    /// The user identifier, whichever claim carries it.
    pub fn subject(&self) -> Option<&str> {
        self.sub
            .as_deref()
            .or(self.object_id.as_deref())
            .or(self.id.as_deref())
            .or(self.username.as_deref())
    }
}

fn decode_claims(token: &str) -> Option<TokenClaims> {
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        return None;
    }
    let payload = parts[1].trim_end_matches('=');
    let decoded = base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(payload)
        .ok()?;
    serde_json::from_slice(&decoded).ok()
}
