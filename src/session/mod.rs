//! Session Context
//!
//! Explicit owner of the credential lifecycle. A session is initialized on
//! sign-in, read by the request client, updated by token renewal and torn
//! down on sign-out.
//!
//! ## Credentials
//!
//! - **Bearer**: short-lived (about 15 minutes), attached to every request
//! - **Renewal**: long-lived, exchanged for a new bearer via `auth/refresh`

mod store;

pub use store::{CredentialKind, CredentialStore, FileCredentialStore, MemoryCredentialStore};

use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

/// Default bearer lifetime in seconds
pub const DEFAULT_BEARER_TTL_SECS: u64 = 15 * 60;

/// Longest bearer lifetime honored; longer hints are clamped to this
pub const MAX_BEARER_TTL_SECS: u64 = 365 * 24 * 60 * 60;

/// Snapshot of the session credentials
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    pub bearer_token: Option<String>,
    pub renewal_token: Option<String>,
    pub bearer_expiry_hint_seconds: u64,
}

impl Credential {
    /// Credential pair as returned by a successful sign-in
    pub fn new(bearer_token: impl Into<String>, renewal_token: Option<String>) -> Self {
        Self {
            bearer_token: Some(bearer_token.into()),
            renewal_token,
            bearer_expiry_hint_seconds: DEFAULT_BEARER_TTL_SECS,
        }
    }

    /// Builder method: set the bearer lifetime
    pub fn expires_in(mut self, seconds: u64) -> Self {
        self.bearer_expiry_hint_seconds = seconds;
        self
    }
}

/// Shared handle on the session credentials
#[derive(Clone)]
pub struct SessionContext {
    store: Arc<dyn CredentialStore>,
    bearer_ttl_secs: u64,
}

impl std::fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionContext")
            .field("bearer_ttl_secs", &self.bearer_ttl_secs)
            .field("has_bearer", &self.bearer().is_some())
            .field("has_renewal", &self.renewal().is_some())
            .finish()
    }
}

impl Default for SessionContext {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl SessionContext {
    /// Create a session over an existing credential store
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        Self {
            store,
            bearer_ttl_secs: DEFAULT_BEARER_TTL_SECS,
        }
    }

    /// Session backed by process memory only
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryCredentialStore::new()))
    }

    /// Builder method: default bearer lifetime when the server gives none
    pub fn with_bearer_ttl(mut self, seconds: u64) -> Self {
        self.bearer_ttl_secs = seconds;
        self
    }

    /// Default bearer lifetime in seconds
    pub fn bearer_ttl_secs(&self) -> u64 {
        self.bearer_ttl_secs
    }

    /// Current bearer credential, if present and not expired
    pub fn bearer(&self) -> Option<String> {
        self.store.get(CredentialKind::Bearer)
    }

    /// Current renewal credential
    pub fn renewal(&self) -> Option<String> {
        self.store.get(CredentialKind::Renewal)
    }

    /// Snapshot of both credentials
    pub fn credential(&self) -> Credential {
        Credential {
            bearer_token: self.bearer(),
            renewal_token: self.renewal(),
            bearer_expiry_hint_seconds: self.bearer_ttl_secs,
        }
    }

    /// Store a freshly issued credential pair.
    ///
    /// The renewal credential is only replaced when one is present, so a
    /// refresh response without a rotated token keeps the existing one.
    /// The bearer lifetime is clamped to [`MAX_BEARER_TTL_SECS`].
    pub fn store(&self, credential: &Credential) {
        if let Some(bearer) = &credential.bearer_token {
            let secs = credential.bearer_expiry_hint_seconds.min(MAX_BEARER_TTL_SECS);
            let ttl = i64::try_from(secs).ok().and_then(Duration::try_seconds);
            self.store.set(CredentialKind::Bearer, bearer.clone(), ttl);
        }
        if let Some(renewal) = &credential.renewal_token {
            self.store.set(CredentialKind::Renewal, renewal.clone(), None);
        }
    }

    /// Initialize the session after a successful sign-in
    pub fn sign_in(&self, credential: &Credential) {
        self.store(credential);
        tracing::info!(
            has_renewal = credential.renewal_token.is_some(),
            "Session started"
        );
    }

    /// Tear down the session, dropping both credentials
    pub fn sign_out(&self) {
        self.store.clear(CredentialKind::Bearer);
        self.store.clear(CredentialKind::Renewal);
        tracing::info!("Session ended");
    }
}

/// Errors raised while loading persisted session state
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}
