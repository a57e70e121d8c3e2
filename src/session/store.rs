//! Credential storage
//!
//! The bearer credential is short-lived and stored with an expiry so it never
//! outlives its validity window. The renewal credential has no expiry.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::SessionError;

/// Which credential a store operation refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CredentialKind {
    /// Short-lived access token attached to every request
    Bearer,
    /// Long-lived token exchanged for a new bearer
    Renewal,
}

/// Read/write access to the session credentials
///
/// Writers replace whole values; there is no partial mutation, so
/// "last write wins" is the only consistency rule.
pub trait CredentialStore: Send + Sync {
    /// Current value, `None` when missing or (for bearer) expired
    fn get(&self, kind: CredentialKind) -> Option<String>;

    /// Replace a credential. `ttl` only applies to the bearer credential.
    fn set(&self, kind: CredentialKind, value: String, ttl: Option<Duration>);

    /// Remove a credential
    fn clear(&self, kind: CredentialKind);
}

#[derive(Debug, Clone)]
struct BearerEntry {
    value: String,
    expires_at: Option<DateTime<Utc>>,
}

impl BearerEntry {
    fn is_live(&self) -> bool {
        match self.expires_at {
            Some(expires_at) => Utc::now() < expires_at,
            None => true,
        }
    }
}

#[derive(Debug, Default)]
struct Slots {
    bearer: Option<BearerEntry>,
    renewal: Option<String>,
}

fn read_slots(lock: &RwLock<Slots>) -> RwLockReadGuard<'_, Slots> {
    lock.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn write_slots(lock: &RwLock<Slots>) -> RwLockWriteGuard<'_, Slots> {
    lock.write().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn get_slot(slots: &Slots, kind: CredentialKind) -> Option<String> {
    match kind {
        CredentialKind::Bearer => slots
            .bearer
            .as_ref()
            .filter(|entry| entry.is_live())
            .map(|entry| entry.value.clone()),
        CredentialKind::Renewal => slots.renewal.clone(),
    }
}

fn set_slot(slots: &mut Slots, kind: CredentialKind, value: String, ttl: Option<Duration>) {
    match kind {
        CredentialKind::Bearer => {
            slots.bearer = Some(BearerEntry {
                value,
                expires_at: ttl.map(|ttl| {
                    Utc::now()
                        .checked_add_signed(ttl)
                        .unwrap_or(DateTime::<Utc>::MAX_UTC)
                }),
            });
        }
        CredentialKind::Renewal => slots.renewal = Some(value),
    }
}

fn clear_slot(slots: &mut Slots, kind: CredentialKind) {
    match kind {
        CredentialKind::Bearer => slots.bearer = None,
        CredentialKind::Renewal => slots.renewal = None,
    }
}

/// Process-local credential store
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    slots: RwLock<Slots>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn get(&self, kind: CredentialKind) -> Option<String> {
        get_slot(&read_slots(&self.slots), kind)
    }

    fn set(&self, kind: CredentialKind, value: String, ttl: Option<Duration>) {
        set_slot(&mut write_slots(&self.slots), kind, value, ttl);
    }

    fn clear(&self, kind: CredentialKind) {
        clear_slot(&mut write_slots(&self.slots), kind);
    }
}

/// On-disk shape of a session
#[derive(Debug, Default, Serialize, Deserialize)]
struct PersistedSession {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    access_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    access_expires_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    refresh_token: Option<String>,
}

impl PersistedSession {
    fn from_slots(slots: &Slots) -> Self {
        Self {
            access_token: slots.bearer.as_ref().map(|entry| entry.value.clone()),
            access_expires_at: slots.bearer.as_ref().and_then(|entry| entry.expires_at),
            refresh_token: slots.renewal.clone(),
        }
    }

    fn into_slots(self) -> Slots {
        Slots {
            bearer: self.access_token.map(|value| BearerEntry {
                value,
                expires_at: self.access_expires_at,
            }),
            renewal: self.refresh_token,
        }
    }
}

/// Credential store that persists both credentials to a JSON file
///
/// The bearer is written with its absolute expiry, so a bearer loaded
/// after it lapsed reads as `None`. A failed write is logged; the
/// in-memory value is still updated.
#[derive(Debug)]
pub struct FileCredentialStore {
    path: PathBuf,
    slots: RwLock<Slots>,
}

impl FileCredentialStore {
    /// Open a store backed by `path`, loading previously saved credentials
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, SessionError> {
        let path = path.into();
        let mut slots = Slots::default();

        if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            if !content.trim().is_empty() {
                let persisted: PersistedSession = serde_json::from_str(&content)
                    .map_err(|e| SessionError::Serialization(e.to_string()))?;
                slots = persisted.into_slots();
            }
        }

        tracing::debug!(
            path = ?path,
            has_bearer = get_slot(&slots, CredentialKind::Bearer).is_some(),
            has_renewal = slots.renewal.is_some(),
            "Opened credential file"
        );

        Ok(Self {
            path,
            slots: RwLock::new(slots),
        })
    }

    /// Location of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, persisted: PersistedSession) {
        let result = serde_json::to_string_pretty(&persisted)
            .map_err(|e| SessionError::Serialization(e.to_string()))
            .and_then(|json| {
                if let Some(parent) = self.path.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                std::fs::write(&self.path, json)?;
                Ok(())
            });

        if let Err(e) = result {
            tracing::warn!(path = ?self.path, error = %e, "Failed to persist credentials");
        }
    }
}

impl CredentialStore for FileCredentialStore {
    fn get(&self, kind: CredentialKind) -> Option<String> {
        get_slot(&read_slots(&self.slots), kind)
    }

    fn set(&self, kind: CredentialKind, value: String, ttl: Option<Duration>) {
        let persisted = {
            let mut slots = write_slots(&self.slots);
            set_slot(&mut slots, kind, value, ttl);
            PersistedSession::from_slots(&slots)
        };
        self.persist(persisted);
    }

    fn clear(&self, kind: CredentialKind) {
        let persisted = {
            let mut slots = write_slots(&self.slots);
            clear_slot(&mut slots, kind);
            PersistedSession::from_slots(&slots)
        };
        self.persist(persisted);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_credentials_read_as_none() {
        let store = MemoryCredentialStore::new();
        assert!(store.get(CredentialKind::Bearer).is_none());
        assert!(store.get(CredentialKind::Renewal).is_none());
    }

    #[test]
    fn test_bearer_within_ttl() {
        let store = MemoryCredentialStore::new();
        store.set(
            CredentialKind::Bearer,
            "abc".to_string(),
            Some(Duration::minutes(15)),
        );
        assert_eq!(store.get(CredentialKind::Bearer).as_deref(), Some("abc"));
    }

    #[test]
    fn test_expired_bearer_reads_as_none() {
        let store = MemoryCredentialStore::new();
        store.set(CredentialKind::Bearer, "abc".to_string(), Some(Duration::zero()));
        assert!(store.get(CredentialKind::Bearer).is_none());
    }

    #[test]
    fn test_renewal_ignores_ttl() {
        let store = MemoryCredentialStore::new();
        store.set(
            CredentialKind::Renewal,
            "refresh".to_string(),
            Some(Duration::zero()),
        );
        assert_eq!(store.get(CredentialKind::Renewal).as_deref(), Some("refresh"));
    }

    #[test]
    fn test_last_write_wins() {
        let store = MemoryCredentialStore::new();
        store.set(CredentialKind::Bearer, "one".to_string(), None);
        store.set(CredentialKind::Bearer, "two".to_string(), None);
        assert_eq!(store.get(CredentialKind::Bearer).as_deref(), Some("two"));

        store.clear(CredentialKind::Bearer);
        assert!(store.get(CredentialKind::Bearer).is_none());
    }

    #[test]
    fn test_huge_ttl_does_not_overflow() {
        let store = MemoryCredentialStore::new();
        store.set(
            CredentialKind::Bearer,
            "abc".to_string(),
            Some(Duration::days(365 * 1_000_000)),
        );
        assert_eq!(store.get(CredentialKind::Bearer).as_deref(), Some("abc"));
    }

    #[test]
    fn test_file_store_persists_both_credentials() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("session.json");

        {
            let store = FileCredentialStore::open(&path).unwrap();
            store.set(
                CredentialKind::Bearer,
                "bearer".to_string(),
                Some(Duration::minutes(15)),
            );
            store.set(CredentialKind::Renewal, "refresh".to_string(), None);
        }

        let reopened = FileCredentialStore::open(&path).unwrap();
        assert_eq!(reopened.get(CredentialKind::Bearer).as_deref(), Some("bearer"));
        assert_eq!(reopened.get(CredentialKind::Renewal).as_deref(), Some("refresh"));

        let saved: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert!(saved["access_expires_at"].is_string());

        reopened.clear(CredentialKind::Renewal);
        reopened.clear(CredentialKind::Bearer);
        let cleared = FileCredentialStore::open(&path).unwrap();
        assert!(cleared.get(CredentialKind::Renewal).is_none());
        assert!(cleared.get(CredentialKind::Bearer).is_none());
    }

    #[test]
    fn test_file_store_bearer_without_renewal_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");

        FileCredentialStore::open(&path).unwrap().set(
            CredentialKind::Bearer,
            "from-login".to_string(),
            Some(Duration::hours(1)),
        );

        let reopened = FileCredentialStore::open(&path).unwrap();
        assert_eq!(reopened.get(CredentialKind::Bearer).as_deref(), Some("from-login"));
        assert!(reopened.get(CredentialKind::Renewal).is_none());
    }

    #[test]
    fn test_file_store_expired_bearer_reads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(
            &path,
            r#"{"access_token":"old","access_expires_at":"2000-01-01T00:00:00Z","refresh_token":"refresh"}"#,
        )
        .unwrap();

        let store = FileCredentialStore::open(&path).unwrap();
        assert!(store.get(CredentialKind::Bearer).is_none());
        assert_eq!(store.get(CredentialKind::Renewal).as_deref(), Some("refresh"));
    }

    #[test]
    fn test_file_store_rejects_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, "not json").unwrap();

        let err = FileCredentialStore::open(&path).unwrap_err();
        assert!(matches!(err, SessionError::Serialization(_)));
    }
}
