//! Session token ownership and persistence.
//!
//! [`SessionStore`] is the single owner of the access token.  Every consumer
//! holds a cheap clone and reads the token lazily with [`SessionStore::get`]
//! at the moment it needs it, so nobody caches a stale "am I logged in".
//!
//! Changes are broadcast on a [`tokio::sync::watch`] channel (see
//! [`SessionStore::subscribe`]) and written through to a [`SessionBackend`].
//! Backend writes are best-effort: a failed write is logged and the
//! in-memory value stays authoritative for the rest of the process.
//!
//! ## For contributors
//!
//! To persist somewhere else (keyring, database, ...), implement
//! [`SessionBackend`] and pass it to [`SessionStore::open`].

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::watch;

/// Fixed namespace of the persisted record.
pub const NAMESPACE: &str = "auth-storage";

/// Errors raised by a [`SessionBackend`].
///
/// These never escape [`SessionStore`]; they only reach the log.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// The durable record layout: `{"accessToken": <string|null>}`.
#[derive(Debug, Default, Serialize, Deserialize)]
struct PersistedSession {
    #[serde(rename = "accessToken", default)]
    access_token: Option<String>,
}

/// Durable storage for the session record.
pub trait SessionBackend: Send + Sync {
    /// Read the persisted token.  Absent or unreadable records are `None`.
    fn load(&self) -> Option<String>;

    /// Persist the current token (`None` for anonymous).
    fn save(&self, token: Option<&str>) -> Result<(), SessionError>;
}

// ---------------------------------------------------------------------------
// File backend
// ---------------------------------------------------------------------------

/// Stores the record as `<dir>/auth-storage.json`.
///
/// Writes go to a temporary sibling first and are renamed into place, so a
/// crash mid-write never leaves a truncated record behind.
pub struct FileBackend {
    path: PathBuf,
}

impl FileBackend {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            path: dir.as_ref().join(format!("{NAMESPACE}.json")),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionBackend for FileBackend {
    fn load(&self) -> Option<String> {
        let contents = fs::read_to_string(&self.path).ok()?;
        match serde_json::from_str::<PersistedSession>(&contents) {
            Ok(record) => record.access_token,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "ignoring malformed session record");
                None
            }
        }
    }

    fn save(&self, token: Option<&str>) -> Result<(), SessionError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let record = PersistedSession {
            access_token: token.map(String::from),
        };
        let json = serde_json::to_string(&record)?;

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Memory backend
// ---------------------------------------------------------------------------

/// Keeps the record in memory only.  Used by `--ephemeral` and in tests.
#[derive(Default)]
pub struct MemoryBackend {
    record: Mutex<Option<String>>,
}

impl SessionBackend for MemoryBackend {
    fn load(&self) -> Option<String> {
        self.record.lock().ok()?.clone()
    }

    fn save(&self, token: Option<&str>) -> Result<(), SessionError> {
        if let Ok(mut record) = self.record.lock() {
            *record = token.map(String::from);
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

struct Inner {
    token: watch::Sender<Option<String>>,
    backend: Box<dyn SessionBackend>,
}

/// Shared handle to the session token.  Clones refer to the same session.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<Inner>,
}

impl SessionStore {
    /// Create a store hydrated from `backend`.
    pub fn open(backend: impl SessionBackend + 'static) -> Self {
        let restored = backend.load();
        tracing::debug!(restored = restored.is_some(), "session store opened");
        let (token, _) = watch::channel(restored);
        Self {
            inner: Arc::new(Inner {
                token,
                backend: Box::new(backend),
            }),
        }
    }

    /// An anonymous store that persists nothing.
    pub fn in_memory() -> Self {
        Self::open(MemoryBackend::default())
    }

    /// The current token, `None` when anonymous.
    pub fn get(&self) -> Option<String> {
        self.inner.token.borrow().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.inner.token.borrow().is_some()
    }

    pub fn set(&self, token: impl Into<String>) {
        let token = token.into();
        self.inner.token.send_replace(Some(token));
        self.persist();
        tracing::info!("session established");
    }

    /// Drop the token.  Returns `false` if the session was already anonymous,
    /// in which case nothing is persisted and nobody is notified.
    pub fn clear(&self) -> bool {
        let changed = self.inner.token.send_if_modified(|token| token.take().is_some());
        if changed {
            self.persist();
            tracing::info!("session cleared");
        }
        changed
    }

    /// Subscribe to token changes.
    pub fn subscribe(&self) -> watch::Receiver<Option<String>> {
        self.inner.token.subscribe()
    }

    fn persist(&self) {
        let token = self.get();
        if let Err(e) = self.inner.backend.save(token.as_deref()) {
            tracing::warn!(error = %e, "failed to persist session, keeping in-memory state");
        }
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("authenticated", &self.is_authenticated())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    /// A backend whose writes always fail.
    struct BrokenBackend;

    impl SessionBackend for BrokenBackend {
        fn load(&self) -> Option<String> {
            None
        }

        fn save(&self, _token: Option<&str>) -> Result<(), SessionError> {
            Err(SessionError::Io(std::io::Error::other("quota exceeded")))
        }
    }

    #[test]
    fn starts_anonymous() {
        let store = SessionStore::in_memory();
        assert!(store.get().is_none());
        assert!(!store.is_authenticated());
    }

    #[test]
    fn set_then_clear() {
        let store = SessionStore::in_memory();
        store.set("tok");
        assert_eq!(store.get().as_deref(), Some("tok"));

        assert!(store.clear());
        assert!(store.get().is_none());
    }

    #[test]
    fn clear_is_idempotent() {
        let store = SessionStore::in_memory();
        store.set("tok");
        assert!(store.clear());
        assert!(!store.clear(), "second clear should change nothing");
        assert!(!store.clear());
    }

    #[test]
    fn clones_share_the_session() {
        let a = SessionStore::in_memory();
        let b = a.clone();
        a.set("shared");
        assert_eq!(b.get().as_deref(), Some("shared"));
        b.clear();
        assert!(a.get().is_none());
    }

    #[test]
    fn hydrates_from_backend() {
        let backend = MemoryBackend::default();
        backend.save(Some("restored")).unwrap();
        let store = SessionStore::open(backend);
        assert_eq!(store.get().as_deref(), Some("restored"));
    }

    #[test]
    fn subscribers_see_changes() {
        let store = SessionStore::in_memory();
        let mut rx = store.subscribe();
        assert!(!rx.has_changed().unwrap());

        store.set("tok");
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().as_deref(), Some("tok"));

        store.clear();
        assert!(rx.has_changed().unwrap());
        assert!(rx.borrow_and_update().is_none());
    }

    #[test]
    fn redundant_clear_does_not_notify() {
        let store = SessionStore::in_memory();
        let mut rx = store.subscribe();
        store.clear();
        assert!(!rx.has_changed().unwrap());
        assert!(rx.borrow_and_update().is_none());
    }

    #[test]
    fn backend_failures_are_swallowed() {
        let store = SessionStore::open(BrokenBackend);
        store.set("tok");
        assert_eq!(store.get().as_deref(), Some("tok"), "in-memory state stays authoritative");
        assert!(store.clear());
        assert!(store.get().is_none());
    }

    // -- file backend --------------------------------------------------------

    #[test]
    fn file_backend_round_trips_across_stores() {
        let dir = TempDir::new().unwrap();

        let first = SessionStore::open(FileBackend::new(dir.path()));
        first.set("persisted");
        drop(first);

        let second = SessionStore::open(FileBackend::new(dir.path()));
        assert_eq!(second.get().as_deref(), Some("persisted"));
    }

    #[test]
    fn file_backend_writes_access_token_record() {
        let dir = TempDir::new().unwrap();
        let backend = FileBackend::new(dir.path());
        let path = backend.path().to_path_buf();
        let store = SessionStore::open(backend);

        store.set("abc");
        let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["accessToken"], "abc");

        store.clear();
        let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert!(json["accessToken"].is_null());
    }

    #[test]
    fn file_backend_ignores_malformed_record() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("auth-storage.json"), "not json").unwrap();

        let store = SessionStore::open(FileBackend::new(dir.path()));
        assert!(store.get().is_none());
    }

    #[test]
    fn file_backend_missing_file_is_anonymous() {
        let dir = TempDir::new().unwrap();
        let store = SessionStore::open(FileBackend::new(dir.path().join("nested")));
        assert!(store.get().is_none());
    }

    #[test]
    fn file_backend_unwritable_dir_does_not_panic() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "a file, not a directory").unwrap();

        let store = SessionStore::open(FileBackend::new(&blocker));
        store.set("tok");
        assert_eq!(store.get().as_deref(), Some("tok"));
    }
}
