#![warn(missing_docs)]
//! # guardian-neuro-session
//!
//! ## Purpose
//! Persists the demo session (authenticated flag and request counter) across
//! process restarts.
//!
//! ## Responsibilities
//! - Abstract durable string storage behind [`KeyValueStore`].
//! - Provide a JSON-file backend and an in-memory backend.
//! - Expose the typed session contract through [`SessionStore`].
//!
//! ## Data flow
//! Auth gate and shell hold a shared [`SessionStore`] -> typed getters/setters
//! -> [`KeyValueStore`] -> `session.json` (or memory).
//!
//! ## Ownership and lifetimes
//! The store is shared behind `Arc`; backends use interior mutability so
//! callers never need `&mut` access.
//!
//! ## Error model
//! Reads never fail: absent, unreadable, or corrupt values fall back to
//! defaults. Writes return [`StoreError`].
//!
//! ## Consistency notes
//! Every operation is a read-modify-write of the whole backing file without
//! cross-process locking. Two shells running at once can race on the counter.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use guardian_neuro_session::{MemoryKeyValueStore, SessionStore};
//!
//! let store = SessionStore::new(Arc::new(MemoryKeyValueStore::new()));
//! assert_eq!(store.request_count(), 0);
//! assert_eq!(store.increment_request_count().unwrap(), 1);
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use thiserror::Error;

/// Storage key for the authenticated flag.
pub const AUTH_KEY: &str = "guardianneuro_auth";

/// Storage key for the request counter.
pub const REQUEST_COUNT_KEY: &str = "guardianneuro_requests";

/// File name used by [`FileKeyValueStore::in_dir`].
pub const SESSION_FILE_NAME: &str = "session.json";

/// Durable string key/value storage.
pub trait KeyValueStore: Send + Sync {
    /// Returns the stored value, or `None` when absent or unreadable.
    fn get(&self, key: &str) -> Option<String>;

    /// Stores `value` under `key`.
    ///
    /// # Errors
    /// Returns [`StoreError`] when the backing storage cannot be written.
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Removes `key`; removing an absent key is not an error.
    ///
    /// # Errors
    /// Returns [`StoreError`] when the backing storage cannot be written.
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// Process-local backend for tests and throwaway sessions.
#[derive(Debug, Default)]
pub struct MemoryKeyValueStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryKeyValueStore {
    /// Creates an empty memory store.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, BTreeMap<String, String>>, StoreError> {
        self.entries
            .lock()
            .map_err(|_| StoreError::Poisoned)
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    fn get(&self, key: &str) -> Option<String> {
        self.lock().ok()?.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.lock()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.lock()?.remove(key);
        Ok(())
    }
}

/// JSON-object file backend.
///
/// The file is re-read on every access so that values written by another
/// process are observed, and rewritten through a sibling temp file.
#[derive(Debug)]
pub struct FileKeyValueStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileKeyValueStore {
    /// Creates a backend for an explicit file path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Creates a backend for `dir/session.json`.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self::new(dir.as_ref().join(SESSION_FILE_NAME))
    }

    /// Returns the backing file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_entries(&self) -> BTreeMap<String, String> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(error) if error.kind() == io::ErrorKind::NotFound => return BTreeMap::new(),
            Err(error) => {
                tracing::warn!(path = %self.path.display(), %error, "session file unreadable");
                return BTreeMap::new();
            }
        };

        match serde_json::from_str::<BTreeMap<String, serde_json::Value>>(&raw) {
            Ok(map) => map
                .into_iter()
                .filter_map(|(key, value)| match value {
                    serde_json::Value::String(text) => Some((key, text)),
                    _ => None,
                })
                .collect(),
            Err(error) => {
                tracing::warn!(path = %self.path.display(), %error, "session file corrupt");
                BTreeMap::new()
            }
        }
    }

    fn write_entries(&self, entries: &BTreeMap<String, String>) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|source| StoreError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let encoded = serde_json::to_vec_pretty(entries).map_err(StoreError::Codec)?;
        let staging = self.path.with_extension("json.tmp");
        fs::write(&staging, encoded).map_err(|source| StoreError::Io {
            path: staging.clone(),
            source,
        })?;
        fs::rename(&staging, &self.path).map_err(|source| StoreError::Io {
            path: self.path.clone(),
            source,
        })
    }

    fn update<F>(&self, mutate: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut BTreeMap<String, String>),
    {
        let _guard = self.write_lock.lock().map_err(|_| StoreError::Poisoned)?;
        let mut entries = self.read_entries();
        mutate(&mut entries);
        self.write_entries(&entries)
    }
}

impl KeyValueStore for FileKeyValueStore {
    fn get(&self, key: &str) -> Option<String> {
        self.read_entries().remove(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.update(|entries| {
            entries.insert(key.to_string(), value.to_string());
        })
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.update(|entries| {
            entries.remove(key);
        })
    }
}

/// Typed session contract over a [`KeyValueStore`].
#[derive(Clone)]
pub struct SessionStore {
    backend: Arc<dyn KeyValueStore>,
}

impl SessionStore {
    /// Wraps a storage backend.
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self { backend }
    }

    /// Creates a session store backed by an empty in-memory map.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryKeyValueStore::new()))
    }

    /// Returns `true` only when the flag is stored as exactly `"true"`.
    pub fn is_authenticated(&self) -> bool {
        self.backend.get(AUTH_KEY).as_deref() == Some("true")
    }

    /// Sets or clears the authenticated flag.
    ///
    /// Clearing removes the key instead of storing `"false"`.
    ///
    /// # Errors
    /// Propagates backend write failures.
    pub fn set_authenticated(&self, authenticated: bool) -> Result<(), StoreError> {
        if authenticated {
            self.backend.set(AUTH_KEY, "true")
        } else {
            self.backend.remove(AUTH_KEY)
        }
    }

    /// Returns the stored request count, or 0 when absent or unparsable.
    pub fn request_count(&self) -> u32 {
        self.backend
            .get(REQUEST_COUNT_KEY)
            .map(|raw| parse_count(&raw))
            .unwrap_or(0)
    }

    /// Adds one to the stored count and returns the new value.
    ///
    /// # Errors
    /// Propagates backend write failures; the count is unchanged on error.
    pub fn increment_request_count(&self) -> Result<u32, StoreError> {
        let next = self.request_count().saturating_add(1);
        self.backend.set(REQUEST_COUNT_KEY, &next.to_string())?;
        Ok(next)
    }

    /// Clears the stored count back to absent (reads as 0).
    ///
    /// # Errors
    /// Propagates backend write failures.
    pub fn reset_request_count(&self) -> Result<(), StoreError> {
        self.backend.remove(REQUEST_COUNT_KEY)
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("authenticated", &self.is_authenticated())
            .field("request_count", &self.request_count())
            .finish()
    }
}

fn parse_count(raw: &str) -> u32 {
    raw.trim().parse::<u32>().unwrap_or(0)
}

/// Session storage errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Backing file could not be written.
    #[error("session storage i/o failure at {path}: {source}")]
    Io {
        /// Path being written.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// Session map could not be encoded.
    #[error("session storage codec failure: {0}")]
    Codec(#[from] serde_json::Error),
    /// Backend lock was poisoned by a panicking writer.
    #[error("session storage lock poisoned")]
    Poisoned,
}
