//! Access/refresh token holder with a durable backing store.
//!
//! The in-memory copy is authoritative once loaded. On the first read after
//! a restart each slot falls back to the [`TokenStorage`] it was persisted to.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::auth::TokenResponse;
use crate::errors::StorageError;

pub const ACCESS_TOKEN_KEY: &str = "taskboard.access_token";
pub const REFRESH_TOKEN_KEY: &str = "taskboard.refresh_token";
pub const EXPIRES_AT_KEY: &str = "taskboard.token_expires_at";

/// Durable key/value storage for tokens.
pub trait TokenStorage: Send + Sync {
    fn load(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn store(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Process-local storage; nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn values(&self) -> MutexGuard<'_, HashMap<String, String>> {
        self.values.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl TokenStorage for MemoryStorage {
    fn load(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.values().get(key).cloned())
    }

    fn store(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.values().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.values().remove(key);
        Ok(())
    }
}

/// JSON object on disk, one entry per key. Writes go through a temp file
/// and a rename so a crash never leaves a half-written session.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// `<data dir>/taskboard/session.json`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::data_local_dir().map(|d| d.join("taskboard").join("session.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<HashMap<String, String>, StorageError> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) if content.trim().is_empty() => Ok(HashMap::new()),
            Ok(content) => serde_json::from_str(&content).map_err(|source| StorageError::Corrupt {
                path: self.path.clone(),
                source,
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HashMap::new()),
            Err(source) => Err(StorageError::Io {
                path: self.path.clone(),
                source,
            }),
        }
    }

    fn write_all(&self, values: &HashMap<String, String>) -> Result<(), StorageError> {
        let io_err = |source| StorageError::Io {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        let content = serde_json::to_string_pretty(values).map_err(|source| {
            StorageError::Corrupt {
                path: self.path.clone(),
                source,
            }
        })?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, content).map_err(io_err)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&tmp, std::fs::Permissions::from_mode(0o600))
                .map_err(io_err)?;
        }
        std::fs::rename(&tmp, &self.path).map_err(io_err)
    }

    fn update(&self, f: impl FnOnce(&mut HashMap<String, String>)) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        // A corrupt file is replaced rather than blocking every later write.
        let mut values = self.read_all().unwrap_or_default();
        f(&mut values);
        self.write_all(&values)
    }
}

impl TokenStorage for FileStorage {
    fn load(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.read_all()?.remove(key))
    }

    fn store(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.update(|values| {
            values.insert(key.to_string(), value.to_string());
        })
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.update(|values| {
            values.remove(key);
        })
    }
}

/// `issued_at + secs`, or `None` when the lifetime cannot be represented.
fn expiry_after(issued_at: DateTime<Utc>, secs: u64) -> Option<DateTime<Utc>> {
    let secs = i64::try_from(secs).ok()?;
    issued_at.checked_add_signed(chrono::Duration::try_seconds(secs)?)
}

/// A slot is either untouched since start-up or holds the authoritative value.
#[derive(Debug, Clone, Default)]
enum Slot {
    #[default]
    Unloaded,
    Loaded(Option<String>),
}

#[derive(Debug, Default)]
struct Slots {
    access: Slot,
    refresh: Slot,
    expires_at: Slot,
}

/// Token holder shared by the auth flow, the HTTP wrapper and the monitor.
pub struct TokenStore {
    storage: Box<dyn TokenStorage>,
    slots: Mutex<Slots>,
}

impl TokenStore {
    pub fn new(storage: Box<dyn TokenStorage>) -> Self {
        Self {
            storage,
            slots: Mutex::new(Slots::default()),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(Box::new(MemoryStorage::new()))
    }

    fn slots(&self) -> MutexGuard<'_, Slots> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn read(&self, select: fn(&mut Slots) -> &mut Slot, key: &str) -> Option<String> {
        let mut slots = self.slots();
        let slot = select(&mut slots);
        if let Slot::Loaded(value) = slot {
            return value.clone();
        }
        let value = match self.storage.load(key) {
            Ok(v) => v.filter(|v| !v.is_empty()),
            Err(e) => {
                tracing::warn!(error = %e, key, "failed to read persisted token");
                None
            }
        };
        *slot = Slot::Loaded(value.clone());
        value
    }

    fn write(&self, select: fn(&mut Slots) -> &mut Slot, key: &str, value: Option<String>) {
        let mut slots = self.slots();
        let result = match &value {
            Some(v) => self.storage.store(key, v),
            None => self.storage.remove(key),
        };
        if let Err(e) = result {
            tracing::warn!(error = %e, key, "failed to persist token");
        }
        *select(&mut slots) = Slot::Loaded(value);
    }

    pub fn access_token(&self) -> Option<String> {
        self.read(|s| &mut s.access, ACCESS_TOKEN_KEY)
    }

    pub fn set_access_token(&self, token: Option<String>) {
        self.write(|s| &mut s.access, ACCESS_TOKEN_KEY, token);
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.read(|s| &mut s.refresh, REFRESH_TOKEN_KEY)
    }

    pub fn set_refresh_token(&self, token: Option<String>) {
        self.write(|s| &mut s.refresh, REFRESH_TOKEN_KEY, token);
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.read(|s| &mut s.expires_at, EXPIRES_AT_KEY)
            .and_then(|raw| DateTime::parse_from_rfc3339(&raw).ok())
            .map(|dt| dt.with_timezone(&Utc))
    }

    pub fn set_expires_at(&self, at: Option<DateTime<Utc>>) {
        self.write(
            |s| &mut s.expires_at,
            EXPIRES_AT_KEY,
            at.map(|dt| dt.to_rfc3339()),
        );
    }

    /// Store a token endpoint response. The refresh token is only replaced
    /// when the server issued a new one.
    pub fn set_tokens(&self, response: &TokenResponse, issued_at: DateTime<Utc>) {
        self.set_access_token(Some(response.access_token.clone()));
        if let Some(refresh) = &response.refresh_token {
            self.set_refresh_token(Some(refresh.clone()));
        }
        let expires_at = response.expires_in.and_then(|secs| {
            let at = expiry_after(issued_at, secs);
            if at.is_none() {
                tracing::warn!(expires_in = secs, "token lifetime out of range; storing no expiry");
            }
            at
        });
        self.set_expires_at(expires_at);
    }

    pub fn clear(&self) {
        self.set_access_token(None);
        self.set_refresh_token(None);
        self.set_expires_at(None);
    }

    /// An access token exists and has not passed its expiry. Tokens without a
    /// recorded expiry count as valid until the server says otherwise.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.access_token().is_some() && self.expires_at().is_none_or(|at| at > now)
    }

    pub fn time_remaining(&self, now: DateTime<Utc>) -> Option<chrono::Duration> {
        self.access_token()?;
        self.expires_at().map(|at| at - now)
    }
}

impl std::fmt::Debug for TokenStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenStore")
            .field("has_access_token", &self.access_token().is_some())
            .field("has_refresh_token", &self.refresh_token().is_some())
            .field("expires_at", &self.expires_at())
            .finish()
    }
}
