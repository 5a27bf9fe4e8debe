//! Session Store: string key-value state holding the signed-in user.
//!
//! The core only reads from it. Writers are the login and logout collaborators
//! and whatever front end seeds the session.

use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
    sync::RwLock,
};

use serde_json::Value;
use shared::domain::User;
use tracing::warn;

use crate::error::SessionError;

pub const USER_KEY: &str = "user";
pub const JWT_KEY: &str = "jwt";

/// Upper bound on nested JSON string layers unwrapped by [`decode_user`].
const MAX_DECODE_LAYERS: usize = 4;

pub trait SessionStore: Send + Sync {
    fn get_item(&self, key: &str) -> Option<String>;
    fn set_item(&self, key: &str, value: &str) -> Result<(), SessionError>;
    fn remove_item(&self, key: &str) -> Result<(), SessionError>;
    fn clear(&self) -> Result<(), SessionError>;
}

/// Decodes a stored user, unwrapping JSON string layers until the value stops
/// being a string. Writers have been seen to store a JSON string of a JSON
/// string; a plain object decodes unchanged.
pub fn decode_user(raw: &str) -> Option<User> {
    let mut value: Value = serde_json::from_str(raw).ok()?;
    for _ in 0..MAX_DECODE_LAYERS {
        match value {
            Value::String(inner) => value = serde_json::from_str(&inner).ok()?,
            Value::Null => return None,
            other => return serde_json::from_value(other).ok(),
        }
    }
    None
}

pub fn current_user(store: &dyn SessionStore) -> Option<User> {
    let raw = store.get_item(USER_KEY)?;
    let user = decode_user(&raw);
    if user.is_none() {
        warn!(key = USER_KEY, "session entry does not decode to a user");
    }
    user
}

pub fn store_user(store: &dyn SessionStore, user: &User) -> Result<(), SessionError> {
    let encoded = serde_json::to_string(user)?;
    store.set_item(USER_KEY, &encoded)
}

#[derive(Debug, Default)]
pub struct MemorySessionStore {
    entries: RwLock<BTreeMap<String, String>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(user: &User) -> Self {
        let store = Self::new();
        if let Ok(encoded) = serde_json::to_string(user) {
            store.insert(USER_KEY, encoded);
        }
        store
    }

    fn insert(&self, key: &str, value: String) {
        if let Ok(mut entries) = self.entries.write() {
            entries.insert(key.to_string(), value);
        }
    }
}

impl SessionStore for MemorySessionStore {
    fn get_item(&self, key: &str) -> Option<String> {
        self.entries.read().ok()?.get(key).cloned()
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), SessionError> {
        self.insert(key, value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), SessionError> {
        if let Ok(mut entries) = self.entries.write() {
            entries.remove(key);
        }
        Ok(())
    }

    fn clear(&self) -> Result<(), SessionError> {
        if let Ok(mut entries) = self.entries.write() {
            entries.clear();
        }
        Ok(())
    }
}

/// Session persisted as a flat JSON object on disk, written through on every
/// mutation.
#[derive(Debug)]
pub struct FileSessionStore {
    path: PathBuf,
    entries: RwLock<BTreeMap<String, String>>,
}

impl FileSessionStore {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, SessionError> {
        let path = path.into();
        let entries = match fs::read_to_string(&path) {
            Ok(raw) if raw.trim().is_empty() => BTreeMap::new(),
            Ok(raw) => serde_json::from_str(&raw).map_err(|source| SessionError::Malformed {
                path: path.clone(),
                source,
            })?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(source) => {
                return Err(SessionError::Read {
                    path: path.clone(),
                    source,
                })
            }
        };
        Ok(Self {
            path,
            entries: RwLock::new(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn mutate(
        &self,
        apply: impl FnOnce(&mut BTreeMap<String, String>),
    ) -> Result<(), SessionError> {
        let snapshot = {
            let mut entries = match self.entries.write() {
                Ok(entries) => entries,
                Err(poisoned) => poisoned.into_inner(),
            };
            apply(&mut entries);
            serde_json::to_string_pretty(&*entries)?
        };
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|source| SessionError::Write {
                path: self.path.clone(),
                source,
            })?;
        }
        fs::write(&self.path, snapshot).map_err(|source| SessionError::Write {
            path: self.path.clone(),
            source,
        })
    }
}

impl SessionStore for FileSessionStore {
    fn get_item(&self, key: &str) -> Option<String> {
        self.entries.read().ok()?.get(key).cloned()
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), SessionError> {
        self.mutate(|entries| {
            entries.insert(key.to_string(), value.to_string());
        })
    }

    fn remove_item(&self, key: &str) -> Result<(), SessionError> {
        self.mutate(|entries| {
            entries.remove(key);
        })
    }

    fn clear(&self) -> Result<(), SessionError> {
        self.mutate(BTreeMap::clear)
    }
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;
