use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use crate::error::{PortalError, Result};
use crate::models::user::{ApiDriver, ApiUser, Role};

pub const ACCESS_TOKEN_KEY: &str = "access_token";
pub const REFRESH_TOKEN_KEY: &str = "refresh_token";
pub const LEGACY_TOKEN_KEY: &str = "auth_token";
pub const USER_DATA_KEY: &str = "user_data";
pub const DRIVER_DATA_KEY: &str = "driver_data";
pub const USER_ROLE_KEY: &str = "user_role";

const SESSION_KEYS: [&str; 6] = [
    ACCESS_TOKEN_KEY,
    REFRESH_TOKEN_KEY,
    LEGACY_TOKEN_KEY,
    USER_DATA_KEY,
    DRIVER_DATA_KEY,
    USER_ROLE_KEY,
];

/// Durable key/value slots for the session. Every call is one atomic
/// operation on one key.
pub trait SessionStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

#[derive(Debug, Default)]
pub struct MemorySessionStore {
    slots: RwLock<HashMap<String, String>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<T>(_: T) -> PortalError {
    PortalError::Storage("session lock poisoned".to_string())
}

impl SessionStore for MemorySessionStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.slots.read().map_err(poisoned)?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.slots
            .write()
            .map_err(poisoned)?
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.slots.write().map_err(poisoned)?.remove(key);
        Ok(())
    }
}

/// JSON file store that survives restarts. Every change is written through
/// to disk before the call returns.
#[derive(Debug)]
pub struct FileSessionStore {
    path: PathBuf,
    slots: RwLock<HashMap<String, String>>,
}

impl FileSessionStore {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let slots = if path.exists() {
            let raw = fs::read_to_string(&path)
                .map_err(|e| PortalError::Storage(format!("{}: {}", path.display(), e)))?;
            if raw.trim().is_empty() {
                HashMap::new()
            } else {
                serde_json::from_str(&raw).map_err(|e| {
                    PortalError::Storage(format!("{} is not a session file: {}", path.display(), e))
                })?
            }
        } else {
            HashMap::new()
        };

        log::debug!("Opened session file {} ({} keys)", path.display(), slots.len());
        Ok(Self {
            path,
            slots: RwLock::new(slots),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, slots: &HashMap<String, String>) -> Result<()> {
        let raw = serde_json::to_string_pretty(slots)
            .map_err(|e| PortalError::Storage(e.to_string()))?;
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, raw)
            .and_then(|_| fs::rename(&tmp, &self.path))
            .map_err(|e| PortalError::Storage(format!("{}: {}", self.path.display(), e)))
    }
}

impl SessionStore for FileSessionStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.slots.read().map_err(poisoned)?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut slots = self.slots.write().map_err(poisoned)?;
        slots.insert(key.to_string(), value.to_string());
        self.persist(&slots)
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut slots = self.slots.write().map_err(poisoned)?;
        if slots.remove(key).is_some() {
            self.persist(&slots)?;
        }
        Ok(())
    }
}

/// Typed view of the session slots used by the API client.
#[derive(Clone)]
pub struct AuthTokens {
    store: Arc<dyn SessionStore>,
}

impl AuthTokens {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self { store }
    }

    /// Saves the tokens returned by login/registration. Missing or empty
    /// values leave the existing slot untouched.
    pub fn store(
        &self,
        access_token: Option<&str>,
        refresh_token: Option<&str>,
        legacy_token: Option<&str>,
    ) -> Result<()> {
        for (key, value) in [
            (ACCESS_TOKEN_KEY, access_token),
            (REFRESH_TOKEN_KEY, refresh_token),
            (LEGACY_TOKEN_KEY, legacy_token),
        ] {
            if let Some(value) = value.filter(|v| !v.is_empty()) {
                self.store.set(key, value)?;
            }
        }
        Ok(())
    }

    /// Forgets the whole session: tokens, both cached profiles and the role.
    pub fn clear(&self) -> Result<()> {
        for key in SESSION_KEYS {
            self.store.remove(key)?;
        }
        log::info!("Session cleared");
        Ok(())
    }

    pub fn access_token(&self) -> Result<Option<String>> {
        match self.store.get(ACCESS_TOKEN_KEY)? {
            Some(token) if !token.is_empty() => Ok(Some(token)),
            _ => Ok(self
                .store
                .get(LEGACY_TOKEN_KEY)?
                .filter(|token| !token.is_empty())),
        }
    }

    pub fn refresh_token(&self) -> Result<Option<String>> {
        self.store.get(REFRESH_TOKEN_KEY)
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self.access_token(), Ok(Some(_)))
    }

    pub fn role(&self) -> Result<Option<Role>> {
        Ok(self.store.get(USER_ROLE_KEY)?.as_deref().and_then(Role::parse))
    }

    /// Caches the user profile and makes `user` the session role. A driver
    /// profile left by an earlier session is dropped.
    pub fn cache_user(&self, user: &ApiUser) -> Result<()> {
        self.cache(USER_DATA_KEY, user)?;
        self.store.remove(DRIVER_DATA_KEY)?;
        self.store.set(USER_ROLE_KEY, Role::User.as_str())
    }

    pub fn cache_driver(&self, driver: &ApiDriver) -> Result<()> {
        self.cache(DRIVER_DATA_KEY, driver)?;
        self.store.remove(USER_DATA_KEY)?;
        self.store.set(USER_ROLE_KEY, Role::Driver.as_str())
    }

    pub fn cached_user(&self) -> Result<Option<ApiUser>> {
        self.cached(USER_DATA_KEY)
    }

    pub fn cached_driver(&self) -> Result<Option<ApiDriver>> {
        self.cached(DRIVER_DATA_KEY)
    }

    fn cache<T: Serialize>(&self, key: &str, profile: &T) -> Result<()> {
        let raw = serde_json::to_string(profile).map_err(|e| PortalError::Storage(e.to_string()))?;
        self.store.set(key, &raw)
    }

    fn cached<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let Some(raw) = self.store.get(key)? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(profile) => Ok(Some(profile)),
            Err(e) => {
                log::warn!("Ignoring unreadable cached profile in {}: {}", key, e);
                Ok(None)
            }
        }
    }
}
