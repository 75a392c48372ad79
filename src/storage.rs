use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

/// Error type returned by [`SessionStore`] implementations.
pub type StoreError = Box<dyn std::error::Error + Send + Sync>;

pub const ACCESS_TOKEN_KEY: &str = "access_token";
pub const ID_TOKEN_KEY: &str = "id_token";
/// Decimal milliseconds since the Unix epoch.
pub const EXPIRES_AT_KEY: &str = "expires_at";
pub const ROLES_GROUPS_TOKEN_KEY: &str = "roles_groups_token";
/// Pending login `{state, nonce}`, JSON encoded.
pub const TRANSACTION_KEY: &str = "auth_transaction";

/// Every key removed on logout.
pub const SESSION_KEYS: [&str; 4] = [
    ACCESS_TOKEN_KEY,
    ID_TOKEN_KEY,
    EXPIRES_AT_KEY,
    ROLES_GROUPS_TOKEN_KEY,
];

/// Durable string key-value store holding the session.
///
/// The browser's `localStorage` is the usual backing; anything with the same
/// get/set/remove shape works (an encrypted store, a server-side session, an
/// in-memory map in tests).
///
/// # Example
///
/// ```rust,ignore
/// impl SessionStore for CookieStore {
///     fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
///         Ok(self.jar.get(key).map(|c| c.value().to_string()))
///     }
///
///     fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
///         self.jar.add(key, value);
///         Ok(())
///     }
///
///     fn remove(&self, key: &str) -> Result<(), StoreError> {
///         self.jar.remove(key);
///         Ok(())
///     }
/// }
/// ```
pub trait SessionStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Overwrites any existing value.
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Removing an absent key succeeds.
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// In-memory store. Clones share the same entries.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<RwLock<HashMap<String, String>>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.read().contains_key(key)
    }
}

impl SessionStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries.write().insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.entries.write().remove(key);
        Ok(())
    }
}

/// Browser `localStorage`.
#[cfg(all(feature = "browser", target_arch = "wasm32"))]
#[derive(Debug, Clone)]
pub struct LocalStorage {
    storage: web_sys::Storage,
}

#[cfg(all(feature = "browser", target_arch = "wasm32"))]
impl LocalStorage {
    /// Open the current window's `localStorage`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Store`] outside a window context or when
    /// storage access is denied.
    pub fn new() -> Result<Self, crate::Error> {
        let storage = web_sys::window()
            .ok_or_else(|| crate::Error::Store("no window".into()))?
            .local_storage()
            .map_err(|e| crate::Error::Store(format!("localStorage unavailable: {e:?}")))?
            .ok_or_else(|| crate::Error::Store("localStorage unavailable".into()))?;
        Ok(Self { storage })
    }
}

#[cfg(all(feature = "browser", target_arch = "wasm32"))]
impl SessionStore for LocalStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.storage
            .get_item(key)
            .map_err(|e| format!("getItem({key}): {e:?}").into())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.storage
            .set_item(key, value)
            .map_err(|e| format!("setItem({key}): {e:?}").into())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.storage
            .remove_item(key)
            .map_err(|e| format!("removeItem({key}): {e:?}").into())
    }
}
