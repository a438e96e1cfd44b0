// ── Client-persisted key/value storage ──
//
// Stores that survive restarts (auth session, app settings) write a
// versioned JSON blob under a fixed key. The backend is pluggable: the
// config crate provides a file-backed one, tests use `MemoryStorage`.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Key holding the persisted auth session.
pub const AUTH_STORAGE_KEY: &str = "auth-storage";

/// Key holding the persisted `AppSettings`.
pub const APP_CONFIG_KEY: &str = "app-config";

/// Raw string storage addressed by key.
pub trait Storage: Send + Sync {
    fn load(&self, key: &str) -> Result<Option<String>, CoreError>;
    fn save(&self, key: &str, value: &str) -> Result<(), CoreError>;
    fn remove(&self, key: &str) -> Result<(), CoreError>;
}

/// In-process storage. Nothing outlives the value.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: DashMap<String, String>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryStorage {
    fn load(&self, key: &str) -> Result<Option<String>, CoreError> {
        Ok(self.entries.get(key).map(|v| v.value().clone()))
    }

    fn save(&self, key: &str, value: &str) -> Result<(), CoreError> {
        self.entries.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), CoreError> {
        self.entries.remove(key);
        Ok(())
    }
}

/// On-disk envelope: `{"state": ..., "version": N}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct Persisted<T> {
    pub state: T,
    #[serde(default)]
    pub version: u32,
}

/// Read an envelope, leaving `state` untyped so the caller can migrate it.
pub(crate) fn load_envelope(
    storage: &dyn Storage,
    key: &str,
) -> Result<Option<Persisted<serde_json::Value>>, CoreError> {
    let Some(raw) = storage.load(key)? else {
        return Ok(None);
    };
    Ok(Some(serde_json::from_str(&raw)?))
}

pub(crate) fn save_envelope<T: Serialize>(
    storage: &dyn Storage,
    key: &str,
    state: &T,
    version: u32,
) -> Result<(), CoreError> {
    let raw = serde_json::to_string(&Persisted { state, version })?;
    storage.save(key, &raw)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn envelope_round_trips_through_memory() {
        let storage = MemoryStorage::new();
        save_envelope(&storage, APP_CONFIG_KEY, &json!({ "itemsPerPage": 25 }), 1).unwrap();

        let raw = storage.load(APP_CONFIG_KEY).unwrap().unwrap();
        assert_eq!(
            serde_json::from_str::<serde_json::Value>(&raw).unwrap(),
            json!({ "state": { "itemsPerPage": 25 }, "version": 1 })
        );

        let loaded = load_envelope(&storage, APP_CONFIG_KEY).unwrap().unwrap();
        assert_eq!(loaded.version, 1);
        assert_eq!(loaded.state["itemsPerPage"], 25);
    }

    #[test]
    fn missing_key_loads_nothing() {
        let storage = MemoryStorage::new();
        assert!(load_envelope(&storage, AUTH_STORAGE_KEY).unwrap().is_none());
        storage.remove(AUTH_STORAGE_KEY).unwrap();
    }

    #[test]
    fn corrupt_blob_is_a_storage_error() {
        let storage = MemoryStorage::new();
        storage.save(AUTH_STORAGE_KEY, "{not json").unwrap();
        let err = load_envelope(&storage, AUTH_STORAGE_KEY).unwrap_err();
        assert!(matches!(err, CoreError::Storage { .. }));
    }
}
