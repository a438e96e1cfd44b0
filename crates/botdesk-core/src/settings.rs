// ── Application settings store ──
//
// Persisted under `app-config` as `{"state": {...}, "version": N}`. Older
// blobs are migrated by filling in defaults for missing fields; blobs from
// a newer version are discarded.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::error::CoreError;
use crate::storage::{APP_CONFIG_KEY, Storage, load_envelope, save_envelope};

pub const SETTINGS_VERSION: u32 = 1;

pub const ITEMS_PER_PAGE_MAX: u32 = 100;
pub const DEBOUNCE_DELAY_MAX: Duration = Duration::from_secs(5);

/// User-tunable list behavior.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppSettings {
    #[serde(default = "default_items_per_page")]
    pub items_per_page: u32,
    #[serde(default = "default_debounce_delay", with = "millis")]
    pub debounce_delay: Duration,
}

fn default_items_per_page() -> u32 {
    10
}

fn default_debounce_delay() -> Duration {
    Duration::from_millis(300)
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            items_per_page: default_items_per_page(),
            debounce_delay: default_debounce_delay(),
        }
    }
}

impl AppSettings {
    pub fn validate(&self) -> Result<(), CoreError> {
        if !(1..=ITEMS_PER_PAGE_MAX).contains(&self.items_per_page) {
            return Err(CoreError::invalid(format!(
                "Items per page must be between 1 and {ITEMS_PER_PAGE_MAX}"
            )));
        }
        if self.debounce_delay > DEBOUNCE_DELAY_MAX {
            return Err(CoreError::invalid(format!(
                "Debounce delay must be at most {}ms",
                DEBOUNCE_DELAY_MAX.as_millis()
            )));
        }
        Ok(())
    }

    /// Pull out-of-range values back into range.
    fn clamped(mut self) -> Self {
        self.items_per_page = self.items_per_page.clamp(1, ITEMS_PER_PAGE_MAX);
        self.debounce_delay = self.debounce_delay.min(DEBOUNCE_DELAY_MAX);
        self
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(value.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

/// Persisted, observable `AppSettings`.
pub struct SettingsStore {
    storage: Arc<dyn Storage>,
    current: watch::Sender<AppSettings>,
}

impl SettingsStore {
    /// Load from storage. Unreadable or future-version blobs fall back to defaults.
    pub fn load(storage: Arc<dyn Storage>) -> Self {
        let settings = match read_settings(storage.as_ref()) {
            Ok(Some(settings)) => settings,
            Ok(None) => AppSettings::default(),
            Err(e) => {
                warn!(error = %e, "discarding unreadable settings");
                AppSettings::default()
            }
        };
        let (current, _) = watch::channel(settings);
        Self { storage, current }
    }

    pub fn get(&self) -> AppSettings {
        self.current.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<AppSettings> {
        self.current.subscribe()
    }

    /// Apply `f`, validate, persist, then publish.
    pub fn update(&self, f: impl FnOnce(&mut AppSettings)) -> Result<AppSettings, CoreError> {
        let mut next = self.get();
        f(&mut next);
        next.validate()?;
        save_envelope(self.storage.as_ref(), APP_CONFIG_KEY, &next, SETTINGS_VERSION)?;
        self.current.send_replace(next.clone());
        Ok(next)
    }

    pub fn set_items_per_page(&self, items_per_page: u32) -> Result<AppSettings, CoreError> {
        self.update(|s| s.items_per_page = items_per_page)
    }

    pub fn set_debounce_delay(&self, delay: Duration) -> Result<AppSettings, CoreError> {
        self.update(|s| s.debounce_delay = delay)
    }

    pub fn reset(&self) -> Result<AppSettings, CoreError> {
        self.storage.remove(APP_CONFIG_KEY)?;
        let defaults = AppSettings::default();
        self.current.send_replace(defaults.clone());
        Ok(defaults)
    }
}

fn read_settings(storage: &dyn Storage) -> Result<Option<AppSettings>, CoreError> {
    let Some(envelope) = load_envelope(storage, APP_CONFIG_KEY)? else {
        return Ok(None);
    };
    if envelope.version > SETTINGS_VERSION {
        warn!(
            version = envelope.version,
            "settings written by a newer release, using defaults"
        );
        return Ok(None);
    }
    if envelope.version < SETTINGS_VERSION {
        debug!(from = envelope.version, to = SETTINGS_VERSION, "migrating settings");
    }
    let settings: AppSettings = serde_json::from_value(envelope.state)?;
    Ok(Some(settings.clamped()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::storage::MemoryStorage;

    fn store_with(raw: &serde_json::Value) -> SettingsStore {
        let storage = Arc::new(MemoryStorage::new());
        storage.save(APP_CONFIG_KEY, &raw.to_string()).unwrap();
        SettingsStore::load(storage)
    }

    #[test]
    fn defaults_when_nothing_stored() {
        let store = SettingsStore::load(Arc::new(MemoryStorage::new()));
        assert_eq!(store.get(), AppSettings::default());
        assert_eq!(store.get().debounce_delay, Duration::from_millis(300));
    }

    #[test]
    fn older_blob_is_migrated() {
        let store = store_with(&json!({ "state": { "itemsPerPage": 25 }, "version": 0 }));
        assert_eq!(store.get().items_per_page, 25);
        assert_eq!(store.get().debounce_delay, Duration::from_millis(300));
    }

    #[test]
    fn future_blob_is_discarded() {
        let store = store_with(&json!({ "state": { "itemsPerPage": 50 }, "version": 9 }));
        assert_eq!(store.get(), AppSettings::default());
    }

    #[test]
    fn out_of_range_values_are_clamped_on_load() {
        let store = store_with(
            &json!({ "state": { "itemsPerPage": 1000, "debounceDelay": 60000 }, "version": 1 }),
        );
        assert_eq!(store.get().items_per_page, ITEMS_PER_PAGE_MAX);
        assert_eq!(store.get().debounce_delay, DEBOUNCE_DELAY_MAX);
    }

    #[test]
    fn updates_persist_and_publish() {
        let storage = Arc::new(MemoryStorage::new());
        let store = SettingsStore::load(Arc::clone(&storage) as Arc<dyn Storage>);
        let rx = store.subscribe();

        store.set_items_per_page(20).unwrap();
        store.set_debounce_delay(Duration::from_millis(500)).unwrap();
        assert_eq!(rx.borrow().items_per_page, 20);

        let raw: serde_json::Value =
            serde_json::from_str(&storage.load(APP_CONFIG_KEY).unwrap().unwrap()).unwrap();
        assert_eq!(
            raw,
            json!({ "state": { "itemsPerPage": 20, "debounceDelay": 500 }, "version": 1 })
        );

        let reloaded = SettingsStore::load(storage);
        assert_eq!(reloaded.get().items_per_page, 20);
    }

    #[test]
    fn invalid_updates_are_rejected_and_not_saved() {
        let store = SettingsStore::load(Arc::new(MemoryStorage::new()));
        assert!(store.set_items_per_page(0).is_err());
        assert!(store.set_debounce_delay(Duration::from_secs(6)).is_err());
        assert_eq!(store.get(), AppSettings::default());
    }

    #[test]
    fn reset_restores_defaults() {
        let store = SettingsStore::load(Arc::new(MemoryStorage::new()));
        store.set_items_per_page(42).unwrap();
        assert_eq!(store.reset().unwrap(), AppSettings::default());
    }
}
