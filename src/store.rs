//! Typed persistence for the engine's small amount of durable state.
//!
//! Three records live in the injected [`KeyValueStore`], each as one JSON
//! value under its own key:
//!
//! | Key             | Record          | Owner            |
//! |-----------------|-----------------|------------------|
//! | `laundry_state` | `LaundryState`  | user actions     |
//! | `alert_ledger`  | `AlertLedger`   | alert policy     |
//! | `last_location` | `LocationFix`   | location resolver|
//!
//! Missing keys load as defaults. A value that fails to decode is logged
//! and treated as missing, so an unreadable status reads as not hanging.

use std::collections::HashMap;
use std::sync::Mutex;

use log::{debug, warn};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::model::{AlertLedger, LaundryState, LocationFix, StoreError};
use crate::ports::KeyValueStore;

pub const KEY_LAUNDRY_STATE: &str = "laundry_state";
pub const KEY_ALERT_LEDGER: &str = "alert_ledger";
pub const KEY_LAST_LOCATION: &str = "last_location";

// ---------------------------------------------------------------------------
// Typed store
// ---------------------------------------------------------------------------

pub struct LaundryStore {
    backend: Box<dyn KeyValueStore>,
}

impl LaundryStore {
    pub fn new(backend: Box<dyn KeyValueStore>) -> Self {
        Self { backend }
    }

    pub fn load_state(&self) -> Result<LaundryState, StoreError> {
        Ok(self.load(KEY_LAUNDRY_STATE)?.unwrap_or_default())
    }

    pub fn save_state(&self, state: &LaundryState) -> Result<(), StoreError> {
        self.save(KEY_LAUNDRY_STATE, state)
    }

    pub fn load_ledger(&self) -> Result<AlertLedger, StoreError> {
        Ok(self.load(KEY_ALERT_LEDGER)?.unwrap_or_default())
    }

    pub fn save_ledger(&self, ledger: &AlertLedger) -> Result<(), StoreError> {
        self.save(KEY_ALERT_LEDGER, ledger)
    }

    pub fn load_location(&self) -> Result<Option<LocationFix>, StoreError> {
        self.load(KEY_LAST_LOCATION)
    }

    pub fn save_location(&self, fix: &LocationFix) -> Result<(), StoreError> {
        self.save(KEY_LAST_LOCATION, fix)
    }

    fn load<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StoreError> {
        let Some(raw) = self.backend.get(key)? else {
            debug!(target: "store", "{} not set, using default", key);
            return Ok(None);
        };
        match decode(key, &raw) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                warn!(target: "store", "{}; falling back to default", e);
                Ok(None)
            }
        }
    }

    fn save<T: Serialize>(&self, key: &str, value: &T) -> Result<(), StoreError> {
        let raw = serde_json::to_string(value).map_err(|e| StoreError::Backend(e.to_string()))?;
        self.backend.set(key, &raw)
    }
}

fn decode<T: DeserializeOwned>(key: &str, raw: &str) -> Result<T, StoreError> {
    serde_json::from_str(raw).map_err(|e| StoreError::Corrupted {
        key: key.to_string(),
        reason: e.to_string(),
    })
}

// ---------------------------------------------------------------------------
// In-memory backend
// ---------------------------------------------------------------------------

/// Process-local [`KeyValueStore`] for tests and development runs.
#[derive(Default)]
pub struct InMemoryStore {
    values: Mutex<HashMap<String, String>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for InMemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let values = self
            .values
            .lock()
            .map_err(|_| StoreError::Backend("in-memory store lock poisoned".into()))?;
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut values = self
            .values
            .lock()
            .map_err(|_| StoreError::Backend("in-memory store lock poisoned".into()))?;
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Coordinates, LaundryStatus};
    use chrono::{TimeZone, Utc};

    fn store() -> LaundryStore {
        LaundryStore::new(Box::new(InMemoryStore::new()))
    }

    #[test]
    fn test_missing_records_load_as_defaults() {
        let store = store();
        assert_eq!(store.load_state().unwrap(), LaundryState::default());
        assert_eq!(store.load_ledger().unwrap(), AlertLedger::default());
        assert_eq!(store.load_location().unwrap(), None);
    }

    #[test]
    fn test_ledger_persists_across_loads() {
        let store = store();
        let ledger = AlertLedger {
            last_alert_probability: 72,
            last_alert_time: Utc.with_ymd_and_hms(2024, 5, 1, 13, 0, 0).unwrap(),
        };
        store.save_ledger(&ledger).unwrap();
        assert_eq!(store.load_ledger().unwrap(), ledger);
    }

    #[test]
    fn test_state_and_location_are_independent_records() {
        let store = store();
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap();
        let state = LaundryState {
            status: LaundryStatus::Hanging,
            changed_at: now,
        };
        let fix = LocationFix {
            coordinates: Coordinates::new(34.6937, 135.5023),
            obtained_at: now,
        };
        store.save_state(&state).unwrap();
        store.save_location(&fix).unwrap();

        assert_eq!(store.load_state().unwrap(), state);
        assert_eq!(store.load_location().unwrap(), Some(fix));
        assert_eq!(store.load_ledger().unwrap(), AlertLedger::default());
    }

    #[test]
    fn test_corrupted_state_falls_back_to_not_hanging() {
        let backend = InMemoryStore::new();
        backend.set(KEY_LAUNDRY_STATE, "{\"status\":\"DRYING\"}").unwrap();
        let store = LaundryStore::new(Box::new(backend));
        assert_eq!(store.load_state().unwrap().status, LaundryStatus::NotHanging);
    }

    #[test]
    fn test_decode_reports_key_on_corruption() {
        let err = decode::<AlertLedger>(KEY_ALERT_LEDGER, "not json").unwrap_err();
        match err {
            StoreError::Corrupted { key, .. } => assert_eq!(key, KEY_ALERT_LEDGER),
            other => panic!("expected Corrupted, got {:?}", other),
        }
    }
}
