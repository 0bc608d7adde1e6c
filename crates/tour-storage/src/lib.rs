//! Browser persistence for tour completion records
//!
//! A thin wrapper over LocalStorage/SessionStorage plus the
//! [`CompletionStore`] implementation used by the tour provider. Keys are
//! per tour id: `tour-completed-<id>` marks a finished or skipped tour,
//! `tour-visited-<id>` marks that the embedding page has been seen once
//! (used for first-visit auto-start).

use tour_core::{CompletionStore, TourError, TourResult, COMPLETION_KEY_PREFIX};
use wasm_bindgen::prelude::*;

/// Key prefix for the first-visit marker
pub const VISITED_KEY_PREFIX: &str = "tour-visited-";

pub fn completed_key(tour_id: &str) -> String {
    format!("{COMPLETION_KEY_PREFIX}{tour_id}")
}

pub fn visited_key(tour_id: &str) -> String {
    format!("{VISITED_KEY_PREFIX}{tour_id}")
}

/// Simple browser storage using LocalStorage or SessionStorage
#[derive(Clone, Copy, Debug)]
pub struct BrowserStorage {
    use_session: bool,
}

impl BrowserStorage {
    /// Create storage backed by LocalStorage
    pub fn local() -> Self {
        Self { use_session: false }
    }

    /// Create storage backed by SessionStorage
    pub fn session() -> Self {
        Self { use_session: true }
    }

    /// Store a string value
    pub fn set(&self, key: &str, value: &str) -> Result<(), JsValue> {
        let storage = self.get_storage()?;
        storage.set_item(key, value)
    }

    /// Get a string value
    pub fn get(&self, key: &str) -> Result<Option<String>, JsValue> {
        let storage = self.get_storage()?;
        storage.get_item(key)
    }

    /// Remove a value
    pub fn remove(&self, key: &str) -> Result<(), JsValue> {
        let storage = self.get_storage()?;
        storage.remove_item(key)
    }

    /// Check if a key exists
    pub fn has(&self, key: &str) -> Result<bool, JsValue> {
        Ok(self.get(key)?.is_some())
    }

    /// Store JSON data
    pub fn set_json<T: serde::Serialize>(&self, key: &str, value: &T) -> Result<(), JsValue> {
        let json = serde_json::to_string(value)
            .map_err(|e| JsValue::from_str(&format!("JSON error: {e}")))?;
        self.set(key, &json)
    }

    /// Get JSON data
    pub fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        key: &str,
    ) -> Result<Option<T>, JsValue> {
        match self.get(key)? {
            Some(json) => {
                let value = serde_json::from_str(&json)
                    .map_err(|e| JsValue::from_str(&format!("JSON error: {e}")))?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    fn get_storage(&self) -> Result<web_sys::Storage, JsValue> {
        let window = web_sys::window().ok_or_else(|| JsValue::from_str("No window object"))?;

        if self.use_session {
            window
                .session_storage()
                .map_err(|_| JsValue::from_str("SessionStorage not available"))?
                .ok_or_else(|| JsValue::from_str("SessionStorage not supported"))
        } else {
            window
                .local_storage()
                .map_err(|_| JsValue::from_str("LocalStorage not available"))?
                .ok_or_else(|| JsValue::from_str("LocalStorage not supported"))
        }
    }
}

/// LocalStorage-backed [`CompletionStore`], durable across reloads
#[derive(Clone, Copy, Debug)]
pub struct LocalCompletionStore {
    storage: BrowserStorage,
}

impl LocalCompletionStore {
    pub fn new() -> Self {
        Self {
            storage: BrowserStorage::local(),
        }
    }

    /// True exactly once per tour id: the first time a page is seen with no
    /// completion record. Marks the tour as visited as a side effect.
    pub fn should_auto_start(&self, tour_id: &str) -> bool {
        let completed = self.is_completed(tour_id);
        let visited = self
            .storage
            .has(&visited_key(tour_id))
            .unwrap_or(false);

        if completed || visited {
            return false;
        }
        if let Err(err) = self.storage.set(&visited_key(tour_id), "true") {
            log::warn!("failed to persist visited marker for '{tour_id}': {err:?}");
        }
        true
    }

    /// Clear both the completion record and the first-visit marker
    pub fn reset(&self, tour_id: &str) -> TourResult<()> {
        self.clear_completed(tour_id)?;
        self.storage
            .remove(&visited_key(tour_id))
            .map_err(|e| TourError::persistence(format!("{e:?}")))
    }
}

impl Default for LocalCompletionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CompletionStore for LocalCompletionStore {
    fn is_completed(&self, tour_id: &str) -> bool {
        self.storage
            .has(&completed_key(tour_id))
            .unwrap_or(false)
    }

    fn mark_completed(&self, tour_id: &str) -> TourResult<()> {
        self.storage
            .set(&completed_key(tour_id), "true")
            .map_err(|e| TourError::persistence(format!("{e:?}")))
    }

    fn clear_completed(&self, tour_id: &str) -> TourResult<()> {
        self.storage
            .remove(&completed_key(tour_id))
            .map_err(|e| TourError::persistence(format!("{e:?}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_scheme() {
        assert_eq!(completed_key("onboarding"), "tour-completed-onboarding");
        assert_eq!(visited_key("onboarding"), "tour-visited-onboarding");
    }
}

#[cfg(all(test, target_arch = "wasm32"))]
mod wasm_tests {
    use super::*;
    use tour_core::CompletionStore;
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    #[wasm_bindgen_test]
    fn test_completion_round_trip() {
        let store = LocalCompletionStore::new();
        store.reset("wasm-test").unwrap();

        assert!(!store.is_completed("wasm-test"));
        store.mark_completed("wasm-test").unwrap();
        assert!(store.is_completed("wasm-test"));

        // idempotent
        store.mark_completed("wasm-test").unwrap();
        assert!(store.is_completed("wasm-test"));

        store.clear_completed("wasm-test").unwrap();
        assert!(!store.is_completed("wasm-test"));
    }

    #[wasm_bindgen_test]
    fn test_auto_start_fires_once() {
        let store = LocalCompletionStore::new();
        store.reset("wasm-auto").unwrap();

        assert!(store.should_auto_start("wasm-auto"));
        assert!(!store.should_auto_start("wasm-auto"));
    }
}
