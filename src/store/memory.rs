//! In-memory storage adapters.
//!
//! Back the test suites and serve as the reference semantics for the two
//! storage patterns. Both keep everything behind a single mutex; these are
//! not meant for production use.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;

use crate::error::StorageError;
use crate::store::{PreferencesStore, RawDocument};

/// Pattern B: the raw preference document is the entire per-user record.
#[derive(Default)]
pub struct MemoryTableStore {
    rows: Mutex<HashMap<String, RawDocument>>,
}

impl MemoryTableStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PreferencesStore for MemoryTableStore {
    async fn load_raw(&self, user_id: &str) -> Result<Option<RawDocument>, StorageError> {
        Ok(self.rows.lock().await.get(user_id).cloned())
    }

    async fn save_raw(&self, user_id: &str, raw: &RawDocument) -> Result<(), StorageError> {
        self.rows
            .lock()
            .await
            .insert(user_id.to_string(), raw.clone());
        Ok(())
    }
}

/// Pattern A: preferences live under a sub-key of a larger per-user
/// settings document. Saving re-embeds the sub-key and leaves sibling keys
/// alone.
pub struct MemoryEmbeddedStore {
    prefs_key: String,
    settings: Mutex<HashMap<String, RawDocument>>,
}

impl MemoryEmbeddedStore {
    pub fn new(prefs_key: impl Into<String>) -> Self {
        Self {
            prefs_key: prefs_key.into(),
            settings: Mutex::new(HashMap::new()),
        }
    }

    /// Seed or replace a user's full settings document. Lets tests stand up
    /// sibling keys the adapter must preserve.
    pub async fn put_settings(&self, user_id: &str, settings: RawDocument) {
        self.settings
            .lock()
            .await
            .insert(user_id.to_string(), settings);
    }

    /// Snapshot of a user's full settings document, siblings included.
    pub async fn settings(&self, user_id: &str) -> Option<RawDocument> {
        self.settings.lock().await.get(user_id).cloned()
    }
}

#[async_trait]
impl PreferencesStore for MemoryEmbeddedStore {
    async fn load_raw(&self, user_id: &str) -> Result<Option<RawDocument>, StorageError> {
        let guard = self.settings.lock().await;
        let Some(settings) = guard.get(user_id) else {
            return Ok(None);
        };
        match settings.get(&self.prefs_key) {
            Some(Value::Object(prefs)) => Ok(Some(prefs.clone())),
            // Parent document exists but holds no preferences yet.
            _ => Ok(None),
        }
    }

    async fn save_raw(&self, user_id: &str, raw: &RawDocument) -> Result<(), StorageError> {
        let mut guard = self.settings.lock().await;
        let settings = guard.entry(user_id.to_string()).or_default();
        settings.insert(self.prefs_key.clone(), Value::Object(raw.clone()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn doc(value: Value) -> RawDocument {
        value.as_object().expect("object").clone()
    }

    #[tokio::test]
    async fn table_store_upserts() {
        let store = MemoryTableStore::new();
        assert!(store.load_raw("u1").await.unwrap().is_none());

        store
            .save_raw("u1", &doc(json!({"ui": {"theme": "dark"}})))
            .await
            .unwrap();
        store
            .save_raw("u1", &doc(json!({"ui": {"theme": "light"}})))
            .await
            .unwrap();

        let loaded = store.load_raw("u1").await.unwrap().expect("stored");
        assert_eq!(Value::Object(loaded), json!({"ui": {"theme": "light"}}));
        assert!(store.load_raw("u2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn embedded_store_preserves_sibling_keys() {
        let store = MemoryEmbeddedStore::new("preferences");
        store
            .put_settings(
                "u1",
                doc(json!({"onboarding_done": true, "preferences": {"ui": {"theme": "dark"}}})),
            )
            .await;

        let loaded = store.load_raw("u1").await.unwrap().expect("stored");
        assert_eq!(Value::Object(loaded), json!({"ui": {"theme": "dark"}}));

        store
            .save_raw("u1", &doc(json!({"ui": {"theme": "light"}})))
            .await
            .unwrap();

        let settings = store.settings("u1").await.expect("settings");
        assert_eq!(
            Value::Object(settings),
            json!({
                "onboarding_done": true,
                "preferences": {"ui": {"theme": "light"}}
            })
        );
    }

    #[tokio::test]
    async fn embedded_store_handles_missing_parent_and_sub_key() {
        let store = MemoryEmbeddedStore::new("preferences");
        assert!(store.load_raw("u1").await.unwrap().is_none());

        store
            .put_settings("u1", doc(json!({"onboarding_done": false})))
            .await;
        assert!(store.load_raw("u1").await.unwrap().is_none());

        store.save_raw("u1", &doc(json!({}))).await.unwrap();
        assert!(store.load_raw("u1").await.unwrap().is_some());
    }
}
