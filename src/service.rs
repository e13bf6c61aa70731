//! Storage-agnostic preferences service.
//!
//! Orchestrates the load → merge → validate → save pipeline that every
//! application otherwise repeats. Storage is plugged in as an
//! `Arc<dyn PreferencesStore>`; the tree type is plugged in through the
//! [`PreferenceTree`] trait, so an application with extra preference fields
//! gets the same three operations for free.
//!
//! Concurrency: each operation is one sequential pipeline suspending only
//! at the storage boundary. Concurrent updates to the same user are
//! last-write-wins at the storage layer; concurrent updates to different
//! users are fully independent. No retries are built in — a storage failure
//! surfaces immediately.

use std::marker::PhantomData;
use std::sync::Arc;

use crate::error::PreferencesError;
use crate::merge::deep_merge_maps;
use crate::schema::{PreferenceTree, Preferences};
use crate::store::{PreferencesStore, RawDocument};

/// The three-operation preferences service.
///
/// `T` is the application's preference tree; it defaults to the generic
/// [`Preferences`].
pub struct PreferencesService<T: PreferenceTree = Preferences> {
    store: Arc<dyn PreferencesStore>,
    _tree: PhantomData<fn() -> T>,
}

impl<T: PreferenceTree> Clone for PreferencesService<T> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            _tree: PhantomData,
        }
    }
}

impl<T: PreferenceTree> PreferencesService<T> {
    pub fn new(store: Arc<dyn PreferencesStore>) -> Self {
        Self {
            store,
            _tree: PhantomData,
        }
    }

    /// Get the user's preferences with defaults applied. Never writes; a
    /// user with nothing stored gets the full default tree.
    pub async fn get(&self, user_id: &str) -> Result<T, PreferencesError> {
        let raw = self.load_or_empty(user_id).await?;
        let tree = T::from_raw(&raw)?;
        tracing::debug!(user_id, "loaded preferences");
        Ok(tree)
    }

    /// Merge-update the user's preferences. Only fields present in `patch`
    /// change; the merged result is validated *before* anything is
    /// persisted, so an invalid partial update is never partially applied.
    /// Unknown keys already in the stored document round-trip untouched.
    pub async fn update(&self, user_id: &str, patch: RawDocument) -> Result<T, PreferencesError> {
        let current = self.load_or_empty(user_id).await?;
        let merged = deep_merge_maps(current, patch);

        let tree = T::from_raw(&merged)?;
        self.store.save_raw(user_id, &merged).await?;
        tracing::info!(user_id, "updated preferences");
        Ok(tree)
    }

    /// Reset the user's preferences to defaults by storing an empty
    /// document. Idempotent.
    pub async fn reset(&self, user_id: &str) -> Result<T, PreferencesError> {
        self.store.save_raw(user_id, &RawDocument::new()).await?;
        tracing::info!(user_id, "reset preferences to defaults");
        Ok(T::default())
    }

    async fn load_or_empty(&self, user_id: &str) -> Result<RawDocument, PreferencesError> {
        // Absence is not an error: no stored document means "all defaults".
        Ok(self
            .store
            .load_raw(user_id)
            .await?
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::schema::{Theme, UiPreferences};
    use crate::store::MemoryTableStore;

    fn service() -> PreferencesService {
        PreferencesService::new(Arc::new(MemoryTableStore::new()))
    }

    fn doc(value: serde_json::Value) -> RawDocument {
        value.as_object().expect("object").clone()
    }

    #[tokio::test]
    async fn get_without_stored_document_returns_defaults() {
        let svc = service();
        let prefs = svc.get("u1").await.expect("get");
        assert_eq!(prefs, Preferences::default());
    }

    #[tokio::test]
    async fn update_then_get_round_trips() {
        let svc = service();
        let updated = svc
            .update("u1", doc(json!({"ui": {"theme": "dark"}})))
            .await
            .expect("update");
        assert_eq!(updated.ui.theme, Theme::Dark);

        let fetched = svc.get("u1").await.expect("get");
        assert_eq!(fetched, updated);
    }

    #[tokio::test]
    async fn invalid_patch_is_not_persisted() {
        let svc = service();
        svc.update("u1", doc(json!({"ui": {"theme": "dark"}})))
            .await
            .expect("valid update");

        let err = svc
            .update("u1", doc(json!({"ui": {"theme": "neon"}})))
            .await
            .expect_err("invalid enum");
        assert!(matches!(err, PreferencesError::Validation(ref v) if v.path == "ui.theme"));

        // The stored document is unchanged after the failed attempt.
        let fetched = svc.get("u1").await.expect("get");
        assert_eq!(fetched.ui.theme, Theme::Dark);
    }

    #[tokio::test]
    async fn reset_returns_defaults_and_is_idempotent() {
        let svc = service();
        svc.update("u1", doc(json!({"ui": {"theme": "dark"}, "extra": {"k": 1}})))
            .await
            .expect("update");

        let first = svc.reset("u1").await.expect("reset");
        let second = svc.reset("u1").await.expect("reset again");
        assert_eq!(first, Preferences::default());
        assert_eq!(first, second);
        assert_eq!(svc.get("u1").await.expect("get"), Preferences::default());
    }

    #[tokio::test]
    async fn users_are_independent() {
        let svc = service();
        svc.update("u1", doc(json!({"ui": {"theme": "dark"}})))
            .await
            .expect("update u1");

        let other = svc.get("u2").await.expect("get u2");
        assert_eq!(other.ui, UiPreferences::default());
    }
}
