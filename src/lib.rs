//! PrefHub - unified user-preference storage across applications.
//!
//! Several independent applications want identical semantics for reading,
//! partially updating, and resetting a user's preference set, while staying
//! free to add their own fields and keep their own persistence layer. This
//! crate centralizes that logic:
//!
//! - `schema`: the generic preference tree (UI + notifications + an open
//!   `extra` map), its defaults and validation, and the [`PreferenceTree`]
//!   trait applications implement to extend it
//! - `merge`: recursive structural merge of raw documents (objects merge,
//!   everything else is replaced wholesale)
//! - `service`: the load → merge → validate → save pipeline behind
//!   `get`/`update`/`reset`
//! - `store`: the two-operation adapter contract plus in-memory reference
//!   adapters; PostgreSQL and libSQL implementations behind the `postgres`
//!   and `libsql` features
//! - `api`: an axum router factory behind the `web` feature
//! - `config`/`error`: environment-driven adapter configuration and the
//!   error taxonomy
//!
//! The core (schema + merge + service + in-memory adapters) has no
//! dependency on any storage or HTTP binding and builds with
//! `--no-default-features`.
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use prefhub::{MemoryTableStore, PreferencesService};
//! use serde_json::json;
//!
//! # async fn demo() -> Result<(), prefhub::PreferencesError> {
//! let service: PreferencesService = PreferencesService::new(Arc::new(MemoryTableStore::new()));
//!
//! let patch = json!({"ui": {"theme": "dark"}});
//! let prefs = service
//!     .update("user-42", patch.as_object().cloned().unwrap_or_default())
//!     .await?;
//! assert_eq!(prefs.ui.theme.as_str(), "dark");
//! # Ok(())
//! # }
//! ```

#[cfg(feature = "web")]
pub mod api;
pub mod config;
pub mod error;
pub mod merge;
pub mod schema;
pub mod service;
pub mod store;

pub use error::{ConfigError, PreferencesError, StorageError, ValidationError};
pub use merge::{deep_merge, deep_merge_maps};
pub use schema::{
    HourCycle, Language, NotificationPreferences, PreferenceTree, Preferences, Theme,
    UiPreferences,
};
pub use service::PreferencesService;
pub use store::{MemoryEmbeddedStore, MemoryTableStore, PreferencesStore, RawDocument};
