//! Axum router factory for the preferences endpoints.
//!
//! Mounts three routes under whatever prefix the host nests them at:
//!
//! - `GET    /` — fetch the full typed tree (defaults applied)
//! - `PATCH  /` — deep-merge a partial raw payload, return the merged tree
//! - `DELETE /` — reset to defaults
//!
//! Authentication is an external collaborator's responsibility: the host
//! supplies an [`IdentityResolver`] that turns request headers (typically
//! populated by its auth middleware) into an already-resolved user id, and
//! a [`ServiceFactory`] that yields a service/adapter pair per request.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::get,
};
use serde::Serialize;
use serde_json::Value;

use crate::error::PreferencesError;
use crate::schema::{PreferenceTree, Preferences};
use crate::service::PreferencesService;

/// Resolves the current user's id from request headers.
///
/// This crate never authenticates; it only consumes an opaque identifier
/// the host's middleware already resolved.
pub trait IdentityResolver: Send + Sync {
    fn resolve(&self, headers: &HeaderMap) -> Option<String>;
}

/// Reads the user id from a header (default `x-user-id`). Suitable when an
/// auth proxy or middleware injects the resolved identity upstream.
pub struct HeaderIdentity {
    header: String,
}

impl HeaderIdentity {
    pub fn new(header: impl Into<String>) -> Self {
        Self {
            header: header.into(),
        }
    }
}

impl Default for HeaderIdentity {
    fn default() -> Self {
        Self::new("x-user-id")
    }
}

impl IdentityResolver for HeaderIdentity {
    fn resolve(&self, headers: &HeaderMap) -> Option<String> {
        headers
            .get(&self.header)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string)
    }
}

/// Always resolves the same user id. Single-user deployments and tests.
pub struct StaticIdentity(pub String);

impl IdentityResolver for StaticIdentity {
    fn resolve(&self, _headers: &HeaderMap) -> Option<String> {
        Some(self.0.clone())
    }
}

/// Supplies a concrete service/adapter pair per request, so the host can
/// scope connections however it likes without this module knowing storage
/// details.
pub trait ServiceFactory<T: PreferenceTree>: Send + Sync {
    fn service(&self) -> PreferencesService<T>;
}

impl<T, F> ServiceFactory<T> for F
where
    T: PreferenceTree,
    F: Fn() -> PreferencesService<T> + Send + Sync,
{
    fn service(&self) -> PreferencesService<T> {
        (self)()
    }
}

/// Shared state for the preferences routes.
pub struct GatewayState<T: PreferenceTree = Preferences> {
    pub factory: Arc<dyn ServiceFactory<T>>,
    pub identity: Arc<dyn IdentityResolver>,
}

impl<T: PreferenceTree> GatewayState<T> {
    pub fn new(factory: Arc<dyn ServiceFactory<T>>, identity: Arc<dyn IdentityResolver>) -> Self {
        Self { factory, identity }
    }
}

/// Error payload returned by every failing route.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    /// Dotted field path for validation failures.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

type ApiError = (StatusCode, Json<ErrorBody>);

fn error_body(status: StatusCode, error: impl Into<String>, path: Option<String>) -> ApiError {
    (
        status,
        Json(ErrorBody {
            error: error.into(),
            path,
        }),
    )
}

fn map_service_error(err: PreferencesError) -> ApiError {
    match err {
        PreferencesError::Validation(v) => error_body(
            StatusCode::UNPROCESSABLE_ENTITY,
            v.message.clone(),
            Some(v.path),
        ),
        PreferencesError::Storage(s) => {
            tracing::error!("preferences storage failure: {}", s);
            error_body(
                StatusCode::INTERNAL_SERVER_ERROR,
                "storage failure".to_string(),
                None,
            )
        }
    }
}

/// Build the preferences router. Nest it under the host's prefix:
///
/// ```ignore
/// let app = Router::new().nest("/api/v1/preferences", preferences_router(state));
/// ```
pub fn preferences_router<T: PreferenceTree + 'static>(state: GatewayState<T>) -> Router {
    Router::new()
        .route(
            "/",
            get(fetch_handler::<T>)
                .patch(update_handler::<T>)
                .delete(reset_handler::<T>),
        )
        .with_state(Arc::new(state))
}

fn resolve_user<T: PreferenceTree>(
    state: &GatewayState<T>,
    headers: &HeaderMap,
) -> Result<String, ApiError> {
    state.identity.resolve(headers).ok_or_else(|| {
        error_body(
            StatusCode::UNAUTHORIZED,
            "no resolved user identity".to_string(),
            None,
        )
    })
}

async fn fetch_handler<T: PreferenceTree>(
    State(state): State<Arc<GatewayState<T>>>,
    headers: HeaderMap,
) -> Result<Json<T>, ApiError> {
    let user_id = resolve_user(&state, &headers)?;
    let tree = state
        .factory
        .service()
        .get(&user_id)
        .await
        .map_err(map_service_error)?;
    Ok(Json(tree))
}

async fn update_handler<T: PreferenceTree>(
    State(state): State<Arc<GatewayState<T>>>,
    headers: HeaderMap,
    Json(payload): Json<Value>,
) -> Result<Json<T>, ApiError> {
    let user_id = resolve_user(&state, &headers)?;
    let Value::Object(patch) = payload else {
        return Err(error_body(
            StatusCode::BAD_REQUEST,
            "request body must be a JSON object".to_string(),
            None,
        ));
    };
    let tree = state
        .factory
        .service()
        .update(&user_id, patch)
        .await
        .map_err(map_service_error)?;
    Ok(Json(tree))
}

async fn reset_handler<T: PreferenceTree>(
    State(state): State<Arc<GatewayState<T>>>,
    headers: HeaderMap,
) -> Result<Json<T>, ApiError> {
    let user_id = resolve_user(&state, &headers)?;
    let tree = state
        .factory
        .service()
        .reset(&user_id)
        .await
        .map_err(map_service_error)?;
    Ok(Json(tree))
}
