//! JSON REST API for formfill.
//!
//! Exposes an axum [`Router`] backed by any [`formfill_core::store::FormStore`].
//! CORS, tracing and transport concerns are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", formfill_api::api_router(store.clone(), WritePolicy::default()))
//! ```

pub mod error;
pub mod lookup;
pub mod mappings;
pub mod profiles;
pub mod stats;

use std::sync::Arc;

use axum::{Router, routing::get};
use formfill_core::{service::WritePolicy, store::FormStore};
use serde::Deserialize;

pub use error::ApiError;

/// Shared state threaded through all handlers.
pub struct ApiState<S> {
  pub store:  Arc<S>,
  pub policy: WritePolicy,
}

// Manual impl: `S` itself need not be `Clone`.
impl<S> Clone for ApiState<S> {
  fn clone(&self) -> Self {
    Self { store: Arc::clone(&self.store), policy: self.policy }
  }
}

/// Build a fully-materialised API router for `store`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(store: Arc<S>, policy: WritePolicy) -> Router<()>
where
  S: FormStore + 'static,
{
  Router::new()
    // Mappings
    .route(
      "/mapping",
      get(mappings::get_one::<S>)
        .post(mappings::capture::<S>)
        .delete(mappings::delete_one::<S>),
    )
    .route("/mappings/recent", get(mappings::recent::<S>))
    .route("/all", get(mappings::all::<S>))
    // Lookup
    .route("/inverted", get(lookup::inverted::<S>))
    .route("/inverted/all", get(lookup::inverted_all::<S>))
    .route("/autofill", get(lookup::autofill::<S>))
    // Profiles
    .route(
      "/profile",
      get(profiles::get_one::<S>)
        .post(profiles::save::<S>)
        .delete(profiles::delete_one::<S>),
    )
    .route("/profiles/search", get(profiles::search::<S>))
    .route("/profiles/recent", get(profiles::recent::<S>))
    // Stats
    .route("/stats", get(stats::handler::<S>))
    .with_state(ApiState { store, policy })
}

// ─── Shared query params ─────────────────────────────────────────────────────

const DEFAULT_LIMIT: usize = 10;
const MAX_LIMIT: usize = 100;

/// `?limit=` for list endpoints; defaults to 10 and is capped at 100.
/// `limit=0` is rejected.
#[derive(Debug, Default, Deserialize)]
pub struct LimitParams {
  pub limit: Option<usize>,
}

impl LimitParams {
  pub fn get(&self) -> Result<usize, ApiError> {
    match self.limit {
      None => Ok(DEFAULT_LIMIT),
      Some(0) => Err(ApiError::BadRequest("limit must be at least 1".into())),
      Some(n) => Ok(n.min(MAX_LIMIT)),
    }
  }
}

#[cfg(test)]
mod tests;
