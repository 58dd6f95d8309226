//! Handlers for inverted-mapping lookup.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/inverted?pageId=` | Always 200; `found: false` with empty `fields` on a miss |
//! | `GET`  | `/inverted/all` | Every stored inverted mapping |
//! | `GET`  | `/autofill?pageId=&email=` | Lookup plus the owner's nested profile |

use axum::{
  Json,
  extract::{Query, State},
};
use formfill_core::{
  mapping::InvertedMapping,
  resolve::{Lookup, resolve},
  service::{self, Autofill},
  store::FormStore,
};
use serde::Deserialize;

use crate::{ApiState, error::ApiError};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LookupParams {
  #[serde(alias = "url")]
  pub page_id: Option<String>,
  /// Owner whose profile should accompany an autofill response.
  #[serde(alias = "ownerId")]
  pub email:   Option<String>,
}

/// `GET /inverted?pageId=`
pub async fn inverted<S: FormStore>(
  State(state): State<ApiState<S>>,
  Query(params): Query<LookupParams>,
) -> Result<Json<Lookup>, ApiError> {
  let page_id = params.page_id.unwrap_or_default();
  let resolution = resolve(state.store.as_ref(), &page_id).await?;
  Ok(Json(resolution.into_lookup()))
}

/// `GET /inverted/all`
pub async fn inverted_all<S: FormStore>(
  State(state): State<ApiState<S>>,
) -> Result<Json<Vec<InvertedMapping>>, ApiError> {
  let all = state
    .store
    .list_inverted()
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  Ok(Json(all))
}

/// `GET /autofill?pageId=&email=`
pub async fn autofill<S: FormStore>(
  State(state): State<ApiState<S>>,
  Query(params): Query<LookupParams>,
) -> Result<Json<Autofill>, ApiError> {
  let page_id = params.page_id.unwrap_or_default();
  let fill = service::autofill(state.store.as_ref(), &page_id, params.email.as_deref()).await?;
  Ok(Json(fill))
}
