//! Handlers for captured mappings.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `POST`   | `/mapping` | Body: `{"pageId", "ownerId", "fields"}`; merge-upsert |
//! | `GET`    | `/mapping?pageId=&ownerId=` | 404 if not found |
//! | `DELETE` | `/mapping?pageId=&ownerId=` | 204, or 404 if not found |
//! | `GET`    | `/mappings/recent?limit=` | Most recently created first; 400 if `limit=0` |
//! | `GET`    | `/all` | Every stored mapping |

use axum::{
  Json,
  extract::{Query, State},
  http::StatusCode,
};
use formfill_core::{
  Fields,
  invert::FieldMatch,
  mapping::{CaptureRequest, Mapping, MappingKey},
  service,
  store::FormStore,
};
use serde::{Deserialize, Serialize};

use crate::{ApiState, LimitParams, error::ApiError};

// ─── Capture ─────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureResponse {
  pub status:   &'static str,
  pub message:  String,
  pub page_id:  String,
  pub version:  u64,
  pub mapping:  Fields,
  /// `null` when no inverted mapping could be derived.
  pub inverted: Option<Fields>,
  pub matches:  Vec<FieldMatch>,
}

/// `POST /mapping`
pub async fn capture<S: FormStore>(
  State(state): State<ApiState<S>>,
  Json(body): Json<CaptureRequest>,
) -> Result<Json<CaptureResponse>, ApiError> {
  let capture = body.validate(state.policy.owner_scoped)?;
  let outcome = service::capture(state.store.as_ref(), capture, &state.policy).await?;

  let message = match &outcome.inverted {
    Some(_) => format!("mapping saved; {} field(s) matched the profile", outcome.matches.len()),
    None => "mapping saved".to_owned(),
  };
  Ok(Json(CaptureResponse {
    status: "success",
    message,
    page_id: outcome.mapping.page_id,
    version: outcome.version,
    mapping: outcome.mapping.fields,
    inverted: outcome.inverted.map(|inv| inv.fields),
    matches: outcome.matches,
  }))
}

// ─── Get / delete ────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyParams {
  #[serde(alias = "url")]
  pub page_id:  Option<String>,
  pub owner_id: Option<String>,
}

impl KeyParams {
  fn key(self, owner_scoped: bool) -> Result<MappingKey, ApiError> {
    Ok(MappingKey::parse(self.page_id.as_deref(), self.owner_id, owner_scoped)?)
  }
}

/// `GET /mapping?pageId=&ownerId=`
pub async fn get_one<S: FormStore>(
  State(state): State<ApiState<S>>,
  Query(params): Query<KeyParams>,
) -> Result<Json<Mapping>, ApiError> {
  let key = params.key(state.policy.owner_scoped)?;
  let stored = service::get_mapping(state.store.as_ref(), key).await?;
  Ok(Json(stored.doc))
}

/// `DELETE /mapping?pageId=&ownerId=`
pub async fn delete_one<S: FormStore>(
  State(state): State<ApiState<S>>,
  Query(params): Query<KeyParams>,
) -> Result<StatusCode, ApiError> {
  let key = params.key(state.policy.owner_scoped)?;
  service::delete_mapping(state.store.as_ref(), key).await?;
  Ok(StatusCode::NO_CONTENT)
}

// ─── Listings ────────────────────────────────────────────────────────────────

/// `GET /mappings/recent[?limit=]`
pub async fn recent<S: FormStore>(
  State(state): State<ApiState<S>>,
  Query(params): Query<LimitParams>,
) -> Result<Json<Vec<Mapping>>, ApiError> {
  let mappings = state
    .store
    .recent_mappings(params.get()?)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  Ok(Json(mappings))
}

#[derive(Debug, Serialize)]
pub struct AllMappings {
  pub status: &'static str,
  pub data:   Vec<Mapping>,
}

/// `GET /all`
pub async fn all<S: FormStore>(
  State(state): State<ApiState<S>>,
) -> Result<Json<AllMappings>, ApiError> {
  let data = state
    .store
    .list_mappings()
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  Ok(Json(AllMappings { status: "success", data }))
}
