//! Handlers for user profiles.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `POST`   | `/profile` | Body: nested profile JSON; upsert by `email` |
//! | `GET`    | `/profile?email=` | 404 if not found |
//! | `DELETE` | `/profile?email=` | 204, or 404 if not found |
//! | `GET`    | `/profiles/search?q=&limit=` | Substring match on name and email; 400 if `limit=0` |
//! | `GET`    | `/profiles/recent?limit=` | Most recently updated first; 400 if `limit=0` |

use axum::{
  Json,
  extract::{Query, State},
  http::StatusCode,
};
use formfill_core::{
  profile::{ProfileRecord, ProfileView},
  service,
  store::FormStore,
};
use serde::Deserialize;
use serde_json::Value;

use crate::{ApiState, LimitParams, error::ApiError};

#[derive(Debug, Default, Deserialize)]
pub struct EmailParams {
  pub email: Option<String>,
}

impl EmailParams {
  fn email(&self) -> Result<&str, ApiError> {
    self
      .email
      .as_deref()
      .map(str::trim)
      .filter(|e| !e.is_empty())
      .ok_or_else(|| ApiError::BadRequest("missing email".into()))
  }
}

fn views(records: Vec<ProfileRecord>) -> Result<Vec<ProfileView>, ApiError> {
  records
    .iter()
    .map(|r| r.view().map_err(ApiError::from))
    .collect()
}

/// `POST /profile`
pub async fn save<S: FormStore>(
  State(state): State<ApiState<S>>,
  Json(body): Json<Value>,
) -> Result<Json<ProfileView>, ApiError> {
  let record = service::save_profile(state.store.as_ref(), body).await?;
  Ok(Json(record.view()?))
}

/// `GET /profile?email=`
pub async fn get_one<S: FormStore>(
  State(state): State<ApiState<S>>,
  Query(params): Query<EmailParams>,
) -> Result<Json<ProfileView>, ApiError> {
  let record = service::get_profile(state.store.as_ref(), params.email()?).await?;
  Ok(Json(record.view()?))
}

/// `DELETE /profile?email=`
pub async fn delete_one<S: FormStore>(
  State(state): State<ApiState<S>>,
  Query(params): Query<EmailParams>,
) -> Result<StatusCode, ApiError> {
  service::delete_profile(state.store.as_ref(), params.email()?).await?;
  Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
  /// Free text matched against first name, last name and email.
  pub q:     Option<String>,
  pub limit: Option<usize>,
}

/// `GET /profiles/search?q=[&limit=]`
pub async fn search<S: FormStore>(
  State(state): State<ApiState<S>>,
  Query(params): Query<SearchParams>,
) -> Result<Json<Vec<ProfileView>>, ApiError> {
  let text = params.q.unwrap_or_default();
  let limit = LimitParams { limit: params.limit }.get()?;
  let records = state
    .store
    .search_profiles(text, limit)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  Ok(Json(views(records)?))
}

/// `GET /profiles/recent[?limit=]`
pub async fn recent<S: FormStore>(
  State(state): State<ApiState<S>>,
  Query(params): Query<LimitParams>,
) -> Result<Json<Vec<ProfileView>>, ApiError> {
  let records = state
    .store
    .recent_profiles(params.get()?)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  Ok(Json(views(records)?))
}
