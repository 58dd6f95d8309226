//! Handler for `GET /stats`.

use axum::{Json, extract::State};
use formfill_core::{
  service::{self, Stats},
  store::FormStore,
};

use crate::{ApiState, error::ApiError};

/// `GET /stats`: document counts per collection.
pub async fn handler<S: FormStore>(
  State(state): State<ApiState<S>>,
) -> Result<Json<Stats>, ApiError> {
  Ok(Json(service::stats(state.store.as_ref()).await?))
}
