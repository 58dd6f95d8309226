//! Error types for `formfill-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// A required field was absent from a write request. Nothing is persisted.
  #[error("validation failed: {0}")]
  Validation(String),

  #[error("profile not found: {0}")]
  ProfileNotFound(String),

  #[error("mapping not found for page {page_id}{}", owner_suffix(.owner_id))]
  MappingNotFound {
    page_id:  String,
    owner_id: Option<String>,
  },

  /// A compare-and-swap write kept losing to concurrent writers.
  #[error("write conflict: {0}")]
  Conflict(String),

  /// Opaque failure from the storage backend; the message is preserved.
  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

impl Error {
  /// Box a backend error into [`Error::Store`].
  pub fn store<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Store(Box::new(e))
  }
}

fn owner_suffix(owner_id: &Option<String>) -> String {
  owner_id
    .as_deref()
    .map(|o| format!(" (owner {o})"))
    .unwrap_or_default()
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
