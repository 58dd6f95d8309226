//! The `FormStore` trait: the document-store collaborator.
//!
//! Three collections live behind it: profiles keyed by email, mappings keyed
//! by [`MappingKey`], and inverted mappings keyed by page id. Backends
//! (e.g. `formfill-store-sqlite`) provide atomic single-document writes;
//! mappings additionally get a version-checked compare-and-swap.

use std::future::Future;

use crate::{
  mapping::{InvertedMapping, Mapping, MappingKey, PutOutcome, Versioned},
  profile::ProfileRecord,
};

/// Abstraction over a formfill storage backend.
///
/// All methods return `Send` futures so the trait can be used behind `axum`
/// on a multi-threaded runtime.
pub trait FormStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Profiles ──────────────────────────────────────────────────────────

  /// Insert or replace the profile keyed by `record.email`.
  ///
  /// The stored `created_at` of an existing record is kept; the returned
  /// record reflects what was persisted.
  fn upsert_profile(
    &self,
    record: ProfileRecord,
  ) -> impl Future<Output = Result<ProfileRecord, Self::Error>> + Send + '_;

  fn get_profile(
    &self,
    email: String,
  ) -> impl Future<Output = Result<Option<ProfileRecord>, Self::Error>> + Send + '_;

  /// Case-insensitive substring search over first name, last name and email.
  fn search_profiles(
    &self,
    text: String,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<ProfileRecord>, Self::Error>> + Send + '_;

  /// Returns `false` if nothing was stored under `email`.
  fn delete_profile(
    &self,
    email: String,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  fn count_profiles(&self) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  /// Most recently updated first.
  fn recent_profiles(
    &self,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<ProfileRecord>, Self::Error>> + Send + '_;

  // ── Mappings ──────────────────────────────────────────────────────────

  fn get_mapping(
    &self,
    key: MappingKey,
  ) -> impl Future<Output = Result<Option<Versioned<Mapping>>, Self::Error>> + Send + '_;

  /// Compare-and-swap write.
  ///
  /// With `expected = None` the write only succeeds if no document exists
  /// under the mapping's key; with `Some(v)` only if the stored version is
  /// still `v`. Anything else yields [`PutOutcome::Conflict`].
  fn put_mapping(
    &self,
    mapping: Mapping,
    expected: Option<u64>,
  ) -> impl Future<Output = Result<PutOutcome, Self::Error>> + Send + '_;

  /// Returns `false` if nothing was stored under `key`.
  fn delete_mapping(
    &self,
    key: MappingKey,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  fn count_mappings(&self) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  /// Most recently created first.
  fn recent_mappings(
    &self,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<Mapping>, Self::Error>> + Send + '_;

  fn list_mappings(&self) -> impl Future<Output = Result<Vec<Mapping>, Self::Error>> + Send + '_;

  // ── Inverted mappings ─────────────────────────────────────────────────

  /// Insert or replace the inverted mapping for `inverted.page_id`, keeping
  /// an existing `created_at`.
  fn put_inverted(
    &self,
    inverted: InvertedMapping,
  ) -> impl Future<Output = Result<InvertedMapping, Self::Error>> + Send + '_;

  fn get_inverted(
    &self,
    page_id: String,
  ) -> impl Future<Output = Result<Option<InvertedMapping>, Self::Error>> + Send + '_;

  /// The most recently updated inverted mapping whose page id contains
  /// `host`.
  fn find_inverted_by_host(
    &self,
    host: String,
  ) -> impl Future<Output = Result<Option<InvertedMapping>, Self::Error>> + Send + '_;

  fn list_inverted(
    &self,
  ) -> impl Future<Output = Result<Vec<InvertedMapping>, Self::Error>> + Send + '_;

  fn count_inverted(&self) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;
}
