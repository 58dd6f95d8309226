//! Merge-upsert of captured fields.

use chrono::{DateTime, Utc};

use crate::{
  Fields,
  mapping::{Mapping, MappingKey},
};

/// Shallow union of `existing` and `incoming`; incoming wins per key and keys
/// it does not mention are kept unchanged.
pub fn merge(existing: Option<&Fields>, incoming: &Fields) -> Fields {
  let mut merged = existing.cloned().unwrap_or_default();
  merged.extend(incoming.iter().map(|(k, v)| (k.clone(), v.clone())));
  merged
}

/// `(created_at, updated_at)` for a write at `now`: creation time is kept from
/// an existing document and only stamped when there is none.
pub fn stamp(
  existing: Option<DateTime<Utc>>,
  now: DateTime<Utc>,
) -> (DateTime<Utc>, DateTime<Utc>) {
  (existing.unwrap_or(now), now)
}

/// Build the next version of a mapping document.
pub fn merge_mapping(
  existing: Option<&Mapping>,
  key: &MappingKey,
  incoming: &Fields,
  now: DateTime<Utc>,
) -> Mapping {
  let (created_at, updated_at) = stamp(existing.map(|m| m.created_at), now);
  Mapping {
    page_id: key.page_id.clone(),
    owner_id: key.owner_id.clone(),
    fields: merge(existing.map(|m| &m.fields), incoming),
    created_at,
    updated_at,
  }
}
