//! Store-backed operations: capture, profile upkeep, and autofill lookup.
//!
//! Every function here is generic over [`FormStore`] and maps backend
//! failures into [`Error::Store`].

use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::{
  Error, Result,
  flatten::flatten_value,
  invert::{FieldMatch, Inversion, invert},
  mapping::{Capture, InvertedMapping, Mapping, MappingKey, PutOutcome, Versioned},
  merge::merge_mapping,
  profile::{ProfileRecord, ProfileView},
  resolve::{Lookup, resolve},
  store::FormStore,
};

// ─── Policy ──────────────────────────────────────────────────────────────────

/// Knobs for mapping writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WritePolicy {
  /// Require an owner on every capture and partition mappings by it.
  pub owner_scoped: bool,
  /// Compare-and-swap attempts before giving up with [`Error::Conflict`].
  pub max_attempts: u32,
}

impl Default for WritePolicy {
  fn default() -> Self { Self { owner_scoped: true, max_attempts: 3 } }
}

// ─── Capture ─────────────────────────────────────────────────────────────────

/// What a capture wrote.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureOutcome {
  pub mapping:  Mapping,
  pub version:  u64,
  /// `None` when the owner has no stored profile (or there is no owner).
  pub inverted: Option<InvertedMapping>,
  pub matches:  Vec<FieldMatch>,
}

/// Merge `capture` into the stored mapping and refresh the page's inverted
/// mapping from the owner's profile.
///
/// The merge is a read-then-CAS loop. If the inversion step fails the
/// mapping write still stands and the error is returned.
pub async fn capture<S: FormStore>(
  store: &S,
  capture: Capture,
  policy: &WritePolicy,
) -> Result<CaptureOutcome> {
  let Capture { key, fields } = capture;
  let attempts = policy.max_attempts.max(1);

  let mut written = None;
  for attempt in 1..=attempts {
    let current = store.get_mapping(key.clone()).await.map_err(Error::store)?;
    let expected = current.as_ref().map(|v| v.version);
    let next = merge_mapping(current.as_ref().map(|v| &v.doc), &key, &fields, Utc::now());

    match store.put_mapping(next, expected).await.map_err(Error::store)? {
      PutOutcome::Written(v) => {
        written = Some(v);
        break;
      }
      PutOutcome::Conflict => {
        warn!(page_id = %key.page_id, attempt, "mapping changed underneath us; retrying");
      }
    }
  }

  let Some(Versioned { version, doc: mapping }) = written else {
    return Err(Error::Conflict(format!(
      "mapping for {} still contended after {attempts} attempts",
      key.page_id
    )));
  };
  info!(
    page_id = %mapping.page_id,
    owner = ?mapping.owner_id,
    version,
    captured = fields.len(),
    "mapping captured"
  );

  let (inverted, matches) = match mapping.owner_id.as_deref() {
    Some(owner) => match refresh_inverted(store, &mapping, owner).await? {
      Some((inverted, matches)) => (Some(inverted), matches),
      None => (None, Vec::new()),
    },
    None => (None, Vec::new()),
  };

  Ok(CaptureOutcome { mapping, version, inverted, matches })
}

async fn refresh_inverted<S: FormStore>(
  store: &S,
  mapping: &Mapping,
  owner: &str,
) -> Result<Option<(InvertedMapping, Vec<FieldMatch>)>> {
  let Some(profile) = store
    .get_profile(owner.to_owned())
    .await
    .map_err(Error::store)?
  else {
    debug!(owner, "no profile for owner; skipping inversion");
    return Ok(None);
  };

  let Inversion { fields, matches } = invert(mapping, &profile.flat);
  let now = Utc::now();
  let stored = store
    .put_inverted(InvertedMapping {
      page_id: mapping.page_id.clone(),
      fields,
      created_at: now,
      updated_at: now,
    })
    .await
    .map_err(Error::store)?;

  debug!(page_id = %stored.page_id, matched = matches.len(), "inverted mapping stored");
  Ok(Some((stored, matches)))
}

pub async fn get_mapping<S: FormStore>(store: &S, key: MappingKey) -> Result<Versioned<Mapping>> {
  store
    .get_mapping(key.clone())
    .await
    .map_err(Error::store)?
    .ok_or(Error::MappingNotFound { page_id: key.page_id, owner_id: key.owner_id })
}

pub async fn delete_mapping<S: FormStore>(store: &S, key: MappingKey) -> Result<()> {
  if store.delete_mapping(key.clone()).await.map_err(Error::store)? {
    info!(page_id = %key.page_id, owner = ?key.owner_id, "mapping deleted");
    Ok(())
  } else {
    Err(Error::MappingNotFound { page_id: key.page_id, owner_id: key.owner_id })
  }
}

// ─── Profiles ────────────────────────────────────────────────────────────────

/// Flatten a client-supplied profile document and upsert it by email.
pub async fn save_profile<S: FormStore>(store: &S, body: Value) -> Result<ProfileRecord> {
  if !body.is_object() {
    return Err(Error::Validation("profile must be a JSON object".into()));
  }

  let mut flat = flatten_value(&body);
  let email = flat
    .text("email")
    .map(str::trim)
    .filter(|e| !e.is_empty())
    .ok_or_else(|| Error::Validation("missing email".into()))?
    .to_owned();
  flat.insert("email", email.clone().into());

  let now = Utc::now();
  let record = ProfileRecord { email, flat, created_at: now, updated_at: now };
  let saved = store.upsert_profile(record).await.map_err(Error::store)?;

  info!(email = %saved.email, keys = saved.flat.len(), "profile saved");
  Ok(saved)
}

pub async fn get_profile<S: FormStore>(store: &S, email: &str) -> Result<ProfileRecord> {
  let email = email.trim();
  store
    .get_profile(email.to_owned())
    .await
    .map_err(Error::store)?
    .ok_or_else(|| Error::ProfileNotFound(email.to_owned()))
}

pub async fn delete_profile<S: FormStore>(store: &S, email: &str) -> Result<()> {
  let email = email.trim();
  if store.delete_profile(email.to_owned()).await.map_err(Error::store)? {
    info!(email, "profile deleted");
    Ok(())
  } else {
    Err(Error::ProfileNotFound(email.to_owned()))
  }
}

// ─── Autofill ────────────────────────────────────────────────────────────────

/// Resolver output plus, when requested and stored, the owner's profile.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Autofill {
  #[serde(flatten)]
  pub lookup:  Lookup,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub profile: Option<ProfileView>,
}

pub async fn autofill<S: FormStore>(
  store: &S,
  raw_page_id: &str,
  owner: Option<&str>,
) -> Result<Autofill> {
  let lookup = resolve(store, raw_page_id).await?.into_lookup();

  let owner = owner.map(str::trim).filter(|o| !o.is_empty());
  let profile = match owner {
    Some(email) => store
      .get_profile(email.to_owned())
      .await
      .map_err(Error::store)?
      .map(|record| record.view())
      .transpose()?,
    None => None,
  };

  debug!(page_id = %lookup.page_id, found = lookup.found, with_profile = profile.is_some(), "autofill");
  Ok(Autofill { lookup, profile })
}

// ─── Stats ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
  pub profiles:          u64,
  pub mappings:          u64,
  pub inverted_mappings: u64,
}

pub async fn stats<S: FormStore>(store: &S) -> Result<Stats> {
  Ok(Stats {
    profiles:          store.count_profiles().await.map_err(Error::store)?,
    mappings:          store.count_mappings().await.map_err(Error::store)?,
    inverted_mappings: store.count_inverted().await.map_err(Error::store)?,
  })
}
