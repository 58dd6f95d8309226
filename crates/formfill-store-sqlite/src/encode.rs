//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are fixed-width RFC 3339 strings (microseconds, `Z`) so that
//! lexical order is chronological order. Field maps and flat profiles are
//! compact JSON.

use chrono::{DateTime, SecondsFormat, Utc};
use formfill_core::{
  Fields,
  mapping::{InvertedMapping, Mapping, Versioned},
  profile::{FlatProfile, ProfileRecord},
};

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(format!("{s:?}: {e}")))
}

// ─── Owner ───────────────────────────────────────────────────────────────────

pub fn encode_owner(owner: Option<&str>) -> String { owner.unwrap_or_default().to_owned() }

pub fn decode_owner(s: String) -> Option<String> { Some(s).filter(|s| !s.is_empty()) }

// ─── Search text ─────────────────────────────────────────────────────────────

/// Case-fold `s` for the `*_fold` search columns and search terms.
pub fn fold(s: &str) -> String { s.trim().to_lowercase() }

// ─── JSON columns ────────────────────────────────────────────────────────────

pub fn encode_fields(fields: &Fields) -> Result<String> { Ok(serde_json::to_string(fields)?) }

pub fn decode_fields(s: &str) -> Result<Fields> { Ok(serde_json::from_str(s)?) }

pub fn encode_flat(flat: &FlatProfile) -> Result<String> { Ok(serde_json::to_string(flat)?) }

pub fn decode_flat(s: &str) -> Result<FlatProfile> { Ok(serde_json::from_str(s)?) }

// ─── Raw rows ────────────────────────────────────────────────────────────────

pub const PROFILE_COLUMNS: &str = "email, flat_json, created_at, updated_at";

/// Raw strings read directly from a `profiles` row.
pub struct RawProfile {
  pub email:      String,
  pub flat_json:  String,
  pub created_at: String,
  pub updated_at: String,
}

impl RawProfile {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      email:      row.get(0)?,
      flat_json:  row.get(1)?,
      created_at: row.get(2)?,
      updated_at: row.get(3)?,
    })
  }

  pub fn into_record(self) -> Result<ProfileRecord> {
    Ok(ProfileRecord {
      email:      self.email,
      flat:       decode_flat(&self.flat_json)?,
      created_at: decode_dt(&self.created_at)?,
      updated_at: decode_dt(&self.updated_at)?,
    })
  }
}

pub const MAPPING_COLUMNS: &str =
  "page_id, owner_id, fields_json, version, created_at, updated_at";

/// Raw values read directly from a `mappings` row.
pub struct RawMapping {
  pub page_id:     String,
  pub owner_id:    String,
  pub fields_json: String,
  pub version:     i64,
  pub created_at:  String,
  pub updated_at:  String,
}

impl RawMapping {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      page_id:     row.get(0)?,
      owner_id:    row.get(1)?,
      fields_json: row.get(2)?,
      version:     row.get(3)?,
      created_at:  row.get(4)?,
      updated_at:  row.get(5)?,
    })
  }

  pub fn into_versioned(self) -> Result<Versioned<Mapping>> {
    Ok(Versioned {
      version: self.version.max(0) as u64,
      doc:     Mapping {
        page_id:    self.page_id,
        owner_id:   decode_owner(self.owner_id),
        fields:     decode_fields(&self.fields_json)?,
        created_at: decode_dt(&self.created_at)?,
        updated_at: decode_dt(&self.updated_at)?,
      },
    })
  }

  pub fn into_mapping(self) -> Result<Mapping> { Ok(self.into_versioned()?.doc) }
}

pub const INVERTED_COLUMNS: &str = "page_id, fields_json, created_at, updated_at";

/// Raw strings read directly from an `inverted_mappings` row.
pub struct RawInverted {
  pub page_id:     String,
  pub fields_json: String,
  pub created_at:  String,
  pub updated_at:  String,
}

impl RawInverted {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      page_id:     row.get(0)?,
      fields_json: row.get(1)?,
      created_at:  row.get(2)?,
      updated_at:  row.get(3)?,
    })
  }

  pub fn into_inverted(self) -> Result<InvertedMapping> {
    Ok(InvertedMapping {
      page_id:    self.page_id,
      fields:     decode_fields(&self.fields_json)?,
      created_at: decode_dt(&self.created_at)?,
      updated_at: decode_dt(&self.updated_at)?,
    })
  }
}
