//! Captured mappings, their inverted (symbolic) form, and the write request
//! the extension sends.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, FieldValue, Fields, Result, invert::OWNER_KEY, resolve::normalize_page_id};

// ─── Keys ────────────────────────────────────────────────────────────────────

/// Identity of a [`Mapping`] document.
///
/// `owner_id` is `None` for the unpartitioned variant, where one mapping is
/// shared by every caller of a page.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MappingKey {
  pub page_id:  String,
  pub owner_id: Option<String>,
}

impl MappingKey {
  pub fn new(page_id: impl Into<String>, owner_id: Option<String>) -> Self {
    Self { page_id: page_id.into(), owner_id }
  }

  /// Build a key from raw request parameters. The page id is normalized and
  /// must be non-empty; `owner_scoped` makes the owner mandatory.
  pub fn parse(
    page_id: Option<&str>,
    owner_id: Option<String>,
    owner_scoped: bool,
  ) -> Result<Self> {
    let page_id = page_id
      .map(normalize_page_id)
      .filter(|p| !p.is_empty())
      .ok_or_else(|| Error::Validation("missing pageId".into()))?;

    let owner_id = non_blank(owner_id);
    if owner_scoped && owner_id.is_none() {
      return Err(Error::Validation("missing ownerId".into()));
    }
    Ok(Self { page_id, owner_id })
  }
}

// ─── Documents ───────────────────────────────────────────────────────────────

/// Field locator → literal captured value for one page (and owner).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mapping {
  pub page_id:    String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub owner_id:   Option<String>,
  pub fields:     Fields,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl Mapping {
  pub fn key(&self) -> MappingKey {
    MappingKey::new(self.page_id.clone(), self.owner_id.clone())
  }
}

/// Field locator → profile field name (or the literal, when nothing matched).
///
/// Keyed by page alone; the latest write for a page wins regardless of owner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvertedMapping {
  pub page_id:    String,
  pub fields:     Fields,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

/// A document paired with the store's optimistic-concurrency version.
#[derive(Debug, Clone, PartialEq)]
pub struct Versioned<T> {
  pub version: u64,
  pub doc:     T,
}

/// Result of a compare-and-swap write.
#[derive(Debug, Clone, PartialEq)]
pub enum PutOutcome {
  Written(Versioned<Mapping>),
  /// The stored version no longer matched the expected one.
  Conflict,
}

// ─── Capture request ─────────────────────────────────────────────────────────

/// Body of a capture write. `url` and `mapping` are accepted as aliases for
/// older extension builds.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureRequest {
  #[serde(alias = "url")]
  pub page_id:  Option<String>,
  pub owner_id: Option<String>,
  #[serde(alias = "mapping")]
  pub fields:   Option<Fields>,
}

/// A validated [`CaptureRequest`].
#[derive(Debug, Clone, PartialEq)]
pub struct Capture {
  pub key:    MappingKey,
  pub fields: Fields,
}

impl CaptureRequest {
  /// Check required fields. `owner_scoped` makes `ownerId` mandatory.
  ///
  /// An owner carried inside `fields` under [`OWNER_KEY`] is used when the
  /// body has none of its own.
  pub fn validate(self, owner_scoped: bool) -> Result<Capture> {
    let fields = self
      .fields
      .ok_or_else(|| Error::Validation("missing fields".into()))?;

    let owner_id = non_blank(self.owner_id).or_else(|| {
      fields.get(OWNER_KEY).and_then(FieldValue::as_str).map(str::to_owned)
    });
    let key = MappingKey::parse(self.page_id.as_deref(), owner_id, owner_scoped)?;

    Ok(Capture { key, fields })
  }
}

/// Trim, treating an empty string as absent.
pub fn non_blank(s: Option<String>) -> Option<String> {
  s.map(|s| s.trim().to_owned()).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  fn request(body: serde_json::Value) -> CaptureRequest {
    serde_json::from_value(body).unwrap()
  }

  #[test]
  fn accepts_legacy_field_names() {
    let capture = request(json!({
      "url": "https://jobs.example.com/apply/1",
      "mapping": { "//input[@id='fn']": "John" },
    }))
    .validate(false)
    .unwrap();

    assert_eq!(capture.key.page_id, "https://jobs.example.com/apply/1");
    assert_eq!(capture.key.owner_id, None);
    assert_eq!(capture.fields.len(), 1);
  }

  #[test]
  fn missing_page_id_is_rejected() {
    let err = request(json!({ "fields": {}, "ownerId": "a@b.c" }))
      .validate(true)
      .unwrap_err();
    assert!(matches!(err, Error::Validation(ref m) if m.contains("pageId")));

    let err = request(json!({ "pageId": "  ", "fields": {}, "ownerId": "a@b.c" }))
      .validate(true)
      .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
  }

  #[test]
  fn missing_fields_is_rejected() {
    let err = request(json!({ "pageId": "p", "ownerId": "a@b.c" }))
      .validate(true)
      .unwrap_err();
    assert!(matches!(err, Error::Validation(ref m) if m.contains("fields")));
  }

  #[test]
  fn owner_required_only_when_scoped() {
    let body = json!({ "pageId": "p", "fields": {} });
    assert!(request(body.clone()).validate(false).is_ok());
    let err = request(body).validate(true).unwrap_err();
    assert!(matches!(err, Error::Validation(ref m) if m.contains("ownerId")));
  }

  #[test]
  fn owner_can_ride_inside_fields() {
    let capture = request(json!({
      "pageId": "p",
      "fields": { "ownerId": " jo@example.com ", "//input": "Jo" },
    }))
    .validate(true)
    .unwrap();
    assert_eq!(capture.key.owner_id.as_deref(), Some("jo@example.com"));
  }

  #[test]
  fn owner_id_is_omitted_from_json_when_absent() {
    let now = Utc::now();
    let mapping = Mapping {
      page_id:    "p".into(),
      owner_id:   None,
      fields:     Fields::new(),
      created_at: now,
      updated_at: now,
    };
    let json = serde_json::to_value(&mapping).unwrap();
    assert!(json.get("ownerId").is_none());
    assert_eq!(json["pageId"], "p");
  }
}
