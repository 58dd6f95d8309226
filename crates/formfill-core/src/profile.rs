//! The nested [`Profile`], its flat rendering [`FlatProfile`], and the stored
//! [`ProfileRecord`].

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{
  Deserialize, Deserializer, Serialize, Serializer,
  de::{MapAccess, Visitor},
  ser::SerializeMap,
};

use crate::{FieldValue, Result, flatten, schema::PROFILE};

// ─── Nested profile ──────────────────────────────────────────────────────────

/// A user's canonical personal profile, keyed by `email`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Profile {
  pub first_name:    String,
  pub last_name:     String,
  pub email:         String,
  pub phone:         String,
  pub phone_country: String,
  pub location:      String,
  /// Date of birth as entered, usually `YYYY-MM-DD`.
  pub dob:           String,
  pub address:       Address,
  pub demographics:  Demographics,
  pub work_auth:     WorkAuth,
  pub social:        Social,
  pub skills:        Vec<String>,
  pub education:     Vec<Education>,
  pub experience:    Vec<Experience>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Address {
  pub street:   String,
  pub city:     String,
  pub state:    String,
  pub zip_code: String,
  pub country:  String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Demographics {
  pub gender:     String,
  pub disability: String,
  pub veteran:    String,
  pub lgbtq:      String,
  pub ethnicity:  Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WorkAuth {
  pub us_auth:     String,
  pub canada_auth: String,
  pub uk_auth:     String,
  pub sponsorship: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Social {
  pub linkedin:  String,
  pub github:    String,
  pub portfolio: String,
  pub other:     String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Education {
  pub school_name: String,
  pub major:       String,
  pub degree_type: String,
  pub gpa:         String,
  pub start_month: String,
  pub start_year:  String,
  pub end_month:   String,
  pub end_year:    String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Experience {
  pub company:     String,
  pub location:    String,
  pub title:       String,
  /// Employment type, e.g. "Internship".
  #[serde(rename = "type")]
  pub kind:        String,
  pub start_month: String,
  pub start_year:  String,
  pub end_month:   String,
  pub end_year:    String,
  pub current_job: bool,
  pub description: String,
}

// ─── Flat profile ────────────────────────────────────────────────────────────

/// Single-level key → scalar rendering of a [`Profile`].
///
/// Entries keep insertion order; [`flatten`](crate::flatten::flatten) emits
/// them in schema order. Serialises as a JSON object in that order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlatProfile {
  entries: Vec<(String, FieldValue)>,
}

impl FlatProfile {
  pub fn new() -> Self { Self::default() }

  pub fn with_capacity(n: usize) -> Self {
    Self { entries: Vec::with_capacity(n) }
  }

  /// Set `key`, replacing an existing value in place.
  pub fn insert(&mut self, key: impl Into<String>, value: FieldValue) {
    let key = key.into();
    match self.entries.iter_mut().find(|(k, _)| *k == key) {
      Some(slot) => slot.1 = value,
      None => self.entries.push((key, value)),
    }
  }

  pub fn get(&self, key: &str) -> Option<&FieldValue> {
    self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
  }

  pub fn contains_key(&self, key: &str) -> bool { self.get(key).is_some() }

  pub fn len(&self) -> usize { self.entries.len() }

  pub fn is_empty(&self) -> bool { self.entries.is_empty() }

  pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
    self.entries.iter().map(|(k, v)| (k.as_str(), v))
  }

  pub fn keys(&self) -> impl Iterator<Item = &str> {
    self.entries.iter().map(|(k, _)| k.as_str())
  }

  /// The text value at `key`, if it is one.
  pub fn text(&self, key: &str) -> Option<&str> {
    self.get(key).and_then(FieldValue::as_str)
  }

  /// Entries in inversion priority order: schema-known keys by
  /// [`Rank`](crate::schema::Rank), then unknown keys in insertion order.
  pub fn by_priority(&self) -> Vec<(&str, &FieldValue)> {
    PROFILE.priority(self.iter())
  }
}

impl FromIterator<(String, FieldValue)> for FlatProfile {
  fn from_iter<I: IntoIterator<Item = (String, FieldValue)>>(iter: I) -> Self {
    let mut flat = Self::new();
    for (k, v) in iter {
      flat.insert(k, v);
    }
    flat
  }
}

impl Serialize for FlatProfile {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(Some(self.entries.len()))?;
    for (k, v) in &self.entries {
      map.serialize_entry(k, v)?;
    }
    map.end()
  }
}

impl<'de> Deserialize<'de> for FlatProfile {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    struct FlatVisitor;

    impl<'de> Visitor<'de> for FlatVisitor {
      type Value = FlatProfile;

      fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a flat map of profile keys to scalar values")
      }

      fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<FlatProfile, A::Error> {
        let mut flat = FlatProfile::with_capacity(access.size_hint().unwrap_or(0));
        while let Some((k, v)) = access.next_entry::<String, FieldValue>()? {
          flat.insert(k, v);
        }
        Ok(flat)
      }
    }

    deserializer.deserialize_map(FlatVisitor)
  }
}

// ─── Stored record ───────────────────────────────────────────────────────────

/// The persisted unit for a profile: its flat form plus bookkeeping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileRecord {
  pub email:      String,
  pub flat:       FlatProfile,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl ProfileRecord {
  /// Reconstruct the nested form for display.
  pub fn view(&self) -> Result<ProfileView> {
    Ok(ProfileView {
      profile:    flatten::reconstruct(&self.flat)?,
      created_at: self.created_at,
      updated_at: self.updated_at,
    })
  }
}

/// A nested profile as returned to clients.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileView {
  #[serde(flatten)]
  pub profile:    Profile,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn insert_replaces_in_place() {
    let mut flat = FlatProfile::new();
    flat.insert("firstName", "Ada".into());
    flat.insert("lastName", "Lovelace".into());
    flat.insert("firstName", "Augusta".into());

    let keys: Vec<&str> = flat.keys().collect();
    assert_eq!(keys, ["firstName", "lastName"]);
    assert_eq!(flat.text("firstName"), Some("Augusta"));
  }

  #[test]
  fn json_keeps_entry_order() {
    let flat: FlatProfile = [
      ("skill_0".to_owned(), FieldValue::from("Rust")),
      ("lastName".to_owned(), FieldValue::from("Smith")),
      ("firstName".to_owned(), FieldValue::from("Jo")),
    ]
    .into_iter()
    .collect();

    let text = serde_json::to_string(&flat).unwrap();
    assert_eq!(text, r#"{"skill_0":"Rust","lastName":"Smith","firstName":"Jo"}"#);

    let back: FlatProfile = serde_json::from_str(&text).unwrap();
    assert_eq!(back, flat);
  }

  #[test]
  fn priority_follows_schema_not_insertion() {
    let flat: FlatProfile = [
      ("nickname".to_owned(), FieldValue::from("JJ")),
      ("skill_0".to_owned(), FieldValue::from("Rust")),
      ("lastName".to_owned(), FieldValue::from("Smith")),
      ("firstName".to_owned(), FieldValue::from("Jo")),
    ]
    .into_iter()
    .collect();

    let keys: Vec<&str> = flat.by_priority().into_iter().map(|(k, _)| k).collect();
    assert_eq!(keys, ["firstName", "lastName", "skill_0", "nickname"]);
  }

  #[test]
  fn view_flattens_profile_fields_into_the_top_level() {
    let record = ProfileRecord {
      email:      "jo@example.com".into(),
      flat:       flatten::flatten(&Profile {
        email: "jo@example.com".into(),
        ..Profile::default()
      }),
      created_at: Utc::now(),
      updated_at: Utc::now(),
    };
    let json = serde_json::to_value(record.view().unwrap()).unwrap();
    assert_eq!(json["email"], "jo@example.com");
    assert!(json.get("createdAt").is_some());
    assert!(json.get("profile").is_none());
  }
}
