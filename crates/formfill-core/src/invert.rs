//! Turning a concrete [`Mapping`] into a symbolic one.
//!
//! Each captured value is replaced by the name of the first profile field,
//! in priority order, whose value is [`equivalent`]. Unmatched values are
//! kept as captured.

use serde::Serialize;

use crate::{
  FieldValue, Fields,
  mapping::Mapping,
  matcher::equivalent,
  profile::FlatProfile,
};

/// Reserved key identifying the capturing user. Never carried into an
/// inverted mapping.
pub const OWNER_KEY: &str = "ownerId";

/// A field locator that was resolved to a profile key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldMatch {
  pub locator:     String,
  pub profile_key: String,
}

/// Output of [`invert`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Inversion {
  pub fields:  Fields,
  /// Matched locators, in locator order.
  pub matches: Vec<FieldMatch>,
}

impl Inversion {
  pub fn matched(&self) -> usize { self.matches.len() }
}

pub fn invert(mapping: &Mapping, profile: &FlatProfile) -> Inversion {
  invert_fields(&mapping.fields, profile)
}

/// Greedy first-match inversion of a bare field map.
pub fn invert_fields(fields: &Fields, profile: &FlatProfile) -> Inversion {
  let candidates: Vec<(&str, &FieldValue)> = profile
    .by_priority()
    .into_iter()
    .filter(|(_, v)| v.is_scalar())
    .collect();

  let mut out = Inversion::default();
  for (locator, captured) in fields {
    if locator == OWNER_KEY {
      continue;
    }
    let hit = captured
      .is_scalar()
      .then(|| candidates.iter().find(|(_, v)| equivalent(v, captured)))
      .flatten();
    match hit {
      Some((key, _)) => {
        out.fields.insert(locator.clone(), FieldValue::text(*key));
        out.matches.push(FieldMatch {
          locator:     locator.clone(),
          profile_key: (*key).to_owned(),
        });
      }
      None => {
        out.fields.insert(locator.clone(), captured.clone());
      }
    }
  }
  out
}
