//! Page-id lookup with same-host fallback.

use serde::Serialize;
use tracing::debug;

use crate::{Error, Fields, Result, mapping::InvertedMapping, store::FormStore};

/// Trim `raw` and undo one layer of percent-encoding.
///
/// Ids that already contain a scheme separator are taken as decoded, so a
/// literal `%` inside a real URL is left alone. Undecodable input is kept.
pub fn normalize_page_id(raw: &str) -> String {
  let trimmed = raw.trim();
  if trimmed.contains("://") {
    return trimmed.to_owned();
  }
  match urlencoding::decode(trimmed) {
    Ok(decoded) => decoded.trim().to_owned(),
    Err(_) => trimmed.to_owned(),
  }
}

/// The host portion of a URL-like page id: the text after `://` up to the
/// first `/`, `?` or `#`.
pub fn host_of(page_id: &str) -> Option<&str> {
  let (_, rest) = page_id.split_once("://")?;
  let end = rest.find(['/', '?', '#']).unwrap_or(rest.len());
  Some(&rest[..end]).filter(|host| !host.is_empty())
}

/// Outcome of [`resolve`].
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
  Exact(InvertedMapping),
  /// No record for the requested id; another page on the same host was used.
  SameHost {
    requested: String,
    mapping:   InvertedMapping,
  },
  /// Nothing matched. `fields` is always empty.
  NotFound { page_id: String, fields: Fields },
}

impl Resolution {
  pub fn is_found(&self) -> bool { !matches!(self, Self::NotFound { .. }) }

  pub fn fields(&self) -> &Fields {
    match self {
      Self::Exact(m) | Self::SameHost { mapping: m, .. } => &m.fields,
      Self::NotFound { fields, .. } => fields,
    }
  }

  /// Flatten into the uniform response shape.
  pub fn into_lookup(self) -> Lookup {
    match self {
      Self::Exact(m) => Lookup {
        page_id:         m.page_id.clone(),
        found:           true,
        matched_page_id: Some(m.page_id),
        fields:          m.fields,
      },
      Self::SameHost { requested, mapping } => Lookup {
        page_id:         requested,
        found:           true,
        matched_page_id: Some(mapping.page_id),
        fields:          mapping.fields,
      },
      Self::NotFound { page_id, fields } => Lookup {
        page_id,
        found: false,
        matched_page_id: None,
        fields,
      },
    }
  }
}

/// Wire form of a [`Resolution`]. Same shape whether or not anything was
/// found.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Lookup {
  pub page_id:         String,
  pub found:           bool,
  pub matched_page_id: Option<String>,
  pub fields:          Fields,
}

/// Find the inverted mapping for `raw_page_id`: exact id first, then the most
/// recently updated record on the same host.
pub async fn resolve<S: FormStore>(store: &S, raw_page_id: &str) -> Result<Resolution> {
  let page_id = normalize_page_id(raw_page_id);
  if page_id.is_empty() {
    return Err(Error::Validation("missing pageId".into()));
  }

  if let Some(found) = store
    .get_inverted(page_id.clone())
    .await
    .map_err(Error::store)?
  {
    return Ok(Resolution::Exact(found));
  }

  if let Some(host) = host_of(&page_id) {
    let nearby = store
      .find_inverted_by_host(host.to_owned())
      .await
      .map_err(Error::store)?;
    if let Some(mapping) = nearby {
      debug!(requested = %page_id, matched = %mapping.page_id, "same-host fallback");
      return Ok(Resolution::SameHost { requested: page_id, mapping });
    }
  }

  debug!(%page_id, "no inverted mapping");
  Ok(Resolution::NotFound { page_id, fields: Fields::new() })
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn host_stops_at_path_query_or_fragment() {
    assert_eq!(host_of("https://jobs.example.com/apply/1"), Some("jobs.example.com"));
    assert_eq!(host_of("https://jobs.example.com?id=3"), Some("jobs.example.com"));
    assert_eq!(host_of("http://localhost:5001#top"), Some("localhost:5001"));
    assert_eq!(host_of("https://"), None);
    assert_eq!(host_of("jobs.example.com/apply"), None);
  }

  #[test]
  fn page_ids_are_trimmed_and_decoded_once() {
    assert_eq!(
      normalize_page_id("  https%3A%2F%2Fjobs.example.com%2Fapply%2F1 "),
      "https://jobs.example.com/apply/1"
    );
    assert_eq!(
      normalize_page_id("https://example.com/search?q=50%25"),
      "https://example.com/search?q=50%25"
    );
    assert_eq!(normalize_page_id("plain-id"), "plain-id");
  }

  #[test]
  fn not_found_lookup_has_uniform_shape() {
    let lookup = Resolution::NotFound {
      page_id: "p".into(),
      fields:  Fields::new(),
    }
    .into_lookup();
    let json = serde_json::to_value(lookup).unwrap();
    assert_eq!(json["pageId"], "p");
    assert_eq!(json["found"], false);
    assert!(json["matchedPageId"].is_null());
    assert_eq!(json["fields"], serde_json::json!({}));
  }
}
