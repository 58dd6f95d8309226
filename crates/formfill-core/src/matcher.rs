//! Scalar equivalence under date and case normalization.
//!
//! Rules, in order:
//! 1. If either side is a timestamp, both sides are reduced to a
//!    `YYYY-MM-DD` calendar date (time of day is discarded).
//! 2. Two non-null values match on exact equality, or failing that on
//!    case-insensitive equality of their string renderings.
//! 3. Null never matches anything, including null.

use chrono::{DateTime, NaiveDate, NaiveDateTime};

use crate::FieldValue;

const DATE_FORMAT: &str = "%Y-%m-%d";

const NAIVE_DATETIME_FORMATS: &[&str] = &[
  "%Y-%m-%dT%H:%M:%S%.f",
  "%Y-%m-%dT%H:%M",
  "%Y-%m-%d %H:%M:%S%.f",
  "%Y-%m-%d %H:%M",
];

/// Whether `a` and `b` denote the same value.
pub fn equivalent(a: &FieldValue, b: &FieldValue) -> bool {
  if a.is_null() || b.is_null() || !a.is_scalar() || !b.is_scalar() {
    return false;
  }

  if timestamp_date(a).is_some() || timestamp_date(b).is_some() {
    return match (calendar_form(a), calendar_form(b)) {
      (Some(x), Some(y)) => x.to_lowercase() == y.to_lowercase(),
      _ => false,
    };
  }

  if a == b {
    return true;
  }

  match (a.render(), b.render()) {
    (Some(x), Some(y)) => x.to_lowercase() == y.to_lowercase(),
    _ => false,
  }
}

/// The calendar date of a timestamp value.
///
/// Text counts as a timestamp only when it carries a time of day; a bare
/// `YYYY-MM-DD` is a plain string.
pub fn timestamp_date(value: &FieldValue) -> Option<NaiveDate> {
  match value {
    FieldValue::Timestamp(ts) => Some(ts.date_naive()),
    FieldValue::Text(s) => parse_timestamp(s.trim()),
    _ => None,
  }
}

fn parse_timestamp(s: &str) -> Option<NaiveDate> {
  if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
    return Some(dt.date_naive());
  }
  NAIVE_DATETIME_FORMATS
    .iter()
    .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
    .map(|dt| dt.date())
}

/// Rendering used once a timestamp is involved: a date where one can be
/// read, the plain rendering otherwise.
fn calendar_form(value: &FieldValue) -> Option<String> {
  if let Some(date) = timestamp_date(value) {
    return Some(date.format(DATE_FORMAT).to_string());
  }
  let rendered = value.render()?;
  let leading_date = rendered
    .trim()
    .get(..10)
    .and_then(|prefix| NaiveDate::parse_from_str(prefix, DATE_FORMAT).ok());
  Some(match leading_date {
    Some(date) => date.format(DATE_FORMAT).to_string(),
    None => rendered,
  })
}
