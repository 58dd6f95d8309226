//! Bidirectional transform between a nested [`Profile`] and a [`FlatProfile`].
//!
//! Both directions walk [`schema::PROFILE`](crate::schema::PROFILE); no
//! per-field logic lives here. Fields outside the schema are dropped.

use std::collections::BTreeSet;

use serde_json::{Map, Value};

use crate::{
  FieldValue, Result,
  profile::{FlatProfile, Profile},
  schema::{FieldDescriptor, FieldKind, PROFILE, RepeatGroup},
};

/// How [`reconstruct_with`] treats a hole in a repeat group's indices.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum GapPolicy {
  /// Scan index 0, 1, 2, … and stop at the first missing index. Entries past
  /// a hole are silently dropped.
  #[default]
  StopAtGap,
  /// Keep every populated index in ascending order, closing holes.
  Compact,
}

// ─── Flatten ─────────────────────────────────────────────────────────────────

/// Flatten a typed profile.
pub fn flatten(profile: &Profile) -> FlatProfile {
  // A derived `Serialize` on a struct of strings cannot fail.
  let root = serde_json::to_value(profile).unwrap_or_default();
  flatten_value(&root)
}

/// Flatten loosely-typed profile JSON as sent by a client.
///
/// Missing groups and fields become `""` (or `false` for flags); a bare
/// string where a list of strings is expected counts as a one-element list.
pub fn flatten_value(root: &Value) -> FlatProfile {
  let mut flat = FlatProfile::with_capacity(PROFILE.fields.len());

  for field in PROFILE.fields {
    let raw = lookup(root, field.group, field.name);
    flat.insert(field.key(), coerce(raw, field.kind));
  }

  for group in PROFILE.repeats {
    let items = list_at(lookup(root, group.group, group.field));
    for (index, item) in items.iter().enumerate() {
      if group.is_scalar_list() {
        flat.insert(group.item_key(index), coerce(Some(item), FieldKind::Text));
      } else {
        for sub in group.items {
          flat.insert(
            group.subfield_key(index, sub),
            coerce(item.get(sub.name), sub.kind),
          );
        }
      }
    }
  }

  flat
}

fn lookup<'a>(root: &'a Value, group: Option<&str>, name: &str) -> Option<&'a Value> {
  match group {
    Some(group) => root.get(group)?.get(name),
    None => root.get(name),
  }
}

fn list_at(value: Option<&Value>) -> &[Value] {
  match value {
    Some(Value::Array(items)) => items,
    Some(single @ Value::String(s)) if !s.is_empty() => std::slice::from_ref(single),
    _ => &[],
  }
}

fn coerce(raw: Option<&Value>, kind: FieldKind) -> FieldValue {
  match kind {
    FieldKind::Text => FieldValue::Text(match raw {
      Some(Value::String(s)) => s.clone(),
      Some(Value::Number(n)) => n.to_string(),
      Some(Value::Bool(b)) => b.to_string(),
      _ => String::new(),
    }),
    FieldKind::Flag => FieldValue::Bool(match raw {
      Some(Value::Bool(b)) => *b,
      Some(Value::String(s)) => is_truthy(s),
      Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
      _ => false,
    }),
  }
}

fn is_truthy(s: &str) -> bool {
  matches!(s.trim().to_ascii_lowercase().as_str(), "true" | "on" | "yes" | "1")
}

// ─── Reconstruct ─────────────────────────────────────────────────────────────

/// Rebuild the nested profile, stopping each repeat group at its first hole.
pub fn reconstruct(flat: &FlatProfile) -> Result<Profile> {
  reconstruct_with(flat, GapPolicy::StopAtGap)
}

/// Rebuild the nested profile under an explicit [`GapPolicy`].
pub fn reconstruct_with(flat: &FlatProfile, gaps: GapPolicy) -> Result<Profile> {
  let mut root = Map::new();

  for field in PROFILE.fields {
    let value = to_json(flat.get(&field.key()), field.kind);
    place(&mut root, field.group, field.name, value);
  }

  for (position, group) in PROFILE.repeats.iter().enumerate() {
    let items = populated_indices(flat, position, gaps)
      .into_iter()
      .map(|index| rebuild_item(flat, group, index))
      .collect();
    place(&mut root, group.group, group.field, Value::Array(items));
  }

  Ok(serde_json::from_value(Value::Object(root))?)
}

fn populated_indices(flat: &FlatProfile, group: usize, gaps: GapPolicy) -> Vec<usize> {
  let present: BTreeSet<usize> = flat
    .keys()
    .filter_map(|k| PROFILE.parse_repeat_key(k))
    .filter(|rk| rk.group == group)
    .map(|rk| rk.index)
    .collect();

  match gaps {
    GapPolicy::StopAtGap => (0..).take_while(|i| present.contains(i)).collect(),
    GapPolicy::Compact => present.into_iter().collect(),
  }
}

fn rebuild_item(flat: &FlatProfile, group: &RepeatGroup, index: usize) -> Value {
  if group.is_scalar_list() {
    return to_json(flat.get(&group.item_key(index)), FieldKind::Text);
  }
  let record: Map<String, Value> = group
    .items
    .iter()
    .map(|sub: &FieldDescriptor| {
      let value = to_json(flat.get(&group.subfield_key(index, sub)), sub.kind);
      (sub.name.to_owned(), value)
    })
    .collect();
  Value::Object(record)
}

fn to_json(value: Option<&FieldValue>, kind: FieldKind) -> Value {
  match kind {
    FieldKind::Text => Value::String(value.and_then(FieldValue::render).unwrap_or_default()),
    FieldKind::Flag => Value::Bool(match value {
      Some(FieldValue::Bool(b)) => *b,
      Some(FieldValue::Text(s)) => is_truthy(s),
      Some(FieldValue::Integer(i)) => *i != 0,
      _ => false,
    }),
  }
}

fn place(root: &mut Map<String, Value>, group: Option<&str>, name: &str, value: Value) {
  let target = match group {
    Some(group) => {
      let slot = root
        .entry(group.to_owned())
        .or_insert_with(|| Value::Object(Map::new()));
      match slot {
        Value::Object(map) => map,
        _ => return,
      }
    }
    None => root,
  };
  target.insert(name.to_owned(), value);
}
