//! The declarative profile schema.
//!
//! One ordered table of descriptors drives both directions of the
//! nested ⇄ flat transform and fixes the priority order used when inverting
//! mappings. Flat keys follow a fixed naming scheme:
//!
//! | Shape | Flat key | Example |
//! |-------|----------|---------|
//! | top-level scalar | `<field>` | `firstName` |
//! | scalar in a record | `<group>_<field>` | `address_city` |
//! | list of scalars | `<prefix>_<index>` | `skill_0` |
//! | list of records | `<prefix>_<index>_<subfield>` | `education_1_major` |

// ─── Descriptors ─────────────────────────────────────────────────────────────

/// How a scalar slot is typed once flattened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
  /// Always a string; missing or null becomes `""`.
  Text,
  /// Always a boolean; missing becomes `false`.
  Flag,
}

/// A single scalar slot of the profile.
#[derive(Debug, Clone, Copy)]
pub struct FieldDescriptor {
  /// Enclosing record (`"address"`), or `None` at the top level.
  pub group: Option<&'static str>,
  /// JSON field name inside the enclosing object.
  pub name:  &'static str,
  pub kind:  FieldKind,
}

impl FieldDescriptor {
  /// The flat key for this slot.
  pub fn key(&self) -> String {
    match self.group {
      Some(group) => format!("{group}_{}", self.name),
      None => self.name.to_owned(),
    }
  }
}

/// A profile list flattened by position.
#[derive(Debug, Clone, Copy)]
pub struct RepeatGroup {
  /// Record holding the list (`demographics` for `ethnicity`), or `None`.
  pub group:  Option<&'static str>,
  /// JSON name of the list.
  pub field:  &'static str,
  /// Prefix of every flat key in the group; `skill` for `skills`.
  pub prefix: &'static str,
  /// Subfields of each record. Empty for a list of plain strings.
  pub items:  &'static [FieldDescriptor],
}

impl RepeatGroup {
  pub fn is_scalar_list(&self) -> bool { self.items.is_empty() }

  pub fn item_key(&self, index: usize) -> String {
    format!("{}_{index}", self.prefix)
  }

  pub fn subfield_key(&self, index: usize, sub: &FieldDescriptor) -> String {
    format!("{}_{index}_{}", self.prefix, sub.name)
  }
}

const fn text(group: Option<&'static str>, name: &'static str) -> FieldDescriptor {
  FieldDescriptor { group, name, kind: FieldKind::Text }
}

const fn flag(group: Option<&'static str>, name: &'static str) -> FieldDescriptor {
  FieldDescriptor { group, name, kind: FieldKind::Flag }
}

const ADDRESS: Option<&str> = Some("address");
const DEMOGRAPHICS: Option<&str> = Some("demographics");
const WORK_AUTH: Option<&str> = Some("workAuth");
const SOCIAL: Option<&str> = Some("social");

static FIELDS: &[FieldDescriptor] = &[
  // identity
  text(None, "firstName"),
  text(None, "lastName"),
  text(None, "email"),
  text(None, "phone"),
  text(None, "phoneCountry"),
  text(None, "location"),
  text(None, "dob"),
  // address
  text(ADDRESS, "street"),
  text(ADDRESS, "city"),
  text(ADDRESS, "state"),
  text(ADDRESS, "zipCode"),
  text(ADDRESS, "country"),
  // demographics
  text(DEMOGRAPHICS, "gender"),
  text(DEMOGRAPHICS, "disability"),
  text(DEMOGRAPHICS, "veteran"),
  text(DEMOGRAPHICS, "lgbtq"),
  // work authorization
  text(WORK_AUTH, "usAuth"),
  text(WORK_AUTH, "canadaAuth"),
  text(WORK_AUTH, "ukAuth"),
  text(WORK_AUTH, "sponsorship"),
  // social
  text(SOCIAL, "linkedin"),
  text(SOCIAL, "github"),
  text(SOCIAL, "portfolio"),
  text(SOCIAL, "other"),
];

static EDUCATION: &[FieldDescriptor] = &[
  text(None, "schoolName"),
  text(None, "major"),
  text(None, "degreeType"),
  text(None, "gpa"),
  text(None, "startMonth"),
  text(None, "startYear"),
  text(None, "endMonth"),
  text(None, "endYear"),
];

static EXPERIENCE: &[FieldDescriptor] = &[
  text(None, "company"),
  text(None, "location"),
  text(None, "title"),
  text(None, "type"),
  text(None, "startMonth"),
  text(None, "startYear"),
  text(None, "endMonth"),
  text(None, "endYear"),
  flag(None, "currentJob"),
  text(None, "description"),
];

static REPEATS: &[RepeatGroup] = &[
  RepeatGroup { group: DEMOGRAPHICS, field: "ethnicity", prefix: "ethnicity", items: &[] },
  RepeatGroup { group: None, field: "skills", prefix: "skill", items: &[] },
  RepeatGroup { group: None, field: "education", prefix: "education", items: EDUCATION },
  RepeatGroup { group: None, field: "experience", prefix: "experience", items: EXPERIENCE },
];

// ─── Schema ──────────────────────────────────────────────────────────────────

/// An ordered profile schema: scalar slots first, then repeat groups.
#[derive(Debug, Clone, Copy)]
pub struct ProfileSchema {
  pub fields:  &'static [FieldDescriptor],
  pub repeats: &'static [RepeatGroup],
}

/// The schema of [`crate::profile::Profile`].
pub const PROFILE: ProfileSchema = ProfileSchema { fields: FIELDS, repeats: REPEATS };

/// Position of a flat key in the inversion priority order.
///
/// Scalar slots rank by table position; repeat-group keys rank after every
/// scalar slot, by group, then index, then subfield position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Rank {
  Field(usize),
  Repeat { group: usize, index: usize, item: usize },
}

/// A flat key decoded against a repeat group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RepeatKey<'a> {
  pub group:    usize,
  pub index:    usize,
  /// Subfield name for record lists; `None` for scalar lists.
  pub subfield: Option<&'a str>,
}

impl ProfileSchema {
  /// Decode `key` as `<prefix>_<index>` or `<prefix>_<index>_<subfield>`.
  ///
  /// Only subfields the schema declares are accepted.
  pub fn parse_repeat_key<'a>(&self, key: &'a str) -> Option<RepeatKey<'a>> {
    self.repeats.iter().enumerate().find_map(|(group, rg)| {
      let rest = key.strip_prefix(rg.prefix)?.strip_prefix('_')?;
      let (digits, subfield) = match rest.split_once('_') {
        Some((digits, sub)) => (digits, Some(sub)),
        None => (rest, None),
      };
      if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
      }
      let index = digits.parse().ok()?;
      match subfield {
        None if rg.is_scalar_list() => {}
        Some(sub) if rg.items.iter().any(|d| d.name == sub) => {}
        _ => return None,
      }
      Some(RepeatKey { group, index, subfield })
    })
  }

  /// Priority of `key`, or `None` if the schema does not know it.
  pub fn rank(&self, key: &str) -> Option<Rank> {
    if let Some(pos) = self.fields.iter().position(|d| d.key() == key) {
      return Some(Rank::Field(pos));
    }
    let parsed = self.parse_repeat_key(key)?;
    let item = match parsed.subfield {
      Some(sub) => self.repeats[parsed.group]
        .items
        .iter()
        .position(|d| d.name == sub)?,
      None => 0,
    };
    Some(Rank::Repeat { group: parsed.group, index: parsed.index, item })
  }

  /// Order `entries` for inversion: known keys by [`Rank`], then unknown
  /// keys in input order.
  pub fn priority<'a, T>(
    &self,
    entries: impl IntoIterator<Item = (&'a str, T)>,
  ) -> Vec<(&'a str, T)> {
    let mut ranked: Vec<_> = entries
      .into_iter()
      .map(|(k, v)| (self.rank(k), k, v))
      .collect();
    // stable sort
    ranked.sort_by_key(|(rank, _, _)| (rank.is_none(), *rank));
    ranked.into_iter().map(|(_, k, v)| (k, v)).collect()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn keys_follow_the_naming_scheme() {
    let keys: Vec<String> = PROFILE.fields.iter().map(FieldDescriptor::key).collect();
    assert_eq!(keys[0], "firstName");
    assert!(keys.contains(&"address_city".to_owned()));
    assert!(keys.contains(&"workAuth_usAuth".to_owned()));
    assert!(keys.contains(&"social_linkedin".to_owned()));
  }

  #[test]
  fn flat_keys_are_unique() {
    let mut keys: Vec<String> = PROFILE.fields.iter().map(FieldDescriptor::key).collect();
    let total = keys.len();
    keys.sort();
    keys.dedup();
    assert_eq!(keys.len(), total);
  }

  #[test]
  fn parses_repeat_keys() {
    let skill = PROFILE.parse_repeat_key("skill_3").unwrap();
    assert_eq!(skill.index, 3);
    assert_eq!(skill.subfield, None);

    let edu = PROFILE.parse_repeat_key("education_1_major").unwrap();
    assert_eq!(edu.index, 1);
    assert_eq!(edu.subfield, Some("major"));

    assert!(PROFILE.parse_repeat_key("education_1_shoeSize").is_none());
    assert!(PROFILE.parse_repeat_key("skill_x").is_none());
    assert!(PROFILE.parse_repeat_key("skill_0_major").is_none());
    assert!(PROFILE.parse_repeat_key("skills").is_none());
  }

  #[test]
  fn rank_orders_scalars_before_repeat_groups() {
    let first = PROFILE.rank("firstName").unwrap();
    let city = PROFILE.rank("address_city").unwrap();
    let social = PROFILE.rank("social_other").unwrap();
    let eth = PROFILE.rank("ethnicity_0").unwrap();
    let skill0 = PROFILE.rank("skill_0").unwrap();
    let skill1 = PROFILE.rank("skill_1").unwrap();
    let exp = PROFILE.rank("experience_0_company").unwrap();

    assert!(first < city);
    assert!(city < social);
    assert!(social < eth);
    assert!(eth < skill0);
    assert!(skill0 < skill1);
    assert!(skill1 < exp);
    assert_eq!(PROFILE.rank("favouriteColour"), None);
  }
}
