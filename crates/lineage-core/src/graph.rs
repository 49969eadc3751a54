//! The entity graph: people, families, events and the edges between them.
//!
//! The graph is persisted by a storage backend; this crate only reasons over
//! it. Raw date and place fields are kept exactly as imported. Derived values
//! (canonical dates, place references) live alongside them and are only
//! written by remediation operations.

use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};
use uuid::Uuid;

// ─── Entity kinds ────────────────────────────────────────────────────────────

/// Every kind of row the engine can reference by id.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  PartialOrd,
  Ord,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EntityKind {
  Person,
  Family,
  Event,
  Place,
  MediaAsset,
  MediaLink,
  Note,
  Issue,
  Action,
}

// ─── Person ──────────────────────────────────────────────────────────────────

/// An individual. Dates and places are free text as imported.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Person {
  pub id:          Uuid,
  /// External cross-reference (e.g. a GEDCOM `@I1@`); unique when present.
  pub xref:        Option<String>,
  pub given:       Option<String>,
  pub surname:     Option<String>,
  pub sex:         Option<String>,
  pub birth_date:  Option<String>,
  pub birth_place: Option<String>,
  pub death_date:  Option<String>,
  pub death_place: Option<String>,
}

impl Person {
  /// A blank person with a fresh id.
  pub fn new() -> Self {
    Self { id: Uuid::new_v4(), ..Default::default() }
  }

  /// `"given surname"`, skipping missing parts.
  pub fn display_name(&self) -> String {
    [self.given.as_deref(), self.surname.as_deref()]
      .into_iter()
      .flatten()
      .map(str::trim)
      .filter(|s| !s.is_empty())
      .collect::<Vec<_>>()
      .join(" ")
  }

  pub fn field(&self, field: PersonField) -> Option<&str> {
    match field {
      PersonField::Xref => self.xref.as_deref(),
      PersonField::Given => self.given.as_deref(),
      PersonField::Surname => self.surname.as_deref(),
      PersonField::Sex => self.sex.as_deref(),
      PersonField::BirthDate => self.birth_date.as_deref(),
      PersonField::BirthPlace => self.birth_place.as_deref(),
      PersonField::DeathDate => self.death_date.as_deref(),
      PersonField::DeathPlace => self.death_place.as_deref(),
    }
  }

  pub fn field_mut(&mut self, field: PersonField) -> &mut Option<String> {
    match field {
      PersonField::Xref => &mut self.xref,
      PersonField::Given => &mut self.given,
      PersonField::Surname => &mut self.surname,
      PersonField::Sex => &mut self.sex,
      PersonField::BirthDate => &mut self.birth_date,
      PersonField::BirthPlace => &mut self.birth_place,
      PersonField::DeathDate => &mut self.death_date,
      PersonField::DeathPlace => &mut self.death_place,
    }
  }
}

/// The scalar columns of a [`Person`]. The string form is the column name.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  AsRefStr,
  EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PersonField {
  Xref,
  Given,
  Surname,
  Sex,
  BirthDate,
  BirthPlace,
  DeathDate,
  DeathPlace,
}

// ─── Family ──────────────────────────────────────────────────────────────────

/// A couple and their children. Spouse references are nullified (not
/// cascaded) when a person is deleted outside a merge.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Family {
  pub id:             Uuid,
  pub xref:           Option<String>,
  pub husband_id:     Option<Uuid>,
  pub wife_id:        Option<Uuid>,
  pub marriage_date:  Option<String>,
  pub marriage_place: Option<String>,
}

impl Family {
  pub fn new() -> Self {
    Self { id: Uuid::new_v4(), ..Default::default() }
  }

  /// The spouse ids that are present.
  pub fn spouses(&self) -> impl Iterator<Item = Uuid> + '_ {
    self.husband_id.into_iter().chain(self.wife_id)
  }
}

/// The columns a family merge may back-fill on the surviving family.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FamilyField {
  Xref,
  HusbandId,
  WifeId,
  MarriageDate,
  MarriagePlace,
}

// ─── Events ──────────────────────────────────────────────────────────────────

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Default,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum EventType {
  Birth,
  Death,
  Marriage,
  Divorce,
  Census,
  Residence,
  Occupation,
  Immigration,
  Emigration,
  Naturalization,
  #[default]
  Other,
}

/// A dated, placed occurrence belonging to a person or a family (never both).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Event {
  pub id:             Uuid,
  pub event_type:     EventType,
  pub person_id:      Option<Uuid>,
  pub family_id:      Option<Uuid>,
  pub date_raw:       Option<String>,
  pub place_raw:      Option<String>,
  /// Derived from a confirmed date normalization; never parsed implicitly.
  pub date_canonical: Option<NaiveDate>,
  pub place_id:       Option<Uuid>,
  pub description:    Option<String>,
}

impl Event {
  pub fn new(event_type: EventType) -> Self {
    Self { id: Uuid::new_v4(), event_type, ..Default::default() }
  }
}

// ─── Places ──────────────────────────────────────────────────────────────────

/// The authoritative spelling for a set of place strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Place {
  pub id:           Uuid,
  pub name:         String,
  /// Identifier in an external gazetteer, if known.
  pub authority_id: Option<String>,
  pub latitude:     Option<f64>,
  pub longitude:    Option<f64>,
}

/// A literal spelling mapped onto a canonical [`Place`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceVariant {
  pub id:       Uuid,
  pub place_id: Uuid,
  pub name:     String,
}

// ─── Media ───────────────────────────────────────────────────────────────────

/// A content-addressed media file. Only metadata lives in the store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MediaAsset {
  pub id:                Uuid,
  pub path:              String,
  /// Lowercase hex SHA-256 of the file bytes; unique.
  pub sha256:            String,
  pub original_filename: Option<String>,
  pub mime_type:         Option<String>,
  pub size_bytes:        Option<i64>,
}

impl MediaAsset {
  pub fn new(path: impl Into<String>, sha256: impl Into<String>) -> Self {
    Self {
      id: Uuid::new_v4(),
      path: path.into(),
      sha256: sha256.into(),
      ..Default::default()
    }
  }
}

/// Attachment of an asset to a person and/or family.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MediaLink {
  pub id:          Uuid,
  pub asset_id:    Uuid,
  pub person_id:   Option<Uuid>,
  pub family_id:   Option<Uuid>,
  pub description: Option<String>,
}

impl MediaLink {
  pub fn new(asset_id: Uuid) -> Self {
    Self { id: Uuid::new_v4(), asset_id, ..Default::default() }
  }

  /// The identity two links must share to be exact duplicates.
  pub fn target(&self) -> (Uuid, Option<Uuid>, Option<Uuid>) {
    (self.asset_id, self.person_id, self.family_id)
  }
}

/// Where an asset stands, derived from links and file presence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaStatus {
  Linked,
  Unassigned,
  Missing,
}

impl MediaStatus {
  pub fn derive(has_links: bool, file_present: bool) -> Self {
    match (file_present, has_links) {
      (false, _) => Self::Missing,
      (true, true) => Self::Linked,
      (true, false) => Self::Unassigned,
    }
  }
}

// ─── Notes ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Note {
  pub id:        Uuid,
  pub person_id: Option<Uuid>,
  pub family_id: Option<Uuid>,
  pub text:      String,
}

impl Note {
  pub fn new(text: impl Into<String>) -> Self {
    Self { id: Uuid::new_v4(), text: text.into(), ..Default::default() }
  }
}

// ─── Edges ───────────────────────────────────────────────────────────────────

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Default,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum RelType {
  #[default]
  Parent,
}

/// A directed parentage edge; unique per `(parent, child, rel_type)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Relationship {
  pub parent_id: Uuid,
  pub child_id:  Uuid,
  pub rel_type:  RelType,
}

impl Relationship {
  pub fn parent(parent_id: Uuid, child_id: Uuid) -> Self {
    Self { parent_id, child_id, rel_type: RelType::Parent }
  }
}

/// Membership of a child in a family; authoritative for family membership.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FamilyChild {
  pub family_id: Uuid,
  pub child_id:  Uuid,
}

// ─── Snapshot ────────────────────────────────────────────────────────────────

/// A read-only, in-memory copy of the graph taken inside one transaction.
#[derive(Debug, Clone, Default)]
pub struct Graph {
  pub persons:         Vec<Person>,
  pub families:        Vec<Family>,
  pub events:          Vec<Event>,
  pub media_assets:    Vec<MediaAsset>,
  pub media_links:     Vec<MediaLink>,
  pub relationships:   Vec<Relationship>,
  pub family_children: Vec<FamilyChild>,
  /// Assets whose file could not be found when the snapshot was taken.
  pub missing_media:   HashSet<Uuid>,
}

impl Graph {
  pub fn is_empty(&self) -> bool {
    self.persons.is_empty()
      && self.families.is_empty()
      && self.events.is_empty()
      && self.media_assets.is_empty()
      && self.media_links.is_empty()
  }

  pub fn person_index(&self) -> HashMap<Uuid, &Person> {
    self.persons.iter().map(|p| (p.id, p)).collect()
  }

  pub fn children_by_family(&self) -> HashMap<Uuid, Vec<Uuid>> {
    let mut map: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
    for fc in &self.family_children {
      map.entry(fc.family_id).or_default().push(fc.child_id);
    }
    map
  }

  /// Number of links pointing at each asset.
  pub fn link_counts(&self) -> HashMap<Uuid, usize> {
    let mut map: HashMap<Uuid, usize> = HashMap::new();
    for link in &self.media_links {
      *map.entry(link.asset_id).or_default() += 1;
    }
    map
  }

  pub fn media_status(&self, asset_id: Uuid, link_counts: &HashMap<Uuid, usize>) -> MediaStatus {
    MediaStatus::derive(
      link_counts.get(&asset_id).is_some_and(|n| *n > 0),
      !self.missing_media.contains(&asset_id),
    )
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn display_name_skips_blank_parts() {
    let p = Person {
      given: Some("  ".into()),
      surname: Some("Sample".into()),
      ..Person::new()
    };
    assert_eq!(p.display_name(), "Sample");
  }

  #[test]
  fn media_status_prefers_missing_file() {
    assert_eq!(MediaStatus::derive(true, false), MediaStatus::Missing);
    assert_eq!(MediaStatus::derive(true, true), MediaStatus::Linked);
    assert_eq!(MediaStatus::derive(false, true), MediaStatus::Unassigned);
  }

  #[test]
  fn person_field_names_match_columns() {
    assert_eq!(PersonField::BirthPlace.as_ref(), "birth_place");
    assert_eq!("death_date".parse::<PersonField>().ok(), Some(PersonField::DeathDate));
  }
}
