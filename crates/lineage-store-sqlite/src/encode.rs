//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are RFC 3339 strings and calendar dates ISO 8601. UUIDs are
//! hyphenated lowercase strings. Enum discriminants use their `strum` string
//! form. Explanations and action payloads are versioned JSON documents.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use lineage_core::{
  action::{ActionLog, ActionRequest, ActionType, UndoRecord},
  date::DateNormalization,
  document,
  graph::{
    EntityKind, Event, Family, FamilyChild, MediaAsset, MediaLink, Note, Person,
    Place, PlaceVariant, RelType, Relationship,
  },
  issue::{Explanation, Issue},
};
use rusqlite::{Row, Rows};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Scalars ─────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn encode_opt_uuid(id: Option<Uuid>) -> Option<String> { id.map(encode_uuid) }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

/// Fixed-width so stored timestamps sort lexically.
pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339_opts(SecondsFormat::Nanos, true) }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

pub fn encode_date(d: NaiveDate) -> String { d.format("%Y-%m-%d").to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| Error::DateParse(e.to_string()))
}

/// Parse a stored discriminant, reporting `what` on failure.
pub fn decode_enum<T: FromStr>(what: &'static str, s: &str) -> Result<T> {
  s.parse().map_err(|_| {
    lineage_core::Error::UnknownDiscriminant { what, value: s.to_owned() }.into()
  })
}

pub fn encode_ids(ids: &[Uuid]) -> Result<String> { Ok(serde_json::to_string(ids)?) }

pub fn decode_ids(s: &str) -> Result<Vec<Uuid>> { Ok(serde_json::from_str(s)?) }

// ─── Column readers ──────────────────────────────────────────────────────────

fn uuid_col(row: &Row<'_>, idx: usize) -> Result<Uuid> {
  decode_uuid(&row.get::<_, String>(idx)?)
}

fn opt_uuid_col(row: &Row<'_>, idx: usize) -> Result<Option<Uuid>> {
  row
    .get::<_, Option<String>>(idx)?
    .as_deref()
    .map(decode_uuid)
    .transpose()
}

fn opt_enum_col<T: FromStr>(row: &Row<'_>, idx: usize, what: &'static str) -> Result<Option<T>> {
  row
    .get::<_, Option<String>>(idx)?
    .as_deref()
    .map(|s| decode_enum(what, s))
    .transpose()
}

/// Drain `rows`, converting each with `read`.
pub fn collect<T>(
  mut rows: Rows<'_>,
  read: impl Fn(&Row<'_>) -> Result<T>,
) -> Result<Vec<T>> {
  let mut out = Vec::new();
  while let Some(row) = rows.next()? {
    out.push(read(row)?);
  }
  Ok(out)
}

// ─── Entity rows ─────────────────────────────────────────────────────────────

pub const PERSON_COLUMNS: &str = "person_id, xref, given, surname, sex, \
   birth_date, birth_place, death_date, death_place";

pub fn read_person(row: &Row<'_>) -> Result<Person> {
  Ok(Person {
    id:          uuid_col(row, 0)?,
    xref:        row.get(1)?,
    given:       row.get(2)?,
    surname:     row.get(3)?,
    sex:         row.get(4)?,
    birth_date:  row.get(5)?,
    birth_place: row.get(6)?,
    death_date:  row.get(7)?,
    death_place: row.get(8)?,
  })
}

pub const FAMILY_COLUMNS: &str =
  "family_id, xref, husband_id, wife_id, marriage_date, marriage_place";

pub fn read_family(row: &Row<'_>) -> Result<Family> {
  Ok(Family {
    id:             uuid_col(row, 0)?,
    xref:           row.get(1)?,
    husband_id:     opt_uuid_col(row, 2)?,
    wife_id:        opt_uuid_col(row, 3)?,
    marriage_date:  row.get(4)?,
    marriage_place: row.get(5)?,
  })
}

pub const EVENT_COLUMNS: &str = "event_id, event_type, person_id, family_id, \
   date_raw, place_raw, date_canonical, place_id, description";

pub fn read_event(row: &Row<'_>) -> Result<Event> {
  Ok(Event {
    id:             uuid_col(row, 0)?,
    event_type:     decode_enum("event type", &row.get::<_, String>(1)?)?,
    person_id:      opt_uuid_col(row, 2)?,
    family_id:      opt_uuid_col(row, 3)?,
    date_raw:       row.get(4)?,
    place_raw:      row.get(5)?,
    date_canonical: row
      .get::<_, Option<String>>(6)?
      .as_deref()
      .map(decode_date)
      .transpose()?,
    place_id:       opt_uuid_col(row, 7)?,
    description:    row.get(8)?,
  })
}

pub const PLACE_COLUMNS: &str = "place_id, name, authority_id, latitude, longitude";

pub fn read_place(row: &Row<'_>) -> Result<Place> {
  Ok(Place {
    id:           uuid_col(row, 0)?,
    name:         row.get(1)?,
    authority_id: row.get(2)?,
    latitude:     row.get(3)?,
    longitude:    row.get(4)?,
  })
}

pub const VARIANT_COLUMNS: &str = "variant_id, place_id, name";

pub fn read_variant(row: &Row<'_>) -> Result<PlaceVariant> {
  Ok(PlaceVariant {
    id:       uuid_col(row, 0)?,
    place_id: uuid_col(row, 1)?,
    name:     row.get(2)?,
  })
}

pub const ASSET_COLUMNS: &str =
  "asset_id, path, sha256, original_filename, mime_type, size_bytes";

pub fn read_asset(row: &Row<'_>) -> Result<MediaAsset> {
  Ok(MediaAsset {
    id:                uuid_col(row, 0)?,
    path:              row.get(1)?,
    sha256:            row.get(2)?,
    original_filename: row.get(3)?,
    mime_type:         row.get(4)?,
    size_bytes:        row.get(5)?,
  })
}

pub const LINK_COLUMNS: &str = "link_id, asset_id, person_id, family_id, description";

pub fn read_link(row: &Row<'_>) -> Result<MediaLink> {
  Ok(MediaLink {
    id:          uuid_col(row, 0)?,
    asset_id:    uuid_col(row, 1)?,
    person_id:   opt_uuid_col(row, 2)?,
    family_id:   opt_uuid_col(row, 3)?,
    description: row.get(4)?,
  })
}

pub const NOTE_COLUMNS: &str = "note_id, person_id, family_id, text";

pub fn read_note(row: &Row<'_>) -> Result<Note> {
  Ok(Note {
    id:        uuid_col(row, 0)?,
    person_id: opt_uuid_col(row, 1)?,
    family_id: opt_uuid_col(row, 2)?,
    text:      row.get(3)?,
  })
}

pub const RELATIONSHIP_COLUMNS: &str = "parent_id, child_id, rel_type";

pub fn read_relationship(row: &Row<'_>) -> Result<Relationship> {
  Ok(Relationship {
    parent_id: uuid_col(row, 0)?,
    child_id:  uuid_col(row, 1)?,
    rel_type:  decode_enum::<RelType>("relationship type", &row.get::<_, String>(2)?)?,
  })
}

pub fn read_family_child(row: &Row<'_>) -> Result<FamilyChild> {
  Ok(FamilyChild { family_id: uuid_col(row, 0)?, child_id: uuid_col(row, 1)? })
}

pub const NORMALIZATION_COLUMNS: &str = "entity_type, entity_id, raw_value, \
   normalized, precision, qualifier, confidence, is_ambiguous";

pub fn read_normalization(row: &Row<'_>) -> Result<DateNormalization> {
  Ok(DateNormalization {
    entity_type:  decode_enum::<EntityKind>("entity type", &row.get::<_, String>(0)?)?,
    entity_id:    uuid_col(row, 1)?,
    raw_value:    row.get(2)?,
    normalized:   row.get(3)?,
    precision:    opt_enum_col(row, 4, "date precision")?,
    qualifier:    opt_enum_col(row, 5, "date qualifier")?,
    confidence:   row.get(6)?,
    is_ambiguous: row.get(7)?,
  })
}

// ─── Issue rows ──────────────────────────────────────────────────────────────

pub const ISSUE_COLUMNS: &str = "issue_id, issue_type, severity, entity_type, \
   entity_ids, status, confidence, impact_score, explanation, fingerprint, \
   detected_at, resolved_at";

/// Raw strings read directly from a `dq_issues` row.
pub struct RawIssue {
  pub issue_id:     String,
  pub issue_type:   String,
  pub severity:     String,
  pub entity_type:  String,
  pub entity_ids:   String,
  pub status:       String,
  pub confidence:   f64,
  pub impact_score: f64,
  pub explanation:  String,
  pub fingerprint:  String,
  pub detected_at:  String,
  pub resolved_at:  Option<String>,
}

impl RawIssue {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      issue_id:     row.get(0)?,
      issue_type:   row.get(1)?,
      severity:     row.get(2)?,
      entity_type:  row.get(3)?,
      entity_ids:   row.get(4)?,
      status:       row.get(5)?,
      confidence:   row.get(6)?,
      impact_score: row.get(7)?,
      explanation:  row.get(8)?,
      fingerprint:  row.get(9)?,
      detected_at:  row.get(10)?,
      resolved_at:  row.get(11)?,
    })
  }

  pub fn into_issue(self) -> Result<Issue> {
    let explanation: Explanation = document::decode(&self.explanation)?;
    Ok(Issue {
      id: decode_uuid(&self.issue_id)?,
      issue_type: decode_enum("issue type", &self.issue_type)?,
      severity: decode_enum("severity", &self.severity)?,
      entity_type: decode_enum("entity type", &self.entity_type)?,
      entity_ids: decode_ids(&self.entity_ids)?,
      status: decode_enum("issue status", &self.status)?,
      confidence: self.confidence,
      impact_score: self.impact_score,
      explanation,
      fingerprint: self.fingerprint,
      detected_at: decode_dt(&self.detected_at)?,
      resolved_at: self.resolved_at.as_deref().map(decode_dt).transpose()?,
    })
  }
}

pub fn read_issue(row: &Row<'_>) -> Result<Issue> { RawIssue::from_row(row)?.into_issue() }

// ─── Action rows ─────────────────────────────────────────────────────────────

pub const ACTION_COLUMNS: &str =
  "action_id, action_type, payload, undo_payload, created_at, applied_by";

/// Raw strings read directly from a `dq_action_log` row.
pub struct RawAction {
  pub action_id:    String,
  pub action_type:  String,
  pub payload:      String,
  pub undo_payload: String,
  pub created_at:   String,
  pub applied_by:   Option<String>,
}

impl RawAction {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      action_id:    row.get(0)?,
      action_type:  row.get(1)?,
      payload:      row.get(2)?,
      undo_payload: row.get(3)?,
      created_at:   row.get(4)?,
      applied_by:   row.get(5)?,
    })
  }

  pub fn into_action(self) -> Result<ActionLog> {
    let action_type: ActionType = decode_enum("action type", &self.action_type)?;
    let payload: ActionRequest = document::decode(&self.payload)?;
    let undo: UndoRecord = document::decode(&self.undo_payload)?;
    if payload.action_type() != action_type || undo.payload.action_type() != action_type {
      return Err(
        lineage_core::Error::invalid(format!(
          "action {} payloads do not match its type {action_type}",
          self.action_id
        ))
        .into(),
      );
    }
    Ok(ActionLog {
      id: decode_uuid(&self.action_id)?,
      action_type,
      payload,
      undo,
      created_at: decode_dt(&self.created_at)?,
      applied_by: self.applied_by,
    })
  }
}

pub fn read_action(row: &Row<'_>) -> Result<ActionLog> {
  RawAction::from_row(row)?.into_action()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn unknown_discriminant_is_reported() {
    let err = decode_enum::<EntityKind>("entity type", "planet").unwrap_err();
    assert!(matches!(
      err,
      Error::Core(lineage_core::Error::UnknownDiscriminant { what: "entity type", .. })
    ));
  }

  #[test]
  fn dates_round_trip_as_iso() {
    let d = NaiveDate::from_ymd_opt(1881, 3, 4).unwrap();
    assert_eq!(encode_date(d), "1881-03-04");
    assert_eq!(decode_date("1881-03-04").unwrap(), d);
  }
}
