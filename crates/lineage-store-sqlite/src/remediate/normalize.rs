//! Place, date and name normalization.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use lineage_core::{
  Error as CoreError,
  action::{
    DateNormalizationItem, DateNormalizationUndo, EventDateBefore, EventPlaceBefore,
    FamilyValueBefore, FieldStandardizationUndo, NameBefore, NameItem,
    NormalizationRowBefore, PersonValueBefore, PlaceNormalizationUndo, RawDateBefore,
    UndoPayload,
  },
  date::{DateField, canonical_date},
  graph::{EntityKind, FamilyField, PersonField, Place, PlaceVariant},
  issue::{Explanation, IssueType},
};
use rusqlite::Connection;
use uuid::Uuid;

use super::Applied;
use crate::{Result, graph, issues};

// ─── Places ──────────────────────────────────────────────────────────────────

/// Rewrite every place reference spelled as one of `variants` (or as
/// `canonical` itself) to `canonical`, creating the place and its variant
/// rows as needed.
pub fn places(
  conn: &Connection,
  canonical: &str,
  variants: &[String],
  now: DateTime<Utc>,
) -> Result<Applied> {
  let canonical = canonical.trim();
  let mut names: BTreeSet<&str> =
    variants.iter().map(|v| v.trim()).filter(|v| !v.is_empty()).collect();
  names.insert(canonical);
  let in_set = |value: Option<&str>| value.is_some_and(|v| names.contains(v.trim()));

  let (place, place_created) = match graph::find_place(conn, canonical)? {
    Some(place) => (place, false),
    None => {
      let place = Place {
        id:           Uuid::new_v4(),
        name:         canonical.to_owned(),
        authority_id: None,
        latitude:     None,
        longitude:    None,
      };
      graph::insert_place(conn, &place)?;
      (place, true)
    }
  };

  let mut undo = PlaceNormalizationUndo {
    place_id: place.id,
    place_created,
    variants_created: Vec::new(),
    variants_before: Vec::new(),
    events: Vec::new(),
    persons: Vec::new(),
    families: Vec::new(),
  };

  for name in names.iter().copied().filter(|n| *n != canonical) {
    match graph::find_variant(conn, name)? {
      Some(existing) if existing.place_id == place.id => {}
      Some(existing) => {
        graph::set_variant_place(conn, existing.id, place.id)?;
        undo.variants_before.push(existing);
      }
      None => {
        let variant =
          PlaceVariant { id: Uuid::new_v4(), place_id: place.id, name: name.to_owned() };
        graph::insert_variant(conn, &variant)?;
        undo.variants_created.push(variant.id);
      }
    }
  }

  let snapshot = graph::load_graph(conn, None)?;

  for event in &snapshot.events {
    let current = event.place_raw.as_deref();
    if !in_set(current) || (current == Some(canonical) && event.place_id == Some(place.id)) {
      continue;
    }
    undo.events.push(EventPlaceBefore {
      id:        event.id,
      place_raw: event.place_raw.clone(),
      place_id:  event.place_id,
    });
    graph::set_event_place(conn, event.id, Some(canonical), Some(place.id))?;
  }

  for person in &snapshot.persons {
    for field in [PersonField::BirthPlace, PersonField::DeathPlace] {
      let current = person.field(field);
      if in_set(current) && current != Some(canonical) {
        undo.persons.push(PersonValueBefore {
          id: person.id,
          field,
          value: current.map(str::to_owned),
        });
        graph::set_person_field(conn, person.id, field, Some(canonical))?;
      }
    }
  }

  for family in &snapshot.families {
    let current = family.marriage_place.as_deref();
    if in_set(current) && current != Some(canonical) {
      undo.families.push(FamilyValueBefore { id: family.id, value: family.marriage_place.clone() });
      graph::set_family_field(conn, &[family.id], FamilyField::MarriagePlace, Some(canonical))?;
    }
  }

  let resolved = issues::resolve_where(conn, now, |i| {
    let spellings = i.explanation.place_variants();
    i.issue_type == IssueType::PlaceCluster
      && !spellings.is_empty()
      && spellings.iter().all(|s| names.contains(s.trim()))
  })?;

  tracing::debug!(
    canonical,
    events = undo.events.len(),
    persons = undo.persons.len(),
    families = undo.families.len(),
    "normalized places"
  );

  Ok(Applied { payload: UndoPayload::NormalizePlaces(undo), resolved })
}

// ─── Dates ───────────────────────────────────────────────────────────────────

fn person_column(field: DateField) -> Option<PersonField> {
  match field {
    DateField::BirthDate => Some(PersonField::BirthDate),
    DateField::DeathDate => Some(PersonField::DeathDate),
    DateField::Date | DateField::MarriageDate => None,
  }
}

/// Record confirmed parses. An event's canonical date is recomputed from
/// `normalized` and cleared when the item is ambiguous or does not resolve to
/// a single day, month or year. Person and family raw columns holding the
/// raw value are rewritten when the parse is unambiguous.
pub fn dates(
  conn: &Connection,
  items: &[DateNormalizationItem],
  now: DateTime<Utc>,
) -> Result<Applied> {
  let mut undo =
    DateNormalizationUndo { rows: Vec::new(), events: Vec::new(), raw_dates: Vec::new() };

  for item in items {
    let (kind, id) = (item.entity_type, item.entity_id);
    let raw = item.raw.trim();
    let holds_raw = |value: Option<&str>| value.is_some_and(|v| v.trim() == raw);

    // Look the entity up before touching anything so a bad id fails cleanly.
    match kind {
      EntityKind::Event => {
        let event =
          graph::get_event(conn, id)?.ok_or_else(|| CoreError::not_found(kind, id))?;
        let canonical = if item.ambiguous {
          None
        } else {
          item.normalized.as_deref().and_then(canonical_date)
        };
        if canonical != event.date_canonical {
          undo.events.push(EventDateBefore { id, date_canonical: event.date_canonical });
          graph::set_event_canonical(conn, id, canonical)?;
        }
      }
      EntityKind::Person => {
        let person =
          graph::get_person(conn, id)?.ok_or_else(|| CoreError::not_found(kind, id))?;
        let fields = match item.field {
          Some(field) => vec![field],
          None => vec![DateField::BirthDate, DateField::DeathDate],
        };
        for field in fields {
          let Some(column) = person_column(field) else { continue };
          let current = person.field(column);
          if item.rewrites_raw() && holds_raw(current) {
            undo.raw_dates.push(RawDateBefore {
              entity_type: kind,
              entity_id: id,
              field,
              value: current.map(str::to_owned),
            });
            graph::set_person_field(conn, id, column, item.normalized.as_deref())?;
          }
        }
      }
      EntityKind::Family => {
        let family =
          graph::get_family(conn, id)?.ok_or_else(|| CoreError::not_found(kind, id))?;
        let current = family.marriage_date.as_deref();
        if item.rewrites_raw() && holds_raw(current) {
          undo.raw_dates.push(RawDateBefore {
            entity_type: kind,
            entity_id: id,
            field: DateField::MarriageDate,
            value: family.marriage_date.clone(),
          });
          graph::set_family_field(
            conn,
            &[id],
            FamilyField::MarriageDate,
            item.normalized.as_deref(),
          )?;
        }
      }
      other => {
        return Err(CoreError::invalid(format!("dates cannot be normalized on {other}")).into());
      }
    }

    undo.rows.push(NormalizationRowBefore {
      entity_type: kind,
      entity_id:   id,
      raw_value:   item.raw.clone(),
      previous:    graph::get_normalization(conn, kind, id, &item.raw)?,
    });
    graph::upsert_normalization(conn, &item.to_row())?;
  }

  let resolved = issues::resolve_where(conn, now, |i| {
    let Explanation::DateNormalization { field, raw, .. } = &i.explanation else {
      return false;
    };
    items.iter().any(|item| {
      i.touches(item.entity_type, &[item.entity_id])
        && raw.trim() == item.raw.trim()
        && item.field.is_none_or(|f| f == *field)
    })
  })?;

  tracing::debug!(items = items.len(), "normalized dates");

  Ok(Applied { payload: UndoPayload::NormalizeDates(undo), resolved })
}

// ─── Names ───────────────────────────────────────────────────────────────────

/// Overwrite given names and surnames with operator-confirmed values.
pub fn names(conn: &Connection, items: &[NameItem], now: DateTime<Utc>) -> Result<Applied> {
  let mut before = Vec::with_capacity(items.len());
  for item in items {
    let person = graph::get_person(conn, item.person_id)?
      .ok_or_else(|| CoreError::not_found(EntityKind::Person, item.person_id))?;
    before.push(NameBefore {
      person_id: person.id,
      given:     person.given.clone(),
      surname:   person.surname.clone(),
    });
    if let Some(given) = &item.given {
      graph::set_person_field(conn, person.id, PersonField::Given, Some(given.trim()))?;
    }
    if let Some(surname) = &item.surname {
      graph::set_person_field(conn, person.id, PersonField::Surname, Some(surname.trim()))?;
    }
  }

  let ids: Vec<Uuid> = items.iter().map(|i| i.person_id).collect();
  let resolved = issues::resolve_where(conn, now, |i| {
    i.issue_type == IssueType::NameStandardization && i.touches(EntityKind::Person, &ids)
  })?;

  Ok(Applied {
    payload: UndoPayload::StandardizeFields(FieldStandardizationUndo { names: before }),
    resolved,
  })
}
