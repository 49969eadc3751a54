//! Reversing a logged action from its undo record.
//!
//! The whole reversal runs in one transaction. The log entry is deleted only
//! when every step succeeded; otherwise nothing changes and the entry stays
//! available for another attempt.

use lineage_core::{
  Error as CoreError,
  action::{
    AssetMergeUndo, DateNormalizationUndo, FamilyMergeUndo, FieldStandardizationUndo,
    LinkDedupeUndo, PersonMergeUndo, PlaceNormalizationUndo, UndoPayload,
  },
  date::DateField,
  graph::{EntityKind, FamilyField, MediaLink, PersonField},
};
use rusqlite::Connection;
use uuid::Uuid;

use crate::{
  Result, actions,
  encode::encode_uuid,
  graph::{self, Owner},
  issues,
};

pub fn undo(conn: &mut Connection, action_id: Uuid) -> Result<()> {
  let tx = conn.transaction()?;
  let action = actions::get(&tx, action_id)?
    .ok_or_else(|| CoreError::not_found(EntityKind::Action, action_id))?;

  match &action.undo.payload {
    UndoPayload::MergePeople(u) => person_merge(&tx, u)?,
    UndoPayload::MergeFamilies(u) => family_merge(&tx, u)?,
    UndoPayload::MergeMediaAssets(u) => asset_merge(&tx, u)?,
    UndoPayload::DedupeMediaLinks(u) => link_dedupe(&tx, u)?,
    UndoPayload::NormalizePlaces(u) => place_normalization(&tx, u)?,
    UndoPayload::NormalizeDates(u) => date_normalization(&tx, u)?,
    UndoPayload::StandardizeFields(u) => field_standardization(&tx, u)?,
  }

  let reopened = issues::reopen(&tx, &action.undo.resolved_issues)?;
  actions::delete(&tx, action_id)?;
  tx.commit()?;

  tracing::info!(
    %action_id,
    action_type = %action.action_type,
    reopened,
    "action undone"
  );
  Ok(())
}

fn taken(kind: EntityKind, id: Uuid) -> crate::Error {
  CoreError::conflict(format!("{kind} {id} exists again; cannot restore it")).into()
}

fn restore_links(conn: &Connection, links: &[MediaLink]) -> Result<()> {
  for link in links {
    if graph::get_link(conn, link.id)?.is_some() {
      return Err(taken(EntityKind::MediaLink, link.id));
    }
    graph::insert_link(conn, link)?;
  }
  Ok(())
}

fn person_merge(conn: &Connection, u: &PersonMergeUndo) -> Result<()> {
  let (from_id, into_id) = (u.from.id, u.into_before.id);
  if graph::get_person(conn, from_id)?.is_some() {
    return Err(taken(EntityKind::Person, from_id));
  }
  if graph::get_person(conn, into_id)?.is_none() {
    return Err(CoreError::not_found(EntityKind::Person, into_id).into());
  }

  // Restore the survivor first so any back-filled xref is free again.
  graph::update_person(conn, &u.into_before)?;
  graph::insert_person(conn, &u.from)?;

  for edge in &u.relationships_added {
    graph::delete_relationship(conn, edge)?;
  }
  for edge in &u.relationships_removed {
    graph::insert_relationship(conn, edge)?;
  }
  for membership in &u.family_children_added {
    graph::delete_family_child(conn, membership)?;
  }
  for membership in &u.family_children_removed {
    graph::insert_family_child(conn, membership)?;
  }

  graph::reassign(conn, "events", "event_id", Owner::Person, &u.moved_events, Some(from_id))?;
  graph::reassign(conn, "notes", "note_id", Owner::Person, &u.moved_notes, Some(from_id))?;
  graph::reassign(conn, "media_links", "link_id", Owner::Person, &u.moved_links, Some(from_id))?;
  restore_links(conn, &u.dropped_links)?;

  let from_ref = encode_uuid(from_id);
  graph::set_family_field(conn, &u.husband_of, FamilyField::HusbandId, Some(&from_ref))?;
  graph::set_family_field(conn, &u.wife_of, FamilyField::WifeId, Some(&from_ref))?;

  for dn in &u.date_normalizations {
    graph::upsert_normalization(conn, dn)?;
  }
  Ok(())
}

fn family_merge(conn: &Connection, u: &FamilyMergeUndo) -> Result<()> {
  let (from_id, into_id) = (u.from.id, u.into_before.id);
  if graph::get_family(conn, from_id)?.is_some() {
    return Err(taken(EntityKind::Family, from_id));
  }
  if graph::get_family(conn, into_id)?.is_none() {
    return Err(CoreError::not_found(EntityKind::Family, into_id).into());
  }

  graph::update_family(conn, &u.into_before)?;
  graph::insert_family(conn, &u.from)?;

  for edge in &u.relationships_added {
    graph::delete_relationship(conn, edge)?;
  }
  for membership in &u.family_children_added {
    graph::delete_family_child(conn, membership)?;
  }
  for membership in &u.family_children_removed {
    graph::insert_family_child(conn, membership)?;
  }

  graph::reassign(conn, "events", "event_id", Owner::Family, &u.moved_events, Some(from_id))?;
  graph::reassign(conn, "notes", "note_id", Owner::Family, &u.moved_notes, Some(from_id))?;
  graph::reassign(conn, "media_links", "link_id", Owner::Family, &u.moved_links, Some(from_id))?;
  restore_links(conn, &u.dropped_links)?;

  for dn in &u.date_normalizations {
    graph::upsert_normalization(conn, dn)?;
  }
  Ok(())
}

fn asset_merge(conn: &Connection, u: &AssetMergeUndo) -> Result<()> {
  if graph::get_asset(conn, u.from.id)?.is_some() {
    return Err(taken(EntityKind::MediaAsset, u.from.id));
  }
  graph::insert_asset(conn, &u.from)?;
  graph::reassign(conn, "media_links", "link_id", Owner::Asset, &u.moved_links, Some(u.from.id))?;
  restore_links(conn, &u.dropped_links)
}

fn link_dedupe(conn: &Connection, u: &LinkDedupeUndo) -> Result<()> {
  restore_links(conn, &u.deleted)
}

fn place_normalization(conn: &Connection, u: &PlaceNormalizationUndo) -> Result<()> {
  for event in u.events.iter().rev() {
    graph::set_event_place(conn, event.id, event.place_raw.as_deref(), event.place_id)?;
  }
  for person in u.persons.iter().rev() {
    graph::set_person_field(conn, person.id, person.field, person.value.as_deref())?;
  }
  for family in u.families.iter().rev() {
    graph::set_family_field(conn, &[family.id], FamilyField::MarriagePlace, family.value.as_deref())?;
  }
  for variant in &u.variants_before {
    graph::set_variant_place(conn, variant.id, variant.place_id)?;
  }
  for id in &u.variants_created {
    graph::delete_variant(conn, *id)?;
  }
  if u.place_created {
    graph::delete_place(conn, u.place_id)?;
  }
  Ok(())
}

fn date_normalization(conn: &Connection, u: &DateNormalizationUndo) -> Result<()> {
  for before in u.raw_dates.iter().rev() {
    let value = before.value.as_deref();
    match (before.entity_type, before.field) {
      (EntityKind::Person, DateField::BirthDate) => {
        graph::set_person_field(conn, before.entity_id, PersonField::BirthDate, value)?;
      }
      (EntityKind::Person, DateField::DeathDate) => {
        graph::set_person_field(conn, before.entity_id, PersonField::DeathDate, value)?;
      }
      (EntityKind::Family, DateField::MarriageDate) => {
        graph::set_family_field(conn, &[before.entity_id], FamilyField::MarriageDate, value)?;
      }
      (kind, field) => {
        return Err(CoreError::invalid(format!("{field} is not a raw date column of {kind}")).into());
      }
    }
  }
  for before in u.events.iter().rev() {
    graph::set_event_canonical(conn, before.id, before.date_canonical)?;
  }
  for row in u.rows.iter().rev() {
    match &row.previous {
      Some(previous) => graph::upsert_normalization(conn, previous)?,
      None => {
        graph::delete_normalization(conn, row.entity_type, row.entity_id, &row.raw_value)?
      }
    }
  }
  Ok(())
}

fn field_standardization(conn: &Connection, u: &FieldStandardizationUndo) -> Result<()> {
  for before in u.names.iter().rev() {
    graph::set_person_field(conn, before.person_id, PersonField::Given, before.given.as_deref())?;
    graph::set_person_field(
      conn,
      before.person_id,
      PersonField::Surname,
      before.surname.as_deref(),
    )?;
  }
  Ok(())
}
