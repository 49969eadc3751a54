//! Merging duplicate people, families and media.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use lineage_core::{
  Error as CoreError,
  action::{AssetMergeUndo, FamilyMergeUndo, LinkDedupeUndo, PersonMergeUndo, UndoPayload},
  graph::{EntityKind, FamilyChild, FamilyField, MediaLink, PersonField, Relationship},
  issue::Explanation,
};
use rusqlite::Connection;
use strum::IntoEnumIterator as _;
use uuid::Uuid;

use super::{Applied, is_blank};
use crate::{
  Result,
  encode::encode_uuid,
  graph::{self, Owner},
  issues,
};

// ─── People ──────────────────────────────────────────────────────────────────

/// Fold `from_id` into `into_id` and delete `from_id`.
pub fn people(
  conn: &Connection,
  from_id: Uuid,
  into_id: Uuid,
  fill_missing: bool,
  now: DateTime<Utc>,
) -> Result<Applied> {
  let from = graph::get_person(conn, from_id)?
    .ok_or_else(|| CoreError::not_found(EntityKind::Person, from_id))?;
  let into_before = graph::get_person(conn, into_id)?
    .ok_or_else(|| CoreError::not_found(EntityKind::Person, into_id))?;

  let moved_events = graph::event_ids_of(conn, Owner::Person, from_id)?;
  graph::reassign(conn, "events", "event_id", Owner::Person, &moved_events, Some(into_id))?;
  let moved_notes = graph::note_ids_of(conn, Owner::Person, from_id)?;
  graph::reassign(conn, "notes", "note_id", Owner::Person, &moved_notes, Some(into_id))?;
  let (moved_links, dropped_links) =
    move_links(conn, Owner::Person, from_id, into_id, |l| (l.asset_id, l.family_id))?;

  let spouse_of = graph::families_of_spouse(conn, from_id)?;
  let husband_of: Vec<Uuid> = spouse_of
    .iter()
    .filter(|f| f.husband_id == Some(from_id))
    .map(|f| f.id)
    .collect();
  let wife_of: Vec<Uuid> =
    spouse_of.iter().filter(|f| f.wife_id == Some(from_id)).map(|f| f.id).collect();
  let into_ref = encode_uuid(into_id);
  graph::set_family_field(conn, &husband_of, FamilyField::HusbandId, Some(&into_ref))?;
  graph::set_family_field(conn, &wife_of, FamilyField::WifeId, Some(&into_ref))?;

  let swap = |id: Uuid| if id == from_id { into_id } else { id };
  let relationships_removed = graph::relationships_of(conn, from_id)?;
  let mut relationships_added = Vec::new();
  for edge in &relationships_removed {
    let rewired = Relationship {
      parent_id: swap(edge.parent_id),
      child_id:  swap(edge.child_id),
      rel_type:  edge.rel_type,
    };
    if rewired.parent_id == rewired.child_id {
      continue;
    }
    if graph::insert_relationship(conn, &rewired)? {
      relationships_added.push(rewired);
    }
  }
  for edge in &relationships_removed {
    graph::delete_relationship(conn, edge)?;
  }

  let family_children_removed = graph::memberships_of_child(conn, from_id)?;
  let mut family_children_added = Vec::new();
  for membership in &family_children_removed {
    let moved = FamilyChild { family_id: membership.family_id, child_id: into_id };
    if graph::insert_family_child(conn, &moved)? {
      family_children_added.push(moved);
    }
    graph::delete_family_child(conn, membership)?;
  }

  let date_normalizations = graph::normalizations_of(conn, EntityKind::Person, from_id)?;
  graph::delete_normalizations_of(conn, EntityKind::Person, from_id)?;

  graph::delete_person(conn, from_id)?;

  // Only after the delete: `xref` is unique.
  if fill_missing {
    let mut into = into_before.clone();
    for field in PersonField::iter() {
      if is_blank(into.field(field)) && !is_blank(from.field(field)) {
        *into.field_mut(field) = from.field(field).map(str::to_owned);
      }
    }
    graph::update_person(conn, &into)?;
  }

  let resolved =
    issues::resolve_where(conn, now, |i| i.touches(EntityKind::Person, &[from_id]))?;

  tracing::debug!(
    %from_id,
    %into_id,
    events = moved_events.len(),
    links = moved_links.len(),
    "merged person"
  );

  Ok(Applied {
    payload: UndoPayload::MergePeople(PersonMergeUndo {
      from,
      into_before,
      moved_events,
      moved_notes,
      moved_links,
      dropped_links,
      husband_of,
      wife_of,
      relationships_removed,
      relationships_added,
      family_children_removed,
      family_children_added,
      date_normalizations,
    }),
    resolved,
  })
}

// ─── Families ────────────────────────────────────────────────────────────────

/// Fold `from_id` into `into_id`. Children join `into_id` and gain parent
/// edges to its spouses.
pub fn families(
  conn: &Connection,
  from_id: Uuid,
  into_id: Uuid,
  fill_missing: bool,
  now: DateTime<Utc>,
) -> Result<Applied> {
  let from = graph::get_family(conn, from_id)?
    .ok_or_else(|| CoreError::not_found(EntityKind::Family, from_id))?;
  let into_before = graph::get_family(conn, into_id)?
    .ok_or_else(|| CoreError::not_found(EntityKind::Family, into_id))?;

  let moved_events = graph::event_ids_of(conn, Owner::Family, from_id)?;
  graph::reassign(conn, "events", "event_id", Owner::Family, &moved_events, Some(into_id))?;
  let moved_notes = graph::note_ids_of(conn, Owner::Family, from_id)?;
  graph::reassign(conn, "notes", "note_id", Owner::Family, &moved_notes, Some(into_id))?;
  let (moved_links, dropped_links) =
    move_links(conn, Owner::Family, from_id, into_id, |l| (l.asset_id, l.person_id))?;

  let family_children_removed = graph::children_of_family(conn, from_id)?;
  let mut family_children_added = Vec::new();
  for membership in &family_children_removed {
    let moved = FamilyChild { family_id: into_id, child_id: membership.child_id };
    if graph::insert_family_child(conn, &moved)? {
      family_children_added.push(moved);
    }
    graph::delete_family_child(conn, membership)?;
  }

  let date_normalizations = graph::normalizations_of(conn, EntityKind::Family, from_id)?;
  graph::delete_normalizations_of(conn, EntityKind::Family, from_id)?;

  graph::delete_family(conn, from_id)?;

  let mut into = into_before.clone();
  if fill_missing {
    fill_text(&mut into.xref, &from.xref);
    fill_text(&mut into.marriage_date, &from.marriage_date);
    fill_text(&mut into.marriage_place, &from.marriage_place);
    if into.husband_id.is_none() {
      into.husband_id = from.husband_id;
    }
    if into.wife_id.is_none() {
      into.wife_id = from.wife_id;
    }
    graph::update_family(conn, &into)?;
  }

  let mut relationships_added = Vec::new();
  for parent in into.spouses() {
    for membership in &family_children_removed {
      if parent == membership.child_id {
        continue;
      }
      let edge = Relationship::parent(parent, membership.child_id);
      if graph::insert_relationship(conn, &edge)? {
        relationships_added.push(edge);
      }
    }
  }

  let resolved =
    issues::resolve_where(conn, now, |i| i.touches(EntityKind::Family, &[from_id]))?;

  tracing::debug!(
    %from_id,
    %into_id,
    children = family_children_removed.len(),
    "merged family"
  );

  Ok(Applied {
    payload: UndoPayload::MergeFamilies(FamilyMergeUndo {
      from,
      into_before,
      moved_events,
      moved_notes,
      moved_links,
      dropped_links,
      family_children_removed,
      family_children_added,
      relationships_added,
      date_normalizations,
    }),
    resolved,
  })
}

fn fill_text(slot: &mut Option<String>, from: &Option<String>) {
  if is_blank(slot.as_deref()) && !is_blank(from.as_deref()) {
    slot.clone_from(from);
  }
}

// ─── Media ───────────────────────────────────────────────────────────────────

/// Re-point every link of asset `from_id` at `into_id` and delete `from_id`.
pub fn assets(
  conn: &Connection,
  from_id: Uuid,
  into_id: Uuid,
  now: DateTime<Utc>,
) -> Result<Applied> {
  let from = graph::get_asset(conn, from_id)?
    .ok_or_else(|| CoreError::not_found(EntityKind::MediaAsset, from_id))?;
  if graph::get_asset(conn, into_id)?.is_none() {
    return Err(CoreError::not_found(EntityKind::MediaAsset, into_id).into());
  }

  let (moved_links, dropped_links) =
    move_links(conn, Owner::Asset, from_id, into_id, |l| (l.person_id, l.family_id))?;
  graph::delete_asset(conn, from_id)?;

  let dropped: Vec<Uuid> = dropped_links.iter().map(|l| l.id).collect();
  let resolved = issues::resolve_where(conn, now, |i| {
    i.touches(EntityKind::MediaAsset, &[from_id])
      || i.touches(EntityKind::MediaLink, &dropped)
      || matches!(i.explanation, Explanation::DuplicateMediaLink { asset_id, .. } if asset_id == from_id)
  })?;

  Ok(Applied {
    payload: UndoPayload::MergeMediaAssets(AssetMergeUndo { from, moved_links, dropped_links }),
    resolved,
  })
}

/// Delete every listed link except `keep_id`. All of them must share
/// `keep_id`'s target.
pub fn dedupe_links(
  conn: &Connection,
  link_ids: &[Uuid],
  keep_id: Uuid,
  now: DateTime<Utc>,
) -> Result<Applied> {
  let keep = graph::get_link(conn, keep_id)?
    .ok_or_else(|| CoreError::not_found(EntityKind::MediaLink, keep_id))?;

  let mut seen = HashSet::from([keep_id]);
  let mut doomed = Vec::new();
  for &id in link_ids {
    if !seen.insert(id) {
      continue;
    }
    let link = graph::get_link(conn, id)?
      .ok_or_else(|| CoreError::not_found(EntityKind::MediaLink, id))?;
    if link.target() != keep.target() {
      return Err(
        CoreError::invalid(format!("link {id} does not duplicate link {keep_id}")).into(),
      );
    }
    doomed.push(link);
  }

  for link in &doomed {
    graph::delete_link(conn, link.id)?;
  }

  let ids: Vec<Uuid> = doomed.iter().map(|l| l.id).collect();
  let resolved = issues::resolve_where(conn, now, |i| i.touches(EntityKind::MediaLink, &ids))?;

  Ok(Applied {
    payload: UndoPayload::DedupeMediaLinks(LinkDedupeUndo { deleted: doomed }),
    resolved,
  })
}

/// Move the links owned by `from` to `to`. A link whose `key` matches one
/// `to` already has is deleted instead. Returns `(moved ids, dropped rows)`.
fn move_links<K: Eq + std::hash::Hash>(
  conn: &Connection,
  owner: Owner,
  from: Uuid,
  to: Uuid,
  key: impl Fn(&MediaLink) -> K,
) -> Result<(Vec<Uuid>, Vec<MediaLink>)> {
  let existing: HashSet<K> = graph::links_of(conn, owner, to)?.iter().map(&key).collect();

  let mut moved = Vec::new();
  let mut dropped = Vec::new();
  for link in graph::links_of(conn, owner, from)? {
    if existing.contains(&key(&link)) {
      graph::delete_link(conn, link.id)?;
      dropped.push(link);
    } else {
      moved.push(link.id);
    }
  }
  graph::reassign(conn, "media_links", "link_id", owner, &moved, Some(to))?;
  Ok((moved, dropped))
}
