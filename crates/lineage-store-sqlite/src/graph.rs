//! Synchronous entity CRUD over a borrowed connection or transaction.
//!
//! Every function here runs inside whatever transaction the caller holds.
//! Remediation and undo compose them; the async [`SqliteStore`] surface
//! wraps them one call at a time.
//!
//! [`SqliteStore`]: crate::SqliteStore

use std::path::Path;

use chrono::NaiveDate;

use lineage_core::{
  date::DateNormalization,
  graph::{
    EntityKind, Event, Family, FamilyChild, FamilyField, Graph, MediaAsset,
    MediaLink, Note, Person, PersonField, Place, PlaceVariant, Relationship,
  },
};
use rusqlite::{Connection, params};
use uuid::Uuid;

use crate::{
  Result,
  encode::{
    ASSET_COLUMNS, EVENT_COLUMNS, FAMILY_COLUMNS, LINK_COLUMNS,
    NORMALIZATION_COLUMNS, NOTE_COLUMNS, PERSON_COLUMNS, PLACE_COLUMNS,
    RELATIONSHIP_COLUMNS, VARIANT_COLUMNS, collect, encode_date, encode_opt_uuid,
    encode_uuid, read_asset, read_event, read_family, read_family_child, read_link,
    read_normalization, read_note, read_person, read_place, read_relationship,
    read_variant,
  },
};

/// Run `sql` with a single id parameter and read every row with `read`.
fn select_by<T>(
  conn: &Connection,
  sql: &str,
  id: Uuid,
  read: impl Fn(&rusqlite::Row<'_>) -> Result<T>,
) -> Result<Vec<T>> {
  let mut stmt = conn.prepare(sql)?;
  let rows = stmt.query(params![encode_uuid(id)])?;
  collect(rows, read)
}

fn select_all<T>(
  conn: &Connection,
  sql: &str,
  read: impl Fn(&rusqlite::Row<'_>) -> Result<T>,
) -> Result<Vec<T>> {
  let mut stmt = conn.prepare(sql)?;
  let rows = stmt.query([])?;
  collect(rows, read)
}

fn select_one<T>(
  conn: &Connection,
  sql: &str,
  id: Uuid,
  read: impl Fn(&rusqlite::Row<'_>) -> Result<T>,
) -> Result<Option<T>> {
  Ok(select_by(conn, sql, id, read)?.into_iter().next())
}

// ─── Persons ─────────────────────────────────────────────────────────────────

pub fn insert_person(conn: &Connection, p: &Person) -> Result<()> {
  conn.execute(
    &format!("INSERT INTO persons ({PERSON_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"),
    params![
      encode_uuid(p.id),
      p.xref,
      p.given,
      p.surname,
      p.sex,
      p.birth_date,
      p.birth_place,
      p.death_date,
      p.death_place,
    ],
  )?;
  Ok(())
}

/// Overwrite every scalar column of an existing person.
pub fn update_person(conn: &Connection, p: &Person) -> Result<()> {
  conn.execute(
    "UPDATE persons SET xref = ?2, given = ?3, surname = ?4, sex = ?5,
       birth_date = ?6, birth_place = ?7, death_date = ?8, death_place = ?9
     WHERE person_id = ?1",
    params![
      encode_uuid(p.id),
      p.xref,
      p.given,
      p.surname,
      p.sex,
      p.birth_date,
      p.birth_place,
      p.death_date,
      p.death_place,
    ],
  )?;
  Ok(())
}

pub fn get_person(conn: &Connection, id: Uuid) -> Result<Option<Person>> {
  select_one(
    conn,
    &format!("SELECT {PERSON_COLUMNS} FROM persons WHERE person_id = ?1"),
    id,
    read_person,
  )
}

/// Delete a person. Spouse references are nulled by the schema; events,
/// notes, links and edges cascade.
pub fn delete_person(conn: &Connection, id: Uuid) -> Result<bool> {
  Ok(conn.execute("DELETE FROM persons WHERE person_id = ?1", params![encode_uuid(id)])? > 0)
}

/// Set one text column of a person.
pub fn set_person_field(
  conn: &Connection,
  id: Uuid,
  field: PersonField,
  value: Option<&str>,
) -> Result<()> {
  conn.execute(
    &format!("UPDATE persons SET {} = ?2 WHERE person_id = ?1", field.as_ref()),
    params![encode_uuid(id), value],
  )?;
  Ok(())
}

// ─── Families ────────────────────────────────────────────────────────────────

pub fn insert_family(conn: &Connection, f: &Family) -> Result<()> {
  conn.execute(
    &format!("INSERT INTO families ({FAMILY_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6)"),
    params![
      encode_uuid(f.id),
      f.xref,
      encode_opt_uuid(f.husband_id),
      encode_opt_uuid(f.wife_id),
      f.marriage_date,
      f.marriage_place,
    ],
  )?;
  Ok(())
}

pub fn update_family(conn: &Connection, f: &Family) -> Result<()> {
  conn.execute(
    "UPDATE families SET xref = ?2, husband_id = ?3, wife_id = ?4,
       marriage_date = ?5, marriage_place = ?6
     WHERE family_id = ?1",
    params![
      encode_uuid(f.id),
      f.xref,
      encode_opt_uuid(f.husband_id),
      encode_opt_uuid(f.wife_id),
      f.marriage_date,
      f.marriage_place,
    ],
  )?;
  Ok(())
}

pub fn get_family(conn: &Connection, id: Uuid) -> Result<Option<Family>> {
  select_one(
    conn,
    &format!("SELECT {FAMILY_COLUMNS} FROM families WHERE family_id = ?1"),
    id,
    read_family,
  )
}

pub fn delete_family(conn: &Connection, id: Uuid) -> Result<bool> {
  Ok(conn.execute("DELETE FROM families WHERE family_id = ?1", params![encode_uuid(id)])? > 0)
}

/// Set one column of each listed family. Spouse columns take encoded ids.
pub fn set_family_field(
  conn: &Connection,
  ids: &[Uuid],
  field: FamilyField,
  value: Option<&str>,
) -> Result<()> {
  let mut stmt = conn
    .prepare(&format!("UPDATE families SET {} = ?2 WHERE family_id = ?1", field.as_ref()))?;
  for id in ids {
    stmt.execute(params![encode_uuid(*id), value])?;
  }
  Ok(())
}

/// Families in which `person` is the husband or the wife.
pub fn families_of_spouse(conn: &Connection, person: Uuid) -> Result<Vec<Family>> {
  select_by(
    conn,
    &format!(
      "SELECT {FAMILY_COLUMNS} FROM families WHERE husband_id = ?1 OR wife_id = ?1"
    ),
    person,
    read_family,
  )
}

// ─── Events ──────────────────────────────────────────────────────────────────

pub fn insert_event(conn: &Connection, e: &Event) -> Result<()> {
  conn.execute(
    &format!("INSERT INTO events ({EVENT_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"),
    params![
      encode_uuid(e.id),
      e.event_type.as_ref(),
      encode_opt_uuid(e.person_id),
      encode_opt_uuid(e.family_id),
      e.date_raw,
      e.place_raw,
      e.date_canonical.map(encode_date),
      encode_opt_uuid(e.place_id),
      e.description,
    ],
  )?;
  Ok(())
}

pub fn get_event(conn: &Connection, id: Uuid) -> Result<Option<Event>> {
  select_one(
    conn,
    &format!("SELECT {EVENT_COLUMNS} FROM events WHERE event_id = ?1"),
    id,
    read_event,
  )
}

pub fn set_event_place(
  conn: &Connection,
  id: Uuid,
  place_raw: Option<&str>,
  place_id: Option<Uuid>,
) -> Result<()> {
  conn.execute(
    "UPDATE events SET place_raw = ?2, place_id = ?3 WHERE event_id = ?1",
    params![encode_uuid(id), place_raw, encode_opt_uuid(place_id)],
  )?;
  Ok(())
}

pub fn set_event_canonical(
  conn: &Connection,
  id: Uuid,
  date_canonical: Option<NaiveDate>,
) -> Result<()> {
  conn.execute(
    "UPDATE events SET date_canonical = ?2 WHERE event_id = ?1",
    params![encode_uuid(id), date_canonical.map(encode_date)],
  )?;
  Ok(())
}

/// Ids of the events owned by `id`.
pub fn event_ids_of(conn: &Connection, owner: Owner, id: Uuid) -> Result<Vec<Uuid>> {
  ids_of(conn, "events", "event_id", owner, id)
}

// ─── Places ──────────────────────────────────────────────────────────────────

pub fn insert_place(conn: &Connection, p: &Place) -> Result<()> {
  conn.execute(
    &format!("INSERT INTO places ({PLACE_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5)"),
    params![encode_uuid(p.id), p.name, p.authority_id, p.latitude, p.longitude],
  )?;
  Ok(())
}

pub fn get_place(conn: &Connection, id: Uuid) -> Result<Option<Place>> {
  select_one(
    conn,
    &format!("SELECT {PLACE_COLUMNS} FROM places WHERE place_id = ?1"),
    id,
    read_place,
  )
}

pub fn find_place(conn: &Connection, name: &str) -> Result<Option<Place>> {
  let mut stmt =
    conn.prepare(&format!("SELECT {PLACE_COLUMNS} FROM places WHERE name = ?1"))?;
  Ok(collect(stmt.query(params![name])?, read_place)?.into_iter().next())
}

pub fn delete_place(conn: &Connection, id: Uuid) -> Result<()> {
  conn.execute("DELETE FROM places WHERE place_id = ?1", params![encode_uuid(id)])?;
  Ok(())
}

pub fn insert_variant(conn: &Connection, v: &PlaceVariant) -> Result<()> {
  conn.execute(
    &format!("INSERT INTO place_variants ({VARIANT_COLUMNS}) VALUES (?1, ?2, ?3)"),
    params![encode_uuid(v.id), encode_uuid(v.place_id), v.name],
  )?;
  Ok(())
}

pub fn set_variant_place(conn: &Connection, id: Uuid, place_id: Uuid) -> Result<()> {
  conn.execute(
    "UPDATE place_variants SET place_id = ?2 WHERE variant_id = ?1",
    params![encode_uuid(id), encode_uuid(place_id)],
  )?;
  Ok(())
}

pub fn delete_variant(conn: &Connection, id: Uuid) -> Result<()> {
  conn.execute("DELETE FROM place_variants WHERE variant_id = ?1", params![encode_uuid(id)])?;
  Ok(())
}

pub fn find_variant(conn: &Connection, name: &str) -> Result<Option<PlaceVariant>> {
  let mut stmt = conn
    .prepare(&format!("SELECT {VARIANT_COLUMNS} FROM place_variants WHERE name = ?1"))?;
  Ok(collect(stmt.query(params![name])?, read_variant)?.into_iter().next())
}

pub fn variants_of(conn: &Connection, place_id: Uuid) -> Result<Vec<PlaceVariant>> {
  select_by(
    conn,
    &format!(
      "SELECT {VARIANT_COLUMNS} FROM place_variants WHERE place_id = ?1 ORDER BY name"
    ),
    place_id,
    read_variant,
  )
}

// ─── Media ───────────────────────────────────────────────────────────────────

pub fn insert_asset(conn: &Connection, a: &MediaAsset) -> Result<()> {
  conn.execute(
    &format!("INSERT INTO media_assets ({ASSET_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6)"),
    params![
      encode_uuid(a.id),
      a.path,
      a.sha256,
      a.original_filename,
      a.mime_type,
      a.size_bytes,
    ],
  )?;
  Ok(())
}

pub fn get_asset(conn: &Connection, id: Uuid) -> Result<Option<MediaAsset>> {
  select_one(
    conn,
    &format!("SELECT {ASSET_COLUMNS} FROM media_assets WHERE asset_id = ?1"),
    id,
    read_asset,
  )
}

pub fn delete_asset(conn: &Connection, id: Uuid) -> Result<bool> {
  Ok(conn.execute("DELETE FROM media_assets WHERE asset_id = ?1", params![encode_uuid(id)])? > 0)
}

pub fn insert_link(conn: &Connection, l: &MediaLink) -> Result<()> {
  conn.execute(
    &format!("INSERT INTO media_links ({LINK_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5)"),
    params![
      encode_uuid(l.id),
      encode_uuid(l.asset_id),
      encode_opt_uuid(l.person_id),
      encode_opt_uuid(l.family_id),
      l.description,
    ],
  )?;
  Ok(())
}

pub fn get_link(conn: &Connection, id: Uuid) -> Result<Option<MediaLink>> {
  select_one(
    conn,
    &format!("SELECT {LINK_COLUMNS} FROM media_links WHERE link_id = ?1"),
    id,
    read_link,
  )
}

/// Full link rows attached to a person, a family or an asset.
pub fn links_of(conn: &Connection, owner: Owner, id: Uuid) -> Result<Vec<MediaLink>> {
  select_by(
    conn,
    &format!(
      "SELECT {LINK_COLUMNS} FROM media_links WHERE {} = ?1 ORDER BY link_id",
      owner.column()
    ),
    id,
    read_link,
  )
}

pub fn delete_link(conn: &Connection, id: Uuid) -> Result<()> {
  conn.execute("DELETE FROM media_links WHERE link_id = ?1", params![encode_uuid(id)])?;
  Ok(())
}

// ─── Notes ───────────────────────────────────────────────────────────────────

pub fn insert_note(conn: &Connection, n: &Note) -> Result<()> {
  conn.execute(
    &format!("INSERT INTO notes ({NOTE_COLUMNS}) VALUES (?1, ?2, ?3, ?4)"),
    params![
      encode_uuid(n.id),
      encode_opt_uuid(n.person_id),
      encode_opt_uuid(n.family_id),
      n.text,
    ],
  )?;
  Ok(())
}

pub fn get_note(conn: &Connection, id: Uuid) -> Result<Option<Note>> {
  select_one(
    conn,
    &format!("SELECT {NOTE_COLUMNS} FROM notes WHERE note_id = ?1"),
    id,
    read_note,
  )
}

pub fn note_ids_of(conn: &Connection, owner: Owner, id: Uuid) -> Result<Vec<Uuid>> {
  ids_of(conn, "notes", "note_id", owner, id)
}

// ─── Ownership ───────────────────────────────────────────────────────────────

/// Which foreign-key column ties a child row to its owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Owner {
  Person,
  Family,
  Asset,
}

impl Owner {
  pub fn column(self) -> &'static str {
    match self {
      Self::Person => "person_id",
      Self::Family => "family_id",
      Self::Asset => "asset_id",
    }
  }
}

fn ids_of(
  conn: &Connection,
  table: &str,
  key: &str,
  owner: Owner,
  id: Uuid,
) -> Result<Vec<Uuid>> {
  let sql = format!(
    "SELECT {key} FROM {table} WHERE {} = ?1 ORDER BY {key}",
    owner.column()
  );
  select_by(conn, &sql, id, |row| crate::encode::decode_uuid(&row.get::<_, String>(0)?))
}

/// Point the owner column of the given rows at `to` (or clear it).
pub fn reassign(
  conn: &Connection,
  table: &str,
  key: &str,
  owner: Owner,
  ids: &[Uuid],
  to: Option<Uuid>,
) -> Result<()> {
  let sql = format!("UPDATE {table} SET {} = ?1 WHERE {key} = ?2", owner.column());
  let mut stmt = conn.prepare(&sql)?;
  let to = encode_opt_uuid(to);
  for id in ids {
    stmt.execute(params![to, encode_uuid(*id)])?;
  }
  Ok(())
}

// ─── Edges ───────────────────────────────────────────────────────────────────

/// Insert an edge unless it already exists. Returns whether a row was added.
pub fn insert_relationship(conn: &Connection, r: &Relationship) -> Result<bool> {
  let added = conn.execute(
    &format!("INSERT OR IGNORE INTO relationships ({RELATIONSHIP_COLUMNS}) VALUES (?1, ?2, ?3)"),
    params![encode_uuid(r.parent_id), encode_uuid(r.child_id), r.rel_type.as_ref()],
  )?;
  Ok(added > 0)
}

pub fn delete_relationship(conn: &Connection, r: &Relationship) -> Result<()> {
  conn.execute(
    "DELETE FROM relationships WHERE parent_id = ?1 AND child_id = ?2 AND rel_type = ?3",
    params![encode_uuid(r.parent_id), encode_uuid(r.child_id), r.rel_type.as_ref()],
  )?;
  Ok(())
}

/// Edges in which `person` is either the parent or the child.
pub fn relationships_of(conn: &Connection, person: Uuid) -> Result<Vec<Relationship>> {
  select_by(
    conn,
    &format!(
      "SELECT {RELATIONSHIP_COLUMNS} FROM relationships
       WHERE parent_id = ?1 OR child_id = ?1
       ORDER BY parent_id, child_id"
    ),
    person,
    read_relationship,
  )
}

pub fn insert_family_child(conn: &Connection, fc: &FamilyChild) -> Result<bool> {
  let added = conn.execute(
    "INSERT OR IGNORE INTO family_children (family_id, child_id) VALUES (?1, ?2)",
    params![encode_uuid(fc.family_id), encode_uuid(fc.child_id)],
  )?;
  Ok(added > 0)
}

pub fn delete_family_child(conn: &Connection, fc: &FamilyChild) -> Result<()> {
  conn.execute(
    "DELETE FROM family_children WHERE family_id = ?1 AND child_id = ?2",
    params![encode_uuid(fc.family_id), encode_uuid(fc.child_id)],
  )?;
  Ok(())
}

pub fn children_of_family(conn: &Connection, family: Uuid) -> Result<Vec<FamilyChild>> {
  select_by(
    conn,
    "SELECT family_id, child_id FROM family_children WHERE family_id = ?1 ORDER BY child_id",
    family,
    read_family_child,
  )
}

pub fn memberships_of_child(conn: &Connection, child: Uuid) -> Result<Vec<FamilyChild>> {
  select_by(
    conn,
    "SELECT family_id, child_id FROM family_children WHERE child_id = ?1 ORDER BY family_id",
    child,
    read_family_child,
  )
}

// ─── Date normalizations ─────────────────────────────────────────────────────

pub fn upsert_normalization(conn: &Connection, dn: &DateNormalization) -> Result<()> {
  conn.execute(
    &format!(
      "INSERT OR REPLACE INTO date_normalizations ({NORMALIZATION_COLUMNS})
       VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"
    ),
    params![
      dn.entity_type.as_ref(),
      encode_uuid(dn.entity_id),
      dn.raw_value,
      dn.normalized,
      dn.precision.map(|p| p.as_ref().to_owned()),
      dn.qualifier.map(|q| q.as_ref().to_owned()),
      dn.confidence,
      dn.is_ambiguous,
    ],
  )?;
  Ok(())
}

pub fn get_normalization(
  conn: &Connection,
  kind: EntityKind,
  id: Uuid,
  raw: &str,
) -> Result<Option<DateNormalization>> {
  let mut stmt = conn.prepare(&format!(
    "SELECT {NORMALIZATION_COLUMNS} FROM date_normalizations
     WHERE entity_type = ?1 AND entity_id = ?2 AND raw_value = ?3"
  ))?;
  let rows = stmt.query(params![kind.as_ref(), encode_uuid(id), raw])?;
  Ok(collect(rows, read_normalization)?.into_iter().next())
}

pub fn normalizations_of(
  conn: &Connection,
  kind: EntityKind,
  id: Uuid,
) -> Result<Vec<DateNormalization>> {
  let mut stmt = conn.prepare(&format!(
    "SELECT {NORMALIZATION_COLUMNS} FROM date_normalizations
     WHERE entity_type = ?1 AND entity_id = ?2 ORDER BY raw_value"
  ))?;
  let rows = stmt.query(params![kind.as_ref(), encode_uuid(id)])?;
  collect(rows, read_normalization)
}

pub fn delete_normalization(
  conn: &Connection,
  kind: EntityKind,
  id: Uuid,
  raw: &str,
) -> Result<()> {
  conn.execute(
    "DELETE FROM date_normalizations
     WHERE entity_type = ?1 AND entity_id = ?2 AND raw_value = ?3",
    params![kind.as_ref(), encode_uuid(id), raw],
  )?;
  Ok(())
}

pub fn delete_normalizations_of(conn: &Connection, kind: EntityKind, id: Uuid) -> Result<()> {
  conn.execute(
    "DELETE FROM date_normalizations WHERE entity_type = ?1 AND entity_id = ?2",
    params![kind.as_ref(), encode_uuid(id)],
  )?;
  Ok(())
}

// ─── Snapshot ────────────────────────────────────────────────────────────────

/// Read the whole graph. When `media_root` is given, assets whose relative
/// path does not resolve to a file under it are marked missing.
pub fn load_graph(conn: &Connection, media_root: Option<&Path>) -> Result<Graph> {
  let media_assets = select_all(
    conn,
    &format!("SELECT {ASSET_COLUMNS} FROM media_assets ORDER BY asset_id"),
    read_asset,
  )?;
  let missing_media = match media_root {
    Some(root) => media_assets
      .iter()
      .filter(|a| !root.join(&a.path).is_file())
      .map(|a| a.id)
      .collect(),
    None => Default::default(),
  };

  Ok(Graph {
    persons: select_all(
      conn,
      &format!("SELECT {PERSON_COLUMNS} FROM persons ORDER BY person_id"),
      read_person,
    )?,
    families: select_all(
      conn,
      &format!("SELECT {FAMILY_COLUMNS} FROM families ORDER BY family_id"),
      read_family,
    )?,
    events: select_all(
      conn,
      &format!("SELECT {EVENT_COLUMNS} FROM events ORDER BY event_id"),
      read_event,
    )?,
    media_links: select_all(
      conn,
      &format!("SELECT {LINK_COLUMNS} FROM media_links ORDER BY link_id"),
      read_link,
    )?,
    relationships: select_all(
      conn,
      &format!("SELECT {RELATIONSHIP_COLUMNS} FROM relationships ORDER BY parent_id, child_id"),
      read_relationship,
    )?,
    family_children: select_all(
      conn,
      "SELECT family_id, child_id FROM family_children ORDER BY family_id, child_id",
      read_family_child,
    )?,
    media_assets,
    missing_media,
  })
}
