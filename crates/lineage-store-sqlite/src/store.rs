//! [`SqliteStore`]: the SQLite implementation of [`QualityStore`].

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use lineage_core::{
  action::{ActionLog, ActionRequest},
  date::DateNormalization,
  detect::DetectorRegistry,
  graph::{
    EntityKind, Event, Family, FamilyChild, Graph, MediaAsset, MediaLink, Note, Person,
    Place, PlaceVariant, Relationship,
  },
  issue::Issue,
  settings::DetectionSettings,
  store::{DetectionReport, IssuePage, IssueQuery, QualityStore, Summary},
};
use uuid::Uuid;

use crate::{
  Error, Result, actions, detection,
  graph::{self, Owner},
  issues, remediate,
  schema::SCHEMA,
  undo,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Lineage graph and its data-quality state, backed by one SQLite file.
///
/// Cloning is cheap; the connection and registry are reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn:       tokio_rusqlite::Connection,
  registry:   Arc<DetectorRegistry>,
  media_root: Option<Arc<PathBuf>>,
}

impl SqliteStore {
  /// Open (or create) a store at `path` with the standard detectors.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    Self::init(conn).await
  }

  /// Open an in-memory store, mostly for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    Self::init(conn).await
  }

  async fn init(conn: tokio_rusqlite::Connection) -> Result<Self> {
    conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(Self {
      conn,
      registry: Arc::new(DetectorRegistry::standard(&DetectionSettings::default())),
      media_root: None,
    })
  }

  /// Rebuild the standard detectors with `settings`.
  pub fn with_settings(self, settings: &DetectionSettings) -> Self {
    self.with_registry(DetectorRegistry::standard(settings))
  }

  /// Replace the detector set entirely.
  pub fn with_registry(mut self, registry: DetectorRegistry) -> Self {
    self.registry = Arc::new(registry);
    self
  }

  /// Check media file presence against this directory during detection.
  pub fn with_media_root(mut self, root: impl Into<PathBuf>) -> Self {
    self.media_root = Some(Arc::new(root.into()));
    self
  }

  pub fn detectors(&self) -> Vec<&'static str> { self.registry.names() }

  /// Run `op` on the database thread.
  async fn with_conn<T, F>(&self, op: F) -> Result<T>
  where
    F: FnOnce(&mut rusqlite::Connection) -> Result<T> + Send + 'static,
    T: Send + 'static,
  {
    self.conn.call(move |conn| Ok(op(conn))).await?
  }

  // ── Graph ─────────────────────────────────────────────────────────────────

  pub async fn add_person(&self, person: &Person) -> Result<()> {
    let person = person.clone();
    self.with_conn(move |conn| graph::insert_person(conn, &person)).await
  }

  pub async fn get_person(&self, id: Uuid) -> Result<Option<Person>> {
    self.with_conn(move |conn| graph::get_person(conn, id)).await
  }

  /// Delete a person outside any merge. Spouse references are cleared.
  pub async fn delete_person(&self, id: Uuid) -> Result<()> {
    let deleted = self.with_conn(move |conn| graph::delete_person(conn, id)).await?;
    if deleted {
      Ok(())
    } else {
      Err(lineage_core::Error::not_found(EntityKind::Person, id).into())
    }
  }

  pub async fn add_family(&self, family: &Family) -> Result<()> {
    let family = family.clone();
    self.with_conn(move |conn| graph::insert_family(conn, &family)).await
  }

  pub async fn get_family(&self, id: Uuid) -> Result<Option<Family>> {
    self.with_conn(move |conn| graph::get_family(conn, id)).await
  }

  pub async fn add_event(&self, event: &Event) -> Result<()> {
    let event = event.clone();
    self.with_conn(move |conn| graph::insert_event(conn, &event)).await
  }

  pub async fn get_event(&self, id: Uuid) -> Result<Option<Event>> {
    self.with_conn(move |conn| graph::get_event(conn, id)).await
  }

  pub async fn add_place(&self, place: &Place) -> Result<()> {
    let place = place.clone();
    self.with_conn(move |conn| graph::insert_place(conn, &place)).await
  }

  pub async fn get_place(&self, id: Uuid) -> Result<Option<Place>> {
    self.with_conn(move |conn| graph::get_place(conn, id)).await
  }

  pub async fn find_place(&self, name: &str) -> Result<Option<Place>> {
    let name = name.to_owned();
    self.with_conn(move |conn| graph::find_place(conn, &name)).await
  }

  pub async fn place_variants(&self, place_id: Uuid) -> Result<Vec<PlaceVariant>> {
    self.with_conn(move |conn| graph::variants_of(conn, place_id)).await
  }

  pub async fn add_media_asset(&self, asset: &MediaAsset) -> Result<()> {
    let asset = asset.clone();
    self.with_conn(move |conn| graph::insert_asset(conn, &asset)).await
  }

  pub async fn get_media_asset(&self, id: Uuid) -> Result<Option<MediaAsset>> {
    self.with_conn(move |conn| graph::get_asset(conn, id)).await
  }

  pub async fn add_media_link(&self, link: &MediaLink) -> Result<()> {
    let link = link.clone();
    self.with_conn(move |conn| graph::insert_link(conn, &link)).await
  }

  pub async fn get_media_link(&self, id: Uuid) -> Result<Option<MediaLink>> {
    self.with_conn(move |conn| graph::get_link(conn, id)).await
  }

  /// Links attached to an asset.
  pub async fn links_of_asset(&self, asset_id: Uuid) -> Result<Vec<MediaLink>> {
    self.with_conn(move |conn| graph::links_of(conn, Owner::Asset, asset_id)).await
  }

  pub async fn add_note(&self, note: &Note) -> Result<()> {
    let note = note.clone();
    self.with_conn(move |conn| graph::insert_note(conn, &note)).await
  }

  pub async fn get_note(&self, id: Uuid) -> Result<Option<Note>> {
    self.with_conn(move |conn| graph::get_note(conn, id)).await
  }

  /// Returns `false` when the edge already existed.
  pub async fn add_relationship(&self, edge: Relationship) -> Result<bool> {
    self.with_conn(move |conn| graph::insert_relationship(conn, &edge)).await
  }

  pub async fn relationships_of(&self, person: Uuid) -> Result<Vec<Relationship>> {
    self.with_conn(move |conn| graph::relationships_of(conn, person)).await
  }

  pub async fn add_family_child(&self, membership: FamilyChild) -> Result<bool> {
    self.with_conn(move |conn| graph::insert_family_child(conn, &membership)).await
  }

  pub async fn family_children_of(&self, family: Uuid) -> Result<Vec<FamilyChild>> {
    self.with_conn(move |conn| graph::children_of_family(conn, family)).await
  }

  pub async fn date_normalizations_for(
    &self,
    kind: EntityKind,
    id: Uuid,
  ) -> Result<Vec<DateNormalization>> {
    self.with_conn(move |conn| graph::normalizations_of(conn, kind, id)).await
  }

  /// Read the whole graph as detection would see it.
  pub async fn load_graph(&self) -> Result<Graph> {
    let media_root = self.media_root.clone();
    self
      .with_conn(move |conn| graph::load_graph(conn, media_root.as_deref().map(PathBuf::as_path)))
      .await
  }
}

// ─── QualityStore impl ───────────────────────────────────────────────────────

impl QualityStore for SqliteStore {
  type Error = Error;

  async fn run_detection(&self, full_rescan: bool) -> Result<DetectionReport> {
    let registry = Arc::clone(&self.registry);
    let media_root = self.media_root.clone();
    self
      .with_conn(move |conn| {
        detection::run(conn, &registry, media_root.as_deref().map(PathBuf::as_path), full_rescan)
      })
      .await
  }

  async fn list_issues<'a>(&'a self, query: &'a IssueQuery) -> Result<IssuePage> {
    let query = query.clone();
    self.with_conn(move |conn| issues::list(conn, &query)).await
  }

  async fn get_issue(&self, id: Uuid) -> Result<Option<Issue>> {
    self.with_conn(move |conn| issues::get(conn, id)).await
  }

  async fn summary(&self) -> Result<Summary> {
    self.with_conn(|conn| issues::summary(conn)).await
  }

  async fn apply_action(
    &self,
    request: ActionRequest,
    applied_by: Option<String>,
  ) -> Result<ActionLog> {
    self.with_conn(move |conn| remediate::apply(conn, request, applied_by)).await
  }

  async fn undo(&self, action_id: Uuid) -> Result<()> {
    self.with_conn(move |conn| undo::undo(conn, action_id)).await
  }

  async fn list_actions(&self, limit: usize) -> Result<Vec<ActionLog>> {
    self.with_conn(move |conn| actions::list(conn, limit)).await
  }

  async fn get_action(&self, id: Uuid) -> Result<Option<ActionLog>> {
    self.with_conn(move |conn| actions::get(conn, id)).await
  }
}
