use chrono::NaiveDate;
use lineage_core::{
  ErrorKind,
  action::{ActionRequest, ActionType, DateNormalizationItem, NameItem},
  date::{DateField, Precision},
  graph::{EntityKind, Event, EventType, Person},
  issue::{IssueStatus, IssueType, Severity},
  store::QualityStore,
};

use super::{add, issues_of, open_issues_of, person, store};

// ─── Places ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn normalizing_places_rewrites_every_spelling() {
  let s = store().await;
  let owner = add(&s, &person("Paul", "Revere", None)).await;
  let mut events = Vec::new();
  for spelling in ["Boston, Mass.", "boston, mass", "Boston, Mass."] {
    let event = Event {
      person_id: Some(owner.id),
      place_raw: Some(spelling.into()),
      ..Event::new(EventType::Residence)
    };
    s.add_event(&event).await.unwrap();
    events.push(event);
  }
  let born_there = add(
    &s,
    &Person { birth_place: Some("Boston; Massachusetts".into()), ..person("Rose", "Kennedy", None) },
  )
  .await;

  s.run_detection(true).await.unwrap();
  let cluster = issues_of(&s, IssueType::PlaceCluster).await;
  assert_eq!(cluster.len(), 1);

  let request = ActionRequest::NormalizePlaces {
    canonical: "Boston, Massachusetts".into(),
    variants:  vec!["Boston, Mass.".into(), "boston, mass".into(), "Boston; Massachusetts".into()],
  };
  let log = s.apply_action(request, None).await.unwrap();
  assert_eq!(log.action_type, ActionType::NormalizePlaces);

  let place = s.find_place("Boston, Massachusetts").await.unwrap().expect("place created");
  assert_eq!(s.place_variants(place.id).await.unwrap().len(), 3);
  for event in &events {
    let after = s.get_event(event.id).await.unwrap().unwrap();
    assert_eq!(after.place_raw.as_deref(), Some("Boston, Massachusetts"));
    assert_eq!(after.place_id, Some(place.id));
  }
  assert_eq!(
    s.get_person(born_there.id).await.unwrap().unwrap().birth_place.as_deref(),
    Some("Boston, Massachusetts")
  );
  assert_eq!(s.get_issue(cluster[0].id).await.unwrap().unwrap().status, IssueStatus::Resolved);

  s.undo(log.id).await.unwrap();
  assert!(s.find_place("Boston, Massachusetts").await.unwrap().is_none());
  for event in &events {
    assert_eq!(&s.get_event(event.id).await.unwrap().unwrap(), event);
  }
  assert_eq!(s.get_person(born_there.id).await.unwrap().unwrap(), born_there);
  assert_eq!(open_issues_of(&s, IssueType::PlaceCluster).await.len(), 1);
}

#[tokio::test]
async fn place_normalization_validates_its_input() {
  let s = store().await;
  let request = ActionRequest::NormalizePlaces { canonical: "  ".into(), variants: vec!["x".into()] };
  let err = s.apply_action(request, None).await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::InvalidArgument);
  assert!(s.list_actions(10).await.unwrap().is_empty());
}

// ─── Dates ───────────────────────────────────────────────────────────────────

fn confirmed(kind: EntityKind, id: uuid::Uuid, raw: &str, normalized: &str) -> DateNormalizationItem {
  DateNormalizationItem {
    entity_type: kind,
    entity_id:   id,
    field:       None,
    raw:         raw.into(),
    normalized:  Some(normalized.into()),
    precision:   Some(Precision::Day),
    qualifier:   None,
    confidence:  1.0,
    ambiguous:   false,
  }
}

#[tokio::test]
async fn confirming_an_ambiguous_event_date_sets_its_canonical_date() {
  let s = store().await;
  let owner = add(&s, &person("Ida", "Wells", None)).await;
  let event = Event {
    person_id: Some(owner.id),
    date_raw: Some("3/4/1881".into()),
    ..Event::new(EventType::Census)
  };
  s.add_event(&event).await.unwrap();

  s.run_detection(true).await.unwrap();
  let flagged = issues_of(&s, IssueType::DateNormalization).await;
  assert_eq!(flagged.len(), 1);
  assert_eq!(flagged[0].severity, Severity::Error);
  let detected = s.date_normalizations_for(EntityKind::Event, event.id).await.unwrap();
  assert!(detected[0].is_ambiguous);
  assert!(detected[0].normalized.is_none());

  let item = DateNormalizationItem {
    field: Some(DateField::Date),
    ..confirmed(EntityKind::Event, event.id, "3/4/1881", "1881-04-03")
  };
  let log = s
    .apply_action(ActionRequest::NormalizeDates { items: vec![item] }, None)
    .await
    .unwrap();

  let after = s.get_event(event.id).await.unwrap().unwrap();
  assert_eq!(after.date_canonical, NaiveDate::from_ymd_opt(1881, 4, 3));
  assert_eq!(after.date_raw.as_deref(), Some("3/4/1881"));
  let rows = s.date_normalizations_for(EntityKind::Event, event.id).await.unwrap();
  assert_eq!(rows[0].normalized.as_deref(), Some("1881-04-03"));
  assert!(!rows[0].is_ambiguous);
  assert!(open_issues_of(&s, IssueType::DateNormalization).await.is_empty());

  s.undo(log.id).await.unwrap();
  assert_eq!(s.get_event(event.id).await.unwrap().unwrap(), event);
  assert_eq!(s.date_normalizations_for(EntityKind::Event, event.id).await.unwrap(), detected);
  assert_eq!(open_issues_of(&s, IssueType::DateNormalization).await.len(), 1);
}

/// An event whose canonical date was derived earlier.
async fn census_on(s: &crate::SqliteStore, raw: &str) -> Event {
  let owner = add(s, &person("Ida", "Wells", None)).await;
  let event = Event {
    person_id: Some(owner.id),
    date_raw: Some(raw.into()),
    date_canonical: NaiveDate::from_ymd_opt(1850, 1, 1),
    ..Event::new(EventType::Census)
  };
  s.add_event(&event).await.unwrap();
  event
}

#[tokio::test]
async fn range_dates_clear_the_event_canonical_date() {
  let s = store().await;
  let event = census_on(&s, "BET 1900 AND 1905").await;

  let item = DateNormalizationItem {
    precision: Some(Precision::Range),
    ..confirmed(EntityKind::Event, event.id, "BET 1900 AND 1905", "1900/1905")
  };
  let log = s
    .apply_action(ActionRequest::NormalizeDates { items: vec![item] }, None)
    .await
    .unwrap();
  let after = s.get_event(event.id).await.unwrap().unwrap();
  assert_eq!(after.date_canonical, None);
  assert_eq!(after.date_raw, event.date_raw);

  s.undo(log.id).await.unwrap();
  assert_eq!(s.get_event(event.id).await.unwrap().unwrap(), event);
}

#[tokio::test]
async fn ambiguous_dates_clear_the_event_canonical_date() {
  let s = store().await;
  let event = census_on(&s, "3/4/1881").await;

  let item = DateNormalizationItem {
    normalized: None,
    precision: None,
    confidence: 0.3,
    ambiguous: true,
    ..confirmed(EntityKind::Event, event.id, "3/4/1881", "")
  };
  let log = s
    .apply_action(ActionRequest::NormalizeDates { items: vec![item] }, None)
    .await
    .unwrap();
  assert_eq!(s.get_event(event.id).await.unwrap().unwrap().date_canonical, None);
  let rows = s.date_normalizations_for(EntityKind::Event, event.id).await.unwrap();
  assert!(rows[0].is_ambiguous);

  s.undo(log.id).await.unwrap();
  assert_eq!(s.get_event(event.id).await.unwrap().unwrap(), event);
  assert!(s.date_normalizations_for(EntityKind::Event, event.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn confirming_a_person_date_rewrites_the_raw_column() {
  let s = store().await;
  let p = add(&s, &person("Ada", "Byron", Some("10 DEC 1815"))).await;

  let item = confirmed(EntityKind::Person, p.id, "10 DEC 1815", "1815-12-10");
  let log = s
    .apply_action(ActionRequest::NormalizeDates { items: vec![item] }, None)
    .await
    .unwrap();
  let after = s.get_person(p.id).await.unwrap().unwrap();
  assert_eq!(after.birth_date.as_deref(), Some("1815-12-10"));
  assert_eq!(s.date_normalizations_for(EntityKind::Person, p.id).await.unwrap().len(), 1);

  s.undo(log.id).await.unwrap();
  assert_eq!(s.get_person(p.id).await.unwrap().unwrap(), p);
  assert!(s.date_normalizations_for(EntityKind::Person, p.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn date_items_must_name_a_matching_column() {
  let s = store().await;
  let p = add(&s, &person("Ada", "Byron", Some("1815"))).await;
  let item = DateNormalizationItem {
    field: Some(DateField::MarriageDate),
    ..confirmed(EntityKind::Person, p.id, "1815", "1815")
  };
  let err = s
    .apply_action(ActionRequest::NormalizeDates { items: vec![item] }, None)
    .await
    .unwrap_err();
  assert_eq!(err.kind(), ErrorKind::InvalidArgument);
}

// ─── Names ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn standardizing_names_resolves_suggestions() {
  let s = store().await;
  let p = add(&s, &person("john", "SMITH", None)).await;
  s.run_detection(true).await.unwrap();
  assert_eq!(open_issues_of(&s, IssueType::NameStandardization).await.len(), 1);

  let request = ActionRequest::StandardizeFields {
    items: vec![NameItem {
      person_id: p.id,
      given:     Some("John".into()),
      surname:   Some("Smith ".into()),
    }],
  };
  let log = s.apply_action(request, None).await.unwrap();
  let after = s.get_person(p.id).await.unwrap().unwrap();
  assert_eq!(after.given.as_deref(), Some("John"));
  assert_eq!(after.surname.as_deref(), Some("Smith"));
  assert!(open_issues_of(&s, IssueType::NameStandardization).await.is_empty());
  assert_eq!(s.summary().await.unwrap().standardization_suggestions, 0);

  s.undo(log.id).await.unwrap();
  assert_eq!(s.get_person(p.id).await.unwrap().unwrap(), p);
  assert_eq!(s.summary().await.unwrap().standardization_suggestions, 1);
}

#[tokio::test]
async fn standardizing_a_missing_person_changes_nothing() {
  let s = store().await;
  let p = add(&s, &person("john", "Smith", None)).await;
  let request = ActionRequest::StandardizeFields {
    items: vec![
      NameItem { person_id: p.id, given: Some("John".into()), surname: None },
      NameItem { person_id: uuid::Uuid::new_v4(), given: Some("X".into()), surname: None },
    ],
  };
  let err = s.apply_action(request, None).await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::NotFound);
  assert_eq!(s.get_person(p.id).await.unwrap().unwrap(), p);
}

// ─── Action log ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn actions_are_listed_newest_first() {
  let s = store().await;
  let p = add(&s, &person("john", "smith", None)).await;

  let first = ActionRequest::StandardizeFields {
    items: vec![NameItem { person_id: p.id, given: Some("John".into()), surname: None }],
  };
  let second = ActionRequest::StandardizeFields {
    items: vec![NameItem { person_id: p.id, given: None, surname: Some("Smith".into()) }],
  };
  let a = s.apply_action(first.clone(), Some("ops".into())).await.unwrap();
  let b = s.apply_action(second, None).await.unwrap();

  let listed = s.list_actions(10).await.unwrap();
  assert_eq!(listed.iter().map(|l| l.id).collect::<Vec<_>>(), vec![b.id, a.id]);
  assert_eq!(s.list_actions(1).await.unwrap().len(), 1);

  let fetched = s.get_action(a.id).await.unwrap().unwrap();
  assert_eq!(fetched.payload, first);
  assert_eq!(fetched.applied_by.as_deref(), Some("ops"));
  assert_eq!(fetched, a);

  // Undo in reverse order restores the original spelling.
  s.undo(b.id).await.unwrap();
  s.undo(a.id).await.unwrap();
  assert_eq!(s.get_person(p.id).await.unwrap().unwrap(), p);
}
