use lineage_core::{
  Error as CoreError,
  date::Precision,
  detect::{Detector, DetectorRegistry, DuplicatePersonDetector, Findings},
  graph::{EntityKind, Graph},
  issue::{IssueStatus, IssueType, Severity},
  settings::DetectionSettings,
  store::{IssueQuery, QualityStore},
};

use super::{add, issues_of, person, store};

// ─── Runs ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn empty_store_detects_nothing() {
  let s = store().await;
  let report = s.run_detection(true).await.unwrap();
  assert_eq!(report.total(), 0);
  assert_eq!(report.inserted, 0);
  assert!(report.failures.is_empty());

  let summary = s.summary().await.unwrap();
  assert_eq!(summary.data_quality_score, 60.0);
  assert_eq!(summary.unresolved_duplicates, 0);
}

#[tokio::test]
async fn near_identical_names_are_flagged_as_duplicates() {
  let s = store().await;
  let john = add(&s, &person("John", "Smith", Some("1880"))).await;
  let jon = add(&s, &person("Jon", "Smith", Some("1880"))).await;

  let report = s.run_detection(true).await.unwrap();
  assert_eq!(report.counts.get(&IssueType::DuplicatePerson), Some(&1));

  let dups = issues_of(&s, IssueType::DuplicatePerson).await;
  assert_eq!(dups.len(), 1);
  let issue = &dups[0];
  assert_eq!(issue.entity_type, EntityKind::Person);
  assert_eq!(issue.status, IssueStatus::Open);
  assert_eq!(issue.severity, Severity::Warning);
  assert!(issue.entity_ids.contains(&john.id));
  assert!(issue.entity_ids.contains(&jon.id));
  assert!(issue.confidence >= 0.55);

  let fetched = s.get_issue(issue.id).await.unwrap().unwrap();
  assert_eq!(&fetched, issue);
}

#[tokio::test]
async fn full_rescan_is_idempotent() {
  let s = store().await;
  add(&s, &person("John", "Smith", Some("1880"))).await;
  add(&s, &person("Jon", "Smith", Some("1880"))).await;
  add(&s, &person("MARY", "jones", Some("3 MAR 1850"))).await;

  let first = s.run_detection(true).await.unwrap();
  let second = s.run_detection(true).await.unwrap();
  assert_eq!(first.counts, second.counts);
  assert_eq!(second.inserted, second.total());

  let page = s.list_issues(&IssueQuery::default()).await.unwrap();
  assert_eq!(page.total, second.total());
}

#[tokio::test]
async fn incremental_run_skips_known_fingerprints() {
  let s = store().await;
  add(&s, &person("John", "Smith", Some("1880"))).await;
  add(&s, &person("Jon", "Smith", Some("1880"))).await;

  let full = s.run_detection(true).await.unwrap();
  let incremental = s.run_detection(false).await.unwrap();
  assert!(!incremental.full_rescan);
  assert_eq!(incremental.total(), full.total());
  assert_eq!(incremental.inserted, 0);

  // A new finding is still picked up.
  add(&s, &person("Johnny", "Smith", Some("1880"))).await;
  let after = s.run_detection(false).await.unwrap();
  assert!(after.inserted > 0);
  let dups = issues_of(&s, IssueType::DuplicatePerson).await;
  let mut fingerprints: Vec<_> = dups.iter().map(|i| i.fingerprint.clone()).collect();
  fingerprints.sort();
  fingerprints.dedup();
  assert_eq!(fingerprints.len(), dups.len());
}

struct Exploding;

impl Detector for Exploding {
  fn name(&self) -> &'static str { "exploding" }

  fn detect(&self, _: &Graph) -> lineage_core::Result<Findings> {
    Err(CoreError::invalid("detector blew up"))
  }
}

#[tokio::test]
async fn failing_detector_does_not_block_the_others() {
  let mut registry = DetectorRegistry::new();
  registry
    .register(Exploding)
    .register(DuplicatePersonDetector::new(DetectionSettings::default()));
  let s = store().await.with_registry(registry);
  add(&s, &person("John", "Smith", Some("1880"))).await;
  add(&s, &person("Jon", "Smith", Some("1880"))).await;

  let report = s.run_detection(true).await.unwrap();
  assert_eq!(report.failures.len(), 1);
  assert_eq!(report.failures[0].detector, "exploding");
  assert_eq!(report.inserted, 1);
  assert_eq!(issues_of(&s, IssueType::DuplicatePerson).await.len(), 1);
}

// ─── Dates and summary ───────────────────────────────────────────────────────

#[tokio::test]
async fn parses_are_recorded_for_every_raw_date() {
  let s = store().await;
  let p = add(&s, &person("Ada", "Byron", Some("10 DEC 1815"))).await;

  let report = s.run_detection(true).await.unwrap();
  assert_eq!(report.date_normalizations, 1);

  let rows = s.date_normalizations_for(EntityKind::Person, p.id).await.unwrap();
  assert_eq!(rows.len(), 1);
  assert_eq!(rows[0].raw_value, "10 DEC 1815");
  assert_eq!(rows[0].normalized.as_deref(), Some("1815-12-10"));
  assert_eq!(rows[0].precision, Some(Precision::Day));

  let issues = issues_of(&s, IssueType::DateNormalization).await;
  assert_eq!(issues.len(), 1);
  assert_eq!(issues[0].severity, Severity::Warning);
}

#[tokio::test]
async fn summary_reflects_open_issues() {
  let s = store().await;
  add(&s, &person("John", "Smith", Some("1880"))).await;
  add(&s, &person("Jon", "Smith", Some("1880"))).await;
  s.run_detection(true).await.unwrap();

  let summary = s.summary().await.unwrap();
  assert_eq!(summary.unresolved_duplicates, 1);
  assert_eq!(summary.standardized_dates_pct, 100.0);
  // 0.4 + 0.3/2 + 0.2 + 0.1
  assert_eq!(summary.data_quality_score, 85.0);
}

#[tokio::test]
async fn issues_paginate_with_a_stable_total() {
  let s = store().await;
  for given in ["ann", "bob", "cy"] {
    add(&s, &person(given, "Lee", None)).await;
  }
  s.run_detection(true).await.unwrap();

  let query = IssueQuery {
    issue_type: Some(IssueType::NameStandardization),
    per_page: 2,
    ..Default::default()
  };
  let first = s.list_issues(&query).await.unwrap();
  assert_eq!(first.total, 3);
  assert_eq!(first.items.len(), 2);

  let second = s.list_issues(&IssueQuery { page: 2, ..query }).await.unwrap();
  assert_eq!(second.total, 3);
  assert_eq!(second.items.len(), 1);
  assert!(first.items.iter().all(|i| i.id != second.items[0].id));
}
