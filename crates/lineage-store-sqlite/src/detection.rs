//! One detection run: snapshot, detect, persist.

use std::path::Path;

use chrono::Utc;
use lineage_core::{detect::DetectorRegistry, store::DetectionReport};
use rusqlite::Connection;

use crate::{Result, graph, issues};

pub fn run(
  conn: &mut Connection,
  registry: &DetectorRegistry,
  media_root: Option<&Path>,
  full_rescan: bool,
) -> Result<DetectionReport> {
  let tx = conn.transaction()?;

  if full_rescan {
    let cleared = issues::delete_open(&tx)?;
    tx.execute("DELETE FROM date_normalizations", [])?;
    tracing::debug!(cleared, "cleared open issues for full rescan");
  }

  let snapshot = graph::load_graph(&tx, media_root)?;
  let outcome = registry.run(&snapshot);

  for failure in &outcome.failures {
    tracing::warn!(
      detector = %failure.detector,
      error = %failure.message,
      "detector failed; continuing without its findings"
    );
  }
  tracing::debug!(detectors = ?outcome.completed, "detectors completed");

  let mut seen = if full_rescan {
    Default::default()
  } else {
    issues::open_fingerprints(&tx)?
  };

  let now = Utc::now();
  let mut report = DetectionReport { full_rescan, ..Default::default() };
  for issue in &outcome.findings.issues {
    *report.counts.entry(issue.issue_type()).or_default() += 1;
    if seen.insert(issue.fingerprint()) {
      issues::insert(&tx, issue, now)?;
      report.inserted += 1;
    }
  }

  for dn in &outcome.findings.date_normalizations {
    graph::upsert_normalization(&tx, dn)?;
  }
  report.date_normalizations = outcome.findings.date_normalizations.len();
  report.failures = outcome.failures;

  tx.commit()?;

  tracing::info!(
    full_rescan,
    detected = report.total(),
    inserted = report.inserted,
    failures = report.failures.len(),
    "detection run complete"
  );
  Ok(report)
}
