//! The `QualityStore` trait and its query and report types.
//!
//! Backends (e.g. `lineage-store-sqlite`) own the entity graph and run every
//! operation below inside a single transaction. Callers depend on this
//! abstraction rather than on a concrete backend.

use std::{collections::BTreeMap, future::Future};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  action::{ActionLog, ActionRequest},
  detect::DetectorFailure,
  issue::{Issue, IssueStatus, IssueType},
};

pub const DEFAULT_PER_PAGE: usize = 50;

// ─── Queries and reports ─────────────────────────────────────────────────────

/// Parameters for [`QualityStore::list_issues`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IssueQuery {
  pub issue_type: Option<IssueType>,
  pub status:     Option<IssueStatus>,
  /// 1-based.
  pub page:       usize,
  pub per_page:   usize,
}

impl Default for IssueQuery {
  fn default() -> Self {
    Self { issue_type: None, status: None, page: 1, per_page: DEFAULT_PER_PAGE }
  }
}

impl IssueQuery {
  /// `(limit, offset)` with out-of-range values clamped.
  pub fn window(&self) -> (usize, usize) {
    let per_page = self.per_page.clamp(1, 500);
    (per_page, (self.page.max(1) - 1).saturating_mul(per_page))
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssuePage {
  pub items: Vec<Issue>,
  /// Matching issues across all pages.
  pub total: usize,
}

/// Outcome of one detection run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectionReport {
  pub full_rescan:         bool,
  /// Issues detected in this run, per type.
  pub counts:              BTreeMap<IssueType, usize>,
  /// Issue rows written. Lower than the detected total on incremental runs
  /// when open issues with the same fingerprint already exist.
  pub inserted:            usize,
  pub date_normalizations: usize,
  pub failures:            Vec<DetectorFailure>,
}

impl DetectionReport {
  pub fn total(&self) -> usize { self.counts.values().sum() }
}

/// Headline numbers over the open issues.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
  pub data_quality_score:          f64,
  pub standardized_dates_pct:      f64,
  pub unresolved_duplicates:       usize,
  pub place_clusters:              usize,
  pub integrity_warnings:          usize,
  pub standardization_suggestions: usize,
}

impl Summary {
  /// Weighted score in `[0, 100]`: 40% normalised dates, 30% duplicates,
  /// 20% place clusters, 10% integrity. Each count term decays as
  /// `1 / (1 + n)`.
  pub fn compute(
    total_dates: usize,
    normalized_dates: usize,
    unresolved_duplicates: usize,
    place_clusters: usize,
    integrity_warnings: usize,
    standardization_suggestions: usize,
  ) -> Self {
    let standardized_dates_pct = if total_dates == 0 {
      0.0
    } else {
      round1(normalized_dates as f64 / total_dates as f64 * 100.0)
    };
    let decay = |n: usize| 1.0 / (1.0 + n as f64);
    let score = 0.4 * (standardized_dates_pct / 100.0)
      + 0.3 * decay(unresolved_duplicates)
      + 0.2 * decay(place_clusters)
      + 0.1 * decay(integrity_warnings);

    Self {
      data_quality_score: round1(score * 100.0),
      standardized_dates_pct,
      unresolved_duplicates,
      place_clusters,
      integrity_warnings,
      standardization_suggestions,
    }
  }
}

fn round1(value: f64) -> f64 { (value * 10.0).round() / 10.0 }

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a data-quality backend.
///
/// Every method is atomic: it either commits completely or leaves the store
/// untouched. All methods return `Send` futures so the trait can be used from
/// multi-threaded runtimes.
pub trait QualityStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Run every registered detector. With `full_rescan`, open issues and all
  /// date normalizations are replaced; otherwise only issues whose
  /// fingerprint has no open row are added.
  fn run_detection(
    &self,
    full_rescan: bool,
  ) -> impl Future<Output = Result<DetectionReport, Self::Error>> + Send + '_;

  fn list_issues<'a>(
    &'a self,
    query: &'a IssueQuery,
  ) -> impl Future<Output = Result<IssuePage, Self::Error>> + Send + 'a;

  fn get_issue(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Issue>, Self::Error>> + Send + '_;

  fn summary(&self) -> impl Future<Output = Result<Summary, Self::Error>> + Send + '_;

  /// Validate, snapshot, mutate and log one remediation. Open issues the
  /// change makes obsolete are resolved.
  fn apply_action(
    &self,
    request: ActionRequest,
    applied_by: Option<String>,
  ) -> impl Future<Output = Result<ActionLog, Self::Error>> + Send + '_;

  /// Reverse an action and delete its log entry. On failure the entry is
  /// kept so the undo can be retried.
  fn undo(&self, action_id: Uuid) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Most recent first.
  fn list_actions(
    &self,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<ActionLog>, Self::Error>> + Send + '_;

  fn get_action(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<ActionLog>, Self::Error>> + Send + '_;
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn clean_store_scores_sixty() {
    // No dates at all contributes nothing; every count term is at its max.
    let s = Summary::compute(0, 0, 0, 0, 0, 0);
    assert_eq!(s.data_quality_score, 60.0);
    assert_eq!(s.standardized_dates_pct, 0.0);
  }

  #[test]
  fn score_weights() {
    let s = Summary::compute(4, 3, 1, 0, 3, 2);
    assert_eq!(s.standardized_dates_pct, 75.0);
    // 0.4*0.75 + 0.3/2 + 0.2 + 0.1/4 = 0.675
    assert_eq!(s.data_quality_score, 67.5);
  }

  #[test]
  fn query_window_clamps() {
    let q = IssueQuery { page: 0, per_page: 0, ..Default::default() };
    assert_eq!(q.window(), (1, 0));
    let q = IssueQuery { page: 3, per_page: 20, ..Default::default() };
    assert_eq!(q.window(), (20, 40));
  }

  #[test]
  fn huge_page_numbers_saturate() {
    let q = IssueQuery { page: usize::MAX, per_page: 500, ..Default::default() };
    assert_eq!(q.window(), (500, usize::MAX));
  }
}
