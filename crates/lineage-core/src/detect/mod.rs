//! The detection engine.
//!
//! Each [`Detector`] inspects a [`Graph`] snapshot and returns [`Findings`];
//! none of them touch storage. The [`DetectorRegistry`] runs every registered
//! detector independently, so one failing detector costs only its own
//! findings.

mod dates;
mod duplicates;
mod integrity;
mod media;
mod places;
mod standardize;

use serde::{Deserialize, Serialize};

pub use dates::DateNormalizationDetector;
pub use duplicates::{DuplicateFamilyDetector, DuplicatePersonDetector};
pub use integrity::IntegrityDetector;
pub use media::MediaDuplicateDetector;
pub use places::PlaceClusterDetector;
pub use standardize::FieldStandardizationDetector;

use crate::{
  Result, date::DateNormalization, graph::Graph, issue::NewIssue,
  settings::DetectionSettings,
};

/// What a detector found.
#[derive(Debug, Clone, Default)]
pub struct Findings {
  pub issues:              Vec<NewIssue>,
  /// Parse results to record alongside the issues.
  pub date_normalizations: Vec<DateNormalization>,
}

impl Findings {
  pub fn issues(issues: Vec<NewIssue>) -> Self {
    Self { issues, date_normalizations: Vec::new() }
  }

  fn absorb(&mut self, other: Findings) {
    self.issues.extend(other.issues);
    self.date_normalizations.extend(other.date_normalizations);
  }
}

/// A single, independent check over the graph.
pub trait Detector: Send + Sync {
  /// Stable name used in logs and failure reports.
  fn name(&self) -> &'static str;

  fn detect(&self, graph: &Graph) -> Result<Findings>;
}

/// A detector that returned an error during a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectorFailure {
  pub detector: String,
  pub message:  String,
}

/// Combined result of running a registry.
#[derive(Debug, Default)]
pub struct DetectionOutcome {
  pub findings:  Findings,
  /// Names of the detectors that completed, in run order.
  pub completed: Vec<&'static str>,
  pub failures:  Vec<DetectorFailure>,
}

/// An ordered set of detectors.
#[derive(Default)]
pub struct DetectorRegistry {
  detectors: Vec<Box<dyn Detector>>,
}

impl DetectorRegistry {
  pub fn new() -> Self { Self::default() }

  /// Every built-in detector, configured from `settings`.
  pub fn standard(settings: &DetectionSettings) -> Self {
    let mut registry = Self::new();
    registry
      .register(DuplicatePersonDetector::new(settings.clone()))
      .register(FieldStandardizationDetector::new(settings.clone()))
      .register(PlaceClusterDetector::new(settings.clone()))
      .register(DuplicateFamilyDetector)
      .register(MediaDuplicateDetector::new(settings.clone()))
      .register(IntegrityDetector::new(settings.clone()))
      .register(DateNormalizationDetector);
    registry
  }

  pub fn register(&mut self, detector: impl Detector + 'static) -> &mut Self {
    self.detectors.push(Box::new(detector));
    self
  }

  pub fn names(&self) -> Vec<&'static str> {
    self.detectors.iter().map(|d| d.name()).collect()
  }

  /// Run every detector against `graph`. Failures are collected, not
  /// propagated.
  pub fn run(&self, graph: &Graph) -> DetectionOutcome {
    let mut outcome = DetectionOutcome::default();
    for detector in &self.detectors {
      match detector.detect(graph) {
        Ok(findings) => {
          outcome.findings.absorb(findings);
          outcome.completed.push(detector.name());
        }
        Err(e) => outcome.failures.push(DetectorFailure {
          detector: detector.name().to_owned(),
          message:  e.to_string(),
        }),
      }
    }
    outcome
  }
}

impl std::fmt::Debug for DetectorRegistry {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_list().entries(self.names()).finish()
  }
}
