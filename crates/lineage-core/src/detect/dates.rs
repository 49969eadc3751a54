//! Date parsing over every raw date column.

use uuid::Uuid;

use super::{Detector, Findings};
use crate::{
  Result,
  date::{DateField, DateNormalization, parse_date},
  graph::{EntityKind, Graph},
  issue::{Explanation, NewIssue, Severity},
};

/// Parses every non-empty raw date and records the result. An issue is
/// raised only for values that are not already canonical; ambiguous and
/// unreadable values are errors.
pub struct DateNormalizationDetector;

impl DateNormalizationDetector {
  fn visit(
    findings: &mut Findings,
    entity_type: EntityKind,
    entity_id: Uuid,
    field: DateField,
    raw: Option<&str>,
  ) {
    let Some(raw) = raw.filter(|r| !r.trim().is_empty()) else {
      return;
    };
    let parsed = parse_date(raw);
    findings
      .date_normalizations
      .push(DateNormalization::from_parsed(entity_type, entity_id, raw, &parsed));

    if parsed.is_canonical(raw) {
      return;
    }
    let severity = match (parsed.is_ambiguous, entity_type) {
      (true, _) => Severity::Error,
      (false, EntityKind::Event) => Severity::Info,
      (false, _) => Severity::Warning,
    };
    findings.issues.push(NewIssue {
      severity,
      entity_type,
      entity_ids: vec![entity_id],
      confidence: if parsed.is_ambiguous { 1.0 } else { parsed.confidence },
      impact_score: 0.5,
      explanation: Explanation::DateNormalization {
        field,
        raw: raw.to_owned(),
        normalized: parsed.normalized,
        precision: parsed.precision,
        qualifier: parsed.qualifier,
        ambiguous: parsed.is_ambiguous,
      },
    });
  }
}

impl Detector for DateNormalizationDetector {
  fn name(&self) -> &'static str { "date_normalization" }

  fn detect(&self, graph: &Graph) -> Result<Findings> {
    let mut findings = Findings::default();
    for p in &graph.persons {
      Self::visit(&mut findings, EntityKind::Person, p.id, DateField::BirthDate, p.birth_date.as_deref());
      Self::visit(&mut findings, EntityKind::Person, p.id, DateField::DeathDate, p.death_date.as_deref());
    }
    for e in &graph.events {
      Self::visit(&mut findings, EntityKind::Event, e.id, DateField::Date, e.date_raw.as_deref());
    }
    for f in &graph.families {
      Self::visit(
        &mut findings,
        EntityKind::Family,
        f.id,
        DateField::MarriageDate,
        f.marriage_date.as_deref(),
      );
    }
    Ok(findings)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::graph::{Event, EventType, Person};

  #[test]
  fn canonical_dates_are_recorded_without_issues() {
    let graph = Graph {
      persons: vec![Person {
        birth_date: Some("1900-01-01".into()),
        death_date: Some("1950".into()),
        ..Person::new()
      }],
      ..Default::default()
    };
    let findings = DateNormalizationDetector.detect(&graph).unwrap();
    assert_eq!(findings.date_normalizations.len(), 2);
    assert!(findings.issues.is_empty());
  }

  #[test]
  fn severity_follows_ambiguity_and_entity() {
    let graph = Graph {
      persons: vec![Person { birth_date: Some("02/03/1900".into()), ..Person::new() }],
      events: vec![Event { date_raw: Some("1 JAN 1900".into()), ..Event::new(EventType::Census) }],
      ..Default::default()
    };
    let findings = DateNormalizationDetector.detect(&graph).unwrap();
    let severities: Vec<_> = findings.issues.iter().map(|i| i.severity).collect();
    assert_eq!(severities, vec![Severity::Error, Severity::Info]);
    assert!(findings.date_normalizations[0].is_ambiguous);
  }

  #[test]
  fn blank_dates_are_skipped() {
    let graph = Graph {
      persons: vec![Person { birth_date: Some("  ".into()), ..Person::new() }],
      ..Default::default()
    };
    let findings = DateNormalizationDetector.detect(&graph).unwrap();
    assert!(findings.date_normalizations.is_empty());
    assert!(findings.issues.is_empty());
  }
}
