//! Name-casing suggestions.

use super::{Detector, Findings};
use crate::{
  Result,
  graph::{EntityKind, Graph},
  issue::{Explanation, FieldSuggestion, NewIssue, Severity},
  settings::DetectionSettings,
  similarity::{normalize_name, title_case},
};

/// Suggests a trimmed, title-cased form for names stored in all-upper or
/// all-lower case. Placeholder values are left to the integrity detector.
pub struct FieldStandardizationDetector {
  settings: DetectionSettings,
}

impl FieldStandardizationDetector {
  pub fn new(settings: DetectionSettings) -> Self { Self { settings } }

  fn suggest(&self, value: Option<&str>) -> Option<FieldSuggestion> {
    let current = value?;
    let trimmed = current.trim();
    if !trimmed.chars().any(char::is_alphabetic)
      || self.settings.is_placeholder(&normalize_name(Some(trimmed)))
    {
      return None;
    }
    let single_case =
      trimmed == trimmed.to_uppercase() || trimmed == trimmed.to_lowercase();
    if !single_case {
      return None;
    }
    let suggested = title_case(trimmed);
    (suggested != current).then(|| FieldSuggestion {
      current: current.to_owned(),
      suggested,
    })
  }
}

impl Detector for FieldStandardizationDetector {
  fn name(&self) -> &'static str { "field_standardization" }

  fn detect(&self, graph: &Graph) -> Result<Findings> {
    let issues = graph
      .persons
      .iter()
      .filter_map(|person| {
        let given = self.suggest(person.given.as_deref());
        let surname = self.suggest(person.surname.as_deref());
        if given.is_none() && surname.is_none() {
          return None;
        }
        Some(NewIssue {
          severity:     Severity::Info,
          entity_type:  EntityKind::Person,
          entity_ids:   vec![person.id],
          confidence:   0.8,
          impact_score: 0.3,
          explanation:  Explanation::NameStandardization { given, surname },
        })
      })
      .collect();
    Ok(Findings::issues(issues))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::graph::Person;

  fn run(given: &str, surname: &str) -> Vec<NewIssue> {
    let graph = Graph {
      persons: vec![Person {
        given: Some(given.into()),
        surname: Some(surname.into()),
        ..Person::new()
      }],
      ..Default::default()
    };
    FieldStandardizationDetector::new(DetectionSettings::default())
      .detect(&graph)
      .unwrap()
      .issues
  }

  #[test]
  fn upper_case_surname_gets_title_case() {
    let issues = run("John", "SMITH");
    assert_eq!(issues.len(), 1);
    match &issues[0].explanation {
      Explanation::NameStandardization { given, surname } => {
        assert!(given.is_none());
        assert_eq!(surname.as_ref().unwrap().suggested, "Smith");
      }
      other => panic!("unexpected explanation {other:?}"),
    }
  }

  #[test]
  fn mixed_case_and_placeholders_are_left_alone() {
    assert!(run("John", "McDonald").is_empty());
    assert!(run("UNKNOWN", "Smith").is_empty());
  }

  #[test]
  fn padded_lower_case_is_trimmed() {
    let issues = run("  mary ", "Smith");
    match &issues[0].explanation {
      Explanation::NameStandardization { given: Some(g), .. } => {
        assert_eq!(g.suggested, "Mary");
      }
      other => panic!("unexpected explanation {other:?}"),
    }
  }
}
