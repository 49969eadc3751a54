//! Place spelling clusters.

use std::collections::BTreeMap;

use super::{Detector, Findings};
use crate::{
  Result,
  graph::{EntityKind, Graph},
  issue::{ClusterMethod, Explanation, NewIssue, Severity, VariantCount},
  settings::DetectionSettings,
  similarity::{normalize_place, round2, similarity},
};

const SAME_KEY_CONFIDENCE: f64 = 0.65;

/// Groups every place string in the graph by its normalised key. A key with
/// more than one literal spelling is a cluster; a second pass pairs distinct
/// keys that are still near-identical.
pub struct PlaceClusterDetector {
  settings: DetectionSettings,
}

impl PlaceClusterDetector {
  pub fn new(settings: DetectionSettings) -> Self { Self { settings } }
}

/// key → literal spelling → reference count
type Spellings = BTreeMap<String, BTreeMap<String, usize>>;

fn collect_spellings(graph: &Graph) -> Spellings {
  let places = graph
    .events
    .iter()
    .map(|e| e.place_raw.as_deref())
    .chain(
      graph
        .persons
        .iter()
        .flat_map(|p| [p.birth_place.as_deref(), p.death_place.as_deref()]),
    )
    .chain(graph.families.iter().map(|f| f.marriage_place.as_deref()))
    .flatten()
    .filter(|s| !s.trim().is_empty());

  let mut spellings = Spellings::new();
  for raw in places {
    let key = normalize_place(Some(raw));
    if key.is_empty() {
      continue;
    }
    *spellings.entry(key).or_default().entry(raw.to_owned()).or_default() += 1;
  }
  spellings
}

/// Variants ordered by count (descending) then spelling.
fn ranked(counts: &[(&String, &usize)]) -> Vec<VariantCount> {
  let mut variants: Vec<VariantCount> = counts
    .iter()
    .map(|(value, count)| VariantCount { value: (*value).clone(), count: **count })
    .collect();
  variants.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.value.cmp(&b.value)));
  variants
}

fn cluster_issue(
  method: ClusterMethod,
  keys: Vec<String>,
  variants: Vec<VariantCount>,
  confidence: f64,
) -> NewIssue {
  let total: usize = variants.iter().map(|v| v.count).sum();
  NewIssue {
    severity: Severity::Info,
    entity_type: EntityKind::Place,
    entity_ids: Vec::new(),
    confidence,
    impact_score: total as f64,
    explanation: Explanation::PlaceCluster {
      method,
      keys,
      canonical_suggestion: variants
        .first()
        .map(|v| v.value.clone())
        .unwrap_or_default(),
      variants,
    },
  }
}

impl Detector for PlaceClusterDetector {
  fn name(&self) -> &'static str { "place_cluster" }

  fn detect(&self, graph: &Graph) -> Result<Findings> {
    let spellings = collect_spellings(graph);
    let mut issues = Vec::new();

    for (key, counts) in spellings.iter().filter(|(_, c)| c.len() > 1) {
      let counts: Vec<_> = counts.iter().collect();
      issues.push(cluster_issue(
        ClusterMethod::SameKey,
        vec![key.clone()],
        ranked(&counts),
        SAME_KEY_CONFIDENCE,
      ));
    }

    let keys: Vec<&String> = spellings.keys().collect();
    for (i, a) in keys.iter().enumerate() {
      for b in &keys[i + 1..] {
        let sim = similarity(a, b);
        if sim < self.settings.place_min_similarity {
          continue;
        }
        let counts: Vec<_> = spellings[*a].iter().chain(spellings[*b].iter()).collect();
        issues.push(cluster_issue(
          ClusterMethod::SimilarKeys,
          vec![(*a).clone(), (*b).clone()],
          ranked(&counts),
          round2(SAME_KEY_CONFIDENCE * sim),
        ));
      }
    }

    Ok(Findings::issues(issues))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::graph::{Event, EventType, Person};

  fn graph_with_places(places: &[&str]) -> Graph {
    Graph {
      events: places
        .iter()
        .map(|p| Event {
          place_raw: Some((*p).into()),
          ..Event::new(EventType::Birth)
        })
        .collect(),
      ..Default::default()
    }
  }

  fn detect(graph: &Graph) -> Vec<NewIssue> {
    PlaceClusterDetector::new(DetectionSettings::default())
      .detect(graph)
      .unwrap()
      .issues
  }

  #[test]
  fn spellings_with_same_key_cluster() {
    let mut graph = graph_with_places(&["Boston, Mass.", "boston, mass", "Boston, Mass."]);
    graph.persons.push(Person {
      birth_place: Some("Boston; Massachusetts".into()),
      ..Person::new()
    });

    let issues = detect(&graph);
    assert_eq!(issues.len(), 1);
    match &issues[0].explanation {
      Explanation::PlaceCluster { method, canonical_suggestion, variants, .. } => {
        assert_eq!(*method, ClusterMethod::SameKey);
        assert_eq!(canonical_suggestion, "Boston, Mass.");
        assert_eq!(variants.len(), 3);
      }
      other => panic!("unexpected explanation {other:?}"),
    }
    assert_eq!(issues[0].impact_score, 4.0);
  }

  #[test]
  fn near_keys_form_a_secondary_cluster() {
    let issues = detect(&graph_with_places(&["Springfield, Illinois", "Springfeld, Illinois"]));
    assert_eq!(issues.len(), 1);
    assert!(matches!(
      issues[0].explanation,
      Explanation::PlaceCluster { method: ClusterMethod::SimilarKeys, .. }
    ));
  }

  #[test]
  fn single_spellings_do_not_cluster() {
    assert!(detect(&graph_with_places(&["Paris", "Paris", "London"])).is_empty());
  }
}
