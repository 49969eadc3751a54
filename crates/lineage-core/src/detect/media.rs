//! Duplicate media links and assets.

use std::collections::BTreeMap;

use uuid::Uuid;

use super::{Detector, Findings};
use crate::{
  Result,
  graph::{EntityKind, Graph, MediaAsset},
  issue::{Explanation, NewIssue, Severity},
  settings::DetectionSettings,
  similarity::{normalize_filename, round2, similarity},
};

/// Repeated `(asset, person, family)` links, and distinct assets whose file
/// names and sizes say they are the same picture.
pub struct MediaDuplicateDetector {
  settings: DetectionSettings,
}

impl MediaDuplicateDetector {
  pub fn new(settings: DetectionSettings) -> Self { Self { settings } }

  fn file_name(asset: &MediaAsset) -> &str {
    asset
      .original_filename
      .as_deref()
      .filter(|name| !name.trim().is_empty())
      .unwrap_or(&asset.path)
  }

  fn sizes_agree(&self, a: Option<i64>, b: Option<i64>) -> bool {
    match (a, b) {
      (Some(a), Some(b)) => {
        let largest = a.max(b);
        largest == 0
          || ((a - b).abs() as f64) / (largest as f64) <= self.settings.media_size_tolerance
      }
      _ => true,
    }
  }
}

impl Detector for MediaDuplicateDetector {
  fn name(&self) -> &'static str { "media_duplicate" }

  fn detect(&self, graph: &Graph) -> Result<Findings> {
    let mut issues = Vec::new();

    let mut by_target: BTreeMap<(Uuid, Option<Uuid>, Option<Uuid>), Vec<Uuid>> =
      BTreeMap::new();
    for link in &graph.media_links {
      by_target.entry(link.target()).or_default().push(link.id);
    }
    for ((asset_id, person_id, family_id), mut ids) in by_target {
      if ids.len() < 2 {
        continue;
      }
      ids.sort_unstable();
      issues.push(NewIssue {
        severity: Severity::Warning,
        entity_type: EntityKind::MediaLink,
        confidence: 1.0,
        impact_score: (ids.len() - 1) as f64,
        explanation: Explanation::DuplicateMediaLink {
          asset_id,
          person_id,
          family_id,
          count: ids.len(),
        },
        entity_ids: ids,
      });
    }

    let link_counts = graph.link_counts();
    let mut assets: Vec<(&MediaAsset, String)> = graph
      .media_assets
      .iter()
      .map(|asset| (asset, normalize_filename(Self::file_name(asset))))
      .filter(|(_, name)| !name.is_empty())
      .collect();
    assets.sort_by_key(|(asset, _)| asset.id);

    for (i, (a, name_a)) in assets.iter().enumerate() {
      for (b, name_b) in &assets[i + 1..] {
        let sim = similarity(name_a, name_b);
        if sim < self.settings.media_min_filename_sim
          || !self.sizes_agree(a.size_bytes, b.size_bytes)
        {
          continue;
        }
        issues.push(NewIssue {
          severity:     Severity::Warning,
          entity_type:  EntityKind::MediaAsset,
          entity_ids:   vec![a.id, b.id],
          confidence:   round2(sim),
          impact_score: 1.0,
          explanation:  Explanation::DuplicateMediaAsset {
            filename_similarity: round2(sim),
            filenames:           vec![
              Self::file_name(a).to_owned(),
              Self::file_name(b).to_owned(),
            ],
            size_bytes:          vec![a.size_bytes, b.size_bytes],
            statuses:            vec![
              graph.media_status(a.id, &link_counts),
              graph.media_status(b.id, &link_counts),
            ],
          },
        });
      }
    }

    Ok(Findings::issues(issues))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::graph::{MediaLink, MediaStatus};

  fn asset(name: &str, size: Option<i64>) -> MediaAsset {
    MediaAsset {
      original_filename: Some(name.into()),
      size_bytes: size,
      ..MediaAsset::new(format!("media/{name}"), Uuid::new_v4().simple().to_string())
    }
  }

  fn detect(graph: &Graph) -> Vec<NewIssue> {
    MediaDuplicateDetector::new(DetectionSettings::default())
      .detect(graph)
      .unwrap()
      .issues
  }

  #[test]
  fn repeated_links_are_grouped() {
    let a = asset("portrait.jpg", None);
    let person = Uuid::new_v4();
    let link = |_: i32| MediaLink { person_id: Some(person), ..MediaLink::new(a.id) };
    let graph = Graph {
      media_links: (0..3).map(link).collect(),
      media_assets: vec![a],
      ..Default::default()
    };

    let issues = detect(&graph);
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].entity_type, EntityKind::MediaLink);
    assert_eq!(issues[0].entity_ids.len(), 3);
  }

  #[test]
  fn copies_with_similar_names_and_sizes_are_flagged() {
    let a = asset("Grandpa_Smith.JPG", Some(10_000));
    let b = asset("grandpa-smith.jpeg", Some(10_100));
    let graph = Graph {
      media_links: vec![MediaLink::new(a.id)],
      missing_media: [b.id].into_iter().collect(),
      media_assets: vec![a, b],
      ..Default::default()
    };

    let issues = detect(&graph);
    assert_eq!(issues.len(), 1);
    match &issues[0].explanation {
      Explanation::DuplicateMediaAsset { statuses, .. } => {
        assert!(statuses.contains(&MediaStatus::Linked));
        assert!(statuses.contains(&MediaStatus::Missing));
      }
      other => panic!("unexpected explanation {other:?}"),
    }
  }

  #[test]
  fn size_mismatch_blocks_asset_match() {
    let graph = Graph {
      media_assets: vec![asset("scan.png", Some(1_000)), asset("scan.png", Some(5_000))],
      ..Default::default()
    };
    assert!(detect(&graph).is_empty());
  }
}
