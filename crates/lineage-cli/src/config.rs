//! Layered configuration: an optional TOML file, then `LINEAGE_*` variables.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use lineage_core::settings::DetectionSettings;
use serde::Deserialize;

/// Runtime configuration, deserialised from `lineage.toml`.
#[derive(Debug, Deserialize)]
pub struct CliConfig {
  #[serde(default = "default_store_path")]
  pub store_path: PathBuf,
  /// Directory media asset paths are relative to. Without it, file
  /// presence is not checked.
  #[serde(default)]
  pub media_root: Option<PathBuf>,
  #[serde(default)]
  pub detection:  DetectionSettings,
}

fn default_store_path() -> PathBuf { PathBuf::from("lineage.db") }

impl CliConfig {
  pub fn load(path: &Path) -> anyhow::Result<Self> {
    let settings = config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(environment())
      .build()
      .context("failed to read config file")?;
    let mut cfg: Self =
      settings.try_deserialize().context("failed to deserialise CliConfig")?;
    cfg.store_path = expand_tilde(&cfg.store_path);
    cfg.media_root = cfg.media_root.as_deref().map(expand_tilde);
    Ok(cfg)
  }
}

/// `LINEAGE_STORE_PATH`, `LINEAGE_DETECTION__MIN_PARENT_AGE`, ...
fn environment() -> config::Environment {
  config::Environment::with_prefix("LINEAGE")
    .prefix_separator("_")
    .separator("__")
    .try_parsing(true)
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

#[cfg(test)]
mod tests {
  use super::*;

  fn parse(toml: &str) -> CliConfig {
    config::Config::builder()
      .add_source(config::File::from_str(toml, config::FileFormat::Toml))
      .build()
      .unwrap()
      .try_deserialize()
      .unwrap()
  }

  #[test]
  fn empty_file_uses_defaults() {
    let cfg = parse("");
    assert_eq!(cfg.store_path, PathBuf::from("lineage.db"));
    assert!(cfg.media_root.is_none());
    assert_eq!(cfg.detection, DetectionSettings::default());
  }

  #[test]
  fn thresholds_can_be_overridden_individually() {
    let cfg = parse(
      r#"
      store_path = "/tmp/tree.db"

      [detection]
      person_min_score = 0.7
      "#,
    );
    assert_eq!(cfg.store_path, PathBuf::from("/tmp/tree.db"));
    assert_eq!(cfg.detection.person_min_score, 0.7);
    assert_eq!(cfg.detection.min_parent_age, 12);
  }

  #[test]
  fn environment_variables_use_a_single_underscore_after_the_prefix() {
    let vars = config::Map::from([
      ("LINEAGE_STORE_PATH".to_owned(), "/tmp/from-env.db".to_owned()),
      ("LINEAGE_DETECTION__MIN_PARENT_AGE".to_owned(), "14".to_owned()),
      ("LINEAGE__MEDIA_ROOT".to_owned(), "/tmp/ignored".to_owned()),
    ]);
    let cfg: CliConfig = config::Config::builder()
      .add_source(environment().source(Some(vars)))
      .build()
      .unwrap()
      .try_deserialize()
      .unwrap();
    assert_eq!(cfg.store_path, PathBuf::from("/tmp/from-env.db"));
    assert_eq!(cfg.detection.min_parent_age, 14);
    assert!(cfg.media_root.is_none());
  }

  #[test]
  fn tilde_is_expanded_only_at_the_start() {
    assert_eq!(expand_tilde(Path::new("/a/~/b")), PathBuf::from("/a/~/b"));
  }
}
