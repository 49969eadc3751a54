//! `lineage` is the operator binary for a local Lineage store.
//!
//! Reads `lineage.toml` (or the path given with `--config`), opens the SQLite
//! store it names and runs one data-quality operation. Results are printed
//! as pretty JSON.
//!
//! ```text
//! lineage scan
//! lineage issues --type duplicate_person --status open
//! lineage apply '{"type":"merge_people","params":{"from_id":"…","into_id":"…"}}'
//! lineage undo 6f1c1f4e-6a4f-4f55-9d36-0a0b1b2c3d4e
//! ```

mod config;

use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use lineage_core::{
  action::ActionRequest,
  issue::{IssueStatus, IssueType},
  store::{DEFAULT_PER_PAGE, IssueQuery, QualityStore},
};
use lineage_store_sqlite::SqliteStore;
use serde::Serialize;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use crate::config::CliConfig;

#[derive(Parser)]
#[command(name = "lineage", author, version, about = "Genealogy data-quality engine")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "lineage.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Run every detector over the graph.
  Scan {
    /// Keep open issues and add only new findings.
    #[arg(long)]
    incremental: bool,
  },
  /// List issues, newest first.
  Issues {
    #[arg(long = "type", value_name = "ISSUE_TYPE")]
    issue_type: Option<IssueType>,
    #[arg(long)]
    status:     Option<IssueStatus>,
    #[arg(long, default_value_t = 1)]
    page:       usize,
    #[arg(long, default_value_t = DEFAULT_PER_PAGE)]
    per_page:   usize,
  },
  /// Show one issue.
  Issue { id: Uuid },
  /// Headline data-quality numbers.
  Summary,
  /// Apply a remediation given as JSON, or `@path` to read it from a file.
  Apply {
    request: String,
    /// Recorded in the action log.
    #[arg(long)]
    by:      Option<String>,
  },
  /// Reverse a previously applied action.
  Undo { action_id: Uuid },
  /// Recent actions, newest first.
  Actions {
    #[arg(long, default_value_t = 20)]
    limit: usize,
  },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .with_writer(std::io::stderr)
    .init();

  let cli = Cli::parse();
  let cfg = CliConfig::load(&cli.config)?;

  let mut store = SqliteStore::open(&cfg.store_path)
    .await
    .with_context(|| format!("failed to open store at {:?}", cfg.store_path))?
    .with_settings(&cfg.detection);
  if let Some(root) = &cfg.media_root {
    store = store.with_media_root(root.clone());
  }

  match cli.command {
    Command::Scan { incremental } => print(&classify(store.run_detection(!incremental).await)?),
    Command::Issues { issue_type, status, page, per_page } => {
      let query = IssueQuery { issue_type, status, page, per_page };
      print(&classify(store.list_issues(&query).await)?)
    }
    Command::Issue { id } => {
      let issue = classify(store.get_issue(id).await)?.with_context(|| format!("no issue {id}"))?;
      print(&issue)
    }
    Command::Summary => print(&classify(store.summary().await)?),
    Command::Apply { request, by } => {
      let request = read_request(&request)?;
      print(&classify(store.apply_action(request, by).await)?)
    }
    Command::Undo { action_id } => {
      classify(store.undo(action_id).await)?;
      tracing::info!(%action_id, "undone");
      Ok(())
    }
    Command::Actions { limit } => print(&classify(store.list_actions(limit).await)?),
  }
}

/// Prefix store failures with their kind (`not_found`, `conflict`, ...).
fn classify<T>(result: lineage_store_sqlite::Result<T>) -> anyhow::Result<T> {
  result.map_err(|e| {
    let kind = e.kind();
    anyhow::Error::new(e).context(kind.to_string())
  })
}

fn read_request(arg: &str) -> anyhow::Result<ActionRequest> {
  let raw = match arg.strip_prefix('@') {
    Some(path) => std::fs::read_to_string(path)
      .with_context(|| format!("failed to read request file {path}"))?,
    None => arg.to_owned(),
  };
  serde_json::from_str(&raw).context("failed to parse action request")
}

fn print(value: &impl Serialize) -> anyhow::Result<()> {
  println!("{}", serde_json::to_string_pretty(value)?);
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn issue_filters_parse_from_their_stored_names() {
    let cli = Cli::try_parse_from([
      "lineage", "issues", "--type", "duplicate_person", "--status", "open",
    ])
    .unwrap();
    match cli.command {
      Command::Issues { issue_type, status, page, per_page } => {
        assert_eq!(issue_type, Some(IssueType::DuplicatePerson));
        assert_eq!(status, Some(IssueStatus::Open));
        assert_eq!(page, 1);
        assert_eq!(per_page, DEFAULT_PER_PAGE);
      }
      _ => panic!("expected the issues subcommand"),
    }
    assert_eq!(cli.config, PathBuf::from("lineage.toml"));
  }

  #[test]
  fn unknown_issue_type_is_rejected() {
    assert!(Cli::try_parse_from(["lineage", "issues", "--type", "nonsense"]).is_err());
  }

  #[test]
  fn requests_can_be_read_from_a_file() {
    let path = std::env::temp_dir().join(format!("lineage-request-{}.json", Uuid::new_v4()));
    std::fs::write(
      &path,
      r#"{"type":"normalize_places","params":{"canonical":"Boston","variants":["boston"]}}"#,
    )
    .unwrap();
    let request = read_request(&format!("@{}", path.display())).unwrap();
    std::fs::remove_file(&path).unwrap();
    assert!(matches!(request, ActionRequest::NormalizePlaces { .. }));
  }

  #[test]
  fn malformed_requests_are_reported() {
    assert!(read_request("{not json").is_err());
    assert!(read_request("@/nonexistent/lineage-request.json").is_err());
  }
}
