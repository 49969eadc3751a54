//! Error types for `lineage-core`.

use serde::Serialize;
use strum::{AsRefStr, Display};
use thiserror::Error;
use uuid::Uuid;

use crate::graph::EntityKind;

#[derive(Debug, Error)]
pub enum Error {
  #[error("{kind} not found: {id}")]
  NotFound { kind: EntityKind, id: Uuid },

  #[error("invalid argument: {0}")]
  InvalidArgument(String),

  #[error("conflict: {0}")]
  Conflict(String),

  #[error("unknown {what} discriminant: {value:?}")]
  UnknownDiscriminant { what: &'static str, value: String },

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

/// The operator-facing class of a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
  NotFound,
  InvalidArgument,
  Conflict,
  Storage,
}

impl Error {
  pub fn kind(&self) -> ErrorKind {
    match self {
      Self::NotFound { .. } => ErrorKind::NotFound,
      Self::InvalidArgument(_) => ErrorKind::InvalidArgument,
      Self::Conflict(_) => ErrorKind::Conflict,
      Self::UnknownDiscriminant { .. } | Self::Serialization(_) => ErrorKind::Storage,
    }
  }

  pub fn not_found(kind: EntityKind, id: Uuid) -> Self {
    Self::NotFound { kind, id }
  }

  pub fn invalid(msg: impl Into<String>) -> Self {
    Self::InvalidArgument(msg.into())
  }

  pub fn conflict(msg: impl Into<String>) -> Self { Self::Conflict(msg.into()) }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
