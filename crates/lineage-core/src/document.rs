//! Versioned JSON documents for persisted explanations and action payloads.
//!
//! Every document is a JSON object carrying a `"v"` key next to the payload's
//! own fields. Readers accept documents without `"v"` (treated as version 1)
//! and ignore keys they do not know.

use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;

use crate::Result;

pub const DOCUMENT_VERSION: u64 = 1;

/// Serialise `value` (which must encode as a JSON object) and stamp it with
/// the current version.
pub fn encode<T: Serialize>(value: &T) -> Result<String> {
  let mut json = serde_json::to_value(value)?;
  if let Value::Object(map) = &mut json {
    map.insert("v".into(), Value::from(DOCUMENT_VERSION));
  }
  Ok(json.to_string())
}

/// Decode a document written by [`encode`] (any version up to the current).
pub fn decode<T: DeserializeOwned>(raw: &str) -> Result<T> {
  let mut json: Value = serde_json::from_str(raw)?;
  if let Value::Object(map) = &mut json {
    map.remove("v");
  }
  Ok(serde_json::from_value(json)?)
}
