//! Exported event log artifact
//!
//! On stop the event log is serialized into a self-contained JSON array of
//! action records. Readers go through [`parse_entries`], which keeps
//! unknown action kinds as [`ArtifactEntry::Unsupported`] instead of
//! rejecting the whole document, so artifacts written by a newer recorder
//! still replay.

use std::path::{Path, PathBuf};

use serde_json::Value;

use super::action::{ActionKind, ActionRecord};
use crate::error::{RetraceError, Result};

/// A finished recording
#[derive(Debug, Clone, PartialEq)]
pub struct Artifact {
    pub session_id: String,
    pub records: Vec<ActionRecord>,
    pub file_name: String,
}

impl Artifact {
    pub fn new(
        session_id: impl Into<String>,
        records: Vec<ActionRecord>,
        file_name: impl Into<String>,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            records,
            file_name: file_name.into(),
        }
    }

    /// Pretty-printed JSON array, two-space indent
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.records)?)
    }

    /// Write `<dir>/<file_name>`, creating `dir` if needed
    pub fn write_to(&self, dir: impl AsRef<Path>) -> Result<PathBuf> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;
        let path = dir.join(&self.file_name);
        std::fs::write(&path, self.to_json()?)?;
        Ok(path)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// One element of an artifact as seen by a reader
#[derive(Debug, Clone, PartialEq)]
pub enum ArtifactEntry {
    Action(ActionRecord),
    /// A record whose `action` this build does not know
    Unsupported { kind: String, raw: Value },
}

impl ArtifactEntry {
    /// Display name of the entry's kind
    pub fn kind_name(&self) -> &str {
        match self {
            ArtifactEntry::Action(record) => record.kind().as_str(),
            ArtifactEntry::Unsupported { kind, .. } => kind,
        }
    }

    pub fn as_action(&self) -> Option<&ActionRecord> {
        match self {
            ArtifactEntry::Action(record) => Some(record),
            ArtifactEntry::Unsupported { .. } => None,
        }
    }
}

impl From<ActionRecord> for ArtifactEntry {
    fn from(record: ActionRecord) -> Self {
        ArtifactEntry::Action(record)
    }
}

/// Parse an artifact document
///
/// Fails with `InvalidArtifact` when the document is not a JSON array, an
/// element is not an object, or a record of a known kind is malformed.
pub fn parse_entries(text: &str) -> Result<Vec<ArtifactEntry>> {
    let document: Value = serde_json::from_str(text).map_err(|e| RetraceError::InvalidArtifact {
        reason: format!("not valid JSON: {}", e),
    })?;

    let Value::Array(items) = document else {
        return Err(RetraceError::InvalidArtifact {
            reason: "expected a JSON array of action records".to_string(),
        });
    };

    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| parse_entry(index, item))
        .collect()
}

/// Read and parse an artifact file
pub fn load_entries(path: impl AsRef<Path>) -> Result<Vec<ArtifactEntry>> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|e| RetraceError::InvalidArtifact {
        reason: format!("cannot read {}: {}", path.display(), e),
    })?;
    parse_entries(&text)
}

fn parse_entry(index: usize, item: Value) -> Result<ArtifactEntry> {
    if !item.is_object() {
        return Err(RetraceError::InvalidArtifact {
            reason: format!("entry {} is not an object", index),
        });
    }

    let kind = item
        .get("action")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    if ActionKind::from_name(&kind).is_none() {
        return Ok(ArtifactEntry::Unsupported { kind, raw: item });
    }

    serde_json::from_value(item)
        .map(ArtifactEntry::Action)
        .map_err(|e| RetraceError::InvalidArtifact {
            reason: format!("entry {} ({}): {}", index, kind, e),
        })
}
