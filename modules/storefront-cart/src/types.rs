//! Cart snapshot types.
//!
//! `RawCartSnapshot` mirrors the remote schema's wire shape (every field
//! optional); `CartSnapshot` is the validated form the pipeline works with.
//! Snapshots are immutable point-in-time views handed over by the cart
//! mutation collaborator — the pipeline never mutates or merges them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::SnapshotError;

/// A cart line as it arrives off the wire.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawCartLine {
    pub id: Option<String>,
    #[serde(default)]
    pub quantity: u32,
    #[serde(default)]
    pub merchandise: serde_json::Value,
}

/// A cart snapshot as it arrives off the wire. Untrusted until validated.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawCartSnapshot {
    pub id: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub lines: Vec<RawCartLine>,
}

impl RawCartSnapshot {
    /// Validate the wire shape into a [`CartSnapshot`].
    ///
    /// `id` and `updated_at` are mandatory; a snapshot missing either is
    /// invalid and must not enter the pipeline. Lines without an id carry
    /// no stable identity and are dropped individually.
    pub fn validate(self) -> Result<CartSnapshot, SnapshotError> {
        let id = self.id.ok_or(SnapshotError::MissingField("id"))?;
        let updated_at = self
            .updated_at
            .ok_or(SnapshotError::MissingField("updatedAt"))?;

        let lines = self
            .lines
            .into_iter()
            .filter_map(|line| {
                Some(CartLine {
                    id: line.id?,
                    quantity: line.quantity,
                    merchandise: line.merchandise,
                })
            })
            .collect();

        Ok(CartSnapshot {
            id,
            updated_at,
            lines,
        })
    }
}

/// A validated line. Identity is the `id`: quantity and merchandise may
/// change across snapshots while the id stays stable — a line is a
/// persistent slot, not a value object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub id: String,
    pub quantity: u32,
    pub merchandise: serde_json::Value,
}

/// A validated, immutable cart snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartSnapshot {
    pub id: String,
    pub updated_at: DateTime<Utc>,
    pub lines: Vec<CartLine>,
}

impl CartSnapshot {
    /// Lines in this snapshot whose id matches.
    pub fn lines_with_id<'a>(&'a self, line_id: &'a str) -> impl Iterator<Item = &'a CartLine> {
        self.lines.iter().filter(move |line| line.id == line_id)
    }
}

/// The persisted record of the last cart version processed. Survives page
/// reloads via the host's key-value storage; JSON-encoded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DedupRecord {
    pub id: String,
    pub updated_at: DateTime<Utc>,
}

impl DedupRecord {
    pub fn of(snapshot: &CartSnapshot) -> Self {
        Self {
            id: snapshot.id.clone(),
            updated_at: snapshot.updated_at,
        }
    }

    pub fn matches(&self, snapshot: &CartSnapshot) -> bool {
        self.id == snapshot.id && self.updated_at == snapshot.updated_at
    }
}
