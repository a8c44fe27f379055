//! Persisted records: documents, snapshots, and the export bundle.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Export format version. Bumped on incompatible bundle changes.
pub const EXPORT_VERSION: u32 = 1;

/// A document as the store sees it. `content` may be vault ciphertext
/// when `encrypted` is set; the store never inspects it either way.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub title: String,
    pub content: String,
    pub encrypted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Document {
    /// New plaintext document with a fresh id.
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            title: title.into(),
            content: content.into(),
            encrypted: false,
            created_at: now,
            updated_at: now,
        }
    }
}

/// An immutable saved copy of a document's content.
///
/// `encrypted` describes how *this snapshot's* content is stored, which
/// may differ from the owning document's encryption flag.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub id: String,
    pub document_id: String,
    pub content: String,
    pub encrypted: bool,
    pub created_at: DateTime<Utc>,
    /// Content size in bytes at creation time.
    pub size: usize,
}

impl Snapshot {
    pub fn new(document_id: impl Into<String>, content: impl Into<String>, encrypted: bool) -> Self {
        let content = content.into();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            document_id: document_id.into(),
            size: content.len(),
            content,
            encrypted,
            created_at: Utc::now(),
        }
    }
}

/// The opaque backup/restore bundle. The store serializes and restores
/// it wholesale without validating beyond the shape.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ExportBundle {
    pub version: u32,
    pub export_date: Option<DateTime<Utc>>,
    pub documents: Vec<Document>,
    pub snapshots: Vec<Snapshot>,
    pub settings: BTreeMap<String, serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_ids_unique() {
        let a = Document::new("a", "");
        let b = Document::new("b", "");
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_snapshot_size_tracks_bytes() {
        let snap = Snapshot::new("doc", "héllo", false);
        assert_eq!(snap.size, 6);
    }

    #[test]
    fn test_bundle_round_trips_through_json() {
        let bundle = ExportBundle {
            version: EXPORT_VERSION,
            export_date: Some(Utc::now()),
            documents: vec![Document::new("t", "c")],
            snapshots: vec![Snapshot::new("d", "s", false)],
            settings: BTreeMap::from([("theme".to_string(), serde_json::json!("dark"))]),
        };
        let json = serde_json::to_string(&bundle).unwrap();
        let back: ExportBundle = serde_json::from_str(&json).unwrap();
        assert_eq!(back.documents, bundle.documents);
        assert_eq!(back.snapshots, bundle.snapshots);
        assert_eq!(back.settings, bundle.settings);
    }
}
